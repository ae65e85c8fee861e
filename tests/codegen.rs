//! End-to-end tests for source generation.
mod common;
use common::*;
use kumitate::prelude::*;

#[test]
fn test_single_command_with_value() {
    let mut fx = Fixture::new();
    let wait = fx.add("Wait");
    fx.set(&wait, "0/numeric", "30");
    assert_eq!(fx.generate(), "Wait 30 frames");
}

#[test]
fn test_required_primitives_fall_back_to_placeholders() {
    let mut fx = Fixture::new();
    fx.add("Wait");
    assert_eq!(fx.generate(), "Wait 0 frames");

    let mut fx = Fixture::new();
    fx.add("Tween");
    assert_eq!(fx.generate(), "Tween ease(0, false)");

    let mut fx = Fixture::new();
    fx.add("Print");
    assert_eq!(fx.generate(), "Print \"\"");
}

#[test]
fn test_optional_keyword_toggles() {
    let mut fx = Fixture::new();
    let dash = fx.add("Dash");
    assert_eq!(fx.generate(), "Dash");

    fx.set(&dash, "0/fast", true);
    assert_eq!(fx.generate(), "Dash fast");
}

#[test]
fn test_disabled_optional_is_omitted() {
    let mut fx = Fixture::new();
    let say = fx.add("Say");
    fx.set(&say, "0/text", "hello");
    fx.set(&say, "1/tone", "loud");
    assert_eq!(fx.generate(), "Say \"hello\"");

    fx.set(&say, "1/tone/#enabled", true);
    assert_eq!(fx.generate(), "Say \"hello\" \"loud\"");
}

#[test]
fn test_hidden_keyword_and_string_quoting() {
    let mut fx = Fixture::new();
    let note = fx.add("Note");
    fx.set(&note, "1/text", "say \"hi\"\nbye");
    assert_eq!(fx.generate(), r#"Note "say \"hi\"\nbye""#);
}

#[test]
fn test_command_without_arguments() {
    let mut fx = Fixture::new();
    fx.add("Stop");
    assert_eq!(fx.generate(), "Stop");
}

#[test]
fn test_flow_chain_order_and_separate_roots() {
    let mut fx = Fixture::new();
    let a = fx.add("Wait");
    let b = fx.add("Wait");
    let c = fx.add("Stop");
    fx.set(&a, "0/numeric", "1");
    fx.set(&b, "0/numeric", "2");
    // Chain b -> a, leave c on its own.
    fx.chain(&b, &a);

    assert_eq!(fx.generate(), "Wait 2 frames\nWait 1 frames\n\nStop");
}

#[test]
fn test_hidden_node_passes_flow_through() {
    let mut fx = Fixture::new();
    let a = fx.add("Wait");
    let b = fx.add("Wait");
    let c = fx.add("Wait");
    fx.set(&a, "0/numeric", "1");
    fx.set(&b, "0/numeric", "2");
    fx.set(&c, "0/numeric", "3");
    fx.chain(&a, &b);
    fx.chain(&b, &c);
    fx.graph.set_visible(&b, false).unwrap();

    assert_eq!(fx.generate(), "Wait 1 frames\nWait 3 frames");
}

#[test]
fn test_array_param_and_exec_block() {
    let mut fx = Fixture::new();
    let move_to = fx.add("MoveTo");
    let wait = fx.add("Wait");
    let stop = fx.add("Stop");
    fx.graph
        .set_count(&move_to, &key("@param/coords"), 2)
        .unwrap();
    fx.set(&move_to, "@param/coords/0/numeric", "5");
    fx.set(&move_to, "@param/coords/1/numeric", "10");
    fx.set(&wait, "0/numeric", "30");
    fx.graph
        .connect(&move_to, key("0/body"), &wait, ArgKey::flow())
        .unwrap();
    fx.chain(&move_to, &stop);

    assert_eq!(
        fx.generate(),
        "MoveTo[5,10] {\n    Wait 30 frames\n}\nStop"
    );
}

#[test]
fn test_nested_blocks_use_configured_indent() {
    let mut fx = Fixture::new();
    let outer = fx.add("MoveTo");
    let inner = fx.add("MoveTo");
    let wait = fx.add("Wait");
    fx.graph
        .connect(&outer, key("0/body"), &inner, ArgKey::flow())
        .unwrap();
    fx.graph
        .connect(&inner, key("0/body"), &wait, ArgKey::flow())
        .unwrap();

    let source = CodeGenerator::builder(&fx.graph)
        .with_indent("\t")
        .build()
        .generate();
    assert_eq!(
        source,
        "MoveTo[0] {\n\tMoveTo[0] {\n\t\tWait 0 frames\n\t}\n}"
    );
}

#[test]
fn test_empty_exec_block_renders_braces() {
    let mut fx = Fixture::new();
    fx.add("MoveTo");
    assert_eq!(fx.generate(), "MoveTo[0] {}");
}

#[test]
fn test_repeatable_raw_code_joins_with_spaces() {
    let mut fx = Fixture::new();
    let raw = fx.add("Raw");
    fx.graph.set_count(&raw, &key("0/code"), 3).unwrap();
    fx.set(&raw, "0/code/0/code", "a();");
    fx.set(&raw, "0/code/2/code", "c();");
    // The empty middle item is skipped.
    assert_eq!(fx.generate(), "Raw a(); c();");
}

#[test]
fn test_choice_renders_selected_option() {
    let mut fx = Fixture::new();
    let jump = fx.add("Jump");
    assert_eq!(fx.generate(), "Jump");

    fx.graph.select_option(&jump, &key("0/mode"), "high").unwrap();
    assert_eq!(fx.generate(), "Jump high 0");

    fx.set(&jump, "0/mode/high/1/height", "3");
    assert_eq!(fx.generate(), "Jump high 3");

    fx.graph.select_option(&jump, &key("0/mode"), "low").unwrap();
    assert_eq!(fx.generate(), "Jump low");

    fx.graph
        .select_option(&jump, &key("0/mode"), "__none__")
        .unwrap();
    assert_eq!(fx.generate(), "Jump");
}

#[test]
fn test_subcommand_renders_call_style() {
    let mut fx = Fixture::new();
    let tween = fx.add("Tween");
    fx.set(&tween, "0/ease/0/t", "0.5");
    fx.set(&tween, "0/ease/1/loop", "true");
    assert_eq!(fx.generate(), "Tween ease(0.5, true)");
}

#[test]
fn test_container_block_with_optional_statement() {
    let mut fx = Fixture::new();
    let if_node = fx.add("If");
    assert_eq!(fx.generate(), "If false {}");

    fx.set(&if_node, "0/cond", "hp < 10");
    fx.set(&if_node, "1/then/0/stmt/#enabled", true);
    fx.set(&if_node, "1/then/0/stmt", "x = 1");
    assert_eq!(fx.generate(), "If hp < 10 {\n    x = 1\n}");
}

#[test]
fn test_prefix_and_optional_array() {
    let mut fx = Fixture::new();
    let give = fx.add("Give");
    fx.set(&give, "0/target", "hero");
    assert_eq!(fx.generate(), "Give $hero");

    fx.set(&give, "1/items/#enabled", true);
    fx.graph.set_count(&give, &key("1/items"), 2).unwrap();
    fx.set(&give, "1/items/0/string", "a");
    fx.set(&give, "1/items/1/string", "b");
    assert_eq!(fx.generate(), "Give $hero [\"a\", \"b\"]");
}

#[test]
fn test_inline_embedded_code_is_evaluated() {
    let mut fx = Fixture::new();
    let inline = fx.add("Inline");
    fx.set(&inline, "0/expr", "2 * 21");
    assert_eq!(fx.generate(), "Inline 42");

    fx.set(&inline, "0/expr", "1 +");
    let source = fx.generate();
    assert!(
        source.starts_with("Inline /* Error: Syntax error"),
        "unexpected output: {}",
        source
    );
    // Script errors are not fatal.
    assert!(try_generate(&fx.graph).is_ok());
}

#[test]
fn test_data_and_evaluate_nodes_emit_no_lines() {
    let mut fx = Fixture::new();
    let hero = fx.add("Hero");
    let eval = fx.add("Evaluate");
    let print = fx.add("Print");
    fx.set(&hero, "0/name", "Aki");
    fx.set(&eval, "0/code", "1 + 1");
    fx.graph
        .connect(&hero, key("0/name"), &print, key("0/text"))
        .unwrap();

    assert_eq!(fx.generate(), "Print \"Aki\"");
}

#[test]
fn test_flow_cycle_without_root() {
    let mut fx = Fixture::new();
    let a = fx.add("Wait");
    let b = fx.add("Wait");
    fx.chain(&a, &b);
    fx.chain(&b, &a);

    assert_eq!(
        fx.generate(),
        "/* Error: cyclic flow connection at node 'node-1' */"
    );
    assert_eq!(
        try_generate(&fx.graph),
        Err(GenerateError::CyclicFlow {
            node_id: "node-1".to_string()
        })
    );
}

#[test]
fn test_flow_cycle_through_exec_block() {
    let mut fx = Fixture::new();
    let move_to = fx.add("MoveTo");
    let wait = fx.add("Wait");
    fx.graph
        .connect(&move_to, key("0/body"), &wait, ArgKey::flow())
        .unwrap();
    fx.chain(&wait, &move_to);

    assert_eq!(
        fx.generate(),
        "/* Error: cyclic flow connection at node 'node-1' */"
    );
    assert!(try_generate(&fx.graph).is_err());
}

#[test]
fn test_flow_cycle_reached_from_root() {
    // Snapshots keep connections as stored, so a node may have two flow inputs.
    let json = r##"{
        "nodes": [
            { "id": "r", "command": "Wait", "values": { "0/numeric": "1" } },
            { "id": "a", "command": "Wait", "values": { "0/numeric": "2" } },
            { "id": "b", "command": "Wait", "values": { "0/numeric": "3" } }
        ],
        "connections": [
            { "source": "r", "sourceKey": "#flow", "target": "a", "targetKey": "#flow" },
            { "source": "a", "sourceKey": "#flow", "target": "b", "targetKey": "#flow" },
            { "source": "b", "sourceKey": "#flow", "target": "a", "targetKey": "#flow" }
        ]
    }"##;
    let graph = Graph::from_json(json, &library()).unwrap();

    assert_eq!(
        generate(&graph),
        "Wait 1 frames\nWait 2 frames\nWait 3 frames\n/* Error: cyclic flow connection at node 'a' */"
    );
    assert!(matches!(
        try_generate(&graph),
        Err(GenerateError::CyclicFlow { node_id }) if node_id == "a"
    ));
}

#[test]
fn test_data_cycle_marks_the_argument() {
    let mut fx = Fixture::new();
    let p1 = fx.add("Print");
    let p2 = fx.add("Print");
    fx.graph
        .connect(&p1, key("0/text"), &p2, key("0/text"))
        .unwrap();
    fx.graph
        .connect(&p2, key("0/text"), &p1, key("0/text"))
        .unwrap();

    let source = fx.generate();
    assert!(
        source.contains("/* Error: Cyclic connection"),
        "unexpected output: {}",
        source
    );
    assert!(matches!(
        try_generate(&fx.graph),
        Err(GenerateError::Resolve(ResolveError::CyclicConnection { .. }))
    ));
}

#[test]
fn test_generation_is_deterministic() {
    let mut fx = Fixture::new();
    let give = fx.add("Give");
    let jump = fx.add("Jump");
    let raw = fx.add("Raw");
    fx.set(&give, "0/target", "hero");
    fx.graph.select_option(&jump, &key("0/mode"), "low").unwrap();
    fx.set(&raw, "0/code/0/code", "done();");
    fx.chain(&give, &jump);
    fx.chain(&jump, &raw);

    let first = fx.generate();
    assert_eq!(first, "Give $hero\nJump low\nRaw done();");
    for _ in 0..5 {
        assert_eq!(fx.generate(), first);
    }
}

#[test]
fn test_snapshot_round_trip_preserves_output() {
    let mut fx = Fixture::new();
    let move_to = fx.add("MoveTo");
    let wait = fx.add("Wait");
    let print = fx.add("Print");
    let hero = fx.add("Hero");
    fx.set(&move_to, "@param/coords/0/numeric", "7");
    fx.set(&wait, "0/numeric", "12");
    fx.set(&hero, "0/name", "Aki");
    fx.graph
        .connect(&move_to, key("0/body"), &wait, ArgKey::flow())
        .unwrap();
    fx.chain(&move_to, &print);
    fx.graph
        .connect(&hero, key("0/name"), &print, key("0/text"))
        .unwrap();
    fx.graph.set_visible(&wait, false).unwrap();

    let json = fx.graph.to_json().unwrap();
    let restored = Graph::from_json(&json, &fx.library).unwrap();

    assert_eq!(generate(&restored), fx.generate());
    assert_eq!(generate(&restored), "MoveTo[7] {}\nPrint \"Aki\"");
    assert_eq!(restored.connections, fx.graph.connections);
}

/// Commands covering layout rules the shared library leaves out.
const LAYOUT_COMMANDS: &str = r#"[
    {
        "name": "Var",
        "args": [
            {
                "type": "base",
                "name": "v",
                "arrayParam": {
                    "type": "array",
                    "name": "idx",
                    "content": { "type": "primitive", "subtype": "numeric" },
                    "delimiters": ["", ""],
                    "separator": ","
                }
            }
        ]
    },
    {
        "name": "Pick",
        "args": [
            { "type": "primitive", "subtype": "numeric", "name": "n", "repeatable": true, "joiner": "; " }
        ]
    },
    {
        "name": "Lines",
        "args": [
            { "type": "primitive", "subtype": "numeric", "name": "n", "repeatable": true, "joiner": "\\n" }
        ]
    },
    {
        "name": "Seq",
        "args": [
            {
                "type": "block",
                "name": "step",
                "repeatable": true,
                "content": [{ "type": "primitive", "subtype": "rawCode", "name": "line" }]
            }
        ]
    },
    {
        "name": "Free",
        "args": [{ "type": "array", "name": "xs" }]
    },
    {
        "name": "Go",
        "args": [
            {
                "type": "subcommand",
                "name": "MoveTo",
                "arrayParam": {
                    "type": "array",
                    "name": "xy",
                    "content": { "type": "primitive", "subtype": "numeric" },
                    "delimiters": ["", ""],
                    "separator": ","
                },
                "args": [{ "type": "block", "name": "body" }]
            }
        ]
    },
    { "name": "Stop" }
]"#;

fn layout_fixture() -> Fixture {
    Fixture {
        library: CommandLibrary::from_json(LAYOUT_COMMANDS).unwrap(),
        factory: NodeFactory::new(),
        graph: Graph::new(),
    }
}

#[test]
fn test_base_renders_name_with_parameter() {
    let mut fx = layout_fixture();
    let var = fx.add("Var");
    fx.set(&var, "0/v/@param/idx/0/numeric", "3");
    assert_eq!(fx.generate(), "Var v[3]");

    fx.graph
        .set_count(&var, &key("0/v/@param/idx"), 2)
        .unwrap();
    fx.set(&var, "0/v/@param/idx/1/numeric", "4");
    assert_eq!(fx.generate(), "Var v[3,4]");
}

#[test]
fn test_explicit_joiner_overrides_default() {
    let mut fx = layout_fixture();
    let pick = fx.add("Pick");
    fx.graph.set_count(&pick, &key("0/n"), 3).unwrap();
    fx.set(&pick, "0/n/0/n", "1");
    fx.set(&pick, "0/n/2/n", "3");
    assert_eq!(fx.generate(), "Pick 1; 0; 3");

    let mut fx = layout_fixture();
    let lines = fx.add("Lines");
    fx.graph.set_count(&lines, &key("0/n"), 2).unwrap();
    // An escaped newline in the joiner becomes a line break.
    assert_eq!(fx.generate(), "Lines 0\n0");
}

#[test]
fn test_repeated_blocks_join_with_newlines() {
    let mut fx = layout_fixture();
    let seq = fx.add("Seq");
    fx.graph.set_count(&seq, &key("0/step"), 2).unwrap();
    fx.set(&seq, "0/step/0/step/0/line", "a");
    fx.set(&seq, "0/step/1/step/0/line", "b");
    assert_eq!(fx.generate(), "Seq {\n    a\n}\n{\n    b\n}");
}

#[test]
fn test_array_without_content_is_a_scalar() {
    let mut fx = layout_fixture();
    let free = fx.add("Free");
    assert_eq!(fx.generate(), "Free");

    fx.set(&free, "0/xs", "1,2");
    assert_eq!(fx.generate(), "Free 1,2");
}

#[test]
fn test_subcommand_with_block_renders_without_parentheses() {
    let mut fx = layout_fixture();
    let go = fx.add("Go");
    let stop = fx.add("Stop");
    fx.graph
        .set_count(&go, &key("0/MoveTo/@param/xy"), 2)
        .unwrap();
    fx.set(&go, "0/MoveTo/@param/xy/0/numeric", "5");
    fx.set(&go, "0/MoveTo/@param/xy/1/numeric", "10");
    assert_eq!(fx.generate(), "Go MoveTo[5,10] {}\n\nStop");

    fx.graph
        .connect(&go, key("0/MoveTo/0/body"), &stop, ArgKey::flow())
        .unwrap();
    assert_eq!(fx.generate(), "Go MoveTo[5,10] {\n    Stop\n}");
}

#[test]
fn test_long_inline_expression_is_rejected_in_place() {
    let mut fx = Fixture::new();
    let inline = fx.add("Inline");
    fx.set(&inline, "0/expr", format!("1{}", "+1".repeat(1500)));

    assert_eq!(
        fx.generate(),
        "Inline /* Error: Expression nesting exceeds the depth limit of 64 */"
    );
    assert!(try_generate(&fx.graph).is_ok());
}
