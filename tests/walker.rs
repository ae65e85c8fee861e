//! Tests for the argument walker, identifiers and default value maps.
mod common;
use common::*;
use kumitate::grammar::{GrammarNode, NONE_OPTION, identifier};
use kumitate::graph::{default_values, fill_defaults};
use kumitate::prelude::*;
use kumitate::walker::{ArgumentVisitor, Ctx, Lookup, ValueSource, walk_command};

/// Lists the key of every leaf the walker reaches, in walk order.
struct KeyCollector;

impl<'g> ArgumentVisitor<'g> for KeyCollector {
    type Output = Vec<String>;

    fn primitive(&mut self, ctx: &Ctx<'g>, _: PrimitiveType, _: Lookup) -> Option<Vec<String>> {
        Some(vec![ctx.key.to_string()])
    }

    fn keyword(&mut self, ctx: &Ctx<'g>, _: &'g str) -> Option<Vec<String>> {
        Some(vec![ctx.key.to_string()])
    }

    fn optional(
        &mut self,
        _: &Ctx<'g>,
        _: bool,
        content: Option<Vec<String>>,
    ) -> Option<Vec<String>> {
        content
    }

    fn repeatable(&mut self, _: &Ctx<'g>, items: Vec<Vec<String>>, _: usize) -> Option<Vec<String>> {
        Some(items.concat())
    }

    fn choice(
        &mut self,
        _: &Ctx<'g>,
        _: Option<&'g GrammarNode>,
        content: Option<Vec<String>>,
    ) -> Option<Vec<String>> {
        content
    }

    fn block(&mut self, _: &Ctx<'g>, children: Vec<Vec<String>>) -> Option<Vec<String>> {
        Some(children.concat())
    }

    fn exec_block(&mut self, ctx: &Ctx<'g>) -> Option<Vec<String>> {
        Some(vec![ctx.key.to_string()])
    }

    fn subcommand(
        &mut self,
        _: &Ctx<'g>,
        param: Option<Vec<String>>,
        args: Vec<Vec<String>>,
    ) -> Option<Vec<String>> {
        Some(param.into_iter().chain(args).flatten().collect())
    }

    fn group(&mut self, _: &Ctx<'g>, children: Vec<Vec<String>>) -> Option<Vec<String>> {
        Some(children.concat())
    }

    fn array(&mut self, _: &Ctx<'g>, items: Vec<Vec<String>>) -> Option<Vec<String>> {
        Some(items.concat())
    }

    fn base(&mut self, _: &Ctx<'g>, param: Option<Vec<String>>) -> Option<Vec<String>> {
        param
    }
}

fn walked_keys(schema: &CommandSchema, values: &Values) -> Vec<String> {
    walk_command(schema, &mut KeyCollector, values)
        .into_items()
        .concat()
}

#[test]
fn test_top_level_keys_use_ordinal_then_identifier() {
    let wait = schema("Wait");
    let keys = walked_keys(&wait, &default_values(&wait));
    assert_eq!(keys, vec!["0/numeric", "1/frames"]);
}

#[test]
fn test_array_param_is_walked_first() {
    let move_to = schema("MoveTo");
    let mut values = default_values(&move_to);
    values.insert(key("@param/coords/#count"), ArgValue::Int(2));
    fill_defaults(&move_to, &mut values);

    let keys = walked_keys(&move_to, &values);
    assert_eq!(
        keys,
        vec!["@param/coords/0/numeric", "@param/coords/1/numeric", "0/body"]
    );
}

#[test]
fn test_disabled_optionals_are_not_walked() {
    let say = schema("Say");
    let mut values = default_values(&say);
    assert_eq!(walked_keys(&say, &values), vec!["0/text"]);

    values.insert(key("1/tone/#enabled"), ArgValue::Bool(true));
    assert_eq!(walked_keys(&say, &values), vec!["0/text", "1/tone"]);
}

#[test]
fn test_repeatable_items_are_index_qualified() {
    let raw = schema("Raw");
    let mut values = default_values(&raw);
    values.insert(key("0/code/#count"), ArgValue::Int(3));
    assert_eq!(
        walked_keys(&raw, &values),
        vec!["0/code/0/code", "0/code/1/code", "0/code/2/code"]
    );
}

#[test]
fn test_choice_descends_only_into_selection() {
    let jump = schema("Jump");
    let mut values = default_values(&jump);
    assert_eq!(values.get(&key("0/mode")), Some(&ArgValue::text(NONE_OPTION)));
    assert!(walked_keys(&jump, &values).is_empty());

    values.insert(key("0/mode"), ArgValue::text("high"));
    assert_eq!(
        walked_keys(&jump, &values),
        vec!["0/mode/high/0/high", "0/mode/high/1/height"]
    );

    // A stored selection that matches nothing behaves like no selection.
    values.insert(key("0/mode"), ArgValue::text("sideways"));
    assert!(walked_keys(&jump, &values).is_empty());
}

#[test]
fn test_group_identifier_comes_from_first_keyword() {
    let jump = schema("Jump");
    let GrammarKind::Choice { options } = &jump.args[0].kind else {
        panic!("Jump's first argument is a choice");
    };
    let idents: Vec<String> = options.iter().map(identifier).collect();
    assert_eq!(idents, vec!["high", "low"]);
    assert_eq!(identifier(&jump.args[0]), "mode");
}

#[test]
fn test_unaddressable_nodes_are_skipped() {
    let mut schema = CommandSchema::new("Odd");
    schema.args.push(GrammarNode::keyword(""));
    schema
        .args
        .push(GrammarNode::primitive(PrimitiveType::Numeric).with_name("n"));

    let values = default_values(&schema);
    assert_eq!(walked_keys(&schema, &values), vec!["1/n"]);
    assert_eq!(values.len(), 1);
}

#[test]
fn test_defaults_are_idempotent() {
    let library = library();
    for command in library.type_tags() {
        let command_schema = schema(command);
        let first = default_values(&command_schema);
        assert_eq!(first, default_values(&command_schema), "{} defaults differ", command);

        let mut refilled = first.clone();
        fill_defaults(&command_schema, &mut refilled);
        assert_eq!(first, refilled, "{} refill changed values", command);
    }
}

#[test]
fn test_default_rules() {
    let give = schema("Give");
    let values = default_values(&give);
    assert_eq!(values.get(&key("0/target")), Some(&ArgValue::text("")));
    assert_eq!(values.get(&key("1/items/#enabled")), Some(&ArgValue::Bool(false)));
    assert_eq!(values.get(&key("1/items/#count")), Some(&ArgValue::Int(0)));

    let raw = default_values(&schema("Raw"));
    assert_eq!(raw.get(&key("0/code/#count")), Some(&ArgValue::Int(1)));
    assert_eq!(raw.get(&key("0/code/0/code")), Some(&ArgValue::text("")));

    let dash = default_values(&schema("Dash"));
    assert_eq!(dash.get(&key("0/fast")), Some(&ArgValue::Bool(false)));
    assert!(dash.get(&key("0/fast/#enabled")).is_none());
}

struct Broken;

impl ValueSource for Broken {
    fn get(&self, key: &ArgKey) -> Lookup {
        Err(ResolveError::CyclicConnection {
            node_id: "n".to_string(),
            key: key.clone(),
        })
    }
}

/// Failed reads reach primitive handlers as errors and read as absent elsewhere.
#[test]
fn test_lookup_errors_reach_primitive_handlers() {
    struct ErrorCounter(usize);

    impl<'g> ArgumentVisitor<'g> for ErrorCounter {
        type Output = ();

        fn primitive(&mut self, _: &Ctx<'g>, _: PrimitiveType, value: Lookup) -> Option<()> {
            if value.is_err() {
                self.0 += 1;
            }
            Some(())
        }
        fn keyword(&mut self, _: &Ctx<'g>, _: &'g str) -> Option<()> {
            Some(())
        }
        fn optional(&mut self, _: &Ctx<'g>, _: bool, _: Option<()>) -> Option<()> {
            Some(())
        }
        fn repeatable(&mut self, _: &Ctx<'g>, _: Vec<()>, _: usize) -> Option<()> {
            Some(())
        }
        fn choice(&mut self, _: &Ctx<'g>, _: Option<&'g GrammarNode>, _: Option<()>) -> Option<()> {
            Some(())
        }
        fn block(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
            Some(())
        }
        fn exec_block(&mut self, _: &Ctx<'g>) -> Option<()> {
            Some(())
        }
        fn subcommand(&mut self, _: &Ctx<'g>, _: Option<()>, _: Vec<()>) -> Option<()> {
            Some(())
        }
        fn group(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
            Some(())
        }
        fn array(&mut self, _: &Ctx<'g>, _: Vec<()>) -> Option<()> {
            Some(())
        }
        fn base(&mut self, _: &Ctx<'g>, _: Option<()>) -> Option<()> {
            Some(())
        }
    }

    let tween = schema("Tween");
    let mut counter = ErrorCounter(0);
    walk_command(&tween, &mut counter, &Broken);
    assert_eq!(counter.0, 2);

    // The repeat count cannot be read, so no items are walked.
    let raw = schema("Raw");
    let mut counter = ErrorCounter(0);
    walk_command(&raw, &mut counter, &Broken);
    assert_eq!(counter.0, 0);
}
