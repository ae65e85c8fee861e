//! Common test utilities: a small command library and a graph fixture.
use kumitate::prelude::*;

/// Command library covering every grammar kind.
#[allow(dead_code)]
pub const COMMANDS_JSON: &str = r#"[
    {
        "name": "Wait",
        "args": [
            { "type": "primitive", "subtype": "numeric" },
            { "type": "keyword", "value": "frames" }
        ]
    },
    {
        "name": "Dash",
        "args": [{ "type": "keyword", "value": "fast", "optional": true }]
    },
    {
        "name": "Print",
        "args": [{ "type": "primitive", "subtype": "string", "name": "text" }]
    },
    {
        "name": "Say",
        "args": [
            { "type": "primitive", "subtype": "string", "name": "text" },
            { "type": "primitive", "subtype": "string", "name": "tone", "optional": true }
        ]
    },
    {
        "name": "Note",
        "args": [
            { "type": "keyword", "value": "__hidden__" },
            { "type": "primitive", "subtype": "string", "name": "text" }
        ]
    },
    {
        "name": "Evaluate",
        "category": "evaluate",
        "args": [
            { "type": "primitive", "subtype": "embeddedCode", "name": "code" },
            { "type": "primitive", "subtype": "value", "name": "x" }
        ]
    },
    {
        "name": "Inline",
        "args": [{ "type": "primitive", "subtype": "embeddedCode", "name": "expr" }]
    },
    {
        "name": "MoveTo",
        "arrayParam": {
            "type": "array",
            "name": "coords",
            "content": { "type": "primitive", "subtype": "numeric" },
            "delimiters": ["", ""],
            "separator": ","
        },
        "args": [{ "type": "block", "name": "body" }]
    },
    {
        "name": "Raw",
        "args": [
            { "type": "primitive", "subtype": "rawCode", "name": "code", "repeatable": true }
        ]
    },
    {
        "name": "Jump",
        "args": [
            {
                "type": "choice",
                "name": "mode",
                "optional": true,
                "options": [
                    {
                        "type": "group",
                        "children": [
                            { "type": "keyword", "value": "high" },
                            { "type": "primitive", "subtype": "numeric", "name": "height" }
                        ]
                    },
                    {
                        "type": "group",
                        "children": [{ "type": "keyword", "value": "low" }]
                    }
                ]
            }
        ]
    },
    {
        "name": "Tween",
        "args": [
            {
                "type": "subcommand",
                "name": "ease",
                "args": [
                    { "type": "primitive", "subtype": "numeric", "name": "t" },
                    { "type": "primitive", "subtype": "switch", "name": "loop" }
                ]
            }
        ]
    },
    {
        "name": "If",
        "args": [
            { "type": "primitive", "subtype": "condition", "name": "cond" },
            {
                "type": "block",
                "name": "then",
                "content": [
                    { "type": "primitive", "subtype": "rawCode", "name": "stmt", "optional": true }
                ]
            }
        ]
    },
    {
        "name": "Give",
        "args": [
            { "type": "primitive", "subtype": "variable", "name": "target", "prefix": "$" },
            {
                "type": "array",
                "name": "items",
                "optional": true,
                "content": { "type": "primitive", "subtype": "string" }
            }
        ]
    },
    {
        "name": "Hero",
        "category": "data",
        "args": [{ "type": "primitive", "subtype": "string", "name": "name" }]
    },
    { "name": "Stop" }
]"#;

/// Parses an argument key, panicking on malformed test input.
#[allow(dead_code)]
pub fn key(text: &str) -> ArgKey {
    text.parse().expect("valid argument key")
}

#[allow(dead_code)]
pub fn library() -> CommandLibrary {
    CommandLibrary::from_json(COMMANDS_JSON).expect("fixture library parses")
}

#[allow(dead_code)]
pub fn schema(command: &str) -> CommandSchema {
    library()
        .get(command)
        .expect("command registered")
        .schema
        .clone()
}

/// A library, an id factory and a graph under construction.
#[allow(dead_code)]
pub struct Fixture {
    pub library: CommandLibrary,
    pub factory: NodeFactory,
    pub graph: Graph,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self {
            library: library(),
            factory: NodeFactory::new(),
            graph: Graph::new(),
        }
    }

    /// Adds an instance of `command` and returns its id.
    pub fn add(&mut self, command: &str) -> String {
        let definition = self.library.get(command).expect("command registered");
        let node = self
            .factory
            .create_instance(definition, Position::default(), command);
        let id = node.id.clone();
        self.graph.add_node(node).expect("fresh node id");
        id
    }

    pub fn set(&mut self, id: &str, key_text: &str, value: impl Into<ArgValue>) {
        self.graph
            .set_value(id, key(key_text), value)
            .expect("node exists");
    }

    /// Connects the command-level flow output of `from` to the flow input of `to`.
    pub fn chain(&mut self, from: &str, to: &str) {
        self.graph
            .connect(from, ArgKey::flow(), to, ArgKey::flow())
            .expect("flow connection is valid");
    }

    pub fn value(&self, id: &str, key_text: &str) -> Option<ArgValue> {
        self.graph
            .node(id)
            .and_then(|node| node.values.get(&key(key_text)).cloned())
    }

    pub fn generate(&self) -> String {
        generate(&self.graph)
    }
}
