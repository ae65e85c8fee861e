//! # Kumitate - Argument Grammar Interpreter and Code Generator
//!
//! **Kumitate** turns a graph of command nodes back into script source text.
//! Every command is described by a recursive argument grammar (primitives,
//! optional flags, repeatable items, choices, blocks, subcommands, arrays and
//! bases). One walker interprets that grammar three ways: to project the
//! sockets a node exposes, to resolve values through the node graph, and to
//! render the node as a line of source.
//!
//! ## Core Workflow
//!
//! 1.  **Load Commands**: Parse your command schemas from JSON into a [`graph::CommandLibrary`].
//! 2.  **Build a Graph**: Create instances with a [`graph::NodeFactory`], add them to a
//!     [`graph::Graph`], then edit values and connect sockets.
//! 3.  **Evaluate**: Optionally run [`graph::refresh_evaluations`] to cache the results of
//!     evaluate nodes that feed other nodes.
//! 4.  **Generate**: Use [`codegen::CodeGenerator`] to render the graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use kumitate::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let library = CommandLibrary::from_json(
//!         r#"[{
//!             "name": "Wait",
//!             "args": [
//!                 { "type": "primitive", "subtype": "numeric", "name": "frames" },
//!                 { "type": "keyword", "value": "frames" }
//!             ]
//!         }]"#,
//!     )?;
//!
//!     let mut factory = NodeFactory::new();
//!     let mut graph = Graph::new();
//!     let wait = factory.create_instance(library.get("Wait")?, Position::default(), "Wait");
//!     let id = wait.id.clone();
//!     graph.add_node(wait)?;
//!
//!     let frames: ArgKey = "0/frames".parse()?;
//!     graph.set_value(&id, frames, "30")?;
//!
//!     let source = CodeGenerator::builder(&graph).with_indent("  ").build().generate();
//!     assert_eq!(source, "Wait 30 frames");
//!     Ok(())
//! }
//! ```

pub mod codegen;
pub mod error;
pub mod grammar;
pub mod graph;
pub mod prelude;
pub mod script;
pub mod sockets;
pub mod value;
pub mod walker;
