//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the kumitate crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use kumitate::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let library = CommandLibrary::from_json(&std::fs::read_to_string("path/to/commands.json")?)?;
//! let graph = Graph::from_json(&std::fs::read_to_string("path/to/graph.json")?, &library)?;
//!
//! println!("{}", generate(&graph));
//! # Ok(())
//! # }
//! ```

// Grammar and addressing
pub use crate::grammar::{ArgKey, Category, CommandSchema, GrammarKind, GrammarNode, PrimitiveType};
pub use crate::value::{ArgValue, Values};

// Graph model
pub use crate::graph::{
    CommandLibrary, Connection, Graph, GraphSnapshot, NodeDefinition, NodeFactory, NodeInstance,
    Position, refresh_evaluations, resolve_value,
};
pub use crate::sockets::{Channel, Direction, Socket, SocketSet, project_sockets};

// Generation
pub use crate::codegen::{CodeGenerator, GeneratorOptions, generate, try_generate};
pub use crate::script::ScriptLimits;

// Error types
pub use crate::error::{GenerateError, GraphError, ResolveError, SchemaError, ScriptError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
