use crate::grammar::ArgKey;
use crate::script::Value;
use thiserror::Error;

/// Errors that can occur while loading command schemas.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Failed to parse command library JSON: {0}")]
    JsonParseError(String),

    #[error("Command '{0}' is defined more than once in the library")]
    DuplicateCommand(String),

    #[error("Command '{0}' is not registered in the library")]
    UnknownCommand(String),
}

/// Errors raised by graph edits and snapshot loading.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("Node '{0}' not found in the graph")]
    NodeNotFound(String),

    #[error("Node id '{0}' is already used by another node")]
    DuplicateNode(String),

    #[error("Node '{node_id}' has no {direction} socket at key '{key}'")]
    SocketNotFound {
        node_id: String,
        key: ArgKey,
        direction: &'static str,
    },

    #[error("Input socket '{key}' on node '{node_id}' already has an incoming connection")]
    SocketOccupied { node_id: String, key: ArgKey },

    #[error("Cannot connect a {source_channel} socket to a {target_channel} socket")]
    ChannelMismatch {
        source_channel: &'static str,
        target_channel: &'static str,
    },

    #[error("Data type mismatch: '{source_type}' cannot feed '{target_type}'")]
    DataTypeMismatch {
        source_type: String,
        target_type: String,
    },

    #[error("Flow output '{key}' on node '{node_id}' is already connected")]
    FlowFanOut { node_id: String, key: ArgKey },

    #[error("Key '{key}' on node '{node_id}' does not address a {expected}")]
    InvalidKey {
        node_id: String,
        key: ArgKey,
        expected: &'static str,
    },

    #[error("Option '{option}' is not declared by the choice at '{key}'")]
    UnknownOption { key: ArgKey, option: String },

    #[error("Graph snapshot JSON error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised while resolving a value through connections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Cyclic connection detected while resolving '{key}' on node '{node_id}'")]
    CyclicConnection { node_id: String, key: ArgKey },

    /// The embedded code behind a connected evaluate node failed.
    #[error("Embedded code of node '{node_id}' at '{key}' failed: {message}")]
    EvaluationFailed {
        node_id: String,
        key: ArgKey,
        message: String,
    },
}

impl ResolveError {
    /// Whether strict generation must reject the graph. A failed evaluation is
    /// shown in place and does not stop generation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::CyclicConnection { .. })
    }
}

/// Errors produced by the embedded expression language.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Syntax error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Variable '{0}' is not bound")]
    UnknownVariable(String),

    #[error("Function '{0}' is not available")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected} arguments, but received {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Evaluation exceeded the step budget of {0}")]
    BudgetExceeded(usize),

    #[error("Expression nesting exceeds the depth limit of {0}")]
    TooDeep(usize),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Fatal errors surfaced by strict code generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Cyclic flow connection at node '{node_id}'")]
    CyclicFlow { node_id: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
