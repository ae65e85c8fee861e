//! Sandboxed expression language for embedded code arguments.
//!
//! Scripts see only the bindings passed in and a fixed set of functions. Both
//! parsing depth and evaluation steps are bounded by [`ScriptLimits`].

mod engine;
pub mod expression;
pub mod parser;
pub mod value;

pub use expression::Expression;
pub use parser::parse;
pub use value::Value;

use crate::error::ScriptError;
use ahash::AHashMap;
use engine::ScriptEngine;

/// Variables visible to one evaluation.
pub type Bindings = AHashMap<String, Value>;

/// Resource bounds for parsing and evaluating one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Maximum number of expression nodes visited during evaluation.
    pub max_steps: usize,
    /// Maximum nesting depth accepted by the parser.
    pub max_depth: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_depth: 64,
        }
    }
}

/// Evaluates an already parsed expression.
pub fn evaluate_expression(
    expr: &Expression,
    bindings: &Bindings,
    limits: &ScriptLimits,
) -> Result<Value, ScriptError> {
    ScriptEngine::new(bindings, *limits).evaluate(expr)
}

/// Parses and evaluates `source` against `bindings`.
pub fn evaluate(
    source: &str,
    bindings: &Bindings,
    limits: &ScriptLimits,
) -> Result<Value, ScriptError> {
    let expr = parse(source, limits.max_depth)?;
    evaluate_expression(&expr, bindings, limits)
}
