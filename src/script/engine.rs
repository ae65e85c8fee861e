use super::{Bindings, Expression, ScriptLimits, Value};
use crate::error::ScriptError;
use std::cell::Cell;

// This macro generates a match arm for a numeric binary operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, number) => {
        $self.eval_arithmetic($l, $r, $op_str, $op_fn)
    };
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, bool) => {
        $self.eval_comparison($l, $r, $op_str, $op_fn)
    };
}

/// Walks an expression tree against an explicit set of bindings.
///
/// The engine sees nothing but `bindings` and the allow-listed functions, and
/// every visited node spends one step of the budget.
pub(super) struct ScriptEngine<'a> {
    bindings: &'a Bindings,
    limits: ScriptLimits,
    steps: Cell<usize>,
}

impl<'a> ScriptEngine<'a> {
    pub(super) fn new(bindings: &'a Bindings, limits: ScriptLimits) -> Self {
        Self {
            bindings,
            limits,
            steps: Cell::new(0),
        }
    }

    pub(super) fn evaluate(&self, expr: &Expression) -> Result<Value, ScriptError> {
        self.evaluate_recursive(expr)
    }

    fn spend(&self) -> Result<(), ScriptError> {
        let steps = self.steps.get() + 1;
        if steps > self.limits.max_steps {
            return Err(ScriptError::BudgetExceeded(self.limits.max_steps));
        }
        self.steps.set(steps);
        Ok(())
    }

    fn evaluate_recursive(&self, expr: &Expression) -> Result<Value, ScriptError> {
        self.spend()?;
        match expr {
            // --- Arithmetic Operations ---
            Expression::Sum(l, r) => {
                let left = self.evaluate_recursive(l)?;
                let right = self.evaluate_recursive(r)?;
                match (left, right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    // String concatenation when either side is text
                    (Value::Text(a), other) => Ok(Value::Text(format!("{}{}", a, other))),
                    (other, Value::Text(b)) => Ok(Value::Text(format!("{}{}", other, b))),
                    (l_val, _) => Err(self.type_mismatch("+", "Number or Text", l_val)),
                }
            }
            Expression::Subtract(l, r) => eval_op!(self, l, r, "-", |a, b| Ok(a - b), number),
            Expression::Multiply(l, r) => eval_op!(self, l, r, "*", |a, b| Ok(a * b), number),
            Expression::Divide(l, r) => eval_op!(
                self,
                l,
                r,
                "/",
                |a, b| if b == 0.0 { Err(ScriptError::DivisionByZero) } else { Ok(a / b) },
                number
            ),
            Expression::Modulo(l, r) => eval_op!(
                self,
                l,
                r,
                "%",
                |a, b| if b == 0.0 { Err(ScriptError::DivisionByZero) } else { Ok(a % b) },
                number
            ),
            Expression::Negate(v) => match self.evaluate_recursive(v)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                val => Err(self.type_mismatch("-", "Number", val)),
            },

            // --- Comparison Operations ---
            Expression::GreaterThan(l, r) => eval_op!(self, l, r, ">", |a, b| a > b, bool),
            Expression::SmallerThan(l, r) => eval_op!(self, l, r, "<", |a, b| a < b, bool),
            Expression::GreaterThanOrEqual(l, r) => eval_op!(self, l, r, ">=", |a, b| a >= b, bool),
            Expression::SmallerThanOrEqual(l, r) => eval_op!(self, l, r, "<=", |a, b| a <= b, bool),

            // --- Equality ---
            Expression::Equal(l, r) => {
                let left = self.evaluate_recursive(l)?;
                let right = self.evaluate_recursive(r)?;
                Ok(Value::Bool(left == right))
            }
            Expression::NotEqual(l, r) => {
                let left = self.evaluate_recursive(l)?;
                let right = self.evaluate_recursive(r)?;
                Ok(Value::Bool(left != right))
            }

            // --- Logical Operations ---
            Expression::And(l, r) => {
                if !self.evaluate_recursive(l)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate_recursive(r)?.is_truthy()))
            }
            Expression::Or(l, r) => {
                if self.evaluate_recursive(l)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate_recursive(r)?.is_truthy()))
            }
            Expression::Not(v) => Ok(Value::Bool(!self.evaluate_recursive(v)?.is_truthy())),
            Expression::Conditional(c, a, b) => {
                if self.evaluate_recursive(c)?.is_truthy() {
                    self.evaluate_recursive(a)
                } else {
                    self.evaluate_recursive(b)
                }
            }

            // --- Other Operations ---
            Expression::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate_recursive(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, values)
            }
            Expression::Literal(val) => Ok(val.clone()),
            Expression::Variable(name) => self
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownVariable(name.clone())),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        match name {
            "abs" | "floor" | "ceil" | "round" => {
                let n = self.single_number(name, args)?;
                let result = match name {
                    "abs" => n.abs(),
                    "floor" => n.floor(),
                    "ceil" => n.ceil(),
                    _ => n.round(),
                };
                Ok(Value::Number(result))
            }
            "min" | "max" => {
                if args.is_empty() {
                    return Err(self.arity(name, "at least 1", 0));
                }
                let mut numbers = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        Value::Number(n) => numbers.push(n),
                        other => return Err(self.type_mismatch(name, "Number", other)),
                    }
                }
                let folded = numbers.into_iter().reduce(|a, b| {
                    if name == "min" { a.min(b) } else { a.max(b) }
                });
                Ok(folded.map_or(Value::Null, Value::Number))
            }
            "len" => match self.single(name, args)? {
                Value::Text(s) => Ok(Value::Number(s.chars().count() as f64)),
                other => Err(self.type_mismatch(name, "Text", other)),
            },
            "str" => Ok(Value::Text(self.single(name, args)?.to_string())),
            _ => Err(ScriptError::UnknownFunction(name.to_string())),
        }
    }

    fn single(&self, name: &str, mut args: Vec<Value>) -> Result<Value, ScriptError> {
        if args.len() != 1 {
            return Err(self.arity(name, "1", args.len()));
        }
        Ok(args.remove(0))
    }

    fn single_number(&self, name: &str, args: Vec<Value>) -> Result<f64, ScriptError> {
        match self.single(name, args)? {
            Value::Number(n) => Ok(n),
            other => Err(self.type_mismatch(name, "Number", other)),
        }
    }

    fn eval_arithmetic<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<Value, ScriptError>
    where
        F: Fn(f64, f64) -> Result<f64, ScriptError>,
    {
        let left = self.evaluate_recursive(l)?;
        let right = self.evaluate_recursive(r)?;
        match (left, right) {
            (Value::Number(lv), Value::Number(rv)) => f(lv, rv).map(Value::Number),
            (Value::Number(_), r_val) => Err(self.type_mismatch(op, "Number", r_val)),
            (l_val, _) => Err(self.type_mismatch(op, "Number", l_val)),
        }
    }

    fn eval_comparison<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<Value, ScriptError>
    where
        F: Fn(f64, f64) -> bool,
    {
        let left = self.evaluate_recursive(l)?;
        let right = self.evaluate_recursive(r)?;
        match (left, right) {
            (Value::Number(lv), Value::Number(rv)) => Ok(Value::Bool(f(lv, rv))),
            (Value::Number(_), r_val) => Err(self.type_mismatch(op, "Number", r_val)),
            (l_val, _) => Err(self.type_mismatch(op, "Number", l_val)),
        }
    }

    fn type_mismatch(&self, op: &str, expected: &str, found: Value) -> ScriptError {
        ScriptError::TypeMismatch {
            operation: op.to_string(),
            expected: expected.to_string(),
            found,
        }
    }

    fn arity(&self, name: &str, expected: &str, found: usize) -> ScriptError {
        ScriptError::Arity {
            name: name.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}
