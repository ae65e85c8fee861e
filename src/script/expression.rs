use super::Value;
use std::fmt;

/// Syntax tree of an embedded expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Modulo(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    /// `condition ? then : otherwise`
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    /// Call of an allow-listed function.
    Call(String, Vec<Expression>),

    // Leaf nodes
    Literal(Value),
    Variable(String),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

impl Expression {
    /// Gets the precedence level for an expression type. Higher numbers bind more tightly.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Conditional(..) => 1,
            Expression::Or(..) => 2,
            Expression::And(..) => 3,
            Expression::Equal(..) | Expression::NotEqual(..) => 4,
            Expression::GreaterThan(..)
            | Expression::GreaterThanOrEqual(..)
            | Expression::SmallerThan(..)
            | Expression::SmallerThanOrEqual(..) => 5,
            Expression::Sum(..) | Expression::Subtract(..) => 6,
            Expression::Multiply(..) | Expression::Divide(..) | Expression::Modulo(..) => 7,
            Expression::Not(_) | Expression::Negate(_) => 8,
            Expression::Call(..) | Expression::Literal(_) | Expression::Variable(_) => 9,
        }
    }

    /// Recursively formats the expression, adding parentheses only when necessary.
    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent_precedence: u8) -> fmt::Result {
        let current = self.precedence();
        let needs_parens = current < parent_precedence;
        if needs_parens {
            write!(f, "(")?;
        }

        match self {
            Expression::Sum(l, r) => self.fmt_binary(f, "+", l, r, current)?,
            Expression::Subtract(l, r) => self.fmt_binary(f, "-", l, r, current)?,
            Expression::Multiply(l, r) => self.fmt_binary(f, "*", l, r, current)?,
            Expression::Divide(l, r) => self.fmt_binary(f, "/", l, r, current)?,
            Expression::Modulo(l, r) => self.fmt_binary(f, "%", l, r, current)?,
            Expression::And(l, r) => self.fmt_binary(f, "&&", l, r, current)?,
            Expression::Or(l, r) => self.fmt_binary(f, "||", l, r, current)?,
            Expression::Equal(l, r) => self.fmt_binary(f, "==", l, r, current)?,
            Expression::NotEqual(l, r) => self.fmt_binary(f, "!=", l, r, current)?,
            Expression::GreaterThan(l, r) => self.fmt_binary(f, ">", l, r, current)?,
            Expression::GreaterThanOrEqual(l, r) => self.fmt_binary(f, ">=", l, r, current)?,
            Expression::SmallerThan(l, r) => self.fmt_binary(f, "<", l, r, current)?,
            Expression::SmallerThanOrEqual(l, r) => self.fmt_binary(f, "<=", l, r, current)?,
            Expression::Negate(v) => {
                write!(f, "-")?;
                v.fmt_with_precedence(f, current)?;
            }
            Expression::Not(v) => {
                write!(f, "!")?;
                v.fmt_with_precedence(f, current)?;
            }
            Expression::Conditional(c, a, b) => {
                c.fmt_with_precedence(f, current + 1)?;
                write!(f, " ? ")?;
                a.fmt_with_precedence(f, current)?;
                write!(f, " : ")?;
                b.fmt_with_precedence(f, current)?;
            }
            Expression::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.fmt_with_precedence(f, 0)?;
                }
                write!(f, ")")?;
            }
            Expression::Literal(Value::Text(s)) => write!(f, "{:?}", s)?,
            Expression::Literal(v) => write!(f, "{}", v)?,
            Expression::Variable(name) => write!(f, "{}", name)?,
        }

        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }

    /// Helper function to format a generic binary expression.
    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        op: &str,
        l: &Expression,
        r: &Expression,
        current_precedence: u8,
    ) -> fmt::Result {
        l.fmt_with_precedence(f, current_precedence)?;
        write!(f, " {} ", op)?;
        // Left-associative: an equal-precedence right operand needs parentheses.
        r.fmt_with_precedence(f, current_precedence + 1)
    }
}
