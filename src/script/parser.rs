use super::{Expression, Value};
use crate::error::ScriptError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

const OPERATORS: [&str; 16] = [
    "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "=", "&",
];

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ScriptError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let literal: String = chars[start..pos].iter().collect();
            let number = literal.parse().map_err(|_| ScriptError::Parse {
                position: start,
                message: format!("invalid number '{}'", literal),
            })?;
            tokens.push((start, Token::Number(number)));
            continue;
        }
        if c == '"' || c == '\'' {
            pos += 1;
            let mut text = String::new();
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(ScriptError::Parse {
                            position: start,
                            message: "unterminated string".to_string(),
                        });
                    }
                    Some(&q) if q == c => {
                        pos += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(pos + 1).ok_or_else(|| ScriptError::Parse {
                            position: pos,
                            message: "dangling escape".to_string(),
                        })?;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => *other,
                        });
                        pos += 2;
                    }
                    Some(&other) => {
                        text.push(other);
                        pos += 1;
                    }
                }
            }
            tokens.push((start, Token::Text(text)));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push((start, Token::Ident(chars[start..pos].iter().collect())));
            continue;
        }
        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            '?' => Some(Token::Question),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((start, token));
            pos += 1;
            continue;
        }
        let op = OPERATORS.iter().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, oc)| chars.get(pos + i) == Some(&oc))
        });
        match op {
            Some(&"=") | Some(&"&") | None => {
                return Err(ScriptError::Parse {
                    position: start,
                    message: format!("unexpected character '{}'", c),
                });
            }
            Some(op) => {
                tokens.push((start, Token::Op(*op)));
                pos += op.len();
            }
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser over the token stream, bounded by `max_depth`.
struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    source_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len, |(p, _)| *p)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Parse {
            position: self.position(),
            message: message.into(),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ScriptError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ScriptError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn parse_conditional(&mut self) -> Result<Expression, ScriptError> {
        self.descend()?;
        let condition = self.parse_or()?;
        let expr = if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            let then = self.parse_conditional()?;
            self.expect(Token::Colon, "':' in conditional expression")?;
            let otherwise = self.parse_conditional()?;
            Expression::Conditional(Box::new(condition), Box::new(then), Box::new(otherwise))
        } else {
            condition
        };
        self.depth -= 1;
        Ok(expr)
    }

    /// Parses a left-associative run of binary operators. Every operator
    /// nests the tree one level deeper, so each one counts against the depth
    /// limit until the run ends.
    fn binary_chain(
        &mut self,
        ops: &[&'static str],
        operand: fn(&mut Self) -> Result<Expression, ScriptError>,
        build: fn(&'static str, Box<Expression>, Box<Expression>) -> Expression,
    ) -> Result<Expression, ScriptError> {
        let depth = self.depth;
        let mut left = operand(self)?;
        while let Some(op) = self.eat_op(ops) {
            self.descend()?;
            let right = operand(self)?;
            left = build(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["||"], Self::parse_and, |_, l, r| Expression::Or(l, r))
    }

    fn parse_and(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["&&"], Self::parse_equality, |_, l, r| {
            Expression::And(l, r)
        })
    }

    fn parse_equality(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["==", "!="], Self::parse_comparison, |op, l, r| match op {
            "==" => Expression::Equal(l, r),
            _ => Expression::NotEqual(l, r),
        })
    }

    fn parse_comparison(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["<", "<=", ">", ">="], Self::parse_additive, |op, l, r| {
            match op {
                "<" => Expression::SmallerThan(l, r),
                "<=" => Expression::SmallerThanOrEqual(l, r),
                ">" => Expression::GreaterThan(l, r),
                _ => Expression::GreaterThanOrEqual(l, r),
            }
        })
    }

    fn parse_additive(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["+", "-"], Self::parse_multiplicative, |op, l, r| match op {
            "+" => Expression::Sum(l, r),
            _ => Expression::Subtract(l, r),
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ScriptError> {
        self.binary_chain(&["*", "/", "%"], Self::parse_unary, |op, l, r| match op {
            "*" => Expression::Multiply(l, r),
            "/" => Expression::Divide(l, r),
            _ => Expression::Modulo(l, r),
        })
    }

    fn parse_unary(&mut self) -> Result<Expression, ScriptError> {
        if let Some(op) = self.eat_op(&["!", "-"]) {
            self.descend()?;
            let operand = Box::new(self.parse_unary()?);
            self.depth -= 1;
            return Ok(match op {
                "!" => Expression::Not(operand),
                _ => Expression::Negate(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ScriptError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expression::Literal(Value::Number(n))),
            Some(Token::Text(s)) => Ok(Expression::Literal(Value::Text(s))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expression::Literal(Value::Bool(true))),
                "false" => Ok(Expression::Literal(Value::Bool(false))),
                "null" => Ok(Expression::Literal(Value::Null)),
                _ if self.peek() == Some(&Token::LParen) => {
                    self.pos += 1;
                    let args = self.parse_arguments()?;
                    Ok(Expression::Call(name, args))
                }
                _ => Ok(Expression::Variable(name)),
            },
            Some(Token::LParen) => {
                let inner = self.parse_conditional()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(other) => Err(ScriptError::Parse {
                position,
                message: format!("unexpected token {:?}", other),
            }),
            None => Err(ScriptError::Parse {
                position,
                message: "unexpected end of expression".to_string(),
            }),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ScriptError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_conditional()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or ')' in argument list"));
                }
            }
        }
    }
}

/// Parses expression source text into an [`Expression`].
pub fn parse(source: &str, max_depth: usize) -> Result<Expression, ScriptError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ScriptError::Parse {
            position: 0,
            message: "empty expression".to_string(),
        });
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        source_len: source.chars().count(),
    };
    let expr = parser.parse_conditional()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}
