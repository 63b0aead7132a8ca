//! Arithmetic expression tool.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::Tool;

/// Nesting bound for parentheses, unary signs and `^` chains.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("empty expression")]
    Empty,

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Evaluate numeric expressions such as `(3 + 4) * 2 ^ 3`.
pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Useful for getting the result of a math expression. The input to this tool should be a valid arithmetic expression using + - * / % ^ and parentheses."
    }

    async fn call(&self, _cancel: &CancellationToken, input: &str) -> anyhow::Result<String> {
        let value = evaluate(input)?;
        Ok(format_number(value))
    }
}

/// Evaluate an arithmetic expression.
///
/// Precedence, lowest first: `+ -`, `* / %`, unary minus, `^` (right associative).
pub fn evaluate(expr: &str) -> Result<f64, ParseError> {
    let mut parser = Parser {
        chars: expr.chars().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    if parser.peek().is_none() {
        return Err(ParseError::Empty);
    }
    let value = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(ParseError::UnexpectedChar(c, parser.pos)),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume `c` if it is the next non-space character.
    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<f64, ParseError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, ParseError> {
        let mut value = self.unary()?;
        loop {
            self.skip_ws();
            // `**` is power, handled below
            if self.peek() == Some('*') && self.chars.get(self.pos + 1) != Some(&'*') {
                self.pos += 1;
                value *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(ParseError::DivisionByZero);
                }
                value /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(ParseError::DivisionByZero);
                }
                value %= rhs;
            } else {
                return Ok(value);
            }
        }
    }

    /// Every recursive path passes through here, so the depth is counted once.
    fn unary(&mut self) -> Result<f64, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64, ParseError> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, ParseError> {
        let base = self.primary()?;
        self.skip_ws();
        let is_pow = if self.peek() == Some('^') {
            self.pos += 1;
            true
        } else if self.peek() == Some('*') && self.chars.get(self.pos + 1) == Some(&'*') {
            self.pos += 2;
            true
        } else {
            false
        };
        if is_pow {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<f64, ParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ParseError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.eat(')') {
                    Ok(value)
                } else {
                    match self.peek() {
                        None => Err(ParseError::UnexpectedEnd),
                        Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
                    }
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(ParseError::UnexpectedChar(c, self.pos)),
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '_')
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        text.parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(evaluate("5 + 3").unwrap(), 8.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(evaluate("   "), Err(ParseError::Empty));
        assert_eq!(evaluate("1 / 0"), Err(ParseError::DivisionByZero));
        assert_eq!(evaluate("(1 + 2"), Err(ParseError::UnexpectedEnd));
        assert_eq!(evaluate("1 + x"), Err(ParseError::UnexpectedChar('x', 4)));
        assert!(matches!(evaluate("1..2"), Err(ParseError::InvalidNumber(_))));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&nested), Err(ParseError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&signs), Err(ParseError::TooDeep(MAX_DEPTH)));

        let powers = vec!["1"; 100_000].join("^");
        assert_eq!(evaluate(&powers), Err(ParseError::TooDeep(MAX_DEPTH)));

        let shallow = format!("{}2{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&shallow), Ok(2.0));
    }

    #[tokio::test]
    async fn tool_formats_integral_results() {
        let cancel = CancellationToken::new();
        assert!(Calculator.call(&cancel, "5 plus 3").await.is_err());
        assert_eq!(Calculator.call(&cancel, "5 + 3").await.unwrap(), "8");
        assert_eq!(Calculator.call(&cancel, "7 / 2").await.unwrap(), "3.5");
        let err = Calculator
            .call(&cancel, &"(".repeat(1_000))
            .await
            .expect_err("too deep");
        assert!(err.to_string().contains("nested deeper"));
    }
}
