//! One-shot binary arithmetic: `"<number> <op> <number> = "`.
//!
//! Numbers are any run of digits, `.` and `-`, matched greedily with
//! backtracking: `2--3=` splits as `2-`, `-`, `3` (so `2 - 3`), and `-2=` is
//! rejected. The pattern is not anchored at the end; text after
//! the first `=` is ignored.

use std::fmt;

use calc_common::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;

static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*([0-9.\-]+)\s*([+\-*/])\s*([0-9.\-]+)\s*=\s*").expect("expression pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            '+' => Operator::Add,
            '-' => Operator::Subtract,
            '*' => Operator::Multiply,
            '/' => Operator::Divide,
            // Legacy behaviour: unknown operators add. Existing clients rely on it.
            _ => Operator::Add,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    /// Plain IEEE-754 arithmetic; `x / 0.0` is an infinity or NaN, never an error.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expression {
    pub left: f64,
    pub operator: Operator,
    pub right: f64,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} = ", format_number(self.left), self.operator.symbol(), format_number(self.right))
    }
}

pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let caps = EXPRESSION
        .captures(text.trim())
        .ok_or_else(|| ParseError::for_input(text))?;
    let operator = caps[2].chars().next().map(Operator::from_symbol).unwrap_or(Operator::Add);
    Ok(Expression {
        left: parse_number(&caps[1]),
        operator,
        right: parse_number(&caps[3]),
    })
}

pub fn evaluate(expr: &Expression) -> f64 {
    expr.operator.apply(expr.left, expr.right)
}

pub fn evaluate_str(text: &str) -> Result<f64, ParseError> {
    parse(text).map(|expr| evaluate(&expr))
}

/// Deferred form of [`evaluate_str`] so the compute stage can await it like any
/// other I/O-bound step. Never actually suspends.
pub async fn evaluate_string(text: &str) -> Result<f64, ParseError> {
    evaluate_str(text)
}

/// Leading-prefix float conversion: `-`? digits (`.` digits)?.
/// `"1-2"` is `1`, `"1.2.3"` is `1.2`, and a token with no digits is NaN.
fn parse_number(token: &str) -> f64 {
    let bytes = token.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }
    token[..end].parse().unwrap_or(f64::NAN)
}

/// Prints a result the way clients of the compute endpoint expect:
/// `3` not `3.0`, `Infinity`, `NaN`, no negative zero, and exponent form
/// (`1e+21`, `1e-7`) outside `[1e-6, 1e21)`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 {
        String::from("0")
    } else if (1e-6..1e21).contains(&value.abs()) {
        value.to_string()
    } else {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
            _ => text,
        }
    }
}
