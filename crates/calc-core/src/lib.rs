//! Expression parsing/evaluation and random expression generation

pub mod evaluator;
pub mod randomizer;

pub use evaluator::{evaluate, evaluate_str, evaluate_string, format_number, parse, Expression, Operator};
pub use randomizer::{random_expression, random_expression_with, ExpressionShape};
