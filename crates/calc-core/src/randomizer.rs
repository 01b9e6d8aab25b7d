use rand::prelude::*;

const OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Bounds and precision for generated operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionShape {
    pub max_left: f64,
    pub max_right: f64,
    pub precision: usize,
}

impl Default for ExpressionShape {
    fn default() -> Self {
        Self { max_left: 10.0, max_right: 10.0, precision: 2 }
    }
}

/// `"<left> <op> <right> = "` with operands in `[0, max]` printed to `precision` places.
pub fn random_expression(shape: &ExpressionShape) -> String {
    random_expression_with(&mut thread_rng(), shape)
}

pub fn random_expression_with<R: Rng + ?Sized>(rng: &mut R, shape: &ExpressionShape) -> String {
    let left = sample_operand(rng, shape.max_left);
    let right = sample_operand(rng, shape.max_right);
    let operator = OPERATORS.choose(rng).copied().unwrap_or('+');
    format!(
        "{} {} {} = ",
        format_operand(left, shape.max_left, shape.precision),
        operator,
        format_operand(right, shape.max_right, shape.precision)
    )
}

/// Prints `value` to `precision` places without rounding past `max`.
fn format_operand(value: f64, max: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    let rounded_over = text.parse::<f64>().map_or(false, |printed| printed > max);
    let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    if rounded_over && scale.is_finite() {
        format!("{:.*}", precision, (max * scale).floor() / scale)
    } else {
        text
    }
}

fn sample_operand<R: Rng + ?Sized>(rng: &mut R, max: f64) -> f64 {
    if !(max.is_finite() && max > 0.0) {
        return 0.0;
    }
    rng.gen_range(0.0..=max)
}
