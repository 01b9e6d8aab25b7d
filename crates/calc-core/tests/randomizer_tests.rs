use calc_core::evaluator::{evaluate_str, parse};
use calc_core::randomizer::{random_expression, random_expression_with, ExpressionShape};
use rand::{rngs::StdRng, SeedableRng};

fn operands(text: &str) -> (&str, &str) {
    let mut parts = text.split(' ');
    let left = parts.next().unwrap();
    let _op = parts.next().unwrap();
    let right = parts.next().unwrap();
    (left, right)
}

fn fractional_digits(token: &str) -> usize {
    token.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

#[test]
fn output_always_parses() {
    let shape = ExpressionShape::default();
    for _ in 0..500 {
        let text = random_expression(&shape);
        assert!(evaluate_str(&text).is_ok(), "{text:?}");
        assert!(text.ends_with(" = "));
    }
}

#[test]
fn operands_stay_in_range_with_fixed_precision() {
    let shape = ExpressionShape { max_left: 3.0, max_right: 250.0, precision: 3 };
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let text = random_expression_with(&mut rng, &shape);
        let (left, right) = operands(&text);
        assert_eq!(fractional_digits(left), 3, "{text:?}");
        assert_eq!(fractional_digits(right), 3, "{text:?}");
        let expr = parse(&text).unwrap();
        assert!((0.0..=3.0).contains(&expr.left), "{text:?}");
        assert!((0.0..=250.0).contains(&expr.right), "{text:?}");
    }
}

#[test]
fn operands_near_an_awkward_maximum_do_not_round_over_it() {
    let shape = ExpressionShape { max_left: 1.006, max_right: 0.7, precision: 2 };
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..2000 {
        let text = random_expression_with(&mut rng, &shape);
        let expr = parse(&text).unwrap();
        assert!(expr.left <= 1.0, "{text:?}");
        assert!(expr.right <= 0.7, "{text:?}");
    }
}

#[test]
fn zero_precision_prints_whole_numbers() {
    let shape = ExpressionShape { precision: 0, ..ExpressionShape::default() };
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let text = random_expression_with(&mut rng, &shape);
        let (left, right) = operands(&text);
        assert!(!left.contains('.') && !right.contains('.'), "{text:?}");
        assert!(evaluate_str(&text).is_ok());
    }
}

#[test]
fn every_operator_shows_up() {
    let mut rng = StdRng::seed_from_u64(3);
    let shape = ExpressionShape::default();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        let text = random_expression_with(&mut rng, &shape);
        seen.insert(text.split(' ').nth(1).unwrap().to_string());
    }
    assert_eq!(seen.len(), 4);
}

#[test]
fn same_seed_same_expression() {
    let shape = ExpressionShape::default();
    let a = random_expression_with(&mut StdRng::seed_from_u64(42), &shape);
    let b = random_expression_with(&mut StdRng::seed_from_u64(42), &shape);
    assert_eq!(a, b);
}
