//! Checks a player's answer against the dealt hand.

use super::expr::Expr;
use super::{Hand, TARGET};

/// Accepted distance from the target for player expressions.
pub const TOLERANCE: f64 = 1e-4;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("expression contains invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("expression must use exactly 4 numbers, found {0}")]
    WrongOperandCount(usize),
    #[error("expression must use the dealt cards {expected:?}, found {found:?}")]
    OperandMismatch { expected: Vec<u32>, found: Vec<u32> },
    #[error("cannot evaluate expression: {0}")]
    EvaluationError(String),
    #[error("expression evaluates to {0}, not 24")]
    WrongResult(f64),
}

impl ValidationError {
    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidCharacter(_) => "invalid_character",
            ValidationError::WrongOperandCount(_) => "wrong_operand_count",
            ValidationError::OperandMismatch { .. } => "operand_mismatch",
            ValidationError::EvaluationError(_) => "evaluation_error",
            ValidationError::WrongResult(_) => "wrong_result",
        }
    }
}

/// Validates `expression` against `hand` and returns its value.
///
/// Checks run in order and the first failure is reported: character set,
/// operand count, operand multiset, evaluation, and distance from 24.
pub fn validate(expression: &str, hand: &Hand) -> Result<f64, ValidationError> {
    let expr: String = expression.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(bad) = expr.chars().find(|c| !is_allowed(*c)) {
        return Err(ValidationError::InvalidCharacter(bad));
    }

    let mut found = digit_runs(&expr);
    if found.len() != hand.len() {
        return Err(ValidationError::WrongOperandCount(found.len()));
    }

    let mut expected: Vec<u32> = hand.iter().map(|&c| u32::from(c)).collect();
    expected.sort_unstable();
    found.sort_unstable();
    if found != expected {
        return Err(ValidationError::OperandMismatch { expected, found });
    }

    let value = Expr::parse(&expr)
        .and_then(|parsed| parsed.eval_f64())
        .map_err(|e| ValidationError::EvaluationError(e.to_string()))?;

    if (value - TARGET as f64).abs() > TOLERANCE {
        return Err(ValidationError::WrongResult(value));
    }
    Ok(value)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

fn digit_runs(expr: &str) -> Vec<u32> {
    expr.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse().unwrap_or(u32::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_correct_answer_with_spaces() {
        assert_eq!(validate(" 4 * (5 + 3 - 2) ", &[2, 3, 4, 5]), Ok(24.0));
        assert_eq!(validate("(13-1)*(1+1)", &[1, 1, 13, 1]), Ok(24.0));
    }

    #[test]
    fn rejects_foreign_characters() {
        assert_eq!(validate("4*6.0", &[4, 6, 1, 1]), Err(ValidationError::InvalidCharacter('.')));
        assert_eq!(validate("2^3*3", &[2, 3, 3, 1]), Err(ValidationError::InvalidCharacter('^')));
        assert_eq!(validate("x", &[1, 2, 3, 4]), Err(ValidationError::InvalidCharacter('x')));
    }

    #[test]
    fn counts_operands() {
        assert_eq!(validate("12*2", &[12, 2, 1, 1]), Err(ValidationError::WrongOperandCount(2)));
        assert_eq!(
            validate("1+1+1+1+20", &[1, 1, 1, 1]),
            Err(ValidationError::WrongOperandCount(5))
        );
    }

    #[test]
    fn operands_must_match_the_hand() {
        assert_eq!(
            validate("(2+3+4)*5-21", &[2, 3, 4, 5]),
            Err(ValidationError::WrongOperandCount(5))
        );
        assert_eq!(
            validate("6*4*1*1", &[2, 3, 4, 5]),
            Err(ValidationError::OperandMismatch {
                expected: vec![2, 3, 4, 5],
                found: vec![1, 1, 4, 6],
            })
        );
    }

    #[test]
    fn malformed_syntax_is_an_evaluation_error() {
        let err = validate("(2+3)(4*5)", &[2, 3, 4, 5]).unwrap_err();
        assert_eq!(err.reason(), "evaluation_error");
        let err = validate("2/(3-3)+5", &[2, 3, 3, 5]).unwrap_err();
        assert_eq!(err, ValidationError::EvaluationError("division by zero".into()));
    }

    #[test]
    fn deeply_nested_answers_fail_cleanly() {
        let nested = format!("{}1+2+3+4{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = validate(&nested, &[1, 2, 3, 4]).unwrap_err();
        assert_eq!(err.reason(), "evaluation_error");
    }

    #[test]
    fn padded_literals_are_not_cards() {
        let err = validate("4*(05+3-2)", &[2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, ValidationError::EvaluationError(_)), "{err:?}");
    }

    #[test]
    fn wrong_results_are_rejected() {
        assert_eq!(validate("2+3*4+5", &[2, 3, 4, 5]), Err(ValidationError::WrongResult(19.0)));
        assert_eq!(validate("1+1+1+1", &[1, 1, 1, 1]), Err(ValidationError::WrongResult(4.0)));
    }

    #[test]
    fn float_noise_is_tolerated() {
        let value = validate("8/(3-8/3)", &[3, 3, 8, 8]).unwrap();
        assert!((value - 24.0).abs() <= TOLERANCE);
    }
}
