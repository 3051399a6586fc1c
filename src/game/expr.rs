//! Arithmetic expressions over card values: operators, syntax tree and a
//! recursive-descent parser.
//!
//! Grammar (whitespace must already be stripped):
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := digits | '(' expr ')'
//! ```

use std::fmt;

use super::fraction::Fraction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub const ALL: [Op; 4] = [Op::Add, Op::Sub, Op::Mul, Op::Div];

    pub fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// Exact application; `None` for division by zero.
    pub fn apply(self, lhs: Fraction, rhs: Fraction) -> Option<Fraction> {
        match self {
            Op::Add => Some(lhs + rhs),
            Op::Sub => Some(lhs - rhs),
            Op::Mul => Some(lhs * rhs),
            Op::Div => lhs.checked_div(rhs).ok(),
        }
    }

    fn apply_f64(self, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
        match self {
            Op::Add => Ok(lhs + rhs),
            Op::Sub => Ok(lhs - rhs),
            Op::Mul => Ok(lhs * rhs),
            Op::Div if rhs == 0.0 => Err(EvalError::DivisionByZero),
            Op::Div => Ok(lhs / rhs),
        }
    }
}

/// Deepest parenthesis nesting the parser accepts.
pub const MAX_DEPTH: usize = 64;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { found: char, position: usize },
    #[error("number too large at position {0}")]
    NumberTooLarge(usize),
    #[error("leading zero in number at position {0}")]
    LeadingZero(usize),
    #[error("parentheses nested too deeply")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(u32),
    Binary {
        op: Op,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(src: &str) -> Result<Expr, EvalError> {
        let mut parser = Parser { src: src.as_bytes(), pos: 0, depth: 0 };
        let expr = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(found) => Err(EvalError::UnexpectedToken { found, position: parser.pos }),
        }
    }

    pub fn eval_f64(&self) -> Result<f64, EvalError> {
        match self {
            Expr::Number(n) => Ok(f64::from(*n)),
            Expr::Binary { op, lhs, rhs } => op.apply_f64(lhs.eval_f64()?, rhs.eval_f64()?),
        }
    }

    #[cfg(test)]
    pub fn eval_exact(&self) -> Result<Fraction, EvalError> {
        match self {
            Expr::Number(n) => Ok(Fraction::from(i64::from(*n))),
            Expr::Binary { op, lhs, rhs } => op
                .apply(lhs.eval_exact()?, rhs.eval_exact()?)
                .ok_or(EvalError::DivisionByZero),
        }
    }

    /// Literals in left-to-right order.
    #[cfg(test)]
    pub fn leaves(&self) -> Vec<u32> {
        match self {
            Expr::Number(n) => vec![*n],
            Expr::Binary { lhs, rhs, .. } => {
                let mut out = lhs.leaves();
                out.extend(rhs.leaves());
                out
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs}{}{rhs})", op.symbol()),
        }
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).map(|b| char::from(*b))
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek().and_then(additive) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.peek().and_then(multiplicative) {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            None => Err(EvalError::UnexpectedEnd),
            Some('(') => {
                if self.depth == MAX_DEPTH {
                    return Err(EvalError::TooDeep);
                }
                self.pos += 1;
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(found) => Err(EvalError::UnexpectedToken { found, position: self.pos }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() => self.number(),
            Some(found) => Err(EvalError::UnexpectedToken { found, position: self.pos }),
        }
    }

    fn number(&mut self) -> Result<Expr, EvalError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos - start > 1 && self.src[start] == b'0' {
            return Err(EvalError::LeadingZero(start));
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .map(Expr::Number)
            .ok_or(EvalError::NumberTooLarge(start))
    }
}

fn additive(c: char) -> Option<Op> {
    match c {
        '+' => Some(Op::Add),
        '-' => Some(Op::Sub),
        _ => None,
    }
}

fn multiplicative(c: char) -> Option<Op> {
    match c {
        '*' => Some(Op::Mul),
        '/' => Some(Op::Div),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<f64, EvalError> {
        Expr::parse(src)?.eval_f64()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("2+3*4+5"), Ok(19.0));
        assert_eq!(eval("(2+3)*(4+5)"), Ok(45.0));
        assert_eq!(eval("8-4-2"), Ok(2.0));
        assert_eq!(eval("12/3/2"), Ok(2.0));
        assert_eq!(eval("((13))"), Ok(13.0));
    }

    #[test]
    fn malformed_input_is_reported() {
        assert_eq!(eval(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("(1+2"), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("1+2)"), Err(EvalError::UnexpectedToken { found: ')', position: 3 }));
        assert_eq!(eval("-1+2"), Err(EvalError::UnexpectedToken { found: '-', position: 0 }));
        assert_eq!(eval("1**2"), Err(EvalError::UnexpectedToken { found: '*', position: 2 }));
        assert_eq!(eval("99999999999"), Err(EvalError::NumberTooLarge(0)));
    }

    #[test]
    fn nesting_is_bounded() {
        let ok = format!("{}7{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(eval(&ok), Ok(7.0));
        let deep = format!("{}7{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(eval(&deep), Err(EvalError::TooDeep));
        // sibling groups do not add up
        let wide = "(1)+".repeat(MAX_DEPTH * 2) + "1";
        assert!(eval(&wide).is_ok());
    }

    #[test]
    fn leading_zeros_are_rejected() {
        assert_eq!(eval("05+1"), Err(EvalError::LeadingZero(0)));
        assert_eq!(eval("3*(00)"), Err(EvalError::LeadingZero(3)));
        assert_eq!(eval("0+10"), Ok(10.0));
    }

    #[test]
    fn division_by_zero_value_fails_both_ways() {
        let expr = Expr::parse("6/(3-3)").unwrap();
        assert_eq!(expr.eval_f64(), Err(EvalError::DivisionByZero));
        assert_eq!(expr.eval_exact(), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn exact_evaluation_keeps_fractions() {
        let expr = Expr::parse("8/(3-8/3)").unwrap();
        assert!(expr.eval_exact().unwrap().equals_integer(24));
        assert_eq!(expr.leaves(), vec![8, 3, 8, 3]);
    }

    #[test]
    fn display_fully_parenthesizes() {
        let expr = Expr::parse("1+2*3").unwrap();
        assert_eq!(expr.to_string(), "(1+(2*3))");
    }
}
