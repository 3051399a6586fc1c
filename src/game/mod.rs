//! 24-point rules: exact arithmetic, the solver, and answer validation.

pub mod deal;
pub mod expr;
pub mod fraction;
pub mod solver;
pub mod validator;

pub const HAND_SIZE: usize = 4;
pub const MIN_CARD: u8 = 1;
pub const MAX_CARD: u8 = 13;
pub const TARGET: i64 = 24;

/// The four card values dealt for a round.
pub type Hand = [u8; HAND_SIZE];

pub use deal::deal;
pub use solver::solve;
pub use validator::{ValidationError, validate};
