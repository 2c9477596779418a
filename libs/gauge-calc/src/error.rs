//! Error types for gauge-calc
//!
//! Only parse failures and internal invariant violations are errors. Data
//! problems during evaluation (unknown variable, unknown function, bitwise
//! operand out of range) surface as a NaN result instead.

use thiserror::Error;

/// Parse-time errors, each carrying the byte offset into the expression text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty expression")]
    EmptyExpression,

    #[error("Unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Unknown operator '{symbol}' at {position}")]
    UnknownOperator { symbol: String, position: usize },

    #[error("Malformed number '{text}' at {position}")]
    MalformedNumber { text: String, position: usize },

    #[error("Mismatched parenthesis at {position}")]
    MismatchedParenthesis { position: usize },

    #[error("Ternary '?' without matching ':' at {position}")]
    UnmatchedIf { position: usize },

    #[error("Ternary ':' without matching '?' at {position}")]
    UnmatchedElse { position: usize },

    #[error("Unexpected '{token}' at {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,
}

impl ParseError {
    /// Byte offset of the offending input, if the error has one
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::EmptyExpression | Self::UnexpectedEnd => None,
            Self::UnexpectedCharacter { position, .. }
            | Self::UnknownOperator { position, .. }
            | Self::MalformedNumber { position, .. }
            | Self::MismatchedParenthesis { position }
            | Self::UnmatchedIf { position }
            | Self::UnmatchedElse { position }
            | Self::UnexpectedToken { position, .. } => Some(*position),
        }
    }

    pub(crate) fn unexpected(token: impl ToString, position: usize) -> Self {
        Self::UnexpectedToken {
            token: token.to_string(),
            position,
        }
    }
}

/// Internal invariant violations raised by the evaluator
///
/// A program produced by [`parse`](crate::parse) never triggers these; seeing
/// one means the parser and evaluator disagree about the program format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Value stack underflow at instruction {index}")]
    StackUnderflow { index: usize },

    #[error("Argument marker stack underflow at instruction {index}")]
    MarkerUnderflow { index: usize },

    #[error("Condition stack underflow at instruction {index}")]
    ConditionUnderflow { index: usize },

    #[error("Unexpected '{token}' in program at instruction {index}")]
    InvalidInstruction { token: String, index: usize },

    #[error("Program left {remaining} values on the stack, expected 1")]
    UnbalancedProgram { remaining: usize },
}

/// Calculation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, CalcError>;
