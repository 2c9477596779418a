//! Token model and the static operator table
//!
//! Precedence ranks: lower binds tighter. Unary operators and function
//! application share the tightest rank and associate to the right; the
//! argument separator binds loosest.

use std::fmt;
use std::sync::Arc;

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    /// Logical not, `!`
    Not,
    /// Bitwise complement, `~`
    BitNot,
}

/// Number of [`UnaryOp`] variants
pub const UNARY_COUNT: usize = 4;

/// Number of [`BinaryOp`] variants
pub const BINARY_COUNT: usize = 18;

impl UnaryOp {
    pub const ALL: [UnaryOp; UNARY_COUNT] = [Self::Plus, Self::Minus, Self::Not, Self::BitNot];

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Infix operators taking two operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; BINARY_COUNT] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Modulo,
        Self::And,
        Self::Or,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::ShiftLeft,
        Self::ShiftRight,
        Self::Greater,
        Self::GreaterEqual,
        Self::Less,
        Self::LessEqual,
        Self::Equal,
        Self::NotEqual,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Every operator kind the language knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Ternary condition, `?`
    If,
    /// Ternary alternative, `:`
    Else,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Rank shared by unary operators and function application
pub const TIGHTEST_RANK: u8 = 1;

/// Rank of the argument separator
pub const COMMA_RANK: u8 = 13;

impl Operator {
    /// Precedence rank and associativity
    pub const fn binding(self) -> (u8, Associativity) {
        use Associativity::{Left, Right};
        use BinaryOp::*;

        match self {
            Self::Unary(_) => (TIGHTEST_RANK, Right),
            Self::Binary(op) => match op {
                Multiply | Divide | Modulo => (2, Left),
                Add | Subtract => (3, Left),
                ShiftLeft | ShiftRight => (4, Left),
                Greater | GreaterEqual | Less | LessEqual => (5, Left),
                Equal | NotEqual => (6, Left),
                BitAnd => (7, Left),
                BitXor => (8, Left),
                BitOr => (9, Left),
                And => (10, Left),
                Or => (11, Left),
            },
            Self::If | Self::Else => (12, Right),
        }
    }

    pub const fn rank(self) -> u8 {
        self.binding().0
    }

    pub const fn associativity(self) -> Associativity {
        self.binding().1
    }

    /// Operands consumed at evaluation time
    pub const fn arity(self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_) | Self::If => 2,
            Self::Else => 1,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Unary(op) => op.symbol(),
            Self::Binary(op) => op.symbol(),
            Self::If => "?",
            Self::Else => ":",
        }
    }

    /// Look up a symbol, choosing the prefix form of `+`/`-` when `prefix` is set
    pub fn from_symbol(symbol: &str, prefix: bool) -> Option<Self> {
        let op = match symbol {
            "+" if prefix => Self::Unary(UnaryOp::Plus),
            "-" if prefix => Self::Unary(UnaryOp::Minus),
            "!" => Self::Unary(UnaryOp::Not),
            "~" => Self::Unary(UnaryOp::BitNot),
            "?" => Self::If,
            ":" => Self::Else,
            _ => {
                let binary = BinaryOp::ALL.iter().find(|op| op.symbol() == symbol)?;
                Self::Binary(*binary)
            },
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Keep prefix signs distinguishable in postfix listings
            Self::Unary(UnaryOp::Plus) => f.write_str("u+"),
            Self::Unary(UnaryOp::Minus) => f.write_str("u-"),
            other => f.write_str(other.symbol()),
        }
    }
}

/// Lowercased identifier, cheap to clone into the program
pub type Name = Arc<str>;

/// A lexical unit, also the instruction format of a compiled [`Program`](crate::Program)
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// Variable reference
    Identifier(Name),
    /// Function application; produced by the parser, never by the tokenizer
    Call(Name),
    Operator(Operator),
    /// Group open; inside a program it marks the start of a call's arguments
    LeftParen,
    RightParen,
    Comma,
}

impl Token {
    /// True for tokens after which `+`/`-` is a binary operator
    pub fn ends_operand(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Identifier(_) | Self::RightParen)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Identifier(name) => f.write_str(name),
            Self::Call(name) => write!(f, "{}()", name),
            Self::Operator(op) => write!(f, "{}", op),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
        }
    }
}

/// Structural symbols that are not operators
pub(crate) fn punctuation(symbol: &str) -> Option<Token> {
    match symbol {
        "(" => Some(Token::LeftParen),
        ")" => Some(Token::RightParen),
        "," => Some(Token::Comma),
        _ => None,
    }
}

/// Characters that may appear in an operator or punctuation run
pub(crate) fn is_symbol_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '!' | '~' | '&' | '|' | '^' | '<' | '>' | '=' | '?' | ':'
            | '(' | ')' | ','
    )
}

/// Longest symbol in the table, bounds the maximal-munch window
pub(crate) const MAX_SYMBOL_LEN: usize = 2;
