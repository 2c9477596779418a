//! Program - immutable postfix instruction sequence

use crate::error::ParseError;
use crate::token::Token;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A parsed expression in postfix order
///
/// Produced once by [`parse`](crate::parse) and evaluated any number of
/// times. Cloning is cheap and the instructions are shared, so one program
/// can be handed to several evaluators.
///
/// Besides operands and operators a program contains `(` markers, each one
/// opening the argument list of the call that follows its arguments.
/// `)` and `,` never appear.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    instructions: Arc<[Token]>,
    source: Arc<str>,
}

impl Program {
    pub(crate) fn from_postfix(instructions: Vec<Token>) -> Self {
        Self {
            instructions: instructions.into(),
            source: Arc::from(""),
        }
    }

    pub(crate) fn with_source(mut self, source: &str) -> Self {
        self.source = Arc::from(source);
        self
    }

    pub fn instructions(&self) -> &[Token] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The expression text this program was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names referenced, lowercased, in first-use order
    pub fn variables(&self) -> Vec<&str> {
        self.names(|token| match token {
            Token::Identifier(name) => Some(name),
            _ => None,
        })
    }

    /// Function names called, lowercased, in call order
    pub fn functions(&self) -> Vec<&str> {
        self.names(|token| match token {
            Token::Call(name) => Some(name),
            _ => None,
        })
    }

    fn names<'a>(&'a self, pick: impl Fn(&'a Token) -> Option<&'a Arc<str>>) -> Vec<&'a str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.instructions.iter().filter_map(pick) {
            let name: &str = name;
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Postfix listing for diagnostics, e.g. `a b + 2 /`
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.instructions.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_referenced_names() {
        let program: Program = "Max(cpu.temp, gpu.temp) > LIMIT ? max(cpu.temp, 0) : limit"
            .parse()
            .unwrap();
        assert_eq!(program.variables(), vec!["cpu.temp", "gpu.temp", "limit"]);
        assert_eq!(program.functions(), vec!["max"]);
    }

    #[test]
    fn test_display_numbers() {
        let program: Program = "1.5 * -2".parse().unwrap();
        assert_eq!(program.to_display_string(), "1.5 2 u- *");
        assert_eq!(program.len(), 4);
        assert!(!program.is_empty());
    }

    #[test]
    fn test_clone_shares_instructions() {
        let program: Program = "a + b".parse().unwrap();
        let copy = program.clone();
        assert!(Arc::ptr_eq(&program.instructions, &copy.instructions));
        assert_eq!(program, copy);
    }
}
