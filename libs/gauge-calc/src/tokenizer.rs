//! Tokenizer - lazy character-class state machine
//!
//! Characters are grouped into runs (digits, names, symbols). A change of
//! character class or any whitespace ends the current run, which is then
//! flushed as one or more tokens. Symbol runs are split by maximal munch
//! against the operator table, so `>=-` becomes `>=` followed by `-`.
//!
//! `+` and `-` are resolved to their prefix forms here, with one token of
//! lookbehind: they are binary only after a number, a name or `)`.

use crate::buffer::OrderedBuffer;
use crate::error::ParseError;
use crate::token::{self, Name, Operator, Token};
use std::iter::FusedIterator;
use std::str::CharIndices;

/// A token plus the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unknown,
    Number,
    NumberWithDot,
    Identifier,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Letter,
    Dot,
    Whitespace,
    Symbol,
    Other,
}

fn classify(c: char) -> CharClass {
    if c.is_ascii_digit() {
        CharClass::Digit
    } else if c.is_alphabetic() || c == '_' {
        CharClass::Letter
    } else if c == '.' {
        CharClass::Dot
    } else if c.is_whitespace() {
        CharClass::Whitespace
    } else if token::is_symbol_char(c) {
        CharClass::Symbol
    } else {
        CharClass::Other
    }
}

impl State {
    /// State after consuming `class`, or `None` if the current run ends here
    fn advance(self, class: CharClass) -> Option<State> {
        use CharClass::*;

        match (self, class) {
            (State::Number, Digit) => Some(State::Number),
            (State::Number, Dot) => Some(State::NumberWithDot),
            // A second dot still belongs to the numeral; it fails at flush
            (State::NumberWithDot, Digit | Dot) => Some(State::NumberWithDot),
            (State::Identifier, Letter | Digit | Dot) => Some(State::Identifier),
            (State::Operator, Symbol) => Some(State::Operator),
            _ => None,
        }
    }

    /// State that starts a run with `class`
    fn start(class: CharClass) -> State {
        match class {
            CharClass::Digit => State::Number,
            CharClass::Dot => State::NumberWithDot,
            CharClass::Letter => State::Identifier,
            CharClass::Symbol => State::Operator,
            CharClass::Whitespace | CharClass::Other => State::Unknown,
        }
    }
}

/// Lazy token stream over an expression
pub struct Tokenizer<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
    state: State,
    run_start: usize,
    /// Tokens flushed but not yet handed out; one run may yield several
    pending: OrderedBuffer<Spanned>,
    previous_ends_operand: bool,
    finished: bool,
}

/// Tokenize `expression` lazily
pub fn tokenize(expression: &str) -> Tokenizer<'_> {
    Tokenizer::new(expression)
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            state: State::Unknown,
            run_start: 0,
            pending: OrderedBuffer::new(),
            previous_ends_operand: false,
            finished: false,
        }
    }

    /// Consume one character, flushing the current run if it ends
    fn step(&mut self, offset: usize, c: char) -> Result<(), ParseError> {
        let class = classify(c);
        if class == CharClass::Other {
            return Err(ParseError::UnexpectedCharacter {
                ch: c,
                position: offset,
            });
        }

        if let Some(next) = self.state.advance(class) {
            self.state = next;
            return Ok(());
        }

        self.flush(offset)?;
        self.state = State::start(class);
        self.run_start = offset;
        Ok(())
    }

    /// Turn the run `run_start..end` into tokens
    fn flush(&mut self, end: usize) -> Result<(), ParseError> {
        let start = self.run_start;
        let source = self.source;
        let run = &source[start..end];
        let state = std::mem::replace(&mut self.state, State::Unknown);

        match state {
            State::Unknown => Ok(()),
            State::Number | State::NumberWithDot => {
                let value = run
                    .parse::<f64>()
                    .map_err(|_| ParseError::MalformedNumber {
                        text: run.to_string(),
                        position: start,
                    })?;
                self.emit(Token::Number(value), start);
                Ok(())
            },
            State::Identifier => {
                let name: Name = Name::from(run.to_lowercase());
                self.emit(Token::Identifier(name), start);
                Ok(())
            },
            State::Operator => self.munch(run, start),
        }
    }

    /// Split a symbol run into operators and punctuation, longest match first
    fn munch(&mut self, run: &str, start: usize) -> Result<(), ParseError> {
        // Symbol characters are ASCII, so byte slicing is char-aligned
        let mut offset = 0;
        while offset < run.len() {
            let rest = &run[offset..];
            let mut len = rest.len().min(token::MAX_SYMBOL_LEN);
            let token = loop {
                if len == 0 {
                    return Err(ParseError::UnknownOperator {
                        symbol: rest.to_string(),
                        position: start + offset,
                    });
                }
                if let Some(token) = self.symbol(&rest[..len]) {
                    break token;
                }
                len -= 1;
            };
            self.emit(token, start + offset);
            offset += len;
        }
        Ok(())
    }

    fn symbol(&self, candidate: &str) -> Option<Token> {
        token::punctuation(candidate).or_else(|| {
            Operator::from_symbol(candidate, !self.previous_ends_operand).map(Token::Operator)
        })
    }

    fn emit(&mut self, token: Token, offset: usize) {
        self.previous_ends_operand = token.ends_operand();
        self.pending.push_back(Spanned { token, offset });
    }

    fn fail(&mut self, error: ParseError) -> Option<Result<Spanned, ParseError>> {
        self.finished = true;
        self.pending.clear_and_release();
        Some(Err(error))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Spanned, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(spanned) = self.pending.pop_front() {
                return Some(Ok(spanned));
            }
            if self.finished {
                return None;
            }
            match self.chars.next() {
                Some((offset, c)) => {
                    if let Err(e) = self.step(offset, c) {
                        return self.fail(e);
                    }
                },
                None => {
                    self.finished = true;
                    if let Err(e) = self.flush(self.source.len()) {
                        return self.fail(e);
                    }
                },
            }
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::token::{BinaryOp, UnaryOp};

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .map(|r| r.map(|s| s.token))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn ident(name: &str) -> Token {
        Token::Identifier(Name::from(name))
    }

    fn bin(op: BinaryOp) -> Token {
        Token::Operator(Operator::Binary(op))
    }

    fn un(op: UnaryOp) -> Token {
        Token::Operator(Operator::Unary(op))
    }

    #[test]
    fn test_numbers_and_names() {
        assert_eq!(
            tokens("12 3.5 .25 Cpu.Temp_1"),
            vec![
                Token::Number(12.0),
                Token::Number(3.5),
                Token::Number(0.25),
                ident("cpu.temp_1"),
            ]
        );
    }

    #[test]
    fn test_offsets() {
        let spans: Vec<_> = tokenize("ab + 12").map(Result::unwrap).collect();
        assert_eq!(
            spans.iter().map(|s| s.offset).collect::<Vec<_>>(),
            vec![0, 3, 5]
        );
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            tokens("a>=-1"),
            vec![
                ident("a"),
                bin(BinaryOp::GreaterEqual),
                un(UnaryOp::Minus),
                Token::Number(1.0)
            ]
        );
        assert_eq!(
            tokens("a<<2||b!=c"),
            vec![
                ident("a"),
                bin(BinaryOp::ShiftLeft),
                Token::Number(2.0),
                bin(BinaryOp::Or),
                ident("b"),
                bin(BinaryOp::NotEqual),
                ident("c"),
            ]
        );
    }

    #[test]
    fn test_punctuation_inside_symbol_run() {
        assert_eq!(
            tokens("f(-(x),y)*2"),
            vec![
                ident("f"),
                Token::LeftParen,
                un(UnaryOp::Minus),
                Token::LeftParen,
                ident("x"),
                Token::RightParen,
                Token::Comma,
                ident("y"),
                Token::RightParen,
                bin(BinaryOp::Multiply),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_unary_disambiguation() {
        assert_eq!(
            tokens("3 - -2"),
            vec![
                Token::Number(3.0),
                bin(BinaryOp::Subtract),
                un(UnaryOp::Minus),
                Token::Number(2.0)
            ]
        );
        assert_eq!(
            tokens("-3"),
            vec![un(UnaryOp::Minus), Token::Number(3.0)]
        );
        assert_eq!(
            tokens("a--1"),
            vec![
                ident("a"),
                bin(BinaryOp::Subtract),
                un(UnaryOp::Minus),
                Token::Number(1.0)
            ]
        );
        assert_eq!(
            tokens("(a)+b"),
            vec![
                Token::LeftParen,
                ident("a"),
                Token::RightParen,
                bin(BinaryOp::Add),
                ident("b")
            ]
        );
        assert_eq!(
            tokens("+x"),
            vec![un(UnaryOp::Plus), ident("x")]
        );
    }

    #[test]
    fn test_ternary_symbols() {
        assert_eq!(
            tokens("x>0?y:-z"),
            vec![
                ident("x"),
                bin(BinaryOp::Greater),
                Token::Number(0.0),
                Token::Operator(Operator::If),
                ident("y"),
                Token::Operator(Operator::Else),
                un(UnaryOp::Minus),
                ident("z"),
            ]
        );
    }

    #[test]
    fn test_whitespace_splits_symbols() {
        let err = tokenize("a > = b").find_map(Result::err).unwrap();
        assert_eq!(
            err,
            ParseError::UnknownOperator {
                symbol: "=".to_string(),
                position: 4
            }
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a # b").find_map(Result::err).unwrap();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                ch: '#',
                position: 2
            }
        );
    }

    #[test]
    fn test_malformed_number() {
        let err = tokenize("1.2.3 + 1").find_map(Result::err).unwrap();
        assert_eq!(
            err,
            ParseError::MalformedNumber {
                text: "1.2.3".to_string(),
                position: 0
            }
        );
        assert!(matches!(
            tokenize(".").find_map(Result::err),
            Some(ParseError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn test_stream_is_fused_after_error() {
        let mut stream = tokenize("1 $ 2");
        assert_eq!(stream.next().unwrap().unwrap().token, Token::Number(1.0));
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(tokens("").is_empty());
        assert!(tokens("  \t ").is_empty());
    }
}
