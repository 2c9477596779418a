//! Shunting-yard conversion from infix tokens to a postfix [`Program`]
//!
//! The parser is fed one token at a time. An identifier is held back until
//! the next token arrives: followed by `(` it becomes a call marker on the
//! operator stack (and a `(` scope marker in the output), otherwise it is
//! emitted as a variable reference.
//!
//! Ternaries compile so that the condition, the `then` operand and the
//! `else` operand are all evaluated, in source order, before the `?` and `:`
//! instructions select one of them.
//!
//! Operand/operator alternation is checked as tokens arrive, so a program
//! that parses always leaves exactly one value on the evaluator stack.

use crate::buffer::OrderedBuffer;
use crate::error::ParseError;
use crate::program::Program;
use crate::token::{Associativity, Name, Operator, Token};
use crate::tokenizer::{tokenize, Spanned};
use tracing::debug;

/// Parse an expression into a postfix program
///
/// # Example
/// ```
/// let program = gauge_calc::parse("(a + b) / 2").unwrap();
/// assert_eq!(program.to_display_string(), "a b + 2 /");
/// ```
pub fn parse(expression: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new();
    for spanned in tokenize(expression) {
        parser.push(spanned?)?;
    }
    let program = parser.finish()?.with_source(expression);
    debug!(
        expression,
        instructions = program.len(),
        "Expression parsed"
    );
    Ok(program)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Operand,
    Operator,
}

/// Incremental shunting-yard state
#[derive(Debug)]
pub struct Parser {
    /// Operators, `(` group markers and call markers
    operators: OrderedBuffer<Spanned>,
    output: OrderedBuffer<Token>,
    /// Identifier waiting for the next token to decide variable vs call
    lookahead: Option<(Name, usize)>,
    expect: Expect,
    /// Set directly after a call's `(` so that `f()` is accepted
    call_opened: bool,
    seen_any: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            operators: OrderedBuffer::new(),
            output: OrderedBuffer::new(),
            lookahead: None,
            expect: Expect::Operand,
            call_opened: false,
            seen_any: false,
        }
    }

    /// Feed the next token
    pub fn push(&mut self, spanned: Spanned) -> Result<(), ParseError> {
        self.seen_any = true;

        if let Some((name, call_offset)) = self.lookahead.take() {
            if spanned.token == Token::LeftParen {
                self.operators.push_back(Spanned {
                    token: Token::Call(name),
                    offset: call_offset,
                });
                self.output.push_back(Token::LeftParen);
                self.expect = Expect::Operand;
                self.call_opened = true;
                return Ok(());
            }
            self.output.push_back(Token::Identifier(name));
        }

        let call_opened = std::mem::take(&mut self.call_opened);
        let Spanned { token, offset } = spanned;

        match token {
            Token::Number(_) => {
                self.require(Expect::Operand, &token, offset)?;
                self.output.push_back(token);
                self.expect = Expect::Operator;
            },
            Token::Identifier(name) => {
                if self.expect != Expect::Operand {
                    return Err(ParseError::unexpected(name, offset));
                }
                self.lookahead = Some((name, offset));
                self.expect = Expect::Operator;
            },
            Token::LeftParen => {
                self.require(Expect::Operand, &token, offset)?;
                self.operators.push_back(Spanned { token, offset });
            },
            Token::RightParen => {
                if !call_opened {
                    self.require(Expect::Operator, &token, offset)?;
                }
                self.close_group(offset)?;
                self.expect = Expect::Operator;
            },
            Token::Comma => {
                self.require(Expect::Operator, &token, offset)?;
                self.close_argument(offset)?;
                self.expect = Expect::Operand;
            },
            Token::Operator(op @ Operator::Unary(_)) => {
                self.require(Expect::Operand, &token, offset)?;
                self.push_operator(op, offset);
            },
            Token::Operator(Operator::Else) => {
                self.require(Expect::Operator, &token, offset)?;
                self.close_if(offset)?;
                self.operators.push_back(Spanned { token, offset });
                self.expect = Expect::Operand;
            },
            Token::Operator(op) => {
                self.require(Expect::Operator, &token, offset)?;
                self.push_operator(op, offset);
                self.expect = Expect::Operand;
            },
            Token::Call(_) => return Err(ParseError::unexpected(&token, offset)),
        }
        Ok(())
    }

    /// Drain the operator stack and produce the program
    pub fn finish(mut self) -> Result<Program, ParseError> {
        if let Some((name, _)) = self.lookahead.take() {
            self.output.push_back(Token::Identifier(name));
        }
        if !self.seen_any {
            return Err(ParseError::EmptyExpression);
        }
        if self.expect == Expect::Operand {
            return Err(ParseError::UnexpectedEnd);
        }

        while let Some(Spanned { token, offset }) = self.operators.pop_back() {
            match token {
                Token::LeftParen | Token::Call(_) => {
                    return Err(ParseError::MismatchedParenthesis { position: offset })
                },
                Token::Operator(Operator::If) => {
                    return Err(ParseError::UnmatchedIf { position: offset })
                },
                token => self.output.push_back(token),
            }
        }

        Ok(Program::from_postfix(self.output.into_vec()))
    }

    fn require(&self, expect: Expect, token: &Token, offset: usize) -> Result<(), ParseError> {
        if self.expect == expect {
            Ok(())
        } else {
            Err(ParseError::unexpected(token, offset))
        }
    }

    fn top_operator(&self) -> Option<Operator> {
        match self.operators.back() {
            Some(Spanned {
                token: Token::Operator(op),
                ..
            }) => Some(*op),
            _ => None,
        }
    }

    /// Pop everything that binds tighter than `op`, then push it
    ///
    /// Group and call markers are not operators, so popping stops at them.
    fn push_operator(&mut self, op: Operator, offset: usize) {
        let (rank, _) = op.binding();
        while let Some(top) = self.top_operator() {
            let (top_rank, top_assoc) = top.binding();
            let pops = top_rank < rank || (top_rank == rank && top_assoc == Associativity::Left);
            if !pops {
                break;
            }
            self.operators.pop_back();
            self.output.push_back(Token::Operator(top));
        }
        self.operators.push_back(Spanned {
            token: Token::Operator(op),
            offset,
        });
    }

    /// `)`: pop to the matching `(` or call marker
    fn close_group(&mut self, offset: usize) -> Result<(), ParseError> {
        loop {
            match self.operators.pop_back() {
                None => return Err(ParseError::MismatchedParenthesis { position: offset }),
                Some(Spanned {
                    token: Token::LeftParen,
                    ..
                }) => return Ok(()),
                Some(Spanned {
                    token: Token::Call(name),
                    ..
                }) => {
                    self.output.push_back(Token::Call(name));
                    return Ok(());
                },
                // A ternary must close before its enclosing group
                Some(Spanned {
                    token: Token::Operator(Operator::If),
                    ..
                }) => return Err(ParseError::MismatchedParenthesis { position: offset }),
                Some(Spanned { token, .. }) => self.output.push_back(token),
            }
        }
    }

    /// `,`: pop to the enclosing call marker, leaving it in place
    fn close_argument(&mut self, offset: usize) -> Result<(), ParseError> {
        loop {
            match self.operators.back().map(|spanned| &spanned.token) {
                Some(Token::Call(_)) => return Ok(()),
                Some(Token::Operator(Operator::If)) => {
                    return Err(ParseError::MismatchedParenthesis { position: offset })
                },
                Some(Token::LeftParen) | None => return Err(ParseError::unexpected(",", offset)),
                Some(_) => {
                    if let Some(spanned) = self.operators.pop_back() {
                        self.output.push_back(spanned.token);
                    }
                },
            }
        }
    }

    /// `:`: pop up to and including the matching `?`
    fn close_if(&mut self, offset: usize) -> Result<(), ParseError> {
        loop {
            match self.operators.pop_back() {
                Some(Spanned {
                    token: Token::Operator(Operator::If),
                    ..
                }) => {
                    self.output.push_back(Token::Operator(Operator::If));
                    return Ok(());
                },
                None
                | Some(Spanned {
                    token: Token::LeftParen | Token::Call(_),
                    ..
                }) => return Err(ParseError::UnmatchedElse { position: offset }),
                Some(Spanned { token, .. }) => self.output.push_back(token),
            }
        }
    }
}
