//! Expression parser.
//!
//! Infix modes share one Pratt parser and differ only in binding powers;
//! reverse Polish input has its own stack based reader.

use super::functions;
use super::lexer::{tokenize, Token, TokenKind};
use super::number::Number;
use super::options::ParsingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Number),
    Ident(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Factorial(Box<Expr>),
    Call(String, Vec<Expr>),
    /// `expr to unit`
    Convert(Box<Expr>, String),
}

impl Expr {
    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
}

pub fn parse(input: &str, mode: ParsingMode) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty expression.".to_string());
    }
    match mode {
        ParsingMode::Rpn => parse_rpn(tokens),
        mode => {
            let mut parser = Parser {
                tokens,
                pos: 0,
                mode,
                nesting: 0,
            };
            let (expr, _) = parser.expression(0)?;
            match parser.peek() {
                None => Ok(expr),
                Some(token) => Err(format!("Misplaced \"{}\".", token.kind)),
            }
        }
    }
}

const CONVERT_BP: u8 = 1;
const PREFIX_BP: u8 = 30;
const POSTFIX_BP: u8 = 60;

/// Deepest expression tree accepted; evaluation recurses once per level
pub const MAX_DEPTH: usize = 256;
pub const TOO_DEEP: &str = "Expression is too deeply nested.";

/// An expression and the depth of its tree
type Node = (Expr, usize);

fn deeper(depth: usize) -> Result<usize, String> {
    if depth >= MAX_DEPTH {
        Err(TOO_DEEP.to_string())
    } else {
        Ok(depth + 1)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    mode: ParsingMode,
    /// Current recursion depth of `expression`
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expression(&mut self, min_bp: u8) -> Result<Node, String> {
        self.nesting = deeper(self.nesting)?;
        let node = self.expression_inner(min_bp);
        self.nesting -= 1;
        node
    }

    fn expression_inner(&mut self, min_bp: u8) -> Result<Node, String> {
        let (mut lhs, mut depth) = self.prefix()?;

        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Bang {
                if POSTFIX_BP < min_bp {
                    break;
                }
                self.pos += 1;
                depth = deeper(depth)?;
                lhs = Expr::Factorial(Box::new(lhs));
                continue;
            }

            if token.kind == TokenKind::Convert {
                if CONVERT_BP < min_bp {
                    break;
                }
                self.pos += 1;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::Ident(unit),
                        ..
                    }) => {
                        depth = deeper(depth)?;
                        lhs = Expr::Convert(Box::new(lhs), unit);
                    }
                    _ => return Err("Expected a unit after \"to\".".to_string()),
                }
                continue;
            }

            let Some((op, lbp, rbp, implicit)) = self.infix(token) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            if !implicit {
                self.pos += 1;
            }
            let (rhs, rhs_depth) = self.expression(rbp)?;
            depth = deeper(depth.max(rhs_depth))?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok((lhs, depth))
    }

    /// Operator, left and right binding power, and whether the operator is
    /// an implicit multiplication (no token to consume)
    fn infix(&self, token: &Token) -> Option<(BinOp, u8, u8, bool)> {
        let (op, implicit) = match token.kind {
            TokenKind::Plus => (BinOp::Add, false),
            TokenKind::Minus => (BinOp::Sub, false),
            TokenKind::Star => (BinOp::Mul, false),
            TokenKind::Slash => (BinOp::Div, false),
            TokenKind::Percent => (BinOp::Rem, false),
            TokenKind::Caret => (BinOp::Pow, false),
            TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::LParen => (BinOp::Mul, true),
            _ => return None,
        };

        if self.mode == ParsingMode::Chain {
            return Some((op, 10, 11, implicit));
        }

        let (lbp, rbp) = match op {
            BinOp::Add | BinOp::Sub => (10, 11),
            BinOp::Pow => (41, 40),
            _ if implicit => match self.mode {
                ParsingMode::ImplicitFirst => (25, 26),
                ParsingMode::Adaptive if !token.space_before => (25, 26),
                _ => (20, 21),
            },
            _ => (20, 21),
        };
        Some((op, lbp, rbp, implicit))
    }

    fn prefix(&mut self) -> Result<Node, String> {
        let Some(token) = self.next() else {
            return Err("Missing operand.".to_string());
        };

        match token.kind {
            TokenKind::Number(text) => Ok((number_literal(&text)?, 1)),
            TokenKind::Ident(name) => {
                if self.peek().map(|t| &t.kind) == Some(&TokenKind::LParen) {
                    self.pos += 1;
                    let (args, depth) = self.arguments()?;
                    Ok((Expr::Call(name, args), deeper(depth)?))
                } else {
                    Ok((Expr::Ident(name), 1))
                }
            }
            TokenKind::LParen => {
                let inner = self.expression(0)?;
                // a missing closing parenthesis at the end is forgiven
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    })
                    | None => Ok(inner),
                    Some(other) => Err(format!("Misplaced \"{}\".", other.kind)),
                }
            }
            TokenKind::Minus => {
                let (inner, depth) = self.expression(PREFIX_BP)?;
                Ok((Expr::Neg(Box::new(inner)), deeper(depth)?))
            }
            TokenKind::Plus => self.expression(PREFIX_BP),
            other => Err(format!("Misplaced \"{}\".", other)),
        }
    }

    /// Comma separated arguments after an opening parenthesis, with the
    /// depth of the deepest one
    fn arguments(&mut self) -> Result<(Vec<Expr>, usize), String> {
        let mut args = Vec::new();
        let mut depth = 0;
        if self.peek().map(|t| &t.kind) == Some(&TokenKind::RParen) {
            self.pos += 1;
            return Ok((args, depth));
        }
        loop {
            let (arg, arg_depth) = self.expression(0)?;
            args.push(arg);
            depth = depth.max(arg_depth);
            match self.next() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                })
                | None => return Ok((args, depth)),
                Some(other) => return Err(format!("Misplaced \"{}\".", other.kind)),
            }
        }
    }
}

fn number_literal(text: &str) -> Result<Expr, String> {
    Number::parse_decimal(text)
        .map(Expr::Number)
        .ok_or_else(|| format!("Invalid number \"{}\".", text))
}

fn parse_rpn(tokens: Vec<Token>) -> Result<Expr, String> {
    let mut stack: Vec<Node> = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let op = match token.kind {
            TokenKind::Number(text) => {
                stack.push((number_literal(&text)?, 1));
                continue;
            }
            TokenKind::Ident(name) => {
                match functions::arity(&name) {
                    Some(arity) => {
                        if stack.len() < arity {
                            return Err("Missing operand.".to_string());
                        }
                        let operands = stack.split_off(stack.len() - arity);
                        let depth = operands.iter().map(|(_, depth)| *depth).max().unwrap_or(0);
                        let args = operands.into_iter().map(|(arg, _)| arg).collect();
                        stack.push((Expr::Call(name, args), deeper(depth)?));
                    }
                    None => stack.push((Expr::Ident(name), 1)),
                }
                continue;
            }
            TokenKind::Minus => {
                // "-3" directly attached to a number is a literal
                let attached = iter
                    .peek()
                    .is_some_and(|t| !t.space_before && matches!(t.kind, TokenKind::Number(_)));
                if attached {
                    if let Some(Token {
                        kind: TokenKind::Number(text),
                        ..
                    }) = iter.next()
                    {
                        stack.push((Expr::Neg(Box::new(number_literal(&text)?)), 2));
                    }
                    continue;
                }
                BinOp::Sub
            }
            TokenKind::Bang => {
                let (operand, depth) = stack.pop().ok_or("Missing operand.")?;
                stack.push((Expr::Factorial(Box::new(operand)), deeper(depth)?));
                continue;
            }
            TokenKind::Convert => {
                let (operand, depth) = stack.pop().ok_or("Missing operand.")?;
                match iter.next() {
                    Some(Token {
                        kind: TokenKind::Ident(unit),
                        ..
                    }) => stack.push((Expr::Convert(Box::new(operand), unit), deeper(depth)?)),
                    _ => return Err("Expected a unit after \"to\".".to_string()),
                }
                continue;
            }
            TokenKind::Plus => BinOp::Add,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Rem,
            TokenKind::Caret => BinOp::Pow,
            TokenKind::LParen | TokenKind::RParen | TokenKind::Comma => continue,
        };

        let (rhs, rhs_depth) = stack.pop().ok_or("Missing operand.")?;
        let (lhs, lhs_depth) = stack.pop().ok_or("Missing operand.")?;
        stack.push((Expr::binary(op, lhs, rhs), deeper(lhs_depth.max(rhs_depth))?));
    }

    match stack.len() {
        1 => stack
            .pop()
            .map(|(expr, _)| expr)
            .ok_or_else(|| "Missing operand.".to_string()),
        0 => Err("Missing operand.".to_string()),
        n => Err(format!("{} values left on the stack, expected one.", n)),
    }
}
