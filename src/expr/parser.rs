//! Pratt parser for binding expressions.
//!
//! Grammar, loosest to tightest:
//!
//! ```text
//! program     := sequence (';' sequence)* ';'?
//! sequence    := assignment (',' assignment)*
//! assignment  := conditional (('=' | '+=' | '-=' | '*=' | '/=') assignment)?
//! conditional := binary ('?' assignment ':' assignment)?
//! binary      := unary (op unary)*          -- precedence climbing
//! unary       := ('!' | '-' | '+' | 'typeof' | 'void' | '++' | '--') unary | postfix
//! postfix     := call ('++' | '--')?
//! call        := primary ('.' ident | '[' sequence ']' | '(' args ')')*
//! ```

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};
use crate::error::ParseError;
use crate::types::Value;

/// Parse a full expression or handler body.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.program()
}

/// Deepest expression nesting accepted before parsing gives up.
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix(punct: &str) -> Option<(u8, Infix)> {
    let entry = match punct {
        "??" => (1, Infix::Logical(LogicalOp::Nullish)),
        "||" => (2, Infix::Logical(LogicalOp::Or)),
        "&&" => (3, Infix::Logical(LogicalOp::And)),
        "==" => (4, Infix::Binary(BinaryOp::Eq)),
        "!=" => (4, Infix::Binary(BinaryOp::NotEq)),
        "===" => (4, Infix::Binary(BinaryOp::StrictEq)),
        "!==" => (4, Infix::Binary(BinaryOp::StrictNotEq)),
        "<" => (5, Infix::Binary(BinaryOp::Lt)),
        "<=" => (5, Infix::Binary(BinaryOp::Le)),
        ">" => (5, Infix::Binary(BinaryOp::Gt)),
        ">=" => (5, Infix::Binary(BinaryOp::Ge)),
        "+" => (6, Infix::Binary(BinaryOp::Add)),
        "-" => (6, Infix::Binary(BinaryOp::Sub)),
        "*" => (7, Infix::Binary(BinaryOp::Mul)),
        "/" => (7, Infix::Binary(BinaryOp::Div)),
        "%" => (7, Infix::Binary(BinaryOp::Rem)),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and we never advance past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn peek_punct(&self) -> Option<&'static str> {
        match self.peek().kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.peek_punct() == Some(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ParseError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}'", punct)))
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Descend one nesting level; fails past [`MAX_DEPTH`].
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new("expression nested too deeply", self.peek().offset));
        }
        Ok(())
    }

    fn unexpected(&self, context: &str) -> ParseError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Number(n) => Value::Number(*n).to_string(),
            TokenKind::String(s) => format!("'{}'", s),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Punct(p) => p.to_string(),
            TokenKind::Eof => "end of input".to_string(),
        };
        ParseError::new(format!("{}, found {}", context, found), token.offset)
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    fn program(&mut self) -> Result<Expr, ParseError> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            if self.eat(";") {
                continue;
            }
            statements.push(self.sequence()?);
            if !self.at_eof() {
                self.expect(";")?;
            }
        }
        Ok(match statements.len() {
            0 => Expr::Literal(Value::Undefined),
            1 => statements.remove(0),
            _ => Expr::Sequence(statements),
        })
    }

    fn sequence(&mut self) -> Result<Expr, ParseError> {
        let first = self.assignment()?;
        if self.peek_punct() != Some(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(",") {
            items.push(self.assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = self.assignment_inner();
        self.depth -= 1;
        result
    }

    fn assignment_inner(&mut self) -> Result<Expr, ParseError> {
        let offset = self.peek().offset;
        let target = self.conditional()?;

        let op = match self.peek_punct() {
            Some("=") => AssignOp::Set,
            Some("+=") => AssignOp::Add,
            Some("-=") => AssignOp::Sub,
            Some("*=") => AssignOp::Mul,
            Some("/=") => AssignOp::Div,
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(ParseError::new("invalid assignment target", offset));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.binary(0)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        let mut nested = 0;
        loop {
            let Some((prec, op)) = self.peek_punct().and_then(infix) else {
                break;
            };
            if prec <= min_prec {
                break;
            }
            self.enter()?;
            nested += 1;
            self.advance();
            let right = self.binary(prec)?;
            left = match op {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        self.depth -= nested;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = self.unary_inner();
        self.depth -= 1;
        result
    }

    fn unary_inner(&mut self) -> Result<Expr, ParseError> {
        let op = match &self.peek().kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Ident(name) if name == "typeof" => Some(UnaryOp::TypeOf),
            TokenKind::Ident(name) if name == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        if let Some(p @ ("++" | "--")) = self.peek_punct() {
            let offset = self.peek().offset;
            self.advance();
            let target = self.unary()?;
            if !target.is_assignable() {
                return Err(ParseError::new("invalid update target", offset));
            }
            return Ok(Expr::Update {
                increment: p == "++",
                prefix: true,
                target: Box::new(target),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let offset = self.peek().offset;
        let expr = self.call()?;
        if let Some(p @ ("++" | "--")) = self.peek_punct() {
            if !expr.is_assignable() {
                return Err(ParseError::new("invalid update target", offset));
            }
            self.advance();
            return Ok(Expr::Update {
                increment: p == "++",
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        let mut nested = 0;
        loop {
            if matches!(self.peek_punct(), Some("." | "[" | "(")) {
                self.enter()?;
                nested += 1;
            }
            if self.eat(".") {
                let property = match self.advance().kind {
                    TokenKind::Ident(name) => name,
                    _ => return Err(self.unexpected("expected property name")),
                };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat("[") {
                let index = self.sequence()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat("(") {
                let mut args = Vec::new();
                while !self.eat(")") {
                    args.push(self.assignment()?);
                    if !self.eat(",") {
                        self.expect(")")?;
                        break;
                    }
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        self.depth -= nested;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "undefined" => Expr::Literal(Value::Undefined),
                    "NaN" => Expr::Literal(Value::Number(f64::NAN)),
                    "Infinity" => Expr::Literal(Value::Number(f64::INFINITY)),
                    _ => Expr::Ident(name),
                })
            }
            TokenKind::Punct("(") => {
                self.advance();
                let inner = self.sequence()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => {
                self.advance();
                self.array_literal()
            }
            TokenKind::Punct("{") => {
                self.advance();
                self.object_literal()
            }
            _ => Err(self.unexpected("expected expression")),
        }
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        while !self.eat("]") {
            items.push(self.assignment()?);
            if !self.eat(",") {
                self.expect("]")?;
                break;
            }
        }
        Ok(Expr::Array(items))
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        while !self.eat("}") {
            let token = self.advance();
            let (key, shorthand) = match token.kind {
                TokenKind::Ident(name) => (name, true),
                TokenKind::String(s) => (s, false),
                TokenKind::Number(n) => (Value::Number(n).to_string(), false),
                _ => {
                    return Err(ParseError::new("expected property key", token.offset));
                }
            };

            let value = if self.eat(":") {
                self.assignment()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("expected ':'"));
            };
            entries.push((key, value));

            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.into()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::Logical {
                op: LogicalOp::Or,
                left: ident("a"),
                right: Box::new(Expr::Logical {
                    op: LogicalOp::And,
                    left: ident("b"),
                    right: ident("c"),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("a - b - c").unwrap();
        let Expr::Binary { left, .. } = expr else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn test_postfix_update() {
        assert_eq!(
            parse("count++").unwrap(),
            Expr::Update {
                increment: true,
                prefix: false,
                target: ident("count"),
            }
        );
    }

    #[test]
    fn test_object_literal_with_shorthand_and_quoted_keys() {
        let expr = parse("{active: foo, 'is-big': true, bar}").unwrap();
        let Expr::Object(entries) = expr else {
            panic!("expected object");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["active", "is-big", "bar"]);
        assert_eq!(entries[2].1, Expr::Ident("bar".into()));
    }

    #[test]
    fn test_statements_and_empty_source() {
        assert!(matches!(parse("a = 1; b = 2;").unwrap(), Expr::Sequence(items) if items.len() == 2));
        assert_eq!(parse("").unwrap(), Expr::Literal(Value::Undefined));
        assert_eq!(parse("  ;  ").unwrap(), Expr::Literal(Value::Undefined));
    }

    #[test]
    fn test_member_index_call_chain() {
        let expr = parse("items[0].name.toUpperCase()").unwrap();
        let Expr::Call { callee, args } = expr else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        assert!(matches!(*callee, Expr::Member { ref property, .. } if property == "toUpperCase"));
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(parse("1 = 2").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("5++").is_err());
        assert!(parse("{a: 1").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let error = parse(&parens).unwrap_err();
        assert!(error.to_string().contains("nested too deeply"));

        assert!(parse(&"[".repeat(50_000)).is_err());
        assert!(parse(&format!("{}x", "!".repeat(50_000))).is_err());
        assert!(parse(&vec!["1"; 50_000].join(" + ")).is_err());
        assert!(parse(&format!("a{}", ".b".repeat(50_000))).is_err());

        let fine = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert!(parse(&fine).is_ok());
    }
}
