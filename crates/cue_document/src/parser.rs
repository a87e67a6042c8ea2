//! Recursive descent parser producing the syntax tree in [`crate::ast`].

use std::str::FromStr;

use serde_json::{Number, Value};

use crate::ast::{Alternative, Decl, Expr, Field, Kind, Label, LabelKind, SourceFile};
use crate::errors::{Error, Result};
use crate::evaluator::MAX_DEPTH;
use crate::lexer::{tokenize, Spanned, Token};

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

/// Keywords of the full language whose constructs are outside the supported subset.
const UNSUPPORTED_KEYWORDS: &[&str] = &["import", "for", "if", "let", "in"];

pub(crate) fn parse(source: &str) -> Result<SourceFile> {
    let tokens = tokenize(source)?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .file()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Open structs, lists, parentheses and shorthand labels.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let (line, column) = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        Error::Compile {
            line,
            column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error(format!(
            "expected {expected}, found {}",
            self.peek().describe()
        ))
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!(
                "document nested too deeply (limit {MAX_DEPTH})"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn skip_commas(&mut self) {
        while *self.peek() == Token::Comma {
            self.advance();
        }
    }

    fn file(mut self) -> Result<SourceFile> {
        self.skip_commas();
        while *self.peek() == Token::Attribute {
            self.advance();
            self.skip_commas();
        }

        let mut package = None;
        if matches!(self.peek(), Token::Ident(k) if k == "package")
            && matches!(self.peek_at(1), Token::Ident(_))
        {
            self.advance();
            if let Token::Ident(name) = self.advance() {
                package = Some(name);
            }
            self.end_of_declaration(&Token::Eof)?;
        }

        let decls = self.declarations(&Token::Eof)?;
        Ok(SourceFile {
            package,
            root: Expr::Struct(decls),
        })
    }

    /// Parses declarations up to (not including) `close`.
    fn declarations(&mut self, close: &Token) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            self.skip_commas();
            if self.peek() == close {
                return Ok(decls);
            }
            if *self.peek() == Token::Attribute {
                self.advance();
                continue;
            }
            decls.push(self.declaration()?);
            self.end_of_declaration(close)?;
        }
    }

    fn end_of_declaration(&mut self, close: &Token) -> Result<()> {
        match self.peek() {
            Token::Comma => {
                self.advance();
                Ok(())
            }
            t if t == close => Ok(()),
            _ => Err(self.unexpected("',' or newline")),
        }
    }

    fn declaration(&mut self) -> Result<Decl> {
        if let Token::Ident(name) = self.peek() {
            if UNSUPPORTED_KEYWORDS.contains(&name.as_str()) {
                return Err(self.error(format!("'{name}' declarations are not supported")));
            }
        }
        if self.at_field_start() {
            Ok(Decl::Field(self.field()?))
        } else {
            Ok(Decl::Embed(self.expression()?))
        }
    }

    /// A label followed by `:`, `?:` or `!:`.
    fn at_field_start(&self) -> bool {
        let is_label = match self.peek() {
            Token::Ident(name) => name != "_",
            Token::String(_) => true,
            _ => false,
        };
        if !is_label {
            return false;
        }
        match self.peek_at(1) {
            Token::Colon => true,
            Token::Question | Token::Bang => *self.peek_at(2) == Token::Colon,
            _ => false,
        }
    }

    fn field(&mut self) -> Result<Field> {
        let label = match self.advance() {
            Token::Ident(name) => {
                let kind = if name.starts_with('#') {
                    LabelKind::Definition
                } else if name.starts_with('_') {
                    LabelKind::Hidden
                } else {
                    LabelKind::Regular
                };
                if name == "#" {
                    return Err(self.error("definition label must have a name"));
                }
                Label { name, kind }
            }
            Token::String(name) => Label {
                name,
                kind: LabelKind::Regular,
            },
            _ => return Err(self.unexpected("field label")),
        };

        let optional = match self.peek() {
            Token::Question => {
                self.advance();
                true
            }
            Token::Bang => {
                self.advance();
                false
            }
            _ => false,
        };
        self.expect(Token::Colon)?;

        let value = if self.at_field_start() {
            self.nested(|p| Ok(Expr::Struct(vec![Decl::Field(p.field()?)])))?
        } else {
            self.expression()?
        };

        while *self.peek() == Token::Attribute {
            self.advance();
        }

        Ok(Field {
            label,
            optional,
            value,
        })
    }

    fn expression(&mut self) -> Result<Expr> {
        let mut alternatives = vec![self.alternative()?];
        while *self.peek() == Token::Pipe {
            self.advance();
            alternatives.push(self.alternative()?);
        }

        if alternatives.len() == 1 && !alternatives[0].is_default {
            if let Some(only) = alternatives.pop() {
                return Ok(only.value);
            }
        }
        Ok(Expr::Disjunction(alternatives))
    }

    fn alternative(&mut self) -> Result<Alternative> {
        let is_default = if *self.peek() == Token::Star {
            self.advance();
            true
        } else {
            false
        };
        Ok(Alternative {
            value: self.unification()?,
            is_default,
        })
    }

    fn unification(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        let mut operands = 1;
        while *self.peek() == Token::Amp {
            if operands >= MAX_DEPTH {
                return Err(self.error(format!(
                    "too many '&' operands (limit {MAX_DEPTH})"
                )));
            }
            operands += 1;
            self.advance();
            let rhs = self.unary()?;
            expr = Expr::Unify(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if *self.peek() == Token::Minus {
            self.advance();
            return match self.advance() {
                Token::Number(text) => self.number(&format!("-{text}")),
                _ => Err(self.error("unary '-' is only supported on number literals")),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let mut expr = self.operand()?;
        while *self.peek() == Token::Dot {
            if !matches!(expr, Expr::Reference(_) | Expr::Selector(..)) {
                return Err(self.error("selectors are only supported on references"));
            }
            self.advance();
            match self.advance() {
                Token::Ident(name) => expr = Expr::Selector(Box::new(expr), name),
                _ => return Err(self.error("expected identifier after '.'")),
            }
        }
        Ok(expr)
    }

    fn operand(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Ident(name) => {
                if UNSUPPORTED_KEYWORDS.contains(&name.as_str()) {
                    return Err(self.error(format!("'{name}' expressions are not supported")));
                }
                self.advance();
                Ok(match name.as_str() {
                    "null" => Expr::Literal(Value::Null),
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "_" => Expr::Top,
                    other => match Kind::from_identifier(other) {
                        Some(kind) => Expr::Kind(kind),
                        None => Expr::Reference(name),
                    },
                })
            }
            Token::String(value) => {
                self.advance();
                Ok(Expr::Literal(Value::String(value)))
            }
            Token::Number(text) => {
                self.advance();
                self.number(&text)
            }
            Token::LBrace => self.nested(|p| {
                p.advance();
                let decls = p.declarations(&Token::RBrace)?;
                p.expect(Token::RBrace)?;
                Ok(Expr::Struct(decls))
            }),
            Token::LBracket => self.nested(|p| {
                p.advance();
                p.list()
            }),
            Token::LParen => self.nested(|p| {
                p.advance();
                let expr = p.expression()?;
                p.expect(Token::RParen)?;
                Ok(expr)
            }),
            Token::Ellipsis => Err(self.error("open lists and structs ('...') are not supported")),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn list(&mut self) -> Result<Expr> {
        let mut items = Vec::new();
        loop {
            self.skip_commas();
            match self.peek() {
                Token::RBracket => {
                    self.advance();
                    return Ok(Expr::List(items));
                }
                Token::Ellipsis => {
                    return Err(self.error("open lists and structs ('...') are not supported"))
                }
                _ => {}
            }
            items.push(self.expression()?);
            match self.peek() {
                Token::Comma | Token::RBracket => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn number(&self, text: &str) -> Result<Expr> {
        Number::from_str(text)
            .map(|n| Expr::Literal(Value::Number(n)))
            .map_err(|e| self.error(format!("invalid number '{text}': {e}")))
    }
}
