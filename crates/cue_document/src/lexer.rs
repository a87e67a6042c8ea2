//! Tokenizer for the supported CUE subset.
//!
//! Newlines are not emitted as tokens. Instead a comma is inserted after a
//! line that ends in an identifier, literal, closing bracket or attribute,
//! which lets the parser treat commas as the only field separator.

use crate::errors::{Error, Result};

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    String(String),
    Number(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Question,
    Bang,
    Amp,
    Pipe,
    Star,
    Dot,
    Minus,
    Ellipsis,
    /// `@name(...)`; the contents are not interpreted.
    Attribute,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::String(_) => "string literal".to_string(),
            Token::Number(text) => format!("number '{text}'"),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "',' or newline".to_string(),
            Token::Question => "'?'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::Amp => "'&'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Ellipsis => "'...'".to_string(),
            Token::Attribute => "attribute".to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }

    fn ends_statement(&self) -> bool {
        matches!(
            self,
            Token::Ident(_)
                | Token::String(_)
                | Token::Number(_)
                | Token::RBrace
                | Token::RBracket
                | Token::RParen
                | Token::Attribute
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Spanned>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>> {
        while let Some(ch) = self.peek(0) {
            let (line, column) = (self.line, self.column);
            match ch {
                '\n' => {
                    self.bump();
                    self.insert_comma(line, column);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '"' => {
                    let value = if self.peek(1) == Some('"') && self.peek(2) == Some('"') {
                        self.multiline_string()?
                    } else {
                        self.string()?
                    };
                    self.push(Token::String(value), line, column);
                }
                '#' if self.peek(1) == Some('"') => {
                    return Err(self.error(line, column, "raw strings are not supported"));
                }
                c if c.is_ascii_digit() => {
                    let text = self.number()?;
                    self.push(Token::Number(text), line, column);
                }
                c if is_identifier_start(c) => {
                    let name = self.identifier();
                    self.push(Token::Ident(name), line, column);
                }
                '@' => {
                    self.attribute()?;
                    self.push(Token::Attribute, line, column);
                }
                '.' if self.peek(1) == Some('.') && self.peek(2) == Some('.') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    self.push(Token::Ellipsis, line, column);
                }
                _ => {
                    let token = match ch {
                        '{' => Token::LBrace,
                        '}' => Token::RBrace,
                        '[' => Token::LBracket,
                        ']' => Token::RBracket,
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        ':' => Token::Colon,
                        ',' => Token::Comma,
                        '?' => Token::Question,
                        '!' if self.peek(1) != Some('=') => Token::Bang,
                        '&' if self.peek(1) != Some('&') => Token::Amp,
                        '|' if self.peek(1) != Some('|') => Token::Pipe,
                        '*' => Token::Star,
                        '.' => Token::Dot,
                        '-' => Token::Minus,
                        other => {
                            return Err(self.error(
                                line,
                                column,
                                &format!("unsupported character '{other}'"),
                            ))
                        }
                    };
                    self.bump();
                    self.push(token, line, column);
                }
            }
        }

        let (line, column) = (self.line, self.column);
        self.insert_comma(line, column);
        self.push(Token::Eof, line, column);
        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek(0)?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn push(&mut self, token: Token, line: usize, column: usize) {
        self.tokens.push(Spanned {
            token,
            line,
            column,
        });
    }

    fn insert_comma(&mut self, line: usize, column: usize) {
        if self.tokens.last().is_some_and(|t| t.token.ends_statement()) {
            self.push(Token::Comma, line, column);
        }
    }

    fn error(&self, line: usize, column: usize, message: &str) -> Error {
        Error::Compile {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn identifier(&mut self) -> String {
        let mut name = String::new();
        if let Some(first) = self.bump() {
            name.push(first);
        }
        while let Some(c) = self.peek(0) {
            if !is_identifier_continue(c) {
                break;
            }
            name.push(c);
            self.bump();
        }
        name
    }

    fn number(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        self.digits(&mut text);

        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }

        if matches!(self.peek(0), Some('e') | Some('E')) {
            let sign = matches!(self.peek(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                text.push('e');
                self.bump();
                if sign {
                    if let Some(s) = self.bump() {
                        text.push(s);
                    }
                }
                self.digits(&mut text);
            }
        }

        if self.peek(0).is_some_and(is_identifier_continue) {
            return Err(self.error(
                line,
                column,
                "unsupported number literal; only decimal numbers are supported",
            ));
        }
        Ok(text)
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek(0) {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                _ => break,
            }
            self.bump();
        }
    }

    fn string(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut raw = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(line, column, "unterminated string")),
                Some('"') => break,
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error(line, column, "unterminated string"))?;
                    raw.push('\\');
                    raw.push(escaped);
                }
                Some(c) => raw.push(c),
            }
        }
        self.unescape(&raw, line, column)
    }

    fn multiline_string(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        for _ in 0..3 {
            self.bump();
        }
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            if !c.is_whitespace() {
                return Err(self.error(line, column, "expected newline after '\"\"\"'"));
            }
            self.bump();
        }
        self.bump();

        let mut lines = Vec::new();
        let mut current = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(line, column, "unterminated multi-line string")),
                Some('\n') => lines.push(std::mem::take(&mut current)),
                Some('"')
                    if current.trim().is_empty()
                        && self.peek(0) == Some('"')
                        && self.peek(1) == Some('"') =>
                {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => current.push(c),
            }
        }

        let indent = current;
        let mut body = Vec::with_capacity(lines.len());
        for text in &lines {
            if text.trim().is_empty() {
                body.push(String::new());
                continue;
            }
            let stripped = text.strip_prefix(indent.as_str()).ok_or_else(|| {
                self.error(
                    line,
                    column,
                    "multi-line string lines must be indented like the closing quotes",
                )
            })?;
            body.push(stripped.to_string());
        }
        self.unescape(&body.join("\n"), line, column)
    }

    fn unescape(&self, raw: &str, line: usize, column: usize) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            let escaped = chars
                .next()
                .ok_or_else(|| self.error(line, column, "invalid escape sequence"))?;
            match escaped {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                '/' => out.push('/'),
                'b' => out.push('\u{0008}'),
                'f' => out.push('\u{000C}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'u' => {
                    let code = self.unicode_escape(&mut chars, line, column)?;
                    out.push(code);
                }
                '(' => {
                    return Err(self.error(line, column, "string interpolation is not supported"))
                }
                other => {
                    return Err(self.error(
                        line,
                        column,
                        &format!("invalid escape sequence '\\{other}'"),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn unicode_escape(
        &self,
        chars: &mut std::str::Chars<'_>,
        line: usize,
        column: usize,
    ) -> Result<char> {
        let invalid = || self.error(line, column, "invalid unicode escape");
        let read_unit = |chars: &mut std::str::Chars<'_>| -> Result<u32> {
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() != 4 {
                return Err(invalid());
            }
            u32::from_str_radix(&hex, 16).map_err(|_| invalid())
        };

        let unit = read_unit(chars)?;
        if (0xD800..0xDC00).contains(&unit) {
            if chars.next() != Some('\\') || chars.next() != Some('u') {
                return Err(invalid());
            }
            let low = read_unit(chars)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(invalid());
            }
            let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(combined).ok_or_else(invalid);
        }
        char::from_u32(unit).ok_or_else(invalid)
    }

    fn attribute(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        while self.peek(0).is_some_and(is_identifier_continue) {
            self.bump();
        }
        if self.peek(0) != Some('(') {
            return Err(self.error(line, column, "expected '(' after attribute name"));
        }

        let mut depth = 0usize;
        let mut in_string = false;
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error(line, column, "unterminated attribute"))?;
            match c {
                '\\' if in_string => {
                    self.bump();
                }
                '"' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '\n' => return Err(self.error(line, column, "unterminated attribute")),
                _ => {}
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '#' || c == '$'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
