use std::ops::Range;

use crate::{errors::Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Str { value: String, quote: char },
    /// Backtick string. `None` when it contains `${...}` interpolation.
    Template(Option<String>),
    Num(String),
    /// `/pattern/flags`. Only its span matters.
    Regex,
    Punct(char),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Token {
    pub tok: Tok,
    pub span: Range<usize>,
}

impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        self.tok == Tok::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.tok, Tok::Ident(s) if s == name)
    }
}

/// Split literal/module source into tokens, dropping whitespace and comments.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut lx = Lexer {
        src,
        pos: 0,
        after_value: false,
    };
    if src.starts_with("#!") {
        lx.skip_line();
    }

    let mut out = Vec::new();
    while let Some(tok) = lx.next_token()? {
        out.push(tok);
    }
    Ok(out)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    /// Whether the previous token ends an operand, which makes `/` a division.
    after_value: bool,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                (Some('/'), Some('/')) => self.skip_line(),
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => {
                            return Err(Error::Structural(format!(
                                "unterminated block comment at byte {start}"
                            )))
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let tok = match c {
            '"' | '\'' => Tok::Str {
                value: self.string_body(c, start)?,
                quote: c,
            },
            '`' => Tok::Template(self.template_body(start)?),
            '/' if !self.after_value => {
                self.regex_body(start)?;
                Tok::Regex
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek().is_some_and(|n| n.is_ascii_digit())) =>
            {
                self.number_rest(start);
                Tok::Num(self.src[start..self.pos].to_string())
            }
            c if is_ident_start(c) => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                Tok::Ident(self.src[start..self.pos].to_string())
            }
            c => Tok::Punct(c),
        };

        self.after_value = match &tok {
            Tok::Ident(word) => !is_operator_keyword(word),
            Tok::Punct(c) => matches!(c, ')' | ']' | '}'),
            _ => true,
        };

        Ok(Some(Token {
            tok,
            span: start..self.pos,
        }))
    }

    fn regex_body(&mut self, start: usize) -> Result<()> {
        let unterminated =
            || Error::Structural(format!("unterminated regular expression at byte {start}"));
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => return Err(unterminated()),
                Some('\\') => {
                    if matches!(self.bump(), None | Some('\n')) {
                        return Err(unterminated());
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Ok(())
    }

    fn number_rest(&mut self, start: usize) {
        let hex = self.src[start..].starts_with("0x") || self.src[start..].starts_with("0X");
        while let Some(c) = self.peek() {
            let prev = self.src[..self.pos].chars().last();
            let exponent_sign =
                !hex && (c == '+' || c == '-') && matches!(prev, Some('e') | Some('E'));
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn string_body(&mut self, quote: char, start: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(Error::Structural(format!(
                        "unterminated string literal at byte {start}"
                    )))
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out, start)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn template_body(&mut self, start: usize) -> Result<Option<String>> {
        let mut out = String::new();
        let mut interpolated = false;
        loop {
            match self.bump() {
                None => {
                    return Err(Error::Structural(format!(
                        "unterminated template literal at byte {start}"
                    )))
                }
                Some('`') => break,
                Some('\\') => self.escape(&mut out, start)?,
                Some('$') if self.peek() == Some('{') => {
                    interpolated = true;
                    self.bump();
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.bump() {
                            Some('{') => depth += 1,
                            Some('}') => depth -= 1,
                            Some(_) => {}
                            None => {
                                return Err(Error::Structural(format!(
                                    "unterminated template literal at byte {start}"
                                )))
                            }
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
        Ok((!interpolated).then_some(out))
    }

    fn escape(&mut self, out: &mut String, start: usize) -> Result<()> {
        let bad = || Error::Structural(format!("invalid escape in string literal at byte {start}"));
        match self.bump().ok_or_else(bad)? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => {
                let code = self.hex_digits(2).ok_or_else(bad)?;
                out.push(char::from_u32(code).ok_or_else(bad)?);
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.bump();
                    let end = self.src[self.pos..].find('}').ok_or_else(bad)?;
                    let digits = &self.src[self.pos..self.pos + end];
                    let code = u32::from_str_radix(digits, 16).map_err(|_| bad())?;
                    self.pos += end + 1;
                    code
                } else {
                    self.hex_digits(4).ok_or_else(bad)?
                };

                if (0xD800..0xDC00).contains(&code) && self.src[self.pos..].starts_with("\\u") {
                    self.pos += 2;
                    let low = self.hex_digits(4).ok_or_else(bad)?;
                    let combined =
                        0x10000 + ((code - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                    out.push(char::from_u32(combined).ok_or_else(bad)?);
                } else {
                    out.push(char::from_u32(code).ok_or_else(bad)?);
                }
            }
            // Line continuation.
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\n' => {}
            c => out.push(c),
        }
        Ok(())
    }

    fn hex_digits(&mut self, n: usize) -> Option<u32> {
        let digits = self.src.get(self.pos..self.pos + n)?;
        let code = u32::from_str_radix(digits, 16).ok()?;
        self.pos += n;
        Some(code)
    }
}

fn is_operator_keyword(word: &str) -> bool {
    matches!(
        word,
        "return"
            | "typeof"
            | "instanceof"
            | "in"
            | "of"
            | "new"
            | "delete"
            | "void"
            | "throw"
            | "case"
            | "do"
            | "else"
            | "yield"
            | "await"
    )
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
