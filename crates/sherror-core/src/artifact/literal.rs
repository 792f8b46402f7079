use std::ops::Range;

use serde_json::{Map, Number, Value};

use super::lexer::{Tok, Token};
use crate::{errors::Error, Result};

/// A parsed literal value with the byte span it occupies in the source.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub span: Range<usize>,
    pub kind: NodeKind,
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Object(Vec<Property>),
    Array { items: Vec<Node>, trailing_comma: bool },
    Str { value: String, quote: char },
    Template(Option<String>),
    Num(String),
    Bool(bool),
    Null,
    /// Any non-literal expression (identifiers, calls, functions). Kept only
    /// so its span is known; never rewritten.
    Opaque,
}

#[derive(Clone, Debug)]
pub(crate) struct Property {
    pub key: String,
    pub value: Node,
}

impl Node {
    pub fn property(&self, key: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Object(props) => props.iter().find(|p| p.key == key).map(|p| &p.value),
            _ => None,
        }
    }

    /// Convert to JSON, dropping opaque object members.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match &self.kind {
            NodeKind::Object(props) => {
                let mut map = Map::new();
                for p in props {
                    if matches!(p.value.kind, NodeKind::Opaque) {
                        continue;
                    }
                    map.insert(p.key.clone(), p.value.to_json()?);
                }
                Value::Object(map)
            }
            NodeKind::Array { items, .. } => Value::Array(
                items
                    .iter()
                    .map(|item| match item.kind {
                        NodeKind::Opaque => Err(Error::Structural(format!(
                            "unsupported expression in array at byte {}",
                            item.span.start
                        ))),
                        _ => item.to_json(),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            NodeKind::Str { value, .. } => Value::String(value.clone()),
            NodeKind::Template(Some(value)) => Value::String(value.clone()),
            NodeKind::Template(None) => {
                return Err(Error::Structural(format!(
                    "interpolated template literal at byte {} cannot be read",
                    self.span.start
                )))
            }
            NodeKind::Num(raw) => Value::Number(parse_number(raw).ok_or_else(|| {
                Error::Structural(format!(
                    "unsupported number literal {raw:?} at byte {}",
                    self.span.start
                ))
            })?),
            NodeKind::Bool(b) => Value::Bool(*b),
            NodeKind::Null => Value::Null,
            NodeKind::Opaque => {
                return Err(Error::Structural(format!(
                    "unsupported expression at byte {}",
                    self.span.start
                )))
            }
        })
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let cleaned = raw.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest.to_string()),
        None => (false, cleaned.trim_start_matches('+').to_string()),
    };

    let radix = match digits.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let v = i64::from_str_radix(&digits[2..], radix).ok()?;
        return Some(Number::from(if negative { -v } else { v }));
    }

    if let Ok(v) = digits.parse::<i64>() {
        return Some(Number::from(if negative { -v } else { v }));
    }
    let v = digits.parse::<f64>().ok()?;
    Number::from_f64(if negative { -v } else { v })
}

/// Recursive-descent parser over the token stream.
pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], pos: usize) -> Self {
        Self { tokens, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + n)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let t = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(t)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(c)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, c: char) -> Result<&'t Token> {
        match self.bump() {
            Some(t) if t.is_punct(c) => Ok(t),
            Some(t) => Err(Error::Structural(format!(
                "expected '{c}' at byte {}",
                t.span.start
            ))),
            None => Err(Error::Structural(format!(
                "expected '{c}' but reached end of input"
            ))),
        }
    }

    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn at_terminator(&self) -> bool {
        match self.peek() {
            None => true,
            Some(t) => matches!(t.tok, Tok::Punct(',' | '}' | ']' | ')' | ';')),
        }
    }

    /// Parse a member value; anything that is not a clean literal becomes opaque.
    pub fn parse_member(&mut self) -> Result<Node> {
        let start = self.pos;
        if let Ok(node) = self.parse_value() {
            if self.at_terminator() {
                return Ok(node);
            }
        }
        self.pos = start;
        self.skip_opaque()
    }

    pub fn parse_value(&mut self) -> Result<Node> {
        let Some(tok) = self.peek() else {
            return Err(Error::Structural("unexpected end of input".to_string()));
        };

        let node = match &tok.tok {
            Tok::Punct('(') => {
                self.bump();
                let inner = self.parse_value()?;
                self.expect(')')?;
                inner
            }
            Tok::Punct('<') => {
                self.skip_angle_type()?;
                return self.parse_value();
            }
            Tok::Punct('{') => self.parse_object()?,
            Tok::Punct('[') => self.parse_array()?,
            Tok::Punct(sign @ ('-' | '+')) => match self.peek_at(1) {
                Some(Token {
                    tok: Tok::Num(raw),
                    span,
                }) => {
                    let start = tok.span.start;
                    self.pos += 2;
                    Node {
                        span: start..span.end,
                        kind: NodeKind::Num(format!("{sign}{raw}")),
                    }
                }
                _ => return self.skip_opaque(),
            },
            Tok::Str { value, quote } => {
                self.bump();
                Node {
                    span: tok.span.clone(),
                    kind: NodeKind::Str {
                        value: value.clone(),
                        quote: *quote,
                    },
                }
            }
            Tok::Template(value) => {
                self.bump();
                Node {
                    span: tok.span.clone(),
                    kind: NodeKind::Template(value.clone()),
                }
            }
            Tok::Num(raw) => {
                self.bump();
                Node {
                    span: tok.span.clone(),
                    kind: NodeKind::Num(raw.clone()),
                }
            }
            Tok::Ident(word) => {
                let kind = match word.as_str() {
                    "true" => NodeKind::Bool(true),
                    "false" => NodeKind::Bool(false),
                    "null" | "undefined" => NodeKind::Null,
                    _ => return self.skip_opaque(),
                };
                self.bump();
                Node {
                    span: tok.span.clone(),
                    kind,
                }
            }
            Tok::Punct(_) | Tok::Regex => return self.skip_opaque(),
        };

        self.skip_type_suffix();
        Ok(node)
    }

    fn parse_object(&mut self) -> Result<Node> {
        let open = self.expect('{')?;
        let mut props = Vec::new();

        loop {
            if self.eat('}') {
                break;
            }
            let Some(tok) = self.peek() else {
                return Err(Error::Structural(format!(
                    "unterminated object literal at byte {}",
                    open.span.start
                )));
            };

            let key = match &tok.tok {
                Tok::Ident(s) | Tok::Num(s) => Some(s.clone()),
                Tok::Str { value, .. } => Some(value.clone()),
                Tok::Template(Some(value)) => Some(value.clone()),
                _ => None,
            };

            match key {
                Some(key) if self.peek_at(1).is_some_and(|t| t.is_punct(':')) => {
                    self.pos += 2;
                    let value = self.parse_member()?;
                    props.push(Property { key, value });
                }
                // Spread, computed keys, shorthand and method members.
                _ => {
                    let value = self.skip_opaque()?;
                    if let Some(key) = key {
                        props.push(Property { key, value });
                    }
                }
            }

            if self.eat(',') {
                continue;
            }
            self.expect('}')?;
            break;
        }

        Ok(Node {
            span: open.span.start..self.last_end(),
            kind: NodeKind::Object(props),
        })
    }

    fn parse_array(&mut self) -> Result<Node> {
        let open = self.expect('[')?;
        let mut items = Vec::new();
        let mut trailing_comma = false;

        loop {
            if self.eat(']') {
                break;
            }
            if self.peek().is_none() {
                return Err(Error::Structural(format!(
                    "unterminated array literal at byte {}",
                    open.span.start
                )));
            }
            items.push(self.parse_member()?);

            if self.eat(',') {
                if self.eat(']') {
                    trailing_comma = true;
                    break;
                }
                continue;
            }
            self.expect(']')?;
            break;
        }

        Ok(Node {
            span: open.span.start..self.last_end(),
            kind: NodeKind::Array {
                items,
                trailing_comma,
            },
        })
    }

    /// Consume a balanced run of tokens up to the next top-level separator.
    fn skip_opaque(&mut self) -> Result<Node> {
        let start_pos = self.pos;
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            match tok.tok {
                Tok::Punct('(' | '[' | '{') => depth += 1,
                Tok::Punct(')' | ']' | '}') if depth == 0 => break,
                Tok::Punct(')' | ']' | '}') => depth -= 1,
                Tok::Punct(',' | ';') if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }

        if self.pos == start_pos {
            let at = self.peek().map_or(0, |t| t.span.start);
            return Err(Error::Structural(format!("unexpected token at byte {at}")));
        }
        Ok(Node {
            span: self.tokens[start_pos].span.start..self.last_end(),
            kind: NodeKind::Opaque,
        })
    }

    /// Skip `as T`, `as const` and `satisfies T` suffixes.
    fn skip_type_suffix(&mut self) {
        while self
            .peek()
            .is_some_and(|t| t.is_ident("as") || t.is_ident("satisfies"))
        {
            self.bump();
            self.skip_type(&[',', '}', ']', ')', ';']);
        }
    }

    /// Skip a type expression until one of `stops` at nesting depth zero.
    pub fn skip_type(&mut self, stops: &[char]) {
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            match tok.tok {
                // `=>` inside function types.
                Tok::Punct('=') if self.peek_at(1).is_some_and(|t| t.is_punct('>')) => {
                    self.pos += 2;
                    continue;
                }
                Tok::Punct(c) if depth == 0 && stops.contains(&c) => break,
                Tok::Punct('(' | '[' | '{' | '<') => depth += 1,
                Tok::Punct(')' | ']' | '}' | '>') => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn skip_angle_type(&mut self) -> Result<()> {
        let open = self.expect('<')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(t) if t.is_punct('<') => depth += 1,
                Some(t) if t.is_punct('>') => depth -= 1,
                Some(_) => {}
                None => {
                    return Err(Error::Structural(format!(
                        "unterminated type assertion at byte {}",
                        open.span.start
                    )))
                }
            }
        }
        Ok(())
    }
}
