//! Local config artifact: parsing and in-place rewriting.
//!
//! The artifact is either a JSON document or a JS/TS module whose config is
//! exported as an object literal (`export default {...}`,
//! `export const config = {...}`, `module.exports = {...}`), optionally wrapped
//! in a type assertion.

mod lexer;
mod literal;
pub mod writeback;

use std::path::Path;

use lexer::{tokenize, Tok, Token};
use literal::{Node, NodeKind, Parser};

use crate::{domain::SherrorConfig, errors::Error, Result};

pub use writeback::{rewrite_errors, ArtifactFile};

/// Surface syntax of the artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Json,
    Module,
}

/// A parsed artifact: the config object literal and where it lives.
#[derive(Debug)]
pub(crate) struct Artifact {
    pub dialect: Dialect,
    pub config: Node,
}

impl Artifact {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let Some(first) = tokens.first() else {
            return Err(Error::Structural("config artifact is empty".to_string()));
        };

        let (dialect, config) = if first.is_punct('{') {
            (Dialect::Json, object_at(&tokens, 0)?)
        } else {
            (Dialect::Module, locate_export(&tokens)?)
        };

        Ok(Self { dialect, config })
    }

    /// The `errors` array node of the config object.
    pub fn errors(&self) -> Result<&Node> {
        let node = self
            .config
            .property("errors")
            .ok_or_else(|| Error::Structural("config has no `errors` property".to_string()))?;
        match node.kind {
            NodeKind::Array { .. } => Ok(node),
            _ => Err(Error::Structural("`errors` is not an array literal".to_string())),
        }
    }
}

fn object_at(tokens: &[Token], pos: usize) -> Result<Node> {
    let node = Parser::new(tokens, pos).parse_value()?;
    match node.kind {
        NodeKind::Object(_) => Ok(node),
        _ => Err(Error::Structural("exported config is not an object literal".to_string())),
    }
}

/// Find the exported config literal in module source.
fn locate_export(tokens: &[Token]) -> Result<Node> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.tok {
            Tok::Punct('(' | '[' | '{') => depth += 1,
            Tok::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth != 0 {
            continue;
        }

        let at = |n: usize| tokens.get(i + n);

        if tok.is_ident("export") {
            if at(1).is_some_and(|t| t.is_ident("default")) {
                return match at(2).map(|t| &t.tok) {
                    Some(Tok::Ident(name)) if !is_literal_keyword(name) => {
                        resolve_binding(tokens, name)
                    }
                    Some(_) => object_at(tokens, i + 2),
                    None => Err(Error::Structural("`export default` has no value".to_string())),
                };
            }
            if at(1).is_some_and(is_binding_keyword) && at(2).is_some_and(|t| t.is_ident("config"))
            {
                return binding_value(tokens, i + 3);
            }
        }

        if tok.is_ident("module")
            && at(1).is_some_and(|t| t.is_punct('.'))
            && at(2).is_some_and(|t| t.is_ident("exports"))
            && at(3).is_some_and(|t| t.is_punct('='))
        {
            return object_at(tokens, i + 4);
        }
    }

    Err(Error::Structural("no `export default` or `export const config` found".to_string()))
}

/// Resolve `export default name` to a top-level `const name = {...}`.
fn resolve_binding(tokens: &[Token], name: &str) -> Result<Node> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.tok {
            Tok::Punct('(' | '[' | '{') => depth += 1,
            Tok::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0
            && is_binding_keyword(tok)
            && tokens.get(i + 1).is_some_and(|t| t.is_ident(name))
        {
            return binding_value(tokens, i + 2);
        }
    }
    Err(Error::Structural(format!("exported binding `{name}` is not declared at top level")))
}

/// Parse `[: Type] = <literal>` starting at `pos`.
fn binding_value(tokens: &[Token], pos: usize) -> Result<Node> {
    let mut parser = Parser::new(tokens, pos);
    parser.skip_type(&['=']);
    let eq = parser.pos();
    if !tokens.get(eq).is_some_and(|t| t.is_punct('=')) {
        return Err(Error::Structural("exported config binding has no initializer".to_string()));
    }
    object_at(tokens, eq + 1)
}

fn is_binding_keyword(tok: &Token) -> bool {
    tok.is_ident("const") || tok.is_ident("let") || tok.is_ident("var")
}

fn is_literal_keyword(word: &str) -> bool {
    matches!(word, "true" | "false" | "null" | "undefined")
}

impl SherrorConfig {
    /// Parse config artifact source into the in-memory config store.
    pub fn from_source(source: &str) -> Result<Self> {
        let artifact = Artifact::parse(source)?;
        artifact.errors()?;
        let value = artifact.config.to_json()?;
        serde_json::from_value(value).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    /// Load a config artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_source(&raw)
    }
}
