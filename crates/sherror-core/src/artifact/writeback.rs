use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    literal::{Node, NodeKind},
    Artifact, Dialect,
};
use crate::{
    domain::{ErrorDefinition, SherrorConfig},
    errors::Error,
    ports::ConfigWriter,
    Result,
};

const DEFAULT_INDENT_UNIT: &str = "  ";

/// Rewrite the `errors` array of an artifact to reflect `errors`.
///
/// Element `i` on file is replaced by a fresh literal for `errors[i]`; entries
/// beyond the on-file length are appended. Text outside the replaced elements
/// is preserved byte for byte.
pub fn rewrite_errors(source: &str, errors: &[ErrorDefinition]) -> Result<String> {
    let artifact = Artifact::parse(source)?;
    let array = artifact.errors()?;
    let NodeKind::Array { items, .. } = &array.kind else {
        return Err(Error::Structural("`errors` is not an array literal".to_string()));
    };

    let style = Style::detect(source, artifact.dialect, array, items);
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();

    for (i, (item, def)) in items.iter().zip(errors).enumerate() {
        if !matches!(item.kind, NodeKind::Object(_)) {
            return Err(Error::Structural(format!("errors[{i}] is not an object literal")));
        }
        edits.push((item.span.clone(), style.render(def)?));
    }

    if errors.len() > items.len() {
        let extra = &errors[items.len()..];
        match items.last() {
            Some(last) => {
                let mut text = String::new();
                for def in extra {
                    text.push(',');
                    text.push_str(style.newline);
                    text.push_str(&style.item_indent);
                    text.push_str(&style.render(def)?);
                }
                edits.push((last.span.end..last.span.end, text));
            }
            None => {
                let body = extra
                    .iter()
                    .map(|def| {
                        Ok(format!(
                            "{}{}{}",
                            style.newline,
                            style.item_indent,
                            style.render(def)?
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(",");
                let inner = array.span.start + 1..array.span.end - 1;
                edits.push((
                    inner,
                    format!("{body}{}{}", style.newline, style.closing_indent),
                ));
            }
        }
    }

    Ok(apply_edits(source, edits))
}

fn apply_edits(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut out = source.to_string();
    for (range, text) in edits {
        out.replace_range(range, &text);
    }
    out
}

/// Formatting conventions inferred from the existing artifact.
#[derive(Clone, Debug)]
struct Style {
    dialect: Dialect,
    quote: char,
    item_indent: String,
    field_indent: String,
    closing_indent: String,
    newline: &'static str,
}

impl Style {
    fn detect(source: &str, dialect: Dialect, array: &Node, items: &[Node]) -> Self {
        let closing_indent = leading_whitespace(source, array.span.start).to_string();
        let first = items.first();

        let item_indent = first
            .and_then(|item| indent_before(source, item.span.start))
            .map(str::to_string);

        let first_field_indent = first.and_then(|item| match &item.kind {
            NodeKind::Object(props) => props
                .first()
                .and_then(|p| indent_before(source, key_start(source, &p.value))),
            _ => None,
        });

        let unit = match (&item_indent, first_field_indent) {
            (Some(item), Some(field))
                if field.len() > item.len() && field.starts_with(item.as_str()) =>
            {
                field[item.len()..].to_string()
            }
            (Some(item), _)
                if item.len() > closing_indent.len()
                    && item.starts_with(closing_indent.as_str()) =>
            {
                item[closing_indent.len()..].to_string()
            }
            _ => DEFAULT_INDENT_UNIT.to_string(),
        };

        let item_indent = item_indent.unwrap_or_else(|| format!("{closing_indent}{unit}"));
        let field_indent = format!("{item_indent}{unit}");

        let quote = match dialect {
            Dialect::Json => '"',
            Dialect::Module => first.and_then(first_quote).unwrap_or('"'),
        };

        let newline = if source[..array.span.start].contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        };

        Self {
            dialect,
            quote,
            item_indent,
            field_indent,
            closing_indent,
            newline,
        }
    }

    /// Serialize one entry. Field order is fixed; the link is omitted when absent.
    fn render(&self, def: &ErrorDefinition) -> Result<String> {
        let mut fields = vec![
            ("code", def.code.to_string()),
            ("appMessage", self.string(&def.app_message)?),
            ("postTitle", self.string(&def.post_title)?),
            ("postBody", self.string(&def.post_body)?),
        ];
        if let Some(link) = &def.discussion_link {
            fields.push(("discussionLink", self.string(link)?));
        }

        let nl = self.newline;
        let lines = fields
            .into_iter()
            .map(|(key, value)| format!("{}{}: {value}", self.field_indent, self.key(key)))
            .collect::<Vec<_>>()
            .join(&format!(",{nl}"));
        Ok(format!("{{{nl}{lines}{nl}{}}}", self.item_indent))
    }

    fn key(&self, key: &str) -> String {
        match self.dialect {
            Dialect::Json => format!("\"{key}\""),
            Dialect::Module => key.to_string(),
        }
    }

    fn string(&self, value: &str) -> Result<String> {
        if self.quote == '"' {
            return Ok(serde_json::to_string(value)?);
        }
        Ok(single_quoted(value))
    }
}

fn single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn first_quote(item: &Node) -> Option<char> {
    let NodeKind::Object(props) = &item.kind else {
        return None;
    };
    props.iter().find_map(|p| match &p.value.kind {
        NodeKind::Str { quote, .. } => Some(*quote),
        _ => None,
    })
}

/// Start of the property key preceding `value` (best effort: start of its line content).
fn key_start(source: &str, value: &Node) -> usize {
    let line_start = line_start(source, value.span.start);
    let ws = leading_whitespace(source, value.span.start).len();
    line_start + ws
}

fn line_start(source: &str, pos: usize) -> usize {
    source[..pos].rfind('\n').map_or(0, |i| i + 1)
}

fn leading_whitespace(source: &str, pos: usize) -> &str {
    let start = line_start(source, pos);
    let line = &source[start..];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Indentation before `pos` when only whitespace precedes it on its line.
fn indent_before(source: &str, pos: usize) -> Option<&str> {
    let prefix = &source[line_start(source, pos)..pos];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}

/// File-backed `ConfigWriter`.
///
/// The rewrite is computed fully in memory and validated before the single
/// write; an unchanged result skips the write.
#[derive(Clone, Debug)]
pub struct ArtifactFile {
    path: PathBuf,
}

impl ArtifactFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigWriter for ArtifactFile {
    async fn write_back(&self, config: &SherrorConfig) -> Result<()> {
        let source = tokio::fs::read_to_string(&self.path).await?;
        let updated = rewrite_errors(&source, &config.errors)?;

        if updated == source {
            debug!(path = %self.path.display(), "config artifact already up to date");
            return Ok(());
        }

        Artifact::parse(&updated)?;
        tokio::fs::write(&self.path, &updated).await?;
        info!(path = %self.path.display(), errors = config.errors.len(), "config artifact updated");
        Ok(())
    }
}
