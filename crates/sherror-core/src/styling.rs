//! Terminal styling for `appMessage` markup.
//!
//! Paired tags map to foreground colors: `<red>..</red>` (alias `<🔴>`) and
//! `<blue>..</blue>` (alias `<🔵>`). Anything else, including unclosed tags,
//! passes through as literal text.

use std::sync::OnceLock;

use owo_colors::OwoColorize;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tint {
    Red,
    Blue,
}

const TAGS: [(&str, Tint); 4] = [
    ("red", Tint::Red),
    ("🔴", Tint::Red),
    ("blue", Tint::Blue),
    ("🔵", Tint::Blue),
];

fn tag_patterns() -> &'static [(Regex, Tint)] {
    static PATTERNS: OnceLock<Vec<(Regex, Tint)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TAGS.iter()
            .map(|(tag, tint)| {
                let tag = regex::escape(tag);
                let re = Regex::new(&format!("(?s)<{tag}>(.*?)</{tag}>")).expect("valid regex");
                (re, *tint)
            })
            .collect()
    })
}

/// Replace recognized tags with ANSI color sequences.
pub fn stylize(message: &str) -> String {
    let mut out = message.to_string();
    for (re, tint) in tag_patterns() {
        out = re
            .replace_all(&out, |caps: &regex::Captures<'_>| paint(&caps[1], *tint))
            .into_owned();
    }
    out
}

fn paint(text: &str, tint: Tint) -> String {
    match tint {
        Tint::Red => text.red().to_string(),
        Tint::Blue => text.blue().to_string(),
    }
}
