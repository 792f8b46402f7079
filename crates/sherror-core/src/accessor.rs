use std::sync::Arc;

use comfy_table::{presets::UTF8_FULL, Table};

use crate::{
    domain::{ErrorDefinition, PrintRecord, Printer},
    styling::stylize,
};

/// Shown in place of a discussion link for entries that were never synced.
pub const LINK_NOT_AVAILABLE: &str = "not available";

/// Immutable snapshot of one error definition with its message styled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledError {
    pub code: i64,
    pub app_message: String,
    pub post_title: String,
    pub post_body: String,
    pub discussion_link: Option<String>,
}

impl From<&ErrorDefinition> for StyledError {
    fn from(def: &ErrorDefinition) -> Self {
        Self {
            code: def.code,
            app_message: stylize(&def.app_message),
            post_title: def.post_title.clone(),
            post_body: def.post_body.clone(),
            discussion_link: def.discussion_link.clone(),
        }
    }
}

/// Handle returned by `Sherror::get`, adding print/exit behavior to a snapshot.
#[derive(Clone)]
pub struct ErrorHandle {
    error: StyledError,
    printer: Printer,
}

impl std::fmt::Debug for ErrorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandle")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl ErrorHandle {
    pub(crate) fn new(def: &ErrorDefinition, printer: Option<Printer>) -> Self {
        Self {
            error: StyledError::from(def),
            printer: printer.unwrap_or_else(default_printer),
        }
    }

    pub fn error(&self) -> &StyledError {
        &self.error
    }

    pub fn code(&self) -> i64 {
        self.error.code
    }

    pub fn message(&self) -> &str {
        &self.error.app_message
    }

    pub fn record(&self, codepath: Option<&str>) -> PrintRecord {
        PrintRecord {
            code: self.error.code,
            message: self.error.app_message.clone(),
            discussion: self
                .error
                .discussion_link
                .clone()
                .unwrap_or_else(|| LINK_NOT_AVAILABLE.to_string()),
            codepath: codepath.map(str::to_string),
        }
    }

    /// Hand the styled message, link and optional code location to the printer.
    pub fn print(&self, codepath: Option<&str>) {
        (self.printer)(&self.record(codepath));
    }

    /// Terminate the process with the error code as exit status.
    pub fn exit(&self) -> ! {
        std::process::exit(exit_status(self.error.code))
    }
}

fn exit_status(code: i64) -> i32 {
    i32::try_from(code).unwrap_or(i32::MAX)
}

pub fn default_printer() -> Printer {
    Arc::new(|record: &PrintRecord| eprintln!("{}", render_table(record)))
}

/// Two-column table, one row per field.
pub fn render_table(record: &PrintRecord) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["code".to_string(), record.code.to_string()]);
    table.add_row(vec!["message".to_string(), record.message.clone()]);
    table.add_row(vec!["discussion".to_string(), record.discussion.clone()]);
    if let Some(path) = &record.codepath {
        table.add_row(vec!["codepath".to_string(), path.clone()]);
    }
    table.to_string()
}
