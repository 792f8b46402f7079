/// Core error type for sherror.
///
/// Adapter crates map their transport-specific failures into this type so
/// callers see one taxonomy regardless of which backend raised the failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(
        "discussion category {name:?} not found; create it in the repository settings \
         (available: {})",
        format_available(available)
    )]
    CategoryNotFound { name: String, available: Vec<String> },

    #[error("invalid error entry #{index} (code {code}): {reason}")]
    Validation {
        index: usize,
        code: i64,
        reason: String,
    },

    #[error("config artifact has unexpected shape: {0}")]
    Structural(String),

    #[error("remote protocol error: {0}")]
    RemoteProtocol(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        return "none".to_string();
    }
    available.join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
