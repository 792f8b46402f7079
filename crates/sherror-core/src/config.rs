use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";
pub const DEFAULT_CONFIG_PATH: &str = "sherror.config.json";

/// Runtime settings for the remote adapters.
///
/// The core never reads the environment on its own; callers build this
/// explicitly or via `Settings::from_env`.
#[derive(Clone, Debug)]
pub struct Settings {
    pub github_token: String,
    pub graphql_endpoint: String,
    pub config_path: PathBuf,
    /// `None` means no request timeout.
    pub http_timeout: Option<Duration>,
}

impl Settings {
    pub fn new(github_token: impl Into<String>) -> Self {
        Self {
            github_token: github_token.into(),
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            http_timeout: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let github_token = env_str("GITHUB_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("GITHUB_TOKEN environment variable is required".to_string())
            })?;

        let mut settings = Self::new(github_token);
        if let Some(endpoint) = env_str("SHERROR_GRAPHQL_ENDPOINT").and_then(non_empty) {
            settings.graphql_endpoint = endpoint;
        }
        if let Some(path) = env_str("SHERROR_CONFIG").and_then(non_empty) {
            settings.config_path = PathBuf::from(path);
        }
        settings.http_timeout = env_u64("SHERROR_HTTP_TIMEOUT_MS").map(Duration::from_millis);

        Ok(settings)
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotenv_lines() {
        let parsed = parse_dotenv(
            "# comment\nGITHUB_TOKEN=\"abc\"\nexport SHERROR_CONFIG='cfg.ts'\nBROKEN\n =x\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("GITHUB_TOKEN".to_string(), "abc".to_string()),
                ("SHERROR_CONFIG".to_string(), "cfg.ts".to_string()),
            ]
        );
    }

    #[test]
    fn new_uses_defaults() {
        let s = Settings::new("tok");
        assert_eq!(s.graphql_endpoint, DEFAULT_GRAPHQL_ENDPOINT);
        assert_eq!(s.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(s.http_timeout.is_none());
    }

    #[test]
    fn non_empty_rejects_blank() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}
