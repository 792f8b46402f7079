//! Repository discovery from the local `git` checkout.

use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use sherror_core::{domain::RepoRef, errors::Error, ports::RepoLocator, Result};

/// Reads `git remote get-url <remote>` and parses it into `owner/name`.
#[derive(Clone, Debug)]
pub struct GitRemoteLocator {
    git: PathBuf,
    remote: String,
    cwd: Option<PathBuf>,
}

impl Default for GitRemoteLocator {
    fn default() -> Self {
        Self {
            git: PathBuf::from("git"),
            remote: "origin".to_string(),
            cwd: None,
        }
    }
}

impl GitRemoteLocator {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    async fn remote_url(&self) -> Result<String> {
        let mut cmd = Command::new(&self.git);
        cmd.args(["remote", "get-url", self.remote.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| {
            Error::Config(format!("failed to run {}: {e}", self.git.display()))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Config(format!(
                "git remote {:?} is not readable: {}",
                self.remote,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl RepoLocator for GitRemoteLocator {
    async fn locate(&self) -> Result<RepoRef> {
        let url = self.remote_url().await?;
        let repo = parse_remote_url(&url)?;
        debug!(url = %url, repo = %repo, "git remote resolved");
        Ok(repo)
    }
}

/// Parse an SSH (`git@host:owner/repo.git`) or URL-style
/// (`https://host/owner/repo.git`, `ssh://git@host/owner/repo`) remote.
pub fn parse_remote_url(url: &str) -> Result<RepoRef> {
    let invalid = || Error::Config(format!("unrecognized git remote url: {url:?}"));
    let trimmed = url.trim().trim_end_matches('/');

    let path = if let Some((_, rest)) = trimmed.split_once("://") {
        let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        path
    } else {
        let (host, path) = trimmed.split_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }
        path
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(owner: &str, name: &str) -> RepoRef {
        RepoRef {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn parses_ssh_and_https_remotes() {
        assert_eq!(
            parse_remote_url("git@github.com:acme/app.git").unwrap(),
            repo("acme", "app")
        );
        assert_eq!(
            parse_remote_url("https://github.com/acme/app.git\n").unwrap(),
            repo("acme", "app")
        );
        assert_eq!(
            parse_remote_url("https://github.com/acme/app").unwrap(),
            repo("acme", "app")
        );
        assert_eq!(
            parse_remote_url("ssh://git@github.com/acme/my.app.git").unwrap(),
            repo("acme", "my.app")
        );
    }

    #[test]
    fn rejects_malformed_remotes() {
        for url in [
            "",
            "not a url",
            "https://github.com/acme",
            "https://github.com/acme/app/extra",
            "git@github.com:app.git",
            ":acme/app",
        ] {
            let err = parse_remote_url(url).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "expected Config error for {url:?}");
        }
    }

    #[tokio::test]
    async fn missing_git_binary_is_config_error() {
        let locator = GitRemoteLocator {
            git: PathBuf::from("/nonexistent/sherror-git"),
            ..GitRemoteLocator::default()
        };
        let err = locator.locate().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
