use std::collections::HashSet;

use crate::{
    accessor::ErrorHandle,
    domain::SherrorConfig,
    errors::Error,
    sync::{self, ClearReport, Remote, SyncReport},
    Result,
};

/// Entry point: owns the config store and, optionally, the remote ports.
///
/// `sync` and `clear` mutate the in-memory config; callers must not run them
/// concurrently on the same instance (they take `&mut self`).
pub struct Sherror {
    config: SherrorConfig,
    remote: Option<Remote>,
}

impl Sherror {
    /// Validate `config` and build a client usable for `get`.
    pub fn new(config: SherrorConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self {
            config,
            remote: None,
        })
    }

    /// Attach the remote collaborators needed by `sync` and `clear`.
    pub fn with_remote(mut self, remote: Remote) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn config(&self) -> &SherrorConfig {
        &self.config
    }

    /// Look up an error by code. Pure read: no network access.
    pub fn get(&self, code: i64) -> Result<ErrorHandle> {
        self.config
            .errors
            .iter()
            .find(|e| e.code == code)
            .map(|def| ErrorHandle::new(def, self.config.printer.clone()))
            .ok_or_else(|| Error::NotFound(format!("no error defined with code {code}")))
    }

    pub async fn sync(&mut self) -> Result<SyncReport> {
        let remote = self.remote.as_ref().ok_or_else(missing_remote)?;
        sync::synchronize(remote, &mut self.config).await
    }

    pub async fn clear(&mut self) -> Result<ClearReport> {
        let remote = self.remote.as_ref().ok_or_else(missing_remote)?;
        sync::clear(remote, &mut self.config).await
    }
}

fn missing_remote() -> Error {
    Error::Config("no remote configured; call Sherror::with_remote first".to_string())
}

fn validate_config(config: &SherrorConfig) -> Result<()> {
    if config.category_name.trim().is_empty() {
        return Err(Error::Config("categoryName must not be empty".to_string()));
    }
    if config.errors.is_empty() {
        return Err(Error::Config("errors must not be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for def in &config.errors {
        if !seen.insert(def.code) {
            return Err(Error::Config(format!("duplicate error code {}", def.code)));
        }
    }
    Ok(())
}
