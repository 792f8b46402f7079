//! GitHub adapters for sherror: GraphQL discussions client and git remote lookup.

pub mod git;
pub mod graphql;
pub mod queries;

use std::sync::Arc;

use sherror_core::{artifact::ArtifactFile, config::Settings, Remote, Result};

pub use git::{parse_remote_url, GitRemoteLocator};
pub use graphql::GithubClient;

/// Wire the default adapters: GitHub GraphQL, the `origin` remote of the
/// current directory, and the artifact at `settings.config_path`.
pub fn remote_from_settings(settings: &Settings) -> Result<Remote> {
    Ok(Remote {
        api: Arc::new(GithubClient::new(settings)?),
        locator: Arc::new(GitRemoteLocator::default()),
        writer: Arc::new(ArtifactFile::new(settings.config_path.clone())),
    })
}
