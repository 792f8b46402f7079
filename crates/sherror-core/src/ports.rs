use async_trait::async_trait;

use crate::{domain::*, Result};

/// Page size used when listing discussions in a category.
pub const DISCUSSION_PAGE_SIZE: usize = 100;

/// Hexagonal port for the remote discussion platform.
///
/// Every call is awaited sequentially by the engine; implementations do not
/// need to be safe for concurrent use by the same run.
#[async_trait]
pub trait DiscussionApi: Send + Sync {
    /// Repository id plus its discussion categories. `Error::NotFound` when
    /// the repository cannot be located.
    async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo>;

    async fn discussion(&self, repo: &RepoRef, number: u64) -> Result<Option<RemoteDiscussion>>;

    async fn discussions_in_category(
        &self,
        repo: &RepoRef,
        category_id: &str,
        first: usize,
    ) -> Result<Vec<RemoteDiscussion>>;

    async fn create_discussion(&self, input: NewDiscussion) -> Result<CreatedDiscussion>;

    async fn update_discussion(&self, id: &str, title: &str, body: &str) -> Result<()>;

    async fn delete_discussion(&self, id: &str) -> Result<()>;
}

/// Resolves the remote repository the local checkout belongs to.
#[async_trait]
pub trait RepoLocator: Send + Sync {
    async fn locate(&self) -> Result<RepoRef>;
}

/// Persists in-memory config changes back into the local artifact.
#[async_trait]
pub trait ConfigWriter: Send + Sync {
    async fn write_back(&self, config: &SherrorConfig) -> Result<()>;
}
