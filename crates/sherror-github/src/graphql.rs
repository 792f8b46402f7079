//! GitHub GraphQL adapter implementing `DiscussionApi`.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use sherror_core::{
    config::Settings,
    domain::{
        CreatedDiscussion, DiscussionCategory, NewDiscussion, RemoteDiscussion, RepoRef,
        RepositoryInfo,
    },
    errors::Error,
    ports::DiscussionApi,
    Result,
};

use crate::queries;

const USER_AGENT: &str = concat!("sherror-rust/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct GithubClient {
    token: String,
    endpoint: String,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.http_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::RemoteProtocol(format!("http client build failed: {e}")))?;

        Ok(Self {
            token: settings.github_token.clone(),
            endpoint: settings.graphql_endpoint.clone(),
            http,
        })
    }

    /// POST one GraphQL document and decode its `data`.
    ///
    /// `tolerate_missing` names a response field whose NOT_FOUND error is
    /// reported as a null value instead of a failure.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        tolerate_missing: Option<&str>,
    ) -> Result<T> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::RemoteProtocol(format!("github request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RemoteProtocol(format!(
                "github graphql failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let envelope: Envelope = resp
            .json()
            .await
            .map_err(|e| Error::RemoteProtocol(format!("github json error: {e}")))?;
        envelope.into_data(tolerate_missing)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    path: Vec<Value>,
}

impl GraphQlError {
    fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some("NOT_FOUND")
    }

    fn leaf(&self) -> Option<&str> {
        self.path.last().and_then(|p| p.as_str())
    }
}

impl Envelope {
    fn into_data<T: DeserializeOwned>(self, tolerate_missing: Option<&str>) -> Result<T> {
        let fatal: Vec<&GraphQlError> = self
            .errors
            .iter()
            .filter(|e| {
                !(e.is_not_found() && tolerate_missing.is_some() && e.leaf() == tolerate_missing)
            })
            .collect();

        if !fatal.is_empty() {
            let messages = fatal
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if fatal.iter().all(|e| e.is_not_found()) {
                return Err(Error::NotFound(messages));
            }
            return Err(Error::RemoteProtocol(messages));
        }

        let data = self
            .data
            .ok_or_else(|| Error::RemoteProtocol("github response has no data".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| Error::RemoteProtocol(format!("unexpected github response shape: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Connection<T> {
    fn into_vec(self) -> Vec<T> {
        self.nodes.into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    discussion_categories: Connection<DiscussionCategory>,
}

#[derive(Debug, Deserialize)]
struct DiscussionData {
    repository: Option<DiscussionRepository>,
}

#[derive(Debug, Deserialize)]
struct DiscussionRepository {
    discussion: Option<DiscussionNode>,
}

#[derive(Debug, Deserialize)]
struct DiscussionListData {
    repository: Option<DiscussionListRepository>,
}

#[derive(Debug, Deserialize)]
struct DiscussionListRepository {
    discussions: Connection<DiscussionNode>,
}

#[derive(Debug, Deserialize)]
struct DiscussionNode {
    id: String,
    number: u64,
    title: String,
    body: String,
    category: IdRef,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

impl From<DiscussionNode> for RemoteDiscussion {
    fn from(n: DiscussionNode) -> Self {
        Self {
            id: n.id,
            number: n.number,
            title: n.title,
            body: n.body,
            category_id: n.category.id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_discussion: CreatePayload,
}

#[derive(Debug, Deserialize)]
struct CreatePayload {
    discussion: CreatedNode,
}

#[derive(Debug, Deserialize)]
struct CreatedNode {
    id: String,
    number: u64,
    url: String,
}

fn repository_not_found(repo: &RepoRef) -> Error {
    Error::NotFound(format!("repository {repo}"))
}

#[async_trait]
impl DiscussionApi for GithubClient {
    async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo> {
        let data: RepositoryData = self
            .execute(
                queries::REPOSITORY,
                json!({ "owner": repo.owner, "name": repo.name }),
                None,
            )
            .await?;
        let node = data.repository.ok_or_else(|| repository_not_found(repo))?;
        Ok(RepositoryInfo {
            id: node.id,
            categories: node.discussion_categories.into_vec(),
        })
    }

    async fn discussion(&self, repo: &RepoRef, number: u64) -> Result<Option<RemoteDiscussion>> {
        let data: DiscussionData = self
            .execute(
                queries::DISCUSSION,
                json!({ "owner": repo.owner, "name": repo.name, "number": number }),
                Some("discussion"),
            )
            .await?;
        let repository = data.repository.ok_or_else(|| repository_not_found(repo))?;
        Ok(repository.discussion.map(RemoteDiscussion::from))
    }

    async fn discussions_in_category(
        &self,
        repo: &RepoRef,
        category_id: &str,
        first: usize,
    ) -> Result<Vec<RemoteDiscussion>> {
        let data: DiscussionListData = self
            .execute(
                queries::DISCUSSIONS_IN_CATEGORY,
                json!({
                    "owner": repo.owner,
                    "name": repo.name,
                    "categoryId": category_id,
                    "first": first,
                }),
                None,
            )
            .await?;
        let repository = data.repository.ok_or_else(|| repository_not_found(repo))?;
        let discussions: Vec<RemoteDiscussion> = repository
            .discussions
            .into_vec()
            .into_iter()
            .map(RemoteDiscussion::from)
            .collect();
        debug!(repo = %repo, count = discussions.len(), "listed discussions");
        Ok(discussions)
    }

    async fn create_discussion(&self, input: NewDiscussion) -> Result<CreatedDiscussion> {
        let data: CreateData = self
            .execute(
                queries::CREATE_DISCUSSION,
                json!({
                    "repositoryId": input.repository_id,
                    "categoryId": input.category_id,
                    "title": input.title,
                    "body": input.body,
                }),
                None,
            )
            .await?;
        let node = data.create_discussion.discussion;
        Ok(CreatedDiscussion {
            id: node.id,
            number: node.number,
            url: node.url,
        })
    }

    async fn update_discussion(&self, id: &str, title: &str, body: &str) -> Result<()> {
        let _: Value = self
            .execute(
                queries::UPDATE_DISCUSSION,
                json!({ "discussionId": id, "title": title, "body": body }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete_discussion(&self, id: &str) -> Result<()> {
        let _: Value = self
            .execute(queries::DELETE_DISCUSSION, json!({ "id": id }), None)
            .await?;
        Ok(())
    }
}
