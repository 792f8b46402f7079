use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// One declared application error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDefinition {
    pub code: i64,
    pub app_message: String,
    pub post_title: String,
    pub post_body: String,
    /// Absent until the entry has been synchronized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussion_link: Option<String>,
}

impl ErrorDefinition {
    /// Discussion number encoded as the trailing numeric path segment of the link.
    pub fn discussion_number(&self) -> Option<u64> {
        self.discussion_link
            .as_deref()
            .and_then(discussion_number_from_link)
    }
}

/// Extract the trailing numeric segment of a discussion URL
/// (`https://github.com/o/r/discussions/27` -> 27).
pub fn discussion_number_from_link(link: &str) -> Option<u64> {
    let trimmed = link.trim().trim_end_matches('/');
    let trimmed = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    trimmed.rsplit('/').next()?.parse::<u64>().ok()
}

/// Row handed to a printer by `ErrorHandle::print`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrintRecord {
    pub code: i64,
    pub message: String,
    pub discussion: String,
    pub codepath: Option<String>,
}

pub type Printer = Arc<dyn Fn(&PrintRecord) + Send + Sync>;

/// Aggregate root: the category name plus the ordered error list.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SherrorConfig {
    pub category_name: String,
    pub errors: Vec<ErrorDefinition>,
    #[serde(skip)]
    pub printer: Option<Printer>,
}

impl fmt::Debug for SherrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SherrorConfig")
            .field("category_name", &self.category_name)
            .field("errors", &self.errors)
            .field("printer", &self.printer.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Remote repository coordinates (`owner/name`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DiscussionCategory {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub id: String,
    pub categories: Vec<DiscussionCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteDiscussion {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub category_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDiscussion {
    pub repository_id: String,
    pub category_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedDiscussion {
    pub id: String,
    pub number: u64,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_discussion_number() {
        assert_eq!(
            discussion_number_from_link("https://github.com/acme/app/discussions/27"),
            Some(27)
        );
        assert_eq!(
            discussion_number_from_link("https://github.com/acme/app/discussions/27/"),
            Some(27)
        );
        assert_eq!(
            discussion_number_from_link("https://github.com/acme/app/discussions/5#top"),
            Some(5)
        );
        assert_eq!(
            discussion_number_from_link("https://github.com/acme/app/discussions"),
            None
        );
        assert_eq!(discussion_number_from_link(""), None);
    }

    #[test]
    fn link_is_omitted_when_absent() {
        let def = ErrorDefinition {
            code: 1,
            app_message: "m".to_string(),
            post_title: "t".to_string(),
            post_body: "b".to_string(),
            discussion_link: None,
        };
        let v = serde_json::to_value(&def).unwrap();
        assert!(v.get("discussionLink").is_none());
        assert_eq!(v.get("appMessage").and_then(|m| m.as_str()), Some("m"));
    }
}
