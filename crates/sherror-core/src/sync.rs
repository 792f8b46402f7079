//! Reconciles local error definitions with remote discussions.
//!
//! Entries are processed strictly in declaration order and every remote call is
//! awaited before the next one is issued. Mutations already applied when a
//! later call fails are not rolled back.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::{
        discussion_number_from_link, DiscussionCategory, ErrorDefinition, NewDiscussion, RepoRef,
        RepositoryInfo, SherrorConfig,
    },
    errors::Error,
    ports::{ConfigWriter, DiscussionApi, RepoLocator, DISCUSSION_PAGE_SIZE},
    Result,
};

/// The external collaborators a sync or clear run talks to.
#[derive(Clone)]
pub struct Remote {
    pub api: Arc<dyn DiscussionApi>,
    pub locator: Arc<dyn RepoLocator>,
    pub writer: Arc<dyn ConfigWriter>,
}

/// What a `synchronize` run did, by error code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<i64>,
    pub updated: Vec<i64>,
    pub unchanged: Vec<i64>,
}

impl SyncReport {
    /// True when new links were attached and must be written back.
    pub fn is_dirty(&self) -> bool {
        !self.created.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub deleted: usize,
    pub unlinked: usize,
}

struct Target {
    repo: RepoRef,
    info: RepositoryInfo,
}

impl Target {
    async fn resolve(remote: &Remote) -> Result<Self> {
        let repo = remote.locator.locate().await?;
        let info = remote.api.repository(&repo).await?;
        debug!(repo = %repo, categories = info.categories.len(), "repository resolved");
        Ok(Self { repo, info })
    }

    fn category(&self, name: &str) -> Option<&DiscussionCategory> {
        self.info.categories.iter().find(|c| c.name == name)
    }

    fn require_category(&self, name: &str) -> Result<&DiscussionCategory> {
        self.category(name).ok_or_else(|| Error::CategoryNotFound {
            name: name.to_string(),
            available: self.info.categories.iter().map(|c| c.name.clone()).collect(),
        })
    }
}

/// Create or update one remote discussion per error definition.
///
/// Newly created links are attached to `config` and persisted with a single
/// writeback. If the run aborts after creating discussions, the links gathered
/// so far are still written back before the error is returned.
pub async fn synchronize(remote: &Remote, config: &mut SherrorConfig) -> Result<SyncReport> {
    let target = Target::resolve(remote).await?;
    let category = target.require_category(&config.category_name)?.clone();
    info!(
        repo = %target.repo,
        category = %category.name,
        errors = config.errors.len(),
        "syncing discussions"
    );

    let mut report = SyncReport::default();
    let outcome = sync_entries(remote, &target, &category, &mut config.errors, &mut report).await;

    if report.is_dirty() {
        if let Err(e) = remote.writer.write_back(config).await {
            return match outcome {
                Ok(()) => Err(e),
                Err(original) => {
                    warn!(error = %e, "writeback after failed sync also failed");
                    Err(original)
                }
            };
        }
    }

    outcome?;
    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        "sync complete"
    );
    Ok(report)
}

async fn sync_entries(
    remote: &Remote,
    target: &Target,
    category: &DiscussionCategory,
    errors: &mut [ErrorDefinition],
    report: &mut SyncReport,
) -> Result<()> {
    for (index, def) in errors.iter_mut().enumerate() {
        validate_entry(index, def)?;

        let Some(link) = def.discussion_link.as_deref() else {
            let created = remote
                .api
                .create_discussion(NewDiscussion {
                    repository_id: target.info.id.clone(),
                    category_id: category.id.clone(),
                    title: def.post_title.clone(),
                    body: def.post_body.clone(),
                })
                .await?;
            info!(code = def.code, number = created.number, "discussion created");
            def.discussion_link = Some(created.url);
            report.created.push(def.code);
            continue;
        };

        let number = discussion_number_from_link(link).ok_or_else(|| Error::Validation {
            index,
            code: def.code,
            reason: format!("discussion link {link:?} does not end in a discussion number"),
        })?;

        let existing = remote
            .api
            .discussion(&target.repo, number)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "discussion #{number} linked from error code {}",
                    def.code
                ))
            })?;

        if existing.title == def.post_title && existing.body == def.post_body {
            debug!(code = def.code, number, "discussion unchanged");
            report.unchanged.push(def.code);
            continue;
        }

        remote
            .api
            .update_discussion(&existing.id, &def.post_title, &def.post_body)
            .await?;
        info!(code = def.code, number, "discussion updated");
        report.updated.push(def.code);
    }
    Ok(())
}

fn validate_entry(index: usize, def: &ErrorDefinition) -> Result<()> {
    let reason = if def.post_title.trim().is_empty() {
        "postTitle is empty"
    } else if def.post_body.trim().is_empty() {
        "postBody is empty"
    } else {
        return Ok(());
    };
    Err(Error::Validation {
        index,
        code: def.code,
        reason: reason.to_string(),
    })
}

/// Delete every discussion in the configured category and unlink local entries.
///
/// A missing category means there is nothing to delete. The first failed
/// deletion aborts the run; local links are only stripped after all deletions
/// succeed.
pub async fn clear(remote: &Remote, config: &mut SherrorConfig) -> Result<ClearReport> {
    let target = Target::resolve(remote).await?;
    let Some(category) = target.category(&config.category_name) else {
        info!(category = %config.category_name, "category not found, nothing to clear");
        return Ok(ClearReport::default());
    };

    let discussions = remote
        .api
        .discussions_in_category(&target.repo, &category.id, DISCUSSION_PAGE_SIZE)
        .await?;
    info!(
        repo = %target.repo,
        category = %category.name,
        count = discussions.len(),
        "deleting discussions"
    );

    let mut report = ClearReport::default();
    for discussion in &discussions {
        remote.api.delete_discussion(&discussion.id).await?;
        debug!(number = discussion.number, "discussion deleted");
        report.deleted += 1;
    }

    for def in config.errors.iter_mut() {
        if def.discussion_link.take().is_some() {
            report.unlinked += 1;
        }
    }
    remote.writer.write_back(config).await?;

    info!(deleted = report.deleted, unlinked = report.unlinked, "clear complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreatedDiscussion, RemoteDiscussion};
    use async_trait::async_trait;
    use std::{collections::BTreeMap, sync::Mutex};

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Repository,
        Discussion(u64),
        List(String),
        Create(String),
        Update(String),
        Delete(String),
    }

    #[derive(Default)]
    struct FakeApi {
        categories: Vec<DiscussionCategory>,
        missing_repo: bool,
        discussions: Mutex<BTreeMap<u64, RemoteDiscussion>>,
        calls: Mutex<Vec<Call>>,
        fail_create_titled: Option<String>,
        fail_delete_number: Option<u64>,
    }

    impl FakeApi {
        fn with_category(name: &str) -> Self {
            Self {
                categories: vec![
                    DiscussionCategory {
                        id: "CAT_general".to_string(),
                        name: "General".to_string(),
                    },
                    DiscussionCategory {
                        id: format!("CAT_{name}"),
                        name: name.to_string(),
                    },
                ],
                ..Self::default()
            }
        }

        fn seed(&self, number: u64, title: &str, body: &str, category_id: &str) {
            self.discussions.lock().unwrap().insert(
                number,
                RemoteDiscussion {
                    id: format!("D_{number}"),
                    number,
                    title: title.to_string(),
                    body: body.to_string(),
                    category_id: category_id.to_string(),
                },
            );
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|c| pred(*c)).count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl DiscussionApi for FakeApi {
        async fn repository(&self, repo: &RepoRef) -> Result<RepositoryInfo> {
            self.record(Call::Repository);
            if self.missing_repo {
                return Err(Error::NotFound(format!("repository {repo}")));
            }
            Ok(RepositoryInfo {
                id: "R_1".to_string(),
                categories: self.categories.clone(),
            })
        }

        async fn discussion(
            &self,
            _repo: &RepoRef,
            number: u64,
        ) -> Result<Option<RemoteDiscussion>> {
            self.record(Call::Discussion(number));
            Ok(self.discussions.lock().unwrap().get(&number).cloned())
        }

        async fn discussions_in_category(
            &self,
            _repo: &RepoRef,
            category_id: &str,
            first: usize,
        ) -> Result<Vec<RemoteDiscussion>> {
            self.record(Call::List(category_id.to_string()));
            Ok(self
                .discussions
                .lock()
                .unwrap()
                .values()
                .filter(|d| d.category_id == category_id)
                .take(first)
                .cloned()
                .collect())
        }

        async fn create_discussion(&self, input: NewDiscussion) -> Result<CreatedDiscussion> {
            self.record(Call::Create(input.title.clone()));
            if self.fail_create_titled.as_deref() == Some(input.title.as_str()) {
                return Err(Error::RemoteProtocol("create rejected".to_string()));
            }
            let mut map = self.discussions.lock().unwrap();
            let number = map.keys().next_back().copied().unwrap_or(0) + 1;
            map.insert(
                number,
                RemoteDiscussion {
                    id: format!("D_{number}"),
                    number,
                    title: input.title,
                    body: input.body,
                    category_id: input.category_id,
                },
            );
            Ok(CreatedDiscussion {
                id: format!("D_{number}"),
                number,
                url: format!("https://github.com/acme/app/discussions/{number}"),
            })
        }

        async fn update_discussion(&self, id: &str, title: &str, body: &str) -> Result<()> {
            self.record(Call::Update(id.to_string()));
            let mut map = self.discussions.lock().unwrap();
            let d = map
                .values_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            d.title = title.to_string();
            d.body = body.to_string();
            Ok(())
        }

        async fn delete_discussion(&self, id: &str) -> Result<()> {
            self.record(Call::Delete(id.to_string()));
            let mut map = self.discussions.lock().unwrap();
            let number = map
                .values()
                .find(|d| d.id == id)
                .map(|d| d.number)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            if self.fail_delete_number == Some(number) {
                return Err(Error::RemoteProtocol("delete rejected".to_string()));
            }
            map.remove(&number);
            Ok(())
        }
    }

    struct FakeLocator;

    #[async_trait]
    impl RepoLocator for FakeLocator {
        async fn locate(&self) -> Result<RepoRef> {
            Ok(RepoRef {
                owner: "acme".to_string(),
                name: "app".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakeWriter {
        writes: Mutex<Vec<Vec<ErrorDefinition>>>,
    }

    impl FakeWriter {
        fn writes(&self) -> Vec<Vec<ErrorDefinition>> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConfigWriter for FakeWriter {
        async fn write_back(&self, config: &SherrorConfig) -> Result<()> {
            self.writes.lock().unwrap().push(config.errors.clone());
            Ok(())
        }
    }

    fn remote(api: Arc<FakeApi>, writer: Arc<FakeWriter>) -> Remote {
        Remote {
            api,
            locator: Arc::new(FakeLocator),
            writer,
        }
    }

    fn entry(code: i64, title: &str, body: &str, link: Option<&str>) -> ErrorDefinition {
        ErrorDefinition {
            code,
            app_message: format!("error {code}"),
            post_title: title.to_string(),
            post_body: body.to_string(),
            discussion_link: link.map(str::to_string),
        }
    }

    fn config(errors: Vec<ErrorDefinition>) -> SherrorConfig {
        SherrorConfig {
            category_name: "Errors".to_string(),
            errors,
            printer: None,
        }
    }

    #[tokio::test]
    async fn creates_discussion_and_writes_back_once() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(1, "Disk full", "Free space", None)]);

        let report = synchronize(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap();

        assert_eq!(report.created, vec![1]);
        assert_eq!(
            cfg.errors[0].discussion_link.as_deref(),
            Some("https://github.com/acme/app/discussions/1")
        );
        assert_eq!(api.count(|c| matches!(c, Call::Create(_))), 1);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], cfg.errors);
    }

    #[tokio::test]
    async fn identical_discussion_is_a_no_op() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        api.seed(27, "Disk full", "Free space", "CAT_Errors");
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(
            1,
            "Disk full",
            "Free space",
            Some("https://github.com/acme/app/discussions/27"),
        )]);

        let report = synchronize(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap();

        assert_eq!(report.unchanged, vec![1]);
        assert!(api.calls().contains(&Call::Discussion(27)));
        assert_eq!(api.count(|c| matches!(c, Call::Update(_))), 0);
        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn changed_body_issues_single_update_without_writeback() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        api.seed(27, "Disk full", "old body", "CAT_Errors");
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(
            1,
            "Disk full",
            "new body",
            Some("https://github.com/acme/app/discussions/27"),
        )]);

        let report = synchronize(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap();

        assert_eq!(report.updated, vec![1]);
        assert_eq!(
            api.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Update(_)))
                .collect::<Vec<_>>(),
            vec![Call::Update("D_27".to_string())]
        );
        assert_eq!(api.discussions.lock().unwrap()[&27].body, "new body");
        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn missing_category_aborts_before_any_mutation() {
        let api = Arc::new(FakeApi::with_category("Announcements"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(1, "t", "b", None)]);

        let err = synchronize(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap_err();

        match err {
            Error::CategoryNotFound { name, available } => {
                assert_eq!(name, "Errors");
                assert_eq!(available, vec!["General".to_string(), "Announcements".to_string()]);
            }
            other => panic!("expected CategoryNotFound, got {other:?}"),
        }
        assert_eq!(api.calls(), vec![Call::Repository]);
        assert!(writer.writes().is_empty());
        assert_eq!(cfg.errors[0].discussion_link, None);
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let api = Arc::new(FakeApi {
            missing_repo: true,
            ..FakeApi::with_category("Errors")
        });
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(1, "t", "b", None)]);

        let err = synchronize(&remote(api, writer), &mut cfg).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn linked_discussion_missing_remotely_is_not_found() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(
            4,
            "t",
            "b",
            Some("https://github.com/acme/app/discussions/99"),
        )]);

        let err = synchronize(&remote(api, writer.clone()), &mut cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m.contains("#99")));
        assert!(writer.writes().is_empty());
    }

    #[tokio::test]
    async fn invalid_entry_stops_run_but_keeps_earlier_links() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![
            entry(1, "ok", "body", None),
            entry(2, "  ", "body", None),
            entry(3, "never", "reached", None),
        ]);

        let err = synchronize(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { index: 1, code: 2, .. }));
        assert_eq!(api.count(|c| matches!(c, Call::Create(_))), 1);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0][0].discussion_link.is_some());
        assert!(writes[0][2].discussion_link.is_none());
    }

    #[tokio::test]
    async fn remote_failure_after_create_flushes_links_once() {
        let api = Arc::new(FakeApi {
            fail_create_titled: Some("second".to_string()),
            ..FakeApi::with_category("Errors")
        });
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![
            entry(1, "first", "body", None),
            entry(2, "second", "body", None),
        ]);

        let err = synchronize(&remote(api, writer.clone()), &mut cfg)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteProtocol(_)));
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes[0][0].discussion_link.is_some());
        assert!(writes[0][1].discussion_link.is_none());
    }

    #[tokio::test]
    async fn unparseable_link_is_validation_error() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(1, "t", "b", Some("https://example.com/nope"))]);

        let err = synchronize(&remote(api, writer), &mut cfg).await.unwrap_err();
        assert!(matches!(err, Error::Validation { index: 0, .. }));
    }

    #[tokio::test]
    async fn clear_deletes_all_and_unlinks_entries() {
        let api = Arc::new(FakeApi::with_category("Errors"));
        api.seed(1, "a", "a", "CAT_Errors");
        api.seed(2, "b", "b", "CAT_Errors");
        api.seed(3, "c", "c", "CAT_Errors");
        api.seed(4, "other", "other", "CAT_general");
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(
            (1..=3)
                .map(|n| {
                    entry(
                        n,
                        "t",
                        "b",
                        Some(format!("https://github.com/acme/app/discussions/{n}").as_str()),
                    )
                })
                .collect(),
        );

        let report = clear(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap();

        assert_eq!(report, ClearReport { deleted: 3, unlinked: 3 });
        assert_eq!(api.count(|c| matches!(c, Call::Delete(_))), 3);
        assert_eq!(
            api.discussions.lock().unwrap().keys().copied().collect::<Vec<_>>(),
            vec![4]
        );
        assert!(cfg.errors.iter().all(|e| e.discussion_link.is_none()));
        assert_eq!(writer.writes().len(), 1);
    }

    #[tokio::test]
    async fn clear_without_category_is_a_no_op() {
        let api = Arc::new(FakeApi::with_category("Announcements"));
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(
            1,
            "t",
            "b",
            Some("https://github.com/acme/app/discussions/1"),
        )]);

        let report = clear(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap();

        assert_eq!(report, ClearReport::default());
        assert_eq!(api.calls(), vec![Call::Repository]);
        assert!(writer.writes().is_empty());
        assert!(cfg.errors[0].discussion_link.is_some());
    }

    #[tokio::test]
    async fn clear_stops_at_first_failed_deletion() {
        let api = Arc::new(FakeApi {
            fail_delete_number: Some(2),
            ..FakeApi::with_category("Errors")
        });
        api.seed(1, "a", "a", "CAT_Errors");
        api.seed(2, "b", "b", "CAT_Errors");
        api.seed(3, "c", "c", "CAT_Errors");
        let writer = Arc::new(FakeWriter::default());
        let mut cfg = config(vec![entry(
            1,
            "t",
            "b",
            Some("https://github.com/acme/app/discussions/1"),
        )]);

        let err = clear(&remote(api.clone(), writer.clone()), &mut cfg)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteProtocol(_)));
        assert_eq!(api.count(|c| matches!(c, Call::Delete(_))), 2);
        assert_eq!(
            api.discussions.lock().unwrap().keys().copied().collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(writer.writes().is_empty());
        assert!(cfg.errors[0].discussion_link.is_some());
    }
}
