//! GitHub adapter.
//!
//! Talks to the REST API through Octocrab, following `Link` headers until the
//! last page. Labels are checked client-side because the pulls endpoint has
//! no label query.

mod client;
mod models;

use async_trait::async_trait;
use http::Uri;
use octocrab::{Octocrab, Page as OctocrabPage};

use self::client::{build_octocrab_client, map_octocrab_error};
use self::models::{ApiChangedFile, ApiPullRequest};
use crate::pull_request::PullRequestService;
use crate::pull_request::auth::AuthProvider;
use crate::pull_request::error::{ProviderError, classify_by_status, escalate};
use crate::pull_request::models::PullRequest;
use crate::pull_request::normalise::contains_labels;
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::require_identifier;

const PER_PAGE: &str = "100";

/// Connection settings for [`GithubService`].
#[derive(Debug, Clone, Default)]
pub struct GithubOptions {
    /// API base URL; the public API when blank.
    pub base_url: Option<String>,
    /// Personal access token; anonymous access when blank.
    pub token: String,
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Labels every returned pull request must carry.
    pub labels: Vec<String>,
    /// Also fetch the files touched by each pull request.
    pub include_changed_files: bool,
}

/// Lists open pull requests from one GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubService {
    client: Octocrab,
    owner: String,
    repository: String,
    labels: Vec<String>,
    include_changed_files: bool,
}

enum Cursor {
    First,
    Next(Uri),
}

impl GithubService {
    /// Builds the service and its Octocrab client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when the owner or repository
    /// is blank, and the client construction errors of Octocrab otherwise.
    pub fn new(options: GithubOptions) -> Result<Self, ProviderError> {
        let owner = require_identifier(&options.owner, "GitHub owner")?;
        let repository = require_identifier(&options.repository, "GitHub repository")?;
        let auth = AuthProvider::from_token(&options.token);
        let client = build_octocrab_client(&auth, options.base_url.as_deref())?;
        Ok(Self::with_client(client, owner, repository, options.labels)
            .include_changed_files(options.include_changed_files))
    }

    /// Wraps an existing Octocrab client.
    #[must_use]
    pub fn with_client(
        client: Octocrab,
        owner: impl Into<String>,
        repository: impl Into<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repository: repository.into(),
            labels,
            include_changed_files: false,
        }
    }

    /// Enables or disables the per pull request changed-files lookup.
    #[must_use]
    pub const fn include_changed_files(mut self, enabled: bool) -> Self {
        self.include_changed_files = enabled;
        self
    }

    fn pulls_path(&self) -> String {
        format!("/repos/{}/{}/pulls", self.owner, self.repository)
    }

    fn operation(&self) -> String {
        format!(
            "list pull requests for {}/{}",
            self.owner, self.repository
        )
    }

    async fn fetch_page(
        &self,
        cursor: Cursor,
    ) -> Result<Page<PullRequest, Cursor>, ProviderError> {
        let fetched = match cursor {
            Cursor::First => self
                .client
                .get::<OctocrabPage<ApiPullRequest>, _, _>(
                    self.pulls_path(),
                    Some(&[("state", "open"), ("per_page", PER_PAGE)]),
                )
                .await
                .map(Some),
            Cursor::Next(uri) => self.client.get_page::<ApiPullRequest>(&Some(uri)).await,
        };
        let Some(page) = fetched.map_err(|error| {
            escalate(
                map_octocrab_error(&self.operation(), &error),
                classify_by_status,
            )
        })?
        else {
            return Ok(Page::new(Vec::new(), None));
        };

        let next = page.next.map(Cursor::Next);
        let mut items = Vec::with_capacity(page.items.len());
        for pull in page.items {
            if !contains_labels(&self.labels, &pull.label_names()) {
                continue;
            }
            let Some(mut pull_request) = pull.into_pull_request() else {
                tracing::debug!(
                    owner = %self.owner,
                    repository = %self.repository,
                    "skipping GitHub pull request with missing fields"
                );
                continue;
            };
            if self.include_changed_files {
                pull_request.changed_files = self.changed_files(pull_request.number).await?;
            }
            items.push(pull_request);
        }
        Ok(Page::new(items, next))
    }

    async fn changed_files(&self, number: u64) -> Result<Vec<String>, ProviderError> {
        let operation = format!(
            "list changed files of {}/{}#{number}",
            self.owner, self.repository
        );
        let first = self
            .client
            .get::<OctocrabPage<ApiChangedFile>, _, _>(
                format!("{}/{number}/files", self.pulls_path()),
                Some(&[("per_page", PER_PAGE)]),
            )
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;
        let files = self
            .client
            .all_pages(first)
            .await
            .map_err(|error| map_octocrab_error(&operation, &error))?;
        Ok(files.into_iter().filter_map(|file| file.filename).collect())
    }
}

#[async_trait]
impl PullRequestService for GithubService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        collect_pages(Cursor::First, move |cursor| self.fetch_page(cursor)).await
    }
}
