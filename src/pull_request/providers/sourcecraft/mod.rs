//! SourceCraft adapter.
//!
//! Pages are chained with `page_token`. The listing has no commit hash, so
//! each pull request's source branch is fetched to learn its head commit;
//! a pull request whose branch no longer exists is skipped.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ProviderError, classify_by_status, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::{contains_labels, strip_branch_ref};
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::{
    TlsConfig, base_url, endpoint, get_json, get_optional_json, require_identifier,
};

const DEFAULT_BASE_URL: &str = "https://api.sourcecraft.tech";
const PAGE_SIZE: &str = "100";

/// Connection settings for [`SourceCraftService`].
#[derive(Debug, Clone, Default)]
pub struct SourceCraftOptions {
    /// API URL; `https://api.sourcecraft.tech` when blank.
    pub base_url: Option<String>,
    /// Personal access token, sent as a bearer token.
    pub token: String,
    /// Organisation slug.
    pub organization: String,
    /// Repository slug.
    pub repository: String,
    /// Labels every returned pull request must carry.
    pub labels: Vec<String>,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists open pull requests from one SourceCraft repository.
pub struct SourceCraftService {
    factory: Arc<dyn ClientFactory>,
    organization: String,
    repository: String,
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    pull_requests: Vec<ApiPullRequest>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: Option<i64>,
    title: Option<String>,
    source_branch: Option<String>,
    target_branch: Option<String>,
    author: Option<ApiAuthor>,
    labels: Option<Vec<ApiLabel>>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBranch {
    commit: Option<ApiCommit>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    hash: Option<String>,
}

impl ApiPullRequest {
    fn label_names(&self) -> Vec<String> {
        self.labels
            .iter()
            .flatten()
            .filter_map(|label| label.name.clone())
            .collect()
    }
}

impl SourceCraftService {
    /// Builds the service with a token, or anonymously when it is blank.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when an identifier is blank, the base URL
    /// is invalid, or the HTTP client cannot be built.
    pub fn new(options: SourceCraftOptions) -> Result<Self, ProviderError> {
        let auth = AuthProvider::from_token(&options.token);
        Self::with_auth(options, &auth)
    }

    /// Builds the service with an explicit authentication strategy.
    ///
    /// # Errors
    ///
    /// See [`SourceCraftService::new`].
    pub fn with_auth(
        options: SourceCraftOptions,
        auth: &AuthProvider,
    ) -> Result<Self, ProviderError> {
        let organization = require_identifier(&options.organization, "SourceCraft organization")?;
        let repository = require_identifier(&options.repository, "SourceCraft repository")?;
        let base = base_url(options.base_url.as_deref(), DEFAULT_BASE_URL)?;
        let factory = auth.create_client_factory(base, &options.tls, TokenScheme::Bearer)?;
        Ok(Self {
            factory,
            organization,
            repository,
            labels: options.labels,
        })
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        token: Option<String>,
    ) -> Result<Page<PullRequest, Option<String>>, ProviderError> {
        let url = endpoint(
            client.base_url(),
            &["repos", &self.organization, &self.repository, "pulls"],
        )?;
        let mut query = vec![("status", "open".to_owned()), ("page_size", PAGE_SIZE.to_owned())];
        if let Some(page_token) = token {
            query.push(("page_token", page_token));
        }
        let operation = format!(
            "list pull requests for {}/{}",
            self.organization, self.repository
        );
        let body = get_json::<ApiPage>(client.get(url).query(&query), &operation)
            .await?
            .body;

        let next = required(body.next_page_token).map(Some);
        let mut items = Vec::with_capacity(body.pull_requests.len());
        for pull in body.pull_requests {
            if !contains_labels(&self.labels, &pull.label_names()) {
                continue;
            }
            if let Some(pull_request) = self.resolve(client, pull).await? {
                items.push(pull_request);
            }
        }
        Ok(Page::new(items, next))
    }

    /// Completes a listed pull request with the head commit of its source
    /// branch, or returns `None` when a field or the branch is missing.
    async fn resolve(
        &self,
        client: &AuthorizedClient,
        pull: ApiPullRequest,
    ) -> Result<Option<PullRequest>, ProviderError> {
        let labels = pull.label_names();
        let number = pull.number.and_then(pull_request_number);
        let (Some(number), Some(branch)) = (number, required(pull.source_branch)) else {
            tracing::debug!(
                organization = %self.organization,
                repository = %self.repository,
                "skipping SourceCraft pull request with missing fields"
            );
            return Ok(None);
        };

        let url = endpoint(
            client.base_url(),
            &[
                "repos",
                &self.organization,
                &self.repository,
                "branches",
                &branch,
            ],
        )?;
        let operation = format!(
            "get branch {branch} of {}/{}",
            self.organization, self.repository
        );
        let commit = get_optional_json::<ApiBranch>(client.get(url), &operation)
            .await?
            .and_then(|found| found.commit)
            .and_then(|commit| required(commit.hash));
        let Some(head_sha) = commit else {
            tracing::debug!(
                organization = %self.organization,
                repository = %self.repository,
                branch = %branch,
                "skipping SourceCraft pull request whose source branch is gone"
            );
            return Ok(None);
        };

        Ok(Some(PullRequest {
            number,
            title: pull.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&pull.target_branch.unwrap_or_default()).to_owned(),
            head_sha,
            labels,
            author: pull.author.and_then(|author| author.slug).unwrap_or_default(),
            changed_files: Vec::new(),
        }))
    }
}

#[async_trait]
impl PullRequestService for SourceCraftService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(None, move |token| self.fetch_page(client, token))
            .await
            .map_err(|error| escalate(error, classify_by_status))
    }
}
