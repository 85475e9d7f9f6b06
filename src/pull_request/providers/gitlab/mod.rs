//! GitLab adapter.
//!
//! Merge requests are read from the project endpoint in pages of 100,
//! following the `X-Next-Page` header. Required labels are sent to GitLab as
//! a query parameter, so every merge request returned already carries them.

use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde::Deserialize;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ProviderError, classify_by_status, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::strip_branch_ref;
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::{
    TlsConfig, base_url, endpoint, get_json, require_identifier,
};

const DEFAULT_BASE_URL: &str = "https://gitlab.com";
const DEFAULT_STATE: &str = "opened";
const PER_PAGE: &str = "100";
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Connection settings for [`GitlabService`].
#[derive(Debug, Clone, Default)]
pub struct GitlabOptions {
    /// Instance URL; `https://gitlab.com` when blank.
    pub base_url: Option<String>,
    /// Personal access token; anonymous access when blank.
    pub token: String,
    /// Numeric project id or `group/project` path.
    pub project: String,
    /// Labels every returned merge request must carry.
    pub labels: Vec<String>,
    /// Merge request state filter; `opened` when unset.
    pub state: Option<String>,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists merge requests from one GitLab project.
pub struct GitlabService {
    factory: Arc<dyn ClientFactory>,
    project: String,
    labels: Vec<String>,
    state: String,
}

#[derive(Debug, Deserialize)]
struct ApiMergeRequest {
    iid: Option<i64>,
    title: Option<String>,
    source_branch: Option<String>,
    target_branch: Option<String>,
    sha: Option<String>,
    labels: Option<Vec<String>>,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    username: Option<String>,
}

impl ApiMergeRequest {
    fn into_pull_request(self) -> Option<PullRequest> {
        let number = pull_request_number(self.iid?)?;
        let branch = required(self.source_branch)?;
        let head_sha = required(self.sha)?;
        Some(PullRequest {
            number,
            title: self.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&self.target_branch.unwrap_or_default()).to_owned(),
            head_sha,
            labels: self.labels.unwrap_or_default(),
            author: self
                .author
                .and_then(|author| author.username)
                .unwrap_or_default(),
            changed_files: Vec::new(),
        })
    }
}

impl GitlabService {
    /// Builds the service, presenting a non-blank token as `PRIVATE-TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the project is blank, the base URL is
    /// invalid, or the HTTP client cannot be built.
    pub fn new(options: GitlabOptions) -> Result<Self, ProviderError> {
        let auth = AuthProvider::from_token(&options.token);
        Self::with_auth(options, &auth)
    }

    /// Builds the service with an explicit authentication strategy.
    ///
    /// # Errors
    ///
    /// See [`GitlabService::new`].
    pub fn with_auth(options: GitlabOptions, auth: &AuthProvider) -> Result<Self, ProviderError> {
        let project = require_identifier(&options.project, "GitLab project")?;
        let base = base_url(options.base_url.as_deref(), DEFAULT_BASE_URL)?;
        let factory = auth.create_client_factory(base, &options.tls, TokenScheme::PrivateToken)?;
        let state = options
            .state
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE.to_owned());
        Ok(Self {
            factory,
            project,
            labels: options.labels,
            state,
        })
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        page: u32,
    ) -> Result<Page<PullRequest, u32>, ProviderError> {
        let url = endpoint(
            client.base_url(),
            &["api", "v4", "projects", &self.project, "merge_requests"],
        )?;
        let mut query = vec![
            ("per_page", PER_PAGE.to_owned()),
            ("page", page.to_string()),
            ("state", self.state.clone()),
        ];
        if !self.labels.is_empty() {
            query.push(("labels", self.labels.join(",")));
        }

        let operation = format!("list merge requests for project {}", self.project);
        let response =
            get_json::<Vec<ApiMergeRequest>>(client.get(url).query(&query), &operation).await?;
        let next = next_page(&response.headers);
        let items = response
            .body
            .into_iter()
            .filter_map(|merge_request| {
                let converted = merge_request.into_pull_request();
                if converted.is_none() {
                    tracing::debug!(
                        project = %self.project,
                        "skipping GitLab merge request with missing fields"
                    );
                }
                converted
            })
            .collect();
        Ok(Page::new(items, next))
    }
}

/// Reads the `X-Next-Page` header; blank, absent, or zero ends paging.
fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
}

#[async_trait]
impl PullRequestService for GitlabService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(1_u32, move |page| self.fetch_page(client, page))
            .await
            .map_err(|error| escalate(error, classify_by_status))
    }
}
