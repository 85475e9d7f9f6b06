//! Gitea adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ProviderError, classify_by_status, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::{contains_labels, strip_branch_ref};
use crate::pull_request::pagination::{Page, collect_pages, next_link};
use crate::pull_request::transport::{
    TlsConfig, base_url, endpoint, get_json, require_identifier,
};

const DEFAULT_BASE_URL: &str = "https://gitea.com";
const PAGE_LIMIT: &str = "50";

/// Connection settings for [`GiteaService`].
#[derive(Debug, Clone, Default)]
pub struct GiteaOptions {
    /// Instance URL; `https://gitea.com` when blank.
    pub base_url: Option<String>,
    /// Access token, sent as `Authorization: token <value>`.
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Labels every returned pull request must carry.
    pub labels: Vec<String>,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists open pull requests from one Gitea repository.
pub struct GiteaService {
    factory: Arc<dyn ClientFactory>,
    owner: String,
    repository: String,
    labels: Vec<String>,
}

enum Cursor {
    First,
    Next(Url),
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: Option<i64>,
    title: Option<String>,
    head: Option<ApiBranch>,
    base: Option<ApiBranch>,
    labels: Option<Vec<ApiLabel>>,
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiBranch {
    #[serde(rename = "ref")]
    name: Option<String>,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: Option<String>,
}

impl ApiPullRequest {
    fn label_names(&self) -> Vec<String> {
        self.labels
            .iter()
            .flatten()
            .map(|label| label.name.clone())
            .collect()
    }

    fn into_pull_request(self) -> Option<PullRequest> {
        let labels = self.label_names();
        let number = pull_request_number(self.number?)?;
        let head = self.head?;
        let branch = required(head.name)?;
        let head_sha = required(head.sha)?;
        let target = self.base.and_then(|base| base.name).unwrap_or_default();
        Some(PullRequest {
            number,
            title: self.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&target).to_owned(),
            head_sha,
            labels,
            author: self.user.and_then(|user| user.login).unwrap_or_default(),
            changed_files: Vec::new(),
        })
    }
}

impl GiteaService {
    /// Builds the service with a token, or anonymously when it is blank.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when an identifier is blank, the base URL
    /// is invalid, or the HTTP client cannot be built.
    pub fn new(options: GiteaOptions) -> Result<Self, ProviderError> {
        let owner = require_identifier(&options.owner, "Gitea owner")?;
        let repository = require_identifier(&options.repository, "Gitea repository")?;
        let base = base_url(options.base_url.as_deref(), DEFAULT_BASE_URL)?;
        let factory = AuthProvider::from_token(&options.token).create_client_factory(
            base,
            &options.tls,
            TokenScheme::Token,
        )?;
        Ok(Self {
            factory,
            owner,
            repository,
            labels: options.labels,
        })
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        cursor: Cursor,
    ) -> Result<Page<PullRequest, Cursor>, ProviderError> {
        let request = match cursor {
            Cursor::First => {
                let url = endpoint(
                    client.base_url(),
                    &["api", "v1", "repos", &self.owner, &self.repository, "pulls"],
                )?;
                client
                    .get(url)
                    .query(&[("state", "open"), ("limit", PAGE_LIMIT), ("page", "1")])
            }
            Cursor::Next(url) => client.get(url),
        };
        let operation = format!(
            "gitea list pull requests for {}/{}",
            self.owner, self.repository
        );
        let response = get_json::<Vec<ApiPullRequest>>(request, &operation).await?;
        let next = next_link(&response.headers).map(Cursor::Next);

        let mut items = Vec::with_capacity(response.body.len());
        for pull in response.body {
            if !contains_labels(&self.labels, &pull.label_names()) {
                continue;
            }
            match pull.into_pull_request() {
                Some(pull_request) => items.push(pull_request),
                None => tracing::debug!(
                    owner = %self.owner,
                    repository = %self.repository,
                    "skipping Gitea pull request with missing fields"
                ),
            }
        }
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PullRequestService for GiteaService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(Cursor::First, move |cursor| self.fetch_page(client, cursor))
            .await
            .map_err(|error| escalate(error, classify_by_status))
    }
}
