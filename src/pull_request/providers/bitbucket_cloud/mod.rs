//! Bitbucket Cloud adapter.
//!
//! Each page body carries the absolute URL of the next page. Missing
//! repositories are recognised from the error text because the API wraps
//! them in several shapes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ErrorClass, ProviderError, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::strip_branch_ref;
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::{
    TlsConfig, base_url, endpoint, get_json, require_identifier,
};

const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";
const PAGE_LENGTH: &str = "50";
const NOT_FOUND_SIGNATURE: &str = "404 Not Found";

/// Connection settings for [`BitbucketCloudService`].
#[derive(Debug, Clone, Default)]
pub struct BitbucketCloudOptions {
    /// API URL; `https://api.bitbucket.org/2.0` when blank.
    pub base_url: Option<String>,
    /// Workspace or user owning the repository.
    pub owner: String,
    /// Repository slug.
    pub repository_slug: String,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists open pull requests from one Bitbucket Cloud repository.
pub struct BitbucketCloudService {
    factory: Arc<dyn ClientFactory>,
    owner: String,
    repository_slug: String,
}

enum Cursor {
    First,
    Next(Url),
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    values: Vec<ApiPullRequest>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    id: Option<i64>,
    title: Option<String>,
    source: Option<ApiEndpoint>,
    destination: Option<ApiEndpoint>,
    author: Option<ApiAccount>,
}

#[derive(Debug, Deserialize)]
struct ApiEndpoint {
    branch: Option<ApiBranch>,
    commit: Option<ApiCommit>,
}

#[derive(Debug, Deserialize)]
struct ApiBranch {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    nickname: Option<String>,
}

impl ApiPullRequest {
    fn into_pull_request(self) -> Option<PullRequest> {
        let number = pull_request_number(self.id?)?;
        let source = self.source?;
        let branch = required(source.branch.and_then(|branch| branch.name))?;
        let head_sha = required(source.commit.and_then(|commit| commit.hash))?;
        let target = self
            .destination
            .and_then(|destination| destination.branch)
            .and_then(|branch| branch.name)
            .unwrap_or_default();
        Some(PullRequest {
            number,
            title: self.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&target).to_owned(),
            head_sha,
            labels: Vec::new(),
            author: self
                .author
                .and_then(|author| author.nickname)
                .unwrap_or_default(),
            changed_files: Vec::new(),
        })
    }
}

/// Recognises a missing repository by the status text in the message.
pub(crate) fn classify(error: &ProviderError) -> ErrorClass {
    if error.to_string().contains(NOT_FOUND_SIGNATURE) {
        ErrorClass::NotFound
    } else {
        ErrorClass::Other
    }
}

impl BitbucketCloudService {
    /// Builds the service with an explicit authentication strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when an identifier is blank, the base URL
    /// is invalid, or the HTTP client cannot be built.
    pub fn new(
        options: &BitbucketCloudOptions,
        auth: &AuthProvider,
    ) -> Result<Self, ProviderError> {
        let owner = require_identifier(&options.owner, "Bitbucket owner")?;
        let repository_slug =
            require_identifier(&options.repository_slug, "Bitbucket repository slug")?;
        let base = base_url(options.base_url.as_deref(), DEFAULT_BASE_URL)?;
        let factory = auth.create_client_factory(base, &options.tls, TokenScheme::Bearer)?;
        Ok(Self {
            factory,
            owner,
            repository_slug,
        })
    }

    /// Builds an unauthenticated service for public repositories.
    ///
    /// # Errors
    ///
    /// See [`BitbucketCloudService::new`].
    pub fn no_auth(options: &BitbucketCloudOptions) -> Result<Self, ProviderError> {
        Self::new(options, &AuthProvider::Anonymous)
    }

    /// Builds a service using a user name and app password.
    ///
    /// # Errors
    ///
    /// See [`BitbucketCloudService::new`].
    pub fn basic_auth(
        options: &BitbucketCloudOptions,
        username: &str,
        app_password: &str,
    ) -> Result<Self, ProviderError> {
        let auth = AuthProvider::Basic {
            username: username.to_owned(),
            password: app_password.to_owned(),
        };
        Self::new(options, &auth)
    }

    /// Builds a service presenting a repository, project, or workspace
    /// access token as a bearer token.
    ///
    /// # Errors
    ///
    /// See [`BitbucketCloudService::new`].
    pub fn bearer_token(options: &BitbucketCloudOptions, token: &str) -> Result<Self, ProviderError> {
        Self::new(options, &AuthProvider::from_token(token))
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
                    &[
                        "repositories",
                        &self.owner,
                        &self.repository_slug,
                        "pullrequests",
                    ],
                )?;
                client
                    .get(url)
                    .query(&[("state", "OPEN"), ("pagelen", PAGE_LENGTH)])
            }
            Cursor::Next(url) => client.get(url),
        };
        let operation = format!(
            "list pull requests for {}/{}",
            self.owner, self.repository_slug
        );
        let page = get_json::<ApiPage>(request, &operation).await?.body;

        let next = match page.next.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(Cursor::Next(
                Url::parse(raw)
                    .map_err(|error| ProviderError::InvalidUrl(format!("{raw}: {error}")))?,
            )),
            _ => None,
        };
        let items = page
            .values
            .into_iter()
            .filter_map(|pull| {
                let converted = pull.into_pull_request();
                if converted.is_none() {
                    tracing::debug!(
                        owner = %self.owner,
                        repository = %self.repository_slug,
                        "skipping Bitbucket Cloud pull request with missing fields"
                    );
                }
                converted
            })
            .collect();
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PullRequestService for BitbucketCloudService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(Cursor::First, move |cursor| self.fetch_page(client, cursor))
            .await
            .map_err(|error| escalate(error, classify))
    }
}

#[cfg(test)]
mod tests;
