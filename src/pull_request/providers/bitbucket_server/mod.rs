//! Bitbucket Server (Data Center) adapter.
//!
//! Pages are requested with `start` offsets taken from the previous body's
//! `nextPageStart` until the server reports `isLastPage`. The REST API has
//! no pull request labels, so every result carries an empty label list.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ProviderError, classify_by_status, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::strip_branch_ref;
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::{
    TlsConfig, endpoint, get_json, require_identifier, required_base_url,
};

const PAGE_LIMIT: &str = "100";

/// Connection settings for [`BitbucketServerService`].
#[derive(Debug, Clone, Default)]
pub struct BitbucketServerOptions {
    /// Server URL, e.g. `https://bitbucket.example.com`. Required.
    pub base_url: Option<String>,
    /// Project key.
    pub project_key: String,
    /// Repository slug.
    pub repository_slug: String,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists open pull requests from one Bitbucket Server repository.
pub struct BitbucketServerService {
    factory: Arc<dyn ClientFactory>,
    project_key: String,
    repository_slug: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPage {
    #[serde(default)]
    values: Vec<ApiPullRequest>,
    #[serde(default)]
    is_last_page: bool,
    next_page_start: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPullRequest {
    id: Option<i64>,
    title: Option<String>,
    from_ref: Option<ApiRef>,
    to_ref: Option<ApiRef>,
    author: Option<ApiParticipant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRef {
    display_id: Option<String>,
    latest_commit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiParticipant {
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    name: Option<String>,
}

impl ApiPullRequest {
    fn into_pull_request(self) -> Option<PullRequest> {
        let number = pull_request_number(self.id?)?;
        let from = self.from_ref?;
        let branch = required(from.display_id)?;
        let head_sha = required(from.latest_commit)?;
        let target = self
            .to_ref
            .and_then(|to| to.display_id)
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
                .and_then(|author| author.user)
                .and_then(|user| user.name)
                .unwrap_or_default(),
            changed_files: Vec::new(),
        })
    }
}

impl ApiPage {
    /// Offset of the following page, or `None` on the last page.
    const fn next_start(&self) -> Option<u32> {
        if self.is_last_page {
            None
        } else {
            self.next_page_start
        }
    }
}

impl BitbucketServerService {
    /// Builds the service with an explicit authentication strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when the base URL, project
    /// key, or repository slug is missing, and client construction errors
    /// otherwise.
    pub fn new(
        options: &BitbucketServerOptions,
        auth: &AuthProvider,
    ) -> Result<Self, ProviderError> {
        let base = required_base_url(options.base_url.as_deref(), "Bitbucket Server")?;
        let project_key = require_identifier(&options.project_key, "Bitbucket project key")?;
        let repository_slug =
            require_identifier(&options.repository_slug, "Bitbucket repository slug")?;
        let factory = auth.create_client_factory(base, &options.tls, TokenScheme::Bearer)?;
        Ok(Self {
            factory,
            project_key,
            repository_slug,
        })
    }

    /// Builds an unauthenticated service.
    ///
    /// # Errors
    ///
    /// See [`BitbucketServerService::new`].
    pub fn no_auth(options: &BitbucketServerOptions) -> Result<Self, ProviderError> {
        Self::new(options, &AuthProvider::Anonymous)
    }

    /// Builds a service using HTTP basic authentication.
    ///
    /// # Errors
    ///
    /// See [`BitbucketServerService::new`].
    pub fn basic_auth(
        options: &BitbucketServerOptions,
        username: &str,
        password: &str,
    ) -> Result<Self, ProviderError> {
        let auth = AuthProvider::Basic {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        Self::new(options, &auth)
    }

    /// Builds a service presenting `token` as a bearer token.
    ///
    /// # Errors
    ///
    /// See [`BitbucketServerService::new`].
    pub fn bearer_token(
        options: &BitbucketServerOptions,
        token: &str,
    ) -> Result<Self, ProviderError> {
        Self::new(options, &AuthProvider::from_token(token))
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        start: u32,
    ) -> Result<Page<PullRequest, u32>, ProviderError> {
        let url = endpoint(
            client.base_url(),
            &[
                "rest",
                "api",
                "1.0",
                "projects",
                &self.project_key,
                "repos",
                &self.repository_slug,
                "pull-requests",
            ],
        )?;
        let mut query = vec![("state", "OPEN".to_owned()), ("limit", PAGE_LIMIT.to_owned())];
        if start > 0 {
            query.push(("start", start.to_string()));
        }
        let operation = format!(
            "list pull requests for {}/{}",
            self.project_key, self.repository_slug
        );
        let page = get_json::<ApiPage>(client.get(url).query(&query), &operation)
            .await?
            .body;

        let next = page.next_start();
        let items = page
            .values
            .into_iter()
            .filter_map(|pull| {
                let converted = pull.into_pull_request();
                if converted.is_none() {
                    tracing::debug!(
                        project = %self.project_key,
                        repository = %self.repository_slug,
                        "skipping Bitbucket Server pull request with missing fields"
                    );
                }
                converted
            })
            .collect();
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PullRequestService for BitbucketServerService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(0_u32, move |start| self.fetch_page(client, start))
            .await
            .map_err(|error| escalate(error, classify_by_status))
    }
}
