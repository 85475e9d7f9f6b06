//! SCM-Manager adapter.
//!
//! The pull request listing does not include commit hashes, so each pull
//! request costs one extra request for its source branch. A branch that has
//! disappeared since the listing skips that pull request.

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
    TlsConfig, endpoint, get_json, get_optional_json, require_identifier, required_base_url,
};

const PAGE_SIZE: &str = "100";

/// Connection settings for [`ScmManagerService`].
#[derive(Debug, Clone, Default)]
pub struct ScmManagerOptions {
    /// Server URL including the context path, e.g.
    /// `https://scm.example.com/scm`. Required.
    pub base_url: Option<String>,
    /// API key, sent as a bearer token; anonymous access when blank.
    pub token: String,
    /// Repository namespace.
    pub namespace: String,
    /// Repository name.
    pub name: String,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists open pull requests from one SCM-Manager repository.
pub struct ScmManagerService {
    factory: Arc<dyn ClientFactory>,
    namespace: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPage {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    page_total: u32,
    #[serde(rename = "_embedded")]
    embedded: Option<ApiEmbedded>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEmbedded {
    #[serde(default)]
    pull_requests: Vec<ApiPullRequest>,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    id: Option<String>,
    title: Option<String>,
    source: Option<String>,
    target: Option<String>,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBranch {
    revision: Option<String>,
}

impl ApiPage {
    const fn next_page(&self) -> Option<u32> {
        match self.page.checked_add(1) {
            Some(next) if next < self.page_total => Some(next),
            _ => None,
        }
    }
}

impl ScmManagerService {
    /// Builds the service, presenting a non-blank API key as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when the base URL, namespace,
    /// or name is missing, and client construction errors otherwise.
    pub fn new(options: &ScmManagerOptions) -> Result<Self, ProviderError> {
        let base = required_base_url(options.base_url.as_deref(), "SCM-Manager")?;
        let namespace = require_identifier(&options.namespace, "SCM-Manager namespace")?;
        let name = require_identifier(&options.name, "SCM-Manager repository name")?;
        let factory = AuthProvider::from_token(&options.token).create_client_factory(
            base,
            &options.tls,
            TokenScheme::Bearer,
        )?;
        Ok(Self {
            factory,
            namespace,
            name,
        })
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        page: u32,
    ) -> Result<Page<PullRequest, u32>, ProviderError> {
        let url = endpoint(
            client.base_url(),
            &["api", "v2", "pull-requests", &self.namespace, &self.name],
        )?;
        let query = [
            ("status", "OPEN".to_owned()),
            ("pageSize", PAGE_SIZE.to_owned()),
            ("page", page.to_string()),
        ];
        let operation = format!("list pull requests for {}/{}", self.namespace, self.name);
        let body = get_json::<ApiPage>(client.get(url).query(&query), &operation)
            .await?
            .body;

        let next = body.next_page();
        let pulls = body
            .embedded
            .map(|embedded| embedded.pull_requests)
            .unwrap_or_default();
        let mut items = Vec::with_capacity(pulls.len());
        for pull in pulls {
            if let Some(pull_request) = self.resolve(client, pull).await? {
                items.push(pull_request);
            }
        }
        Ok(Page::new(items, next))
    }

    /// Completes a listed pull request with its head revision, or returns
    /// `None` when a required field or the source branch is missing.
    async fn resolve(
        &self,
        client: &AuthorizedClient,
        pull: ApiPullRequest,
    ) -> Result<Option<PullRequest>, ProviderError> {
        let number = pull
            .id
            .as_deref()
            .and_then(|id| id.trim().parse::<u64>().ok())
            .and_then(pull_request_number);
        let (Some(number), Some(branch)) = (number, required(pull.source)) else {
            tracing::debug!(
                namespace = %self.namespace,
                name = %self.name,
                "skipping SCM-Manager pull request with missing fields"
            );
            return Ok(None);
        };

        let url = endpoint(
            client.base_url(),
            &[
                "api",
                "v2",
                "repositories",
                &self.namespace,
                &self.name,
                "branches",
                &branch,
            ],
        )?;
        let operation = format!("get branch {branch} of {}/{}", self.namespace, self.name);
        let revision = get_optional_json::<ApiBranch>(client.get(url), &operation)
            .await?
            .and_then(|found| required(found.revision));
        let Some(head_sha) = revision else {
            tracing::debug!(
                namespace = %self.namespace,
                name = %self.name,
                branch = %branch,
                "skipping SCM-Manager pull request whose source branch is gone"
            );
            return Ok(None);
        };

        Ok(Some(PullRequest {
            number,
            title: pull.title.unwrap_or_default(),
            branch: strip_branch_ref(&branch).to_owned(),
            target_branch: strip_branch_ref(&pull.target.unwrap_or_default()).to_owned(),
            head_sha,
            labels: Vec::new(),
            author: pull.author.and_then(|author| author.id).unwrap_or_default(),
            changed_files: Vec::new(),
        }))
    }
}

#[async_trait]
impl PullRequestService for ScmManagerService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(0_u32, move |page| self.fetch_page(client, page))
            .await
            .map_err(|error| escalate(error, classify_by_status))
    }
}
