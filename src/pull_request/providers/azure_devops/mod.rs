//! Azure DevOps adapter.
//!
//! The Git API lists pull requests for a whole project, so results are
//! narrowed to the configured repository here. Paging uses `$top`/`$skip`
//! and stops at the first short page.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::pull_request::PullRequestService;
use crate::pull_request::auth::{AuthProvider, AuthorizedClient, ClientFactory, TokenScheme};
use crate::pull_request::error::{ErrorClass, ProviderError, escalate};
use crate::pull_request::models::{PullRequest, pull_request_number, required};
use crate::pull_request::normalise::{author_from_unique_name, contains_labels, strip_branch_ref};
use crate::pull_request::pagination::{Page, collect_pages};
use crate::pull_request::transport::{
    TlsConfig, base_url, endpoint, get_json, require_identifier,
};

const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
const API_VERSION: &str = "7.1";
const PAGE_SIZE: usize = 100;
const PROJECT_MISSING_SIGNATURE: &str = "The following project does not exist";

/// Connection settings for [`AzureDevOpsService`].
#[derive(Debug, Clone, Default)]
pub struct AzureDevOpsOptions {
    /// Service URL; `https://dev.azure.com` when blank.
    pub base_url: Option<String>,
    /// Organisation name.
    pub organization: String,
    /// Project name.
    pub project: String,
    /// Repository name within the project.
    pub repository: String,
    /// Labels every returned pull request must carry.
    pub labels: Vec<String>,
    /// TLS trust policy.
    pub tls: TlsConfig,
}

/// Lists active pull requests from one Azure DevOps repository.
pub struct AzureDevOpsService {
    factory: Arc<dyn ClientFactory>,
    project: String,
    repository: String,
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    value: Vec<ApiPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPullRequest {
    pull_request_id: Option<i64>,
    title: Option<String>,
    source_ref_name: Option<String>,
    target_ref_name: Option<String>,
    last_merge_source_commit: Option<ApiCommit>,
    repository: Option<ApiRepository>,
    labels: Option<Vec<ApiLabel>>,
    created_by: Option<ApiIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCommit {
    commit_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIdentity {
    unique_name: Option<String>,
}

/// A pull request that carried every required field, plus the repository
/// it belongs to.
struct Candidate {
    repository: String,
    pull_request: PullRequest,
}

impl ApiPullRequest {
    fn into_candidate(self) -> Option<Candidate> {
        let number = pull_request_number(self.pull_request_id?)?;
        let source = required(self.source_ref_name)?;
        let target = required(self.target_ref_name)?;
        let head_sha = required(self.last_merge_source_commit?.commit_id)?;
        let repository = required(self.repository?.name)?;
        let labels = self
            .labels
            .into_iter()
            .flatten()
            .filter_map(|label| label.name)
            .collect();
        let author = self
            .created_by
            .and_then(|identity| identity.unique_name)
            .map(|unique_name| author_from_unique_name(&unique_name).to_owned())
            .unwrap_or_default();
        Some(Candidate {
            repository,
            pull_request: PullRequest {
                number,
                title: self.title.unwrap_or_default(),
                branch: strip_branch_ref(&source).to_owned(),
                target_branch: strip_branch_ref(&target).to_owned(),
                head_sha,
                labels,
                author,
                changed_files: Vec::new(),
            },
        })
    }
}

/// Recognises a missing project by the message Azure DevOps returns.
pub(crate) fn classify(error: &ProviderError) -> ErrorClass {
    if error.to_string().contains(PROJECT_MISSING_SIGNATURE) {
        ErrorClass::NotFound
    } else {
        ErrorClass::Other
    }
}

impl AzureDevOpsService {
    /// Builds the service with an explicit authentication strategy.
    ///
    /// Personal access tokens are sent as the password of basic auth;
    /// workload identity tokens are sent as bearer tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when an identifier is blank, the base URL
    /// is invalid, or the HTTP client cannot be built.
    pub fn new(options: &AzureDevOpsOptions, auth: &AuthProvider) -> Result<Self, ProviderError> {
        let organization = require_identifier(&options.organization, "Azure DevOps organization")?;
        let project = require_identifier(&options.project, "Azure DevOps project")?;
        let repository = require_identifier(&options.repository, "Azure DevOps repository")?;
        let base = base_url(options.base_url.as_deref(), DEFAULT_BASE_URL)?;
        let organization_url = endpoint(&base, &[organization.as_str()])?;
        let factory =
            auth.create_client_factory(organization_url, &options.tls, TokenScheme::BasicPassword)?;
        Ok(Self {
            factory,
            project,
            repository,
            labels: options.labels.clone(),
        })
    }

    /// Builds the service from a personal access token.
    ///
    /// # Errors
    ///
    /// See [`AzureDevOpsService::new`].
    pub fn with_token(options: &AzureDevOpsOptions, token: &str) -> Result<Self, ProviderError> {
        Self::new(options, &AuthProvider::from_token(token))
    }

    async fn fetch_page(
        &self,
        client: &AuthorizedClient,
        skip: usize,
    ) -> Result<Page<PullRequest, usize>, ProviderError> {
        let url = endpoint(
            client.base_url(),
            &[&self.project, "_apis", "git", "pullrequests"],
        )?;
        let query = [
            ("api-version", API_VERSION.to_owned()),
            ("searchCriteria.status", "active".to_owned()),
            ("$top", PAGE_SIZE.to_string()),
            ("$skip", skip.to_string()),
        ];
        let operation = format!("list pull requests for project {}", self.project);
        let page = get_json::<ApiPage>(client.get(url).query(&query), &operation)
            .await?
            .body;

        let received = page.value.len();
        let next = if received < PAGE_SIZE {
            None
        } else {
            skip.checked_add(PAGE_SIZE)
        };
        let mut items = Vec::with_capacity(received);
        for pull in page.value {
            let Some(candidate) = pull.into_candidate() else {
                tracing::debug!(
                    project = %self.project,
                    "skipping Azure DevOps pull request with missing fields"
                );
                continue;
            };
            if candidate.repository != self.repository
                || !contains_labels(&self.labels, &candidate.pull_request.labels)
            {
                continue;
            }
            items.push(candidate.pull_request);
        }
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PullRequestService for AzureDevOpsService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        let client = &self.factory.client().await?;
        collect_pages(0_usize, move |skip| self.fetch_page(client, skip))
            .await
            .map_err(|error| escalate(error, classify))
    }
}
