//! Prospector library crate for discovering open pull requests.
//!
//! Adapters for GitHub, GitLab, Gitea, Bitbucket Server, Bitbucket Cloud,
//! Azure DevOps, SCM-Manager, and SourceCraft reduce each provider's pull
//! requests to one canonical model. [`list_pull_requests`] applies a
//! declarative filter set to an adapter's results, keeping a pull request
//! when every pattern of at least one filter matches.
//!
//! ```no_run
//! use prospector::pull_request::providers::{GitlabOptions, GitlabService};
//! use prospector::{FilterSpec, RecoverNotFound, list_pull_requests};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let service = GitlabService::new(GitlabOptions {
//!     project: "platform/api".to_owned(),
//!     ..GitlabOptions::default()
//! })?;
//! let filters = [FilterSpec {
//!     branch_match: Some("^feature/".to_owned()),
//!     ..FilterSpec::default()
//! }];
//! let pulls = list_pull_requests(&service, &filters)
//!     .await
//!     .or_empty_when_not_found()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pull_request;

pub use config::{ProspectorConfig, ProviderKind};
pub use pull_request::{
    AuthProvider, DiscoveryError, Filter, FilterError, FilterSpec, ProviderError, PullRequest,
    PullRequestService, RecoverNotFound, RepositoryNotFoundError, TlsConfig, compile_filters,
    is_repository_not_found_error, list_pull_requests,
};
