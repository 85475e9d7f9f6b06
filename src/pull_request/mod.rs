//! Pull request discovery across source-code hosting providers.
//!
//! Each provider adapter implements [`PullRequestService`], paging through its
//! provider's API and reducing the results to canonical [`PullRequest`]
//! values. [`list_pull_requests`] compiles caller-supplied filters, calls an
//! adapter once, and keeps the pull requests that match.

pub mod auth;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod filter;
pub mod listing;
pub mod models;
pub mod normalise;
pub(crate) mod pagination;
pub mod providers;
pub mod transport;

pub use auth::{AuthProvider, ClientFactory, PersonalAccessToken, TokenScheme};
pub use error::{
    DiscoveryError, ProviderError, RecoverNotFound, RepositoryNotFoundError,
    is_repository_not_found_error,
};
pub use filter::{Filter, FilterError, FilterField, FilterSpec, compile_filters};
pub use listing::list_pull_requests;
pub use models::PullRequest;
pub use transport::TlsConfig;

use async_trait::async_trait;

/// A provider adapter that lists the open pull requests of one repository.
///
/// Implementations page through the provider until it is exhausted and
/// return the whole list, or an error and nothing else. They hold only
/// immutable configuration, so one instance may serve concurrent calls.
/// Dropping the returned future aborts any request in flight.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Lists the open pull requests.
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError>;
}
