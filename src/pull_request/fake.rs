//! In-memory [`PullRequestService`] for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::PullRequestService;
use super::error::{ProviderError, RepositoryNotFoundError};
use super::models::PullRequest;

/// Returns a fixed list of pull requests, or a fixed error.
#[derive(Debug, Default)]
pub struct FakeService {
    pull_requests: Vec<PullRequest>,
    error: Option<ProviderError>,
    calls: AtomicUsize,
}

impl FakeService {
    /// A service that always lists `pull_requests`.
    #[must_use]
    pub fn new(pull_requests: Vec<PullRequest>) -> Self {
        Self {
            pull_requests,
            ..Self::default()
        }
    }

    /// A service whose listing always fails with `error`.
    #[must_use]
    pub fn failing(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// A service that reports its repository as missing.
    #[must_use]
    pub fn repository_not_found() -> Self {
        Self::failing(
            RepositoryNotFoundError::new(ProviderError::Api {
                status: Some(http::StatusCode::NOT_FOUND),
                message: "list pull requests failed with status 404 Not Found: Not Found"
                    .to_owned(),
            })
            .into(),
        )
    }

    /// Number of times [`PullRequestService::list`] has been called.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestService for FakeService {
    async fn list(&self) -> Result<Vec<PullRequest>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(self.pull_requests.clone()),
        }
    }
}
