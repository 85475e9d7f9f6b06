//! Command-line front end.
//!
//! - [`service`]: selects and builds the provider adapter from configuration
//! - [`output`]: writes the discovered pull requests as JSON

pub mod output;
pub mod service;

use prospector::ProspectorConfig;
use prospector::pull_request::{
    DiscoveryError, PullRequest, RecoverNotFound, list_pull_requests,
};

/// Builds the configured adapter, lists its pull requests, and applies the
/// configured filter.
///
/// With `ignore_missing_repository` set, a missing repository yields an
/// empty list instead of an error.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when the configuration is incomplete, a
/// filter pattern is invalid, or the provider call fails.
pub async fn discover(config: &ProspectorConfig) -> Result<Vec<PullRequest>, DiscoveryError> {
    let service = service::build_service(config)?;
    let result = list_pull_requests(service.as_ref(), &config.filter_specs()).await;
    if config.ignore_missing_repository {
        result.or_empty_when_not_found()
    } else {
        result
    }
}

#[cfg(test)]
mod tests;
