//! Canonical pull request model shared by every provider adapter.
//!
//! Adapters deserialise provider-specific payloads into private `Api*` types
//! and convert them into [`PullRequest`] values. Conversions that lack a
//! required upstream field return `None` so the adapter can skip the item.

use serde::{Deserialize, Serialize};

/// Provider-agnostic view of an open pull or merge request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Provider-assigned identifier (IID, index, or pull request id).
    pub number: u64,
    /// Title; empty when the provider does not return one from its list
    /// endpoint.
    pub title: String,
    /// Source branch with any `refs/heads/` prefix removed.
    pub branch: String,
    /// Destination branch with any `refs/heads/` prefix removed.
    pub target_branch: String,
    /// Head commit of the source branch at discovery time.
    pub head_sha: String,
    /// Label names in provider order. Empty when unsupported.
    pub labels: Vec<String>,
    /// Normalised author identifier.
    pub author: String,
    /// Paths touched by the pull request, for providers that list them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_files: Vec<String>,
}

/// Converts an upstream identifier into a pull request number.
///
/// Returns `None` for zero, negative, or otherwise unrepresentable values so
/// the caller can skip the item instead of truncating it.
pub(crate) fn pull_request_number<N>(raw: N) -> Option<u64>
where
    u64: TryFrom<N>,
{
    u64::try_from(raw).ok().filter(|number| *number > 0)
}

/// Returns the value when present and non-empty.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|inner| !inner.is_empty())
}
