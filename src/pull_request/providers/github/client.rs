//! Octocrab client construction and error mapping for the GitHub adapter.

use http::{StatusCode, Uri};
use octocrab::Octocrab;

use crate::pull_request::auth::AuthProvider;
use crate::pull_request::error::ProviderError;
use crate::pull_request::transport::is_auth_failure;

pub(super) const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Builds an Octocrab client for the given credentials and API base URL.
///
/// A blank base URL selects the public GitHub API.
///
/// # Errors
///
/// Returns `ProviderError::InvalidUrl` when the base URI cannot be parsed,
/// `ProviderError::Configuration` for credentials GitHub cannot use, and
/// `ProviderError::Api` when Octocrab fails to construct a client.
pub(super) fn build_octocrab_client(
    auth: &AuthProvider,
    configured_base: Option<&str>,
) -> Result<Octocrab, ProviderError> {
    let api_base = configured_base
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| ProviderError::InvalidUrl(format!("{api_base}: {error}")))?;

    let mut builder = Octocrab::builder();
    match auth {
        AuthProvider::PersonalAccessToken(token) => {
            builder = builder.personal_token(token.value());
        }
        AuthProvider::Anonymous => {}
        other => {
            return Err(ProviderError::Configuration {
                message: format!("GitHub does not support {other:?} authentication"),
            });
        }
    }

    builder
        .base_uri(base_uri)
        .map_err(|error| ProviderError::Api {
            status: None,
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}

/// Checks if an octocrab error represents a network/transport issue.
const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks if an octocrab error means the response body had the wrong shape.
const fn is_decode_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }
    )
}

/// Checks whether the GitHub error represents a rate limit error based on the
/// HTTP status and message / documentation URL content.
fn is_rate_limit_error(source: &octocrab::GitHubError) -> bool {
    let is_rate_limit_status = matches!(
        source.status_code,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    let message_indicates_rate_limit = source.message.to_lowercase().contains("rate limit")
        || source
            .documentation_url
            .as_deref()
            .is_some_and(|url| url.contains("rate-limit"));

    is_rate_limit_status && message_indicates_rate_limit
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> ProviderError {
    if let octocrab::Error::GitHub { source, .. } = error {
        let status = source.status_code;
        return if is_auth_failure(status) && !is_rate_limit_error(source) {
            ProviderError::Authentication {
                message: format!(
                    "{operation} failed: GitHub returned {status} {message}",
                    message = source.message
                ),
            }
        } else {
            ProviderError::Api {
                status: Some(status),
                message: format!(
                    "{operation} failed with status {status}: {message}",
                    message = source.message
                ),
            }
        };
    }

    if is_network_error(error) {
        return ProviderError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    if is_decode_error(error) {
        return ProviderError::Decode {
            message: format!("{operation}: {error}"),
        };
    }

    ProviderError::Api {
        status: None,
        message: format!("{operation} failed: {error}"),
    }
}
