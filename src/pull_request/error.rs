//! Error types exposed by the pull request discovery layer.

use std::error::Error as StdError;

use http::StatusCode;
use thiserror::Error;

use super::filter::FilterError;
use super::models::PullRequest;

/// Errors surfaced while talking to a hosting provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// A configured base URL or derived endpoint could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The adapter was constructed with incomplete or inconsistent settings.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The provider rejected the supplied credentials.
    #[error("provider rejected the credentials: {message}")]
    Authentication {
        /// Message returned with the 401/403 response.
        message: String,
    },

    /// The provider returned a non-success status that is not an
    /// authentication failure.
    #[error("provider API error: {message}")]
    Api {
        /// HTTP status when one was received.
        status: Option<StatusCode>,
        /// Response detail describing the failure.
        message: String,
    },

    /// Networking failed while calling the provider.
    #[error("network error talking to provider: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {message}")]
    Decode {
        /// Provider operation and decoder detail.
        message: String,
    },

    /// Local I/O failed, for example while reading a CA bundle.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// The repository or project does not exist (yet).
    #[error(transparent)]
    RepositoryNotFound(#[from] RepositoryNotFoundError),
}

impl ProviderError {
    /// Returns true when this error is the repository-not-found sentinel.
    #[must_use]
    pub const fn is_repository_not_found(&self) -> bool {
        matches!(self, Self::RepositoryNotFound(_))
    }

    /// HTTP status attached to an API error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

/// Sentinel wrapping the error that told an adapter the repository is
/// missing.
///
/// Its message is exactly the message of the wrapped cause.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{cause}")]
pub struct RepositoryNotFoundError {
    #[source]
    cause: Box<ProviderError>,
}

impl RepositoryNotFoundError {
    /// Wraps the error that identified the repository as missing.
    #[must_use]
    pub fn new(cause: ProviderError) -> Self {
        Self {
            cause: Box::new(cause),
        }
    }

    /// The underlying provider error.
    #[must_use]
    pub fn cause(&self) -> &ProviderError {
        &self.cause
    }
}

/// Errors returned by [`list_pull_requests`](super::list_pull_requests) and
/// the command-line front end.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// A filter pattern failed to compile; no provider call was made.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The provider adapter failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Runtime configuration could not be turned into an adapter.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Writing results failed.
    #[error("I/O error: {message}")]
    Io {
        /// Details about the I/O failure.
        message: String,
    },
}

impl DiscoveryError {
    /// Returns true when the provider reported a missing repository.
    #[must_use]
    pub const fn is_repository_not_found(&self) -> bool {
        matches!(self, Self::Provider(error) if error.is_repository_not_found())
    }
}

/// Reports whether `error`, or any error in its source chain, is the
/// repository-not-found sentinel.
#[must_use]
pub fn is_repository_not_found_error(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(candidate) = current {
        if candidate.is::<RepositoryNotFoundError>() {
            return true;
        }
        if let Some(provider) = candidate.downcast_ref::<ProviderError>()
            && provider.is_repository_not_found()
        {
            return true;
        }
        if let Some(discovery) = candidate.downcast_ref::<DiscoveryError>()
            && discovery.is_repository_not_found()
        {
            return true;
        }
        current = candidate.source();
    }
    false
}

/// Lets callers decide that a missing repository means "no pull requests".
///
/// Adapters never make that decision themselves; they return the sentinel
/// and leave the policy to whoever holds the result.
pub trait RecoverNotFound: Sized {
    /// Converts a repository-not-found error into an empty list and passes
    /// every other outcome through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the original error when it is not the not-found sentinel.
    fn or_empty_when_not_found(self) -> Self;
}

impl RecoverNotFound for Result<Vec<PullRequest>, ProviderError> {
    fn or_empty_when_not_found(self) -> Self {
        match self {
            Err(error) if error.is_repository_not_found() => Ok(Vec::new()),
            other => other,
        }
    }
}

impl RecoverNotFound for Result<Vec<PullRequest>, DiscoveryError> {
    fn or_empty_when_not_found(self) -> Self {
        match self {
            Err(error) if error.is_repository_not_found() => Ok(Vec::new()),
            other => other,
        }
    }
}

/// Outcome of inspecting a listing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorClass {
    /// The repository, project, or organisation does not exist.
    NotFound,
    /// Any other failure.
    Other,
}

/// Classifies `error` with the adapter-specific `classify` function and
/// wraps not-found failures in the sentinel.
pub(crate) fn escalate(
    error: ProviderError,
    classify: fn(&ProviderError) -> ErrorClass,
) -> ProviderError {
    match classify(&error) {
        ErrorClass::NotFound => {
            tracing::warn!("repository not found: {error}");
            RepositoryNotFoundError::new(error).into()
        }
        ErrorClass::Other => error,
    }
}

/// Classifier shared by adapters whose APIs answer with a plain HTTP 404.
pub(crate) fn classify_by_status(error: &ProviderError) -> ErrorClass {
    if error.status() == Some(StatusCode::NOT_FOUND) {
        ErrorClass::NotFound
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::{
        DiscoveryError, ErrorClass, ProviderError, RecoverNotFound, RepositoryNotFoundError,
        classify_by_status, escalate, is_repository_not_found_error,
    };
    use crate::pull_request::models::PullRequest;

    fn api_error(status: StatusCode) -> ProviderError {
        ProviderError::Api {
            status: Some(status),
            message: format!("list pull requests failed with status {status}: boom"),
        }
    }

    #[test]
    fn plain_errors_are_not_the_sentinel() {
        let error = std::io::Error::other("x");
        assert!(!is_repository_not_found_error(&error));

        let provider = ProviderError::Network {
            message: "connection reset".to_owned(),
        };
        assert!(!is_repository_not_found_error(&provider));
    }

    #[test]
    fn sentinel_is_recognised_directly_and_when_nested() {
        let sentinel = RepositoryNotFoundError::new(api_error(StatusCode::NOT_FOUND));
        assert!(is_repository_not_found_error(&sentinel));

        let provider = ProviderError::from(sentinel.clone());
        assert!(is_repository_not_found_error(&provider));

        let discovery = DiscoveryError::from(provider);
        assert!(is_repository_not_found_error(&discovery));
        assert!(discovery.is_repository_not_found());
    }

    #[test]
    fn sentinel_message_is_the_cause_message() {
        let cause = ProviderError::Api {
            status: None,
            message: "x".to_owned(),
        };
        let sentinel = RepositoryNotFoundError::new(cause.clone());

        assert_eq!(sentinel.to_string(), cause.to_string());
        assert_eq!(ProviderError::from(sentinel.clone()).to_string(), cause.to_string());
        assert_eq!(sentinel.cause(), &cause);
    }

    #[test]
    fn sentinel_exposes_its_cause_as_source() {
        let sentinel = RepositoryNotFoundError::new(api_error(StatusCode::NOT_FOUND));
        let source = std::error::Error::source(&sentinel).map(ToString::to_string);
        assert_eq!(source, Some(api_error(StatusCode::NOT_FOUND).to_string()));
    }

    #[rstest]
    #[case::not_found(StatusCode::NOT_FOUND, ErrorClass::NotFound)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, ErrorClass::Other)]
    #[case::gone(StatusCode::GONE, ErrorClass::Other)]
    fn classifies_by_status(#[case] status: StatusCode, #[case] expected: ErrorClass) {
        assert_eq!(classify_by_status(&api_error(status)), expected);
    }

    #[test]
    fn escalate_only_wraps_not_found_errors() {
        let escalated = escalate(api_error(StatusCode::NOT_FOUND), classify_by_status);
        assert!(escalated.is_repository_not_found());

        let untouched = escalate(api_error(StatusCode::BAD_GATEWAY), classify_by_status);
        assert_eq!(untouched, api_error(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn recovery_turns_not_found_into_an_empty_list() {
        let sentinel = ProviderError::from(RepositoryNotFoundError::new(api_error(
            StatusCode::NOT_FOUND,
        )));
        let result: Result<Vec<PullRequest>, ProviderError> = Err(sentinel);

        let recovered = result.or_empty_when_not_found();
        assert_eq!(recovered, Ok(Vec::new()));
    }

    #[test]
    fn recovery_keeps_other_failures() {
        let result: Result<Vec<PullRequest>, DiscoveryError> =
            Err(DiscoveryError::Provider(api_error(StatusCode::UNPROCESSABLE_ENTITY)));

        let recovered = result.or_empty_when_not_found();
        assert!(recovered.is_err(), "expected failure to pass through");
    }
}
