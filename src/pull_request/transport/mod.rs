//! Shared HTTP plumbing for the `reqwest`-backed adapters.
//!
//! This module builds TLS-aware clients, derives endpoint URLs from a base
//! URL, and issues JSON `GET` requests whose failures are mapped into
//! [`ProviderError`] variants with the calling operation attached.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::ProviderError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// TLS trust policy for self-hosted providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Accept any server certificate.
    pub insecure: bool,
    /// Additional PEM-encoded CA certificates.
    pub ca_certs: Vec<u8>,
    /// Path to a PEM bundle of additional CA certificates.
    pub root_ca_path: Option<Utf8PathBuf>,
}

impl TlsConfig {
    /// Trust policy that skips certificate verification.
    #[must_use]
    pub fn insecure() -> Self {
        Self {
            insecure: true,
            ..Self::default()
        }
    }
}

/// Builds an HTTP client honouring the TLS policy.
///
/// # Errors
///
/// Returns [`ProviderError::Io`] when the CA bundle cannot be read and
/// [`ProviderError::Configuration`] when it cannot be parsed or the client
/// cannot be constructed.
pub(crate) fn build_http_client(tls: &TlsConfig) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(tls.insecure);

    let mut pem = tls.ca_certs.clone();
    if let Some(path) = &tls.root_ca_path {
        pem.extend(read_ca_bundle(path)?);
    }
    if !pem.is_empty() {
        let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|error| {
            ProviderError::Configuration {
                message: format!("invalid CA certificates: {error}"),
            }
        })?;
        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }
    }

    builder.build().map_err(|error| ProviderError::Configuration {
        message: format!("build HTTP client failed: {error}"),
    })
}

fn read_ca_bundle(path: &Utf8Path) -> Result<Vec<u8>, ProviderError> {
    let io_error = |error: std::io::Error| ProviderError::Io {
        message: format!("read CA bundle '{path}': {error}"),
    };
    let file_name = path.file_name().ok_or_else(|| ProviderError::Io {
        message: format!("CA bundle path '{path}' has no file name"),
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.as_str(),
        _ => ".",
    };
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
    dir.read(file_name).map_err(io_error)
}

/// Parses a configured base URL, falling back to `default` when blank, and
/// makes sure it ends with `/` so relative joins keep its path.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidUrl`] when the URL cannot be parsed or
/// cannot carry a path.
pub(crate) fn base_url(configured: Option<&str>, default: &str) -> Result<Url, ProviderError> {
    let raw = configured
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default);
    let mut url =
        Url::parse(raw).map_err(|error| ProviderError::InvalidUrl(format!("{raw}: {error}")))?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::InvalidUrl(format!(
            "{raw}: URL cannot be used as a base"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Like [`base_url`] but for providers without a public default.
///
/// # Errors
///
/// Returns [`ProviderError::Configuration`] when no URL is configured and
/// [`ProviderError::InvalidUrl`] when it cannot be parsed.
pub(crate) fn required_base_url(
    configured: Option<&str>,
    provider: &str,
) -> Result<Url, ProviderError> {
    match configured.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => base_url(Some(raw), raw),
        None => Err(ProviderError::Configuration {
            message: format!("{provider} requires a base URL"),
        }),
    }
}

/// Appends percent-encoded path segments to `base`.
///
/// Each segment is encoded on its own, so a GitLab project path such as
/// `group/project` becomes a single `group%2Fproject` segment.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidUrl`] when `base` cannot carry a path.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidUrl(format!("{base}: URL cannot be used as a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Requires a non-empty identifier supplied at construction time.
///
/// # Errors
///
/// Returns [`ProviderError::Configuration`] naming the missing field.
pub(crate) fn require_identifier(value: &str, name: &str) -> Result<String, ProviderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Configuration {
            message: format!("{name} is required"),
        });
    }
    Ok(trimmed.to_owned())
}

/// Decoded JSON body together with the response headers.
#[derive(Debug)]
pub(crate) struct JsonResponse<T> {
    pub(crate) body: T,
    pub(crate) headers: HeaderMap,
}

/// Sends `request` and decodes a JSON body.
///
/// # Errors
///
/// Maps transport failures to [`ProviderError::Network`], 401/403 to
/// [`ProviderError::Authentication`], other non-success statuses to
/// [`ProviderError::Api`], and undecodable bodies to
/// [`ProviderError::Decode`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    operation: &str,
) -> Result<JsonResponse<T>, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|error| map_reqwest_error(operation, &error))?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|error| map_reqwest_error(operation, &error))?;

    if !status.is_success() {
        return Err(map_http_error(operation, status, extract_message(&body)));
    }

    serde_json::from_str(&body)
        .map(|decoded| JsonResponse {
            body: decoded,
            headers,
        })
        .map_err(|error| ProviderError::Decode {
            message: format!("{operation}: {error}"),
        })
}

/// Like [`get_json`] but treats a 404 as an absent resource.
///
/// # Errors
///
/// Every failure other than a 404 is returned as [`get_json`] reports it.
pub(crate) async fn get_optional_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    operation: &str,
) -> Result<Option<T>, ProviderError> {
    match get_json(request, operation).await {
        Ok(response) => Ok(Some(response.body)),
        Err(error) if error.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Checks if a status indicates an authentication failure.
pub(crate) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

pub(crate) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> ProviderError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_failure(status) {
        ProviderError::Authentication {
            message: format!("{operation} failed: provider returned {status} {message}"),
        }
    } else {
        ProviderError::Api {
            status: Some(status),
            message: format!("{operation} failed with status {status}: {message}"),
        }
    }
}

fn map_reqwest_error(operation: &str, error: &reqwest::Error) -> ProviderError {
    if error.is_decode() {
        return ProviderError::Decode {
            message: format!("{operation}: {error}"),
        };
    }
    ProviderError::Network {
        message: format!("{operation} failed: {error}"),
    }
}

/// Pulls a human-readable message out of a provider error body.
///
/// Providers disagree on the field name, so the common ones are tried in
/// turn; a short non-JSON body is returned verbatim.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return (!trimmed.is_empty() && trimmed.len() <= 512).then(|| trimmed.to_owned());
    };
    ["message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .or_else(|| {
            ["/error/message", "/errors/0/message"]
                .iter()
                .find_map(|pointer| value.pointer(pointer).and_then(serde_json::Value::as_str))
        })
        .map(ToOwned::to_owned)
}
