//! Authentication strategies for the `reqwest`-backed adapters.
//!
//! An [`AuthProvider`] is selected once when an adapter is constructed and
//! turned into a [`ClientFactory`]. Adapters ask the factory for an
//! [`AuthorizedClient`] at the start of every listing call. Static strategies
//! hand back the same client each time; workload identity asks its token
//! source on every call so long-running watchers never hold an expired token.

pub mod workload_identity;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use url::Url;

use super::error::ProviderError;
use super::transport::{TlsConfig, build_http_client};

pub use workload_identity::{AccessToken, CachedTokenSource, TokenSource};

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Configuration`] when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, ProviderError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ProviderError::Configuration {
                message: "personal access token is empty".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// How a personal access token is presented to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScheme {
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `Authorization: token <token>`.
    Token,
    /// `PRIVATE-TOKEN: <token>`.
    PrivateToken,
    /// Basic authentication with an empty user name and the token as
    /// password.
    BasicPassword,
}

/// Credential strategy used to build a provider client.
#[derive(Clone)]
pub enum AuthProvider {
    /// No credentials.
    Anonymous,
    /// A personal access token, presented according to a [`TokenScheme`].
    PersonalAccessToken(PersonalAccessToken),
    /// User name and password (or app password).
    Basic {
        /// User name.
        username: String,
        /// Password or app password.
        password: String,
    },
    /// Short-lived bearer tokens obtained from a token source on demand.
    WorkloadIdentity(Arc<dyn TokenSource>),
}

impl AuthProvider {
    /// Selects [`AuthProvider::PersonalAccessToken`] for a non-blank token and
    /// [`AuthProvider::Anonymous`] otherwise.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        PersonalAccessToken::new(token).map_or(Self::Anonymous, Self::PersonalAccessToken)
    }

    /// Returns true for the anonymous strategy.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Builds the client factory for `organization_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the HTTP client cannot be built or the
    /// token cannot be encoded as a header value.
    pub fn create_client_factory(
        &self,
        organization_url: Url,
        tls: &TlsConfig,
        scheme: TokenScheme,
    ) -> Result<Arc<dyn ClientFactory>, ProviderError> {
        let http = build_http_client(tls)?;
        let factory: Arc<dyn ClientFactory> = match self {
            Self::Anonymous => Arc::new(StaticClientFactory::new(
                http,
                organization_url,
                Credential::None,
            )),
            Self::PersonalAccessToken(token) => Arc::new(StaticClientFactory::new(
                http,
                organization_url,
                Credential::from_token(token, scheme)?,
            )),
            Self::Basic { username, password } => Arc::new(StaticClientFactory::new(
                http,
                organization_url,
                Credential::Basic {
                    username: username.clone(),
                    password: Some(password.clone()),
                },
            )),
            Self::WorkloadIdentity(tokens) => Arc::new(WorkloadIdentityClientFactory {
                http,
                base_url: organization_url,
                tokens: Arc::clone(tokens),
            }),
        };
        Ok(factory)
    }
}

impl fmt::Debug for AuthProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => formatter.write_str("Anonymous"),
            Self::PersonalAccessToken(_) => formatter.write_str("PersonalAccessToken(***)"),
            Self::Basic { username, .. } => formatter
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::WorkloadIdentity(_) => formatter.write_str("WorkloadIdentity"),
        }
    }
}

/// Produces ready-to-use clients for one provider organisation or server.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Returns a client carrying current credentials.
    async fn client(&self) -> Result<AuthorizedClient, ProviderError>;
}

/// HTTP client bound to a base URL and a credential.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
}

impl AuthorizedClient {
    /// Base URL every endpoint is derived from.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Starts a `GET` request with the credential applied.
    #[must_use]
    pub fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.credential.apply(self.http.get(url))
    }
}

#[derive(Clone)]
enum Credential {
    None,
    Bearer(String),
    Basic {
        username: String,
        password: Option<String>,
    },
    Header(HeaderName, HeaderValue),
}

impl Credential {
    fn from_token(
        token: &PersonalAccessToken,
        scheme: TokenScheme,
    ) -> Result<Self, ProviderError> {
        let value = token.value().to_owned();
        let credential = match scheme {
            TokenScheme::Bearer => Self::Bearer(value),
            TokenScheme::BasicPassword => Self::Basic {
                username: String::new(),
                password: Some(value),
            },
            TokenScheme::Token => Self::Header(
                http::header::AUTHORIZATION,
                sensitive_header(&format!("token {value}"))?,
            ),
            TokenScheme::PrivateToken => Self::Header(
                HeaderName::from_static("private-token"),
                sensitive_header(&value)?,
            ),
        };
        Ok(credential)
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::None => request,
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Self::Header(name, value) => request.header(name.clone(), value.clone()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::None => "None",
            Self::Bearer(_) => "Bearer",
            Self::Basic { .. } => "Basic",
            Self::Header(..) => "Header",
        };
        formatter.write_str(kind)
    }
}

fn sensitive_header(raw: &str) -> Result<HeaderValue, ProviderError> {
    let mut value = HeaderValue::from_str(raw).map_err(|error| ProviderError::Configuration {
        message: format!("token cannot be sent as a header: {error}"),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Factory for strategies whose credential never changes.
struct StaticClientFactory {
    client: AuthorizedClient,
}

impl StaticClientFactory {
    const fn new(http: reqwest::Client, base_url: Url, credential: Credential) -> Self {
        Self {
            client: AuthorizedClient {
                http,
                base_url,
                credential,
            },
        }
    }
}

#[async_trait]
impl ClientFactory for StaticClientFactory {
    async fn client(&self) -> Result<AuthorizedClient, ProviderError> {
        Ok(self.client.clone())
    }
}

/// Factory that fetches a bearer token for every client it hands out.
struct WorkloadIdentityClientFactory {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

#[async_trait]
impl ClientFactory for WorkloadIdentityClientFactory {
    async fn client(&self) -> Result<AuthorizedClient, ProviderError> {
        let token = self.tokens.access_token().await?;
        Ok(AuthorizedClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential: Credential::Bearer(token.secret().to_owned()),
        })
    }
}
