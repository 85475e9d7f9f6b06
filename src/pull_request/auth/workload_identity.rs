//! Token sources for workload-identity authentication.
//!
//! Acquiring the token itself (federated credentials, managed identity, and
//! so on) belongs to the caller; this module only defines the seam and a
//! cache that keeps a token until shortly before it expires.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::pull_request::error::ProviderError;

/// Default time before expiry at which a cached token is refreshed.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// A bearer token with its expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Creates a token that expires at `expires_at`.
    #[must_use]
    pub fn new(secret: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Creates a token valid for `lifetime` from now.
    #[must_use]
    pub fn expiring_in(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(secret, Instant::now() + lifetime)
    }

    /// The raw token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Instant after which the token must not be used.
    #[must_use]
    pub const fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true when the token is still valid `margin` from now.
    #[must_use]
    pub fn is_fresh(&self, margin: Duration) -> bool {
        Instant::now()
            .checked_add(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Supplies access tokens on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a token that is valid now.
    async fn access_token(&self) -> Result<AccessToken, ProviderError>;
}

/// Caches tokens from an inner source and refreshes them near expiry.
///
/// The cache lock is held across the refresh, so concurrent callers wait for
/// one upstream fetch instead of racing.
pub struct CachedTokenSource<S> {
    inner: S,
    refresh_margin: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl<S: TokenSource> CachedTokenSource<S> {
    /// Wraps `inner` with the default refresh margin.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_refresh_margin(inner, DEFAULT_REFRESH_MARGIN)
    }

    /// Wraps `inner`, refreshing tokens `refresh_margin` before expiry.
    #[must_use]
    pub fn with_refresh_margin(inner: S, refresh_margin: Duration) -> Self {
        Self {
            inner,
            refresh_margin,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for CachedTokenSource<S> {
    async fn access_token(&self) -> Result<AccessToken, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh(self.refresh_margin)
        {
            return Ok(token.clone());
        }

        tracing::debug!("refreshing workload identity access token");
        let token = self.inner.access_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
