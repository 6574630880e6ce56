//! Narrow interface to the external identity client.
//!
//! The provider never speaks OAuth2 itself. It drives an identity client through
//! the traits below: [`ClientApplication`] for the account list and silent
//! acquisition shared by every flow, [`ConfidentialClientApplication`] for the
//! server-side flows and [`PublicClientApplication`] for the flows that run on
//! behalf of a user sitting at a device.

use super::errors::BoxError;
use super::secret::SecretPassword;
use super::types::{AcquisitionResult, DeviceCodeInfo, NativeAccountHandle, ParentWindow, Prompt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Callback that shows the device code to the user.
pub type DeviceCodeCallback = Arc<dyn Fn(&DeviceCodeInfo) + Send + Sync>;

/// Server-provided `Retry-After` signal attached to a transient failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryAfter {
    /// Relative delay (`Retry-After: 120`)
    Delta(Duration),
    /// Absolute point in time (`Retry-After: Wed, 21 Oct 2015 07:28:00 GMT`)
    Date(DateTime<Utc>),
}

impl RetryAfter {
    /// Parses a `Retry-After` header value in either delta-seconds or HTTP-date form.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(seconds) = value.parse::<u64>() {
            return Some(RetryAfter::Delta(Duration::from_secs(seconds)));
        }

        DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|date| RetryAfter::Date(date.with_timezone(&Utc)))
    }

    /// Delay to wait, measured from `now`. Dates in the past give a zero delay.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            RetryAfter::Delta(delay) => *delay,
            RetryAfter::Date(date) => (*date - now).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

/// Classified failure reported by the identity client.
#[derive(Debug, Error)]
pub enum IdentityClientError {
    /// Nothing usable in the cache for the account and scopes. Expected on a cold cache.
    #[error("No cached token is available for the requested account and scopes")]
    NoCachedToken,

    /// Transient outage (`temporarily_unavailable`); may carry a `Retry-After` signal.
    #[error("Identity provider is temporarily unavailable")]
    TemporarilyUnavailable { retry_after: Option<RetryAfter> },

    /// Conditional access or step-up: `claims` must be echoed on the next request.
    #[error("Identity provider issued a claims challenge")]
    ClaimsRequired { claims: String },

    /// The exchange observed cancellation and stopped.
    #[error("Token exchange was cancelled")]
    Cancelled,

    /// Error response from the identity provider that the provider does not classify.
    #[error("Identity provider returned {code}: {message}")]
    Service { code: String, message: String },

    /// Any other failure (transport, cache I/O, ...).
    #[error(transparent)]
    Other(#[from] BoxError),
}

/// Parameters of a silent acquisition.
#[derive(Clone, Debug)]
pub struct SilentTokenRequest<'a> {
    pub scopes: &'a [String],
    pub account: &'a NativeAccountHandle,
    pub force_refresh: bool,
    /// Authority to pin when the configured one is tenant-specific.
    pub authority_override: Option<&'a str>,
    pub correlation_id: Uuid,
}

/// Parameters shared by every flow-specific acquisition.
#[derive(Clone, Debug)]
pub struct TokenRequest<'a> {
    pub scopes: &'a [String],
    /// Extra query string for the token request, e.g. `claims=<challenge>`.
    pub extra_query_parameters: Option<&'a str>,
    pub correlation_id: Uuid,
}

/// Capabilities every identity client offers regardless of flow.
#[async_trait]
pub trait ClientApplication: Send + Sync {
    /// Authority the client was configured with.
    fn authority(&self) -> &str;

    /// Accounts present in the client's token cache, in the client's own order.
    async fn list_cached_accounts(&self) -> Result<Vec<NativeAccountHandle>, IdentityClientError>;

    /// Returns a cached (or silently refreshed) token for `request.account`.
    ///
    /// # Errors
    ///
    /// [`IdentityClientError::NoCachedToken`] when the cache cannot satisfy the
    /// request; any other variant is an unexpected failure.
    async fn acquire_token_silent(
        &self,
        request: SilentTokenRequest<'_>,
    ) -> Result<AcquisitionResult, IdentityClientError>;
}

/// Identity client holding an application credential (web apps, daemons, APIs).
#[async_trait]
pub trait ConfidentialClientApplication: ClientApplication {
    /// Redeems an authorization code returned to the web application's redirect URI.
    async fn acquire_token_by_authorization_code(
        &self,
        request: TokenRequest<'_>,
        authorization_code: &str,
    ) -> Result<AcquisitionResult, IdentityClientError>;

    /// App-only token through the client credentials grant.
    async fn acquire_token_for_client(
        &self,
        request: TokenRequest<'_>,
        force_refresh: bool,
    ) -> Result<AcquisitionResult, IdentityClientError>;

    /// Exchanges an incoming user assertion for a downstream token.
    async fn acquire_token_on_behalf_of(
        &self,
        request: TokenRequest<'_>,
        user_assertion: &str,
        authority: &str,
    ) -> Result<AcquisitionResult, IdentityClientError>;
}

/// Identity client for applications that cannot hold a secret.
#[async_trait]
pub trait PublicClientApplication: ClientApplication {
    /// Device code flow. `callback` must be invoked with the user code before polling.
    async fn acquire_token_with_device_code(
        &self,
        request: TokenRequest<'_>,
        callback: DeviceCodeCallback,
        cancellation: CancellationToken,
    ) -> Result<AcquisitionResult, IdentityClientError>;

    /// Integrated Windows authentication, for `username` or the ambient Windows identity.
    async fn acquire_token_by_integrated_windows_auth(
        &self,
        request: TokenRequest<'_>,
        username: Option<&str>,
    ) -> Result<AcquisitionResult, IdentityClientError>;

    /// Interactive browser or embedded UI sign-in.
    async fn acquire_token_interactive(
        &self,
        request: TokenRequest<'_>,
        prompt: Prompt,
        parent_window: Option<ParentWindow>,
        login_hint: Option<&str>,
        cancellation: CancellationToken,
    ) -> Result<AcquisitionResult, IdentityClientError>;

    /// Resource owner password credentials grant.
    async fn acquire_token_by_username_password(
        &self,
        request: TokenRequest<'_>,
        username: &str,
        password: &SecretPassword,
    ) -> Result<AcquisitionResult, IdentityClientError>;
}
