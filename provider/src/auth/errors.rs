use super::identity_client::IdentityClientError;
use std::time::Duration;
use thiserror::Error;

/// Boxed cause carried by [`AuthError::GeneralException`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to callers of the authentication provider.
///
/// Every variant maps to a stable machine code through [`AuthError::code`], so
/// callers can branch on the failure kind without parsing messages.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required collaborator or input is missing or malformed. Never retried.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Silent acquisition missed and the active flow cannot remediate on its own.
    ///
    /// The caller has to run an external challenge (redirect, interactive
    /// step-up) and retry the request. `claims` holds the last claims
    /// challenge issued by the identity provider, if any.
    #[error("Authentication challenge is required: {message}")]
    ChallengeRequired {
        message: String,
        claims: Option<String>,
    },

    /// A claim needed to build a user identity is missing or malformed.
    #[error("Invalid claim: {message}")]
    InvalidClaim { message: String },

    /// The identity provider stayed unavailable for the whole retry budget.
    #[error("Identity provider temporarily unavailable after {attempts} attempt(s): {message}")]
    TemporarilyUnavailable {
        attempts: u32,
        retry_after: Option<Duration>,
        message: String,
    },

    /// Any unclassified collaborator failure, with the original error as its cause.
    #[error("{context}: {source}")]
    GeneralException {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The caller cancelled a long-running acquisition.
    #[error("Token acquisition cancelled during {flow} flow")]
    Cancelled { flow: &'static str },
}

impl AuthError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest { .. } => "invalidRequest",
            AuthError::ChallengeRequired { .. } => "authenticationChallengeRequired",
            AuthError::InvalidClaim { .. } => "invalidClaim",
            AuthError::TemporarilyUnavailable { .. } => "temporarily_unavailable",
            AuthError::GeneralException { .. } => "generalException",
            AuthError::Cancelled { .. } => "operationCancelled",
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        AuthError::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_claim(message: impl Into<String>) -> Self {
        AuthError::InvalidClaim {
            message: message.into(),
        }
    }

    pub(crate) fn general(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        AuthError::GeneralException {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wraps an identity-client failure with the flow and scopes that were requested.
    pub(crate) fn from_client(flow: &str, scopes: &[String], source: IdentityClientError) -> Self {
        AuthError::general(
            format!(
                "Token acquisition failed for {flow} flow (scopes: {})",
                scopes.join(" ")
            ),
            source,
        )
    }

    /// Whether the error is the identity provider asking for a challenge.
    pub fn is_challenge_required(&self) -> bool {
        matches!(self, AuthError::ChallengeRequired { .. })
    }
}
