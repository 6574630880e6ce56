//! Provider-level configuration.
//!
//! Loaded from any serde source or from `GRAPH_AUTH_*` environment variables.
//! Per-request [`AuthRequestOptions`](crate::auth::AuthRequestOptions) override
//! everything configured here.

use crate::auth::{AuthError, ProviderDefaults, RetryPolicy, Scopes, retry::DEFAULT_MAX_RETRY};
use crate::utils::{EnvUtils, EnvVarError};
use serde::Deserialize;
use thiserror::Error;

pub const SCOPES_VAR: &str = "GRAPH_AUTH_SCOPES";
pub const FORCE_REFRESH_VAR: &str = "GRAPH_AUTH_FORCE_REFRESH";
pub const MAX_RETRY_VAR: &str = "GRAPH_AUTH_MAX_RETRY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] EnvVarError),

    #[error("Invalid provider configuration: {0}")]
    Invalid(#[from] AuthError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// `None` means the default Graph scope. `Some(vec![])` is rejected.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default = "default_force_refresh")]
    pub force_refresh: bool,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

fn default_force_refresh() -> bool {
    false
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            scopes: None,
            force_refresh: default_force_refresh(),
            max_retry: default_max_retry(),
        }
    }
}

impl ProviderConfig {
    /// Reads `GRAPH_AUTH_SCOPES` (comma separated), `GRAPH_AUTH_FORCE_REFRESH`
    /// and `GRAPH_AUTH_MAX_RETRY`. Unset or blank variables keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Env`] when a value cannot be read or parsed,
    /// [`ConfigError::Invalid`] when the scope list names no scope.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if EnvUtils::has_non_empty_var(SCOPES_VAR) {
            config.scopes = Some(EnvUtils::get_list_var(SCOPES_VAR)?);
        }
        if let Some(force_refresh) = EnvUtils::get_parsed_var::<bool>(FORCE_REFRESH_VAR)? {
            config.force_refresh = force_refresh;
        }
        if let Some(max_retry) = EnvUtils::get_parsed_var::<u32>(MAX_RETRY_VAR)? {
            config.max_retry = max_retry;
        }

        config.validate()?;
        log::debug!(
            "Loaded provider configuration from environment (force_refresh: {}, max_retry: {})",
            config.force_refresh,
            config.max_retry
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scopes()?;
        Ok(())
    }

    pub fn scopes(&self) -> Result<Scopes, AuthError> {
        Scopes::from_optional(self.scopes.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry)
    }

    pub fn defaults(&self) -> Result<ProviderDefaults, AuthError> {
        Ok(ProviderDefaults {
            scopes: self.scopes()?,
            force_refresh: self.force_refresh,
            user_account: None,
        })
    }
}
