//! Environment variable utilities for validated access.
//!
//! Values are trimmed and must be non-empty. Typed values go through
//! [`EnvUtils::get_parsed_var`], lists through [`EnvUtils::get_list_var`].

use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when reading environment variables.
#[derive(Debug, Error)]
pub enum EnvVarError {
    /// Environment variable is not set
    #[error("Environment variable '{name}' not found")]
    NotFound { name: String },

    /// Environment variable contains invalid UTF-8 characters
    #[error(
        "Environment variable '{name}' contains invalid UTF-8 characters. Please check the value."
    )]
    InvalidUtf8 { name: String },

    /// Environment variable is set but contains only whitespace or is empty
    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },

    #[error("Environment variable '{name}' has invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

/// Validated environment variable access.
///
/// # Examples
///
/// ```no_run
/// use graph_auth::utils::EnvUtils;
///
/// if EnvUtils::has_non_empty_var("GRAPH_AUTH_SCOPES") {
///     let scopes = EnvUtils::get_list_var("GRAPH_AUTH_SCOPES")?;
///     println!("Scopes: {scopes:?}");
/// }
///
/// let max_retry: Option<u32> = EnvUtils::get_parsed_var("GRAPH_AUTH_MAX_RETRY")?;
/// # Ok::<(), graph_auth::utils::EnvVarError>(())
/// ```
pub struct EnvUtils;

impl EnvUtils {
    /// `true` if the variable is set to something other than whitespace.
    pub fn has_non_empty_var(name: &str) -> bool {
        match std::env::var(name) {
            Ok(value) => !value.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Gets an environment variable, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError`] if:
    /// - The variable is not set ([`EnvVarError::NotFound`])
    /// - The variable is empty or contains only whitespace ([`EnvVarError::Empty`])
    /// - The variable contains invalid UTF-8 ([`EnvVarError::InvalidUtf8`])
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        match std::env::var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(std::env::VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// `Some(value)` if the variable exists and is valid, `None` otherwise.
    pub fn get_optional_var(name: &str) -> Option<String> {
        Self::get_validated_var(name).ok()
    }

    /// Parses an optional variable. Unset or blank is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`EnvVarError::Invalid`] when the value does not parse as `T`,
    /// [`EnvVarError::InvalidUtf8`] when it cannot be read.
    pub fn get_parsed_var<T>(name: &str) -> Result<Option<T>, EnvVarError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = match Self::get_validated_var(name) {
            Ok(value) => value,
            Err(EnvVarError::NotFound { .. } | EnvVarError::Empty { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        value
            .parse::<T>()
            .map(Some)
            .map_err(|e| EnvVarError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
                value,
            })
    }

    /// Reads a comma separated list. Entries are trimmed and blank entries dropped.
    ///
    /// A variable that is set but yields no entries (e.g. `" , "`) is returned as
    /// an empty list so the caller can reject it.
    pub fn get_list_var(name: &str) -> Result<Vec<String>, EnvVarError> {
        let raw = match std::env::var(name) {
            Ok(raw) => raw,
            Err(std::env::VarError::NotPresent) => {
                return Err(EnvVarError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(EnvVarError::InvalidUtf8 {
                    name: name.to_string(),
                });
            }
        };

        Ok(split_list(&raw))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
