//! # Utilities
//!
//! Environment variable access used by [`crate::config::ProviderConfig::from_env`].
//!
//! ```no_run
//! use graph_auth::utils::EnvUtils;
//!
//! let scopes = EnvUtils::get_optional_var("GRAPH_AUTH_SCOPES")
//!     .unwrap_or_else(|| "https://graph.microsoft.com/.default".to_string());
//! ```

pub mod env;

pub use env::{EnvUtils, EnvVarError};
