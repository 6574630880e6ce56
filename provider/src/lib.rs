//! # Graph Auth Provider
//!
//! Attaches Microsoft identity bearer tokens to outgoing Graph requests.
//!
//! ## Modules
//!
//! - [`auth`] - Option resolution, silent acquisition, flows, retry policy and
//!   the [`auth::GraphAuthProvider`] orchestrator
//! - [`config`] - Provider defaults loaded from serde sources or the environment
//! - [`utils`] - Environment variable helpers
//!
//! ## Example
//!
//! ```no_run
//! use graph_auth::auth::{
//!     AuthRequestOptions, AuthenticationProvider, ConfidentialClientApplication,
//!     GraphAuthProvider, RequestOptionsExt,
//! };
//! use graph_auth::config::ProviderConfig;
//! use std::sync::Arc;
//!
//! # async fn run(client: Arc<dyn ConfidentialClientApplication>) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = GraphAuthProvider::builder()
//!     .client_credential(client)
//!     .config(&ProviderConfig::from_env()?)
//!     .build()?;
//!
//! let mut request = http::Request::get("https://graph.microsoft.com/v1.0/users")
//!     .body(())?
//!     .with_auth_options(AuthRequestOptions::new().with_force_refresh(true));
//! provider.authenticate_request(&mut request).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod utils;
