//! Request authentication against Microsoft identity.
//!
//! [`GraphAuthProvider`] resolves per-request options, tries a silent cache
//! lookup, and falls back to one of seven flows under a bounded
//! [`RetryPolicy`]. Token acquisition itself is delegated to an identity client
//! implementing the traits in [`identity_client`].

pub mod account;
pub mod authority;
pub mod errors;
pub mod flows;
pub mod identity_client;
pub mod options;
pub mod provider;
pub mod request;
pub mod retry;
pub mod secret;
pub mod silent;
pub mod types;

pub use account::AccountResolver;
pub use authority::{Authority, WELL_KNOWN_TENANTS, is_well_known_tenant_segment};
pub use errors::{AuthError, BoxError};
pub use flows::FlowAcquirer;
pub use identity_client::{
    ClientApplication, ConfidentialClientApplication, DeviceCodeCallback, IdentityClientError,
    PublicClientApplication, RetryAfter, SilentTokenRequest, TokenRequest,
};
pub use options::{
    AuthRequestOptions, DEFAULT_SCOPE, ProviderDefaults, RequestOptionsResolver,
    ResolvedOptions, Scopes,
};
pub use provider::{AuthenticationProvider, GraphAuthProvider, GraphAuthProviderBuilder};
pub use request::{RequestContext, RequestOptionsExt};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, RetryableFailure, TokioBackoff};
pub use secret::SecretPassword;
pub use silent::SilentTokenAcquirer;
pub use types::{
    AcquisitionResult, DeviceCodeInfo, NativeAccountHandle, ParentWindow, Prompt, UserIdentity,
};
