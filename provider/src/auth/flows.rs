use super::errors::AuthError;
use super::identity_client::{
    ConfidentialClientApplication, DeviceCodeCallback, PublicClientApplication, TokenRequest,
};
use super::options::ResolvedOptions;
use super::retry::RetryPolicy;
use super::silent::SilentTokenAcquirer;
use super::types::{AcquisitionResult, DeviceCodeInfo, ParentWindow, Prompt};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One variant per supported authentication flow.
///
/// Each variant owns the identity client it drives and the inputs fixed at
/// construction. Silent acquisition and the retry loop are shared; only the
/// final exchange differs per variant.
#[derive(Clone)]
pub enum FlowAcquirer {
    /// Web apps. Never acquires on its own; a silent miss asks the caller to redirect.
    AuthorizationCode {
        client: Arc<dyn ConfidentialClientApplication>,
    },
    /// Daemons. App-only tokens, no user account.
    ClientCredential {
        client: Arc<dyn ConfidentialClientApplication>,
    },
    /// Middle-tier APIs exchanging the caller's assertion.
    OnBehalfOf {
        client: Arc<dyn ConfidentialClientApplication>,
    },
    DeviceCode {
        client: Arc<dyn PublicClientApplication>,
        callback: DeviceCodeCallback,
        cancellation: Option<CancellationToken>,
    },
    IntegratedWindows {
        client: Arc<dyn PublicClientApplication>,
        username: Option<String>,
    },
    Interactive {
        client: Arc<dyn PublicClientApplication>,
        prompt: Prompt,
        parent_window: Option<ParentWindow>,
        cancellation: Option<CancellationToken>,
    },
    UsernamePassword {
        client: Arc<dyn PublicClientApplication>,
    },
}

impl FlowAcquirer {
    pub fn name(&self) -> &'static str {
        match self {
            FlowAcquirer::AuthorizationCode { .. } => "authorization_code",
            FlowAcquirer::ClientCredential { .. } => "client_credential",
            FlowAcquirer::OnBehalfOf { .. } => "on_behalf_of",
            FlowAcquirer::DeviceCode { .. } => "device_code",
            FlowAcquirer::IntegratedWindows { .. } => "integrated_windows",
            FlowAcquirer::Interactive { .. } => "interactive",
            FlowAcquirer::UsernamePassword { .. } => "username_password",
        }
    }

    /// Authority configured on the underlying identity client.
    pub fn authority(&self) -> &str {
        match self {
            FlowAcquirer::AuthorizationCode { client }
            | FlowAcquirer::ClientCredential { client }
            | FlowAcquirer::OnBehalfOf { client } => client.authority(),
            FlowAcquirer::DeviceCode { client, .. }
            | FlowAcquirer::IntegratedWindows { client, .. }
            | FlowAcquirer::Interactive { client, .. }
            | FlowAcquirer::UsernamePassword { client } => client.authority(),
        }
    }

    /// Client credentials have no user account, so there is nothing to look up
    /// silently; the identity client serves cached app tokens itself.
    pub fn uses_silent_acquisition(&self) -> bool {
        !matches!(self, FlowAcquirer::ClientCredential { .. })
    }

    /// Only the username-password exchange reads the request's password.
    pub fn uses_password(&self) -> bool {
        matches!(self, FlowAcquirer::UsernamePassword { .. })
    }

    /// Only app-only scopes configured on the provider apply to client credentials.
    pub fn accepts_request_scopes(&self) -> bool {
        !matches!(self, FlowAcquirer::ClientCredential { .. })
    }

    /// Checks the per-request inputs this flow requires.
    pub fn validate(&self, options: &ResolvedOptions<'_>) -> Result<(), AuthError> {
        match self {
            FlowAcquirer::OnBehalfOf { .. } => {
                if options.user_assertion.is_none_or(|a| a.trim().is_empty()) {
                    return Err(AuthError::invalid_request(
                        "userAssertion is required for the on-behalf-of flow",
                    ));
                }
            }
            FlowAcquirer::UsernamePassword { .. } => {
                if options
                    .user_account
                    .is_none_or(|account| account.email.trim().is_empty())
                {
                    return Err(AuthError::invalid_request(
                        "userAccount with an email is required for the username-password flow",
                    ));
                }
                if options.password.is_none_or(|password| password.is_empty()) {
                    return Err(AuthError::invalid_request(
                        "password is required for the username-password flow",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Silent lookup against this flow's identity client.
    pub async fn acquire_silent(
        &self,
        silent: &SilentTokenAcquirer,
        options: &ResolvedOptions<'_>,
        correlation_id: Uuid,
    ) -> Result<Option<AcquisitionResult>, AuthError> {
        match self {
            FlowAcquirer::AuthorizationCode { client }
            | FlowAcquirer::ClientCredential { client }
            | FlowAcquirer::OnBehalfOf { client } => {
                silent.acquire(client.as_ref(), options, self.name(), correlation_id).await
            }
            FlowAcquirer::DeviceCode { client, .. }
            | FlowAcquirer::IntegratedWindows { client, .. }
            | FlowAcquirer::Interactive { client, .. }
            | FlowAcquirer::UsernamePassword { client } => {
                silent.acquire(client.as_ref(), options, self.name(), correlation_id).await
            }
        }
    }

    /// Flow-specific acquisition under `policy`, run after a silent miss.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ChallengeRequired`] for the authorization-code flow, always.
    /// - [`AuthError::Cancelled`] when the flow's cancellation token fires.
    /// - Whatever [`RetryPolicy::run`] reports, and exhaustion per
    ///   [`RetryOutcome::into_auth_result`](super::retry::RetryOutcome::into_auth_result).
    pub async fn acquire(
        &self,
        policy: &RetryPolicy,
        options: &ResolvedOptions<'_>,
        correlation_id: Uuid,
    ) -> Result<AcquisitionResult, AuthError> {
        let flow = self.name();
        let scopes = options.scopes;

        let outcome = match self {
            FlowAcquirer::AuthorizationCode { .. } => {
                return Err(AuthError::ChallengeRequired {
                    message: "no cached token for the authorization code flow; redirect the user to sign in".to_string(),
                    claims: None,
                });
            }
            FlowAcquirer::ClientCredential { client } => {
                let client = client.as_ref();
                let force_refresh = options.force_refresh;
                policy
                    .run(flow, scopes, |extra| async move {
                        let request = token_request(scopes, extra.as_deref(), correlation_id);
                        client.acquire_token_for_client(request, force_refresh).await
                    })
                    .await?
            }
            FlowAcquirer::OnBehalfOf { client } => {
                let client = client.as_ref();
                let assertion = options.user_assertion.unwrap_or_default();
                let authority = client.authority();
                policy
                    .run(flow, scopes, |extra| async move {
                        let request = token_request(scopes, extra.as_deref(), correlation_id);
                        client
                            .acquire_token_on_behalf_of(request, assertion, authority)
                            .await
                    })
                    .await?
            }
            FlowAcquirer::DeviceCode {
                client,
                callback,
                cancellation,
            } => {
                let client = client.as_ref();
                let cancellation = cancellation.clone().unwrap_or_default();
                log::info!("[{correlation_id}] Device code authentication initiated - awaiting user action");

                let exchange = policy.run(flow, scopes, |extra| {
                    let callback = once_per_attempt(callback);
                    let cancellation = cancellation.clone();
                    async move {
                        let request = token_request(scopes, extra.as_deref(), correlation_id);
                        client
                            .acquire_token_with_device_code(request, callback, cancellation)
                            .await
                    }
                });
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Err(cancelled(flow, correlation_id)),
                    outcome = exchange => outcome?,
                }
            }
            FlowAcquirer::IntegratedWindows { client, username } => {
                let client = client.as_ref();
                let username = options
                    .user_account
                    .map(|account| account.email.as_str())
                    .filter(|email| !email.is_empty())
                    .or(username.as_deref());
                policy
                    .run(flow, scopes, |extra| async move {
                        let request = token_request(scopes, extra.as_deref(), correlation_id);
                        client
                            .acquire_token_by_integrated_windows_auth(request, username)
                            .await
                    })
                    .await?
            }
            FlowAcquirer::Interactive {
                client,
                prompt,
                parent_window,
                cancellation,
            } => {
                let client = client.as_ref();
                let prompt = *prompt;
                let parent_window = *parent_window;
                let login_hint = options
                    .user_account
                    .map(|account| account.email.as_str())
                    .filter(|email| !email.is_empty());
                let cancellation = cancellation.clone().unwrap_or_default();

                let exchange = policy.run(flow, scopes, |extra| {
                    let cancellation = cancellation.clone();
                    async move {
                        let request = token_request(scopes, extra.as_deref(), correlation_id);
                        client
                            .acquire_token_interactive(
                                request,
                                prompt,
                                parent_window,
                                login_hint,
                                cancellation,
                            )
                            .await
                    }
                });
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Err(cancelled(flow, correlation_id)),
                    outcome = exchange => outcome?,
                }
            }
            FlowAcquirer::UsernamePassword { client } => {
                let client = client.as_ref();
                let username = options
                    .user_account
                    .map(|account| account.email.as_str())
                    .unwrap_or_default();
                let password = options.password.ok_or_else(|| {
                    AuthError::invalid_request("password is required for the username-password flow")
                })?;
                policy
                    .run(flow, scopes, |extra| {
                        let mut attempt_password = password.clone();
                        async move {
                            let request = token_request(scopes, extra.as_deref(), correlation_id);
                            let result = client
                                .acquire_token_by_username_password(
                                    request,
                                    username,
                                    &attempt_password,
                                )
                                .await;
                            attempt_password.clear();
                            result
                        }
                    })
                    .await?
            }
        };

        outcome.into_auth_result(flow)
    }

    /// Redeems the authorization code a web app received on its redirect URI.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] on any flow other than authorization code
    /// or for a blank code.
    pub async fn redeem_authorization_code(
        &self,
        policy: &RetryPolicy,
        authorization_code: &str,
        scopes: &[String],
        correlation_id: Uuid,
    ) -> Result<AcquisitionResult, AuthError> {
        let FlowAcquirer::AuthorizationCode { client } = self else {
            return Err(AuthError::invalid_request(format!(
                "authorization codes can only be redeemed by the authorization code flow, not {}",
                self.name()
            )));
        };
        if authorization_code.trim().is_empty() {
            return Err(AuthError::invalid_request("authorization code cannot be empty"));
        }

        let client = client.as_ref();
        let flow = self.name();
        policy
            .run(flow, scopes, |extra| async move {
                let request = token_request(scopes, extra.as_deref(), correlation_id);
                client
                    .acquire_token_by_authorization_code(request, authorization_code)
                    .await
            })
            .await?
            .into_auth_result(flow)
    }
}

impl fmt::Debug for FlowAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowAcquirer")
            .field("flow", &self.name())
            .field("authority", &self.authority())
            .finish_non_exhaustive()
    }
}

fn token_request<'a>(
    scopes: &'a [String],
    extra_query_parameters: Option<&'a str>,
    correlation_id: Uuid,
) -> TokenRequest<'a> {
    TokenRequest {
        scopes,
        extra_query_parameters,
        correlation_id,
    }
}

fn cancelled(flow: &'static str, correlation_id: Uuid) -> AuthError {
    log::info!("[{correlation_id}] {flow} flow cancelled by caller");
    AuthError::Cancelled { flow }
}

// A fresh guard per attempt: a claims retry legitimately issues a new device code.
fn once_per_attempt(callback: &DeviceCodeCallback) -> DeviceCodeCallback {
    let callback = Arc::clone(callback);
    let invoked = AtomicBool::new(false);
    Arc::new(move |info: &DeviceCodeInfo| {
        if invoked.swap(true, Ordering::SeqCst) {
            log::debug!("Ignoring repeated device code callback within one attempt");
            return;
        }
        callback(info);
    })
}
