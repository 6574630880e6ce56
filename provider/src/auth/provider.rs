use super::authority::Authority;
use super::errors::AuthError;
use super::flows::FlowAcquirer;
use super::identity_client::{
    ConfidentialClientApplication, DeviceCodeCallback, PublicClientApplication,
};
use super::options::{AuthRequestOptions, ProviderDefaults, RequestOptionsResolver, Scopes};
use super::request::{RequestContext, bearer_header, write_authorization};
use super::retry::RetryPolicy;
use super::silent::SilentTokenAcquirer;
use super::types::{AcquisitionResult, ParentWindow, Prompt, UserIdentity};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use http::header::AUTHORIZATION;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Authenticates outgoing requests by attaching a bearer token.
///
/// # Examples
///
/// ```no_run
/// use graph_auth::auth::{AuthError, AuthenticationProvider, RequestContext};
/// use async_trait::async_trait;
/// use http::header::{AUTHORIZATION, HeaderValue};
///
/// struct StaticTokenProvider(&'static str);
///
/// #[async_trait]
/// impl AuthenticationProvider for StaticTokenProvider {
///     async fn authenticate_request(
///         &self,
///         request: &mut (dyn RequestContext + '_),
///     ) -> Result<(), AuthError> {
///         request
///             .headers_mut()
///             .insert(AUTHORIZATION, HeaderValue::from_static(self.0));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Sets `Authorization: Bearer <token>` on `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when no token could be obtained. The request then
    /// carries no `Authorization` header at all.
    async fn authenticate_request(
        &self,
        request: &mut (dyn RequestContext + '_),
    ) -> Result<(), AuthError>;
}

#[derive(Debug, Error)]
#[error("identity client returned an empty access token")]
struct EmptyAccessToken;

/// Orchestrates option resolution, silent lookup, the flow-specific exchange
/// and the retry policy for one configured flow.
///
/// The provider keeps no per-call state, so a single instance can be shared
/// across tasks and called concurrently.
#[derive(Clone, Debug)]
pub struct GraphAuthProvider {
    flow: FlowAcquirer,
    silent: SilentTokenAcquirer,
    resolver: RequestOptionsResolver,
    retry_policy: RetryPolicy,
}

impl GraphAuthProvider {
    pub fn builder() -> GraphAuthProviderBuilder {
        GraphAuthProviderBuilder::default()
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow.name()
    }

    pub fn authority(&self) -> &Authority {
        self.silent.authority()
    }

    pub fn defaults(&self) -> &ProviderDefaults {
        self.resolver.defaults()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Obtains a token without touching any request.
    ///
    /// Tries the cache first and only runs the flow-specific exchange on a miss.
    pub async fn acquire_token(
        &self,
        options: Option<&AuthRequestOptions>,
    ) -> Result<AcquisitionResult, AuthError> {
        let correlation_id = Uuid::new_v4();
        let flow = self.flow.name();

        let mut resolved = self.resolver.resolve(options);
        if !self.flow.accepts_request_scopes() {
            if options.and_then(|o| o.scopes()).is_some() {
                log::debug!(
                    "[{correlation_id}] Ignoring request scopes for {flow} flow, using app-only scopes"
                );
            }
            resolved.scopes = self.resolver.defaults().scopes.as_slice();
        }
        self.flow.validate(&resolved)?;

        log::debug!(
            "[{correlation_id}] Acquiring token for {flow} flow (scopes: {}, force_refresh: {})",
            resolved.scopes.join(" "),
            resolved.force_refresh
        );

        if self.flow.uses_silent_acquisition() {
            if let Some(result) = self
                .flow
                .acquire_silent(&self.silent, &resolved, correlation_id)
                .await?
            {
                return Ok(result);
            }
        }

        let policy = match resolved.max_retry {
            Some(max_retry) => self.retry_policy.with_max_retry(max_retry),
            None => self.retry_policy.clone(),
        };

        let result = self
            .flow
            .acquire(&policy, &resolved, correlation_id)
            .await
            .inspect_err(|e| {
                log::error!("[{correlation_id}] {flow} flow failed [{}]: {e}", e.code());
            })?;

        if !result.has_token() {
            log::error!("[{correlation_id}] {flow} flow returned an empty access token");
            return Err(AuthError::general(
                format!(
                    "Token acquisition failed for {flow} flow (scopes: {})",
                    resolved.scopes.join(" ")
                ),
                EmptyAccessToken,
            ));
        }

        Ok(result)
    }

    /// Redeems an authorization code received on the web app's redirect URI.
    ///
    /// This is how a caller recovers from the [`AuthError::ChallengeRequired`]
    /// raised by the authorization code flow. `scopes` defaults to the
    /// provider's scopes.
    pub async fn redeem_authorization_code(
        &self,
        authorization_code: &str,
        scopes: Option<&Scopes>,
    ) -> Result<AcquisitionResult, AuthError> {
        let correlation_id = Uuid::new_v4();
        let scopes = scopes.unwrap_or(&self.resolver.defaults().scopes);

        self.flow
            .redeem_authorization_code(
                &self.retry_policy,
                authorization_code,
                scopes.as_slice(),
                correlation_id,
            )
            .await
    }
}

#[async_trait]
impl AuthenticationProvider for GraphAuthProvider {
    async fn authenticate_request(
        &self,
        request: &mut (dyn RequestContext + '_),
    ) -> Result<(), AuthError> {
        // Owned copy: the request's own options stay untouched.
        let options = request
            .auth_options()
            .map(|options| options.snapshot(self.flow.uses_password()));

        let header = match self.acquire_token(options.as_ref()).await {
            Ok(result) => bearer_header(result.access_token()),
            Err(e) => Err(e),
        };

        match header {
            Ok(value) => {
                write_authorization(request.headers_mut(), value);
                Ok(())
            }
            Err(e) => {
                request.headers_mut().remove(AUTHORIZATION);
                Err(e)
            }
        }
    }
}

/// Builder for [`GraphAuthProvider`]. Pick exactly one flow.
#[derive(Default)]
pub struct GraphAuthProviderBuilder {
    flow: Option<FlowAcquirer>,
    scopes: Option<Vec<String>>,
    force_refresh: bool,
    user_account: Option<UserIdentity>,
    retry_policy: RetryPolicy,
}

impl GraphAuthProviderBuilder {
    pub fn authorization_code(mut self, client: Arc<dyn ConfidentialClientApplication>) -> Self {
        self.flow = Some(FlowAcquirer::AuthorizationCode { client });
        self
    }

    pub fn client_credential(mut self, client: Arc<dyn ConfidentialClientApplication>) -> Self {
        self.flow = Some(FlowAcquirer::ClientCredential { client });
        self
    }

    pub fn on_behalf_of(mut self, client: Arc<dyn ConfidentialClientApplication>) -> Self {
        self.flow = Some(FlowAcquirer::OnBehalfOf { client });
        self
    }

    pub fn device_code(
        mut self,
        client: Arc<dyn PublicClientApplication>,
        callback: DeviceCodeCallback,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        self.flow = Some(FlowAcquirer::DeviceCode {
            client,
            callback,
            cancellation,
        });
        self
    }

    pub fn integrated_windows(
        mut self,
        client: Arc<dyn PublicClientApplication>,
        username: Option<String>,
    ) -> Self {
        self.flow = Some(FlowAcquirer::IntegratedWindows { client, username });
        self
    }

    pub fn interactive(
        mut self,
        client: Arc<dyn PublicClientApplication>,
        prompt: Prompt,
        parent_window: Option<ParentWindow>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        self.flow = Some(FlowAcquirer::Interactive {
            client,
            prompt,
            parent_window,
            cancellation,
        });
        self
    }

    pub fn username_password(mut self, client: Arc<dyn PublicClientApplication>) -> Self {
        self.flow = Some(FlowAcquirer::UsernamePassword { client });
        self
    }

    /// Provider default scopes. An explicitly empty list fails at [`build`](Self::build).
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn user_account(mut self, user_account: UserIdentity) -> Self {
        self.user_account = Some(user_account);
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Applies scopes, force-refresh default and retry budget from configuration.
    pub fn config(mut self, config: &ProviderConfig) -> Self {
        self.scopes = config.scopes.clone();
        self.force_refresh = config.force_refresh;
        self.retry_policy = self.retry_policy.with_max_retry(config.max_retry);
        self
    }

    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] when no flow (and so no identity client) was
    /// chosen, when scopes were given but empty, or when the client's authority
    /// is malformed.
    pub fn build(self) -> Result<GraphAuthProvider, AuthError> {
        let flow = self.flow.ok_or_else(|| {
            AuthError::invalid_request("an identity client and flow are required")
        })?;
        let scopes = Scopes::from_optional(self.scopes)?;
        let authority = Authority::parse(flow.authority())?;

        log::debug!(
            "Configured {} flow against {authority} (well-known tenant: {})",
            flow.name(),
            authority.is_well_known_tenant()
        );

        Ok(GraphAuthProvider {
            flow,
            silent: SilentTokenAcquirer::new(authority),
            resolver: RequestOptionsResolver::new(ProviderDefaults {
                scopes,
                force_refresh: self.force_refresh,
                user_account: self.user_account,
            }),
            retry_policy: self.retry_policy,
        })
    }
}
