#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use graph_auth::auth::{
    AcquisitionResult, Backoff, ClientApplication, ConfidentialClientApplication,
    DeviceCodeCallback, DeviceCodeInfo, IdentityClientError, NativeAccountHandle, ParentWindow,
    PublicClientApplication, Prompt, RetryAfter, RetryPolicy, SecretPassword, SilentTokenRequest,
    TokenRequest, UserIdentity,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const TENANT_AUTHORITY: &str = "https://login.microsoftonline.com/72f988bf-86f1-41af-91ab-2d7cd011db47/";
pub const COMMON_AUTHORITY: &str = "https://login.microsoftonline.com/common/";
pub const GRAPH_DEFAULT: &str = "https://graph.microsoft.com/.default";

/// Scripted answer for one acquisition call.
#[derive(Clone, Debug)]
pub enum Reply {
    Token(&'static str),
    EmptyToken,
    Unavailable(Option<u64>),
    Claims(&'static str),
    Cancelled,
    Service(&'static str),
    /// Never completes; only cancellation ends the call.
    Pending,
}

/// What the provider handed to the identity client on one call.
#[derive(Clone, Debug, Default)]
pub struct Call {
    pub method: &'static str,
    pub scopes: Vec<String>,
    pub extra_query_parameters: Option<String>,
    pub correlation_id: Option<Uuid>,
    pub account: Option<String>,
    pub authority_override: Option<String>,
    pub force_refresh: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub assertion: Option<String>,
    pub login_hint: Option<String>,
    pub prompt: Option<Prompt>,
}

/// In-memory identity client implementing every client capability.
///
/// Silent calls answer with the cached token (or a cache miss); flow calls pop
/// scripted replies in order and fail with a service error once the script runs out.
pub struct MockIdentityClient {
    authority: String,
    accounts: Vec<NativeAccountHandle>,
    cached_token: Mutex<Option<&'static str>>,
    silent_failure: Option<&'static str>,
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl MockIdentityClient {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
            accounts: Vec::new(),
            cached_token: Mutex::new(None),
            silent_failure: None,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_account(mut self, account: NativeAccountHandle) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_cached_token(self, token: &'static str) -> Self {
        *self.cached_token.lock().unwrap() = Some(token);
        self
    }

    pub fn with_silent_failure(mut self, message: &'static str) -> Self {
        self.silent_failure = Some(message);
        self
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn token_call(method: &'static str, request: &TokenRequest<'_>) -> Call {
        Call {
            method,
            scopes: request.scopes.to_vec(),
            extra_query_parameters: request.extra_query_parameters.map(str::to_string),
            correlation_id: Some(request.correlation_id),
            ..Call::default()
        }
    }

    async fn next_reply(&self) -> Result<AcquisitionResult, IdentityClientError> {
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Token(token)) => Ok(token_result(token)),
            Some(Reply::EmptyToken) => Ok(token_result("")),
            Some(Reply::Unavailable(seconds)) => Err(IdentityClientError::TemporarilyUnavailable {
                retry_after: seconds.map(|s| RetryAfter::Delta(Duration::from_secs(s))),
            }),
            Some(Reply::Claims(claims)) => Err(IdentityClientError::ClaimsRequired {
                claims: claims.to_string(),
            }),
            Some(Reply::Cancelled) => Err(IdentityClientError::Cancelled),
            Some(Reply::Service(message)) => Err(IdentityClientError::Service {
                code: "invalid_grant".to_string(),
                message: message.to_string(),
            }),
            Some(Reply::Pending) => {
                std::future::pending::<Result<AcquisitionResult, IdentityClientError>>().await
            }
            None => Err(IdentityClientError::Service {
                code: "unscripted".to_string(),
                message: "no scripted reply left".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ClientApplication for MockIdentityClient {
    fn authority(&self) -> &str {
        &self.authority
    }

    async fn list_cached_accounts(&self) -> Result<Vec<NativeAccountHandle>, IdentityClientError> {
        self.record(Call {
            method: "list_cached_accounts",
            ..Call::default()
        });
        Ok(self.accounts.clone())
    }

    async fn acquire_token_silent(
        &self,
        request: SilentTokenRequest<'_>,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            method: "acquire_token_silent",
            scopes: request.scopes.to_vec(),
            correlation_id: Some(request.correlation_id),
            account: Some(request.account.home_account_id().to_string()),
            authority_override: request.authority_override.map(str::to_string),
            force_refresh: Some(request.force_refresh),
            ..Call::default()
        });

        if let Some(message) = self.silent_failure {
            return Err(IdentityClientError::Other(message.into()));
        }
        match *self.cached_token.lock().unwrap() {
            Some(token) if !request.force_refresh => Ok(token_result(token)),
            _ => Err(IdentityClientError::NoCachedToken),
        }
    }
}

#[async_trait]
impl ConfidentialClientApplication for MockIdentityClient {
    async fn acquire_token_by_authorization_code(
        &self,
        request: TokenRequest<'_>,
        authorization_code: &str,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            assertion: Some(authorization_code.to_string()),
            ..Self::token_call("acquire_token_by_authorization_code", &request)
        });
        self.next_reply().await
    }

    async fn acquire_token_for_client(
        &self,
        request: TokenRequest<'_>,
        force_refresh: bool,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            force_refresh: Some(force_refresh),
            ..Self::token_call("acquire_token_for_client", &request)
        });
        self.next_reply().await
    }

    async fn acquire_token_on_behalf_of(
        &self,
        request: TokenRequest<'_>,
        user_assertion: &str,
        authority: &str,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            assertion: Some(user_assertion.to_string()),
            authority_override: Some(authority.to_string()),
            ..Self::token_call("acquire_token_on_behalf_of", &request)
        });
        self.next_reply().await
    }
}

#[async_trait]
impl PublicClientApplication for MockIdentityClient {
    async fn acquire_token_with_device_code(
        &self,
        request: TokenRequest<'_>,
        callback: DeviceCodeCallback,
        _cancellation: CancellationToken,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Self::token_call("acquire_token_with_device_code", &request));

        let info = DeviceCodeInfo {
            user_code: "FGH-4821".to_string(),
            verification_uri: "https://microsoft.com/devicelogin".to_string(),
            message: "To sign in, enter the code FGH-4821".to_string(),
            expires_on: Utc::now() + ChronoDuration::minutes(15),
        };
        // A chatty client re-announcing the same code must not reach the caller twice.
        callback(&info);
        callback(&info);

        self.next_reply().await
    }

    async fn acquire_token_by_integrated_windows_auth(
        &self,
        request: TokenRequest<'_>,
        username: Option<&str>,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            username: username.map(str::to_string),
            ..Self::token_call("acquire_token_by_integrated_windows_auth", &request)
        });
        self.next_reply().await
    }

    async fn acquire_token_interactive(
        &self,
        request: TokenRequest<'_>,
        prompt: Prompt,
        _parent_window: Option<ParentWindow>,
        login_hint: Option<&str>,
        cancellation: CancellationToken,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            prompt: Some(prompt),
            login_hint: login_hint.map(str::to_string),
            ..Self::token_call("acquire_token_interactive", &request)
        });

        if cancellation.is_cancelled() {
            return Err(IdentityClientError::Cancelled);
        }
        self.next_reply().await
    }

    async fn acquire_token_by_username_password(
        &self,
        request: TokenRequest<'_>,
        username: &str,
        password: &SecretPassword,
    ) -> Result<AcquisitionResult, IdentityClientError> {
        self.record(Call {
            username: Some(username.to_string()),
            password: Some(password.expose().to_string()),
            ..Self::token_call("acquire_token_by_username_password", &request)
        });
        self.next_reply().await
    }
}

/// Records delays instead of sleeping.
#[derive(Default)]
pub struct RecordingBackoff {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingBackoff {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

pub fn recording_policy(max_retry: u32) -> (RetryPolicy, Arc<RecordingBackoff>) {
    let backoff = Arc::new(RecordingBackoff::default());
    let policy = RetryPolicy::new(max_retry).with_backoff(backoff.clone());
    (policy, backoff)
}

pub fn token_result(token: &str) -> AcquisitionResult {
    AcquisitionResult::new(token, Utc::now() + ChronoDuration::hours(1), None)
}

pub fn cached_account() -> NativeAccountHandle {
    NativeAccountHandle::new(
        "9a1c0f2e",
        "72f988bf-86f1-41af-91ab-2d7cd011db47",
        "megan@contoso.com",
        "login.microsoftonline.com",
    )
}

pub fn adele() -> UserIdentity {
    UserIdentity::new(
        "adele@contoso.com",
        "3f4a9c1e",
        "72f988bf-86f1-41af-91ab-2d7cd011db47",
        "login.microsoftonline.com",
    )
}

/// Identity carrying only an email, as callers of the user flows often supply.
pub fn email_only(email: &str) -> UserIdentity {
    UserIdentity::new(email, "", "", "login.microsoftonline.com")
}

pub fn graph_request() -> http::Request<()> {
    http::Request::get("https://graph.microsoft.com/v1.0/me")
        .body(())
        .unwrap()
}

pub fn authorization(request: &http::Request<()>) -> Option<String> {
    request
        .headers()
        .get(http::header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap().to_string())
}
