use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-level identity of the user a request acts for.
///
/// `object_id` and `tenant_id` together form the stable account key used to
/// look up the matching cached account in the identity client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Sign-in name of the user (UPN or email)
    pub email: String,
    /// Directory object id of the user
    pub object_id: String,
    /// Directory tenant id the user signed in to
    pub tenant_id: String,
    /// Cloud environment host, e.g. `login.microsoftonline.com`
    pub environment: String,
}

impl UserIdentity {
    pub fn new(
        email: impl Into<String>,
        object_id: impl Into<String>,
        tenant_id: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            object_id: object_id.into(),
            tenant_id: tenant_id.into(),
            environment: environment.into(),
        }
    }

    /// The `{object_id}.{tenant_id}` key shared with [`NativeAccountHandle`].
    pub fn account_key(&self) -> String {
        format!("{}.{}", self.object_id, self.tenant_id)
    }
}

/// Identity-client handle for a cached end-user account.
///
/// Identity clients build these for the accounts they hold; the provider only
/// derives one from a [`UserIdentity`] and otherwise treats it as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeAccountHandle {
    home_account_id: String,
    object_id: String,
    tenant_id: String,
    username: String,
    environment: String,
}

impl NativeAccountHandle {
    pub fn new(
        object_id: impl Into<String>,
        tenant_id: impl Into<String>,
        username: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        let object_id = object_id.into();
        let tenant_id = tenant_id.into();
        Self {
            home_account_id: format!("{object_id}.{tenant_id}"),
            object_id,
            tenant_id,
            username: username.into(),
            environment: environment.into(),
        }
    }

    /// `{object_id}.{tenant_id}`
    pub fn home_account_id(&self) -> &str {
        &self.home_account_id
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl From<&UserIdentity> for NativeAccountHandle {
    fn from(identity: &UserIdentity) -> Self {
        NativeAccountHandle::new(
            identity.object_id.as_str(),
            identity.tenant_id.as_str(),
            identity.email.as_str(),
            identity.environment.as_str(),
        )
    }
}

/// Outcome of a successful token acquisition.
///
/// Built once by the identity client and consumed once to populate the
/// `Authorization` header. An empty access token means the acquisition failed.
#[derive(Clone)]
pub struct AcquisitionResult {
    access_token: String,
    expires_on: DateTime<Utc>,
    account: Option<NativeAccountHandle>,
}

impl AcquisitionResult {
    pub fn new(
        access_token: impl Into<String>,
        expires_on: DateTime<Utc>,
        account: Option<NativeAccountHandle>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_on,
            account,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_on(&self) -> DateTime<Utc> {
        self.expires_on
    }

    /// Account the token was issued for. `None` for app-only tokens.
    pub fn account(&self) -> Option<&NativeAccountHandle> {
        self.account.as_ref()
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_on
    }
}

impl fmt::Debug for AcquisitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionResult")
            .field("access_token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .field("account", &self.account)
            .finish()
    }
}

/// Information the user needs to finish a device code sign-in.
///
/// Handed once to the device code callback before the token exchange
/// completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCodeInfo {
    /// The user code to be entered on the verification page
    pub user_code: String,
    /// The URL where the user should enter the code
    pub verification_uri: String,
    /// Human-readable message with authentication instructions
    pub message: String,
    /// When the device code stops being accepted
    pub expires_on: DateTime<Utc>,
}

/// How an interactive sign-in prompts the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// Let the user pick among signed-in accounts
    #[default]
    SelectAccount,
    /// Ask for consent even if already granted
    Consent,
    /// Force credentials to be entered again
    ForceLogin,
    /// Only prompt when the identity provider requires it
    NoPrompt,
}

/// Native window handle the interactive UI is parented to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentWindow(pub isize);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_handle_derived_from_identity_uses_account_key() {
        let identity = UserIdentity::new(
            "adele@contoso.com",
            "3f4a9c1e",
            "72f988bf",
            "login.microsoftonline.com",
        );
        let handle = NativeAccountHandle::from(&identity);

        assert_eq!(handle.home_account_id(), "3f4a9c1e.72f988bf");
        assert_eq!(handle.home_account_id(), identity.account_key());
        assert_eq!(handle.username(), "adele@contoso.com");
        assert_eq!(handle.environment(), "login.microsoftonline.com");
    }

    #[test]
    fn test_acquisition_result_debug_hides_token() {
        let result = AcquisitionResult::new(
            "eyJ0eXAiOiJKV1QiLCJub25jZSI6",
            Utc::now() + Duration::hours(1),
            None,
        );

        let debug = format!("{result:?}");
        assert!(!debug.contains("eyJ0eXAi"));
        assert!(result.has_token());
        assert!(!result.is_expired());
    }

    #[test]
    fn test_empty_token_signals_failure() {
        let result = AcquisitionResult::new("", Utc::now(), None);
        assert!(!result.has_token());
    }
}
