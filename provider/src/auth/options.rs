use super::errors::AuthError;
use super::secret::SecretPassword;
use super::types::UserIdentity;
use std::fmt;

/// Scope requested when neither the request nor the provider names any.
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Ordered, non-empty set of OAuth scopes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Builds a scope set from an explicit collection.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] when the collection is empty or contains a
    /// blank scope.
    pub fn new<I, S>(scopes: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();

        if scopes.is_empty() {
            return Err(AuthError::invalid_request(
                "scopes cannot be empty; omit scopes to use the default scope",
            ));
        }
        if scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(AuthError::invalid_request("scopes cannot contain blank entries"));
        }

        Ok(Self(scopes))
    }

    /// `None` falls back to [`DEFAULT_SCOPE`]; `Some(empty)` is rejected.
    pub fn from_optional(scopes: Option<Vec<String>>) -> Result<Self, AuthError> {
        match scopes {
            Some(scopes) => Self::new(scopes),
            None => Ok(Self::default()),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self(vec![DEFAULT_SCOPE.to_string()])
    }
}

/// Per-request overrides attached to an outgoing request.
///
/// Every field is optional; anything left unset falls back to the provider's
/// [`ProviderDefaults`]. Attach it with
/// [`RequestOptionsExt::set_auth_options`](super::request::RequestOptionsExt::set_auth_options).
///
/// # Examples
///
/// ```no_run
/// use graph_auth::auth::{AuthRequestOptions, UserIdentity};
///
/// let options = AuthRequestOptions::new()
///     .with_scopes(["User.Read", "Mail.Send"])?
///     .with_force_refresh(true)
///     .with_user_account(UserIdentity::new(
///         "adele@contoso.com",
///         "3f4a9c1e",
///         "72f988bf",
///         "login.microsoftonline.com",
///     ));
/// # Ok::<(), graph_auth::auth::AuthError>(())
/// ```
#[derive(Clone, Default)]
pub struct AuthRequestOptions {
    scopes: Option<Scopes>,
    force_refresh: Option<bool>,
    user_account: Option<UserIdentity>,
    user_assertion: Option<String>,
    password: Option<SecretPassword>,
    max_retry: Option<u32>,
}

impl AuthRequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`AuthError::InvalidRequest`] for an explicitly empty collection.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(Scopes::new(scopes)?);
        Ok(self)
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = Some(force_refresh);
        self
    }

    pub fn with_user_account(mut self, user_account: UserIdentity) -> Self {
        self.user_account = Some(user_account);
        self
    }

    /// Incoming assertion for the on-behalf-of flow.
    pub fn with_user_assertion(mut self, assertion: impl Into<String>) -> Self {
        self.user_assertion = Some(assertion.into());
        self
    }

    /// Password for the username-password flow.
    ///
    /// The provider only reads the password and never clears it from these
    /// options. Whoever attaches the options to a request owns that copy and
    /// should drop the options (or the request) once authentication is done.
    pub fn with_password(mut self, password: impl Into<SecretPassword>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    pub fn scopes(&self) -> Option<&Scopes> {
        self.scopes.as_ref()
    }

    pub fn force_refresh(&self) -> Option<bool> {
        self.force_refresh
    }

    pub fn user_account(&self) -> Option<&UserIdentity> {
        self.user_account.as_ref()
    }

    pub fn user_assertion(&self) -> Option<&str> {
        self.user_assertion.as_deref()
    }

    pub fn password(&self) -> Option<&SecretPassword> {
        self.password.as_ref()
    }

    pub fn max_retry(&self) -> Option<u32> {
        self.max_retry
    }

    /// Owned copy of the values a single acquisition reads.
    ///
    /// The password is copied only when `with_password` is set, so flows that
    /// never send one do not carry it through retries and backoff waits.
    pub(crate) fn snapshot(&self, with_password: bool) -> Self {
        Self {
            scopes: self.scopes.clone(),
            force_refresh: self.force_refresh,
            user_account: self.user_account.clone(),
            user_assertion: self.user_assertion.clone(),
            password: self.password.as_ref().filter(|_| with_password).cloned(),
            max_retry: self.max_retry,
        }
    }
}

impl fmt::Debug for AuthRequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequestOptions")
            .field("scopes", &self.scopes)
            .field("force_refresh", &self.force_refresh)
            .field("user_account", &self.user_account)
            .field(
                "user_assertion",
                &self.user_assertion.as_ref().map(|_| "<redacted>"),
            )
            .field("password", &self.password)
            .field("max_retry", &self.max_retry)
            .finish()
    }
}

/// Provider-level values used when a request does not override them.
#[derive(Clone, Debug, Default)]
pub struct ProviderDefaults {
    pub scopes: Scopes,
    pub force_refresh: bool,
    pub user_account: Option<UserIdentity>,
}

/// Effective options for one acquisition, borrowed from the request and defaults.
#[derive(Clone, Copy)]
pub struct ResolvedOptions<'a> {
    pub scopes: &'a [String],
    pub force_refresh: bool,
    pub user_account: Option<&'a UserIdentity>,
    pub user_assertion: Option<&'a str>,
    pub password: Option<&'a SecretPassword>,
    pub max_retry: Option<u32>,
}

/// Merges request-scoped options over provider defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOptionsResolver {
    defaults: ProviderDefaults,
}

impl RequestOptionsResolver {
    pub fn new(defaults: ProviderDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ProviderDefaults {
        &self.defaults
    }

    /// Request values win; absent values come from the defaults. Neither input is modified.
    pub fn resolve<'a>(&'a self, options: Option<&'a AuthRequestOptions>) -> ResolvedOptions<'a> {
        let scopes = options
            .and_then(AuthRequestOptions::scopes)
            .unwrap_or(&self.defaults.scopes);

        ResolvedOptions {
            scopes: scopes.as_slice(),
            force_refresh: options
                .and_then(AuthRequestOptions::force_refresh)
                .unwrap_or(self.defaults.force_refresh),
            user_account: options
                .and_then(AuthRequestOptions::user_account)
                .or(self.defaults.user_account.as_ref()),
            user_assertion: options.and_then(AuthRequestOptions::user_assertion),
            password: options.and_then(AuthRequestOptions::password),
            max_retry: options.and_then(AuthRequestOptions::max_retry),
        }
    }
}
