use super::errors::AuthError;
use super::identity_client::ClientApplication;
use super::types::{NativeAccountHandle, UserIdentity};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Url;
use serde_json::{Map, Value};

const OBJECT_ID_CLAIMS: [&str; 2] = [
    "oid",
    "http://schemas.microsoft.com/identity/claims/objectidentifier",
];
const TENANT_ID_CLAIMS: [&str; 2] = [
    "tid",
    "http://schemas.microsoft.com/identity/claims/tenantid",
];
const USERNAME_CLAIMS: [&str; 3] = ["preferred_username", "email", "upn"];
const DEFAULT_ENVIRONMENT: &str = "login.microsoftonline.com";

/// Picks the identity-client account a silent acquisition runs against.
pub struct AccountResolver;

impl AccountResolver {
    /// Derives the handle from `user_account` when it names an object and tenant.
    ///
    /// An identity without that key is matched by email against the cached
    /// accounts. Only when no identity is given at all does the first cached
    /// account get used.
    ///
    /// `Ok(None)` means no account is available, which is not an error.
    pub async fn resolve<C>(
        client: &C,
        user_account: Option<&UserIdentity>,
        flow: &'static str,
        scopes: &[String],
    ) -> Result<Option<NativeAccountHandle>, AuthError>
    where
        C: ClientApplication + ?Sized,
    {
        if let Some(identity) = user_account.filter(|identity| has_account_key(identity)) {
            return Ok(Some(NativeAccountHandle::from(identity)));
        }

        let accounts = client
            .list_cached_accounts()
            .await
            .map_err(|e| AuthError::from_client(flow, scopes, e))?;

        if let Some(identity) = user_account {
            let email = identity.email.trim();
            if email.is_empty() {
                return Ok(None);
            }
            return Ok(accounts
                .into_iter()
                .find(|account| account.username().eq_ignore_ascii_case(email)));
        }

        if accounts.len() > 1 {
            log::debug!(
                "{} cached accounts found, using the first one returned by the identity client",
                accounts.len()
            );
        }

        Ok(accounts.into_iter().next())
    }
}

fn has_account_key(identity: &UserIdentity) -> bool {
    !identity.object_id.trim().is_empty() && !identity.tenant_id.trim().is_empty()
}

impl UserIdentity {
    /// Maps the claims of an authenticated principal to a [`UserIdentity`].
    ///
    /// Object id, tenant id and username are required. The environment is taken
    /// from the `iss` host when present.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidClaim`] when a required claim is missing or not a string.
    pub fn from_claims(claims: &Map<String, Value>) -> Result<Self, AuthError> {
        let object_id = required_claim(claims, &OBJECT_ID_CLAIMS)?;
        let tenant_id = required_claim(claims, &TENANT_ID_CLAIMS)?;
        let email = required_claim(claims, &USERNAME_CLAIMS)?;

        let environment = claims
            .get("iss")
            .and_then(Value::as_str)
            .and_then(|issuer| Url::parse(issuer).ok())
            .and_then(|issuer| issuer.host_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Ok(UserIdentity::new(email, object_id, tenant_id, environment))
    }

    /// Reads the claims of an ID token and maps them with [`UserIdentity::from_claims`].
    ///
    /// The signature is not checked; the token must already have been validated
    /// by whoever handed it over.
    pub fn from_id_token(id_token: &str) -> Result<Self, AuthError> {
        let mut segments = id_token.split('.');
        let payload = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(AuthError::invalid_claim(
                    "ID token must have header, payload and signature segments",
                ));
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::invalid_claim(format!("Failed decoding ID token payload: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::invalid_claim(format!("Failed parsing ID token claims: {e}")))?;

        Self::from_claims(&claims)
    }
}

fn required_claim(claims: &Map<String, Value>, names: &[&str]) -> Result<String, AuthError> {
    for name in names {
        match claims.get(*name) {
            Some(Value::String(value)) if !value.trim().is_empty() => return Ok(value.clone()),
            Some(Value::String(_)) | None => continue,
            Some(other) => {
                return Err(AuthError::invalid_claim(format!(
                    "Claim '{name}' must be a string, got {other}"
                )));
            }
        }
    }

    Err(AuthError::invalid_claim(format!(
        "Missing required claim '{}'",
        names[0]
    )))
}
