use super::account::AccountResolver;
use super::authority::Authority;
use super::errors::AuthError;
use super::identity_client::{ClientApplication, IdentityClientError, SilentTokenRequest};
use super::options::ResolvedOptions;
use super::types::AcquisitionResult;
use uuid::Uuid;

/// Looks for a cached token before any flow-specific acquisition runs.
#[derive(Clone, Debug)]
pub struct SilentTokenAcquirer {
    authority: Authority,
}

impl SilentTokenAcquirer {
    pub fn new(authority: Authority) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Authority to pin on silent requests.
    ///
    /// A tenant-specific authority is pinned so the cache lookup cannot resolve to
    /// another tenant; `common`, `organizations` and `consumers` are left to the
    /// identity client.
    pub fn authority_override(&self) -> Option<&str> {
        (!self.authority.is_well_known_tenant()).then(|| self.authority.as_str())
    }

    /// Returns `Ok(None)` on a cache miss or when no account is available.
    ///
    /// # Errors
    ///
    /// Anything the identity client reports other than a cache miss comes back
    /// as [`AuthError::GeneralException`].
    pub async fn acquire<C>(
        &self,
        client: &C,
        options: &ResolvedOptions<'_>,
        flow: &'static str,
        correlation_id: Uuid,
    ) -> Result<Option<AcquisitionResult>, AuthError>
    where
        C: ClientApplication + ?Sized,
    {
        let account =
            AccountResolver::resolve(client, options.user_account, flow, options.scopes).await?;
        let Some(account) = account else {
            log::debug!("[{correlation_id}] No account available for silent acquisition");
            return Ok(None);
        };

        let request = SilentTokenRequest {
            scopes: options.scopes,
            account: &account,
            force_refresh: options.force_refresh,
            authority_override: self.authority_override(),
            correlation_id,
        };

        match client.acquire_token_silent(request).await {
            Ok(result) if result.has_token() => {
                log::debug!(
                    "[{correlation_id}] Silent acquisition succeeded for account {}",
                    account.home_account_id()
                );
                Ok(Some(result))
            }
            Ok(_) | Err(IdentityClientError::NoCachedToken) => {
                log::debug!(
                    "[{correlation_id}] No cached token for account {}",
                    account.home_account_id()
                );
                Ok(None)
            }
            Err(e) => {
                log::warn!("[{correlation_id}] Silent acquisition failed for {flow} flow: {e}");
                Err(AuthError::from_client(flow, options.scopes, e))
            }
        }
    }
}
