use super::errors::AuthError;
use reqwest::Url;
use std::fmt;

/// Tenant path segments that name a multi-tenant audience instead of one tenant.
pub const WELL_KNOWN_TENANTS: [&str; 3] = ["common", "organizations", "consumers"];

/// Parsed identity-provider authority, e.g. `https://login.microsoftonline.com/{tenant}/`.
///
/// Parsing happens when a provider is built, so a malformed authority is a
/// construction-time [`AuthError::InvalidRequest`] and never a runtime one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authority {
    url: Url,
    tenant: String,
}

impl Authority {
    pub fn parse(authority: &str) -> Result<Self, AuthError> {
        let url = Url::parse(authority.trim()).map_err(|e| {
            AuthError::invalid_request(format!("Malformed authority URL '{authority}': {e}"))
        })?;

        if url.scheme() != "https" {
            return Err(AuthError::invalid_request(format!(
                "Authority URL '{authority}' must use https"
            )));
        }

        let tenant = tenant_segment(&url).ok_or_else(|| {
            AuthError::invalid_request(format!(
                "Authority URL '{authority}' has no tenant path segment"
            ))
        })?;

        Ok(Self { url, tenant })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// `true` for `common`, `organizations` and `consumers` authorities.
    pub fn is_well_known_tenant(&self) -> bool {
        is_well_known_tenant_segment(&self.url)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Checks whether the tenant segment of `authority` is a multi-tenant alias.
///
/// The comparison ignores ASCII case. An authority without a tenant segment is
/// not well-known.
pub fn is_well_known_tenant_segment(authority: &Url) -> bool {
    tenant_segment(authority)
        .map(|tenant| {
            WELL_KNOWN_TENANTS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&tenant))
        })
        .unwrap_or(false)
}

fn tenant_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}
