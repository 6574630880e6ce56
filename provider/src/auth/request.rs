use super::errors::AuthError;
use super::options::AuthRequestOptions;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Outgoing request the provider can authenticate.
///
/// Exposes the request's option slot (if it has one) and its header map.
pub trait RequestContext: Send {
    /// Options attached to this request, `None` means "use provider defaults".
    fn auth_options(&self) -> Option<&AuthRequestOptions>;

    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl<B: Send> RequestContext for http::Request<B> {
    fn auth_options(&self) -> Option<&AuthRequestOptions> {
        self.extensions().get::<AuthRequestOptions>()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        http::Request::headers_mut(self)
    }
}

// reqwest requests carry no extension slot, so provider defaults always apply.
impl RequestContext for reqwest::Request {
    fn auth_options(&self) -> Option<&AuthRequestOptions> {
        None
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        reqwest::Request::headers_mut(self)
    }
}

/// Attaches [`AuthRequestOptions`] to an `http::Request`.
pub trait RequestOptionsExt {
    /// Replaces any options previously attached.
    fn set_auth_options(&mut self, options: AuthRequestOptions);

    fn with_auth_options(self, options: AuthRequestOptions) -> Self;
}

impl<B> RequestOptionsExt for http::Request<B> {
    fn set_auth_options(&mut self, options: AuthRequestOptions) {
        self.extensions_mut().insert(options);
    }

    fn with_auth_options(mut self, options: AuthRequestOptions) -> Self {
        self.set_auth_options(options);
        self
    }
}

/// Builds the `Bearer <token>` header value, marked sensitive.
pub(crate) fn bearer_header(access_token: &str) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|e| AuthError::general("Access token is not a valid header value", e))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Replaces the `Authorization` header. Callers build the value first so a
/// failure never leaves the request half-updated.
pub(crate) fn write_authorization(headers: &mut HeaderMap, value: HeaderValue) {
    headers.insert(AUTHORIZATION, value);
}
