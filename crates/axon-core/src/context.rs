use secrecy::SecretString;

/// Runtime context for a single gateway request
///
/// Built by the server middleware and threaded through the response loop
/// down to the upstream provider, which may forward the caller's key.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Bearer key presented by the caller, if any
    pub api_key: Option<SecretString>,
}

impl RequestContext {
    /// Create a minimal context for embedded (non-HTTP) use
    pub fn empty() -> Self {
        let (parts, ()) = http::Request::new(()).into_parts();

        Self { parts, api_key: None }
    }

    /// Build a context from request parts, extracting a bearer key
    pub fn from_parts(parts: http::request::Parts) -> Self {
        let api_key = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_owned()));

        Self { parts, api_key }
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }
}
