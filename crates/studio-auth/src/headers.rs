//! Default headers attached to every backend request.

use parking_lot::RwLock;
use std::sync::Arc;

/// Header carrying the console origin.
pub const DOMAIN_HEADER: &str = "X-Domain";

/// Header carrying the current `id_token`.
pub const TOKEN_HEADER: &str = "Token";

#[derive(Debug, Default)]
struct HeaderState {
    domain: String,
    token: Option<String>,
}

/// Shared, mutable default headers.
///
/// Clones share state: a refresh that installs a new token is seen by every
/// client holding a clone.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    inner: Arc<RwLock<HeaderState>>,
}

impl DefaultHeaders {
    pub fn new(origin: &str) -> Self {
        let headers = Self::default();
        headers.set_origin(origin);
        headers
    }

    /// Set `X-Domain`. An empty origin falls back to the local dev origin.
    pub fn set_origin(&self, origin: &str) {
        let origin = origin.trim().trim_end_matches('/');
        let domain = if origin.is_empty() {
            studio_config_and_utils::DEFAULT_SITE_ORIGIN
        } else {
            origin
        };
        self.inner.write().domain = domain.to_string();
    }

    pub fn set_token(&self, id_token: &str) {
        self.inner.write().token = Some(id_token.to_string());
    }

    pub fn clear_token(&self) {
        self.inner.write().token = None;
    }

    pub fn domain(&self) -> String {
        self.inner.read().domain.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    /// Attach the current headers to `request`.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let state = self.inner.read();
        let request = request.header(DOMAIN_HEADER, state.domain.as_str());
        match &state.token {
            Some(token) => request.header(TOKEN_HEADER, token.as_str()),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_normalized() {
        let headers = DefaultHeaders::new("https://studio.example.com/");
        assert_eq!(headers.domain(), "https://studio.example.com");
        assert!(headers.token().is_none());
    }

    #[test]
    fn test_empty_origin_falls_back() {
        let headers = DefaultHeaders::new("  ");
        assert_eq!(headers.domain(), "http://localhost:3000");
    }

    #[test]
    fn test_clones_share_token() {
        let headers = DefaultHeaders::new("http://localhost:3000");
        let shared = headers.clone();

        headers.set_token("id-1");
        assert_eq!(shared.token().as_deref(), Some("id-1"));

        shared.clear_token();
        assert!(headers.token().is_none());
    }

    #[test]
    fn test_apply_sets_both_headers() {
        let headers = DefaultHeaders::new("http://localhost:3000");
        headers.set_token("id-1");

        let request = headers
            .apply(reqwest::Client::new().get("http://localhost/checkUsr"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[DOMAIN_HEADER], "http://localhost:3000");
        assert_eq!(request.headers()[TOKEN_HEADER], "id-1");
    }
}
