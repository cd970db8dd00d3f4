//! Transport clients for the identity provider's services.
//!
//! Two flavours share one contract:
//! - [`RestClient`] - plain JSON request/response, used for the session
//!   service, the OAuth endpoints and the entitlement service
//! - [`JsonpClient`] - script-wrapped responses (`callback({...})`), used for
//!   the legacy identity service endpoints
//!
//! Both merge their `default_params` into every call, and both are bounded by
//! the request timeout given at construction.

mod jsonp;
mod rest;

pub use jsonp::JsonpClient;
pub use rest::RestClient;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while talking to a backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A JSONP body did not contain the expected callback wrapper.
    #[error("malformed JSONP response")]
    MalformedJsonp,

    /// The request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A backend the SDK can query.
///
/// Implementations must merge their default parameters under the per-call
/// parameters, with per-call values winning.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request and return the parsed JSON body.
    async fn get(&self, path: &str, params: &QueryParams)
    -> Result<serde_json::Value, TransportError>;

    /// Build the absolute URL for `path` without performing a request.
    fn make_url(&self, path: &str, params: &QueryParams) -> Result<Url, TransportError>;
}

/// Ordered query parameters.
///
/// Setting a key that already exists replaces its value in place. Empty
/// values are kept in the list but never rendered into a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `defaults` overridden by `self`.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut merged = defaults.clone();
        for (key, value) in &self.0 {
            merged.set(key.clone(), value);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Join `path` onto `base` and append the non-empty `params`.
///
/// The base URL's own path is kept, so a base of `https://host/api` and a
/// path of `rpc/hasSession.js` yields `https://host/api/rpc/hasSession.js`.
pub(crate) fn build_url(base: &Url, path: &str, params: &QueryParams) -> Result<Url, TransportError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    let mut url = base.join(path.trim_start_matches('/'))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
            pairs.append_pair(key, value);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

/// Build the shared HTTP client.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .cookie_store(true)
        .user_agent(concat!("account-sdk/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Send a GET and return the body text, mapping non-success statuses.
pub(crate) async fn fetch_text(client: &reqwest::Client, url: Url) -> Result<String, TransportError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = %status,
            body = %body.chars().take(200).collect::<String>(),
            "Backend returned non-success status"
        );
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    Ok(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_existing_key() {
        let params = QueryParams::new().with("a", 1).with("b", 2).with("a", 3);
        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn test_call_params_override_defaults() {
        let defaults = QueryParams::new()
            .with("client_id", "abc")
            .with("redirect_uri", "https://site.example/cb");
        let call = QueryParams::new().with("redirect_uri", "https://other.example/");
        let merged = call.merged_over(&defaults);

        assert_eq!(merged.get("client_id"), Some("abc"));
        assert_eq!(merged.get("redirect_uri"), Some("https://other.example/"));
    }

    #[test]
    fn test_build_url_keeps_base_path_and_skips_empty_values() {
        let base = Url::parse("https://id.example.com/api").unwrap();
        let params = QueryParams::new().with("autologin", 1).with("login_hint", "");
        let url = build_url(&base, "/rpc/hasSession.js", &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://id.example.com/api/rpc/hasSession.js?autologin=1"
        );
    }

    #[test]
    fn test_build_url_without_params_has_no_query() {
        let base = Url::parse("https://id.example.com").unwrap();
        let url = build_url(&base, "account/summary", &QueryParams::new()).unwrap();
        assert_eq!(url.as_str(), "https://id.example.com/account/summary");
    }

    #[test]
    fn test_build_url_encodes_values() {
        let base = Url::parse("https://id.example.com").unwrap();
        let params = QueryParams::new().with("redirect_uri", "https://site.example/cb?x=1");
        let url = build_url(&base, "logout", &params).unwrap();
        assert!(url.as_str().contains("redirect_uri=https%3A%2F%2Fsite.example%2Fcb%3Fx%3D1"));
    }
}
