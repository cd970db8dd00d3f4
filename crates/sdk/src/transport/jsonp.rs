//! Script-wrapped (JSONP) transport for the legacy identity endpoints.
//!
//! The legacy endpoints answer with `callback({...});` rather than bare JSON.
//! Each request gets a unique callback name, and the wrapper is stripped
//! before parsing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::{QueryParams, Transport, TransportError, build_url, fetch_text, http_client};

const CALLBACK_PREFIX: &str = "__account_sdk_cb_";

/// Transport for endpoints that answer with a JSONP payload.
#[derive(Clone)]
pub struct JsonpClient {
    inner: Arc<JsonpClientInner>,
}

struct JsonpClientInner {
    client: reqwest::Client,
    server_url: Url,
    default_params: QueryParams,
    next_callback: AtomicU64,
}

impl JsonpClient {
    /// Create a new JSONP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        server_url: Url,
        default_params: QueryParams,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            inner: Arc::new(JsonpClientInner {
                client: http_client(timeout)?,
                server_url,
                default_params,
                next_callback: AtomicU64::new(0),
            }),
        })
    }

    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.inner.server_url
    }

    fn callback_name(&self) -> String {
        let n = self.inner.next_callback.fetch_add(1, Ordering::Relaxed);
        format!("{CALLBACK_PREFIX}{n}")
    }
}

#[async_trait]
impl Transport for JsonpClient {
    #[instrument(skip(self, params), fields(server = %self.inner.server_url))]
    async fn get(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<serde_json::Value, TransportError> {
        let callback = self.callback_name();
        let params = params.clone().with("callback", &callback);
        let url = self.make_url(path, &params)?;

        let body = fetch_text(&self.inner.client, url).await?;
        debug!(bytes = body.len(), callback = %callback, "JSONP response received");

        let payload = unwrap_jsonp(&body, &callback)?;
        Ok(serde_json::from_str(payload)?)
    }

    fn make_url(&self, path: &str, params: &QueryParams) -> Result<Url, TransportError> {
        build_url(
            &self.inner.server_url,
            path,
            &params.merged_over(&self.inner.default_params),
        )
    }
}

/// Extract the JSON argument from a `callback(...)` script body.
///
/// Bodies that are already bare JSON objects are passed through unchanged.
fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Result<&'a str, TransportError> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    let opener = format!("{callback}(");
    let start = trimmed
        .find(&opener)
        .map(|i| i + opener.len())
        .ok_or(TransportError::MalformedJsonp)?;
    let end = trimmed.rfind(')').ok_or(TransportError::MalformedJsonp)?;

    trimmed
        .get(start..end)
        .map(str::trim)
        .filter(|inner| !inner.is_empty())
        .ok_or(TransportError::MalformedJsonp)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_plain_callback() {
        let body = r#"cb_1({"result":true,"userId":5});"#;
        assert_eq!(
            unwrap_jsonp(body, "cb_1").unwrap(),
            r#"{"result":true,"userId":5}"#
        );
    }

    #[test]
    fn test_unwrap_guarded_callback() {
        let body = "/**/ typeof cb_2 === 'function' && cb_2({\"a\":1});\n";
        assert_eq!(unwrap_jsonp(body, "cb_2").unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_bare_json_passes_through() {
        assert_eq!(unwrap_jsonp(" {\"a\":1} ", "cb").unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_missing_wrapper_is_malformed() {
        assert!(matches!(
            unwrap_jsonp("alert(1)", "cb_3"),
            Err(TransportError::MalformedJsonp)
        ));
        assert!(matches!(
            unwrap_jsonp("cb_3()", "cb_3"),
            Err(TransportError::MalformedJsonp)
        ));
    }

    #[test]
    fn test_callback_names_are_unique() {
        let client = JsonpClient::new(
            Url::parse("https://login.example.com").unwrap(),
            QueryParams::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_ne!(client.callback_name(), client.callback_name());
    }
}
