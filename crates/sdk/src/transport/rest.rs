//! JSON request/response transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::{QueryParams, Transport, TransportError, build_url, fetch_text, http_client};

/// Transport for endpoints that answer with plain JSON.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    server_url: Url,
    default_params: QueryParams,
}

impl RestClient {
    /// Create a new REST client.
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
            inner: Arc::new(RestClientInner {
                client: http_client(timeout)?,
                server_url,
                default_params,
            }),
        })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.inner.server_url
    }
}

#[async_trait]
impl Transport for RestClient {
    #[instrument(skip(self, params), fields(server = %self.inner.server_url))]
    async fn get(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<serde_json::Value, TransportError> {
        let url = self.make_url(path, params)?;
        let body = fetch_text(&self.inner.client, url).await?;
        debug!(bytes = body.len(), "REST response received");
        Ok(serde_json::from_str(&body)?)
    }

    fn make_url(&self, path: &str, params: &QueryParams) -> Result<Url, TransportError> {
        build_url(
            &self.inner.server_url,
            path,
            &params.merged_over(&self.inner.default_params),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_make_url_merges_default_params() {
        let client = RestClient::new(
            Url::parse("https://login.example.com").unwrap(),
            QueryParams::new().with("client_id", "abc"),
            Duration::from_secs(5),
        )
        .unwrap();

        let url = client
            .make_url("oauth/authorize", &QueryParams::new().with("state", "s1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://login.example.com/oauth/authorize?client_id=abc&state=s1"
        );
    }
}
