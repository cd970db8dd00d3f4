//! SDK configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ACCOUNT_CLIENT_ID` - OAuth client ID of this site
//! - `ACCOUNT_REDIRECT_URI` - Where the provider sends the browser back to
//!
//! ## Optional
//! - `ACCOUNT_ENV` - `DEV`, `PRE`, `PRO` or a literal URL (default: PRE)
//! - `ACCOUNT_SESSION_DOMAIN` - Base URL of the entitlement service; `hasAccess`
//!   is unavailable without it
//! - `ACCOUNT_SESSION_CACHING` - Cache session lookups (default: true)
//! - `ACCOUNT_SESSION_COOKIE` - Write the `SP_ID` cookie (default: false)
//! - `ACCOUNT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `ACCOUNT_DOCUMENT_DOMAIN` - Domain of the hosting page (default: host of
//!   the redirect URI)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::environment::{ServiceUrls, parse_http_url};
use crate::error::SdkError;
use crate::transport::{
    DEFAULT_TIMEOUT, JsonpClient, QueryParams, RestClient, Transport, TransportError,
};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration shared by `Identity` and `Monetization`.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    pub client_id: String,
    pub redirect_uri: Url,
    /// Environment key or URL the service URLs were resolved from.
    pub env: String,
    pub services: ServiceUrls,
    /// Entitlement service base URL.
    pub session_domain: Option<Url>,
    pub session_caching: bool,
    pub session_cookie: bool,
    pub request_timeout: Duration,
    pub document_domain: String,
}

/// Transports built from an [`SdkConfig`].
#[derive(Clone)]
pub struct Transports {
    /// Session service (REST).
    pub session: Arc<dyn Transport>,
    /// Legacy identity service (JSONP).
    pub identity: Arc<dyn Transport>,
    /// OAuth endpoints on the identity service (REST).
    pub oauth: Arc<dyn Transport>,
    /// Entitlement service (REST), when a session domain is configured.
    pub entitlements: Option<Arc<dyn Transport>>,
}

impl SdkConfig {
    /// Configuration for the default environment.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty client ID or a redirect
    /// URI that is not an absolute http(s) URL.
    pub fn new(client_id: impl Into<String>, redirect_uri: &str) -> Result<Self, SdkError> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(SdkError::InvalidArgument(
                "'clientId' must be a non-empty string".to_string(),
            ));
        }
        let redirect_uri = parse_http_url(redirect_uri)?;
        let document_domain = redirect_uri.host_str().unwrap_or_default().to_string();
        let env = crate::environment::Environment::default();

        Ok(Self {
            client_id,
            redirect_uri,
            env: env.to_string(),
            services: ServiceUrls::for_environment(env)?,
            session_domain: None,
            session_caching: true,
            session_cookie: false,
            request_timeout: DEFAULT_TIMEOUT,
            document_domain,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let client_id = required("ACCOUNT_CLIENT_ID")?;
        let redirect_uri = required("ACCOUNT_REDIRECT_URI")?;
        let mut config =
            Self::new(client_id, &redirect_uri).map_err(invalid("ACCOUNT_REDIRECT_URI"))?;

        if let Some(env) = lookup("ACCOUNT_ENV") {
            config = config.with_env(&env).map_err(invalid("ACCOUNT_ENV"))?;
        }
        if let Some(domain) = lookup("ACCOUNT_SESSION_DOMAIN").filter(|v| !v.is_empty()) {
            config = config
                .with_session_domain(&domain)
                .map_err(invalid("ACCOUNT_SESSION_DOMAIN"))?;
        }
        if let Some(raw) = lookup("ACCOUNT_SESSION_CACHING") {
            config.session_caching = parse_bool("ACCOUNT_SESSION_CACHING", &raw)?;
        }
        if let Some(raw) = lookup("ACCOUNT_SESSION_COOKIE") {
            config.session_cookie = parse_bool("ACCOUNT_SESSION_COOKIE", &raw)?;
        }
        if let Some(raw) = lookup("ACCOUNT_REQUEST_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("ACCOUNT_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(domain) = lookup("ACCOUNT_DOCUMENT_DOMAIN").filter(|v| !v.is_empty()) {
            config.document_domain = domain;
        }

        Ok(config)
    }

    /// Point at another environment key or URL.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for unknown keys or bad URLs.
    pub fn with_env(mut self, env_or_url: &str) -> Result<Self, SdkError> {
        self.services = ServiceUrls::resolve(env_or_url)?;
        self.env = env_or_url.to_string();
        Ok(self)
    }

    /// Enable entitlement checks against `url`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` if `url` is not an http(s) URL.
    pub fn with_session_domain(mut self, url: &str) -> Result<Self, SdkError> {
        self.session_domain = Some(parse_http_url(url)?);
        Ok(self)
    }

    #[must_use]
    pub const fn with_session_caching(mut self, enabled: bool) -> Self {
        self.session_caching = enabled;
        self
    }

    #[must_use]
    pub const fn with_session_cookie(mut self, enabled: bool) -> Self {
        self.session_cookie = enabled;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_document_domain(mut self, domain: impl Into<String>) -> Self {
        self.document_domain = domain.into();
        self
    }

    /// Parameters merged into every backend request.
    #[must_use]
    pub fn default_params(&self) -> QueryParams {
        QueryParams::new()
            .with("client_id", &self.client_id)
            .with("redirect_uri", &self.redirect_uri)
    }

    /// Build HTTP transports for every configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn transports(&self) -> Result<Transports, TransportError> {
        let defaults = self.default_params();
        let timeout = self.request_timeout;

        let entitlements = match &self.session_domain {
            Some(url) => Some(Arc::new(RestClient::new(url.clone(), defaults.clone(), timeout)?)
                as Arc<dyn Transport>),
            None => None,
        };

        Ok(Transports {
            session: Arc::new(RestClient::new(
                self.services.session.clone(),
                defaults.clone(),
                timeout,
            )?),
            identity: Arc::new(JsonpClient::new(
                self.services.identity.clone(),
                defaults.clone(),
                timeout,
            )?),
            oauth: Arc::new(RestClient::new(
                self.services.identity.clone(),
                QueryParams::new().with("client_id", &self.client_id),
                timeout,
            )?),
            entitlements,
        })
    }
}

fn invalid(key: &'static str) -> impl Fn(SdkError) -> ConfigError {
    move |e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("ACCOUNT_CLIENT_ID", "client-1"),
        ("ACCOUNT_REDIRECT_URI", "https://news.example.com/callback"),
    ];

    #[test]
    fn test_defaults() {
        let config = SdkConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.env, "PRE");
        assert!(config.session_caching);
        assert!(!config.session_cookie);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.document_domain, "news.example.com");
        assert!(config.session_domain.is_none());
    }

    #[test]
    fn test_missing_client_id() {
        let err = SdkConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ACCOUNT_CLIENT_ID"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("ACCOUNT_ENV", "pro"),
            ("ACCOUNT_SESSION_DOMAIN", "https://id.news.example.com"),
            ("ACCOUNT_SESSION_CACHING", "false"),
            ("ACCOUNT_SESSION_COOKIE", "1"),
            ("ACCOUNT_REQUEST_TIMEOUT_SECS", "5"),
            ("ACCOUNT_DOCUMENT_DOMAIN", "example.com"),
        ]);
        let config = SdkConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.services.identity.as_str(), "https://login.schibsted.com/");
        assert_eq!(
            config.session_domain.as_ref().map(Url::as_str),
            Some("https://id.news.example.com/")
        );
        assert!(!config.session_caching);
        assert!(config.session_cookie);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.document_domain, "example.com");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("ACCOUNT_ENV", "STAGING"));
        let err = SdkConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "ACCOUNT_ENV"));

        let mut vars = REQUIRED.to_vec();
        vars.push(("ACCOUNT_SESSION_CACHING", "maybe"));
        assert!(SdkConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(SdkConfig::new("", "https://example.com").is_err());
        assert!(SdkConfig::new("client", "example.com/callback").is_err());
    }

    #[test]
    fn test_default_params_carry_client_and_redirect() {
        let config = SdkConfig::new("client-1", "https://example.com/cb").unwrap();
        let params = config.default_params();
        assert_eq!(params.get("client_id"), Some("client-1"));
        assert_eq!(params.get("redirect_uri"), Some("https://example.com/cb"));
    }
}
