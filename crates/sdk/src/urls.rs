//! Login, logout and account page URLs.
//!
//! Nothing here performs I/O. URLs are composed from the configured
//! transports' base URLs and default parameters plus per-call overrides.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use url::Url;

use crate::environment::parse_http_url;
use crate::error::{Result, SdkError};
use crate::transport::{QueryParams, Transport};

/// Scope requested when the caller gives none.
pub const DEFAULT_SCOPE: &str = "openid";

/// Authentication context class requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcrValues {
    /// Regular password login.
    #[default]
    Default,
    OtpEmail,
    OtpSms,
}

impl AcrValues {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::OtpEmail => "otp-email",
            Self::OtpSms => "otp-sms",
        }
    }
}

impl fmt::Display for AcrValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcrValues {
    type Err = SdkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Default),
            "otp-email" => Ok(Self::OtpEmail),
            "otp-sms" => Ok(Self::OtpSms),
            other => Err(SdkError::InvalidArgument(format!(
                "acr_values must be one of '', 'otp-email', 'otp-sms' (got '{other}')"
            ))),
        }
    }
}

/// Parameters of a login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Opaque value echoed back to the redirect URI. Must be non-empty.
    pub state: String,
    /// Raw `acr_values`; validated when the URL is built.
    pub acr_values: String,
    pub scope: String,
    /// Overrides the configured redirect URI.
    pub redirect_uri: Option<String>,
    /// Use the OAuth authorize endpoint instead of the legacy login flow.
    pub new_flow: bool,
    pub login_hint: String,
    /// Open the login page in a popup when the host allows it.
    pub prefer_popup: bool,
}

impl LoginOptions {
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            acr_values: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
            redirect_uri: None,
            new_flow: true,
            login_hint: String::new(),
            prefer_popup: false,
        }
    }

    #[must_use]
    pub fn with_acr_values(mut self, acr_values: impl Into<String>) -> Self {
        self.acr_values = acr_values.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub const fn legacy(mut self) -> Self {
        self.new_flow = false;
        self
    }

    #[must_use]
    pub fn with_login_hint(mut self, login_hint: impl Into<String>) -> Self {
        self.login_hint = login_hint.into();
        self
    }

    #[must_use]
    pub const fn in_popup(mut self) -> Self {
        self.prefer_popup = true;
        self
    }
}

/// Builds provider URLs.
#[derive(Clone)]
pub struct UrlBuilder {
    /// Legacy identity service (flows and account pages).
    identity: Arc<dyn Transport>,
    /// OAuth endpoints on the identity service.
    oauth: Arc<dyn Transport>,
    redirect_uri: Url,
}

impl UrlBuilder {
    #[must_use]
    pub fn new(identity: Arc<dyn Transport>, oauth: Arc<dyn Transport>, redirect_uri: Url) -> Self {
        Self {
            identity,
            oauth,
            redirect_uri,
        }
    }

    #[must_use]
    pub const fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// URL of the login page.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty `state`, an unknown
    /// `acr_values` or a redirect URI that is not an http(s) URL, and
    /// `SdkError::UrlBuild` if the service base URL cannot take a path.
    pub fn login_url(&self, options: &LoginOptions) -> Result<Url> {
        let acr_values: AcrValues = options.acr_values.parse()?;
        require_state(&options.state)?;
        let redirect_uri = self.resolve_redirect(options.redirect_uri.as_deref())?;
        let scope = if options.scope.is_empty() {
            DEFAULT_SCOPE
        } else {
            options.scope.as_str()
        };

        let params = QueryParams::new()
            .with("response_type", "code")
            .with("redirect_uri", redirect_uri)
            .with("scope", scope)
            .with("state", &options.state);

        if options.new_flow {
            let params = params
                .with("acr_values", acr_values)
                .with("login_hint", &options.login_hint)
                .with("new-flow", true);
            build(&*self.oauth, "oauth/authorize", &params)
        } else {
            build(&*self.identity, "flow/login", &params)
        }
    }

    /// URL that ends the session and returns to `redirect_uri`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn logout_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.page_url("logout", redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn account_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.page_url("account/summary", redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn phones_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.page_url("account/phones", redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn subscriptions_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.page_url("account/subscriptions", redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn products_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.page_url("account/products", redirect_uri)
    }

    /// Generic authentication flow, letting the provider pick login or signup.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty `state` or a malformed
    /// redirect URI.
    pub fn auth_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.flow_url("auth", state, redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty `state` or a malformed
    /// redirect URI.
    pub fn signup_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.flow_url("signup", state, redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty `state` or a malformed
    /// redirect URI.
    pub fn signin_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.flow_url("signin", state, redirect_uri)
    }

    fn flow_url(&self, flow: &str, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        require_state(state)?;
        let redirect_uri = self.resolve_redirect(redirect_uri)?;
        let params = QueryParams::new()
            .with("response_type", "code")
            .with("redirect_uri", redirect_uri)
            .with("state", state);
        build(&*self.identity, &format!("flow/{flow}"), &params)
    }

    fn page_url(&self, path: &str, redirect_uri: Option<&str>) -> Result<Url> {
        let redirect_uri = self.resolve_redirect(redirect_uri)?;
        let params = QueryParams::new().with("redirect_uri", redirect_uri);
        build(&*self.identity, path, &params)
    }

    fn resolve_redirect(&self, redirect_uri: Option<&str>) -> Result<Url> {
        match redirect_uri {
            Some(uri) => parse_http_url(uri),
            None => Ok(self.redirect_uri.clone()),
        }
    }
}

fn require_state(state: &str) -> Result<()> {
    if state.trim().is_empty() {
        return Err(SdkError::InvalidArgument(
            "'state' must be a non-empty string".to_string(),
        ));
    }
    Ok(())
}

fn build(transport: &dyn Transport, path: &str, params: &QueryParams) -> Result<Url> {
    transport
        .make_url(path, params)
        .map_err(SdkError::UrlBuild)
}
