//! Deployment environments and their service endpoints.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::SdkError;

/// A named deployment of the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    Dev,
    #[default]
    Pre,
    Pro,
}

impl Environment {
    /// Base URL of the identity service (legacy endpoints and OAuth).
    #[must_use]
    pub const fn identity_url(self) -> &'static str {
        match self {
            Self::Dev => "https://identity-dev.schibsted.com",
            Self::Pre => "https://identity-pre.schibsted.com",
            Self::Pro => "https://login.schibsted.com",
        }
    }

    /// Base URL of the session service.
    #[must_use]
    pub const fn session_url(self) -> &'static str {
        match self {
            Self::Dev => "https://session.sdk-dev.schibsted.com",
            Self::Pre => "https://session.identity-pre.schibsted.com",
            Self::Pro => "https://session.schibsted.com",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Pre => "PRE",
            Self::Pro => "PRO",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEV" => Ok(Self::Dev),
            "PRE" => Ok(Self::Pre),
            "PRO" => Ok(Self::Pro),
            _ => Err(SdkError::InvalidArgument(format!(
                "unknown environment: {s} (expected DEV, PRE, PRO or a URL)"
            ))),
        }
    }
}

/// Concrete endpoints for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    /// Identity service: legacy JSONP endpoints, OAuth and account pages.
    pub identity: Url,
    /// Session service: primary `hasSession` and logout.
    pub session: Url,
}

impl ServiceUrls {
    /// Resolve an environment key (`DEV`, `PRE`, `PRO`) or a literal URL.
    ///
    /// A literal URL is used for both services, which is how local and
    /// staging deployments are addressed.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for unknown keys and for URLs that
    /// are not absolute http(s) URLs.
    pub fn resolve(env_or_url: &str) -> Result<Self, SdkError> {
        if env_or_url.contains("://") {
            let url = parse_http_url(env_or_url)?;
            return Ok(Self {
                identity: url.clone(),
                session: url,
            });
        }

        Self::for_environment(env_or_url.parse()?)
    }

    /// Endpoints of a named environment.
    ///
    /// # Errors
    ///
    /// Only fails if a built-in URL is malformed.
    pub fn for_environment(env: Environment) -> Result<Self, SdkError> {
        Ok(Self {
            identity: parse_http_url(env.identity_url())?,
            session: parse_http_url(env.session_url())?,
        })
    }
}

/// Parse an absolute http(s) URL.
///
/// # Errors
///
/// Returns `SdkError::InvalidArgument` if the value does not parse or uses
/// another scheme.
pub fn parse_http_url(value: &str) -> Result<Url, SdkError> {
    let url = Url::parse(value)
        .map_err(|e| SdkError::InvalidArgument(format!("invalid URL {value}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SdkError::InvalidArgument(format!(
            "URL must be an absolute http(s) URL: {value}"
        )));
    }
    Ok(url)
}
