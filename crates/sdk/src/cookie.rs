//! The `SP_ID` session-tracking cookie.
//!
//! [`SessionCookie::from_session`] is the only place cookie fields are
//! validated. Missing or unusable values fall back to the current document's
//! domain and an already-expired date.

use chrono::{DateTime, TimeDelta, Utc};

use account_sdk_core::Session;

/// Cookie name used for session propagation.
pub const SESSION_COOKIE_NAME: &str = "SP_ID";

/// A fully-formed cookie ready to hand to a [`CookieJar`](crate::platform::CookieJar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    /// Always starts with a dot so subdomains receive the cookie.
    pub domain: String,
    pub path: &'static str,
    pub expires: DateTime<Utc>,
}

impl SessionCookie {
    /// Build the cookie for `session`.
    ///
    /// The cookie expires `expiresIn` seconds after `now`, or at the epoch
    /// when the session carries no usable token or expiry.
    #[must_use]
    pub fn from_session(session: &Session, document_domain: &str, now: DateTime<Utc>) -> Self {
        let base_domain = session
            .base_domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(document_domain);

        let value = session.sp_id.clone().unwrap_or_default();
        let expires = session
            .expires_in()
            .filter(|_| !value.is_empty())
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            name: SESSION_COOKIE_NAME,
            value,
            domain: dotted(base_domain),
            path: "/",
            expires,
        }
    }

    /// A cookie that clears `SP_ID` on `domain`.
    #[must_use]
    pub fn expired(domain: &str) -> Self {
        Self {
            name: SESSION_COOKIE_NAME,
            value: String::new(),
            domain: dotted(domain),
            path: "/",
            expires: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Whether the cookie is already expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Render as a `document.cookie` / `Set-Cookie` style string.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        format!(
            "{}={}; expires={}; path={}; domain={}",
            self.name,
            urlencoding::encode(&self.value),
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.path,
            self.domain
        )
    }
}

fn dotted(domain: &str) -> String {
    let domain = domain.trim().trim_start_matches('.');
    format!(".{domain}")
}
