//! Session records returned by the session service.
//!
//! A [`Session`] is always replaced wholesale, never patched. Fields the SDK
//! does not model are kept in [`Session::extra`] so a cached or copied session
//! round-trips without loss.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::id::UserId;
use super::status::UserStatus;

/// The visitor's authentication state as reported by the session service.
///
/// "Logged in" (`user_id` present) and "connected" (`result == true`) are
/// independent: a logged-in user may not have authorized this client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Whether the user is connected to this client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// Numeric user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Globally unique user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Connection status of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_status: Option<UserStatus>,
    /// Domain the session cookie should be scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
    /// Opaque session token propagated through the `SP_ID` cookie.
    #[serde(rename = "sp_id", default, skip_serializing_if = "Option::is_none")]
    pub sp_id: Option<String>,
    /// Seconds until the session must be re-checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Server clock at the time of the response (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<i64>,
    /// Signed payload for server-side verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_agreement_accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agreement_accepted: Option<bool>,
    /// Error payload; present when the backend refused the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BackendError>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// True when a user id is present.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// True when the user has authorized this client.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.result == Some(true)
    }

    /// True when the response carried a `result` field at all.
    #[must_use]
    pub const fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Seconds the session may be cached for; `None` when absent or not positive.
    #[must_use]
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
            .and_then(|secs| u64::try_from(secs).ok())
            .filter(|secs| *secs > 0)
    }

    /// True when the backend reported a `LoginException`.
    #[must_use]
    pub fn is_login_exception(&self) -> bool {
        self.error.as_ref().is_some_and(BackendError::is_login_exception)
    }
}

/// Error payload embedded in a session-service response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}{}", format_description(.description.as_deref()))]
pub struct BackendError {
    /// HTTP-like status code, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Structured error type.
    #[serde(rename = "type", default)]
    pub kind: BackendErrorKind,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackendError {
    #[must_use]
    pub fn is_login_exception(&self) -> bool {
        self.kind == BackendErrorKind::LoginException
    }
}

fn format_description(description: Option<&str>) -> String {
    description.map(|d| format!(": {d}")).unwrap_or_default()
}

/// Error type reported by the session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackendErrorKind {
    /// The primary session service could not resolve the login; the legacy
    /// identity service should be asked instead.
    LoginException,
    /// Any other error type.
    Other(String),
}

impl Default for BackendErrorKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for BackendErrorKind {
    fn from(value: String) -> Self {
        if value == "LoginException" {
            Self::LoginException
        } else {
            Self::Other(value)
        }
    }
}

impl From<BackendErrorKind> for String {
    fn from(kind: BackendErrorKind) -> Self {
        match kind {
            BackendErrorKind::LoginException => "LoginException".to_string(),
            BackendErrorKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoginException => f.write_str("LoginException"),
            Self::Other(s) if s.is_empty() => f.write_str("UnknownError"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connected_session_parses_wire_names() {
        let session: Session = serde_json::from_value(json!({
            "result": true,
            "userId": 5,
            "uuid": "1a2b3c4d-0000-4000-8000-000000000001",
            "userStatus": "connected",
            "baseDomain": "example.com",
            "sp_id": "abc",
            "expiresIn": 300,
            "serverTime": 1_700_000_000,
            "displayName": "Jo",
            "clientAgreementAccepted": true
        }))
        .unwrap();

        assert!(session.is_connected());
        assert!(session.is_logged_in());
        assert_eq!(session.user_id, Some(UserId::new(5)));
        assert_eq!(session.user_status, Some(UserStatus::Connected));
        assert_eq!(session.sp_id.as_deref(), Some("abc"));
        assert_eq!(session.expires_in(), Some(300));
        assert_eq!(session.client_agreement_accepted, Some(true));
    }

    #[test]
    fn test_logged_in_is_independent_of_connected() {
        let session: Session =
            serde_json::from_value(json!({ "result": false, "userId": 7 })).unwrap();
        assert!(session.is_logged_in());
        assert!(!session.is_connected());
        assert!(session.has_result());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = json!({ "result": true, "userId": 1, "pairId": "xyz" });
        let session: Session = serde_json::from_value(raw).unwrap();
        assert_eq!(session.extra.get("pairId"), Some(&json!("xyz")));

        let back = serde_json::to_value(&session).unwrap();
        assert_eq!(back["pairId"], json!("xyz"));
        assert_eq!(back["userId"], json!(1));
    }

    #[test]
    fn test_login_exception_is_structured() {
        let session: Session = serde_json::from_value(json!({
            "error": { "code": 401, "type": "LoginException", "description": "no session" }
        }))
        .unwrap();
        assert!(session.is_login_exception());
        assert_eq!(
            session.error.unwrap().to_string(),
            "LoginException: no session"
        );
    }

    #[test]
    fn test_other_error_kind_is_not_login_exception() {
        let session: Session = serde_json::from_value(json!({
            "error": { "type": "ApiException" }
        }))
        .unwrap();
        assert!(!session.is_login_exception());
    }

    #[test]
    fn test_non_positive_expires_in_is_ignored() {
        let session = Session {
            expires_in: Some(0),
            ..Session::default()
        };
        assert_eq!(session.expires_in(), None);
    }
}
