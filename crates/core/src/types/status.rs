//! Status values reported by the session service.

use serde::{Deserialize, Serialize};

/// The visitor's status as reported in `userStatus`.
///
/// Unknown values are preserved verbatim so that a change between two
/// unrecognised statuses is still observable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserStatus {
    /// Logged in and connected to this client.
    Connected,
    /// Logged in, but has not authorized this client.
    NotConnected,
    /// Logged in; connection state not reported.
    LoggedIn,
    /// Account exists but the email is not verified.
    Unverified,
    /// Any other value sent by the backend.
    Other(String),
}

impl UserStatus {
    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::NotConnected => "notConnected",
            Self::LoggedIn => "loggedIn",
            Self::Unverified => "unverified",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for UserStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "connected" => Self::Connected,
            "notConnected" => Self::NotConnected,
            "loggedIn" => Self::LoggedIn,
            "unverified" => Self::Unverified,
            _ => Self::Other(value),
        }
    }
}

impl From<UserStatus> for String {
    fn from(status: UserStatus) -> Self {
        match status {
            UserStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status_parses() {
        let status: UserStatus = serde_json::from_str("\"notConnected\"").unwrap();
        assert_eq!(status, UserStatus::NotConnected);
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status = UserStatus::from("pendingMerge".to_string());
        assert_eq!(status, UserStatus::Other("pendingMerge".to_string()));
        assert_eq!(String::from(status), "pendingMerge");
    }

    #[test]
    fn test_display_uses_wire_name() {
        assert_eq!(UserStatus::Connected.to_string(), "connected");
    }
}
