//! Unified error handling for the SDK.
//!
//! Validation errors are raised before any network call. Backend and
//! transport failures are wrapped with context at the reconciliation boundary
//! and re-raised; they are never swallowed there.

use account_sdk_core::BackendError;
use thiserror::Error;

use crate::transport::TransportError;

/// SDK-level error type.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Bad input shape, detected before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required optional dependency was not configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The session could not be fetched from either backend.
    #[error("HasSession failed: {0}")]
    SessionFetchFailed(#[from] SessionFetchError),

    /// The user is not connected to this client.
    #[error("The user is not connected to this client")]
    NotConnected,

    /// Both logout calls failed.
    #[error("Logout failed: session service: {primary}; identity service: {legacy}")]
    LogoutFailed {
        primary: TransportError,
        legacy: TransportError,
    },

    /// The entitlement service could not be reached or refused the check.
    #[error("HasAccess failed: {0}")]
    AccessFetchFailed(#[source] AccessFetchError),

    /// A login, flow or account page URL could not be composed.
    #[error("Could not build URL: {0}")]
    UrlBuild(#[source] TransportError),
}

/// Cause of a failed session fetch.
#[derive(Debug, Error)]
pub enum SessionFetchError {
    /// The backend answered with an error payload.
    #[error("{0}")]
    Backend(BackendError),

    /// The request itself failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The response was not a session object.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Cause of a failed entitlement check.
#[derive(Debug, Error)]
pub enum AccessFetchError {
    /// The service answered with an error payload.
    #[error("{0}")]
    Backend(BackendError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The response was not an entitlement record.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type alias for `SdkError`.
pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use account_sdk_core::BackendErrorKind;

    #[test]
    fn test_sdk_error_display() {
        let err = SdkError::InvalidArgument("'userId' must be specified".to_string());
        assert_eq!(err.to_string(), "Invalid argument: 'userId' must be specified");

        let err = SdkError::NotConnected;
        assert_eq!(err.to_string(), "The user is not connected to this client");
    }

    #[test]
    fn test_session_fetch_error_carries_backend_payload() {
        let err = SdkError::from(SessionFetchError::Backend(BackendError {
            code: Some(401),
            kind: BackendErrorKind::Other("ApiException".to_string()),
            description: Some("invalid client".to_string()),
        }));
        assert_eq!(
            err.to_string(),
            "HasSession failed: ApiException: invalid client"
        );
    }

    #[test]
    fn test_logout_failed_names_both_causes() {
        let err = SdkError::LogoutFailed {
            primary: TransportError::MalformedJsonp,
            legacy: TransportError::Status {
                status: 503,
                body: "down".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("session service"));
        assert!(text.contains("HTTP 503"));
    }
}
