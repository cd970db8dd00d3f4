//! The two session backends and the fallback between them.
//!
//! The session service is asked first. When it answers with a
//! `LoginException` the legacy identity service is asked once with the same
//! parameters. Every other outcome of the first attempt is final.

use std::sync::Arc;

use account_sdk_core::{BackendError, Session};
use tracing::{debug, instrument, warn};

use crate::error::{SdkError, SessionFetchError};
use crate::transport::{QueryParams, Transport, TransportError};

pub const PRIMARY_HAS_SESSION: &str = "rpc/hasSession.js";
pub const PRIMARY_LOGOUT: &str = "rpc/logout.js";
pub const LEGACY_HAS_SESSION: &str = "ajax/hasSession.js";
pub const LEGACY_LOGOUT: &str = "ajax/logout.js";

/// Which backend a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Primary,
    Legacy,
}

impl Backend {
    const fn has_session_path(self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_HAS_SESSION,
            Self::Legacy => LEGACY_HAS_SESSION,
        }
    }
}

/// Outcome of a single `hasSession` call.
enum Reply {
    Session(Session),
    Refused(BackendError),
}

/// Session service plus legacy identity service.
#[derive(Clone)]
pub struct SessionBackends {
    primary: Arc<dyn Transport>,
    legacy: Arc<dyn Transport>,
}

impl SessionBackends {
    #[must_use]
    pub fn new(primary: Arc<dyn Transport>, legacy: Arc<dyn Transport>) -> Self {
        Self { primary, legacy }
    }

    /// Fetch the current session, falling back to the legacy service on a
    /// `LoginException`.
    ///
    /// # Errors
    ///
    /// Returns the error payload of the last backend asked, or the transport
    /// failure that prevented an answer.
    #[instrument(skip(self))]
    pub async fn has_session(&self, autologin: bool) -> Result<Session, SessionFetchError> {
        let params = QueryParams::new().with("autologin", u8::from(autologin));

        let mut backend = Backend::Primary;
        loop {
            match self.ask(backend, &params).await? {
                Reply::Session(session) => return Ok(session),
                Reply::Refused(error) if backend == Backend::Primary && error.is_login_exception() => {
                    debug!(error = %error, "Session service refused login, asking identity service");
                    backend = Backend::Legacy;
                }
                Reply::Refused(error) => return Err(SessionFetchError::Backend(error)),
            }
        }
    }

    /// Log out of both backends concurrently.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::LogoutFailed` only when both calls fail.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SdkError> {
        let params = QueryParams::new();
        let (primary, legacy) = tokio::join!(
            self.primary.get(PRIMARY_LOGOUT, &params),
            self.legacy.get(LEGACY_LOGOUT, &params)
        );

        match (primary, legacy) {
            (Err(primary), Err(legacy)) => Err(SdkError::LogoutFailed { primary, legacy }),
            (Err(e), Ok(_)) => {
                warn!(error = %e, "Session service logout failed; identity service succeeded");
                Ok(())
            }
            (Ok(_), Err(e)) => {
                warn!(error = %e, "Identity service logout failed; session service succeeded");
                Ok(())
            }
            (Ok(_), Ok(_)) => Ok(()),
        }
    }

    async fn ask(&self, backend: Backend, params: &QueryParams) -> Result<Reply, SessionFetchError> {
        let transport = match backend {
            Backend::Primary => &self.primary,
            Backend::Legacy => &self.legacy,
        };

        let value = match transport.get(backend.has_session_path(), params).await {
            Ok(value) => value,
            Err(e) => {
                return refusal_in_body(&e)
                    .map(Reply::Refused)
                    .ok_or(SessionFetchError::Transport(e));
            }
        };

        let mut session: Session = serde_json::from_value(value)?;
        match session.error.take() {
            Some(error) => Ok(Reply::Refused(error)),
            None => Ok(Reply::Session(session)),
        }
    }
}

/// Error payload carried in the body of a non-success HTTP response.
fn refusal_in_body(error: &TransportError) -> Option<BackendError> {
    let TransportError::Status { body, .. } = error else {
        return None;
    };
    serde_json::from_str::<Session>(body).ok()?.error
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::ScriptedTransport;

    fn backends() -> (SessionBackends, Arc<ScriptedTransport>, Arc<ScriptedTransport>) {
        let primary = Arc::new(ScriptedTransport::new("https://session.example.com"));
        let legacy = Arc::new(ScriptedTransport::new("https://login.example.com"));
        (
            SessionBackends::new(primary.clone(), legacy.clone()),
            primary,
            legacy,
        )
    }

    fn login_exception() -> serde_json::Value {
        json!({"error": {"code": 401, "type": "LoginException", "description": "no session"}})
    }

    #[tokio::test]
    async fn test_primary_answer_is_used() {
        let (backends, primary, legacy) = backends();
        primary.respond(PRIMARY_HAS_SESSION, json!({"result": true, "userId": 5}));

        let session = backends.has_session(true).await.unwrap();
        assert_eq!(session.user_id.map(u64::from), Some(5));
        assert_eq!(primary.calls(PRIMARY_HAS_SESSION), 1);
        assert_eq!(legacy.calls(LEGACY_HAS_SESSION), 0);
        assert_eq!(
            primary.last_params(PRIMARY_HAS_SESSION).unwrap().get("autologin"),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_login_exception_falls_back_once() {
        let (backends, primary, legacy) = backends();
        primary.respond(PRIMARY_HAS_SESSION, login_exception());
        legacy.respond(LEGACY_HAS_SESSION, json!({"result": false}));

        let session = backends.has_session(false).await.unwrap();
        assert_eq!(session.result, Some(false));
        assert_eq!(legacy.calls(LEGACY_HAS_SESSION), 1);
        assert_eq!(
            legacy.last_params(LEGACY_HAS_SESSION).unwrap().get("autologin"),
            Some("0")
        );
    }

    #[tokio::test]
    async fn test_login_exception_in_error_status_body_falls_back() {
        let (backends, primary, legacy) = backends();
        primary.fail(
            PRIMARY_HAS_SESSION,
            TransportError::Status {
                status: 401,
                body: login_exception().to_string(),
            },
        );
        legacy.respond(LEGACY_HAS_SESSION, json!({"result": true, "userId": 9}));

        assert!(backends.has_session(true).await.unwrap().is_logged_in());
    }

    #[tokio::test]
    async fn test_other_primary_error_is_not_retried() {
        let (backends, primary, legacy) = backends();
        primary.respond(
            PRIMARY_HAS_SESSION,
            json!({"error": {"code": 400, "type": "ApiException"}}),
        );

        let err = backends.has_session(true).await.unwrap_err();
        assert!(matches!(err, SessionFetchError::Backend(_)));
        assert_eq!(legacy.calls(LEGACY_HAS_SESSION), 0);
    }

    #[tokio::test]
    async fn test_legacy_login_exception_is_final() {
        let (backends, primary, legacy) = backends();
        primary.respond(PRIMARY_HAS_SESSION, login_exception());
        legacy.respond(LEGACY_HAS_SESSION, login_exception());

        let err = backends.has_session(true).await.unwrap_err();
        assert!(matches!(err, SessionFetchError::Backend(ref e) if e.is_login_exception()));
        assert_eq!(legacy.calls(LEGACY_HAS_SESSION), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let (backends, primary, _) = backends();
        primary.fail(PRIMARY_HAS_SESSION, TransportError::MalformedJsonp);
        assert!(matches!(
            backends.has_session(true).await,
            Err(SessionFetchError::Transport(TransportError::MalformedJsonp))
        ));
    }

    #[tokio::test]
    async fn test_logout_succeeds_when_one_backend_succeeds() {
        let (backends, primary, legacy) = backends();
        primary.fail(PRIMARY_LOGOUT, TransportError::MalformedJsonp);
        legacy.respond(LEGACY_LOGOUT, json!({"result": true}));
        backends.logout().await.unwrap();

        let (backends, primary, legacy) = self::backends();
        primary.respond(PRIMARY_LOGOUT, json!({}));
        legacy.fail(LEGACY_LOGOUT, TransportError::MalformedJsonp);
        backends.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_fails_when_both_fail() {
        let (backends, primary, legacy) = backends();
        primary.fail(PRIMARY_LOGOUT, TransportError::MalformedJsonp);
        legacy.fail(LEGACY_LOGOUT, TransportError::MalformedJsonp);
        assert!(matches!(
            backends.logout().await,
            Err(SdkError::LogoutFailed { .. })
        ));
        assert_eq!(primary.calls(PRIMARY_LOGOUT), 1);
        assert_eq!(legacy.calls(LEGACY_LOGOUT), 1);
    }
}
