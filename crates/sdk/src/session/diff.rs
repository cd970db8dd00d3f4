//! Which events a session transition produces.

use account_sdk_core::Session;

use crate::events::IdentityEvent;

/// Events for the transition `previous -> current`, in emission order.
///
/// `session_init_sent` is set the first time a logged-in session is seen and
/// never cleared, so `sessionInit` fires at most once per flag.
pub fn session_events(
    previous: &Session,
    current: &Session,
    session_init_sent: &mut bool,
) -> Vec<IdentityEvent> {
    let was_logged_in = previous.is_logged_in();
    let is_logged_in = current.is_logged_in();
    let mut events = Vec::new();

    if is_logged_in {
        events.push(IdentityEvent::Login);
    }
    if was_logged_in && !is_logged_in {
        events.push(IdentityEvent::Logout);
    }
    if was_logged_in && is_logged_in && previous.user_id != current.user_id {
        events.push(IdentityEvent::UserChange);
    }
    if was_logged_in || is_logged_in {
        events.push(IdentityEvent::SessionChange);
    } else {
        events.push(IdentityEvent::NotLoggedIn);
    }
    if is_logged_in && !*session_init_sent {
        *session_init_sent = true;
        events.push(IdentityEvent::SessionInit);
    }
    if previous.user_status != current.user_status {
        events.push(IdentityEvent::StatusChange);
    }

    events
}
