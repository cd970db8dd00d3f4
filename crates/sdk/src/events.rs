//! Event dispatch for stateful components.
//!
//! Each component owns an [`EventEmitter`] rather than inheriting one.
//! Listeners are keyed by event kind, run synchronously in registration
//! order, and are invoked outside the registry lock so a listener may
//! subscribe or unsubscribe while being called.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, PoisonError};

use account_sdk_core::{EntitlementRecord, Session};

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// A registry of listeners keyed by event kind.
pub struct EventEmitter<K, P> {
    listeners: RwLock<HashMap<K, Vec<(ListenerId, Listener<P>)>>>,
    next_id: AtomicU64,
}

impl<K, P> EventEmitter<K, P>
where
    K: Eq + Hash + Copy + fmt::Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe to `kind`.
    pub fn on<F>(&self, kind: K, listener: F) -> ListenerId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Unsubscribe. Returns `false` if the listener was not registered.
    pub fn off(&self, kind: K, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(existing, _)| *existing != id);
        before != registered.len()
    }

    /// Call every listener registered for `kind`.
    pub fn emit(&self, kind: K, payload: &P) {
        let snapshot: Vec<Listener<P>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|registered| registered.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        tracing::trace!(event = ?kind, listeners = snapshot.len(), "Emitting event");
        for listener in snapshot {
            listener(payload);
        }
    }

    #[must_use]
    pub fn listener_count(&self, kind: K) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl<K, P> Default for EventEmitter<K, P>
where
    K: Eq + Hash + Copy + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Events emitted by [`Identity`](crate::Identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityEvent {
    Login,
    Logout,
    UserChange,
    SessionChange,
    NotLoggedIn,
    SessionInit,
    StatusChange,
    Error,
}

impl IdentityEvent {
    /// Event name as exposed to listeners in other runtimes.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::UserChange => "userChange",
            Self::SessionChange => "sessionChange",
            Self::NotLoggedIn => "notLoggedIn",
            Self::SessionInit => "sessionInit",
            Self::StatusChange => "statusChange",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for IdentityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload delivered with an [`IdentityEvent`].
#[derive(Debug, Clone)]
pub enum IdentityPayload {
    /// The current session.
    Session(Arc<Session>),
    /// An explicit logout; no session is available.
    LoggedOut,
    /// Description of a failure that is also being returned to the caller.
    Error(String),
}

impl IdentityPayload {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Session(session) => Some(session),
            Self::LoggedOut | Self::Error(_) => None,
        }
    }
}

/// Events emitted by [`Monetization`](crate::Monetization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonetizationEvent {
    HasAccess,
    Error,
}

impl MonetizationEvent {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HasAccess => "hasAccess",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MonetizationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload delivered with a [`MonetizationEvent`].
#[derive(Debug, Clone)]
pub enum MonetizationPayload {
    /// Access was granted for the sorted product ids.
    Access {
        ids: Vec<String>,
        data: EntitlementRecord,
    },
    Error(String),
}
