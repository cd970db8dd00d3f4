//! Session reconciliation.
//!
//! [`Identity`] asks the session backends whether the visitor is logged in,
//! caches positive answers, and compares every answer against the previous
//! one to emit exactly the events the transition implies.
//!
//! Calls to [`Identity::get_session`] are serialized per instance. A caller
//! arriving while a fetch is in flight waits for it and then usually finds
//! the fresh answer in the cache.

mod backend;
mod diff;

pub use backend::{
    LEGACY_HAS_SESSION, LEGACY_LOGOUT, PRIMARY_HAS_SESSION, PRIMARY_LOGOUT, SessionBackends,
};
pub use diff::session_events;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use account_sdk_core::{Session, UserId};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::{SdkConfig, Transports};
use crate::cookie::{SESSION_COOKIE_NAME, SessionCookie};
use crate::error::{Result, SdkError};
use crate::events::{EventEmitter, IdentityEvent, IdentityPayload, ListenerId};
use crate::platform::{Platform, PopupFeatures, PopupHandle};
use crate::urls::{LoginOptions, UrlBuilder};

/// Cache key of the session record.
pub const SESSION_CACHE_KEY: &str = "hasSession-cache";

/// Size of the login popup.
pub const LOGIN_POPUP: PopupFeatures = PopupFeatures {
    width: 360,
    height: 570,
};

const LOGIN_POPUP_TITLE: &str = "Schibsted account";

/// Session state client.
#[derive(Clone)]
pub struct Identity {
    inner: Arc<IdentityInner>,
}

struct IdentityInner {
    backends: SessionBackends,
    urls: UrlBuilder,
    cache: TtlCache,
    platform: Platform,
    events: EventEmitter<IdentityEvent, IdentityPayload>,
    state: Mutex<SessionState>,
    session_caching: AtomicBool,
    session_cookie: bool,
}

#[derive(Default)]
struct SessionState {
    previous: Session,
    session_init_sent: bool,
}

impl Identity {
    /// Create a client over the given transports.
    #[must_use]
    pub fn new(config: &SdkConfig, transports: &Transports, platform: Platform) -> Self {
        let backends = SessionBackends::new(
            Arc::clone(&transports.session),
            Arc::clone(&transports.identity),
        );
        let urls = UrlBuilder::new(
            Arc::clone(&transports.identity),
            Arc::clone(&transports.oauth),
            config.redirect_uri.clone(),
        );
        let cache = platform
            .storage
            .clone()
            .map_or_else(TtlCache::detached, TtlCache::new)
            .with_clock(Arc::clone(&platform.clock));

        Self {
            inner: Arc::new(IdentityInner {
                backends,
                urls,
                cache,
                platform,
                events: EventEmitter::new(),
                state: Mutex::new(SessionState::default()),
                session_caching: AtomicBool::new(config.session_caching),
                session_cookie: config.session_cookie,
            }),
        }
    }

    /// Fetch the current session.
    ///
    /// A cached session is returned without a network call but is still
    /// diffed against the previous one, exactly as a fresh answer would be.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::SessionFetchFailed` when the backends refuse or
    /// cannot be reached. An `error` event is emitted first.
    #[instrument(skip(self))]
    pub async fn get_session(&self, autologin: bool) -> Result<Session> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let caching = inner.session_caching.load(Ordering::Relaxed);

        if caching && let Some(cached) = inner.cache.get::<Session>(SESSION_CACHE_KEY) {
            debug!("Session cache hit");
            return Ok(self.settle(&mut state, cached));
        }

        let session = match inner.backends.has_session(autologin).await {
            Ok(session) => session,
            Err(e) => {
                let err = SdkError::from(e);
                warn!(error = %err, "Session fetch failed");
                inner
                    .events
                    .emit(IdentityEvent::Error, &IdentityPayload::Error(err.to_string()));
                return Err(err);
            }
        };

        if caching && session.is_connected() {
            match session.expires_in() {
                Some(secs) => {
                    inner
                        .cache
                        .set(SESSION_CACHE_KEY, &session, Duration::from_secs(secs));
                }
                None => debug!("Session has no expiry; not caching"),
            }
        }

        if inner.session_cookie {
            let cookie =
                SessionCookie::from_session(&session, &inner.platform.document_domain, self.now());
            inner.platform.cookies.set(&cookie);
        }

        Ok(self.settle(&mut state, session))
    }

    /// True when the session service answered with a `result` at all.
    /// Failures count as `false`.
    pub async fn is_logged_in(&self) -> bool {
        match self.get_session(true).await {
            Ok(session) => session.has_result(),
            Err(e) => {
                warn!(error = %e, "is_logged_in: treating failure as logged out");
                false
            }
        }
    }

    /// True when the user has authorized this client. Failures count as `false`.
    pub async fn is_connected(&self) -> bool {
        match self.get_session(true).await {
            Ok(session) => session.is_connected(),
            Err(e) => {
                warn!(error = %e, "is_connected: treating failure as not connected");
                false
            }
        }
    }

    /// The connected user's session.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::NotConnected` when the user has not authorized this
    /// client, or the fetch error.
    pub async fn get_user(&self) -> Result<Session> {
        let session = self.get_session(true).await?;
        if !session.is_connected() {
            return Err(SdkError::NotConnected);
        }
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `SdkError::NotConnected` unless the user is connected and has
    /// a user id.
    pub async fn get_user_id(&self) -> Result<UserId> {
        let session = self.get_session(true).await?;
        session
            .user_id
            .filter(|_| session.is_connected())
            .ok_or(SdkError::NotConnected)
    }

    /// # Errors
    ///
    /// Returns `SdkError::NotConnected` unless the user is connected and has
    /// a UUID.
    pub async fn get_user_uuid(&self) -> Result<Uuid> {
        let session = self.get_session(true).await?;
        session
            .uuid
            .filter(|_| session.is_connected())
            .ok_or(SdkError::NotConnected)
    }

    /// The session token, or `None` when there is none or the fetch failed.
    pub async fn get_sp_id(&self) -> Option<String> {
        match self.get_session(true).await {
            Ok(session) => session.sp_id,
            Err(e) => {
                warn!(error = %e, "get_sp_id: treating failure as no session");
                None
            }
        }
    }

    /// Log out of both backends. The cached session is dropped only once at
    /// least one of them accepted.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::LogoutFailed` when neither backend accepted the
    /// logout. An `error` event is emitted first.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let inner = &self.inner;
        if let Err(err) = inner.backends.logout().await {
            warn!(error = %err, "Logout failed");
            inner
                .events
                .emit(IdentityEvent::Error, &IdentityPayload::Error(err.to_string()));
            return Err(err);
        }
        inner.cache.delete(SESSION_CACHE_KEY);

        if inner.session_cookie {
            let state = inner.state.lock().await;
            let domain = state
                .previous
                .base_domain
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(&inner.platform.document_domain);
            inner.platform.cookies.remove(SESSION_COOKIE_NAME, domain);
        }

        info!("Logged out");
        inner
            .events
            .emit(IdentityEvent::Logout, &IdentityPayload::LoggedOut);
        Ok(())
    }

    /// Start a login.
    ///
    /// Opens a popup when `options.prefer_popup` is set and the host allows
    /// it, otherwise navigates the current document to the login page.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` if the login URL cannot be built.
    /// Nothing is touched in that case.
    #[instrument(skip(self, options), fields(new_flow = options.new_flow, popup = options.prefer_popup))]
    pub fn login(&self, options: &LoginOptions) -> Result<Option<PopupHandle>> {
        let inner = &self.inner;
        let url = inner.urls.login_url(options)?;
        inner.cache.delete(SESSION_CACHE_KEY);

        if options.prefer_popup {
            if let Some(handle) = inner.platform.popups.open(&url, LOGIN_POPUP_TITLE, LOGIN_POPUP) {
                debug!(?handle, "Login popup opened");
                return Ok(Some(handle));
            }
            debug!("Login popup blocked; navigating instead");
        }

        inner.platform.navigator.assign(&url);
        Ok(None)
    }

    pub fn enable_session_caching(&self) {
        self.inner.session_caching.store(true, Ordering::Relaxed);
    }

    pub fn disable_session_caching(&self) {
        self.inner.session_caching.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn session_caching_enabled(&self) -> bool {
        self.inner.session_caching.load(Ordering::Relaxed)
    }

    /// Subscribe to an identity event.
    pub fn on<F>(&self, event: IdentityEvent, listener: F) -> ListenerId
    where
        F: Fn(&IdentityPayload) + Send + Sync + 'static,
    {
        self.inner.events.on(event, listener)
    }

    pub fn off(&self, event: IdentityEvent, id: ListenerId) -> bool {
        self.inner.events.off(event, id)
    }

    /// # Errors
    ///
    /// See [`UrlBuilder::login_url`].
    pub fn login_url(&self, options: &LoginOptions) -> Result<Url> {
        self.inner.urls.login_url(options)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn logout_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.logout_url(redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn account_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.account_url(redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn phones_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.phones_url(redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty state or a malformed
    /// redirect URI.
    pub fn auth_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.auth_flow_url(state, redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty state or a malformed
    /// redirect URI.
    pub fn signup_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.signup_flow_url(state, redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for an empty state or a malformed
    /// redirect URI.
    pub fn signin_flow_url(&self, state: &str, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.signin_flow_url(state, redirect_uri)
    }

    /// Diff `current` against the previous session, emit, and remember it.
    fn settle(&self, state: &mut SessionState, current: Session) -> Session {
        let events = session_events(&state.previous, &current, &mut state.session_init_sent);
        state.previous = current.clone();

        let payload = IdentityPayload::Session(Arc::new(current.clone()));
        for event in events {
            self.inner.events.emit(event, &payload);
        }
        current
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.inner.platform.clock.now_millis())
            .unwrap_or_else(Utc::now)
    }
}
