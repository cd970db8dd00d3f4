//! Host environment handles.
//!
//! Components never reach for ambient globals. Whatever the host offers
//! (cookies, navigation, popups, storage) is passed in through a
//! [`Platform`] at construction time.

use std::sync::{Arc, Mutex, PoisonError};

use url::Url;

use crate::cache::{Clock, MemoryStorage, Storage, SystemClock};
use crate::cookie::SessionCookie;

/// Writes and removes cookies on the current document.
pub trait CookieJar: Send + Sync {
    fn set(&self, cookie: &SessionCookie);
    fn remove(&self, name: &str, domain: &str);
}

/// Moves the current document to another URL.
pub trait Navigator: Send + Sync {
    fn assign(&self, url: &Url);
}

/// Window size requested for a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
}

/// Opaque handle to an opened popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupHandle(pub u64);

/// Opens popup windows. Returning `None` means the popup was blocked.
pub trait PopupOpener: Send + Sync {
    fn open(&self, url: &Url, title: &str, features: PopupFeatures) -> Option<PopupHandle>;
}

/// Everything the SDK needs from its host.
#[derive(Clone)]
pub struct Platform {
    /// Backing for the TTL cache. `None` disables caching.
    pub storage: Option<Arc<dyn Storage>>,
    pub cookies: Arc<dyn CookieJar>,
    pub navigator: Arc<dyn Navigator>,
    pub popups: Arc<dyn PopupOpener>,
    /// Domain of the current document, used when the backend omits one.
    pub document_domain: String,
    pub clock: Arc<dyn Clock>,
}

impl Platform {
    /// A platform for hosts without a browser: in-memory storage, recording
    /// cookie jar and navigator, blocked popups and the system clock.
    #[must_use]
    pub fn headless(document_domain: impl Into<String>) -> Self {
        Self {
            storage: Some(Arc::new(MemoryStorage::new())),
            cookies: Arc::new(RecordingCookieJar::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            popups: Arc::new(BlockedPopups),
            document_domain: document_domain.into(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Option<Arc<dyn Storage>>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: Arc<dyn CookieJar>) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    #[must_use]
    pub fn with_popups(mut self, popups: Arc<dyn PopupOpener>) -> Self {
        self.popups = popups;
        self
    }
}

/// A cookie jar that keeps every cookie it is given.
#[derive(Debug, Default)]
pub struct RecordingCookieJar {
    cookies: Mutex<Vec<SessionCookie>>,
}

impl RecordingCookieJar {
    /// Cookies currently set, oldest first.
    #[must_use]
    pub fn cookies(&self) -> Vec<SessionCookie> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<SessionCookie> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}

impl CookieJar for RecordingCookieJar {
    fn set(&self, cookie: &SessionCookie) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain));
        cookies.push(cookie.clone());
    }

    fn remove(&self, name: &str, domain: &str) {
        let domain = domain.trim_start_matches('.');
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| !(c.name == name && c.domain.trim_start_matches('.') == domain));
    }
}

/// A navigator that records where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn visited(&self) -> Vec<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, url: &Url) {
        tracing::info!(url = %url, "Navigating");
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
    }
}

/// A popup opener whose popups are always blocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockedPopups;

impl PopupOpener for BlockedPopups {
    fn open(&self, _url: &Url, _title: &str, _features: PopupFeatures) -> Option<PopupHandle> {
        None
    }
}
