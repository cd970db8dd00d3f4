//! Account SDK.
//!
//! Client for an identity provider's session, login and entitlement
//! protocol:
//! - [`Identity`] - session lookup with caching, change events, login and
//!   logout
//! - [`Monetization`] - cached product entitlement checks
//! - [`UrlBuilder`] - login, logout, flow and account page URLs
//!
//! Host facilities (storage, cookies, navigation, popups, time) are injected
//! through a [`Platform`].
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use account_sdk::{Identity, Platform, SdkConfig};
//!
//! let config = SdkConfig::from_env()?;
//! let transports = config.transports()?;
//! let identity = Identity::new(&config, &transports, Platform::headless("example.com"));
//!
//! if identity.is_connected().await {
//!     let user = identity.get_user().await?;
//!     println!("{:?}", user.display_name);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod cookie;
pub mod environment;
pub mod error;
pub mod events;
pub mod monetization;
pub mod platform;
pub mod session;
pub mod transport;
pub mod urls;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_support;

pub use account_sdk_core::{BackendError, BackendErrorKind, EntitlementRecord, Session, UserId, UserStatus};
pub use cache::{FileStorage, MemoryStorage, Storage, TtlCache};
pub use config::{ConfigError, SdkConfig, Transports};
pub use environment::{Environment, ServiceUrls};
pub use error::{AccessFetchError, Result, SdkError, SessionFetchError};
pub use events::{IdentityEvent, IdentityPayload, ListenerId, MonetizationEvent, MonetizationPayload};
pub use monetization::Monetization;
pub use platform::Platform;
pub use session::Identity;
pub use transport::{JsonpClient, QueryParams, RestClient, Transport, TransportError};
pub use urls::{AcrValues, LoginOptions, UrlBuilder};
