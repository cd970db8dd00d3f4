//! Core types for the account SDK.
//!
//! This module provides type-safe wrappers for the provider's wire records.

pub mod entitlement;
pub mod id;
pub mod session;
pub mod status;

pub use entitlement::EntitlementRecord;
pub use id::UserId;
pub use session::{BackendError, BackendErrorKind, Session};
pub use status::UserStatus;
