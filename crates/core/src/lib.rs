//! Account SDK Core - Shared types library.
//!
//! This crate provides the data types exchanged with the identity provider:
//! - `sdk` - Session reconciliation, entitlement checks, URL building
//! - `cli` - Command-line access to the same operations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no caching, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere, including
//! when deserializing cached payloads.
//!
//! # Modules
//!
//! - [`types`] - Session records, user identifiers, statuses, entitlements

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
