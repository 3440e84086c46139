//! RentWheels Core - Shared types library.
//!
//! This crate provides the domain types used across all RentWheels components:
//! - `client` - Headless state-management core for the marketplace client
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, statuses, and
//!   car categories

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
