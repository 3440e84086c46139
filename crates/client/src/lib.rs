//! RentWheels client state core.
//!
//! Everything a shell application needs between its views and the RentWheels
//! backend: the identity session, access-token brokerage, route guarding, the
//! cached car catalog, the booking workflow, and dashboard aggregation.
//!
//! The crate never renders anything and never navigates on its own. Views
//! subscribe to state through `tokio::sync::watch` channels and receive
//! navigation targets as values.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod guard;
pub mod session;
pub mod state;
pub mod token;

pub use state::AppState;
