//! Core types and trait definitions for the rockt streetcar game.
//!
//! This crate holds the ownership and fare-settlement engine: the [`car::Car`]
//! aggregate, the pluggable [`rules::Rules`] strategy, and the append-only
//! [`event`] records. It is free of HTTP and database dependencies; storage
//! backends implement [`store::GameStore`] and [`store::ProximityIndex`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod car;
pub mod error;
pub mod event;
pub mod fare;
pub mod location;
pub mod rules;
pub mod stop;
pub mod store;
pub mod user;

pub use error::{Error, Result};
