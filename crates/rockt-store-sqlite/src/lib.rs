//! SQLite backend for the rockt game.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every ownership and ride operation is a
//! single SQLite transaction on that thread, which also serialises concurrent
//! operations on the same car or user.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
