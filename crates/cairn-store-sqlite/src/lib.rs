//! SQLite backend for the cairn business-entity repository contract.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every mutation executes as a
//! single SQLite transaction: lifecycle check, historical snapshot, audit
//! trail, then the entity write.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteRepository, SqliteStore};
