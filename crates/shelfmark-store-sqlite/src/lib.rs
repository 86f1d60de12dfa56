//! SQLite backend for the Shelfmark library store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every save path executes inside a
//! single `BEGIN IMMEDIATE` transaction, which serialises check-then-insert
//! sequences (duplicate guard, record-number sequence) across writers.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
