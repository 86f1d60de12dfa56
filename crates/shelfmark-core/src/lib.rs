//! Core types, rules and trait definitions for the Shelfmark library platform.
//!
//! This crate has no database or rendering dependencies.
//! The rules that carry real invariants (location codes, late-fee debt,
//! reservation expiry, the duplicate guard, access-policy validation) are
//! plain functions over plain data so they can be exercised without a store.

// Backends implement the store trait with native `async fn`; the trait itself
// spells out the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod circulation;
pub mod clock;
pub mod copy;
pub mod error;
pub mod label;
pub mod location;
pub mod member;
pub mod policy;
pub mod store;

pub use error::{Error, Result, ValidationError};
