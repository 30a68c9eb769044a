//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open transaction)
//! and implements the [`Repository`] trait for one table. The store backends in
//! [`crate::db::store`] decide when to open transactions and how to map results.

pub mod quotes;
pub mod repository;

pub use quotes::Quotes;
pub use repository::Repository;
