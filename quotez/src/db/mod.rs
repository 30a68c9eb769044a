//! Database layer.
//!
//! - [`errors`]: [`DbError`](errors::DbError), the error type every store operation returns
//! - [`models`]: request/response types exchanged with the store
//! - [`handlers`]: postgres repositories built on `sqlx`
//! - [`store`]: the [`QuoteStore`](store::QuoteStore) trait and its postgres and in-memory backends

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;
