//! Record stores for quotes.
//!
//! The [`QuoteStore`] trait is the only way the HTTP layer touches persisted state. Two backends
//! are provided:
//!
//! - [`PostgresQuoteStore`]: a pooled postgres connection driving the [`Quotes`](crate::db::handlers::Quotes)
//!   repository. Used in production.
//! - [`InMemoryQuoteStore`]: a process-local vector guarded by a lock. Used for tests and for
//!   running the service without a database. Data is lost on restart.
//!
//! Both assign identifiers on create, keep `created_at`/`updated_at` current, enforce the same
//! length constraints and list in insertion order. Concurrent writes to the same identifier are
//! last-write-wins.

use crate::db::errors::Result;
use crate::db::models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteUpdateDBRequest, QuoteUpdateDBResponse};
use crate::types::QuoteId;

pub mod in_memory;
pub mod postgres;


pub use in_memory::InMemoryQuoteStore;
pub use postgres::PostgresQuoteStore;

/// Storage backend for quote records.
#[async_trait::async_trait]
pub trait QuoteStore: Send + Sync {
    /// All quotes in the store's natural (insertion) order.
    async fn list(&self) -> Result<Vec<QuoteDBResponse>>;

    /// Fetch a single quote, `None` if no quote has this id.
    async fn get(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>>;

    /// Persist a new quote. The store assigns the id and both timestamps.
    ///
    /// # Errors
    /// - `CheckViolation` if `quote` or `author` are shorter than allowed
    async fn create(&self, request: &QuoteCreateDBRequest) -> Result<QuoteDBResponse>;

    /// Merge the supplied fields into an existing quote and bump `updated_at`.
    ///
    /// The returned `replaced_image` is the image path this write displaced, read atomically with
    /// the write, so concurrent updates each see the image they actually overwrote.
    /// Returns `None` if no quote has this id.
    async fn update(&self, id: &QuoteId, request: &QuoteUpdateDBRequest) -> Result<Option<QuoteUpdateDBResponse>>;

    /// Hard-delete a quote, returning the removed record if it existed.
    async fn delete(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>>;

    /// Release backend resources. Called once during graceful shutdown.
    async fn close(&self) {}
}
