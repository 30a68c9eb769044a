//! Store-facing models.
//!
//! These types are the contract between the HTTP layer and the [`QuoteStore`](crate::db::store::QuoteStore)
//! backends. They are deliberately independent of the wire format in [`crate::api::models`].

pub mod quotes;
