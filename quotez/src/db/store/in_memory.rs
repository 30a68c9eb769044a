//! In-memory quote store.
//!
//! Quotes live in a vector behind a [`parking_lot::RwLock`], which keeps insertion order for
//! listing. The lock is never held across an await. Suitable for tests and single-process
//! deployments; everything is lost on restart.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::QuoteStore;
use crate::db::errors::{DbError, Result};
use crate::db::models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteUpdateDBRequest, QuoteUpdateDBResponse};
use crate::types::QuoteId;
use crate::validation::{AUTHOR_MIN_CHARS, QUOTE_MIN_CHARS};

#[derive(Clone, Default)]
pub struct InMemoryQuoteStore {
    quotes: Arc<RwLock<Vec<QuoteDBResponse>>>,
}

impl InMemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }
}

/// Mirror of the table's CHECK constraints.
fn check_lengths(quote: Option<&str>, author: Option<&str>) -> Result<()> {
    let violation = |constraint: &str, message: &str| DbError::CheckViolation {
        constraint: Some(constraint.to_string()),
        table: Some("quotes".to_string()),
        message: message.to_string(),
    };

    if quote.is_some_and(|q| q.chars().count() < QUOTE_MIN_CHARS) {
        return Err(violation("quotes_quote_check", "quote is too short"));
    }
    if author.is_some_and(|a| a.chars().count() < AUTHOR_MIN_CHARS) {
        return Err(violation("quotes_author_check", "author is too short"));
    }
    Ok(())
}

#[async_trait::async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn list(&self) -> Result<Vec<QuoteDBResponse>> {
        Ok(self.quotes.read().clone())
    }

    async fn get(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>> {
        Ok(self.quotes.read().iter().find(|q| &q.id == id).cloned())
    }

    async fn create(&self, request: &QuoteCreateDBRequest) -> Result<QuoteDBResponse> {
        check_lengths(Some(&request.quote), Some(&request.author))?;

        let now = Utc::now();
        let quote = QuoteDBResponse {
            id: QuoteId::generate(),
            quote: request.quote.clone(),
            author: request.author.clone(),
            image: request.image.clone(),
            created_at: now,
            updated_at: now,
        };
        self.quotes.write().push(quote.clone());
        Ok(quote)
    }

    async fn update(&self, id: &QuoteId, request: &QuoteUpdateDBRequest) -> Result<Option<QuoteUpdateDBResponse>> {
        check_lengths(request.quote.as_deref(), request.author.as_deref())?;

        let mut quotes = self.quotes.write();
        let Some(existing) = quotes.iter_mut().find(|q| &q.id == id) else {
            return Ok(None);
        };
        let previous_image = existing.image.clone();

        if let Some(quote) = &request.quote {
            existing.quote = quote.clone();
        }
        if let Some(author) = &request.author {
            existing.author = author.clone();
        }
        if let Some(image) = &request.image {
            existing.image = Some(image.clone());
        }
        existing.updated_at = Utc::now();

        Ok(Some(QuoteUpdateDBResponse::new(existing.clone(), previous_image)))
    }

    async fn delete(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>> {
        let mut quotes = self.quotes.write();
        let removed = quotes.iter().position(|q| &q.id == id).map(|index| quotes.remove(index));
        Ok(removed)
    }
}
