use crate::types::QuoteId;
use chrono::{DateTime, Utc};

/// Database request for creating a new quote
#[derive(Debug, Clone)]
pub struct QuoteCreateDBRequest {
    pub quote: String,
    pub author: String,
    /// Public path of an already-stored image
    pub image: Option<String>,
}

/// Database request for updating a quote. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct QuoteUpdateDBRequest {
    pub quote: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
}

/// Database response for a quote
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDBResponse {
    pub id: QuoteId,
    pub quote: String,
    pub author: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of an update: the stored row plus the image path it displaced.
/// `replaced_image` is read in the same critical section as the write.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteUpdateDBResponse {
    pub quote: QuoteDBResponse,
    pub replaced_image: Option<String>,
}

impl QuoteUpdateDBResponse {
    /// `previous_image` is the row's image before the write; it only counts as replaced if it changed.
    pub fn new(quote: QuoteDBResponse, previous_image: Option<String>) -> Self {
        let replaced_image = previous_image.filter(|previous| quote.image.as_deref() != Some(previous.as_str()));
        Self { quote, replaced_image }
    }
}
