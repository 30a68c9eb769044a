use crate::db::models::quotes::QuoteDBResponse;
use crate::types::QuoteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A quote as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(rename = "_id")]
    #[schema(value_type = String, example = "65a1b2c3d4e5f60718293a4b")]
    pub id: QuoteId,
    #[schema(example = "Simplicity is prerequisite for reliability.")]
    pub quote: String,
    #[schema(example = "Edsger W. Dijkstra")]
    pub author: String,
    /// Public path of the author image, `null` when none was uploaded
    #[schema(example = "/uploads/quotes/authorImage-1717243200000-123456789.jpg")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QuoteDBResponse> for QuoteResponse {
    fn from(db: QuoteDBResponse) -> Self {
        Self {
            id: db.id,
            quote: db.quote,
            author: db.author,
            image: db.image,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Multipart form accepted by create and update. Only used for API documentation; bodies are
/// parsed by [`crate::api::extractors`].
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct QuoteForm {
    /// At least 5 characters. Required on create.
    pub quote: Option<String>,
    /// At least 2 characters. Required on create.
    pub author: Option<String>,
    /// Author image, any `image/*` type, at most `uploads.max_file_size` bytes
    #[serde(rename = "authorImage")]
    #[schema(value_type = Option<String>, format = Binary)]
    pub author_image: Option<Vec<u8>>,
}

/// Response carrying only a human readable message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_response_wire_format() {
        let created_at = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let response = QuoteResponse {
            id: "65a1b2c3d4e5f60718293a4b".parse().unwrap(),
            quote: "Simplicity is prerequisite for reliability.".to_string(),
            author: "Edsger W. Dijkstra".to_string(),
            image: None,
            created_at,
            updated_at: created_at,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "65a1b2c3d4e5f60718293a4b",
                "quote": "Simplicity is prerequisite for reliability.",
                "author": "Edsger W. Dijkstra",
                "image": null,
                "createdAt": "2025-06-01T12:00:00Z",
                "updatedAt": "2025-06-01T12:00:00Z",
            })
        );
    }
}
