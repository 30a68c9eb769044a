//! Database repository for quotes.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteUpdateDBRequest, QuoteUpdateDBResponse},
};
use crate::types::{QuoteId, abbrev_id};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Quote {
    #[sqlx(try_from = "String")]
    pub id: QuoteId,
    pub quote: String,
    pub author: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Quote> for QuoteDBResponse {
    fn from(quote: Quote) -> Self {
        Self {
            id: quote.id,
            quote: quote.quote,
            author: quote.author,
            image: quote.image,
            created_at: quote.created_at,
            updated_at: quote.updated_at,
        }
    }
}

// An updated row alongside the image it had before the update
#[derive(Debug, FromRow)]
struct UpdatedQuote {
    #[sqlx(flatten)]
    quote: Quote,
    previous_image: Option<String>,
}

pub struct Quotes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Quotes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Update a quote and report the image path the write displaced.
    ///
    /// The prior row is locked by the CTE, so a concurrent update waits and then sees this one's
    /// image as its previous value.
    #[instrument(skip(self, request), fields(quote_id = %abbrev_id(&id)), err)]
    pub async fn update_with_replaced(&mut self, id: QuoteId, request: &QuoteUpdateDBRequest) -> Result<QuoteUpdateDBResponse> {
        // Only update fields that are provided (not None)
        let updated = sqlx::query_as::<_, UpdatedQuote>(
            r#"
            WITH previous AS (
                SELECT id, image FROM quotes WHERE id = $1 FOR UPDATE
            )
            UPDATE quotes SET
                quote = COALESCE($2, quotes.quote),
                author = COALESCE($3, quotes.author),
                image = COALESCE($4, quotes.image),
                updated_at = NOW()
            FROM previous
            WHERE quotes.id = previous.id
            RETURNING quotes.id, quotes.quote, quotes.author, quotes.image, quotes.created_at, quotes.updated_at,
                previous.image AS previous_image
            "#,
        )
        .bind(id.as_str())
        .bind(request.quote.as_deref())
        .bind(request.author.as_deref())
        .bind(request.image.as_deref())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(QuoteUpdateDBResponse::new(updated.quote.into(), updated.previous_image))
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Quotes<'c> {
    type CreateRequest = QuoteCreateDBRequest;
    type UpdateRequest = QuoteUpdateDBRequest;
    type Response = QuoteDBResponse;
    type Id = QuoteId;

    #[instrument(skip(self, request), fields(author = %request.author), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // created_at and updated_at use database DEFAULT NOW() for consistency
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quotes (id, quote, author, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, quote, author, image, created_at, updated_at
            "#,
        )
        .bind(QuoteId::generate().as_str())
        .bind(&request.quote)
        .bind(&request.author)
        .bind(request.image.as_deref())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(quote.into())
    }

    #[instrument(skip(self), fields(quote_id = %abbrev_id(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let quote = sqlx::query_as::<_, Quote>(
            "SELECT id, quote, author, image, created_at, updated_at FROM quotes WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(quote.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self) -> Result<Vec<Self::Response>> {
        let quotes = sqlx::query_as::<_, Quote>(
            "SELECT id, quote, author, image, created_at, updated_at FROM quotes ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(quotes.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(quote_id = %abbrev_id(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let deleted = sqlx::query_as::<_, Quote>(
            "DELETE FROM quotes WHERE id = $1 RETURNING id, quote, author, image, created_at, updated_at",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(deleted.map(Into::into))
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        Ok(self.update_with_replaced(id, request).await?.quote)
    }
}
