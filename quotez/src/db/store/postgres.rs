//! PostgreSQL-backed quote store.

use std::time::Duration;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument};

use super::QuoteStore;
use crate::config::PoolSettings;
use crate::db::errors::{DbError, Result};
use crate::db::handlers::{Quotes, Repository};
use crate::db::models::quotes::{QuoteCreateDBRequest, QuoteDBResponse, QuoteUpdateDBRequest, QuoteUpdateDBResponse};
use crate::types::QuoteId;

/// Quote store on top of a postgres connection pool.
///
/// Reads run on a pooled connection; writes run in a transaction so the returned row is exactly
/// what was committed.
///
/// # Example
/// ```ignore
/// let store = PostgresQuoteStore::connect("postgres://localhost/quotez", &PoolSettings::default()).await?;
/// let quotes = store.list().await?;
/// ```
#[derive(Clone)]
pub struct PostgresQuoteStore {
    pool: PgPool,
}

impl PostgresQuoteStore {
    /// Wrap an existing pool. Migrations are assumed to have run.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url` and bring the schema up to date.
    pub async fn connect(url: &str, settings: &PoolSettings) -> anyhow::Result<Self> {
        let pool = pool_options(settings)
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        crate::migrator().run(&pool).await.context("Failed to run database migrations")?;
        info!(max_connections = settings.max_connections, "Connected to PostgreSQL and applied migrations");

        Ok(Self::new(pool))
    }
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    // 0 means "never" for both idle timeout and max lifetime
    let nonzero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(nonzero(settings.idle_timeout_secs))
        .max_lifetime(nonzero(settings.max_lifetime_secs))
}

#[async_trait::async_trait]
impl QuoteStore for PostgresQuoteStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<QuoteDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Quotes::new(&mut conn).list().await
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Quotes::new(&mut conn).get_by_id(id.clone()).await
    }

    #[instrument(skip(self, request), err)]
    async fn create(&self, request: &QuoteCreateDBRequest) -> Result<QuoteDBResponse> {
        let mut tx = self.pool.begin().await?;
        let quote = Quotes::new(&mut tx).create(request).await?;
        tx.commit().await?;
        Ok(quote)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&self, id: &QuoteId, request: &QuoteUpdateDBRequest) -> Result<Option<QuoteUpdateDBResponse>> {
        let mut tx = self.pool.begin().await?;
        let outcome = match Quotes::new(&mut tx).update_with_replaced(id.clone(), request).await {
            Ok(outcome) => outcome,
            Err(DbError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        tx.commit().await?;
        Ok(Some(outcome))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: &QuoteId) -> Result<Option<QuoteDBResponse>> {
        let mut tx = self.pool.begin().await?;
        let deleted = Quotes::new(&mut tx).delete(id.clone()).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn close(&self) {
        info!("Closing PostgreSQL pool");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_treat_zero_as_never() {
        let settings = PoolSettings {
            max_connections: 3,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 0,
            max_lifetime_secs: 60,
        };
        let options = pool_options(&settings);

        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(60)));
    }
}
