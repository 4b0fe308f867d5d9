use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::models::{KeyField, NewUrlRecord, StoreStats, UrlRecord};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use super::UrlStore;

const RECORD_COLUMNS: &str = "id, key, secret_key, target_url, is_active, clicks, created_at";

/// Predicate every read path filters on
const ACTIVE_FILTER: &str = "is_active";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    /// Create a new store with a connection pool
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| AppError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let options = PgConnectOptions::from_str(url)
            .map_err(|e| AppError::Configuration(format!("Invalid database URL: {}", e)))?
            .disable_statement_logging();

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self::from_pool(
            pool,
            Duration::from_secs(config.query_timeout_seconds),
        ))
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Run a query under the configured deadline. An expired deadline is
    /// reported as an unavailable store, never as a missing row.
    async fn bounded<T, E, F>(&self, query: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(AppError::StoreUnavailable(format!(
                "query exceeded {:?}",
                self.query_timeout
            ))),
        }
    }

    /// Insert `record` unless one of its tokens is held by an active record in
    /// either column.
    ///
    /// The partial unique indexes only compare a column with itself. The
    /// cross-column check runs under transaction-scoped advisory locks on both
    /// tokens, taken in sorted order, so concurrent creators serialize on any
    /// token they share.
    async fn insert_exclusive(&self, record: &NewUrlRecord) -> AppResult<UrlRecord> {
        let mut tx = self.pool.begin().await?;

        let mut tokens = [record.key.as_str(), record.secret_key.as_str()];
        tokens.sort_unstable();
        for token in tokens {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(token)
                .execute(&mut *tx)
                .await?;
        }

        let clash_sql = format!(
            "SELECT EXISTS (SELECT 1 FROM urls WHERE {} AND (key IN ($1, $2) OR secret_key IN ($1, $2)))",
            ACTIVE_FILTER
        );
        let clash = sqlx::query_scalar::<_, bool>(&clash_sql)
            .bind(&record.key)
            .bind(&record.secret_key)
            .fetch_one(&mut *tx)
            .await?;
        if clash {
            return Err(AppError::Conflict(format!(
                "token of key {} is held by an active record",
                record.key
            )));
        }

        let insert_sql = format!(
            "INSERT INTO urls (key, secret_key, target_url) VALUES ($1, $2, $3) RETURNING {}",
            RECORD_COLUMNS
        );
        let inserted = sqlx::query_as::<_, UrlRecord>(&insert_sql)
            .bind(&record.key)
            .bind(&record.secret_key)
            .bind(&record.target_url)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn fetch_active(&self, field: KeyField, value: &str) -> AppResult<Option<UrlRecord>> {
        let sql = format!(
            "SELECT {} FROM urls WHERE {} AND {} = $1",
            RECORD_COLUMNS,
            ACTIVE_FILTER,
            field.column()
        );

        self.bounded(
            sqlx::query_as::<_, UrlRecord>(&sql)
                .bind(value)
                .fetch_optional(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl UrlStore for PgStore {
    async fn create(&self, record: &NewUrlRecord) -> AppResult<UrlRecord> {
        self.bounded(self.insert_exclusive(record)).await
    }

    async fn get_by_key(&self, key: &str) -> AppResult<Option<UrlRecord>> {
        self.fetch_active(KeyField::Key, key).await
    }

    async fn get_by_secret_key(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        self.fetch_active(KeyField::SecretKey, secret_key).await
    }

    async fn is_taken(&self, value: &str) -> AppResult<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM urls WHERE {} AND (key = $1 OR secret_key = $1))",
            ACTIVE_FILTER
        );

        self.bounded(
            sqlx::query_scalar::<_, bool>(&sql)
                .bind(value)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn increment_clicks(&self, id: i64) -> AppResult<()> {
        self.bounded(
            sqlx::query("UPDATE urls SET clicks = clicks + 1 WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn deactivate(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        let sql = format!(
            "UPDATE urls SET is_active = FALSE WHERE {} AND secret_key = $1 RETURNING {}",
            ACTIVE_FILTER, RECORD_COLUMNS
        );

        self.bounded(
            sqlx::query_as::<_, UrlRecord>(&sql)
                .bind(secret_key)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        let row = self
            .bounded(
                sqlx::query_as::<_, (i64, i64, i64)>(
                    r#"
                    SELECT
                        COUNT(*) AS total_urls,
                        COUNT(*) FILTER (WHERE is_active) AS active_urls,
                        COALESCE(CAST(SUM(clicks) AS BIGINT), 0) AS total_clicks
                    FROM urls
                    "#,
                )
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(StoreStats {
            total_urls: row.0,
            active_urls: row.1,
            total_clicks: row.2,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        self.bounded(sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool))
            .await?;
        Ok(())
    }
}
