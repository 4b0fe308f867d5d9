//! URL record persistence.
//!
//! [`UrlStore`] is the seam between the link service and storage. Keys and
//! secrets are drawn from one alphabet, so both backends treat them as a single
//! token space: among active records a token is held at most once, as either a
//! `key` or a `secret_key`. The backends enforce this themselves, so a racing
//! pair of creators surfaces as
//! [`AppError::Conflict`](crate::error::AppError::Conflict) from `create`
//! rather than as duplicate rows. Every read path only ever sees active
//! records.

pub mod memory;
pub mod postgres;

use crate::error::AppResult;
use crate::models::{NewUrlRecord, StoreStats, UrlRecord};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage contract for shortened URLs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Insert a new active record. Fails with `Conflict` when the key or the
    /// secret key is already held by an active record, in either role.
    async fn create(&self, record: &NewUrlRecord) -> AppResult<UrlRecord>;

    /// Active record with the given public key
    async fn get_by_key(&self, key: &str) -> AppResult<Option<UrlRecord>>;

    /// Active record with the given admin secret
    async fn get_by_secret_key(&self, secret_key: &str) -> AppResult<Option<UrlRecord>>;

    /// Whether an active record already uses `value` as its key or its secret
    async fn is_taken(&self, value: &str) -> AppResult<bool>;

    /// Atomically bump the click counter of a record
    async fn increment_clicks(&self, id: i64) -> AppResult<()>;

    /// Soft-delete the active record holding `secret_key`, returning it.
    async fn deactivate(&self, secret_key: &str) -> AppResult<Option<UrlRecord>>;

    /// Totals across all records, active or not
    async fn stats(&self) -> AppResult<StoreStats>;

    /// Cheap connectivity probe
    async fn ping(&self) -> AppResult<()>;
}
