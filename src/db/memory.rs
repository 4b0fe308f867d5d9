use crate::error::{AppError, AppResult};
use crate::models::{KeyField, NewUrlRecord, StoreStats, UrlRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::UrlStore;

/// In-process store for development and tests.
///
/// Public keys and admin secrets of active records share a single token
/// index, so a token is held by at most one record in at most one role. A
/// slot is claimed through the entry API before the record becomes visible,
/// which means two creators racing for the same token cannot both succeed.
/// Slots are always claimed key first, then secret.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<i64, UrlRecord>,
    tokens: DashMap<String, (i64, KeyField)>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a token to its record, if it is held in `field` by an active record.
    fn find_active(&self, field: KeyField, value: &str) -> Option<UrlRecord> {
        let (id, held_as) = *self.tokens.get(value)?;
        if held_as != field {
            return None;
        }
        self.records
            .get(&id)
            .filter(|record| record.is_active)
            .map(|record| record.clone())
    }
}

#[async_trait]
impl UrlStore for MemoryStore {
    async fn create(&self, record: &NewUrlRecord) -> AppResult<UrlRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        match self.tokens.entry(record.key.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!("key {} is taken", record.key)));
            }
            Entry::Vacant(slot) => {
                slot.insert((id, KeyField::Key));
            }
        }

        match self.tokens.entry(record.secret_key.clone()) {
            Entry::Occupied(_) => {
                self.tokens
                    .remove_if(&record.key, |_, owner| *owner == (id, KeyField::Key));
                return Err(AppError::Conflict("secret key is taken".to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert((id, KeyField::SecretKey));
            }
        }

        let stored = UrlRecord {
            id,
            key: record.key.clone(),
            secret_key: record.secret_key.clone(),
            target_url: record.target_url.clone(),
            is_active: true,
            clicks: 0,
            created_at: Utc::now(),
        };
        self.records.insert(id, stored.clone());

        Ok(stored)
    }

    async fn get_by_key(&self, key: &str) -> AppResult<Option<UrlRecord>> {
        Ok(self.find_active(KeyField::Key, key))
    }

    async fn get_by_secret_key(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        Ok(self.find_active(KeyField::SecretKey, secret_key))
    }

    async fn is_taken(&self, value: &str) -> AppResult<bool> {
        Ok(self.tokens.contains_key(value))
    }

    async fn increment_clicks(&self, id: i64) -> AppResult<()> {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.clicks += 1;
        }
        Ok(())
    }

    async fn deactivate(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        let Some((_, (id, _))) = self
            .tokens
            .remove_if(secret_key, |_, &(_, held_as)| held_as == KeyField::SecretKey)
        else {
            return Ok(None);
        };

        let deactivated = self.records.get_mut(&id).map(|mut record| {
            record.is_active = false;
            record.clone()
        });

        if let Some(record) = &deactivated {
            self.tokens
                .remove_if(&record.key, |_, owner| *owner == (id, KeyField::Key));
        }

        Ok(deactivated)
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        let mut stats = StoreStats::default();
        for record in self.records.iter() {
            stats.total_urls += 1;
            stats.total_clicks += record.clicks;
            if record.is_active {
                stats.active_urls += 1;
            }
        }
        Ok(stats)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
