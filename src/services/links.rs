use crate::config::{KeyConfig, UrlConfig};
use crate::db::UrlStore;
use crate::error::{AppError, AppResult};
use crate::models::{NewUrlRecord, UrlRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url as UrlParser;
use validator::ValidateUrl;

use super::keygen;

/// Creation, lookup and deactivation of shortened links.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn UrlStore>,
    key_length: usize,
    max_attempts: u32,
    strict_url_validation: bool,
    track_clicks: bool,
}

impl LinkService {
    pub fn new(store: Arc<dyn UrlStore>, keys: &KeyConfig, url: &UrlConfig) -> Self {
        Self {
            store,
            key_length: keys.length,
            max_attempts: keys.max_attempts,
            strict_url_validation: url.strict_url_validation,
            track_clicks: url.track_clicks,
        }
    }

    pub fn store(&self) -> &Arc<dyn UrlStore> {
        &self.store
    }

    /// Reject anything that is not a well-formed absolute URL. In strict mode
    /// only http and https targets with a host are accepted.
    ///
    /// The target is stored verbatim and later sent back as a `Location`
    /// header, so whitespace and control characters are refused outright even
    /// though the URL parser would silently strip or escape them.
    pub fn validate_target_url(&self, target_url: &str) -> AppResult<()> {
        if target_url
            .chars()
            .any(|c| c.is_control() || c.is_whitespace())
        {
            debug!(target_url, "Rejected target URL with whitespace or control characters");
            return Err(AppError::InvalidUrl);
        }

        if !target_url.validate_url() {
            debug!(target_url, "Rejected malformed target URL");
            return Err(AppError::InvalidUrl);
        }

        if self.strict_url_validation {
            let parsed = UrlParser::parse(target_url).map_err(|_| AppError::InvalidUrl)?;
            let web_scheme = matches!(parsed.scheme(), "http" | "https");
            if !web_scheme || parsed.host_str().is_none() {
                debug!(target_url, "Rejected non-web target URL");
                return Err(AppError::InvalidUrl);
            }
        }

        Ok(())
    }

    /// Shorten `target_url`.
    ///
    /// Keys are pre-checked against the store, but the insert is what decides:
    /// a `Conflict` from `create` means another writer won the race, and both
    /// keys are regenerated. Gives up after `max_attempts` inserts.
    pub async fn create_link(&self, target_url: &str) -> AppResult<UrlRecord> {
        self.validate_target_url(target_url)?;

        let store = self.store.as_ref();
        for attempt in 1..=self.max_attempts {
            let key = keygen::generate_unique_key(store, self.key_length, self.max_attempts).await?;
            let secret_key =
                keygen::generate_unique_secret_key(store, &key, self.key_length, self.max_attempts)
                    .await?;

            let new_record = NewUrlRecord {
                key,
                secret_key,
                target_url: target_url.to_string(),
            };

            match store.create(&new_record).await {
                Ok(record) => {
                    info!(id = record.id, key = %record.key, "Created short URL");
                    return Ok(record);
                }
                Err(AppError::Conflict(detail)) => {
                    warn!(attempt, %detail, "Key taken at insert time, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::KeyGenerationExhausted(self.max_attempts))
    }

    /// Look up the active record behind a public key and count the visit.
    ///
    /// A failed click update is logged and does not block the redirect.
    pub async fn resolve(&self, key: &str) -> AppResult<Option<UrlRecord>> {
        if !keygen::is_well_formed_key(key, self.key_length) {
            return Ok(None);
        }

        let Some(record) = self.store.get_by_key(key).await? else {
            return Ok(None);
        };

        if self.track_clicks {
            if let Err(e) = self.store.increment_clicks(record.id).await {
                warn!(id = record.id, error = %e, "Failed to record click");
            }
        }

        Ok(Some(record))
    }

    /// Active record for an admin secret
    pub async fn admin_info(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        if !keygen::is_well_formed_key(secret_key, self.key_length) {
            return Ok(None);
        }
        self.store.get_by_secret_key(secret_key).await
    }

    /// Soft-delete the record owning `secret_key`
    pub async fn deactivate(&self, secret_key: &str) -> AppResult<Option<UrlRecord>> {
        if !keygen::is_well_formed_key(secret_key, self.key_length) {
            return Ok(None);
        }

        let deactivated = self.store.deactivate(secret_key).await?;
        if let Some(record) = &deactivated {
            info!(id = record.id, key = %record.key, "Deactivated short URL");
        }
        Ok(deactivated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockUrlStore};
    use crate::services::keygen::KEY_ALPHABET;
    use chrono::Utc;

    fn key_config() -> KeyConfig {
        KeyConfig {
            length: 5,
            max_attempts: 3,
        }
    }

    fn url_config() -> UrlConfig {
        UrlConfig {
            base_url: "http://localhost:3000".to_string(),
            track_clicks: true,
            strict_url_validation: true,
        }
    }

    fn memory_service() -> (LinkService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = LinkService::new(store.clone(), &key_config(), &url_config());
        (service, store)
    }

    fn stored(new_record: &NewUrlRecord) -> UrlRecord {
        UrlRecord {
            id: 1,
            key: new_record.key.clone(),
            secret_key: new_record.secret_key.clone(),
            target_url: new_record.target_url.clone(),
            is_active: true,
            clicks: 0,
            created_at: Utc::now(),
        }
    }

    fn follows_key_rule(key: &str) -> bool {
        key.len() == 5 && key.chars().all(|c| KEY_ALPHABET.contains(&c))
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_store() {
        // no expectations: any store call would panic
        let store = MockUrlStore::new();
        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());

        let err = service.create_link("not a url").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidUrl));
    }

    #[tokio::test]
    async fn test_invalid_url_persists_nothing() {
        let (service, store) = memory_service();

        assert!(service.create_link("not a url").await.is_err());
        assert_eq!(store.stats().await.unwrap().total_urls, 0);
    }

    #[test]
    fn test_strict_validation_rejects_non_web_schemes() {
        let (service, _) = memory_service();

        assert!(service.validate_target_url("https://example.com").is_ok());
        assert!(service
            .validate_target_url("http://localhost:8080/path?q=1")
            .is_ok());
        assert!(service.validate_target_url("ftp://example.com").is_err());
        assert!(service.validate_target_url("example.com").is_err());
        assert!(service.validate_target_url("").is_err());
    }

    #[test]
    fn test_whitespace_and_control_characters_are_rejected() {
        let (service, _) = memory_service();
        let lenient = LinkService::new(
            Arc::new(MemoryStore::new()),
            &key_config(),
            &UrlConfig {
                strict_url_validation: false,
                ..url_config()
            },
        );

        for target in [
            "https://exa\nmple.com/",
            "https://example.com/a\u{1}b",
            "https://example.com/a b",
            "https://example.com/\t",
            " https://example.com",
            "https://example.com/\r\nSet-Cookie: x=1",
        ] {
            assert!(service.validate_target_url(target).is_err(), "{:?}", target);
            assert!(lenient.validate_target_url(target).is_err(), "{:?}", target);
        }

        assert!(service
            .validate_target_url("https://example.com/a%20b?q=%01")
            .is_ok());
    }

    #[tokio::test]
    async fn test_resolve_rejects_keys_of_other_lengths() {
        let mut store = MockUrlStore::new();
        store.expect_get_by_key().never();
        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());

        assert!(service.resolve("AAAA").await.unwrap().is_none());
        assert!(service.resolve("AAAAAA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_link() {
        let (service, _) = memory_service();

        let record = service.create_link("https://example.com").await.unwrap();

        assert_eq!(record.target_url, "https://example.com");
        assert_ne!(record.key, record.secret_key);
        assert!(follows_key_rule(&record.key));
        assert!(follows_key_rule(&record.secret_key));
        assert!(record.is_active);
        assert_eq!(record.clicks, 0);
    }

    #[tokio::test]
    async fn test_resolve_and_admin_lookup() {
        let (service, _) = memory_service();
        let record = service.create_link("https://example.com").await.unwrap();

        let resolved = service.resolve(&record.key).await.unwrap().unwrap();
        assert_eq!(resolved.target_url, "https://example.com");

        let admin = service.admin_info(&record.secret_key).await.unwrap().unwrap();
        assert_eq!(admin.id, record.id);

        // the public key is not an admin credential, and vice versa
        assert!(service.admin_info(&record.key).await.unwrap().is_none());
        assert!(service.resolve(&record.secret_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_public_key_never_unlocks_another_link() {
        // two-symbol tokens leave little room, so a key landing on another
        // link's secret would be common without the cross-role check
        let service = LinkService::new(
            Arc::new(MemoryStore::new()),
            &KeyConfig {
                length: 2,
                max_attempts: 50,
            },
            &url_config(),
        );

        let mut records = Vec::new();
        for i in 0..200 {
            records.push(
                service
                    .create_link(&format!("https://example.com/{}", i))
                    .await
                    .unwrap(),
            );
        }

        for record in &records {
            assert!(service.admin_info(&record.key).await.unwrap().is_none());
        }
        let keys: std::collections::HashSet<_> = records.iter().map(|r| &r.key).collect();
        assert!(records.iter().all(|r| !keys.contains(&r.secret_key)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_key() {
        let (service, _) = memory_service();
        service.create_link("https://example.com").await.unwrap();

        // lowercase can never be generated
        assert!(service.resolve("zzzzz").await.unwrap().is_none());
        assert!(service.resolve("Z9Z9Z9Z9Z9Z9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_counts_clicks() {
        let (service, _) = memory_service();
        let record = service.create_link("https://example.com").await.unwrap();

        for _ in 0..3 {
            service.resolve(&record.key).await.unwrap();
        }

        let admin = service.admin_info(&record.secret_key).await.unwrap().unwrap();
        assert_eq!(admin.clicks, 3);
    }

    #[tokio::test]
    async fn test_deactivate_hides_link() {
        let (service, _) = memory_service();
        let record = service.create_link("https://example.com").await.unwrap();

        assert!(service.deactivate(&record.secret_key).await.unwrap().is_some());
        assert!(service.resolve(&record.key).await.unwrap().is_none());
        assert!(service.admin_info(&record.secret_key).await.unwrap().is_none());
        assert!(service.deactivate(&record.secret_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_retries_on_insert_conflict() {
        let mut store = MockUrlStore::new();
        store.expect_is_taken().returning(|_| Ok(false));
        let mut inserts = 0;
        store.expect_create().times(2).returning(move |new_record| {
            inserts += 1;
            if inserts == 1 {
                Err(AppError::Conflict("duplicate key".into()))
            } else {
                Ok(stored(new_record))
            }
        });

        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());
        let record = service.create_link("https://example.com").await.unwrap();
        assert_eq!(record.target_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_create_gives_up_after_bounded_conflicts() {
        let mut store = MockUrlStore::new();
        store.expect_is_taken().returning(|_| Ok(false));
        store
            .expect_create()
            .times(3)
            .returning(|_| Err(AppError::Conflict("duplicate key".into())));

        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());
        let err = service.create_link("https://example.com").await.unwrap_err();
        assert!(matches!(err, AppError::KeyGenerationExhausted(3)));
    }

    #[tokio::test]
    async fn test_store_outage_on_create_is_surfaced() {
        let mut store = MockUrlStore::new();
        store.expect_is_taken().returning(|_| Ok(false));
        store
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::StoreUnavailable("timed out".into())));

        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());
        let err = service.create_link("https://example.com").await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_click_failure_does_not_block_resolve() {
        let mut store = MockUrlStore::new();
        store.expect_get_by_key().returning(|key| {
            Ok(Some(stored(&NewUrlRecord {
                key: key.to_string(),
                secret_key: "SSSSS".to_string(),
                target_url: "https://example.com".to_string(),
            })))
        });
        store
            .expect_increment_clicks()
            .times(1)
            .returning(|_| Err(AppError::StoreUnavailable("timed out".into())));

        let service = LinkService::new(Arc::new(store), &key_config(), &url_config());
        let record = service.resolve("AAAAA").await.unwrap().unwrap();
        assert_eq!(record.target_url, "https://example.com");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creations_stay_unique() {
        let store = Arc::new(MemoryStore::new());
        let service = LinkService::new(
            store.clone(),
            &KeyConfig {
                length: 4,
                max_attempts: 20,
            },
            &url_config(),
        );

        let handles: Vec<_> = (0..200)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_link(&format!("https://example.com/{}", i))
                        .await
                })
            })
            .collect();

        let mut keys = std::collections::HashSet::new();
        let mut secrets = std::collections::HashSet::new();
        for handle in handles {
            let record = handle.await.unwrap().unwrap();
            assert!(keys.insert(record.key));
            assert!(secrets.insert(record.secret_key));
        }
        assert_eq!(store.stats().await.unwrap().active_urls, 200);
    }
}
