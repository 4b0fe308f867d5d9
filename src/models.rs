use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Shortened URL as persisted by the store
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: i64,
    pub key: String,
    pub secret_key: String,
    pub target_url: String,
    pub is_active: bool,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a record; the store assigns id, counters and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUrlRecord {
    pub key: String,
    pub secret_key: String,
    pub target_url: String,
}

/// Role a token plays in a record: public key or admin secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    Key,
    SecretKey,
}

impl KeyField {
    pub fn column(self) -> &'static str {
        match self {
            KeyField::Key => "key",
            KeyField::SecretKey => "secret_key",
        }
    }
}

/// Request to create a short URL
#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub target_url: String,
}

/// Payload returned on creation and by the admin view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlInfoResponse {
    pub target_url: String,
    pub is_active: bool,
    pub clicks: i64,
    pub url: String,
    pub admin_url: String,
}

impl UrlInfoResponse {
    pub fn from_record(record: &UrlRecord, base_url: &str) -> Self {
        UrlInfoResponse {
            target_url: record.target_url.clone(),
            is_active: record.is_active,
            clicks: record.clicks,
            url: format!("{}/{}", base_url, record.key),
            admin_url: format!("{}/admin/{}", base_url, record.secret_key),
        }
    }
}

/// Response after deactivating a short URL
#[derive(Debug, Serialize, Deserialize)]
pub struct DeactivatedResponse {
    pub detail: String,
}

/// Aggregate counters reported by the admin CLI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub total_urls: i64,
    pub active_urls: i64,
    pub total_clicks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UrlRecord {
        UrlRecord {
            id: 7,
            key: "AB12C".to_string(),
            secret_key: "ZZ9Q0".to_string(),
            target_url: "https://example.com".to_string(),
            is_active: true,
            clicks: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_info_response_builds_public_and_admin_urls() {
        let info = UrlInfoResponse::from_record(&record(), "http://localhost:3000");

        assert_eq!(info.url, "http://localhost:3000/AB12C");
        assert_eq!(info.admin_url, "http://localhost:3000/admin/ZZ9Q0");
        assert_eq!(info.target_url, "https://example.com");
        assert_eq!(info.clicks, 3);
        assert!(info.is_active);
    }

    #[test]
    fn test_create_request_deserializes() {
        let request: CreateUrlRequest =
            serde_json::from_str(r#"{"target_url": "https://example.com"}"#).unwrap();
        assert_eq!(request.target_url, "https://example.com");

        assert!(serde_json::from_str::<CreateUrlRequest>(r#"{"url": "x"}"#).is_err());
    }

    #[test]
    fn test_key_field_columns() {
        assert_eq!(KeyField::Key.column(), "key");
        assert_eq!(KeyField::SecretKey.column(), "secret_key");
    }
}
