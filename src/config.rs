use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub keys: KeyConfig,
    pub url: UrlConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which [`UrlStore`](crate::db::UrlStore) implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Configuration(format!(
                "Invalid STORE_BACKEND '{}', expected 'postgres' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub query_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Length of both the public key and the secret key
    pub length: usize,
    /// Upper bound on generation attempts, for pre-checks and insert conflicts alike
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    /// Prefix for public and admin URLs, without trailing slash
    pub base_url: String,
    pub track_clicks: bool,
    /// Only accept http:// and https:// targets
    pub strict_url_validation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u64,
    pub burst_size: u32,
    /// Key clients by `X-Forwarded-For`/`X-Real-IP`; only safe behind a proxy
    /// that overwrites them
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

/// Read an optional variable and parse it, falling back to `default`.
fn parse_or<T, F>(lookup: &F, name: &str, default: &str) -> AppResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("Invalid {}", name)))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port: u16 = parse_or(&lookup, "SERVER_PORT", "3000")?;

        let backend: StoreBackend = lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;
        let database_url = lookup("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(AppError::MissingEnvVar("DATABASE_URL".to_string()));
        }
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", "10")?;
        let db_min_connections = parse_or(&lookup, "DB_MIN_CONNECTIONS", "1")?;
        let db_acquire_timeout = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", "5")?;
        let db_query_timeout = parse_or(&lookup, "DB_QUERY_TIMEOUT_SECONDS", "5")?;

        let key_length = parse_or(&lookup, "KEY_LENGTH", "5")?;
        let key_max_attempts = parse_or(&lookup, "KEY_MAX_ATTEMPTS", "10")?;

        let base_url = lookup("BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
            .trim_end_matches('/')
            .to_string();
        let track_clicks = parse_or(&lookup, "TRACK_CLICKS", "true")?;
        let strict_url_validation = parse_or(&lookup, "STRICT_URL_VALIDATION", "true")?;

        // Rate limit config
        let requests_per_minute = parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", "30")?;
        let burst_size = parse_or(&lookup, "RATE_LIMIT_BURST", "10")?;
        let trust_proxy_headers = parse_or(&lookup, "TRUST_PROXY_HEADERS", "false")?;

        // CORS config
        let allowed_origins_str = lookup("ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());
        let allowed_origins: Vec<String> = if allowed_origins_str == "*" {
            vec!["*".to_string()]
        } else {
            allowed_origins_str
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "Invalid LOG_FORMAT '{}'",
                    other
                )))
            }
        };

        let config = Config {
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
                acquire_timeout_seconds: db_acquire_timeout,
                query_timeout_seconds: db_query_timeout,
            },
            keys: KeyConfig {
                length: key_length,
                max_attempts: key_max_attempts,
            },
            url: UrlConfig {
                base_url,
                track_clicks,
                strict_url_validation,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute,
                burst_size,
                trust_proxy_headers,
            },
            cors: CorsConfig { allowed_origins },
            log: LogConfig { format: log_format },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        // Validate database settings
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::Configuration(
                "DB_MIN_CONNECTIONS cannot be greater than DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.database.acquire_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "DB_ACQUIRE_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.database.query_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "DB_QUERY_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        // Keys longer than the column width would never insert
        if self.keys.length < 4 || self.keys.length > 16 {
            return Err(AppError::Configuration(
                "KEY_LENGTH must be between 4 and 16".to_string(),
            ));
        }

        if self.keys.max_attempts < 1 || self.keys.max_attempts > 100 {
            return Err(AppError::Configuration(
                "KEY_MAX_ATTEMPTS must be between 1 and 100".to_string(),
            ));
        }

        url::Url::parse(&self.url.base_url)
            .map_err(|e| AppError::Configuration(format!("Invalid BASE_URL: {}", e)))?;

        // Validate rate limiting settings
        if self.rate_limit.requests_per_minute == 0 || self.rate_limit.requests_per_minute > 60_000
        {
            return Err(AppError::Configuration(
                "RATE_LIMIT_PER_MINUTE must be between 1 and 60000".to_string(),
            ));
        }

        if self.rate_limit.burst_size == 0 {
            return Err(AppError::Configuration(
                "RATE_LIMIT_BURST must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
