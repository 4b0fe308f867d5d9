use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    #[error("URL '{0}' doesn't exist")]
    UrlNotFound(String),

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Could not generate a free key after {0} attempts")]
    KeyGenerationExhausted(u32),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment variable missing: {0}")]
    MissingEnvVar(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error means the store could not be reached, as opposed to
    /// the store answering with a failure.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Sort driver errors into the taxonomy the services reason about: unique
/// violations become `Conflict`, connectivity failures become
/// `StoreUnavailable`, everything else stays a plain database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(db_err.message().to_string());
            }
        }

        if matches!(
            err,
            sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::WorkerCrashed
        ) {
            return AppError::StoreUnavailable(err.to_string());
        }

        AppError::Database(err)
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match &self {
            AppError::UrlNotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), "NOT_FOUND"),
            AppError::InvalidUrl => (StatusCode::BAD_REQUEST, self.to_string(), "INVALID_URL"),
            AppError::Conflict(detail) => {
                tracing::warn!("Conflict escaped retry loop: {}", detail);
                (
                    StatusCode::CONFLICT,
                    "Key already in use".to_string(),
                    "CONFLICT",
                )
            }
            AppError::KeyGenerationExhausted(attempts) => {
                tracing::error!("Key generation exhausted after {} attempts", attempts);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Could not allocate a short key, try again later".to_string(),
                    "KEY_SPACE_EXHAUSTED",
                )
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is temporarily unavailable".to_string(),
                    "STORE_UNAVAILABLE",
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    "DATABASE_ERROR",
                )
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Migration error occurred".to_string(),
                    "MIGRATION_ERROR",
                )
            }
            _ => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };

        let body = json!({
            "error": error_code,
            "message": error_message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for AppResult
pub type AppResult<T> = Result<T, AppError>;
