use crate::error::AppResult;
use crate::models::{DeactivatedResponse, UrlInfoResponse};
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::Json;
use std::sync::Arc;

use super::helpers::url_not_found;
use super::AppState;

/// Inspect a short URL through its admin secret
pub async fn get_url_info(
    State(state): State<Arc<AppState>>,
    Path(secret_key): Path<String>,
    uri: Uri,
) -> AppResult<Json<UrlInfoResponse>> {
    let record = state
        .links
        .admin_info(&secret_key)
        .await?
        .ok_or_else(|| url_not_found(&state.base_url, &uri))?;

    Ok(Json(UrlInfoResponse::from_record(&record, &state.base_url)))
}

/// Deactivate a short URL through its admin secret
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(secret_key): Path<String>,
    uri: Uri,
) -> AppResult<Json<DeactivatedResponse>> {
    let record = state
        .links
        .deactivate(&secret_key)
        .await?
        .ok_or_else(|| url_not_found(&state.base_url, &uri))?;

    Ok(Json(DeactivatedResponse {
        detail: format!(
            "Successfully deleted shortened URL for '{}'",
            record.target_url
        ),
    }))
}
