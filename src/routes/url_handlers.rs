use crate::error::AppResult;
use crate::models::{CreateUrlRequest, UrlInfoResponse};
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Redirect};
use std::sync::Arc;

use super::helpers::url_not_found;
use super::AppState;

/// Create a short URL. The target is validated by the link service.
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUrlRequest>,
) -> AppResult<impl IntoResponse> {
    let record = state.links.create_link(&payload.target_url).await?;
    let response = UrlInfoResponse::from_record(&record, &state.base_url);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Resolve a short URL and redirect
pub async fn forward_to_target_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    uri: Uri,
) -> AppResult<Redirect> {
    match state.links.resolve(&key).await? {
        Some(record) => Ok(Redirect::temporary(&record.target_url)),
        None => Err(url_not_found(&state.base_url, &uri)),
    }
}
