use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use vegwatch_core::models::ThumbnailFormat;

use crate::error::ApiError;
use crate::state::AppState;

/// Serve a thumbnail rendered by the in-memory backend
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.backend.thumbnail(&id).await? {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, ThumbnailFormat::Png.mime_type())], bytes)),
        None => Err(ApiError::not_found("Thumbnail not found")),
    }
}
