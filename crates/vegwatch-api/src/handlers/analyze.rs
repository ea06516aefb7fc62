use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::dto::{AnalyzeRequest, AnalyzeResponse};
use crate::error::ApiError;
use crate::services::AnalyzeService;
use crate::state::AppState;

pub async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload?;

    tracing::info!(
        points = request.polygon.len(),
        start_date1 = request.start_date1.as_deref().unwrap_or(""),
        end_date1 = request.end_date1.as_deref().unwrap_or(""),
        start_date2 = request.start_date2.as_deref().unwrap_or(""),
        end_date2 = request.end_date2.as_deref().unwrap_or(""),
        "Processing analyze request"
    );

    let response = AnalyzeService::execute(&state, request).await?;

    Ok(Json(response))
}
