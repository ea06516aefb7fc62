use serde::Serialize;
use vegwatch_core::models::{AnalysisResult, Classification};

/// Analyze response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub ndvi_difference: f64,
    pub status: Classification,
    pub image_url: String,
    pub details: String,
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            ndvi_difference: result.score.value(),
            status: result.classification,
            image_url: result.image_url,
            details: result.details,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub backend: &'static str,
}

impl HealthResponse {
    pub fn ok(backend: &'static str) -> Self {
        Self {
            status: "ok",
            service: "vegwatch-api",
            backend,
        }
    }
}
