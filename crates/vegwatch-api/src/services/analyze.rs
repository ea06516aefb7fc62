use vegwatch_detect::{AnalysisRequest, ChangeDetectionPipeline};

use crate::dto::{AnalyzeRequest, AnalyzeResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Service for running change analyses
pub struct AnalyzeService;

impl AnalyzeService {
    /// Run the analysis and convert the result to the response body
    pub async fn execute(
        state: &AppState,
        request: AnalyzeRequest,
    ) -> Result<AnalyzeResponse, ApiError> {
        let pipeline = ChangeDetectionPipeline::new(state.backend.clone());
        let request = AnalysisRequest::from(request);

        let result = pipeline.execute(&request).await.map_err(|e| {
            if e.is_client_error() {
                tracing::warn!(error = %e, "Analysis rejected");
            } else {
                tracing::error!(error = %e, backend = state.backend.name(), "Analysis failed");
            }
            ApiError::from(e)
        })?;

        Ok(AnalyzeResponse::from(result))
    }
}
