use serde::Deserialize;
use vegwatch_core::models::LatLng;
use vegwatch_detect::AnalysisRequest;

/// Analyze request body
///
/// Fields are optional so that missing values are reported by validation with the
/// name of the field, rather than as a generic body error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub polygon: Vec<LatLng>,
    pub start_date1: Option<String>,
    pub end_date1: Option<String>,
    pub start_date2: Option<String>,
    pub end_date2: Option<String>,
}

impl From<AnalyzeRequest> for AnalysisRequest {
    fn from(request: AnalyzeRequest) -> Self {
        AnalysisRequest {
            polygon: request.polygon,
            start_date1: request.start_date1,
            end_date1: request.end_date1,
            start_date2: request.start_date2,
            end_date2: request.end_date2,
        }
    }
}
