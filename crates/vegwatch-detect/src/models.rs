use serde::{Deserialize, Serialize};
use vegwatch_core::models::{LatLng, TimeWindow};

/// Raw analysis input, as submitted by a client
///
/// Dates are kept as the strings the client sent; they are validated and
/// normalized by [`TemporalWindowParser`](crate::TemporalWindowParser).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Polygon vertices in client order
    pub polygon: Vec<LatLng>,
    pub start_date1: Option<String>,
    pub end_date1: Option<String>,
    pub start_date2: Option<String>,
    pub end_date2: Option<String>,
}

impl AnalysisRequest {
    pub fn new(polygon: Vec<LatLng>) -> Self {
        Self {
            polygon,
            ..Default::default()
        }
    }

    /// Set the "before" period
    pub fn with_before(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date1 = Some(start.into());
        self.end_date1 = Some(end.into());
        self
    }

    /// Set the "after" period
    pub fn with_after(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date2 = Some(start.into());
        self.end_date2 = Some(end.into());
        self
    }
}

/// The two validated analysis periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindows {
    pub before: TimeWindow,
    pub after: TimeWindow,
}
