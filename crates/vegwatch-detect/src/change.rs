//! Index differencing, spatial reduction and classification.

use vegwatch_core::error::{Result, VegwatchError};
use vegwatch_core::models::{ChangeScore, Classification, ImageExpr, Region};
use vegwatch_core::ports::ImageryBackend;

/// Band holding `after - before`
pub const DIFF_BAND: &str = "NDVI_diff";

/// Ground sampling distance of the reduction, in metres
pub const REDUCTION_SCALE_METERS: f64 = 10.0;

/// Mean differences strictly below this are flagged
pub const LOSS_THRESHOLD: f64 = -0.2;

pub struct ChangeAnalyzer<'a> {
    backend: &'a dyn ImageryBackend,
}

impl<'a> ChangeAnalyzer<'a> {
    pub fn new(backend: &'a dyn ImageryBackend) -> Self {
        Self { backend }
    }

    /// Per-pixel `after - before`
    pub async fn difference(&self, after: &ImageExpr, before: &ImageExpr) -> Result<ImageExpr> {
        self.backend.subtract(after, before, DIFF_BAND).await
    }

    /// Unweighted mean of the difference over `region`
    pub async fn mean_change(&self, diff: &ImageExpr, region: &Region) -> Result<ChangeScore> {
        self.backend
            .reduce_mean(diff, region, REDUCTION_SCALE_METERS)
            .await?
            .map(ChangeScore)
            .ok_or(VegwatchError::NoValidPixels)
    }

    pub fn classify(score: ChangeScore) -> Classification {
        if score.value() < LOSS_THRESHOLD {
            Classification::PossibleIllegal
        } else {
            Classification::NoChange
        }
    }
}
