use vegwatch_core::error::Result;
use vegwatch_core::models::{
    AnalysisResult, ChangeScore, Classification, ColorRamp, ImageExpr, Region, ThumbnailFormat,
    ThumbnailParams,
};
use vegwatch_core::ports::ImageryBackend;

pub const LOSS_DETAILS: &str = "Significant vegetation decrease detected. \
    This could indicate illegal logging or land clearing.";
pub const NO_CHANGE_DETAILS: &str = "No significant changes in vegetation detected.";

/// Difference values mapped to the ends of the color ramp
pub const THUMBNAIL_RANGE: (f64, f64) = (-0.5, 0.5);
pub const THUMBNAIL_MAX_DIMENSION: u32 = 512;

/// Builds the final [`AnalysisResult`] and the rendered difference image
pub struct ResultAssembler<'a> {
    backend: &'a dyn ImageryBackend,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(backend: &'a dyn ImageryBackend) -> Self {
        Self { backend }
    }

    pub fn details(classification: Classification) -> &'static str {
        match classification {
            Classification::PossibleIllegal => LOSS_DETAILS,
            Classification::NoChange => NO_CHANGE_DETAILS,
        }
    }

    /// Red for loss, white for no change, green for gain, clipped to the region
    pub fn thumbnail_params(region: &Region) -> ThumbnailParams {
        ThumbnailParams {
            min: THUMBNAIL_RANGE.0,
            max: THUMBNAIL_RANGE.1,
            palette: ColorRamp::loss_neutral_gain(),
            max_dimension: THUMBNAIL_MAX_DIMENSION,
            region: region.clone(),
            format: ThumbnailFormat::Png,
        }
    }

    pub async fn assemble(
        &self,
        diff: &ImageExpr,
        region: &Region,
        score: ChangeScore,
        classification: Classification,
    ) -> Result<AnalysisResult> {
        let image_url =
            self.backend.render_thumbnail(diff, &Self::thumbnail_params(region)).await?;

        Ok(AnalysisResult {
            score,
            classification,
            details: Self::details(classification).to_string(),
            image_url,
        })
    }
}
