use vegwatch_core::error::Result;
use vegwatch_core::models::{BandPair, ImageExpr};
use vegwatch_core::ports::ImageryBackend;

/// Sentinel-2 near-infrared band
pub const NIR_BAND: &str = "B8";
/// Sentinel-2 red band
pub const RED_BAND: &str = "B4";

/// Index band of the "before" composite
pub const BEFORE_BAND: &str = "NDVI1";
/// Index band of the "after" composite
pub const AFTER_BAND: &str = "NDVI2";

/// Computes NDVI = (NIR - RED) / (NIR + RED) on composites.
///
/// Pixels with a zero band sum are masked by the backend; values are not clamped.
pub struct VegetationIndexEngine<'a> {
    backend: &'a dyn ImageryBackend,
}

impl<'a> VegetationIndexEngine<'a> {
    pub fn new(backend: &'a dyn ImageryBackend) -> Self {
        Self { backend }
    }

    pub fn bands() -> BandPair {
        BandPair::new(NIR_BAND, RED_BAND)
    }

    /// NDVI of `composite` as a single band called `name`
    pub async fn ndvi(&self, composite: &ImageExpr, name: &str) -> Result<ImageExpr> {
        self.backend.normalized_difference(composite, &Self::bands(), name).await
    }
}
