use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BandPair, ImageExpr, Region, SceneQuery, ThumbnailParams};

/// Port for the geospatial service that holds the scene catalog and does the pixel work.
///
/// Composite and index-math capabilities build lazy [`ImageExpr`] recipes and never
/// contact the service; counting, reduction, and rendering evaluate them remotely.
/// Implementations must bound every remote call with a timeout and report it as
/// [`VegwatchError::BackendTimeout`](crate::VegwatchError::BackendTimeout).
#[async_trait]
pub trait ImageryBackend: Send + Sync {
    /// Short identifier used in logs and health output
    fn name(&self) -> &'static str;

    /// Number of scenes retained by the catalog, date, and cloud filters
    async fn count_scenes(&self, query: &SceneQuery) -> Result<usize>;

    /// Per-band median of the retained scenes, each clipped to the query region
    async fn median_composite(&self, query: &SceneQuery) -> Result<ImageExpr> {
        Ok(ImageExpr::MedianComposite {
            query: query.clone(),
        })
    }

    /// Normalized difference of two bands, as a single band called `name`
    async fn normalized_difference(
        &self,
        image: &ImageExpr,
        bands: &BandPair,
        name: &str,
    ) -> Result<ImageExpr> {
        Ok(ImageExpr::NormalizedDifference {
            input: Box::new(image.clone()),
            bands: bands.clone(),
            name: name.to_string(),
        })
    }

    /// Per-pixel `minuend - subtrahend`, as a single band called `name`
    async fn subtract(
        &self,
        minuend: &ImageExpr,
        subtrahend: &ImageExpr,
        name: &str,
    ) -> Result<ImageExpr> {
        Ok(ImageExpr::Subtract {
            minuend: Box::new(minuend.clone()),
            subtrahend: Box::new(subtrahend.clone()),
            name: name.to_string(),
        })
    }

    /// Unweighted mean of a single-band image over `region`, sampled every `scale`
    /// metres. `None` when no unmasked pixel was sampled.
    async fn reduce_mean(&self, image: &ImageExpr, region: &Region, scale: f64)
        -> Result<Option<f64>>;

    /// Render a single-band image and return a URL the client can fetch
    async fn render_thumbnail(&self, image: &ImageExpr, params: &ThumbnailParams)
        -> Result<String>;

    /// Bytes of a thumbnail this process rendered itself, if the backend keeps any
    async fn thumbnail(&self, _id: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
