//! Scene selection and median compositing for one analysis period.

use vegwatch_core::error::{Result, VegwatchError};
use vegwatch_core::models::{ImageExpr, Region, SceneQuery, TimeWindow};
use vegwatch_core::ports::ImageryBackend;

/// Sentinel-2 surface reflectance collection
pub const SCENE_COLLECTION: &str = "COPERNICUS/S2_SR";

/// Scene property holding the cloudy pixel percentage
pub const CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Scenes are retained only when strictly below this percentage
pub const MAX_CLOUD_COVER: f64 = 20.0;

pub struct SceneCompositor<'a> {
    backend: &'a dyn ImageryBackend,
}

impl<'a> SceneCompositor<'a> {
    pub fn new(backend: &'a dyn ImageryBackend) -> Self {
        Self { backend }
    }

    /// Catalog query for one period over `region`
    pub fn query(region: &Region, window: TimeWindow) -> SceneQuery {
        SceneQuery::new(SCENE_COLLECTION, region.clone(), window)
            .with_cloud_filter(CLOUD_PROPERTY, MAX_CLOUD_COVER)
    }

    /// Count the retained scenes of both periods, failing when either is empty.
    ///
    /// Both counts are requested concurrently and always reported in period order.
    pub async fn ensure_available(
        &self,
        before: &SceneQuery,
        after: &SceneQuery,
    ) -> Result<(usize, usize)> {
        let (period1, period2) =
            tokio::try_join!(self.backend.count_scenes(before), self.backend.count_scenes(after))?;

        tracing::info!(
            period1,
            period2,
            before = %before.window,
            after = %after.window,
            "Scene counts"
        );

        if period1 == 0 || period2 == 0 {
            return Err(VegwatchError::InsufficientData { period1, period2 });
        }

        Ok((period1, period2))
    }

    /// Median composite of the retained scenes
    pub async fn composite(&self, query: &SceneQuery) -> Result<ImageExpr> {
        self.backend.median_composite(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geo::Coord;

    #[test]
    fn test_query_uses_sentinel_cloud_filter() {
        let region = Region::from_lon_lat(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ]);
        let window = TimeWindow::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
        );
        let query = SceneCompositor::query(&region, window);

        assert_eq!(query.collection, "COPERNICUS/S2_SR");
        assert_eq!(query.cloud_property, "CLOUDY_PIXEL_PERCENTAGE");
        assert!(query.accepts_cloud_cover(19.9));
        assert!(!query.accepts_cloud_cover(20.0));
        assert_eq!(query.window, window);
    }
}
