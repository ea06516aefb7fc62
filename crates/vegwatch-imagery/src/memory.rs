//! In-memory imagery backend for development and testing.
//!
//! Every scene in a catalog shares one [`RasterGrid`]. Masked pixels are `None`.
//! Rendered thumbnails are kept in a bounded store that evicts the oldest entry.
//! Raster evaluation runs on the blocking thread pool.
//!
//! The catalog and rendered thumbnails use `RwLock::unwrap()` intentionally: lock
//! poisoning only happens after another thread panicked while holding the lock,
//! which is an unrecoverable state. For production workloads, use the Earth Engine
//! backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use geo::{Intersects, Rect};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, RwLock};
use vegwatch_core::error::{Result, VegwatchError};
use vegwatch_core::models::{ImageExpr, Region, SceneQuery, ThumbnailParams};
use vegwatch_core::ports::ImageryBackend;

/// One band of pixel values in row-major order
pub type Band = Vec<Option<f64>>;

/// Number of rendered thumbnails kept before the oldest is evicted
pub const DEFAULT_THUMBNAIL_CAPACITY: usize = 64;

fn default_gsd() -> f64 {
    10.0
}

/// Pixel layout shared by all scenes of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    /// Longitude of the west edge
    pub west: f64,
    /// Latitude of the north edge
    pub north: f64,
    /// Pixel width in degrees of longitude
    pub pixel_width: f64,
    /// Pixel height in degrees of latitude
    pub pixel_height: f64,
    pub width: usize,
    pub height: usize,
    /// Ground sampling distance of one pixel, in metres
    #[serde(default = "default_gsd")]
    pub gsd_meters: f64,
}

impl RasterGrid {
    /// One-degree world grid, for a catalog that starts empty
    pub fn global() -> Self {
        Self {
            west: -180.0,
            north: 90.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
            width: 360,
            height: 180,
            gsd_meters: 111_320.0,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(longitude, latitude)` of the pixel center
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.pixel_width,
            self.north - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            (self.west, self.north - self.height as f64 * self.pixel_height),
            (self.west + self.width as f64 * self.pixel_width, self.north),
        )
    }

    /// Pixels whose center falls inside `region`.
    ///
    /// Only pixels within the bounding window of `region` are tested.
    fn clip_mask(&self, region: &Region) -> Vec<bool> {
        let mut mask = vec![false; self.len()];
        if let Some((cols, rows)) = self.window(region) {
            for row in rows {
                for col in cols.clone() {
                    let (lon, lat) = self.pixel_center(col, row);
                    mask[row * self.width + col] = region.contains_lon_lat(lon, lat);
                }
            }
        }
        mask
    }

    /// Column and row ranges covering the bounding box of `region`
    fn window(
        &self,
        region: &Region,
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let rect = region.bounding_rect()?;
        let col_of =
            |lon: f64| ((lon - self.west) / self.pixel_width).clamp(0.0, self.width as f64);
        let row_of =
            |lat: f64| ((self.north - lat) / self.pixel_height).clamp(0.0, self.height as f64);

        let cols = col_of(rect.min().x).floor() as usize..col_of(rect.max().x).ceil() as usize;
        let rows = row_of(rect.max().y).floor() as usize..row_of(rect.min().y).ceil() as usize;

        if cols.is_empty() || rows.is_empty() {
            None
        } else {
            Some((cols, rows))
        }
    }
}

/// A scene with its catalog properties and band values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    pub collection: String,
    pub acquired: NaiveDate,
    /// Cloudy pixel percentage, 0 to 100
    pub cloud_cover: f64,
    pub bands: HashMap<String, Band>,
}

/// Fixture file layout: a grid and the scenes on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCatalog {
    pub grid: RasterGrid,
    #[serde(default)]
    pub scenes: Vec<SceneRecord>,
}

/// Rendered PNGs by id, evicting in insertion order once full
#[derive(Debug)]
struct ThumbnailStore {
    capacity: usize,
    order: VecDeque<String>,
    images: HashMap<String, Vec<u8>>,
}

impl ThumbnailStore {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            images: HashMap::new(),
        }
    }

    fn insert(&mut self, id: String, bytes: Vec<u8>) {
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.images.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(id.clone());
        self.images.insert(id, bytes);
    }

    fn get(&self, id: &str) -> Option<&Vec<u8>> {
        self.images.get(id)
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

/// In-memory implementation of ImageryBackend
#[derive(Debug, Clone)]
pub struct MemoryImageryBackend {
    grid: Arc<RasterGrid>,
    scenes: Arc<RwLock<Vec<SceneRecord>>>,
    thumbnails: Arc<RwLock<ThumbnailStore>>,
    public_base_url: String,
}

impl MemoryImageryBackend {
    /// Create an empty catalog. Thumbnail URLs are rooted at `public_base_url`.
    pub fn new(grid: RasterGrid, public_base_url: impl Into<String>) -> Self {
        Self {
            grid: Arc::new(grid),
            scenes: Arc::new(RwLock::new(Vec::new())),
            thumbnails: Arc::new(RwLock::new(ThumbnailStore::new(DEFAULT_THUMBNAIL_CAPACITY))),
            public_base_url: public_base_url.into(),
        }
    }

    /// Keep at most `capacity` rendered thumbnails (minimum 1)
    pub fn with_thumbnail_capacity(self, capacity: usize) -> Self {
        Self {
            thumbnails: Arc::new(RwLock::new(ThumbnailStore::new(capacity))),
            ..self
        }
    }

    pub fn from_catalog(
        catalog: SceneCatalog,
        public_base_url: impl Into<String>,
    ) -> Result<Self> {
        let backend = Self::new(catalog.grid, public_base_url);
        for scene in catalog.scenes {
            backend.add_scene(scene)?;
        }
        Ok(backend)
    }

    /// Load a JSON [`SceneCatalog`] fixture
    pub fn load_fixture<P: AsRef<Path>>(
        path: P,
        public_base_url: impl Into<String>,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog: SceneCatalog = serde_json::from_str(&content).map_err(|e| {
            VegwatchError::Serialization(format!(
                "Failed to parse scene catalog {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_catalog(catalog, public_base_url)
    }

    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    /// Add a scene; every band must match the grid size
    pub fn add_scene(&self, scene: SceneRecord) -> Result<()> {
        for (name, band) in &scene.bands {
            if band.len() != self.grid.len() {
                return Err(VegwatchError::Serialization(format!(
                    "Scene {} band {} has {} pixels, grid has {}",
                    scene.id,
                    name,
                    band.len(),
                    self.grid.len()
                )));
            }
        }
        self.scenes.write().unwrap().push(scene);
        Ok(())
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.read().unwrap().len()
    }

    pub fn thumbnail_count(&self) -> usize {
        self.thumbnails.read().unwrap().len()
    }

    fn retained_scenes(&self, query: &SceneQuery) -> Vec<SceneRecord> {
        let footprint = self.grid.bounds();
        if !footprint.intersects(query.region.polygon()) {
            return Vec::new();
        }

        self.scenes
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.collection == query.collection)
            .filter(|s| query.window.contains(s.acquired))
            .filter(|s| query.accepts_cloud_cover(s.cloud_cover))
            .cloned()
            .collect()
    }

    fn evaluate(&self, expr: &ImageExpr) -> Result<BTreeMap<String, Band>> {
        match expr {
            ImageExpr::MedianComposite { query } => {
                let scenes = self.retained_scenes(query);
                if scenes.is_empty() {
                    return Err(VegwatchError::backend(
                        "median_composite",
                        format!("no scenes in {} for {}", query.collection, query.window),
                    ));
                }
                let clip = self.grid.clip_mask(&query.region);
                Ok(median_composite(&scenes, &clip))
            }
            ImageExpr::NormalizedDifference { input, bands, name } => {
                let source = self.evaluate(input)?;
                let band = |band_name: &str| {
                    source.get(band_name).ok_or_else(|| {
                        VegwatchError::backend(
                            "normalized_difference",
                            format!("band {} not found", band_name),
                        )
                    })
                };
                let index = normalized_difference(band(&bands.positive)?, band(&bands.negative)?);
                Ok(BTreeMap::from([(name.clone(), index)]))
            }
            ImageExpr::Subtract {
                minuend,
                subtrahend,
                name,
            } => {
                let a = single_band(self.evaluate(minuend)?, "subtract")?;
                let b = single_band(self.evaluate(subtrahend)?, "subtract")?;
                let diff = a
                    .iter()
                    .zip(b.iter())
                    .map(|(a, b)| match (a, b) {
                        (Some(a), Some(b)) => Some(a - b),
                        _ => None,
                    })
                    .collect();
                Ok(BTreeMap::from([(name.clone(), diff)]))
            }
        }
    }

    fn encode_thumbnail(&self, band: &Band, params: &ThumbnailParams) -> Result<Vec<u8>> {
        let (cols, rows) = self.grid.window(&params.region).ok_or_else(|| {
            VegwatchError::backend("render_thumbnail", "region does not overlap the catalog grid")
        })?;

        let (src_w, src_h) = (cols.len(), rows.len());
        let scale = params.max_dimension as f64 / src_w.max(src_h) as f64;
        let out_w = ((src_w as f64 * scale).round() as u32).max(1);
        let out_h = ((src_h as f64 * scale).round() as u32).max(1);

        let image = RgbaImage::from_fn(out_w, out_h, |x, y| {
            let col = cols.start + (x as usize * src_w / out_w as usize).min(src_w - 1);
            let row = rows.start + (y as usize * src_h / out_h as usize).min(src_h - 1);
            let (lon, lat) = self.grid.pixel_center(col, row);

            match band[row * self.grid.width + col] {
                Some(value) if params.region.contains_lon_lat(lon, lat) => {
                    let color = params.palette.evaluate(params.normalize(value));
                    Rgba([color.r, color.g, color.b, 255])
                }
                _ => Rgba([0, 0, 0, 0]),
            }
        });

        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).map_err(|e| {
            VegwatchError::backend("render_thumbnail", format!("PNG encoding failed: {}", e))
        })?;
        Ok(bytes)
    }

    fn mean_of(&self, image: &ImageExpr, region: &Region, scale: f64) -> Result<Option<f64>> {
        let band = single_band(self.evaluate(image)?, "reduce_mean")?;
        let Some((cols, rows)) = self.grid.window(region) else {
            return Ok(None);
        };
        // Sample every `stride`-th pixel of the grid, not of the window
        let stride = (scale / self.grid.gsd_meters).round().max(1.0) as usize;

        let mut sum = 0.0;
        let mut count = 0usize;
        for row in rows.filter(|r| r % stride == 0) {
            for col in cols.clone().filter(|c| c % stride == 0) {
                let (lon, lat) = self.grid.pixel_center(col, row);
                if !region.contains_lon_lat(lon, lat) {
                    continue;
                }
                if let Some(value) = band[row * self.grid.width + col] {
                    sum += value;
                    count += 1;
                }
            }
        }

        Ok(if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        })
    }

    fn render(&self, image: &ImageExpr, params: &ThumbnailParams) -> Result<String> {
        let band = single_band(self.evaluate(image)?, "render_thumbnail")?;
        let bytes = self.encode_thumbnail(&band, params)?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        self.thumbnails.write().unwrap().insert(id.clone(), bytes);

        Ok(format!(
            "{}/api/thumbnails/{}",
            self.public_base_url.trim_end_matches('/'),
            id
        ))
    }
}

/// Run raster work on the blocking pool
async fn run_blocking<T, F>(operation: &'static str, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| VegwatchError::backend(operation, format!("Task join error: {}", e)))?
}

/// Per-band, per-pixel median over the scenes, ignoring pixels outside `clip`
fn median_composite(scenes: &[SceneRecord], clip: &[bool]) -> BTreeMap<String, Band> {
    let mut names: Vec<&String> = scenes.iter().flat_map(|s| s.bands.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let band = clip
                .iter()
                .enumerate()
                .map(|(i, inside)| {
                    if !inside {
                        return None;
                    }
                    let mut values: Vec<f64> = scenes
                        .iter()
                        .filter_map(|s| s.bands.get(name).and_then(|b| b[i]))
                        .filter(|v| v.is_finite())
                        .collect();
                    median(&mut values)
                })
                .collect();
            (name.clone(), band)
        })
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// `(a - b) / (a + b)`, masked where either input is masked or the sum is zero
fn normalized_difference(a: &Band, b: &Band) -> Band {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a + b != 0.0 => Some((a - b) / (a + b)),
            _ => None,
        })
        .collect()
}

fn single_band(mut bands: BTreeMap<String, Band>, operation: &str) -> Result<Band> {
    if bands.len() != 1 {
        return Err(VegwatchError::backend(
            operation,
            format!("expected a single-band image, got {} bands", bands.len()),
        ));
    }
    bands
        .pop_first()
        .map(|(_, band)| band)
        .ok_or_else(|| VegwatchError::backend(operation, "image has no bands"))
}

#[async_trait]
impl ImageryBackend for MemoryImageryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn count_scenes(&self, query: &SceneQuery) -> Result<usize> {
        Ok(self.retained_scenes(query).len())
    }

    async fn reduce_mean(
        &self,
        image: &ImageExpr,
        region: &Region,
        scale: f64,
    ) -> Result<Option<f64>> {
        let backend = self.clone();
        let (image, region) = (image.clone(), region.clone());
        run_blocking("reduce_mean", move || backend.mean_of(&image, &region, scale)).await
    }

    async fn render_thumbnail(
        &self,
        image: &ImageExpr,
        params: &ThumbnailParams,
    ) -> Result<String> {
        let backend = self.clone();
        let (image, params) = (image.clone(), params.clone());
        run_blocking("render_thumbnail", move || backend.render(&image, &params)).await
    }

    async fn thumbnail(&self, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.thumbnails.read().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use vegwatch_core::models::{BandPair, ColorRamp, ThumbnailFormat, TimeWindow};

    /// 4x4 grid over lon [0, 0.004], lat [0, 0.004]
    fn grid() -> RasterGrid {
        RasterGrid {
            west: 0.0,
            north: 0.004,
            pixel_width: 0.001,
            pixel_height: 0.001,
            width: 4,
            height: 4,
            gsd_meters: 10.0,
        }
    }

    fn whole_grid() -> Region {
        Region::from_lon_lat(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.004, y: 0.0 },
            Coord { x: 0.004, y: 0.004 },
            Coord { x: 0.0, y: 0.004 },
        ])
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn scene(id: &str, acquired: &str, cloud: f64, nir: f64, red: f64) -> SceneRecord {
        SceneRecord {
            id: id.to_string(),
            collection: "COPERNICUS/S2_SR".to_string(),
            acquired: date(acquired),
            cloud_cover: cloud,
            bands: HashMap::from([
                ("B8".to_string(), vec![Some(nir); 16]),
                ("B4".to_string(), vec![Some(red); 16]),
            ]),
        }
    }

    fn query(start: &str, end: &str) -> SceneQuery {
        SceneQuery::new("COPERNICUS/S2_SR", whole_grid(), TimeWindow::new(date(start), date(end)))
    }

    fn ndvi(query: SceneQuery, name: &str) -> ImageExpr {
        ImageExpr::NormalizedDifference {
            input: Box::new(ImageExpr::MedianComposite { query }),
            bands: BandPair::new("B8", "B4"),
            name: name.to_string(),
        }
    }

    fn backend_with(scenes: Vec<SceneRecord>) -> MemoryImageryBackend {
        MemoryImageryBackend::from_catalog(
            SceneCatalog {
                grid: grid(),
                scenes,
            },
            "http://localhost:3001",
        )
        .unwrap()
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_normalized_difference_masks_zero_sum() {
        let a = vec![Some(0.6), Some(0.0), None, Some(0.2)];
        let b = vec![Some(0.2), Some(0.0), Some(0.1), Some(-0.2)];
        let nd = normalized_difference(&a, &b);
        assert!((nd[0].unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(nd[1], None);
        assert_eq!(nd[2], None);
        assert_eq!(nd[3], None);
    }

    #[test]
    fn test_add_scene_rejects_wrong_band_size() {
        let backend = backend_with(vec![]);
        let mut bad = scene("s", "2023-01-05", 5.0, 0.5, 0.1);
        bad.bands.insert("B8".to_string(), vec![Some(0.5); 3]);
        assert!(backend.add_scene(bad).is_err());
        assert_eq!(backend.scene_count(), 0);
    }

    #[tokio::test]
    async fn test_count_applies_cloud_and_date_filters() {
        let backend = backend_with(vec![
            scene("clear", "2023-01-05", 5.0, 0.5, 0.1),
            scene("threshold", "2023-01-06", 20.0, 0.5, 0.1),
            scene("cloudy", "2023-01-07", 80.0, 0.5, 0.1),
            scene("end-day", "2023-01-31", 1.0, 0.5, 0.1),
            scene("start-day", "2023-01-01", 1.0, 0.5, 0.1),
        ]);

        let count = backend.count_scenes(&query("2023-01-01", "2023-01-31")).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_count_ignores_other_collections_and_regions() {
        let mut landsat = scene("l8", "2023-01-05", 1.0, 0.5, 0.1);
        landsat.collection = "LANDSAT/LC08".to_string();
        let backend = backend_with(vec![landsat, scene("s2", "2023-01-05", 1.0, 0.5, 0.1)]);

        assert_eq!(backend.count_scenes(&query("2023-01-01", "2023-02-01")).await.unwrap(), 1);

        let far_away = SceneQuery::new(
            "COPERNICUS/S2_SR",
            Region::from_lon_lat(vec![
                Coord { x: 50.0, y: 50.0 },
                Coord { x: 50.1, y: 50.0 },
                Coord { x: 50.1, y: 50.1 },
            ]),
            TimeWindow::new(date("2023-01-01"), date("2023-02-01")),
        );
        assert_eq!(backend.count_scenes(&far_away).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mean_of_ndvi_uses_median_composite() {
        // NDVI per scene: (0.5-0.1)/0.6 = 0.667, (0.3-0.3)/0.6 = 0, (0.9-0.1)/1.0 = 0.8
        // Band medians: NIR 0.5, RED 0.1 -> 0.667
        let backend = backend_with(vec![
            scene("a", "2023-01-05", 1.0, 0.5, 0.1),
            scene("b", "2023-01-10", 1.0, 0.3, 0.3),
            scene("c", "2023-01-15", 1.0, 0.9, 0.1),
        ]);

        let image = ndvi(query("2023-01-01", "2023-02-01"), "NDVI1");
        let mean = backend.reduce_mean(&image, &whole_grid(), 10.0).await.unwrap().unwrap();
        assert!((mean - 0.4 / 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_difference_mean_detects_loss() {
        let backend = backend_with(vec![
            scene("before", "2023-01-05", 1.0, 0.5, 0.1),
            scene("after", "2023-06-05", 1.0, 0.2, 0.2),
        ]);

        let diff = ImageExpr::Subtract {
            minuend: Box::new(ndvi(query("2023-06-01", "2023-06-30"), "NDVI2")),
            subtrahend: Box::new(ndvi(query("2023-01-01", "2023-01-31"), "NDVI1")),
            name: "NDVI_diff".to_string(),
        };

        let mean = backend.reduce_mean(&diff, &whole_grid(), 10.0).await.unwrap().unwrap();
        assert!((mean - (0.0 - 0.4 / 0.6)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fully_masked_region_reduces_to_none() {
        let backend = backend_with(vec![scene("dark", "2023-01-05", 1.0, 0.0, 0.0)]);
        let image = ndvi(query("2023-01-01", "2023-02-01"), "NDVI1");
        let mean = backend.reduce_mean(&image, &whole_grid(), 10.0).await.unwrap();
        assert_eq!(mean, None);
    }

    #[tokio::test]
    async fn test_reduce_rejects_multiband_image() {
        let backend = backend_with(vec![scene("a", "2023-01-05", 1.0, 0.5, 0.1)]);
        let composite = ImageExpr::MedianComposite {
            query: query("2023-01-01", "2023-02-01"),
        };
        let result = backend.reduce_mean(&composite, &whole_grid(), 10.0).await;
        assert!(matches!(result, Err(VegwatchError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_coarser_scale_samples_fewer_pixels() {
        let mut varied = scene("a", "2023-01-05", 1.0, 0.5, 0.1);
        // Only the top-left pixel of each 2x2 block is sampled at 20 m
        let nir: Band = (0..16).map(|i| Some(if i % 2 == 0 { 0.5 } else { 0.1 })).collect();
        varied.bands.insert("B8".to_string(), nir);
        let backend = backend_with(vec![varied]);

        let image = ndvi(query("2023-01-01", "2023-02-01"), "NDVI1");
        let fine = backend.reduce_mean(&image, &whole_grid(), 10.0).await.unwrap().unwrap();
        let coarse = backend.reduce_mean(&image, &whole_grid(), 20.0).await.unwrap().unwrap();
        assert!((fine - (0.4 / 0.6) / 2.0).abs() < 1e-9);
        assert!((coarse - 0.4 / 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_render_thumbnail_stores_png() {
        let backend = backend_with(vec![scene("a", "2023-01-05", 1.0, 0.5, 0.1)]);
        let image = ndvi(query("2023-01-01", "2023-02-01"), "NDVI1");
        let params = ThumbnailParams {
            min: -0.5,
            max: 0.5,
            palette: ColorRamp::loss_neutral_gain(),
            max_dimension: 64,
            region: whole_grid(),
            format: ThumbnailFormat::Png,
        };

        let url = backend.render_thumbnail(&image, &params).await.unwrap();
        assert!(url.starts_with("http://localhost:3001/api/thumbnails/"));

        let id = url.rsplit('/').next().unwrap();
        let bytes = backend.thumbnail(id).await.unwrap().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (64, 64));
        // NDVI 0.667 is past the top of the range: pure green
        assert_eq!(decoded.get_pixel(32, 32), &Rgba([0, 255, 0, 255]));

        assert!(backend.thumbnail("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thumbnail_store_evicts_oldest() {
        let backend = backend_with(vec![scene("a", "2023-01-05", 1.0, 0.5, 0.1)])
            .with_thumbnail_capacity(3);
        let image = ndvi(query("2023-01-01", "2023-02-01"), "NDVI1");
        let params = ThumbnailParams {
            min: -0.5,
            max: 0.5,
            palette: ColorRamp::loss_neutral_gain(),
            max_dimension: 8,
            region: whole_grid(),
            format: ThumbnailFormat::Png,
        };

        let mut ids = Vec::new();
        for _ in 0..5 {
            let url = backend.render_thumbnail(&image, &params).await.unwrap();
            ids.push(url.rsplit('/').next().unwrap().to_string());
        }

        assert_eq!(backend.thumbnail_count(), 3);
        assert!(backend.thumbnail(&ids[0]).await.unwrap().is_none());
        assert!(backend.thumbnail(&ids[1]).await.unwrap().is_none());
        for id in &ids[2..] {
            assert!(backend.thumbnail(id).await.unwrap().is_some());
        }
    }

    #[test]
    fn test_clip_mask_outside_window_is_empty() {
        let corner = Region::from_lon_lat(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.002, y: 0.0 },
            Coord { x: 0.002, y: 0.002 },
            Coord { x: 0.0, y: 0.002 },
        ]);
        let mask = grid().clip_mask(&corner);
        let inside: Vec<usize> = (0..16).filter(|&i| mask[i]).collect();
        // Bottom-left 2x2 block: rows 2-3, cols 0-1
        assert_eq!(inside, vec![8, 9, 12, 13]);

        let far_away = Region::from_lon_lat(vec![
            Coord { x: 50.0, y: 50.0 },
            Coord { x: 50.1, y: 50.0 },
            Coord { x: 50.1, y: 50.1 },
        ]);
        assert!(grid().clip_mask(&far_away).iter().all(|inside| !inside));
    }

    #[test]
    fn test_catalog_fixture_roundtrip() {
        let catalog = SceneCatalog {
            grid: grid(),
            scenes: vec![scene("a", "2023-01-05", 1.0, 0.5, 0.1)],
        };
        let json = serde_json::to_string(&catalog).unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let backend = MemoryImageryBackend::load_fixture(file.path(), "http://x").unwrap();
        assert_eq!(backend.scene_count(), 1);
        assert_eq!(backend.grid(), &grid());
    }
}
