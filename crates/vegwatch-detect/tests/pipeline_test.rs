//! Change detection pipeline tests against scripted and in-memory backends

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vegwatch_core::error::{Result, VegwatchError};
use vegwatch_core::models::{
    Classification, ImageExpr, LatLng, Region, SceneQuery, ThumbnailParams,
};
use vegwatch_core::ports::ImageryBackend;
use vegwatch_core::ValidationError;
use vegwatch_detect::{AnalysisRequest, ChangeDetectionPipeline};
use vegwatch_imagery::memory::{MemoryImageryBackend, RasterGrid, SceneCatalog, SceneRecord};

/// Backend returning canned answers and recording every evaluation call
struct ScriptedBackend {
    counts: HashMap<NaiveDate, usize>,
    mean: Option<f64>,
    calls: Mutex<Vec<String>>,
    reduced: Mutex<Vec<(ImageExpr, f64)>>,
    rendered: Mutex<Vec<ThumbnailParams>>,
}

impl ScriptedBackend {
    fn new(jan_scenes: usize, jun_scenes: usize, mean: Option<f64>) -> Self {
        Self {
            counts: HashMap::from([
                (date("2023-01-01"), jan_scenes),
                (date("2023-06-01"), jun_scenes),
            ]),
            mean,
            calls: Mutex::new(Vec::new()),
            reduced: Mutex::new(Vec::new()),
            rendered: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageryBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn count_scenes(&self, query: &SceneQuery) -> Result<usize> {
        self.calls.lock().unwrap().push(format!("count_scenes {}", query.window));
        assert_eq!(query.collection, "COPERNICUS/S2_SR");
        assert_eq!(query.cloud_property, "CLOUDY_PIXEL_PERCENTAGE");
        assert_eq!(query.max_cloud_cover, 20.0);
        Ok(self.counts.get(&query.window.start).copied().unwrap_or(0))
    }

    async fn reduce_mean(
        &self,
        image: &ImageExpr,
        _region: &Region,
        scale: f64,
    ) -> Result<Option<f64>> {
        self.calls.lock().unwrap().push("reduce_mean".to_string());
        self.reduced.lock().unwrap().push((image.clone(), scale));
        Ok(self.mean)
    }

    async fn render_thumbnail(
        &self,
        _image: &ImageExpr,
        params: &ThumbnailParams,
    ) -> Result<String> {
        self.calls.lock().unwrap().push("render_thumbnail".to_string());
        self.rendered.lock().unwrap().push(params.clone());
        Ok("https://thumbnails.test/diff.png".to_string())
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Roughly 1 km square at the equator
fn square_km() -> Vec<LatLng> {
    vec![
        LatLng::new(0.0, 0.0),
        LatLng::new(0.0, 0.009),
        LatLng::new(0.009, 0.009),
        LatLng::new(0.009, 0.0),
    ]
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(square_km())
        .with_before("2023-01-01", "2023-01-31")
        .with_after("2023-06-01", "2023-06-30")
}

async fn run(
    backend: &Arc<ScriptedBackend>,
    request: &AnalysisRequest,
) -> Result<vegwatch_core::models::AnalysisResult> {
    let pipeline = ChangeDetectionPipeline::new(backend.clone());
    pipeline.execute(request).await
}

#[tokio::test]
async fn test_vegetation_loss_is_flagged() {
    let backend = Arc::new(ScriptedBackend::new(6, 4, Some(-0.35)));
    let result = run(&backend, &request()).await.unwrap();

    assert_eq!(result.classification, Classification::PossibleIllegal);
    assert!((result.score.value() + 0.35).abs() < 1e-12);
    assert!(!result.image_url.is_empty());
    assert!(result.details.contains("vegetation decrease"));
}

#[tokio::test]
async fn test_small_increase_is_no_change() {
    let backend = Arc::new(ScriptedBackend::new(6, 4, Some(0.05)));
    let result = run(&backend, &request()).await.unwrap();

    assert_eq!(result.classification, Classification::NoChange);
    assert!((result.score.value() - 0.05).abs() < 1e-12);
    assert_eq!(result.details, "No significant changes in vegetation detected.");
}

#[tokio::test]
async fn test_reduction_receives_difference_recipe() {
    let backend = Arc::new(ScriptedBackend::new(6, 4, Some(-0.1)));
    run(&backend, &request()).await.unwrap();

    let reduced = backend.reduced.lock().unwrap();
    assert_eq!(reduced.len(), 1);
    let (image, scale) = &reduced[0];
    assert_eq!(*scale, 10.0);

    let (minuend, subtrahend, name) = match image {
        ImageExpr::Subtract {
            minuend,
            subtrahend,
            name,
        } => (minuend, subtrahend, name),
        other => panic!("expected a difference image, got {:?}", other),
    };
    assert_eq!(name, "NDVI_diff");
    assert_eq!(minuend.band_name(), Some("NDVI2"));
    assert_eq!(subtrahend.band_name(), Some("NDVI1"));

    let ImageExpr::NormalizedDifference { input, bands, .. } = minuend.as_ref() else {
        panic!("expected an index image");
    };
    assert_eq!((bands.positive.as_str(), bands.negative.as_str()), ("B8", "B4"));
    let ImageExpr::MedianComposite { query } = input.as_ref() else {
        panic!("expected a composite");
    };
    assert_eq!(query.window.start, date("2023-06-01"));

    let rendered = backend.rendered.lock().unwrap();
    assert_eq!(rendered[0].max_dimension, 512);
    assert_eq!((rendered[0].min, rendered[0].max), (-0.5, 0.5));
}

#[tokio::test]
async fn test_too_few_points_rejected_before_backend() {
    let backend = Arc::new(ScriptedBackend::new(6, 4, Some(-0.35)));
    let mut req = request();
    req.polygon.truncate(2);

    let err = run(&backend, &req).await.unwrap_err();
    assert!(matches!(err, VegwatchError::Validation(ValidationError::TooFewPoints { found: 2 })));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_missing_or_invalid_date_rejected_before_backend() {
    let backend = Arc::new(ScriptedBackend::new(6, 4, Some(-0.35)));

    let mut missing = request();
    missing.start_date2 = None;
    let err = run(&backend, &missing).await.unwrap_err();
    assert!(matches!(
        err,
        VegwatchError::Validation(ValidationError::MissingDate {
            field: "startDate2",
        })
    ));

    let mut invalid = request();
    invalid.end_date1 = Some("January 31st".to_string());
    let err = run(&backend, &invalid).await.unwrap_err();
    assert!(matches!(err, VegwatchError::Validation(ValidationError::InvalidDate { .. })));

    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_empty_after_period_reports_both_counts() {
    let backend = Arc::new(ScriptedBackend::new(5, 0, Some(-0.35)));
    let err = run(&backend, &request()).await.unwrap_err();

    assert!(matches!(
        err,
        VegwatchError::InsufficientData {
            period1: 5,
            period2: 0
        }
    ));
    assert!(err.to_string().contains("Period 1: 5 images, Period 2: 0 images"));

    // Only the counts were evaluated
    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.starts_with("count_scenes")));
}

#[tokio::test]
async fn test_empty_before_period_is_insufficient() {
    let backend = Arc::new(ScriptedBackend::new(0, 3, Some(-0.35)));
    let err = run(&backend, &request()).await.unwrap_err();
    assert!(matches!(
        err,
        VegwatchError::InsufficientData {
            period1: 0,
            period2: 3
        }
    ));
}

#[tokio::test]
async fn test_fully_masked_region_is_no_valid_pixels() {
    let backend = Arc::new(ScriptedBackend::new(2, 2, None));
    let err = run(&backend, &request()).await.unwrap_err();
    assert!(matches!(err, VegwatchError::NoValidPixels));
    assert!(!backend.calls().contains(&"render_thumbnail".to_string()));
}

fn memory_scene(id: &str, acquired: &str, nir: f64, red: f64) -> SceneRecord {
    SceneRecord {
        id: id.to_string(),
        collection: "COPERNICUS/S2_SR".to_string(),
        acquired: date(acquired),
        cloud_cover: 3.0,
        bands: HashMap::from([
            ("B8".to_string(), vec![Some(nir); 100]),
            ("B4".to_string(), vec![Some(red); 100]),
        ]),
    }
}

#[tokio::test]
async fn test_memory_backend_end_to_end() {
    let grid = RasterGrid {
        west: 0.0,
        north: 0.009,
        pixel_width: 0.0009,
        pixel_height: 0.0009,
        width: 10,
        height: 10,
        gsd_meters: 100.0,
    };
    let mut cloudy = memory_scene("cloudy", "2023-06-12", 0.9, 0.1);
    cloudy.cloud_cover = 65.0;

    let catalog = SceneCatalog {
        grid,
        scenes: vec![
            memory_scene("jan-a", "2023-01-04", 0.5, 0.1),
            memory_scene("jan-b", "2023-01-19", 0.5, 0.1),
            memory_scene("jun-a", "2023-06-08", 0.3, 0.2),
            cloudy,
        ],
    };
    let backend =
        Arc::new(MemoryImageryBackend::from_catalog(catalog, "http://localhost:3001").unwrap());

    let pipeline = ChangeDetectionPipeline::new(backend.clone());
    let result = pipeline.execute(&request()).await.unwrap();

    // NDVI 0.667 in January, 0.2 in June
    let expected = 0.1 / 0.5 - 0.4 / 0.6;
    assert!((result.score.value() - expected).abs() < 1e-9);
    assert_eq!(result.classification, Classification::PossibleIllegal);

    let id = result.image_url.strip_prefix("http://localhost:3001/api/thumbnails/").unwrap();
    let png = backend.thumbnail(id).await.unwrap().unwrap();
    assert!(png.starts_with(b"\x89PNG"));
}
