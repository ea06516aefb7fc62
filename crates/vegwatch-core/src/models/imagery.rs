//! Lazy image recipes and rendering parameters.
//!
//! An [`ImageExpr`] describes how an image is derived from a scene catalog without
//! touching any pixels. Backends evaluate recipes only when a scalar or a rendered
//! thumbnail is requested, the same deferred model hosted geospatial services use.

use crate::models::{Region, TimeWindow};

/// Catalog filter for one period
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    /// Named scene collection, e.g. `COPERNICUS/S2_SR`
    pub collection: String,
    /// Scenes must intersect this region; retained scenes are clipped to it
    pub region: Region,
    pub window: TimeWindow,
    /// Scene property holding the cloud percentage
    pub cloud_property: String,
    /// Scenes are retained only when `cloud_property < max_cloud_cover`
    pub max_cloud_cover: f64,
}

impl SceneQuery {
    pub fn new(collection: impl Into<String>, region: Region, window: TimeWindow) -> Self {
        Self {
            collection: collection.into(),
            region,
            window,
            cloud_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            max_cloud_cover: 20.0,
        }
    }

    pub fn with_cloud_filter(mut self, property: impl Into<String>, max_cloud_cover: f64) -> Self {
        self.cloud_property = property.into();
        self.max_cloud_cover = max_cloud_cover;
        self
    }

    /// Cloud filter as applied by every backend: strictly below the threshold
    pub fn accepts_cloud_cover(&self, cloud_cover: f64) -> bool {
        cloud_cover < self.max_cloud_cover
    }
}

/// Bands feeding a normalized difference: `(positive - negative) / (positive + negative)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPair {
    pub positive: String,
    pub negative: String,
}

impl BandPair {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }
}

/// Deferred image computation
#[derive(Debug, Clone, PartialEq)]
pub enum ImageExpr {
    /// Per-band median of the scenes matching the query, each clipped to the query region
    MedianComposite { query: SceneQuery },
    /// Single band `name` computed from two bands of `input`. Masked where the band sum is zero.
    NormalizedDifference {
        input: Box<ImageExpr>,
        bands: BandPair,
        name: String,
    },
    /// Single band `name` holding `minuend - subtrahend`, masked where either is masked
    Subtract {
        minuend: Box<ImageExpr>,
        subtrahend: Box<ImageExpr>,
        name: String,
    },
}

impl ImageExpr {
    /// Name of the output band for single-band recipes
    pub fn band_name(&self) -> Option<&str> {
        match self {
            ImageExpr::MedianComposite { .. } => None,
            ImageExpr::NormalizedDifference { name, .. } | ImageExpr::Subtract { name, .. } => {
                Some(name)
            }
        }
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Evenly spaced color stops over a value range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    stops: Vec<Rgb>,
}

impl ColorRamp {
    /// Red for loss, white for neutral, green for gain
    pub fn loss_neutral_gain() -> Self {
        Self {
            stops: vec![Rgb::new(0xff, 0, 0), Rgb::new(0xff, 0xff, 0xff), Rgb::new(0, 0xff, 0)],
        }
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.stops.iter().map(|c| c.to_hex()).collect()
    }

    /// Color at normalized position `t`, clamped to `[0, 1]`
    pub fn evaluate(&self, t: f64) -> Rgb {
        let last = self.stops.len() - 1;
        if last == 0 || t <= 0.0 || t.is_nan() {
            return self.stops[0];
        }
        if t >= 1.0 {
            return self.stops[last];
        }
        let scaled = t * last as f64;
        let index = (scaled.floor() as usize).min(last - 1);
        self.stops[index].lerp(self.stops[index + 1], scaled - index as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailFormat {
    #[default]
    Png,
}

impl ThumbnailFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "PNG",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "image/png",
        }
    }
}

/// Static rendering request for a single-band image
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    /// Value mapped to the first palette color
    pub min: f64,
    /// Value mapped to the last palette color
    pub max: f64,
    pub palette: ColorRamp,
    /// Size of the longer output side, in pixels
    pub max_dimension: u32,
    /// Rendered extent; pixels outside are transparent
    pub region: Region,
    pub format: ThumbnailFormat,
}

impl ThumbnailParams {
    /// Position of `value` within `[min, max]`
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        (value - self.min) / (self.max - self.min)
    }
}
