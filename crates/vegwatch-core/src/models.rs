pub mod analysis;
pub mod geometry;
pub mod imagery;
pub mod window;

pub use analysis::{AnalysisResult, ChangeScore, Classification};
pub use geometry::{LatLng, Region};
pub use imagery::{
    BandPair, ColorRamp, ImageExpr, Rgb, SceneQuery, ThumbnailFormat, ThumbnailParams,
};
pub use window::TimeWindow;
