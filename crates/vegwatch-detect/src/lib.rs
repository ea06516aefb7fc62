//! VegWatch Detect - Vegetation change detection pipeline
//!
//! This crate implements the analysis use case: validating the region and time
//! windows, compositing scenes, computing the vegetation index difference and
//! classifying the result. All pixel work is delegated to an
//! [`ImageryBackend`](vegwatch_core::ports::ImageryBackend).

pub mod assembler;
pub mod change;
pub mod compositor;
pub mod geometry;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod temporal;

pub use assembler::ResultAssembler;
pub use change::ChangeAnalyzer;
pub use compositor::SceneCompositor;
pub use geometry::GeometryValidator;
pub use index::VegetationIndexEngine;
pub use models::{AnalysisRequest, AnalysisWindows};
pub use pipeline::ChangeDetectionPipeline;
pub use temporal::TemporalWindowParser;
