//! VegWatch Imagery - Imagery backend adapters
//!
//! This crate provides the [`ImageryBackend`](vegwatch_core::ports::ImageryBackend)
//! implementations: a hosted Earth Engine client and an in-memory raster catalog.

pub mod earthengine;
pub mod memory;

pub use earthengine::{EarthEngineBackend, EarthEngineConfig};
pub use memory::{MemoryImageryBackend, RasterGrid, SceneCatalog, SceneRecord};
