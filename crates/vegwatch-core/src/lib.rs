//! VegWatch Core - Domain models, configuration, and the imagery backend port
//!
//! This crate contains the domain types shared by the change-detection pipeline,
//! the imagery backend adapters, and the HTTP API.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{Result, ValidationError, VegwatchError};
