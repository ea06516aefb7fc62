//! Polygon validation.
//!
//! Turns client `{latitude, longitude}` points into a closed [`Region`] in backend
//! `(longitude, latitude)` order.

use vegwatch_core::models::{LatLng, Region};
use vegwatch_core::ValidationError;

/// Validates and converts client polygons
pub struct GeometryValidator;

impl GeometryValidator {
    /// Fewest vertices accepted, excluding the closing point
    pub const MIN_POINTS: usize = 3;

    /// Validate `points` and build the analysis region.
    ///
    /// Self-intersection and duplicate vertices are not checked.
    pub fn validate(points: &[LatLng]) -> Result<Region, ValidationError> {
        if points.len() < Self::MIN_POINTS {
            return Err(ValidationError::TooFewPoints {
                found: points.len(),
            });
        }

        for (index, point) in points.iter().enumerate() {
            Self::check_point(index, point)?;
        }

        let region = Region::from_lon_lat(points.iter().map(|p| p.to_coord()).collect());
        if region.planar_area() == 0.0 {
            return Err(ValidationError::DegenerateRing);
        }

        Ok(region)
    }

    fn check_point(index: usize, point: &LatLng) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidCoordinate { index, reason };

        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            return Err(invalid("has a non-finite coordinate".to_string()));
        }
        if !(-90.0..=90.0).contains(&point.latitude) {
            return Err(invalid(format!("latitude {} is outside [-90, 90]", point.latitude)));
        }
        if !(-180.0..=180.0).contains(&point.longitude) {
            return Err(invalid(format!("longitude {} is outside [-180, 180]", point.longitude)));
        }
        Ok(())
    }
}
