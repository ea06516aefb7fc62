//! Geometry types for analysis regions.
//!
//! Clients submit points as `{latitude, longitude}` records; the imagery backend
//! works in `(x, y) = (longitude, latitude)` order. [`Region`] always stores the
//! backend order.

use geo::{Area, BoundingRect, Contains, Coord, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// A client-submitted WGS 84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Backend coordinate order: `(longitude, latitude)`
    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A single-ring polygon in backend coordinate order, closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    polygon: Polygon<f64>,
}

impl Region {
    /// Build a region from points already in `(longitude, latitude)` order.
    ///
    /// The ring is closed by repeating the first point when needed.
    pub fn from_lon_lat(coords: Vec<Coord<f64>>) -> Self {
        Self {
            polygon: Polygon::new(LineString::new(coords), vec![]),
        }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Exterior ring as `[longitude, latitude]` pairs, including the closing point
    pub fn ring(&self) -> Vec<[f64; 2]> {
        self.polygon.exterior().coords().map(|c| [c.x, c.y]).collect()
    }

    /// Planar area in squared degrees. Zero means the ring is degenerate.
    pub fn planar_area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    /// Whether the location `(longitude, latitude)` falls inside the ring
    pub fn contains_lon_lat(&self, longitude: f64, latitude: f64) -> bool {
        self.polygon.contains(&Point::new(longitude, latitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlng_to_coord_swaps_axes() {
        let coord = LatLng::new(10.0, 20.0).to_coord();
        assert_eq!(coord.x, 20.0);
        assert_eq!(coord.y, 10.0);
    }

    #[test]
    fn test_region_closes_ring() {
        let region = Region::from_lon_lat(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ]);
        let ring = region.ring();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_region_contains() {
        let region = Region::from_lon_lat(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 0.0 },
            Coord { x: 2.0, y: 2.0 },
            Coord { x: 0.0, y: 2.0 },
        ]);
        assert!(region.contains_lon_lat(1.0, 1.0));
        assert!(!region.contains_lon_lat(3.0, 1.0));
        assert!((region.planar_area() - 4.0).abs() < 1e-12);
    }
}
