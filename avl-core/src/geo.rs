//! Geodesic helpers
//!
//! Positions are plain latitude/longitude pairs in degrees. Distances use the
//! haversine formula on a spherical Earth, which is accurate to well under a
//! meter at the scales the track filter cares about.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single position, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Shapefile X (longitude)
    pub fn x(&self) -> f64 {
        self.longitude
    }

    /// Shapefile Y (latitude)
    pub fn y(&self) -> f64 {
        self.latitude
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self, other)
    }
}

/// Great-circle distance between two coordinates in meters.
///
/// Always non-negative and symmetric; zero when both coordinates are equal.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let sin_dphi = (delta_phi / 2.0).sin();
    let sin_dlambda = (delta_lambda / 2.0).sin();
    let h = sin_dphi * sin_dphi + phi1.cos() * phi2.cos() * sin_dlambda * sin_dlambda;
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Axis-aligned bounding box in shapefile axis order (X = longitude, Y = latitude)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Compute the box around `points`, or `None` if there are none
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let init = BoundingBox {
            min_x: first.x(),
            min_y: first.y(),
            max_x: first.x(),
            max_y: first.y(),
        };
        Some(points[1..].iter().fold(init, |bbox, p| BoundingBox {
            min_x: bbox.min_x.min(p.x()),
            min_y: bbox.min_y.min(p.y()),
            max_x: bbox.max_x.max(p.x()),
            max_y: bbox.max_y.max(p.y()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coordinate::new(35.7, 51.4);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(35.70, 51.40);
        let b = Coordinate::new(35.71, 51.41);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // ~111.2km per degree on a 6371km sphere
        let a = Coordinate::new(35.0, 139.0);
        let b = Coordinate::new(36.0, 139.0);
        let d = a.distance_to(&b);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_small_offset_on_equator() {
        // 0.00001 degrees of longitude at the equator is ~1.11m
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 0.00001);
        let d = a.distance_to(&b);
        assert!(d > 1.0 && d < 1.2, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = a.distance_to(&b);
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_bounding_box() {
        let points = [
            Coordinate::new(35.70, 51.40),
            Coordinate::new(35.72, 51.39),
            Coordinate::new(35.71, 51.41),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.min_x, 51.39);
        assert_eq!(bbox.max_x, 51.41);
        assert_eq!(bbox.min_y, 35.70);
        assert_eq!(bbox.max_y, 35.72);
    }

    #[test]
    fn test_coordinate_json() {
        let p = Coordinate::new(35.7, 51.4);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json, serde_json::json!({"latitude": 35.7, "longitude": 51.4}));

        let back: Coordinate =
            serde_json::from_str(r#"{"longitude": 51.4, "latitude": 35.7}"#).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
