use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Length of one degree of latitude, or of longitude at the equator
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64, name: String) -> Location {
        Location {
            name: name,
            latitude: lat,
            longitude: lon,
        }
    }

    /// GeoJSON ordered position, longitude first
    pub fn lnglat(&self) -> Vec<f64> {
        vec![self.longitude, self.latitude]
    }

    /// Great circle distance in meters
    pub fn distance(&self, other: &Location) -> f64 {
        let source_lat = self.latitude.to_radians();
        let dest_lat = other.latitude.to_radians();

        // Compute using the haversine formula
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + source_lat.cos() * dest_lat.cos() * (d_lon * 0.5).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        c * EARTH_RADIUS_METERS
    }

    /// Axis aligned box test, each axis compared independently against the tolerance in degrees
    pub fn within_box(&self, other: &Location, tolerance_degrees: f64) -> bool {
        (self.latitude - other.latitude).abs() <= tolerance_degrees
            && (self.longitude - other.longitude).abs() <= tolerance_degrees
    }
}
