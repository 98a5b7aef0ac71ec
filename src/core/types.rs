//! Core data types shared by the estimators and the POI tracker

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geodetic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether latitude and longitude fall inside their valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.latitude, self.longitude)
    }
}

/// Raw compass reading as delivered by the heading sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    pub raw_heading_deg: f32,
    pub timestamp: f64,
}

/// Smoothed heading published by the heading provider on each new sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingReading {
    /// Unfiltered sensor heading (degrees)
    pub raw_heading: f32,
    /// Smoothed heading in [0, 360)
    pub filtered_heading: f32,
    /// Angular velocity of the smoothing filter (degrees per second)
    pub filtered_velocity: f32,
    /// Sample timestamp (seconds)
    pub timestamp: f64,
}

/// GPS fix published by the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: GeoCoordinate,
    /// Altitude above the reference ellipsoid (meters)
    pub altitude: f32,
    /// Horizontal accuracy radius (meters)
    pub horizontal_accuracy: f32,
    /// Vertical accuracy (meters)
    pub vertical_accuracy: f32,
    /// Fix timestamp (seconds)
    pub timestamp: f64,
}

/// Camera/device pose in the AR world frame, supplied by the AR platform each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePose {
    /// World position; Y is up, Z is the AR session's forward axis
    pub position: Vector3<f32>,
    /// Rotation around the Y axis (degrees)
    pub yaw_deg: f32,
}

impl DevicePose {
    pub fn new(position: Vector3<f32>, yaw_deg: f32) -> Self {
        Self { position, yaw_deg }
    }

    /// Device position projected onto the ground plane (Y = 0)
    pub fn ground_position(&self) -> Vector3<f32> {
        Vector3::new(self.position.x, 0.0, self.position.z)
    }
}

impl Default for DevicePose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            yaw_deg: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_display() {
        let coord = GeoCoordinate::new(66.503, 25.7295);
        assert_eq!(format!("{}", coord), "(66.503000°, 25.729500°)");
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(GeoCoordinate::new(90.0, -180.0).is_valid());
        assert!(!GeoCoordinate::new(90.5, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn test_ground_position_drops_height() {
        let pose = DevicePose::new(Vector3::new(1.0, 1.6, -2.0), 45.0);
        assert_eq!(pose.ground_position(), Vector3::new(1.0, 0.0, -2.0));
    }
}
