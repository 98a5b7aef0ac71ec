//! Scripted sensor sources for testing and the demo walk

use crate::core::GeoCoordinate;
use crate::hardware::{CompassSource, GpsSource, LocationServiceStatus, RawFix};
use rand::Rng;
use std::cell::Cell;

/// Compass that reports whatever heading the test last set
#[derive(Debug, Clone)]
pub struct MockCompass {
    enabled: bool,
    heading: f32,
    timestamp: f64,
    noise_amplitude: f32,
}

impl MockCompass {
    pub fn new() -> Self {
        Self {
            enabled: false,
            heading: 0.0,
            timestamp: 0.0,
            noise_amplitude: 0.0,
        }
    }

    /// Publish a new reading
    pub fn set_reading(&mut self, heading: f32, timestamp: f64) {
        self.heading = heading;
        self.timestamp = timestamp;
    }

    /// Add uniform noise of ±`amplitude_deg` to every reported heading
    pub fn simulate_noise(&mut self, amplitude_deg: f32) {
        self.noise_amplitude = amplitude_deg.abs();
    }
}

impl Default for MockCompass {
    fn default() -> Self {
        Self::new()
    }
}

impl CompassSource for MockCompass {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn true_heading(&self) -> f32 {
        if self.noise_amplitude > 0.0 {
            let mut rng = rand::thread_rng();
            let noise = rng.gen_range(-self.noise_amplitude..=self.noise_amplitude);
            (self.heading + noise).rem_euclid(360.0)
        } else {
            self.heading
        }
    }
}

/// Location service with scripted status and fixes
#[derive(Debug, Clone)]
pub struct MockGps {
    enabled_by_user: bool,
    status: LocationServiceStatus,
    status_after_startup: LocationServiceStatus,
    initializing_checks: Cell<u32>,
    last_fix: Option<RawFix>,
    start_calls: u32,
    stop_calls: u32,
    requested_accuracy: Option<(f32, f32)>,
}

impl MockGps {
    /// A service that is enabled and starts running immediately
    pub fn new() -> Self {
        Self {
            enabled_by_user: true,
            status: LocationServiceStatus::Stopped,
            status_after_startup: LocationServiceStatus::Running,
            initializing_checks: Cell::new(0),
            last_fix: None,
            start_calls: 0,
            stop_calls: 0,
            requested_accuracy: None,
        }
    }

    pub fn set_enabled_by_user(&mut self, enabled: bool) {
        self.enabled_by_user = enabled;
    }

    /// Report `Initializing` for this many status checks after `start`, then `outcome`
    pub fn with_startup(mut self, initializing_checks: u32, outcome: LocationServiceStatus) -> Self {
        self.initializing_checks = Cell::new(initializing_checks);
        self.status_after_startup = outcome;
        self
    }

    pub fn set_status(&mut self, status: LocationServiceStatus) {
        self.status = status;
        self.initializing_checks.set(0);
    }

    pub fn push_fix(&mut self, fix: RawFix) {
        self.last_fix = Some(fix);
    }

    /// Publish a fix with equal horizontal and vertical accuracy
    pub fn push_coordinate(&mut self, coordinate: GeoCoordinate, accuracy: f32, timestamp: f64) {
        self.push_fix(RawFix {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            altitude: 0.0,
            horizontal_accuracy: accuracy,
            vertical_accuracy: accuracy,
            timestamp,
        });
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls
    }

    pub fn stop_calls(&self) -> u32 {
        self.stop_calls
    }

    /// Accuracy and update distance passed to the last `start`
    pub fn requested_accuracy(&self) -> Option<(f32, f32)> {
        self.requested_accuracy
    }
}

impl Default for MockGps {
    fn default() -> Self {
        Self::new()
    }
}

impl GpsSource for MockGps {
    fn is_enabled_by_user(&self) -> bool {
        self.enabled_by_user
    }

    fn start(&mut self, desired_accuracy_m: f32, update_distance_m: f32) {
        self.start_calls += 1;
        self.requested_accuracy = Some((desired_accuracy_m, update_distance_m));
        self.status = if self.initializing_checks.get() > 0 {
            LocationServiceStatus::Initializing
        } else {
            self.status_after_startup
        };
    }

    fn stop(&mut self) {
        self.stop_calls += 1;
        self.status = LocationServiceStatus::Stopped;
    }

    fn status(&self) -> LocationServiceStatus {
        if self.status == LocationServiceStatus::Initializing {
            let remaining = self.initializing_checks.get();
            if remaining > 0 {
                self.initializing_checks.set(remaining - 1);
                return LocationServiceStatus::Initializing;
            }
            return self.status_after_startup;
        }
        self.status
    }

    fn last_fix(&self) -> Option<RawFix> {
        self.last_fix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_compass_reading() {
        let mut compass = MockCompass::new();
        assert!(!compass.is_enabled());
        compass.set_enabled(true);
        compass.set_reading(123.0, 4.0);
        assert_eq!(compass.true_heading(), 123.0);
        assert_eq!(compass.timestamp(), 4.0);
    }

    #[test]
    fn test_mock_compass_noise_bounded() {
        let mut compass = MockCompass::new();
        compass.set_reading(180.0, 1.0);
        compass.simulate_noise(3.0);
        for _ in 0..50 {
            let heading = compass.true_heading();
            assert!((177.0..=183.0).contains(&heading));
        }
    }

    #[test]
    fn test_mock_gps_startup_sequence() {
        let mut gps = MockGps::new().with_startup(2, LocationServiceStatus::Running);
        assert_eq!(gps.status(), LocationServiceStatus::Stopped);

        gps.start(1.0, 1.0);
        assert_eq!(gps.status(), LocationServiceStatus::Initializing);
        assert_eq!(gps.status(), LocationServiceStatus::Initializing);
        assert_eq!(gps.status(), LocationServiceStatus::Running);
        assert_eq!(gps.start_calls(), 1);
        assert_eq!(gps.requested_accuracy(), Some((1.0, 1.0)));
    }

    #[test]
    fn test_mock_gps_fix() {
        let mut gps = MockGps::new();
        assert!(gps.last_fix().is_none());
        gps.push_coordinate(GeoCoordinate::new(60.0, 25.0), 4.0, 10.0);
        let fix = gps.last_fix().unwrap();
        assert_eq!(fix.latitude, 60.0);
        assert_eq!(fix.vertical_accuracy, 4.0);
        assert_eq!(fix.timestamp, 10.0);
    }
}
