//! Device elevation and ground level estimation from downward plane hits

use crate::processing::timer::IntervalTimer;
use crate::utils::config::ElevationConfig;
use tracing::trace;

/// Result of a downward ray cast from the camera against detected planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Distance from the camera to the hit point (meters)
    pub distance: f32,
    /// World Y coordinate of the hit point
    pub hit_y: f32,
}

#[derive(Debug, Clone)]
pub struct ElevationEstimator {
    config: ElevationConfig,
    timer: IntervalTimer,
    device_elevation: f32,
    ground_level: f32,
}

impl ElevationEstimator {
    pub fn new(config: ElevationConfig) -> Self {
        Self {
            device_elevation: config.default_device_elevation_m,
            ground_level: 0.0,
            timer: IntervalTimer::new(),
            config,
        }
    }

    /// Advance by `dt` and consume the latest hit when the calculation interval has passed.
    ///
    /// Returns true when the estimate changed.
    pub fn update(&mut self, dt: f32, hit: Option<GroundHit>) -> bool {
        self.timer.advance(dt);
        if !self.timer.is_due(self.config.calculate_interval_s) {
            return false;
        }
        self.timer.restart();

        match hit {
            Some(hit)
                if hit.distance >= self.config.min_accepted_reading_m
                    && hit.distance <= self.config.max_accepted_reading_m =>
            {
                self.device_elevation = hit.distance;
                self.ground_level = hit.hit_y;
                true
            }
            Some(hit) => {
                trace!(distance = hit.distance, "ground hit outside accepted range");
                false
            }
            None => false,
        }
    }

    /// Height of the device above the ground (meters)
    pub fn device_elevation(&self) -> f32 {
        self.device_elevation
    }

    /// Ground level in AR world coordinates
    pub fn ground_level(&self) -> f32 {
        self.ground_level
    }
}
