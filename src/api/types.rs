//! Common API types

use crate::core::{DevicePose, GeoCoordinate};
use crate::processing::elevation::GroundHit;
use thiserror::Error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The handle was never registered or has already been removed
    #[error("no callback registered under handle {handle}")]
    UnknownCallback { handle: u32 },
}

/// Per-frame input from the AR platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Seconds since the session started
    pub now: f64,
    /// Seconds since the previous frame
    pub dt: f32,
    /// AR camera pose in the session frame
    pub camera: DevicePose,
    /// Latest downward plane hit, when the platform has one
    pub ground_hit: Option<GroundHit>,
    /// Camera far clip distance (meters)
    pub far_clip: f32,
}

impl FrameInput {
    pub fn new(now: f64, dt: f32, camera: DevicePose) -> Self {
        Self {
            now,
            dt,
            camera,
            ground_hit: None,
            far_clip: 1000.0,
        }
    }

    pub fn with_ground_hit(mut self, hit: GroundHit) -> Self {
        self.ground_hit = Some(hit);
        self
    }

    pub fn with_far_clip(mut self, far_clip: f32) -> Self {
        self.far_clip = far_clip;
        self
    }
}

/// Snapshot of the session for diagnostics overlays
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub heading: f32,
    pub compass_heading: Option<f32>,
    pub gpsar_heading: Option<f32>,
    pub location: Option<GeoCoordinate>,
    pub horizontal_accuracy: Option<f32>,
    pub device_elevation: f32,
    pub tracked_pois: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ApiError::UnknownCallback { handle: 7 };
        assert_eq!(error.to_string(), "no callback registered under handle 7");
    }

    #[test]
    fn test_frame_input_builder() {
        let frame = FrameInput::new(1.0, 0.02, DevicePose::default())
            .with_far_clip(300.0)
            .with_ground_hit(GroundHit { distance: 1.4, hit_y: -1.4 });
        assert_eq!(frame.far_clip, 300.0);
        assert_eq!(frame.ground_hit.map(|hit| hit.distance), Some(1.4));
    }
}
