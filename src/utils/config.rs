use crate::core::GeoCoordinate;
use crate::processing::poi_tracker::PositioningMode;
use crate::processing::true_north::CalculationMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Engine-wide configuration, one section per component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub true_north: TrueNorthConfig,
    pub poi_tracking: PoiTrackingConfig,
    pub heading: HeadingProviderConfig,
    pub location: LocationProviderConfig,
    pub elevation: ElevationConfig,
}

/// True north estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrueNorthConfig {
    /// Whether sampling starts enabled
    pub enabled: bool,
    /// Clear estimates when AR tracking is lost/regained or the finder is disabled
    pub reset_after_tracking_lost: bool,
    /// Initial calculation mode
    pub mode: CalculationMode,
    /// Step applied by a single manual east/west nudge (degrees)
    pub manual_offset_increment_deg: f32,
    /// Minimum device and GPS displacement before a movement pair is accepted (meters)
    pub min_distance_before_update_m: f32,
    /// GPS horizontal accuracy below which movement fixes are always usable (meters)
    pub movement_minimum_gps_accuracy_m: f32,
    /// Accuracy improvement that makes a worse-than-minimum fix usable anyway (meters)
    pub accuracy_improvement_threshold_m: f32,
    /// Capacity of the GPS/AR movement window
    pub max_movement_samples: usize,
    /// Compass sampling interval during the fast bootstrap phase (seconds)
    pub compass_interval_fast_s: f32,
    /// Compass sampling interval once the bootstrap estimate exists (seconds)
    pub compass_interval_slow_s: f32,
    /// Capacity of the compass window; half of it ends the fast phase
    pub max_compass_samples: usize,
    /// Compass samples are dropped while the smoothed heading turns faster than this (degrees/s)
    pub compass_jitter_threshold_deg_s: f32,
    /// Re-derive the compass estimate on every slow-phase sample
    pub refine_in_slow_phase: bool,
}

impl Default for TrueNorthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            reset_after_tracking_lost: true,
            mode: CalculationMode::Compass,
            manual_offset_increment_deg: 2.0,
            min_distance_before_update_m: 10.0,
            movement_minimum_gps_accuracy_m: 10.0,
            accuracy_improvement_threshold_m: 5.0,
            max_movement_samples: 5,
            compass_interval_fast_s: 0.25,
            compass_interval_slow_s: 3.0,
            max_compass_samples: 50,
            compass_jitter_threshold_deg_s: 10.0,
            refine_in_slow_phase: false,
        }
    }
}

/// POI tracking and update gating parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoiTrackingConfig {
    pub positioning_mode: PositioningMode,
    /// Fixes at or below this accuracy always trigger a recompute (meters)
    pub update_accuracy_threshold_m: f32,
    /// Accuracy gain since the last accepted fix that triggers a recompute (meters)
    pub accuracy_improvement_threshold_m: f32,
    /// Refresh after this long when accuracy is at most `update_accuracy_threshold_m` (seconds)
    pub refresh_after_good_s: f64,
    /// Accuracy bound for the medium refresh tier (meters)
    pub medium_accuracy_threshold_m: f32,
    /// Refresh after this long when accuracy is at most `medium_accuracy_threshold_m` (seconds)
    pub refresh_after_medium_s: f64,
    /// Unconditional refresh interval (seconds)
    pub refresh_after_any_s: f64,
    /// Minimum time between non-priority heading reprojections (seconds)
    pub heading_rotation_min_interval_s: f64,
    /// Ground-aligned objects sit this far below the estimated ground (meters)
    pub ground_align_offset_m: f32,
    /// Objects closer than the far clip plane by less than this are hidden (meters)
    pub visibility_margin_m: f32,
}

impl Default for PoiTrackingConfig {
    fn default() -> Self {
        Self {
            positioning_mode: PositioningMode::DistanceAndBearing,
            update_accuracy_threshold_m: 8.0,
            accuracy_improvement_threshold_m: 5.0,
            refresh_after_good_s: 10.0,
            medium_accuracy_threshold_m: 15.0,
            refresh_after_medium_s: 20.0,
            refresh_after_any_s: 30.0,
            heading_rotation_min_interval_s: 5.0,
            ground_align_offset_m: 0.05,
            visibility_margin_m: 2.0,
        }
    }
}

/// Compass smoothing and fake-data parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingProviderConfig {
    /// Smoothing time of the critically damped filter (seconds)
    pub smoothing_time_s: f32,
    pub use_fake_data: bool,
    pub fake_heading_deg: f32,
    /// Angular velocity reported in fake mode (degrees/s)
    pub fake_velocity_deg_s: f32,
    /// Step for manual fake heading nudges (degrees)
    pub fake_step_deg: f32,
}

impl Default for HeadingProviderConfig {
    fn default() -> Self {
        Self {
            smoothing_time_s: 0.3,
            use_fake_data: false,
            fake_heading_deg: 0.0,
            fake_velocity_deg_s: 0.5,
            fake_step_deg: 5.0,
        }
    }
}

/// Location service polling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationProviderConfig {
    /// Accuracy requested from the location service (meters)
    pub desired_accuracy_m: f32,
    /// Lateral movement before the service reports a new fix (meters)
    pub update_distance_m: f32,
    /// Status checks while the service initializes before giving up
    pub startup_retries: u32,
    /// Time between startup status checks (seconds)
    pub startup_retry_interval_s: f64,
    pub use_fake_data: bool,
    pub fake_coordinate: GeoCoordinate,
    /// Delay before the first fake fix (seconds)
    pub fake_initial_delay_s: f64,
    /// Interval between fake fixes (seconds)
    pub fake_interval_s: f64,
    /// Lower bound of the random fake accuracy (meters)
    pub fake_accuracy_min_m: f32,
    /// Upper bound (exclusive) of the random fake accuracy (meters)
    pub fake_accuracy_max_m: f32,
    /// Fixes with horizontal accuracy below this become the latest accurate location (meters)
    pub accurate_fix_threshold_m: f32,
}

impl Default for LocationProviderConfig {
    fn default() -> Self {
        Self {
            desired_accuracy_m: 1.0,
            update_distance_m: 1.0,
            startup_retries: 20,
            startup_retry_interval_s: 1.0,
            use_fake_data: false,
            fake_coordinate: GeoCoordinate::new(66.503_06, 25.729_39),
            fake_initial_delay_s: 1.0,
            fake_interval_s: 2.0,
            fake_accuracy_min_m: 3.21,
            fake_accuracy_max_m: 20.0,
            accurate_fix_threshold_m: 5.0,
        }
    }
}

/// Device elevation estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Shortest accepted camera-to-floor distance (meters)
    pub min_accepted_reading_m: f32,
    /// Longest accepted camera-to-floor distance (meters)
    pub max_accepted_reading_m: f32,
    /// Device elevation assumed before any floor hit (meters)
    pub default_device_elevation_m: f32,
    /// Time between floor hit evaluations (seconds)
    pub calculate_interval_s: f32,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            min_accepted_reading_m: 0.4,
            max_accepted_reading_m: 2.3,
            default_device_elevation_m: 1.35,
            calculate_interval_s: 0.1,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    #[error("I/O error: {message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("serialization error: {message}")]
    SerializationError { message: String },
    /// Point of interest definition conflict
    #[error("point of interest {poi_id}: {reason}")]
    PoiConflict { poi_id: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(parameter: &str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be a positive finite number"))
    }
}

fn require_non_negative(parameter: &str, value: f64) -> ConfigResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be zero or positive"))
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("failed to read config file '{}': {}", path_str, e),
        })?;

        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
            message: e.to_string(),
        })
    }

    /// Check every section, returning the first problem found
    pub fn validate(&self) -> ConfigResult<()> {
        let tn = &self.true_north;
        if tn.max_compass_samples < 2 {
            return Err(invalid(
                "true_north.max_compass_samples",
                tn.max_compass_samples,
                "at least two samples are needed to end the fast phase",
            ));
        }
        if tn.max_movement_samples == 0 {
            return Err(invalid(
                "true_north.max_movement_samples",
                tn.max_movement_samples,
                "window capacity must be positive",
            ));
        }
        require_positive("true_north.compass_interval_fast_s", tn.compass_interval_fast_s as f64)?;
        require_positive("true_north.compass_interval_slow_s", tn.compass_interval_slow_s as f64)?;
        require_non_negative("true_north.min_distance_before_update_m", tn.min_distance_before_update_m as f64)?;
        require_non_negative("true_north.movement_minimum_gps_accuracy_m", tn.movement_minimum_gps_accuracy_m as f64)?;
        require_non_negative("true_north.accuracy_improvement_threshold_m", tn.accuracy_improvement_threshold_m as f64)?;
        require_non_negative("true_north.compass_jitter_threshold_deg_s", tn.compass_jitter_threshold_deg_s as f64)?;

        let poi = &self.poi_tracking;
        require_non_negative("poi_tracking.update_accuracy_threshold_m", poi.update_accuracy_threshold_m as f64)?;
        require_non_negative("poi_tracking.accuracy_improvement_threshold_m", poi.accuracy_improvement_threshold_m as f64)?;
        require_non_negative("poi_tracking.refresh_after_good_s", poi.refresh_after_good_s)?;
        require_non_negative("poi_tracking.refresh_after_medium_s", poi.refresh_after_medium_s)?;
        require_non_negative("poi_tracking.refresh_after_any_s", poi.refresh_after_any_s)?;
        require_non_negative("poi_tracking.heading_rotation_min_interval_s", poi.heading_rotation_min_interval_s)?;
        require_non_negative("poi_tracking.visibility_margin_m", poi.visibility_margin_m as f64)?;

        require_positive("heading.smoothing_time_s", self.heading.smoothing_time_s as f64)?;

        let loc = &self.location;
        require_positive("location.startup_retry_interval_s", loc.startup_retry_interval_s)?;
        require_positive("location.fake_interval_s", loc.fake_interval_s)?;
        require_non_negative("location.fake_initial_delay_s", loc.fake_initial_delay_s)?;
        if !(loc.fake_accuracy_min_m < loc.fake_accuracy_max_m) {
            return Err(invalid(
                "location.fake_accuracy_min_m",
                loc.fake_accuracy_min_m,
                "fake accuracy range is empty",
            ));
        }
        if !loc.fake_coordinate.is_valid() {
            return Err(invalid(
                "location.fake_coordinate",
                loc.fake_coordinate,
                "latitude or longitude out of range",
            ));
        }

        let elev = &self.elevation;
        require_positive("elevation.calculate_interval_s", elev.calculate_interval_s as f64)?;
        if elev.min_accepted_reading_m > elev.max_accepted_reading_m {
            return Err(invalid(
                "elevation.min_accepted_reading_m",
                elev.min_accepted_reading_m,
                "must not exceed max_accepted_reading_m",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.true_north.max_compass_samples, 50);
        assert_eq!(config.true_north.max_movement_samples, 5);
        assert_eq!(config.location.startup_retries, 20);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "true_north": { "mode": "Both", "max_movement_samples": 9 } }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.true_north.mode, CalculationMode::Both);
        assert_eq!(config.true_north.max_movement_samples, 9);
        assert_eq!(config.true_north.compass_interval_slow_s, 3.0);
        assert_eq!(config.poi_tracking, PoiTrackingConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = EngineConfig::default();
        config.poi_tracking.positioning_mode = PositioningMode::Utm;
        let json = config.to_json_pretty().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_window_capacity() {
        let mut config = EngineConfig::default();
        config.true_north.max_movement_samples = 0;
        match config.validate() {
            Err(ConfigError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "true_north.max_movement_samples");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_elevation_bounds() {
        let mut config = EngineConfig::default();
        config.elevation.min_accepted_reading_m = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = EngineConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::SerializationError { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::load_from_file("/nonexistent/engine.json");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
