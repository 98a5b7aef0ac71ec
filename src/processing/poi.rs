//! Point of interest definitions

use crate::core::GeoCoordinate;
use crate::utils::config::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// How close the device is to a point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TrackingState {
    /// Outside the tracking radius, nothing is rendered
    #[default]
    NotTracking,
    /// Inside the tracking radius, repositioned on every accepted update
    FarTracking,
    /// Inside the close radius, only the height follows updates
    CloseTracking,
}

impl TrackingState {
    pub fn is_tracking(&self) -> bool {
        !matches!(self, TrackingState::NotTracking)
    }
}

/// Vertical placement rule for a point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PoiPositionMode {
    /// Sits on the estimated ground level
    #[default]
    AlignWithGround,
    /// Ground level plus `relative_height_m`
    RelativeToGround,
    /// Device height plus `relative_height_m`
    RelativeToDevice,
}

fn default_tracking_radius() -> f32 {
    100.0
}

fn default_tracking_exit_margin() -> f32 {
    20.0
}

fn default_close_tracking_radius() -> f32 {
    20.0
}

fn default_close_tracking_exit_margin() -> f32 {
    10.0
}

/// Static definition of a geolocated point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Stable identifier, unique within a set
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub coordinate: GeoCoordinate,
    /// Entering this radius starts tracking (meters)
    #[serde(default = "default_tracking_radius")]
    pub tracking_radius_m: f32,
    #[serde(default = "default_tracking_exit_margin")]
    pub tracking_exit_margin_m: f32,
    /// Entering this radius switches to close tracking (meters)
    #[serde(default = "default_close_tracking_radius")]
    pub close_tracking_radius_m: f32,
    #[serde(default = "default_close_tracking_exit_margin")]
    pub close_tracking_exit_margin_m: f32,
    #[serde(default)]
    pub position_mode: PoiPositionMode,
    /// Compass direction the rendered model faces (degrees, 90 = east)
    #[serde(default)]
    pub facing_heading_deg: f32,
    /// Height offset for the relative position modes (meters)
    #[serde(default)]
    pub relative_height_m: f32,
}

impl PointOfInterest {
    /// Point of interest with the default radii and ground alignment
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinate: GeoCoordinate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            coordinate,
            tracking_radius_m: default_tracking_radius(),
            tracking_exit_margin_m: default_tracking_exit_margin(),
            close_tracking_radius_m: default_close_tracking_radius(),
            close_tracking_exit_margin_m: default_close_tracking_exit_margin(),
            position_mode: PoiPositionMode::default(),
            facing_heading_deg: 0.0,
            relative_height_m: 0.0,
        }
    }

    pub fn with_tracking_radius(mut self, radius_m: f32, exit_margin_m: f32) -> Self {
        self.tracking_radius_m = radius_m;
        self.tracking_exit_margin_m = exit_margin_m;
        self
    }

    pub fn with_close_tracking_radius(mut self, radius_m: f32, exit_margin_m: f32) -> Self {
        self.close_tracking_radius_m = radius_m;
        self.close_tracking_exit_margin_m = exit_margin_m;
        self
    }

    pub fn with_position_mode(mut self, mode: PoiPositionMode, relative_height_m: f32) -> Self {
        self.position_mode = mode;
        self.relative_height_m = relative_height_m;
        self
    }

    pub fn tracking_exit_radius_m(&self) -> f32 {
        self.tracking_radius_m + self.tracking_exit_margin_m
    }

    pub fn close_tracking_exit_radius_m(&self) -> f32 {
        self.close_tracking_radius_m + self.close_tracking_exit_margin_m
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let conflict = |reason: String| ConfigError::PoiConflict {
            poi_id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(conflict("identifier must not be empty".to_string()));
        }
        if !self.coordinate.is_valid() {
            return Err(conflict(format!("coordinate {} out of range", self.coordinate)));
        }

        let distances = [
            ("tracking_radius_m", self.tracking_radius_m),
            ("tracking_exit_margin_m", self.tracking_exit_margin_m),
            ("close_tracking_radius_m", self.close_tracking_radius_m),
            ("close_tracking_exit_margin_m", self.close_tracking_exit_margin_m),
        ];
        for (name, value) in distances {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(conflict(format!("{} must be zero or positive, got {}", name, value)));
            }
        }

        Ok(())
    }
}

/// Named collection of points of interest, loaded once and treated as immutable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiSet {
    #[serde(default)]
    pub name: String,
    pub points_of_interest: Vec<PointOfInterest>,
}

impl PoiSet {
    pub fn new(name: impl Into<String>, points_of_interest: Vec<PointOfInterest>) -> ConfigResult<Self> {
        let set = Self {
            name: name.into(),
            points_of_interest,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let set: PoiSet =
            serde_json::from_str(content).map_err(|e| ConfigError::SerializationError {
                message: e.to_string(),
            })?;
        set.validate()?;
        Ok(set)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("failed to read POI file '{}': {}", path_str, e),
        })?;

        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for poi in &self.points_of_interest {
            poi.validate()?;
            if !seen.insert(poi.id.as_str()) {
                return Err(ConfigError::PoiConflict {
                    poi_id: poi.id.clone(),
                    reason: "duplicate identifier".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&PointOfInterest> {
        self.points_of_interest.iter().find(|poi| poi.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointOfInterest> {
        self.points_of_interest.iter()
    }

    pub fn len(&self) -> usize {
        self.points_of_interest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_of_interest.is_empty()
    }
}
