//! Point of interest tracking and positioning
//!
//! For every accepted location update each point of interest is classified by
//! distance (with hysteresis between entry and exit radii) and tracked points
//! are placed in the AR world:
//!
//! ```text
//! world = camera_ground + rotate_y(heading) * relative
//! ```
//!
//! `relative` is the east/north displacement from the device to the point of
//! interest. It is cached per tracker together with the camera ground position
//! so that heading-only updates can re-rotate without touching geodesy.

use crate::algorithms::angles::{normalize_360, signed_angle_from_forward};
use crate::algorithms::geodesy::{equirectangular_distance, initial_bearing, utm_delta};
use crate::api::render::PoiRenderer;
use crate::core::{DevicePose, GeoCoordinate, LocationSample, UNKNOWN_ACCURACY_M};
use crate::processing::poi::{PoiPositionMode, PoiSet, PointOfInterest, TrackingState};
use crate::processing::true_north::NorthHeadingUpdate;
use crate::utils::config::PoiTrackingConfig;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// How the displacement from the device to a point of interest is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PositioningMode {
    /// Equirectangular distance along the initial great-circle bearing
    #[default]
    DistanceAndBearing,
    /// Difference of UTM easting/northing
    Utm,
}

/// Tracking state transition of one point of interest
#[derive(Debug, Clone, PartialEq)]
pub struct PoiTrackingChanged {
    pub id: String,
    pub from: TrackingState,
    pub to: TrackingState,
}

/// Diagnostics from the last evaluation of a point of interest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoiStatus {
    pub state: TrackingState,
    /// Distance from the device at the last evaluation (meters)
    pub distance_m: f32,
    /// Compass bearing from the device at the last full repositioning (degrees)
    pub bearing_deg: f32,
    /// Last world position pushed to the renderer, while tracked
    pub world_position: Option<Vector3<f32>>,
}

impl Default for PoiStatus {
    fn default() -> Self {
        Self {
            state: TrackingState::NotTracking,
            distance_m: f32::NAN,
            bearing_deg: 0.0,
            world_position: None,
        }
    }
}

/// Device-side inputs for placing points of interest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionContext {
    pub camera: DevicePose,
    /// Estimated ground level in AR world coordinates
    pub ground_level: f32,
    /// Current fused true north heading (degrees)
    pub heading: f32,
}

/// Runtime record for a tracked point of interest
#[derive(Debug, Clone, PartialEq)]
pub struct PoiTracker {
    pub id: String,
    /// Camera ground position at the last full repositioning
    pub last_camera_position: Vector3<f32>,
    /// East/north displacement at the last full repositioning
    pub last_relative_position: Vector3<f32>,
    /// Last world position pushed to the renderer
    pub world_position: Vector3<f32>,
}

/// Decides whether a location fix is worth a full POI recompute
#[derive(Debug, Clone)]
pub struct LocationUpdateGate {
    previous_accuracy: f32,
    previous_timestamp: f64,
}

impl Default for LocationUpdateGate {
    fn default() -> Self {
        Self {
            previous_accuracy: UNKNOWN_ACCURACY_M,
            previous_timestamp: 0.0,
        }
    }
}

impl LocationUpdateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a fix against the gate and remember it when accepted
    pub fn accept(&mut self, sample: &LocationSample, config: &PoiTrackingConfig) -> bool {
        let accuracy = sample.horizontal_accuracy.max(sample.vertical_accuracy);
        let improvement = self.previous_accuracy - accuracy;
        let elapsed = sample.timestamp - self.previous_timestamp;

        let accepted = accuracy <= config.update_accuracy_threshold_m
            || improvement >= config.accuracy_improvement_threshold_m
            || (elapsed > config.refresh_after_good_s
                && accuracy <= config.update_accuracy_threshold_m)
            || (elapsed > config.refresh_after_medium_s
                && accuracy <= config.medium_accuracy_threshold_m)
            || elapsed > config.refresh_after_any_s;

        debug!(accuracy, improvement, elapsed, accepted, "POI location gate");

        if accepted {
            self.previous_accuracy = accuracy;
            self.previous_timestamp = sample.timestamp;
        }
        accepted
    }

    /// Forget the last accuracy so the next fix counts as an improvement
    pub fn reset_accuracy(&mut self) {
        self.previous_accuracy = UNKNOWN_ACCURACY_M;
    }

    pub fn previous_accuracy(&self) -> f32 {
        self.previous_accuracy
    }
}

/// Vertical position of a point of interest
pub fn poi_height(
    poi: &PointOfInterest,
    ground_level: f32,
    device_y: f32,
    ground_align_offset: f32,
) -> f32 {
    match poi.position_mode {
        PoiPositionMode::AlignWithGround => ground_level - ground_align_offset,
        PoiPositionMode::RelativeToGround => ground_level + poi.relative_height_m,
        PoiPositionMode::RelativeToDevice => device_y + poi.relative_height_m,
    }
}

fn rotate_by_heading(heading: f32, relative: &Vector3<f32>) -> Vector3<f32> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), heading.to_radians()) * relative
}

/// Keeps tracking state and world placement of a set of points of interest
pub struct PoiManager {
    config: PoiTrackingConfig,
    set: PoiSet,
    statuses: HashMap<String, PoiStatus>,
    trackers: Vec<PoiTracker>,
    gate: LocationUpdateGate,
    last_rotation_timestamp: Option<f64>,
}

impl PoiManager {
    pub fn new(config: PoiTrackingConfig, set: PoiSet) -> Self {
        let statuses = set
            .iter()
            .map(|poi| (poi.id.clone(), PoiStatus::default()))
            .collect();

        Self {
            config,
            set,
            statuses,
            trackers: Vec::new(),
            gate: LocationUpdateGate::new(),
            last_rotation_timestamp: None,
        }
    }

    /// Gate a location fix and recompute every point of interest when accepted
    pub fn on_location<R: PoiRenderer + ?Sized>(
        &mut self,
        sample: &LocationSample,
        context: &ProjectionContext,
        renderer: &mut R,
    ) -> Vec<PoiTrackingChanged> {
        if self.gate.accept(sample, &self.config) {
            self.recheck_trackings(&sample.coordinate, context, renderer)
        } else {
            Vec::new()
        }
    }

    /// Re-rotate tracked points of interest after a true north change.
    ///
    /// Non-priority updates are applied at most once per
    /// `heading_rotation_min_interval_s`. Returns whether the update was applied.
    pub fn on_north_heading<R: PoiRenderer + ?Sized>(
        &mut self,
        update: &NorthHeadingUpdate,
        renderer: &mut R,
    ) -> bool {
        let due = match self.last_rotation_timestamp {
            None => true,
            Some(last) => update.timestamp - last >= self.config.heading_rotation_min_interval_s,
        };

        if update.is_priority || due {
            self.last_rotation_timestamp = Some(update.timestamp);
            self.rotate_relative_to_north(update.heading, update.is_priority, renderer);
            true
        } else {
            false
        }
    }

    /// AR session tracking changed. Re-evaluates against `last_location` once tracking resumes.
    pub fn on_session_state_changed<R: PoiRenderer + ?Sized>(
        &mut self,
        tracking: bool,
        last_location: Option<&GeoCoordinate>,
        context: &ProjectionContext,
        renderer: &mut R,
    ) -> Vec<PoiTrackingChanged> {
        self.gate.reset_accuracy();

        match (tracking, last_location) {
            (true, Some(location)) => self.recheck_trackings(location, context, renderer),
            _ => Vec::new(),
        }
    }

    /// Classify every point of interest by distance and reposition the tracked ones
    pub fn recheck_trackings<R: PoiRenderer + ?Sized>(
        &mut self,
        location: &GeoCoordinate,
        context: &ProjectionContext,
        renderer: &mut R,
    ) -> Vec<PoiTrackingChanged> {
        let mut changes = Vec::new();
        let camera_ground = context.camera.ground_position();
        let device_y = context.camera.position.y;

        for poi in &self.set.points_of_interest {
            let status = self.statuses.entry(poi.id.clone()).or_default();
            let previous = status.state;
            let mut distance = equirectangular_distance(location, &poi.coordinate) as f32;
            let mut height_only = false;

            let next = if previous != TrackingState::CloseTracking
                && distance <= poi.close_tracking_radius_m
            {
                TrackingState::CloseTracking
            } else if !previous.is_tracking() && distance <= poi.tracking_radius_m {
                TrackingState::FarTracking
            } else if previous.is_tracking() && distance >= poi.tracking_exit_radius_m() {
                TrackingState::NotTracking
            } else if previous == TrackingState::CloseTracking {
                if distance >= poi.close_tracking_exit_radius_m() {
                    TrackingState::FarTracking
                } else {
                    height_only = true;
                    TrackingState::CloseTracking
                }
            } else {
                previous
            };

            status.state = next;
            status.distance_m = distance;

            if next != previous {
                info!(poi = %poi.id, from = ?previous, to = ?next, distance, "POI tracking state changed");
                changes.push(PoiTrackingChanged {
                    id: poi.id.clone(),
                    from: previous,
                    to: next,
                });
            }

            if !next.is_tracking() {
                if previous.is_tracking() {
                    status.world_position = None;
                    self.trackers.retain(|t| t.id != poi.id);
                    renderer.destroy(&poi.id);
                }
                continue;
            }

            if !previous.is_tracking() {
                renderer.create(poi);
                self.trackers.push(PoiTracker {
                    id: poi.id.clone(),
                    last_camera_position: camera_ground,
                    last_relative_position: Vector3::zeros(),
                    world_position: Vector3::zeros(),
                });
            }

            let tracker = match self.trackers.iter_mut().find(|t| t.id == poi.id) {
                Some(tracker) => tracker,
                None => continue,
            };

            let height = poi_height(poi, context.ground_level, device_y, self.config.ground_align_offset_m);

            if height_only {
                tracker.world_position.y = height;
                status.world_position = Some(tracker.world_position);
                renderer.update_position_y(&poi.id, height);
                continue;
            }

            let (relative, bearing_deg) = match self.config.positioning_mode {
                PositioningMode::DistanceAndBearing => {
                    let bearing = initial_bearing(location, &poi.coordinate) as f32;
                    let relative = Vector3::new(distance * bearing.sin(), 0.0, distance * bearing.cos());
                    (relative, normalize_360(bearing.to_degrees()))
                }
                PositioningMode::Utm => {
                    let delta = utm_delta(location, &poi.coordinate);
                    let relative = Vector3::new(delta.x as f32, 0.0, delta.y as f32);
                    distance = relative.norm();
                    (relative, normalize_360(signed_angle_from_forward(&relative)))
                }
            };

            tracker.last_camera_position = camera_ground;
            tracker.last_relative_position = relative;

            let mut world = camera_ground + rotate_by_heading(context.heading, &relative);
            world.y = height;
            tracker.world_position = world;

            status.distance_m = distance;
            status.bearing_deg = bearing_deg;
            status.world_position = Some(world);

            renderer.update_position(&poi.id, world);
            renderer.update_rotation(&poi.id, context.heading + poi.facing_heading_deg);
            renderer.update_distance(&poi.id, distance);
        }

        changes
    }

    /// Hide tracked points of interest beyond the camera's far clip plane
    pub fn update_visibility<R: PoiRenderer + ?Sized>(
        &self,
        camera_position: &Vector3<f32>,
        far_clip: f32,
        renderer: &mut R,
    ) {
        for tracker in &self.trackers {
            let distance = (tracker.world_position - camera_position).norm();
            renderer.set_visibility(&tracker.id, far_clip > distance + self.config.visibility_margin_m);
        }
    }

    /// Replace the point of interest set, tearing down trackers of removed entries
    pub fn set_points_of_interest<R: PoiRenderer + ?Sized>(
        &mut self,
        set: PoiSet,
        renderer: &mut R,
    ) -> Vec<PoiTrackingChanged> {
        if set == self.set {
            return Vec::new();
        }
        self.set = set;
        self.refresh_trackers(renderer)
    }

    /// Stop tracking every point of interest
    pub fn stop_tracking_all<R: PoiRenderer + ?Sized>(&mut self, renderer: &mut R) -> Vec<PoiTrackingChanged> {
        let mut changes = Vec::new();
        for tracker in self.trackers.drain(..) {
            renderer.destroy(&tracker.id);
            if let Some(status) = self.statuses.get_mut(&tracker.id) {
                changes.push(PoiTrackingChanged {
                    id: tracker.id.clone(),
                    from: status.state,
                    to: TrackingState::NotTracking,
                });
                status.state = TrackingState::NotTracking;
                status.world_position = None;
            }
        }
        changes
    }

    pub fn status(&self, id: &str) -> Option<PoiStatus> {
        self.statuses.get(id).copied()
    }

    pub fn tracking_state(&self, id: &str) -> TrackingState {
        self.statuses
            .get(id)
            .map(|status| status.state)
            .unwrap_or_default()
    }

    pub fn tracked_ids(&self) -> Vec<&str> {
        self.trackers.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn tracker(&self, id: &str) -> Option<&PoiTracker> {
        self.trackers.iter().find(|t| t.id == id)
    }

    pub fn points_of_interest(&self) -> &PoiSet {
        &self.set
    }

    pub fn positioning_mode(&self) -> PositioningMode {
        self.config.positioning_mode
    }

    pub fn set_positioning_mode(&mut self, mode: PositioningMode) {
        self.config.positioning_mode = mode;
    }

    pub fn gate(&self) -> &LocationUpdateGate {
        &self.gate
    }

    fn rotate_relative_to_north<R: PoiRenderer + ?Sized>(
        &mut self,
        heading: f32,
        force: bool,
        renderer: &mut R,
    ) {
        for tracker in &mut self.trackers {
            let close = self
                .statuses
                .get(&tracker.id)
                .map(|status| status.state == TrackingState::CloseTracking)
                .unwrap_or(false);
            if close && !force {
                continue;
            }

            let position = tracker.last_camera_position
                + rotate_by_heading(heading, &tracker.last_relative_position);
            tracker.world_position.x = position.x;
            tracker.world_position.z = position.z;
            if let Some(status) = self.statuses.get_mut(&tracker.id) {
                status.world_position = Some(tracker.world_position);
            }
            renderer.update_position_xz(&tracker.id, position.x, position.z);
        }
    }

    fn refresh_trackers<R: PoiRenderer + ?Sized>(&mut self, renderer: &mut R) -> Vec<PoiTrackingChanged> {
        let mut changes = Vec::new();
        let set = &self.set;
        let (kept, removed): (Vec<PoiTracker>, Vec<PoiTracker>) = self
            .trackers
            .drain(..)
            .partition(|tracker| set.contains(&tracker.id));
        self.trackers = kept;

        for tracker in removed {
            renderer.destroy(&tracker.id);
            if let Some(status) = self.statuses.remove(&tracker.id) {
                changes.push(PoiTrackingChanged {
                    id: tracker.id.clone(),
                    from: status.state,
                    to: TrackingState::NotTracking,
                });
            }
        }

        self.statuses.retain(|id, _| set.contains(id));
        for poi in set.iter() {
            self.statuses.entry(poi.id.clone()).or_default();
        }

        debug!(removed = changes.len(), "POI trackers refreshed");
        changes
    }
}
