//! True north estimation
//!
//! The AR session starts with an arbitrary world yaw. [`TrueNorthFinder`]
//! estimates the rotation between that frame and geographic north with two
//! independent strategies:
//!
//! * **Compass**: periodic samples of `camera yaw - smoothed compass heading`
//!   collected into a window. A short sampling interval bootstraps the estimate
//!   (fast phase); once half the window is filled the median becomes the
//!   compass estimate and sampling slows down.
//! * **GPS/AR movement**: whenever both the device (in AR space) and the GPS
//!   fix have moved far enough, the difference between the AR movement
//!   direction and the GPS bearing is pushed into a second window whose mean
//!   becomes the movement estimate.
//!
//! The [`CalculationMode`] selects how the two are fused. Manual east/west
//! offsets are added on top in every mode.

use crate::algorithms::angles::{normalize_360, shortest_angle_lerp, signed_angle_from_forward, to_positive};
use crate::algorithms::geodesy::{equirectangular_distance, initial_bearing_deg};
use crate::core::{DevicePose, GeoCoordinate, HeadingReading, LocationSample, UNKNOWN_ACCURACY_M};
use crate::processing::timer::IntervalTimer;
use crate::processing::window::AngularDeltaWindow;
use crate::utils::config::TrueNorthConfig;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, trace};

/// Strategy used to derive the fused heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CalculationMode {
    /// Compass samples only
    #[default]
    Compass,
    /// GPS bearing vs AR movement. The compass still bootstraps the first estimate.
    GpsAndArMovement,
    /// Both strategies blended half and half
    Both,
    /// No automatic estimation, only manual offsets apply
    Manual,
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalculationMode::Compass => "compass",
            CalculationMode::GpsAndArMovement => "gps-and-ar-movement",
            CalculationMode::Both => "both",
            CalculationMode::Manual => "manual",
        };
        write!(f, "{}", name)
    }
}

/// Compass sampling phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CalculationPhase {
    #[default]
    Stopped,
    /// Short interval until the first estimate exists
    FastInterval,
    /// Long interval refining the estimate
    SlowInterval,
}

/// New fused heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NorthHeadingUpdate {
    /// Rotation of the AR world relative to true north (degrees)
    pub heading: f32,
    /// Time the heading was computed (seconds)
    pub timestamp: f64,
    /// Priority updates bypass the POI reprojection rate limit
    pub is_priority: bool,
}

/// Diagnostics of an accepted GPS/AR movement pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementHeadingUpdate {
    pub ar_heading: f32,
    pub gps_heading: f32,
    pub heading_difference: f32,
    pub median_heading_difference: f32,
    pub average_heading_difference: f32,
}

/// Events produced by the finder, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrueNorthEvent {
    NorthHeadingUpdated(NorthHeadingUpdate),
    HeadingFromMovementUpdated(MovementHeadingUpdate),
    CalculationModeChanged(CalculationMode),
    CalculationPhaseChanged(CalculationPhase),
}

/// Fuses compass and GPS/AR movement samples into a true north correction angle
#[derive(Debug, Clone)]
pub struct TrueNorthFinder {
    config: TrueNorthConfig,
    enabled: bool,
    mode: CalculationMode,
    phase: CalculationPhase,

    compass_window: AngularDeltaWindow,
    compass_timer: IntervalTimer,
    compass_heading: f32,
    has_compass_estimate: bool,

    movement_window: AngularDeltaWindow,
    median_gpsar_heading: f32,
    average_gpsar_heading: f32,
    has_gpsar_estimate: bool,
    ar_heading: f32,
    gps_heading: f32,
    last_movement_distance: f32,
    previous_coordinate: Option<GeoCoordinate>,
    previous_device_position: Vector3<f32>,
    previous_accuracy: f32,

    manual_offset: f32,
    heading: f32,
    heading_timestamp: f64,

    outbox: Vec<TrueNorthEvent>,
}

impl TrueNorthFinder {
    pub fn new(config: TrueNorthConfig) -> Self {
        Self {
            enabled: config.enabled,
            mode: config.mode,
            phase: CalculationPhase::Stopped,
            compass_window: AngularDeltaWindow::new(config.max_compass_samples),
            compass_timer: IntervalTimer::new(),
            compass_heading: 0.0,
            has_compass_estimate: false,
            movement_window: AngularDeltaWindow::new(config.max_movement_samples),
            median_gpsar_heading: 0.0,
            average_gpsar_heading: 0.0,
            has_gpsar_estimate: false,
            ar_heading: 0.0,
            gps_heading: 0.0,
            last_movement_distance: 0.0,
            previous_coordinate: None,
            previous_device_position: Vector3::zeros(),
            previous_accuracy: UNKNOWN_ACCURACY_M,
            manual_offset: 0.0,
            heading: 0.0,
            heading_timestamp: 0.0,
            outbox: Vec::new(),
            config,
        }
    }

    /// Per-frame compass sampling.
    ///
    /// `reading` is the latest smoothed compass reading, if any has arrived yet.
    pub fn update(
        &mut self,
        dt: f32,
        now: f64,
        camera: &DevicePose,
        reading: Option<&HeadingReading>,
    ) -> Vec<TrueNorthEvent> {
        if self.enabled && self.compass_sampling_active() {
            if self.phase == CalculationPhase::Stopped {
                self.set_phase(CalculationPhase::FastInterval);
            }

            self.compass_timer.advance(dt);

            if self.compass_timer.is_due(self.compass_interval()) {
                if let Some(reading) = reading {
                    if self.record_compass_heading(camera, reading) {
                        self.compass_timer.restart();
                        self.after_compass_sample(now);
                    }
                }
            }
        }

        self.take_events()
    }

    /// Correlate a new GPS fix with the AR device movement since the last accepted pair.
    ///
    /// Runs in the movement modes whether or not compass sampling is enabled.
    pub fn on_location(
        &mut self,
        sample: &LocationSample,
        camera: &DevicePose,
        now: f64,
    ) -> Vec<TrueNorthEvent> {
        if matches!(
            self.mode,
            CalculationMode::GpsAndArMovement | CalculationMode::Both
        ) {
            self.calculate_movement_heading(sample, camera, now);
        }

        self.take_events()
    }

    pub fn set_enabled(&mut self, enabled: bool, now: f64) -> Vec<TrueNorthEvent> {
        let was_enabled = self.enabled;
        self.enabled = enabled;

        if was_enabled && !enabled && self.config.reset_after_tracking_lost {
            self.reset_estimates(now);
        }

        self.take_events()
    }

    /// Change the calculation mode and re-fuse the heading with the estimates at hand
    pub fn set_mode(&mut self, mode: CalculationMode, now: f64) -> Vec<TrueNorthEvent> {
        if mode != self.mode {
            info!(from = %self.mode, to = %mode, "true north calculation mode changed");
            self.mode = mode;
            self.outbox.push(TrueNorthEvent::CalculationModeChanged(mode));

            let previous_heading = self.heading;
            self.recalculate_heading(now);
            if self.heading != previous_heading {
                self.push_heading_event(true);
            }
        }

        self.take_events()
    }

    /// AR session tracking acquired (`true`) or lost (`false`).
    ///
    /// The AR world frame is not stable across tracking loss, so both
    /// estimates are discarded when configured to.
    pub fn on_session_state_changed(&mut self, tracking: bool, now: f64) -> Vec<TrueNorthEvent> {
        debug!(tracking, "AR session state changed");
        if self.config.reset_after_tracking_lost {
            self.reset_estimates(now);
        }
        self.take_events()
    }

    pub fn offset_to_east(&mut self, now: f64) -> Vec<TrueNorthEvent> {
        self.apply_manual_offset(self.config.manual_offset_increment_deg, now)
    }

    pub fn offset_to_west(&mut self, now: f64) -> Vec<TrueNorthEvent> {
        self.apply_manual_offset(-self.config.manual_offset_increment_deg, now)
    }

    /// Discard both estimates, the manual offset and the compass phase
    pub fn reset_both_modes(&mut self, now: f64) -> Vec<TrueNorthEvent> {
        self.reset_estimates(now);
        self.take_events()
    }

    /// Fused heading including the manual offset
    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn heading_timestamp(&self) -> f64 {
        self.heading_timestamp
    }

    /// Direction of the last accepted AR movement, clockwise from +Z
    pub fn ar_heading(&self) -> f32 {
        self.ar_heading
    }

    /// GPS bearing of the last accepted movement
    pub fn gps_heading(&self) -> f32 {
        self.gps_heading
    }

    pub fn compass_heading(&self) -> f32 {
        self.compass_heading
    }

    pub fn median_gpsar_heading(&self) -> f32 {
        self.median_gpsar_heading
    }

    pub fn average_gpsar_heading(&self) -> f32 {
        self.average_gpsar_heading
    }

    pub fn has_compass_estimate(&self) -> bool {
        self.has_compass_estimate
    }

    pub fn has_gpsar_estimate(&self) -> bool {
        self.has_gpsar_estimate
    }

    pub fn manual_offset(&self) -> f32 {
        self.manual_offset
    }

    pub fn phase(&self) -> CalculationPhase {
        self.phase
    }

    pub fn mode(&self) -> CalculationMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn compass_sample_count(&self) -> usize {
        self.compass_window.len()
    }

    pub fn movement_sample_count(&self) -> usize {
        self.movement_window.len()
    }

    /// Half of the compass window is filled
    pub fn fast_interval_size_reached(&self) -> bool {
        self.compass_window.len() >= self.config.max_compass_samples / 2
    }

    /// The compass window is full and evicting
    pub fn heading_sample_size_reached(&self) -> bool {
        self.compass_window.len() >= self.config.max_compass_samples
    }

    /// AR displacement measured on the last location update (meters)
    pub fn last_movement_distance(&self) -> f32 {
        self.last_movement_distance
    }

    pub fn config(&self) -> &TrueNorthConfig {
        &self.config
    }

    fn take_events(&mut self) -> Vec<TrueNorthEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn compass_sampling_active(&self) -> bool {
        match self.mode {
            CalculationMode::Compass | CalculationMode::Both => true,
            // The fast phase bootstraps a compass estimate for every automatic mode
            CalculationMode::GpsAndArMovement => self.phase != CalculationPhase::SlowInterval,
            CalculationMode::Manual => false,
        }
    }

    fn compass_interval(&self) -> f32 {
        match self.phase {
            CalculationPhase::Stopped | CalculationPhase::FastInterval => {
                self.config.compass_interval_fast_s
            }
            CalculationPhase::SlowInterval => self.config.compass_interval_slow_s,
        }
    }

    fn set_phase(&mut self, phase: CalculationPhase) {
        if phase != self.phase {
            info!(from = ?self.phase, to = ?phase, "true north calculation phase changed");
            self.phase = phase;
            self.outbox.push(TrueNorthEvent::CalculationPhaseChanged(phase));
        }
    }

    /// Push `camera yaw - compass heading` into the compass window. Returns false for jittery readings.
    fn record_compass_heading(&mut self, camera: &DevicePose, reading: &HeadingReading) -> bool {
        if reading.filtered_velocity.abs() > self.config.compass_jitter_threshold_deg_s {
            trace!(
                velocity = reading.filtered_velocity,
                "compass sample rejected, heading still turning"
            );
            return false;
        }

        let angle = to_positive(camera.yaw_deg - reading.filtered_heading);
        self.compass_window.push(angle);
        true
    }

    fn after_compass_sample(&mut self, now: f64) {
        match self.phase {
            CalculationPhase::FastInterval if self.fast_interval_size_reached() => {
                self.set_phase(CalculationPhase::SlowInterval);
                self.recalculate_compass_heading();
                info!(
                    compass_heading = self.compass_heading,
                    samples = self.compass_window.len(),
                    "compass estimate bootstrapped"
                );
                self.recalculate_heading(now);
                self.push_heading_event(true);
            }
            CalculationPhase::SlowInterval if self.config.refine_in_slow_phase => {
                self.recalculate_compass_heading();
                self.recalculate_heading(now);
                self.push_heading_event(false);
            }
            _ => {}
        }
    }

    fn recalculate_compass_heading(&mut self) {
        if !self.compass_window.is_empty() {
            self.compass_heading = self.compass_window.median_estimate();
            self.has_compass_estimate = true;
        }
    }

    fn calculate_movement_heading(&mut self, sample: &LocationSample, camera: &DevicePose, now: f64) {
        let previous_coordinate = match self.previous_coordinate {
            Some(coordinate) => coordinate,
            None => {
                self.previous_coordinate = Some(sample.coordinate);
                self.previous_device_position = camera.position;
                return;
            }
        };

        let min_distance = self.config.min_distance_before_update_m;

        let device_delta = camera.position - self.previous_device_position;
        self.last_movement_distance = device_delta.norm();
        let ar_heading = if self.last_movement_distance > min_distance {
            Some(to_positive(signed_angle_from_forward(&device_delta)))
        } else {
            None
        };

        let accuracy = sample.horizontal_accuracy;
        let accuracy_improved =
            self.previous_accuracy - accuracy >= self.config.accuracy_improvement_threshold_m;
        let gps_heading = if accuracy < self.config.movement_minimum_gps_accuracy_m || accuracy_improved {
            let gps_distance = equirectangular_distance(&previous_coordinate, &sample.coordinate);
            if gps_distance > min_distance as f64 {
                Some(normalize_360(initial_bearing_deg(&previous_coordinate, &sample.coordinate) as f32))
            } else {
                None
            }
        } else {
            None
        };

        let (ar_heading, gps_heading) = match (ar_heading, gps_heading) {
            (Some(ar), Some(gps)) => (ar, gps),
            _ => return,
        };

        self.ar_heading = ar_heading;
        self.gps_heading = gps_heading;
        self.previous_coordinate = Some(sample.coordinate);
        self.previous_device_position = camera.position;
        self.previous_accuracy = accuracy;

        let difference = to_positive(ar_heading - gps_heading);
        self.movement_window.push(difference);
        self.median_gpsar_heading = self.movement_window.median_estimate();
        self.average_gpsar_heading = self.movement_window.mean_estimate();
        self.has_gpsar_estimate = true;

        debug!(
            ar_heading,
            gps_heading,
            difference,
            average = self.average_gpsar_heading,
            samples = self.movement_window.len(),
            "accepted GPS/AR movement pair"
        );

        self.recalculate_heading(now);
        self.push_heading_event(false);
        self.outbox.push(TrueNorthEvent::HeadingFromMovementUpdated(
            MovementHeadingUpdate {
                ar_heading,
                gps_heading,
                heading_difference: difference,
                median_heading_difference: self.median_gpsar_heading,
                average_heading_difference: self.average_gpsar_heading,
            },
        ));
    }

    fn recalculate_heading(&mut self, now: f64) {
        let base = match self.mode {
            CalculationMode::Compass => self.compass_heading_or_zero(),
            CalculationMode::GpsAndArMovement => {
                if self.has_gpsar_estimate {
                    self.average_gpsar_heading
                } else {
                    self.compass_heading_or_zero()
                }
            }
            CalculationMode::Both => match (self.has_gpsar_estimate, self.has_compass_estimate) {
                (true, true) => normalize_360(shortest_angle_lerp(
                    self.average_gpsar_heading,
                    self.compass_heading,
                    0.5,
                )),
                (true, false) => self.average_gpsar_heading,
                (false, _) => self.compass_heading_or_zero(),
            },
            CalculationMode::Manual => 0.0,
        };

        self.heading = base + self.manual_offset;
        self.heading_timestamp = now;
    }

    fn compass_heading_or_zero(&self) -> f32 {
        if self.has_compass_estimate {
            self.compass_heading
        } else {
            0.0
        }
    }

    fn push_heading_event(&mut self, is_priority: bool) {
        self.outbox.push(TrueNorthEvent::NorthHeadingUpdated(NorthHeadingUpdate {
            heading: self.heading,
            timestamp: self.heading_timestamp,
            is_priority,
        }));
    }

    fn apply_manual_offset(&mut self, delta: f32, now: f64) -> Vec<TrueNorthEvent> {
        self.manual_offset += delta;
        self.recalculate_heading(now);
        self.push_heading_event(true);
        self.take_events()
    }

    fn reset_estimates(&mut self, now: f64) {
        self.has_gpsar_estimate = false;
        self.previous_coordinate = None;
        self.previous_accuracy = UNKNOWN_ACCURACY_M;
        self.movement_window.clear();

        self.compass_window.clear();
        self.compass_timer.restart();
        self.has_compass_estimate = false;

        self.manual_offset = 0.0;
        self.set_phase(CalculationPhase::Stopped);

        let previous_heading = self.heading;
        self.recalculate_heading(now);
        if self.heading != previous_heading {
            self.push_heading_event(true);
        }
        debug!("true north estimates reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: f32 = 0.25;

    fn finder(mode: CalculationMode) -> TrueNorthFinder {
        let config = TrueNorthConfig {
            enabled: true,
            mode,
            ..TrueNorthConfig::default()
        };
        TrueNorthFinder::new(config)
    }

    fn steady_reading(heading: f32) -> HeadingReading {
        HeadingReading {
            raw_heading: heading,
            filtered_heading: heading,
            filtered_velocity: 0.0,
            timestamp: 0.0,
        }
    }

    fn pose(x: f32, z: f32, yaw: f32) -> DevicePose {
        DevicePose::new(Vector3::new(x, 1.4, z), yaw)
    }

    fn fix(latitude: f64, longitude: f64, accuracy: f32) -> LocationSample {
        LocationSample {
            coordinate: GeoCoordinate::new(latitude, longitude),
            altitude: 0.0,
            horizontal_accuracy: accuracy,
            vertical_accuracy: accuracy,
            timestamp: 0.0,
        }
    }

    /// Run compass sampling frames until the fast phase ends
    fn bootstrap_compass(finder: &mut TrueNorthFinder, camera_yaw: f32, compass: f32) -> Vec<TrueNorthEvent> {
        let camera = pose(0.0, 0.0, camera_yaw);
        let reading = steady_reading(compass);
        let mut events = Vec::new();
        for frame in 0..100 {
            events.extend(finder.update(DT, frame as f64 * DT as f64, &camera, Some(&reading)));
            if finder.phase() == CalculationPhase::SlowInterval {
                break;
            }
        }
        events
    }

    fn north_updates(events: &[TrueNorthEvent]) -> Vec<NorthHeadingUpdate> {
        events
            .iter()
            .filter_map(|e| match e {
                TrueNorthEvent::NorthHeadingUpdated(update) => Some(*update),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_compass_bootstrap_transitions_to_slow_phase() {
        let mut finder = finder(CalculationMode::Compass);
        let events = bootstrap_compass(&mut finder, 30.0, 10.0);

        assert_eq!(finder.phase(), CalculationPhase::SlowInterval);
        assert_eq!(finder.compass_sample_count(), 25);
        assert!(finder.has_compass_estimate());
        assert_abs_diff_eq!(finder.compass_heading(), 20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(finder.heading(), 20.0, epsilon = 1e-4);

        assert_eq!(
            events.first(),
            Some(&TrueNorthEvent::CalculationPhaseChanged(CalculationPhase::FastInterval))
        );
        assert!(events.contains(&TrueNorthEvent::CalculationPhaseChanged(
            CalculationPhase::SlowInterval
        )));
        let updates = north_updates(&events);
        assert_eq!(updates.len(), 1);
        assert!(updates[0].is_priority);
    }

    #[test]
    fn test_compass_reading_wraps_to_positive() {
        let mut finder = finder(CalculationMode::Compass);
        bootstrap_compass(&mut finder, 10.0, 30.0);
        assert_abs_diff_eq!(finder.compass_heading(), 340.0, epsilon = 1e-4);
    }

    #[test]
    fn test_jittery_compass_samples_are_dropped() {
        let mut finder = finder(CalculationMode::Compass);
        let camera = pose(0.0, 0.0, 0.0);
        let mut reading = steady_reading(90.0);
        reading.filtered_velocity = 25.0;

        for frame in 0..20 {
            finder.update(DT, frame as f64, &camera, Some(&reading));
        }
        assert_eq!(finder.compass_sample_count(), 0);

        reading.filtered_velocity = -2.0;
        finder.update(DT, 21.0, &camera, Some(&reading));
        assert_eq!(finder.compass_sample_count(), 1);
    }

    #[test]
    fn test_no_reading_skips_sampling() {
        let mut finder = finder(CalculationMode::Compass);
        let camera = pose(0.0, 0.0, 0.0);
        for frame in 0..10 {
            finder.update(DT, frame as f64, &camera, None);
        }
        assert_eq!(finder.phase(), CalculationPhase::FastInterval);
        assert_eq!(finder.compass_sample_count(), 0);
    }

    #[test]
    fn test_disabled_finder_does_nothing() {
        let mut finder = TrueNorthFinder::new(TrueNorthConfig::default());
        let events = finder.update(DT, 0.0, &pose(0.0, 0.0, 0.0), Some(&steady_reading(0.0)));
        assert!(events.is_empty());
        assert_eq!(finder.phase(), CalculationPhase::Stopped);
    }

    #[test]
    fn test_slow_phase_keeps_estimate_by_default() {
        let mut finder = finder(CalculationMode::Compass);
        bootstrap_compass(&mut finder, 30.0, 10.0);
        let camera = pose(0.0, 0.0, 60.0);
        let reading = steady_reading(10.0);
        let mut events = Vec::new();
        for frame in 0..40 {
            events.extend(finder.update(DT, 100.0 + frame as f64, &camera, Some(&reading)));
        }
        assert!(finder.compass_sample_count() > 25);
        assert_abs_diff_eq!(finder.compass_heading(), 20.0, epsilon = 1e-4);
        assert!(north_updates(&events).is_empty());
    }

    #[test]
    fn test_slow_phase_refinement() {
        let config = TrueNorthConfig {
            enabled: true,
            refine_in_slow_phase: true,
            ..TrueNorthConfig::default()
        };
        let mut finder = TrueNorthFinder::new(config);
        bootstrap_compass(&mut finder, 30.0, 10.0);

        let camera = pose(0.0, 0.0, 60.0);
        let reading = steady_reading(10.0);
        let mut events = Vec::new();
        // Slow interval is 3 s: 12 frames of 0.25 s per sample
        for frame in 0..12 {
            events.extend(finder.update(DT, 100.0 + frame as f64, &camera, Some(&reading)));
        }
        let updates = north_updates(&events);
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].is_priority);
        assert_eq!(finder.compass_sample_count(), 26);
    }

    #[test]
    fn test_gps_and_ar_mode_bootstraps_with_compass_then_stops_sampling() {
        let mut finder = finder(CalculationMode::GpsAndArMovement);
        bootstrap_compass(&mut finder, 30.0, 10.0);
        assert_eq!(finder.phase(), CalculationPhase::SlowInterval);
        assert_abs_diff_eq!(finder.heading(), 20.0, epsilon = 1e-4);

        let count = finder.compass_sample_count();
        let camera = pose(0.0, 0.0, 30.0);
        for frame in 0..40 {
            finder.update(DT, 100.0 + frame as f64, &camera, Some(&steady_reading(10.0)));
        }
        assert_eq!(finder.compass_sample_count(), count);
    }

    #[test]
    fn test_manual_mode_never_samples() {
        let mut finder = finder(CalculationMode::Manual);
        for frame in 0..20 {
            finder.update(DT, frame as f64, &pose(0.0, 0.0, 0.0), Some(&steady_reading(50.0)));
        }
        assert_eq!(finder.phase(), CalculationPhase::Stopped);
        assert_eq!(finder.compass_sample_count(), 0);
    }

    #[test]
    fn test_first_location_only_seeds() {
        let mut finder = finder(CalculationMode::GpsAndArMovement);
        let events = finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);
        assert!(events.is_empty());
        assert!(!finder.has_gpsar_estimate());
    }

    #[test]
    fn test_movement_pair_produces_estimate() {
        let mut finder = finder(CalculationMode::GpsAndArMovement);
        finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);

        // Walk 20 m along AR +X while GPS says due north (~22 m)
        let events = finder.on_location(&fix(60.0002, 25.0, 5.0), &pose(20.0, 0.0, 0.0), 2.0);

        assert!(finder.has_gpsar_estimate());
        assert_abs_diff_eq!(finder.ar_heading(), 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(finder.gps_heading(), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(finder.average_gpsar_heading(), 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(finder.heading(), 90.0, epsilon = 1e-3);
        assert_eq!(finder.movement_sample_count(), 1);

        let updates = north_updates(&events);
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].is_priority);
        assert!(events.iter().any(|e| matches!(
            e,
            TrueNorthEvent::HeadingFromMovementUpdated(m) if (m.heading_difference - 90.0).abs() < 1e-3
        )));
    }

    #[test]
    fn test_movement_correlated_while_disabled() {
        let config = TrueNorthConfig {
            mode: CalculationMode::Both,
            ..TrueNorthConfig::default()
        };
        let mut finder = TrueNorthFinder::new(config);
        assert!(!finder.is_enabled());

        finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);
        finder.on_location(&fix(60.0002, 25.0, 5.0), &pose(20.0, 0.0, 0.0), 2.0);
        assert!(finder.has_gpsar_estimate());
        assert_abs_diff_eq!(finder.heading(), 90.0, epsilon = 1e-3);

        // Compass mode never correlates movement
        let mut compass_only = TrueNorthFinder::new(TrueNorthConfig::default());
        compass_only.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);
        compass_only.on_location(&fix(60.0002, 25.0, 5.0), &pose(20.0, 0.0, 0.0), 2.0);
        assert!(!compass_only.has_gpsar_estimate());
    }

    #[test]
    fn test_short_movement_rejected() {
        let mut finder = finder(CalculationMode::GpsAndArMovement);
        finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);
        // AR moved only 5 m
        let events = finder.on_location(&fix(60.0002, 25.0, 5.0), &pose(5.0, 0.0, 0.0), 2.0);
        assert!(events.is_empty());
        assert_abs_diff_eq!(finder.last_movement_distance(), 5.0, epsilon = 1e-4);
        assert!(!finder.has_gpsar_estimate());
    }

    #[test]
    fn test_inaccurate_gps_rejected_unless_improved() {
        let mut finder = finder(CalculationMode::GpsAndArMovement);
        finder.on_location(&fix(60.0, 25.0, 30.0), &pose(0.0, 0.0, 0.0), 0.0);

        // 30 m accuracy but previous accepted accuracy is unknown (9999), counts as improved
        finder.on_location(&fix(60.0002, 25.0, 30.0), &pose(20.0, 0.0, 0.0), 2.0);
        assert!(finder.has_gpsar_estimate());

        // Same poor accuracy again: neither good enough nor improved
        let events = finder.on_location(&fix(60.0004, 25.0, 30.0), &pose(40.0, 0.0, 0.0), 4.0);
        assert!(events.is_empty());
        assert_eq!(finder.movement_sample_count(), 1);

        // Improved by 5 m
        finder.on_location(&fix(60.0004, 25.0, 25.0), &pose(40.0, 0.0, 0.0), 6.0);
        assert_eq!(finder.movement_sample_count(), 2);
    }

    #[test]
    fn test_location_ignored_in_compass_mode() {
        let mut finder = finder(CalculationMode::Compass);
        finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 0.0), 0.0);
        finder.on_location(&fix(60.0002, 25.0, 5.0), &pose(20.0, 0.0, 0.0), 2.0);
        assert!(!finder.has_gpsar_estimate());
    }

    #[test]
    fn test_both_mode_blends_estimates() {
        let mut finder = finder(CalculationMode::Both);
        // compass estimate 10°
        bootstrap_compass(&mut finder, 20.0, 10.0);
        assert_abs_diff_eq!(finder.heading(), 10.0, epsilon = 1e-4);

        // movement estimate 20°: AR direction 20° clockwise from +Z, GPS due north
        let angle = 20f32.to_radians();
        finder.on_location(&fix(60.0, 25.0, 5.0), &pose(0.0, 0.0, 20.0), 50.0);
        finder.on_location(
            &fix(60.0002, 25.0, 5.0),
            &pose(20.0 * angle.sin(), 20.0 * angle.cos(), 20.0),
            52.0,
        );
        assert_abs_diff_eq!(finder.average_gpsar_heading(), 20.0, epsilon = 1e-3);
        assert_abs_diff_eq!(finder.heading(), 15.0, epsilon = 1e-3);
    }

    #[test]
    fn test_manual_offsets() {
        let mut finder = finder(CalculationMode::Manual);
        let events = finder.offset_to_east(1.0);
        assert_eq!(finder.heading(), 2.0);
        assert!(north_updates(&events)[0].is_priority);

        finder.offset_to_west(2.0);
        finder.offset_to_west(3.0);
        assert_eq!(finder.manual_offset(), -2.0);
        assert_eq!(finder.heading(), -2.0);
    }

    #[test]
    fn test_reset_both_modes() {
        let mut finder = finder(CalculationMode::Compass);
        bootstrap_compass(&mut finder, 30.0, 10.0);
        finder.offset_to_east(50.0);

        let events = finder.reset_both_modes(60.0);
        assert!(!finder.has_compass_estimate());
        assert!(!finder.has_gpsar_estimate());
        assert_eq!(finder.manual_offset(), 0.0);
        assert_eq!(finder.heading(), 0.0);
        assert_eq!(finder.phase(), CalculationPhase::Stopped);
        assert_eq!(finder.compass_sample_count(), 0);
        assert!(events.contains(&TrueNorthEvent::CalculationPhaseChanged(
            CalculationPhase::Stopped
        )));
    }

    #[test]
    fn test_automatic_reset_respects_configuration() {
        let config = TrueNorthConfig {
            enabled: true,
            reset_after_tracking_lost: false,
            ..TrueNorthConfig::default()
        };
        let mut finder = TrueNorthFinder::new(config);
        bootstrap_compass(&mut finder, 30.0, 10.0);

        finder.on_session_state_changed(false, 40.0);
        finder.set_enabled(false, 41.0);
        assert!(finder.has_compass_estimate());

        finder.reset_both_modes(42.0);
        assert!(!finder.has_compass_estimate());
    }

    #[test]
    fn test_disable_resets() {
        let mut finder = finder(CalculationMode::Compass);
        bootstrap_compass(&mut finder, 30.0, 10.0);
        finder.set_enabled(false, 40.0);
        assert!(!finder.has_compass_estimate());
        assert!(!finder.is_enabled());
    }

    #[test]
    fn test_mode_change_event_only_on_change() {
        let mut finder = finder(CalculationMode::Compass);
        assert!(finder.set_mode(CalculationMode::Compass, 0.0).is_empty());
        let events = finder.set_mode(CalculationMode::Both, 0.0);
        assert_eq!(
            events,
            vec![TrueNorthEvent::CalculationModeChanged(CalculationMode::Both)]
        );
    }
}
