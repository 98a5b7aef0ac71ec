//! Frame-driven session tying sensors, true north fusion and POI tracking together
//!
//! The host calls [`ArGeoSession::tick`] once per rendered frame. Within a
//! tick the heading is polled and sampled first, then the ground estimate is
//! refreshed, then a new location fix (if any) is correlated with the AR
//! movement before the points of interest are recomputed. North heading
//! updates reach the POI reprojection before any external listener sees them.

use crate::api::callback::{CallbackHandle, CallbackRegistry, EventCallback, HandleAllocator};
use crate::api::render::PoiRenderer;
use crate::api::types::{ApiError, ApiResult, FrameInput, SessionSnapshot};
use crate::core::{DevicePose, HeadingReading, LocationSample};
use crate::hardware::{CompassSource, GpsSource, HeadingProvider, LocationProvider};
use crate::processing::elevation::ElevationEstimator;
use crate::processing::poi::PoiSet;
use crate::processing::poi_tracker::{PoiManager, PoiTrackingChanged, ProjectionContext};
use crate::processing::true_north::{
    CalculationMode, CalculationPhase, MovementHeadingUpdate, NorthHeadingUpdate, TrueNorthEvent,
    TrueNorthFinder,
};
use crate::utils::config::EngineConfig;
use tracing::debug;

/// External listener lists, one per event kind
#[derive(Default)]
struct Listeners {
    heading: CallbackRegistry<HeadingReading>,
    location: CallbackRegistry<LocationSample>,
    north_heading: CallbackRegistry<NorthHeadingUpdate>,
    heading_from_movement: CallbackRegistry<MovementHeadingUpdate>,
    mode_changed: CallbackRegistry<CalculationMode>,
    phase_changed: CallbackRegistry<CalculationPhase>,
    poi_tracking_changed: CallbackRegistry<PoiTrackingChanged>,
}

impl Listeners {
    fn remove(&mut self, handle: CallbackHandle) -> bool {
        self.heading.remove(handle)
            || self.location.remove(handle)
            || self.north_heading.remove(handle)
            || self.heading_from_movement.remove(handle)
            || self.mode_changed.remove(handle)
            || self.phase_changed.remove(handle)
            || self.poi_tracking_changed.remove(handle)
    }
}

/// AR geolocation session
pub struct ArGeoSession<C: CompassSource, G: GpsSource, R: PoiRenderer> {
    heading: HeadingProvider<C>,
    location: LocationProvider<G>,
    finder: TrueNorthFinder,
    pois: PoiManager,
    elevation: ElevationEstimator,
    renderer: R,
    camera: DevicePose,
    handles: HandleAllocator,
    listeners: Listeners,
}

impl<C: CompassSource, G: GpsSource, R: PoiRenderer> ArGeoSession<C, G, R> {
    pub fn new(config: EngineConfig, compass: C, gps: G, renderer: R, pois: PoiSet) -> Self {
        let location = LocationProvider::new(gps, config.location.clone());
        Self::with_location_provider(config, compass, location, renderer, pois)
    }

    /// Session around an already constructed location provider
    pub fn with_location_provider(
        config: EngineConfig,
        compass: C,
        location: LocationProvider<G>,
        renderer: R,
        pois: PoiSet,
    ) -> Self {
        Self {
            heading: HeadingProvider::new(compass, config.heading.clone()),
            location,
            finder: TrueNorthFinder::new(config.true_north.clone()),
            pois: PoiManager::new(config.poi_tracking.clone(), pois),
            elevation: ElevationEstimator::new(config.elevation.clone()),
            renderer,
            camera: DevicePose::default(),
            handles: HandleAllocator::new(),
            listeners: Listeners::default(),
        }
    }

    /// Start location updates
    pub fn start(&mut self, now: f64) {
        self.location.start(now);
    }

    /// Stop location updates and tear down every tracked point of interest
    pub fn shutdown(&mut self) {
        self.location.stop();
        let changes = self.pois.stop_tracking_all(&mut self.renderer);
        self.dispatch_tracking_changes(changes);
    }

    /// Advance the session by one frame
    pub fn tick(&mut self, frame: &FrameInput) {
        self.camera = frame.camera;

        if let Some(reading) = self.heading.poll(frame.now, frame.dt) {
            self.listeners.heading.dispatch(&reading);
        }

        let reading = self.heading.reading();
        let events = self
            .finder
            .update(frame.dt, frame.now, &frame.camera, reading.as_ref());
        self.route(events);

        self.elevation.update(frame.dt, frame.ground_hit);

        if let Some(sample) = self.location.poll(frame.now) {
            self.handle_location(&sample, frame.now);
        }

        self.pois
            .update_visibility(&frame.camera.position, frame.far_clip, &mut self.renderer);
    }

    fn handle_location(&mut self, sample: &LocationSample, now: f64) {
        let events = self.finder.on_location(sample, &self.camera, now);
        self.route(events);

        let context = self.projection_context();
        let changes = self.pois.on_location(sample, &context, &mut self.renderer);
        self.dispatch_tracking_changes(changes);

        self.listeners.location.dispatch(sample);
    }

    /// AR tracking acquired (`true`) or lost (`false`)
    pub fn on_session_state_changed(&mut self, tracking: bool, now: f64) {
        debug!(tracking, "session tracking state changed");
        let events = self.finder.on_session_state_changed(tracking, now);
        self.route(events);

        let context = self.projection_context();
        let last_location = self.location.location();
        let changes = self.pois.on_session_state_changed(
            tracking,
            last_location.as_ref(),
            &context,
            &mut self.renderer,
        );
        self.dispatch_tracking_changes(changes);
    }

    pub fn set_enabled(&mut self, enabled: bool, now: f64) {
        let events = self.finder.set_enabled(enabled, now);
        self.route(events);
    }

    pub fn set_calculation_mode(&mut self, mode: CalculationMode, now: f64) {
        let events = self.finder.set_mode(mode, now);
        self.route(events);
    }

    pub fn offset_to_east(&mut self, now: f64) {
        let events = self.finder.offset_to_east(now);
        self.route(events);
    }

    pub fn offset_to_west(&mut self, now: f64) {
        let events = self.finder.offset_to_west(now);
        self.route(events);
    }

    pub fn reset_both_modes(&mut self, now: f64) {
        let events = self.finder.reset_both_modes(now);
        self.route(events);
    }

    pub fn set_use_fake_location(&mut self, use_fake: bool, now: f64) {
        self.location.set_use_fake_data(use_fake, now);
    }

    pub fn set_use_fake_heading(&mut self, use_fake: bool) {
        self.heading.set_use_fake_data(use_fake);
    }

    /// Replace the point of interest set and re-evaluate against the last location
    pub fn set_points_of_interest(&mut self, set: PoiSet) {
        let mut changes = self.pois.set_points_of_interest(set, &mut self.renderer);
        if let Some(location) = self.location.location() {
            let context = self.projection_context();
            changes.extend(
                self.pois
                    .recheck_trackings(&location, &context, &mut self.renderer),
            );
        }
        self.dispatch_tracking_changes(changes);
    }

    fn projection_context(&self) -> ProjectionContext {
        ProjectionContext {
            camera: self.camera,
            ground_level: self.elevation.ground_level(),
            heading: self.finder.heading(),
        }
    }

    fn route(&mut self, events: Vec<TrueNorthEvent>) {
        for event in events {
            match event {
                TrueNorthEvent::NorthHeadingUpdated(update) => {
                    self.pois.on_north_heading(&update, &mut self.renderer);
                    self.listeners.north_heading.dispatch(&update);
                }
                TrueNorthEvent::HeadingFromMovementUpdated(update) => {
                    self.listeners.heading_from_movement.dispatch(&update);
                }
                TrueNorthEvent::CalculationModeChanged(mode) => {
                    self.listeners.mode_changed.dispatch(&mode);
                }
                TrueNorthEvent::CalculationPhaseChanged(phase) => {
                    self.listeners.phase_changed.dispatch(&phase);
                }
            }
        }
    }

    fn dispatch_tracking_changes(&mut self, changes: Vec<PoiTrackingChanged>) {
        for change in &changes {
            self.listeners.poi_tracking_changed.dispatch(change);
        }
    }

    /// Register a listener for smoothed compass readings
    pub fn on_heading(&mut self, callback: EventCallback<HeadingReading>) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.heading.insert(handle, callback);
        handle
    }

    /// Register a listener for location fixes
    pub fn on_location(&mut self, callback: EventCallback<LocationSample>) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.location.insert(handle, callback);
        handle
    }

    /// Register a listener for fused true north heading updates
    pub fn on_north_heading(&mut self, callback: EventCallback<NorthHeadingUpdate>) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.north_heading.insert(handle, callback);
        handle
    }

    /// Register a listener for accepted GPS/AR movement pairs
    pub fn on_heading_from_movement(
        &mut self,
        callback: EventCallback<MovementHeadingUpdate>,
    ) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.heading_from_movement.insert(handle, callback);
        handle
    }

    pub fn on_mode_changed(&mut self, callback: EventCallback<CalculationMode>) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.mode_changed.insert(handle, callback);
        handle
    }

    pub fn on_phase_changed(&mut self, callback: EventCallback<CalculationPhase>) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.phase_changed.insert(handle, callback);
        handle
    }

    pub fn on_poi_tracking_changed(
        &mut self,
        callback: EventCallback<PoiTrackingChanged>,
    ) -> CallbackHandle {
        let handle = self.handles.next_handle();
        self.listeners.poi_tracking_changed.insert(handle, callback);
        handle
    }

    /// Unregister a listener
    pub fn unregister(&mut self, handle: CallbackHandle) -> ApiResult<()> {
        if self.listeners.remove(handle) {
            Ok(())
        } else {
            Err(ApiError::UnknownCallback { handle: handle.id() })
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let sample = self.location.latest_sample();
        SessionSnapshot {
            heading: self.finder.heading(),
            compass_heading: self
                .finder
                .has_compass_estimate()
                .then(|| self.finder.compass_heading()),
            gpsar_heading: self
                .finder
                .has_gpsar_estimate()
                .then(|| self.finder.average_gpsar_heading()),
            location: sample.map(|s| s.coordinate),
            horizontal_accuracy: sample.map(|s| s.horizontal_accuracy),
            device_elevation: self.elevation.device_elevation(),
            tracked_pois: self.pois.tracked_ids().len(),
        }
    }

    pub fn finder(&self) -> &TrueNorthFinder {
        &self.finder
    }

    pub fn pois(&self) -> &PoiManager {
        &self.pois
    }

    pub fn heading_provider(&self) -> &HeadingProvider<C> {
        &self.heading
    }

    pub fn heading_provider_mut(&mut self) -> &mut HeadingProvider<C> {
        &mut self.heading
    }

    pub fn location_provider(&self) -> &LocationProvider<G> {
        &self.location
    }

    pub fn location_provider_mut(&mut self) -> &mut LocationProvider<G> {
        &mut self.location
    }

    pub fn elevation(&self) -> &ElevationEstimator {
        &self.elevation
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::render::InMemoryRenderer;
    use crate::core::GeoCoordinate;
    use crate::hardware::{MockCompass, MockGps};
    use crate::processing::elevation::GroundHit;
    use crate::processing::poi::{PointOfInterest, TrackingState};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use std::sync::{Arc, Mutex};

    type TestSession = ArGeoSession<MockCompass, MockGps, InMemoryRenderer>;

    const POI: GeoCoordinate = GeoCoordinate {
        latitude: 65.0,
        longitude: 25.5,
    };

    fn meters_per_degree() -> f64 {
        crate::core::EARTH_RADIUS_M.to_radians()
    }

    fn south_of_poi(meters: f64) -> GeoCoordinate {
        GeoCoordinate::new(POI.latitude - meters / meters_per_degree(), POI.longitude)
    }

    fn session(config: EngineConfig) -> TestSession {
        let poi = PointOfInterest::new("tower", "Tower", POI)
            .with_tracking_radius(100.0, 20.0)
            .with_close_tracking_radius(20.0, 10.0);
        let set = PoiSet::new("walk", vec![poi]).unwrap();
        let mut session = ArGeoSession::new(
            config,
            MockCompass::new(),
            MockGps::new(),
            InMemoryRenderer::new(),
            set,
        );
        session.start(0.0);
        session
    }

    fn frame(now: f64, dt: f32) -> FrameInput {
        FrameInput::new(now, dt, DevicePose::new(Vector3::new(0.0, 1.4, 0.0), 0.0))
    }

    #[test]
    fn test_walk_towards_poi() {
        let mut session = session(EngineConfig::default());
        let transitions = Arc::new(Mutex::new(Vec::new()));
        {
            let transitions = Arc::clone(&transitions);
            session.on_poi_tracking_changed(Box::new(move |change: &PoiTrackingChanged| {
                transitions.lock().unwrap().push((change.from, change.to));
            }));
        }

        // Fixes every 2 s at 5 m accuracy: stand 50 m away, then approach
        let distances = [50.0, 50.0, 50.0, 45.0, 35.0, 25.0, 19.0, 12.0];
        let mut saw_close_early = false;
        for (i, distance) in distances.iter().enumerate() {
            let now = 2.0 * (i + 1) as f64;
            session
                .location_provider_mut()
                .source_mut()
                .push_coordinate(south_of_poi(*distance), 5.0, now);
            session.tick(&frame(now, 0.02));

            if *distance > 20.0 && session.pois().tracking_state("tower") == TrackingState::CloseTracking {
                saw_close_early = true;
            }
        }

        assert!(!saw_close_early);
        assert_eq!(
            *transitions.lock().unwrap(),
            vec![
                (TrackingState::NotTracking, TrackingState::FarTracking),
                (TrackingState::FarTracking, TrackingState::CloseTracking),
            ]
        );
        assert!(session.renderer().contains("tower"));
        assert_eq!(session.snapshot().tracked_pois, 1);
    }

    #[test]
    fn test_compass_bootstrap_reaches_listeners() {
        let config = EngineConfig {
            true_north: crate::utils::config::TrueNorthConfig {
                enabled: true,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        let mut session = session(config);
        let north_events = Arc::new(Mutex::new(Vec::new()));
        let phases = Arc::new(Mutex::new(Vec::new()));
        {
            let north_events = Arc::clone(&north_events);
            session.on_north_heading(Box::new(move |update: &NorthHeadingUpdate| {
                north_events.lock().unwrap().push(*update);
            }));
            let phases = Arc::clone(&phases);
            session.on_phase_changed(Box::new(move |phase: &CalculationPhase| {
                phases.lock().unwrap().push(*phase);
            }));
        }

        for i in 0..40 {
            let now = 0.25 * (i + 1) as f64;
            session
                .heading_provider_mut()
                .source_mut()
                .set_reading(20.0, now);
            session.tick(&frame(now, 0.25));
        }

        let north_events = north_events.lock().unwrap();
        let priority: Vec<_> = north_events.iter().filter(|e| e.is_priority).collect();
        assert_eq!(priority.len(), 1);
        assert_abs_diff_eq!(priority[0].heading, 340.0, epsilon = 1e-3);
        assert_eq!(
            *phases.lock().unwrap(),
            vec![CalculationPhase::FastInterval, CalculationPhase::SlowInterval]
        );
        assert_eq!(session.snapshot().compass_heading, Some(session.finder().compass_heading()));
    }

    #[test]
    fn test_heading_reprojects_tracked_poi() {
        let mut session = session(EngineConfig::default());
        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(50.0), 5.0, 1.0);
        session.tick(&frame(1.0, 0.02));

        let before = session.renderer().get("tower").unwrap().position;
        assert_abs_diff_eq!(before.z, 50.0, epsilon = 0.1);

        // Manual offsets are priority updates and rotate the POI around the camera
        session.set_calculation_mode(CalculationMode::Manual, 2.0);
        for _ in 0..45 {
            session.offset_to_east(2.0);
        }
        let after = session.renderer().get("tower").unwrap().position;
        assert_abs_diff_eq!(session.finder().heading(), 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(after.x, 50.0, epsilon = 0.1);
        assert_abs_diff_eq!(after.z, 0.0, epsilon = 0.1);
    }

    #[test]
    fn test_elevation_feeds_poi_height() {
        let mut session = session(EngineConfig::default());
        session.tick(&frame(0.0, 0.2).with_ground_hit(GroundHit { distance: 1.5, hit_y: -0.1 }));
        assert_abs_diff_eq!(session.elevation().device_elevation(), 1.5);

        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(40.0), 5.0, 1.0);
        session.tick(&frame(1.0, 0.02));
        let position = session.renderer().get("tower").unwrap().position;
        assert_abs_diff_eq!(position.y, -0.15, epsilon = 1e-4);
    }

    #[test]
    fn test_far_clip_hides_poi() {
        let mut session = session(EngineConfig::default());
        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(60.0), 5.0, 1.0);
        session.tick(&frame(1.0, 0.02).with_far_clip(30.0));
        assert!(!session.renderer().get("tower").unwrap().visible);

        session.tick(&frame(1.1, 0.02).with_far_clip(200.0));
        assert!(session.renderer().get("tower").unwrap().visible);
    }

    #[test]
    fn test_tracking_lost_and_regained() {
        let mut session = session(EngineConfig::default());
        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(50.0), 5.0, 1.0);
        session.tick(&frame(1.0, 0.02));

        session.on_session_state_changed(false, 2.0);
        assert_eq!(session.pois().gate().previous_accuracy(), crate::core::UNKNOWN_ACCURACY_M);

        session.on_session_state_changed(true, 3.0);
        assert_eq!(session.pois().tracking_state("tower"), TrackingState::FarTracking);
    }

    #[test]
    fn test_replacing_poi_set_tears_down_removed() {
        let mut session = session(EngineConfig::default());
        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(50.0), 5.0, 1.0);
        session.tick(&frame(1.0, 0.02));
        assert!(session.renderer().contains("tower"));

        let other = PointOfInterest::new("bridge", "Bridge", south_of_poi(30.0));
        session.set_points_of_interest(PoiSet::new("walk", vec![other]).unwrap());
        assert!(!session.renderer().contains("tower"));
        assert!(session.renderer().contains("bridge"));
    }

    #[test]
    fn test_unregister() {
        let mut session = session(EngineConfig::default());
        let handle = session.on_location(Box::new(|_: &LocationSample| {}));
        assert!(session.unregister(handle).is_ok());
        assert_eq!(
            session.unregister(handle),
            Err(ApiError::UnknownCallback { handle: handle.id() })
        );
    }

    #[test]
    fn test_location_listener_sees_fix() {
        let mut session = session(EngineConfig::default());
        let fixes = Arc::new(Mutex::new(Vec::new()));
        {
            let fixes = Arc::clone(&fixes);
            session.on_location(Box::new(move |sample: &LocationSample| {
                fixes.lock().unwrap().push(sample.coordinate);
            }));
        }
        session
            .location_provider_mut()
            .source_mut()
            .push_coordinate(south_of_poi(500.0), 12.0, 1.0);
        session.tick(&frame(1.0, 0.02));
        session.tick(&frame(1.02, 0.02));

        assert_eq!(*fixes.lock().unwrap(), vec![south_of_poi(500.0)]);
        assert_eq!(session.pois().tracking_state("tower"), TrackingState::NotTracking);
    }
}
