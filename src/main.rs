use ar_truenorth::api::{ArGeoSession, FrameInput, InMemoryRenderer, SampleRecorder};
use ar_truenorth::core::{DevicePose, GeoCoordinate, EARTH_RADIUS_M};
use ar_truenorth::hardware::{MockCompass, MockGps};
use ar_truenorth::logging;
use ar_truenorth::processing::{
    CalculationMode, GroundHit, MovementHeadingUpdate, NorthHeadingUpdate, PoiSet, PoiTrackingChanged,
    PointOfInterest,
};
use ar_truenorth::utils::EngineConfig;
use nalgebra::Vector3;
use tracing::info;

/// Compass bearing the AR forward axis points at in the simulated walk
const AR_FORWARD_BEARING_DEG: f64 = 330.0;
const WALK_SPEED_M_S: f64 = 1.2;
const FRAME_DT_S: f32 = 0.1;
const WALK_DURATION_S: f64 = 90.0;
const FIX_INTERVAL_S: f64 = 1.0;
const CAMERA_HEIGHT_M: f32 = 1.4;

const START: GeoCoordinate = GeoCoordinate {
    latitude: 66.503_06,
    longitude: 25.729_39,
};

/// Coordinate `distance_m` from `origin` along `bearing_deg`, flat-earth approximation
fn offset_coordinate(origin: &GeoCoordinate, distance_m: f64, bearing_deg: f64) -> GeoCoordinate {
    let meters_per_degree = EARTH_RADIUS_M.to_radians();
    let bearing = bearing_deg.to_radians();
    let dlat = distance_m * bearing.cos() / meters_per_degree;
    let dlon = distance_m * bearing.sin() / (meters_per_degree * origin.latitude.to_radians().cos());
    GeoCoordinate::new(origin.latitude + dlat, origin.longitude + dlon)
}

fn default_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.true_north.enabled = true;
    config.true_north.mode = CalculationMode::Both;
    config
}

fn default_pois() -> Result<PoiSet, Box<dyn std::error::Error>> {
    let ahead = PointOfInterest::new("kiosk", "Kiosk", offset_coordinate(&START, 80.0, AR_FORWARD_BEARING_DEG));
    let aside = PointOfInterest::new("statue", "Statue", offset_coordinate(&START, 60.0, 60.0));
    Ok(PoiSet::new("demo walk", vec![ahead, aside])?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(logging::default_directive())?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        eprintln!(
            "Usage: {} [config.json] [points_of_interest.json]",
            args.first().map_or("ar-truenorth", |s| s.as_str())
        );
        return Err("Invalid arguments".into());
    }

    let config = match args.get(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => default_config(),
    };
    let pois = match args.get(2) {
        Some(path) => PoiSet::load_from_file(path)?,
        None => default_pois()?,
    };
    info!(pois = pois.len(), mode = %config.true_north.mode, "starting simulated walk");

    let mut compass = MockCompass::new();
    compass.simulate_noise(2.0);

    let mut session = ArGeoSession::new(config, compass, MockGps::new(), InMemoryRenderer::new(), pois);

    session.on_north_heading(Box::new(|update: &NorthHeadingUpdate| {
        info!(heading = update.heading, priority = update.is_priority, "true north heading updated");
    }));
    session.on_heading_from_movement(Box::new(|update: &MovementHeadingUpdate| {
        info!(
            ar = update.ar_heading,
            gps = update.gps_heading,
            difference = update.heading_difference,
            average = update.average_heading_difference,
            "movement heading pair"
        );
    }));
    session.on_poi_tracking_changed(Box::new(|change: &PoiTrackingChanged| {
        info!(poi = %change.id, from = ?change.from, to = ?change.to, "tracking changed");
    }));

    let mut recorder = SampleRecorder::new();
    recorder.start();

    session.start(0.0);
    session.on_session_state_changed(true, 0.0);

    let compass_heading = AR_FORWARD_BEARING_DEG as f32;
    let frames = (WALK_DURATION_S / FRAME_DT_S as f64) as u32;
    let mut next_fix_at = FIX_INTERVAL_S;
    let mut last_recorded = f64::NEG_INFINITY;

    for frame in 1..=frames {
        let now = frame as f64 * FRAME_DT_S as f64;
        let walked = WALK_SPEED_M_S * now;

        // The device faces AR forward, which is `AR_FORWARD_BEARING_DEG` on the compass
        session
            .heading_provider_mut()
            .source_mut()
            .set_reading(compass_heading, now);

        if now >= next_fix_at {
            next_fix_at += FIX_INTERVAL_S;
            let coordinate = offset_coordinate(&START, walked, AR_FORWARD_BEARING_DEG);
            session
                .location_provider_mut()
                .source_mut()
                .push_coordinate(coordinate, 4.0, now);
        }

        let camera = DevicePose::new(Vector3::new(0.0, CAMERA_HEIGHT_M, walked as f32), 0.0);
        let input = FrameInput::new(now, FRAME_DT_S, camera)
            .with_ground_hit(GroundHit {
                distance: CAMERA_HEIGHT_M,
                hit_y: 0.0,
            })
            .with_far_clip(150.0);
        session.tick(&input);

        if let Some(sample) = session.location_provider().latest_sample() {
            if sample.timestamp > last_recorded {
                last_recorded = sample.timestamp;
                recorder.record(&sample, session.heading_provider().reading().as_ref());
            }
        }
    }

    let snapshot = session.snapshot();
    info!(
        heading = snapshot.heading,
        compass = ?snapshot.compass_heading,
        gpsar = ?snapshot.gpsar_heading,
        tracked = snapshot.tracked_pois,
        recorded = recorder.records().len(),
        "walk finished"
    );
    for id in session.pois().tracked_ids() {
        if let Some(rendered) = session.renderer().get(id) {
            info!(poi = %id, position = ?rendered.position, visible = rendered.visible, "rendered point of interest");
        }
    }

    session.shutdown();
    Ok(())
}
