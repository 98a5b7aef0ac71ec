//! Location service polling with bounded startup and a fake-data mode

use crate::core::{GeoCoordinate, LocationSample};
use crate::hardware::{GpsSource, LocationServiceStatus, SensorError, SensorResult};
use crate::utils::config::LocationProviderConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// The single polling routine owned by the provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollRoutine {
    /// Nothing running
    Idle,
    /// Waiting for the service to leave `Initializing`
    Startup { checks_left: u32, next_check_at: f64 },
    /// Forwarding new fixes from the service
    Streaming,
    /// Emitting the fixed fake coordinate
    Fake { next_fix_at: f64 },
    /// Stopped after a startup failure
    Halted,
}

/// Polls a [`GpsSource`] from the frame loop and publishes new fixes.
///
/// Only one routine runs at a time. Starting a routine cancels the previous
/// one, so switching between real and fake data never produces duplicate
/// fixes.
pub struct LocationProvider<G: GpsSource> {
    source: G,
    config: LocationProviderConfig,
    routine: PollRoutine,
    generation: u64,
    failure: Option<SensorError>,
    rng: StdRng,

    latest_sample: Option<LocationSample>,
    latest_accurate_location: Option<GeoCoordinate>,
    last_location_timestamp: f64,
}

impl<G: GpsSource> LocationProvider<G> {
    pub fn new(source: G, config: LocationProviderConfig) -> Self {
        Self::with_rng(source, config, StdRng::from_entropy())
    }

    /// Provider with a seeded generator for reproducible fake accuracies
    pub fn with_seed(source: G, config: LocationProviderConfig, seed: u64) -> Self {
        Self::with_rng(source, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(source: G, config: LocationProviderConfig, rng: StdRng) -> Self {
        Self {
            source,
            config,
            routine: PollRoutine::Idle,
            generation: 0,
            failure: None,
            rng,
            latest_sample: None,
            latest_accurate_location: None,
            last_location_timestamp: f64::NEG_INFINITY,
        }
    }

    /// Start the routine matching the current data mode, cancelling any running one
    pub fn start(&mut self, now: f64) {
        self.cancel();
        self.generation += 1;
        self.failure = None;

        if self.config.use_fake_data {
            debug!(generation = self.generation, "starting fake location routine");
            self.routine = PollRoutine::Fake {
                next_fix_at: now + self.config.fake_initial_delay_s,
            };
            return;
        }

        if !self.source.is_enabled_by_user() {
            self.halt(SensorError::ServiceDisabled);
            return;
        }

        debug!(generation = self.generation, "starting location service");
        self.source
            .start(self.config.desired_accuracy_m, self.config.update_distance_m);
        self.routine = PollRoutine::Startup {
            checks_left: self.config.startup_retries,
            next_check_at: now,
        };
    }

    /// Stop the running routine. Calling it with nothing running is a no-op.
    pub fn cancel(&mut self) {
        if self.routine != PollRoutine::Idle {
            debug!(generation = self.generation, "location routine cancelled");
        }
        self.routine = PollRoutine::Idle;
    }

    /// Cancel the routine and stop the underlying service
    pub fn stop(&mut self) {
        self.cancel();
        self.source.stop();
    }

    /// Advance the routine. Returns a sample when a new fix is available.
    pub fn poll(&mut self, now: f64) -> Option<LocationSample> {
        match self.routine {
            PollRoutine::Idle | PollRoutine::Halted => None,
            PollRoutine::Startup {
                checks_left,
                next_check_at,
            } => {
                if now < next_check_at {
                    return None;
                }
                match self.source.status() {
                    LocationServiceStatus::Initializing => {
                        if checks_left == 0 {
                            self.halt(SensorError::InitializationTimeout {
                                retries: self.config.startup_retries,
                            });
                        } else {
                            self.routine = PollRoutine::Startup {
                                checks_left: checks_left - 1,
                                next_check_at: now + self.config.startup_retry_interval_s,
                            };
                        }
                        None
                    }
                    LocationServiceStatus::Failed => {
                        self.halt(SensorError::ServiceFailed);
                        None
                    }
                    _ => {
                        info!("location service running");
                        self.routine = PollRoutine::Streaming;
                        self.poll_stream()
                    }
                }
            }
            PollRoutine::Streaming => self.poll_stream(),
            PollRoutine::Fake { next_fix_at } => {
                if now < next_fix_at {
                    return None;
                }
                self.routine = PollRoutine::Fake {
                    next_fix_at: now + self.config.fake_interval_s,
                };
                let sample = self.fake_sample(now);
                Some(self.record(sample))
            }
        }
    }

    fn poll_stream(&mut self) -> Option<LocationSample> {
        if self.source.status() != LocationServiceStatus::Running {
            return None;
        }
        let fix = self.source.last_fix()?;
        if fix.timestamp <= self.last_location_timestamp {
            return None;
        }

        let sample = LocationSample {
            coordinate: GeoCoordinate::new(fix.latitude, fix.longitude),
            altitude: fix.altitude,
            horizontal_accuracy: fix.horizontal_accuracy,
            vertical_accuracy: fix.vertical_accuracy,
            timestamp: fix.timestamp,
        };
        Some(self.record(sample))
    }

    fn fake_sample(&mut self, now: f64) -> LocationSample {
        let range = self.config.fake_accuracy_min_m..self.config.fake_accuracy_max_m;
        LocationSample {
            coordinate: self.config.fake_coordinate,
            altitude: 1.0,
            horizontal_accuracy: self.rng.gen_range(range.clone()),
            vertical_accuracy: self.rng.gen_range(range),
            timestamp: now,
        }
    }

    fn record(&mut self, sample: LocationSample) -> LocationSample {
        self.last_location_timestamp = sample.timestamp;
        if sample.horizontal_accuracy < self.config.accurate_fix_threshold_m {
            self.latest_accurate_location = Some(sample.coordinate);
        }
        self.latest_sample = Some(sample);
        sample
    }

    fn halt(&mut self, error: SensorError) {
        warn!(%error, "location updates stopped");
        self.failure = Some(error);
        self.routine = PollRoutine::Halted;
    }

    /// Switch between the real service and the fake coordinate, restarting the routine on change
    pub fn set_use_fake_data(&mut self, use_fake: bool, now: f64) {
        if use_fake != self.config.use_fake_data {
            self.config.use_fake_data = use_fake;
            self.start(now);
        }
    }

    pub fn use_fake_data(&self) -> bool {
        self.config.use_fake_data
    }

    pub fn set_fake_coordinate(&mut self, coordinate: GeoCoordinate) {
        self.config.fake_coordinate = coordinate;
    }

    /// Last published coordinate
    pub fn location(&self) -> Option<GeoCoordinate> {
        self.latest_sample.map(|sample| sample.coordinate)
    }

    pub fn latest_sample(&self) -> Option<LocationSample> {
        self.latest_sample
    }

    /// Last coordinate published with a horizontal accuracy under the accurate-fix threshold
    pub fn latest_accurate_location(&self) -> Option<GeoCoordinate> {
        self.latest_accurate_location
    }

    pub fn last_location_timestamp(&self) -> Option<f64> {
        self.latest_sample.map(|_| self.last_location_timestamp)
    }

    /// Why the routine halted, if it did
    pub fn failure(&self) -> Option<&SensorError> {
        self.failure.as_ref()
    }

    /// `Err` with the halt reason once the provider has given up
    pub fn health(&self) -> SensorResult<()> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn routine(&self) -> PollRoutine {
        self.routine
    }

    /// Incremented every time a routine is started
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut G {
        &mut self.source
    }
}
