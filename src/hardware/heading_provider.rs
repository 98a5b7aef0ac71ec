//! Smoothed compass heading

use crate::algorithms::angles::normalize_360;
use crate::core::{HeadingReading, HeadingSample};
use crate::hardware::CompassSource;
use crate::processing::smoothing::AngleSmoother;
use crate::utils::config::HeadingProviderConfig;
use tracing::debug;

/// Polls a [`CompassSource`] once per frame and smooths its heading.
///
/// In fake mode the source is switched off and a configurable fixed heading is
/// reported on every poll instead.
pub struct HeadingProvider<C: CompassSource> {
    source: C,
    config: HeadingProviderConfig,
    smoother: AngleSmoother,
    reading: Option<HeadingReading>,
    last_timestamp: f64,
    fake_heading: f32,
}

impl<C: CompassSource> HeadingProvider<C> {
    pub fn new(mut source: C, config: HeadingProviderConfig) -> Self {
        source.set_enabled(!config.use_fake_data);
        Self {
            smoother: AngleSmoother::new(config.smoothing_time_s),
            fake_heading: normalize_360(config.fake_heading_deg),
            reading: None,
            last_timestamp: f64::NEG_INFINITY,
            source,
            config,
        }
    }

    /// Poll the source. Returns a reading when a new sample arrived, or on every call in fake mode.
    pub fn poll(&mut self, now: f64, dt: f32) -> Option<HeadingReading> {
        if self.config.use_fake_data {
            let reading = HeadingReading {
                raw_heading: self.fake_heading,
                filtered_heading: self.fake_heading,
                filtered_velocity: self.config.fake_velocity_deg_s,
                timestamp: now,
            };
            self.reading = Some(reading);
            return Some(reading);
        }

        let timestamp = self.source.timestamp();
        if !self.source.is_enabled() || timestamp <= self.last_timestamp {
            return None;
        }

        self.last_timestamp = timestamp;
        let sample = HeadingSample {
            raw_heading_deg: self.source.true_heading(),
            timestamp,
        };
        Some(self.apply_sample(sample, dt))
    }

    /// Run a sample through the smoothing filter and publish it
    pub fn apply_sample(&mut self, sample: HeadingSample, dt: f32) -> HeadingReading {
        let filtered = normalize_360(self.smoother.update(sample.raw_heading_deg, dt));
        let reading = HeadingReading {
            raw_heading: sample.raw_heading_deg,
            filtered_heading: filtered,
            filtered_velocity: self.smoother.velocity(),
            timestamp: sample.timestamp,
        };
        self.reading = Some(reading);
        reading
    }

    /// Latest reading, real or fake
    pub fn reading(&self) -> Option<HeadingReading> {
        self.reading
    }

    pub fn use_fake_data(&self) -> bool {
        self.config.use_fake_data
    }

    /// Switch between the compass and the fixed fake heading
    pub fn set_use_fake_data(&mut self, use_fake: bool) {
        if use_fake != self.config.use_fake_data {
            debug!(use_fake, "heading provider data source changed");
            self.smoother.reset();
        }
        self.config.use_fake_data = use_fake;
        self.source.set_enabled(!use_fake);
    }

    pub fn fake_heading(&self) -> f32 {
        self.fake_heading
    }

    pub fn set_fake_heading(&mut self, heading: f32) {
        self.fake_heading = normalize_360(heading);
    }

    pub fn move_fake_heading_east(&mut self) {
        self.fake_heading = normalize_360(self.fake_heading + self.config.fake_step_deg);
    }

    pub fn move_fake_heading_west(&mut self) {
        self.fake_heading = normalize_360(self.fake_heading - self.config.fake_step_deg);
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut C {
        &mut self.source
    }
}
