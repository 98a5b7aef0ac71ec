//! Debug export of recorded location and compass samples

use crate::core::{HeadingReading, LocationSample};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Recording export errors
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("failed to write recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize recording: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("recorder is saving, samples are not accepted")]
    Busy,
}

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Stopped,
    Recording,
    Saving,
}

/// One exported sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// 1-based sequence number
    pub index: u32,
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f32,
    pub vertical_accuracy: f32,
    pub compass_heading: f32,
}

#[derive(Serialize)]
struct RecordFile<'a> {
    records: &'a [SampleRecord],
}

/// Collects samples while recording and writes them out as JSON
#[derive(Debug, Default)]
pub struct SampleRecorder {
    state: RecorderState,
    records: Vec<SampleRecord>,
}

impl SampleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if self.state == RecorderState::Stopped {
            self.state = RecorderState::Recording;
        }
    }

    pub fn stop(&mut self) {
        self.state = RecorderState::Stopped;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Record the latest location together with the filtered compass heading.
    ///
    /// Ignored unless recording.
    pub fn record(&mut self, sample: &LocationSample, heading: Option<&HeadingReading>) -> Option<&SampleRecord> {
        if self.state != RecorderState::Recording {
            return None;
        }

        self.records.push(SampleRecord {
            index: self.records.len() as u32 + 1,
            timestamp: sample.timestamp,
            latitude: sample.coordinate.latitude,
            longitude: sample.coordinate.longitude,
            horizontal_accuracy: sample.horizontal_accuracy,
            vertical_accuracy: sample.vertical_accuracy,
            compass_heading: heading.map(|h| h.filtered_heading).unwrap_or(0.0),
        });
        self.records.last()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn to_json(&self) -> Result<String, RecordingError> {
        Ok(serde_json::to_string_pretty(&RecordFile {
            records: &self.records,
        })?)
    }

    /// Write `<prefix>_<now_label>.json` into `dir` and return its path
    pub fn save_to_dir<P: AsRef<Path>>(
        &mut self,
        dir: P,
        prefix: &str,
        now_label: &str,
    ) -> Result<PathBuf, RecordingError> {
        if self.state == RecorderState::Saving {
            return Err(RecordingError::Busy);
        }
        let previous = self.state;
        self.state = RecorderState::Saving;

        let result = self.write_file(dir.as_ref(), prefix, now_label);
        self.state = previous;
        result
    }

    fn write_file(&self, dir: &Path, prefix: &str, now_label: &str) -> Result<PathBuf, RecordingError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{prefix}_{now_label}.json"));
        fs::write(&path, self.to_json()?)?;
        info!(path = %path.display(), records = self.records.len(), "recording saved");
        Ok(path)
    }

    /// Drop every record; numbering restarts at 1
    pub fn reset(&mut self) {
        self.records.clear();
    }
}
