//! Sensor source traits implemented by the host platform

/// Hardware abstraction for the device compass
pub trait CompassSource {
    /// Whether the compass is currently delivering readings
    fn is_enabled(&self) -> bool;

    /// Turn the compass on or off
    fn set_enabled(&mut self, enabled: bool);

    /// Timestamp of the latest reading (seconds). Increases with every new reading.
    fn timestamp(&self) -> f64;

    /// Latest heading relative to geographic north (degrees)
    fn true_heading(&self) -> f32;
}

/// Lifecycle of the platform location service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LocationServiceStatus {
    #[default]
    Stopped,
    Initializing,
    Running,
    Failed,
}

/// Fix as reported by the location service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f32,
    pub horizontal_accuracy: f32,
    pub vertical_accuracy: f32,
    /// Seconds
    pub timestamp: f64,
}

/// Hardware abstraction for the GPS / location service
pub trait GpsSource {
    /// Whether the user has enabled location services for the application
    fn is_enabled_by_user(&self) -> bool;

    /// Start the service with the requested accuracy and lateral update distance (meters)
    fn start(&mut self, desired_accuracy_m: f32, update_distance_m: f32);

    fn stop(&mut self);

    fn status(&self) -> LocationServiceStatus;

    /// Most recent fix, if the service has produced one
    fn last_fix(&self) -> Option<RawFix>;
}

impl<T: CompassSource + ?Sized> CompassSource for Box<T> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled)
    }

    fn timestamp(&self) -> f64 {
        (**self).timestamp()
    }

    fn true_heading(&self) -> f32 {
        (**self).true_heading()
    }
}

impl<T: GpsSource + ?Sized> GpsSource for Box<T> {
    fn is_enabled_by_user(&self) -> bool {
        (**self).is_enabled_by_user()
    }

    fn start(&mut self, desired_accuracy_m: f32, update_distance_m: f32) {
        (**self).start(desired_accuracy_m, update_distance_m)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn status(&self) -> LocationServiceStatus {
        (**self).status()
    }

    fn last_fix(&self) -> Option<RawFix> {
        (**self).last_fix()
    }
}
