//! Sensor error types

use thiserror::Error;

/// Reasons a sensor provider stopped delivering data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// Location services are disabled by the user
    #[error("location service disabled by user")]
    ServiceDisabled,
    /// The service stayed in the initializing state for every startup check
    #[error("location service still initializing after {retries} checks")]
    InitializationTimeout { retries: u32 },
    /// The service reported a failure during startup
    #[error("location service failed to start")]
    ServiceFailed,
}

/// Result type for sensor operations
pub type SensorResult<T> = Result<T, SensorError>;
