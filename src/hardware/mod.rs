//! Hardware abstraction layer for device sensors
//!
//! The host platform implements [`CompassSource`] and [`GpsSource`]; the
//! providers in this module poll them once per frame and publish samples.

pub mod sensor;
pub mod error;
pub mod mock;
pub mod heading_provider;
pub mod location_provider;

pub use sensor::{CompassSource, GpsSource, LocationServiceStatus, RawFix};
pub use error::{SensorError, SensorResult};
pub use mock::{MockCompass, MockGps};
pub use heading_provider::HeadingProvider;
pub use location_provider::{LocationProvider, PollRoutine};
