//! AR True North
//!
//! Estimates the rotation between an AR session's world frame and geographic
//! north from compass readings and GPS/AR movement pairs, and places
//! geo-referenced points of interest into the AR scene.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod utils;
pub mod hardware;
pub mod api;
pub mod logging;

// Re-export commonly used types
pub use core::{DevicePose, GeoCoordinate, HeadingReading, HeadingSample, LocationSample, EARTH_RADIUS_M};
pub use processing::{
    CalculationMode, CalculationPhase, ElevationEstimator, GroundHit, MovementHeadingUpdate,
    NorthHeadingUpdate, PoiManager, PoiPositionMode, PoiSet, PoiStatus, PoiTrackingChanged,
    PointOfInterest, PositioningMode, TrackingState, TrueNorthEvent, TrueNorthFinder,
};
pub use hardware::{
    CompassSource, GpsSource, HeadingProvider, LocationProvider, LocationServiceStatus, RawFix,
    SensorError, SensorResult,
};
pub use api::{
    ApiError, ApiResult, ArGeoSession, CallbackHandle, FrameInput, InMemoryRenderer, NullRenderer,
    PoiRenderer, SampleRecorder,
};
pub use utils::{ConfigError, ConfigResult, EngineConfig};
