//! Stateful estimators: smoothing, true north fusion, POI tracking, elevation

pub mod smoothing;
pub mod window;
pub mod timer;
pub mod true_north;
pub mod poi;
pub mod poi_tracker;
pub mod elevation;

pub use smoothing::AngleSmoother;
pub use window::AngularDeltaWindow;
pub use timer::IntervalTimer;
pub use true_north::{
    CalculationMode, CalculationPhase, MovementHeadingUpdate, NorthHeadingUpdate, TrueNorthEvent,
    TrueNorthFinder,
};
pub use poi::{PoiPositionMode, PoiSet, PointOfInterest, TrackingState};
pub use poi_tracker::{
    LocationUpdateGate, PoiManager, PoiStatus, PoiTracker, PoiTrackingChanged, PositioningMode,
    ProjectionContext,
};
pub use elevation::{ElevationEstimator, GroundHit};
