//! Host-facing API
//!
//! The session drives every component from the host's frame loop and fans
//! events out to registered callbacks. Rendering and debug export sit behind
//! their own small interfaces.

pub mod callback;
pub mod recording;
pub mod render;
pub mod session;
pub mod types;

// Re-export commonly used API types
pub use types::{ApiError, ApiResult, FrameInput, SessionSnapshot};
pub use callback::{CallbackHandle, CallbackRegistry, EventCallback};
pub use recording::{RecorderState, RecordingError, SampleRecord, SampleRecorder};
pub use render::{InMemoryRenderer, NullRenderer, PoiRenderer, RenderCall, RenderedPoi};
pub use session::ArGeoSession;
