//! Rendering seam for tracked points of interest
//!
//! The engine never draws anything. It pushes positions, rotations and
//! visibility through [`PoiRenderer`]; a host application implements the trait
//! on top of whatever scene graph it uses.

use crate::processing::poi::PointOfInterest;
use nalgebra::Vector3;
use std::collections::HashMap;

/// Capabilities the POI tracker needs from a rendering backend.
///
/// Calls addressed to an id without a live visual must be ignored.
pub trait PoiRenderer {
    /// A point of interest started tracking; create its visuals
    fn create(&mut self, poi: &PointOfInterest);

    /// The point of interest stopped tracking; release its visuals
    fn destroy(&mut self, id: &str);

    /// Full world position including height
    fn update_position(&mut self, id: &str, position: Vector3<f32>);

    /// Horizontal position only, height is kept
    fn update_position_xz(&mut self, id: &str, x: f32, z: f32);

    /// Height only
    fn update_position_y(&mut self, id: &str, y: f32);

    /// Rotation around the vertical axis (degrees)
    fn update_rotation(&mut self, id: &str, y_degrees: f32);

    /// Distance to the device for labels (meters)
    fn update_distance(&mut self, id: &str, distance_m: f32);

    fn set_visibility(&mut self, id: &str, visible: bool);
}

/// Renderer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl PoiRenderer for NullRenderer {
    fn create(&mut self, _poi: &PointOfInterest) {}
    fn destroy(&mut self, _id: &str) {}
    fn update_position(&mut self, _id: &str, _position: Vector3<f32>) {}
    fn update_position_xz(&mut self, _id: &str, _x: f32, _z: f32) {}
    fn update_position_y(&mut self, _id: &str, _y: f32) {}
    fn update_rotation(&mut self, _id: &str, _y_degrees: f32) {}
    fn update_distance(&mut self, _id: &str, _distance_m: f32) {}
    fn set_visibility(&mut self, _id: &str, _visible: bool) {}
}

/// State of one rendered point of interest
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPoi {
    pub name: String,
    pub position: Vector3<f32>,
    pub rotation_y: f32,
    pub distance_m: f32,
    pub visible: bool,
}

/// Kind of call received by [`InMemoryRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCall {
    Create,
    Destroy,
    Position,
    PositionXz,
    PositionY,
    Rotation,
    Distance,
    Visibility,
}

/// Number of most recent calls kept by [`InMemoryRenderer`]
pub const MAX_LOGGED_CALLS: usize = 1024;

/// Renderer keeping the latest state of every visual in memory, plus a log of
/// the most recent [`MAX_LOGGED_CALLS`] calls
#[derive(Debug, Clone, Default)]
pub struct InMemoryRenderer {
    objects: HashMap<String, RenderedPoi>,
    calls: Vec<(RenderCall, String)>,
}

impl InMemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RenderedPoi> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Most recent calls received, oldest first
    pub fn calls(&self) -> &[(RenderCall, String)] {
        &self.calls
    }

    /// Number of calls of one kind received for `id`
    pub fn call_count(&self, id: &str, kind: RenderCall) -> usize {
        self.calls
            .iter()
            .filter(|(call, call_id)| *call == kind && call_id == id)
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn log_call(&mut self, kind: RenderCall, id: &str) {
        if self.calls.len() >= MAX_LOGGED_CALLS {
            let excess = self.calls.len() + 1 - MAX_LOGGED_CALLS;
            self.calls.drain(..excess);
        }
        self.calls.push((kind, id.to_string()));
    }

    fn record(&mut self, kind: RenderCall, id: &str) -> Option<&mut RenderedPoi> {
        self.log_call(kind, id);
        self.objects.get_mut(id)
    }
}

impl PoiRenderer for InMemoryRenderer {
    fn create(&mut self, poi: &PointOfInterest) {
        self.log_call(RenderCall::Create, &poi.id);
        self.objects.insert(
            poi.id.clone(),
            RenderedPoi {
                name: poi.name.clone(),
                position: Vector3::zeros(),
                rotation_y: 0.0,
                distance_m: 0.0,
                visible: true,
            },
        );
    }

    fn destroy(&mut self, id: &str) {
        self.log_call(RenderCall::Destroy, id);
        self.objects.remove(id);
    }

    fn update_position(&mut self, id: &str, position: Vector3<f32>) {
        if let Some(object) = self.record(RenderCall::Position, id) {
            object.position = position;
        }
    }

    fn update_position_xz(&mut self, id: &str, x: f32, z: f32) {
        if let Some(object) = self.record(RenderCall::PositionXz, id) {
            object.position.x = x;
            object.position.z = z;
        }
    }

    fn update_position_y(&mut self, id: &str, y: f32) {
        if let Some(object) = self.record(RenderCall::PositionY, id) {
            object.position.y = y;
        }
    }

    fn update_rotation(&mut self, id: &str, y_degrees: f32) {
        if let Some(object) = self.record(RenderCall::Rotation, id) {
            object.rotation_y = y_degrees;
        }
    }

    fn update_distance(&mut self, id: &str, distance_m: f32) {
        if let Some(object) = self.record(RenderCall::Distance, id) {
            object.distance_m = distance_m;
        }
    }

    fn set_visibility(&mut self, id: &str, visible: bool) {
        if let Some(object) = self.record(RenderCall::Visibility, id) {
            object.visible = visible;
        }
    }
}
