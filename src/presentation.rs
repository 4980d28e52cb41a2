//! Boundary between the particle core and whatever draws particles.

use serde::{Deserialize, Serialize};

use crate::severity::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualHandle(u64);

impl VisualHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Position = Position::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: f32, dy: f32, dz: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Distance from `center` in the horizontal (x/z) plane.
    pub fn horizontal_distance(self, center: Position) -> f32 {
        let dx = self.x - center.x;
        let dz = self.z - center.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Rendering capability consumed by the population manager.
///
/// Calls are best effort: an adapter that cannot build an object returns
/// `None`, and destroying an unknown handle is ignored.
pub trait PresentationAdapter {
    /// Whether the scene can accept objects yet.
    fn is_ready(&self) -> bool {
        true
    }

    fn create_visual_object(&mut self, position: Position, color: Rgb) -> Option<VisualHandle>;

    fn destroy_visual_object(&mut self, handle: VisualHandle);

    /// Fire-and-forget request for the cosmetic idle motion.
    fn animate(&mut self, _handle: VisualHandle) {}
}

impl<A: PresentationAdapter + ?Sized> PresentationAdapter for Box<A> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn create_visual_object(&mut self, position: Position, color: Rgb) -> Option<VisualHandle> {
        (**self).create_visual_object(position, color)
    }

    fn destroy_visual_object(&mut self, handle: VisualHandle) {
        (**self).destroy_visual_object(handle)
    }

    fn animate(&mut self, handle: VisualHandle) {
        (**self).animate(handle)
    }
}
