//! Headless scene graph that backs the presentation adapter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    config::ParticleStyle,
    presentation::{Position, PresentationAdapter, VisualHandle},
    rng::RngManager,
    severity::Rgb,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatAnimation {
    pub from: Position,
    pub to: Position,
    pub period_ms: u64,
    pub easing: &'static str,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualObject {
    pub handle: VisualHandle,
    pub position: Position,
    pub color: Rgb,
    pub radius: f32,
    pub opacity: f32,
    pub animation: Option<FloatAnimation>,
}

/// Sphere-per-particle scene kept in memory and exposed to the web surface.
pub struct Scene {
    ready: bool,
    next_handle: u64,
    objects: BTreeMap<VisualHandle, VisualObject>,
    style: ParticleStyle,
    rng: RngManager,
    created: u64,
    destroyed: u64,
}

impl Scene {
    pub fn new(style: ParticleStyle, seed: u64) -> Self {
        Self {
            ready: true,
            next_handle: 1,
            objects: BTreeMap::new(),
            style,
            rng: RngManager::new(seed),
            created: 0,
            destroyed: 0,
        }
    }

    /// A scene that rejects work until [`Scene::mark_ready`] is called.
    pub fn pending(style: ParticleStyle, seed: u64) -> Self {
        Self {
            ready: false,
            ..Self::new(style, seed)
        }
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn object(&self, handle: VisualHandle) -> Option<&VisualObject> {
        self.objects.get(&handle)
    }

    pub fn objects(&self) -> impl Iterator<Item = &VisualObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total objects ever created and destroyed.
    pub fn counters(&self) -> (u64, u64) {
        (self.created, self.destroyed)
    }

    fn allocate(&mut self) -> VisualHandle {
        let handle = VisualHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl PresentationAdapter for Scene {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn create_visual_object(&mut self, position: Position, color: Rgb) -> Option<VisualHandle> {
        if !self.ready {
            return None;
        }
        let handle = self.allocate();
        self.objects.insert(
            handle,
            VisualObject {
                handle,
                position,
                color,
                radius: self.style.radius,
                opacity: self.style.opacity,
                animation: None,
            },
        );
        self.created += 1;
        Some(handle)
    }

    fn destroy_visual_object(&mut self, handle: VisualHandle) {
        if self.objects.remove(&handle).is_some() {
            self.destroyed += 1;
        }
    }

    fn animate(&mut self, handle: VisualHandle) {
        let period_ms = u64::from(
            self.rng
                .stream("float")
                .between(self.style.float_period_min_ms, self.style.float_period_max_ms),
        );
        let distance = self.style.float_distance;
        if let Some(object) = self.objects.get_mut(&handle) {
            object.animation = Some(FloatAnimation {
                from: object.position,
                to: object.position.offset(0.0, distance, 0.0),
                period_ms,
                easing: "ease_in_out_sine",
                looping: true,
            });
        }
    }
}
