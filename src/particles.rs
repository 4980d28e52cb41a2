//! Particle population: spawn decisions, aging and eviction.

use std::f32::consts::TAU;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    clock::Timestamp,
    config::{Concentration, VisualizationConfig},
    panel::AirQualityReport,
    presentation::{Position, PresentationAdapter, VisualHandle},
    rng::RngManager,
    scheduler::{Scheduler, TaskId},
    severity::{Rgb, SeverityScale, SeverityTier},
};

const SPAWN_TASK: &str = "spawn";
const EVICT_TASK: &str = "evict";
const VERTICAL_SPREAD: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    created_at: Timestamp,
    position: Position,
    color: Rgb,
    handle: Option<VisualHandle>,
}

impl Particle {
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Tier color at creation; later tier changes leave it alone.
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// `None` when the scene dropped the visual object.
    pub fn handle(&self) -> Option<VisualHandle> {
        self.handle
    }

    pub fn age(&self, now: Timestamp) -> Duration {
        now.since(self.created_at)
    }
}

#[derive(Debug, Clone)]
pub struct PopulationSettings {
    pub max_particles: usize,
    pub lifetime: Duration,
    pub spawn_radius: f32,
    pub origin: Position,
    pub spawn_interval: Duration,
    pub eviction_interval: Duration,
}

impl From<&VisualizationConfig> for PopulationSettings {
    fn from(config: &VisualizationConfig) -> Self {
        Self {
            max_particles: config.max_particles,
            lifetime: config.lifetime(),
            spawn_radius: config.spawn_radius,
            origin: config.origin,
            spawn_interval: config.spawn_interval(),
            eviction_interval: config.eviction_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpawnOutcome {
    pub tier: SeverityTier,
    pub requested: u32,
    pub created: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub timestamp: Timestamp,
    pub spawn: Option<SpawnOutcome>,
    pub evicted: Option<usize>,
    pub population: usize,
}

struct Triggers {
    spawn: TaskId,
    evict: TaskId,
}

pub struct PopulationManager<A> {
    settings: PopulationSettings,
    scale: SeverityScale,
    concentration: Concentration,
    adapter: A,
    rng: RngManager,
    particles: Vec<Particle>,
    scheduler: Scheduler,
    triggers: Option<Triggers>,
}

impl<A: PresentationAdapter> PopulationManager<A> {
    pub fn new(config: &VisualizationConfig, concentration: Concentration, adapter: A) -> Self {
        Self::with_parts(
            PopulationSettings::from(config),
            SeverityScale::new(config.spawn_rates.clone()),
            concentration,
            adapter,
            config.seed,
        )
    }

    pub fn with_parts(
        settings: PopulationSettings,
        scale: SeverityScale,
        concentration: Concentration,
        adapter: A,
        seed: u64,
    ) -> Self {
        Self {
            settings,
            scale,
            concentration,
            adapter,
            rng: RngManager::new(seed),
            particles: Vec::new(),
            scheduler: Scheduler::new(),
            triggers: None,
        }
    }

    pub fn state(&self) -> ManagerState {
        if self.triggers.is_some() {
            ManagerState::Active
        } else {
            ManagerState::Inactive
        }
    }

    /// Registers the spawn and eviction triggers. Returns `false` when
    /// already active.
    pub fn start(&mut self, now: Timestamp) -> bool {
        if self.triggers.is_some() {
            return false;
        }
        let spawn = self
            .scheduler
            .register(SPAWN_TASK, self.settings.spawn_interval, now);
        let evict = self
            .scheduler
            .register(EVICT_TASK, self.settings.eviction_interval, now);
        self.triggers = Some(Triggers { spawn, evict });
        info!(
            target: "population",
            "started at {now}: spawn every {:?}, evict every {:?}",
            self.settings.spawn_interval,
            self.settings.eviction_interval
        );
        true
    }

    /// Deregisters both triggers and releases every live particle.
    /// Returns how many particles were released.
    pub fn stop(&mut self) -> usize {
        if let Some(triggers) = self.triggers.take() {
            self.scheduler.cancel(triggers.spawn);
            self.scheduler.cancel(triggers.evict);
        }
        let released = self.particles.len();
        for particle in self.particles.drain(..) {
            if let Some(handle) = particle.handle {
                self.adapter.destroy_visual_object(handle);
            }
        }
        info!(target: "population", "stopped, released {released} particles");
        released
    }

    /// Runs whichever steps are due at `now`.
    pub fn poll(&mut self, now: Timestamp) -> TickSummary {
        let mut summary = TickSummary {
            timestamp: now,
            spawn: None,
            evicted: None,
            population: self.particles.len(),
        };
        let Some((spawn, evict)) = self.triggers.as_ref().map(|t| (t.spawn, t.evict)) else {
            return summary;
        };
        for task in self.scheduler.due(now) {
            if task == spawn {
                summary.spawn = Some(self.spawn_step(now));
            } else if task == evict {
                summary.evicted = Some(self.evict_step(now));
            }
        }
        summary.population = self.particles.len();
        summary
    }

    /// Creates a tier-dependent batch of particles, never exceeding the cap.
    /// Does nothing while the manager is inactive or the scene is not ready.
    pub fn spawn_step(&mut self, now: Timestamp) -> SpawnOutcome {
        let tier = self.current_tier();
        if self.triggers.is_none() {
            debug!(target: "population", "inactive, skipping spawn");
            return SpawnOutcome {
                tier,
                requested: 0,
                created: 0,
            };
        }
        if !self.adapter.is_ready() {
            debug!(target: "population", "scene not ready, skipping spawn");
            return SpawnOutcome {
                tier,
                requested: 0,
                created: 0,
            };
        }
        let range = self.scale.spawn_range(tier);
        let requested = self.rng.stream(SPAWN_TASK).between(range.min, range.max);
        let color = tier.color();
        let mut created = 0;
        for _ in 0..requested {
            if self.particles.len() >= self.settings.max_particles {
                break;
            }
            let position = self.random_position();
            let handle = self.adapter.create_visual_object(position, color);
            if let Some(handle) = handle {
                self.adapter.animate(handle);
            }
            self.particles.push(Particle {
                created_at: now,
                position,
                color,
                handle,
            });
            created += 1;
        }
        debug!(
            target: "population",
            "spawn at {now}: {tier:?} requested {requested}, created {created}, population {}",
            self.particles.len()
        );
        SpawnOutcome {
            tier,
            requested,
            created,
        }
    }

    /// Removes every particle older than the lifetime. Returns how many went.
    pub fn evict_step(&mut self, now: Timestamp) -> usize {
        if self.triggers.is_none() {
            debug!(target: "population", "inactive, skipping eviction");
            return 0;
        }
        if !self.adapter.is_ready() {
            debug!(target: "population", "scene not ready, skipping eviction");
            return 0;
        }
        let lifetime = self.settings.lifetime;
        let (expired, kept): (Vec<Particle>, Vec<Particle>) = self
            .particles
            .drain(..)
            .partition(|particle| particle.age(now) > lifetime);
        self.particles = kept;
        for handle in expired.iter().filter_map(Particle::handle) {
            self.adapter.destroy_visual_object(handle);
        }
        debug!(
            target: "population",
            "evict at {now}: removed {}, population {}",
            expired.len(),
            self.particles.len()
        );
        expired.len()
    }

    fn random_position(&mut self) -> Position {
        let mut stream = self.rng.stream("placement");
        let angle = stream.uniform(0.0, TAU);
        let radius = stream.uniform(0.0, self.settings.spawn_radius);
        let height = stream.uniform(-0.5, 0.5) * VERTICAL_SPREAD;
        self.settings
            .origin
            .offset(angle.cos() * radius, height, angle.sin() * radius)
    }

    pub fn current_tier(&self) -> SeverityTier {
        self.scale.classify(self.concentration.get())
    }

    /// Info-panel content for the current reading.
    pub fn report(&self) -> AirQualityReport {
        AirQualityReport::for_concentration(self.concentration.get())
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn contains_handle(&self, handle: VisualHandle) -> bool {
        self.particles
            .iter()
            .any(|particle| particle.handle == Some(handle))
    }

    pub fn settings(&self) -> &PopulationSettings {
        &self.settings
    }

    pub fn concentration(&self) -> &Concentration {
        &self.concentration
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }
}
