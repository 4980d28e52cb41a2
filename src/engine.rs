use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    clock::{Clock, ManualClock, Timestamp},
    config::{Concentration, VisualizationConfig},
    panel::{handle_key, AirQualityReport, InfoPanel},
    particles::{ManagerState, PopulationManager, TickSummary},
    presentation::{Position, PresentationAdapter, VisualHandle},
    scene::Scene,
    severity::{Rgb, SeverityTier},
};

pub struct EngineBuilder {
    config: VisualizationConfig,
    concentration: Option<Concentration>,
    scene_ready: bool,
}

impl EngineBuilder {
    pub fn new(config: VisualizationConfig) -> Self {
        Self {
            config,
            concentration: None,
            scene_ready: true,
        }
    }

    /// Shares an existing reading instead of creating one from the config.
    pub fn with_concentration(mut self, concentration: Concentration) -> Self {
        self.concentration = Some(concentration);
        self
    }

    /// Builds with a scene that stays unavailable until marked ready.
    pub fn with_pending_scene(mut self) -> Self {
        self.scene_ready = false;
        self
    }

    pub fn build<C: Clock>(self, clock: C) -> Engine<Scene, C> {
        let concentration = self
            .concentration
            .unwrap_or_else(|| Concentration::new(self.config.current_value));
        let scene_seed = self.config.seed.wrapping_add(1);
        let scene = if self.scene_ready {
            Scene::new(self.config.particle.clone(), scene_seed)
        } else {
            Scene::pending(self.config.particle.clone(), scene_seed)
        };
        let manager = PopulationManager::new(&self.config, concentration, scene);
        Engine::new(self.config.name, manager, clock)
    }
}

/// Drives a population manager from a clock and tracks the info panel.
pub struct Engine<A, C> {
    name: String,
    manager: PopulationManager<A>,
    clock: C,
    panel: InfoPanel,
}

impl<A: PresentationAdapter, C: Clock> Engine<A, C> {
    pub fn new(name: impl Into<String>, manager: PopulationManager<A>, clock: C) -> Self {
        Self {
            name: name.into(),
            manager,
            clock,
            panel: InfoPanel::new(),
        }
    }

    pub fn start(&mut self) -> bool {
        let now = self.clock.now();
        self.manager.start(now)
    }

    pub fn stop(&mut self) -> usize {
        self.panel.close();
        self.manager.stop()
    }

    /// Runs whatever is due at the clock's current time.
    pub fn advance(&mut self) -> TickSummary {
        let now = self.clock.now();
        self.manager.poll(now)
    }

    /// Opens the info panel for a live particle. Unknown handles leave the
    /// panel untouched.
    pub fn select(&mut self, handle: VisualHandle) -> Option<&AirQualityReport> {
        if !self.manager.contains_handle(handle) {
            return None;
        }
        Some(self.panel.open(self.manager.report()))
    }

    pub fn close_panel(&mut self) {
        self.panel.close();
    }

    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    pub fn press_key(&mut self, key: &str) -> Option<f64> {
        handle_key(key, self.manager.concentration())
    }

    pub fn frame(&self) -> Frame {
        let now = self.clock.now();
        let concentration = self.manager.concentration().get();
        let tier = SeverityTier::classify(concentration);
        Frame {
            name: self.name.clone(),
            timestamp: now,
            state: self.manager.state(),
            concentration,
            tier,
            label: tier.label(),
            color: tier.color(),
            population: self.manager.len(),
            max_particles: self.manager.settings().max_particles,
            particles: self
                .manager
                .particles()
                .iter()
                .map(|particle| ParticleView {
                    handle: particle.handle(),
                    position: particle.position(),
                    color: particle.color(),
                    age_ms: particle.age(now).as_millis() as u64,
                })
                .collect(),
            panel: self.panel.report().cloned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn manager(&self) -> &PopulationManager<A> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut PopulationManager<A> {
        &mut self.manager
    }
}

impl<A: PresentationAdapter> Engine<A, ManualClock> {
    /// Simulates `duration` of wall time in increments of `step`.
    pub fn run(&mut self, duration: Duration, step: Duration) -> Result<RunSummary> {
        self.run_with_hook(duration, step, &KeySchedule::default(), |_| {})
    }

    /// Like [`Engine::run`], applying scheduled key presses and handing
    /// every frame to `hook`.
    pub fn run_with_hook<F>(
        &mut self,
        duration: Duration,
        step: Duration,
        keys: &KeySchedule,
        mut hook: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(Frame),
    {
        if step.is_zero() {
            bail!("simulation step must be greater than zero");
        }
        self.start();
        let began = self.clock.now();
        let end = began + duration;
        let mut presses = keys.presses.iter().peekable();
        let mut summary = RunSummary::default();

        while self.clock.now() < end {
            let now = self.clock.advance(step).min(end);
            self.clock.set(now);
            while let Some(press) = presses.next_if(|press| began + press.at <= now) {
                if let Some(value) = self.press_key(&press.key) {
                    debug!(target: "engine", "key {} at {now} -> {value}", press.key);
                }
            }
            let tick = self.advance();
            summary.record(&tick);
            hook(self.frame());
        }

        info!(
            target: "engine",
            "'{}' ran {} ticks: spawned {}, evicted {}, peak {}",
            self.name,
            summary.ticks,
            summary.spawned,
            summary.evicted,
            summary.peak_population
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub handle: Option<VisualHandle>,
    pub position: Position,
    pub color: Rgb,
    pub age_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub name: String,
    pub timestamp: Timestamp,
    pub state: ManagerState,
    pub concentration: f64,
    pub tier: SeverityTier,
    pub label: &'static str,
    pub color: Rgb,
    pub population: usize,
    pub max_particles: usize,
    pub particles: Vec<ParticleView>,
    pub panel: Option<AirQualityReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub spawn_steps: u64,
    pub eviction_steps: u64,
    pub spawned: u64,
    pub evicted: u64,
    pub peak_population: usize,
    pub final_population: usize,
}

impl RunSummary {
    fn record(&mut self, tick: &TickSummary) {
        self.ticks += 1;
        if let Some(spawn) = tick.spawn {
            self.spawn_steps += 1;
            self.spawned += spawn.created as u64;
        }
        if let Some(evicted) = tick.evicted {
            self.eviction_steps += 1;
            self.evicted += evicted as u64;
        }
        self.peak_population = self.peak_population.max(tick.population);
        self.final_population = tick.population;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub at: Duration,
    pub key: String,
}

/// Key presses at offsets from the start of a run, e.g. `3@2000,5@4000`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySchedule {
    presses: Vec<KeyPress>,
}

impl KeySchedule {
    pub fn parse(text: &str) -> Result<Self> {
        let mut presses = Vec::new();
        for entry in text.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (key, at) = entry
                .split_once('@')
                .with_context(|| format!("key press '{entry}' must look like KEY@MILLIS"))?;
            let millis: u64 = at
                .trim()
                .parse()
                .with_context(|| format!("invalid offset in key press '{entry}'"))?;
            presses.push(KeyPress {
                at: Duration::from_millis(millis),
                key: key.trim().to_string(),
            });
        }
        presses.sort_by_key(|press| press.at);
        Ok(Self { presses })
    }

    pub fn presses(&self) -> &[KeyPress] {
        &self.presses
    }
}
