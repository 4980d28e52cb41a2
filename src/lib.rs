pub mod clock;
pub mod config;
pub mod engine;
pub mod panel;
pub mod particles;
pub mod presentation;
pub mod rng;
pub mod scene;
pub mod scheduler;
pub mod severity;
pub mod web;

pub use config::{Concentration, ConfigLoader, VisualizationConfig};
pub use engine::{Engine, EngineBuilder, Frame, RunSummary};
pub use particles::{PopulationManager, TickSummary};
pub use severity::SeverityTier;
