//! Info panel and keyboard presets layered over the particle core.

use serde::Serialize;
use tracing::info;

use crate::{
    config::Concentration,
    severity::{Rgb, SeverityTier},
};

/// What the info panel shows when a particle is picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReport {
    pub concentration: f64,
    pub tier: SeverityTier,
    pub label: &'static str,
    pub color: Rgb,
    pub health: &'static str,
}

impl AirQualityReport {
    pub fn for_concentration(concentration: f64) -> Self {
        let tier = SeverityTier::classify(concentration);
        Self {
            concentration,
            tier,
            label: tier.label(),
            color: tier.color(),
            health: tier.health_text(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InfoPanel {
    report: Option<AirQualityReport>,
}

impl InfoPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, report: AirQualityReport) -> &AirQualityReport {
        self.report.insert(report)
    }

    pub fn close(&mut self) {
        self.report = None;
    }

    pub fn is_visible(&self) -> bool {
        self.report.is_some()
    }

    pub fn report(&self) -> Option<&AirQualityReport> {
        self.report.as_ref()
    }
}

/// Number-row shortcuts that jump to a representative reading per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKey {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl TestKey {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "1" => Some(TestKey::Good),
            "2" => Some(TestKey::Moderate),
            "3" => Some(TestKey::Unhealthy),
            "4" => Some(TestKey::VeryUnhealthy),
            "5" => Some(TestKey::Hazardous),
            _ => None,
        }
    }

    pub fn concentration(self) -> f64 {
        match self {
            TestKey::Good => 10.0,
            TestKey::Moderate => 25.0,
            TestKey::Unhealthy => 45.0,
            TestKey::VeryUnhealthy => 75.0,
            TestKey::Hazardous => 180.0,
        }
    }

    pub fn apply(self, target: &Concentration) -> f64 {
        let value = self.concentration();
        target.set(value);
        info!(target: "controls", "concentration set to {value} ({:?})", self);
        value
    }
}

/// Applies `key` if it is one of the presets; other keys are ignored.
pub fn handle_key(key: &str, target: &Concentration) -> Option<f64> {
    TestKey::from_key(key).map(|preset| preset.apply(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_land_in_their_tier() {
        for (key, tier) in ["1", "2", "3", "4", "5"].into_iter().zip(SeverityTier::ALL) {
            let preset = TestKey::from_key(key).unwrap();
            assert_eq!(SeverityTier::classify(preset.concentration()), tier);
        }
    }

    #[test]
    fn unknown_keys_leave_value_alone() {
        let reading = Concentration::new(35.0);
        assert_eq!(handle_key("9", &reading), None);
        assert_eq!(handle_key("x", &reading), None);
        assert_eq!(reading.get(), 35.0);
        assert_eq!(handle_key("5", &reading), Some(180.0));
        assert_eq!(reading.get(), 180.0);
    }

    #[test]
    fn panel_shows_current_reading() {
        let mut panel = InfoPanel::new();
        assert!(!panel.is_visible());
        let report = panel.open(AirQualityReport::for_concentration(45.0)).clone();
        assert_eq!(report.label, "Unhealthy for Sensitive Groups");
        assert_eq!(report.color.to_string(), "#ff7e00");
        assert_eq!(
            report.health,
            "Members of sensitive groups may experience health effects."
        );
        panel.close();
        assert!(panel.report().is_none());
    }
}
