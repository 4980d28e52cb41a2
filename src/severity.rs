//! PM2.5 severity tiers and their display attributes.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Five ordered air-quality bands, lowest concentration first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 5] = [
        SeverityTier::Good,
        SeverityTier::Moderate,
        SeverityTier::Unhealthy,
        SeverityTier::VeryUnhealthy,
        SeverityTier::Hazardous,
    ];

    /// Resolves a concentration (µg/m³) to the tier whose `[lower, upper)` band holds it.
    ///
    /// Negative and NaN inputs fall into `Good`; anything past the last bound is `Hazardous`.
    pub fn classify(concentration: f64) -> Self {
        if concentration.is_nan() {
            return SeverityTier::Good;
        }
        Self::ALL
            .into_iter()
            .find(|tier| tier.upper_bound().map_or(true, |upper| concentration < upper))
            .unwrap_or(SeverityTier::Hazardous)
    }

    pub fn lower_bound(self) -> f64 {
        match self {
            SeverityTier::Good => 0.0,
            SeverityTier::Moderate => 12.0,
            SeverityTier::Unhealthy => 35.0,
            SeverityTier::VeryUnhealthy => 55.0,
            SeverityTier::Hazardous => 150.0,
        }
    }

    /// Exclusive upper bound; `None` for the open-ended top band.
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            SeverityTier::Hazardous => None,
            tier => Self::ALL
                .get(tier.index() + 1)
                .map(|next| next.lower_bound()),
        }
    }

    pub fn contains(self, concentration: f64) -> bool {
        concentration >= self.lower_bound()
            && self.upper_bound().map_or(true, |upper| concentration < upper)
    }

    pub fn default_spawn_range(self) -> SpawnRange {
        match self {
            SeverityTier::Good => SpawnRange::new(1, 3),
            SeverityTier::Moderate => SpawnRange::new(3, 8),
            SeverityTier::Unhealthy => SpawnRange::new(8, 15),
            SeverityTier::VeryUnhealthy => SpawnRange::new(15, 25),
            SeverityTier::Hazardous => SpawnRange::new(25, 40),
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            SeverityTier::Good => Rgb::new(0x00, 0xe4, 0x00),
            SeverityTier::Moderate => Rgb::new(0xff, 0xff, 0x00),
            SeverityTier::Unhealthy => Rgb::new(0xff, 0x7e, 0x00),
            SeverityTier::VeryUnhealthy => Rgb::new(0xff, 0x00, 0x00),
            SeverityTier::Hazardous => Rgb::new(0x8f, 0x3f, 0x97),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SeverityTier::Good => "Good",
            SeverityTier::Moderate => "Moderate",
            SeverityTier::Unhealthy => "Unhealthy for Sensitive Groups",
            SeverityTier::VeryUnhealthy => "Unhealthy",
            SeverityTier::Hazardous => "Very Unhealthy",
        }
    }

    pub fn health_text(self) -> &'static str {
        match self {
            SeverityTier::Good => "Air quality is good. No health effects expected.",
            SeverityTier::Moderate => {
                "Air quality is acceptable. Some pollutants may be a concern for sensitive individuals."
            }
            SeverityTier::Unhealthy => "Members of sensitive groups may experience health effects.",
            SeverityTier::VeryUnhealthy => "Everyone may begin to experience health effects.",
            SeverityTier::Hazardous => "Health warnings of emergency conditions.",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Inclusive range of particles requested per spawn step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRange {
    pub min: u32,
    pub max: u32,
}

impl SpawnRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

/// Per-tier spawn ranges, overridable from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnRates {
    pub good: SpawnRange,
    pub moderate: SpawnRange,
    pub unhealthy: SpawnRange,
    pub very_unhealthy: SpawnRange,
    pub hazardous: SpawnRange,
}

impl SpawnRates {
    pub fn get(&self, tier: SeverityTier) -> SpawnRange {
        match tier {
            SeverityTier::Good => self.good,
            SeverityTier::Moderate => self.moderate,
            SeverityTier::Unhealthy => self.unhealthy,
            SeverityTier::VeryUnhealthy => self.very_unhealthy,
            SeverityTier::Hazardous => self.hazardous,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SeverityTier, SpawnRange)> + '_ {
        SeverityTier::ALL.into_iter().map(|tier| (tier, self.get(tier)))
    }
}

impl Default for SpawnRates {
    fn default() -> Self {
        Self {
            good: SeverityTier::Good.default_spawn_range(),
            moderate: SeverityTier::Moderate.default_spawn_range(),
            unhealthy: SeverityTier::Unhealthy.default_spawn_range(),
            very_unhealthy: SeverityTier::VeryUnhealthy.default_spawn_range(),
            hazardous: SeverityTier::Hazardous.default_spawn_range(),
        }
    }
}

/// Classifier bound to a spawn-rate table.
#[derive(Debug, Clone, Default)]
pub struct SeverityScale {
    rates: SpawnRates,
}

impl SeverityScale {
    pub fn new(rates: SpawnRates) -> Self {
        Self { rates }
    }

    pub fn classify(&self, concentration: f64) -> SeverityTier {
        SeverityTier::classify(concentration)
    }

    pub fn spawn_range(&self, tier: SeverityTier) -> SpawnRange {
        self.rates.get(tier)
    }

    pub fn rates(&self) -> &SpawnRates {
        &self.rates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_contiguous() {
        for pair in SeverityTier::ALL.windows(2) {
            assert_eq!(pair[0].upper_bound(), Some(pair[1].lower_bound()));
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(SeverityTier::Good.lower_bound(), 0.0);
        assert_eq!(SeverityTier::Hazardous.upper_bound(), None);
    }

    #[test]
    fn band_edges_belong_to_the_upper_tier() {
        assert_eq!(SeverityTier::classify(11.999), SeverityTier::Good);
        assert_eq!(SeverityTier::classify(12.0), SeverityTier::Moderate);
        assert_eq!(SeverityTier::classify(35.0), SeverityTier::Unhealthy);
        assert_eq!(SeverityTier::classify(55.0), SeverityTier::VeryUnhealthy);
        assert_eq!(SeverityTier::classify(150.0), SeverityTier::Hazardous);
    }

    #[test]
    fn out_of_domain_inputs_resolve() {
        assert_eq!(SeverityTier::classify(-4.0), SeverityTier::Good);
        assert_eq!(SeverityTier::classify(f64::NAN), SeverityTier::Good);
        assert_eq!(SeverityTier::classify(f64::INFINITY), SeverityTier::Hazardous);
        assert_eq!(SeverityTier::classify(1e9), SeverityTier::Hazardous);
    }

    #[test]
    fn colors_render_as_hex() {
        assert_eq!(SeverityTier::Good.color().to_string(), "#00e400");
        assert_eq!(SeverityTier::Hazardous.color().to_string(), "#8f3f97");
        assert_eq!(Rgb::from_hex("#ff7e00"), Some(SeverityTier::Unhealthy.color()));
        assert_eq!(Rgb::from_hex("ff7e0"), None);
        assert_eq!(Rgb::from_hex("#gg0000"), None);
    }

    #[test]
    fn default_rates_are_ordered_ranges() {
        let rates = SpawnRates::default();
        for (_, range) in rates.iter() {
            assert!(range.is_valid());
        }
        let scale = SeverityScale::default();
        assert_eq!(scale.spawn_range(SeverityTier::Moderate), SpawnRange::new(3, 8));
    }
}
