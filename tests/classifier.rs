use pm25viz::severity::{SeverityScale, SeverityTier, SpawnRange};
use proptest::prelude::*;

#[test]
fn good_reading_scenario() {
    let scale = SeverityScale::default();
    let tier = scale.classify(10.0);
    assert_eq!(tier, SeverityTier::Good);
    assert_eq!(scale.spawn_range(tier), SpawnRange::new(1, 3));
    assert_eq!(tier.color().to_string(), "#00e400");
}

#[test]
fn unhealthy_reading_scenario() {
    let scale = SeverityScale::default();
    let tier = scale.classify(45.0);
    assert_eq!(tier, SeverityTier::Unhealthy);
    assert_eq!(scale.spawn_range(tier), SpawnRange::new(8, 15));
    assert_eq!(tier.color().to_string(), "#ff7e00");
}

#[test]
fn extreme_reading_is_hazardous() {
    assert_eq!(SeverityTier::classify(1e9), SeverityTier::Hazardous);
}

#[test]
fn every_tier_has_an_ordered_non_negative_range() {
    let scale = SeverityScale::default();
    for tier in SeverityTier::ALL {
        let range = scale.spawn_range(tier);
        assert!(range.min <= range.max, "{tier:?} range reversed");
    }
}

#[test]
fn labels_and_health_text_are_distinct() {
    let mut labels: Vec<_> = SeverityTier::ALL.iter().map(|t| t.label()).collect();
    labels.dedup();
    assert_eq!(labels.len(), 5);
    assert!(SeverityTier::ALL
        .iter()
        .all(|tier| !tier.health_text().is_empty()));
}

proptest! {
    #[test]
    fn exactly_one_band_contains_each_reading(value in 0.0f64..10_000.0) {
        let owners: Vec<_> = SeverityTier::ALL
            .into_iter()
            .filter(|tier| tier.contains(value))
            .collect();
        prop_assert_eq!(owners.len(), 1);
        prop_assert_eq!(owners[0], SeverityTier::classify(value));
    }

    #[test]
    fn classification_is_monotonic(a in 0.0f64..1_000.0, b in 0.0f64..1_000.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(SeverityTier::classify(low) <= SeverityTier::classify(high));
    }

    #[test]
    fn negative_readings_fall_back_to_good(value in -1e6f64..0.0) {
        prop_assert_eq!(SeverityTier::classify(value), SeverityTier::Good);
    }
}
