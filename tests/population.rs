use pm25viz::{
    clock::Timestamp,
    config::{Concentration, ParticleStyle, VisualizationConfig},
    particles::{ManagerState, PopulationManager},
    presentation::PresentationAdapter,
    scene::Scene,
    severity::SeverityTier,
};
use proptest::prelude::*;

fn ms(value: u64) -> Timestamp {
    Timestamp::from_millis(value)
}

fn manager(value: f64, max_particles: usize) -> PopulationManager<Scene> {
    let config = VisualizationConfig {
        max_particles,
        ..VisualizationConfig::default()
    };
    let mut manager = PopulationManager::new(
        &config,
        Concentration::new(value),
        Scene::new(ParticleStyle::default(), 9),
    );
    manager.start(ms(0));
    manager
}

#[test]
fn full_population_issues_no_creations() {
    let mut manager = manager(180.0, 5);
    manager.spawn_step(ms(0));
    assert_eq!(manager.len(), 5);
    let (created_before, _) = manager.adapter().counters();

    let outcome = manager.spawn_step(ms(100));
    assert!(outcome.requested >= 3);
    assert_eq!(outcome.created, 0);
    assert_eq!(manager.len(), 5);
    assert_eq!(manager.adapter().counters().0, created_before);
}

#[test]
fn particle_outlives_lifetime_by_one_millisecond() {
    let mut manager = manager(10.0, 100);
    manager.spawn_step(ms(0));
    let spawned = manager.len();

    assert_eq!(manager.evict_step(ms(7_999)), 0);
    assert_eq!(manager.len(), spawned);
    assert_eq!(manager.evict_step(ms(8_001)), spawned);
    assert!(manager.is_empty());
    assert!(manager.adapter().is_empty());
}

#[test]
fn scene_mirrors_population() {
    let mut manager = manager(75.0, 100);
    for step in 0..20 {
        manager.spawn_step(ms(step * 100));
        if step % 10 == 9 {
            manager.evict_step(ms(step * 100));
        }
    }
    assert_eq!(manager.adapter().len(), manager.len());
    for particle in manager.particles() {
        let object = manager.adapter().object(particle.handle().unwrap()).unwrap();
        assert_eq!(object.position, particle.position());
        assert_eq!(object.color, SeverityTier::VeryUnhealthy.color());
        assert!(object.animation.is_some());
    }
}

#[test]
fn stop_releases_every_handle() {
    let mut manager = manager(45.0, 100);
    for step in 1..=30 {
        manager.poll(ms(step * 100));
    }
    let live = manager.len();
    assert!(live > 0);
    assert_eq!(manager.stop(), live);
    assert!(manager.adapter().is_empty());
    assert_eq!(manager.adapter().counters(), (live as u64, live as u64));
}

#[test]
fn pending_scene_defers_all_work() {
    let config = VisualizationConfig::default();
    let mut manager = PopulationManager::new(
        &config,
        Concentration::new(180.0),
        Scene::pending(ParticleStyle::default(), 1),
    );
    manager.start(ms(0));
    manager.poll(ms(100));
    assert!(manager.is_empty());

    manager.adapter_mut().mark_ready();
    assert!(manager.adapter().is_ready());
    manager.poll(ms(200));
    assert!(!manager.is_empty());
}

#[test]
fn stopped_manager_stays_empty() {
    let mut manager = manager(180.0, 100);
    manager.spawn_step(ms(0));
    assert!(!manager.is_empty());
    manager.stop();

    let outcome = manager.spawn_step(ms(100));
    assert_eq!(outcome.created, 0);
    assert_eq!(manager.state(), ManagerState::Inactive);
    assert!(manager.is_empty());
    assert!(manager.adapter().is_empty());
}

proptest! {
    #[test]
    fn population_never_exceeds_cap(
        max_particles in 0usize..60,
        readings in proptest::collection::vec(0.0f64..400.0, 1..40),
    ) {
        let mut manager = manager(readings[0], max_particles);
        for (step, reading) in readings.iter().enumerate() {
            manager.concentration().set(*reading);
            manager.spawn_step(ms(step as u64 * 100));
            prop_assert!(manager.len() <= max_particles);
        }
    }

    #[test]
    fn eviction_splits_on_age(
        spawn_times in proptest::collection::vec(0u64..20_000, 1..20),
        now in 0u64..30_000,
    ) {
        let mut manager = manager(10.0, 10_000);
        let mut sorted = spawn_times.clone();
        sorted.sort_unstable();
        for at in sorted {
            manager.spawn_step(ms(at));
        }
        let before: Vec<_> = manager.particles().to_vec();
        let evicted = manager.evict_step(ms(now));

        let lifetime = manager.settings().lifetime;
        let expected = before.iter().filter(|p| p.age(ms(now)) > lifetime).count();
        prop_assert_eq!(evicted, expected);
        prop_assert!(manager.particles().iter().all(|p| p.age(ms(now)) <= lifetime));
        prop_assert_eq!(manager.evict_step(ms(now)), 0);
    }
}
