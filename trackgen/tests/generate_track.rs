use trackgen::core::designer::TrackDesigner;
use trackgen::core::metrics::difficulty_label;
use trackgen::{generate_track, DesignerConfig, TargetMetric, TrackMetrics};

fn config(target: TargetMetric, seed: u64) -> DesignerConfig {
    DesignerConfig {
        target,
        generations: 20,
        seed: Some(seed),
        ..DesignerConfig::default()
    }
}

#[test]
fn generated_track_for_every_target() {
    for (i, target) in TargetMetric::ALL.iter().enumerate() {
        let track = generate_track(&config(*target, i as u64)).unwrap();

        assert!(track.name.ends_with(" (AI)"));
        assert!(target
            .track_names()
            .iter()
            .any(|name| track.name.starts_with(name)));
        assert_eq!(track.generated_for, *target);
        assert_eq!(track.laps, 3);
        assert_eq!(track.generation_stats.generations, 20);
        assert_eq!(track.generation_stats.population_size, 20);
        assert_eq!(track.difficulty, difficulty_label(track.metrics.difficulty_score));

        let elements: Vec<_> = track.elements.iter().map(|p| p.element.to_owned()).collect();
        assert_eq!(track.metrics, TrackMetrics::calculate(&elements));
        for p in track.elements.iter() {
            assert!((50.0..=750.0).contains(&p.x));
            assert!((50.0..=550.0).contains(&p.y));
        }
    }
}

#[test]
fn evolution_beats_first_generation() {
    let cfg = DesignerConfig {
        target: TargetMetric::Safety,
        generations: 40,
        seed: Some(17),
        ..DesignerConfig::default()
    };
    let evolution = TrackDesigner::new(&cfg).unwrap().evolve();

    assert_eq!(evolution.best_fitness_history.len(), 40);
    assert!(evolution.best_fitness >= evolution.best_fitness_history[0]);
    assert!(evolution.elements.len() >= 6);
}

#[test]
fn generated_track_json_shape() {
    let track = generate_track(&config(TargetMetric::Overtakes, 4)).unwrap();
    let json = serde_json::to_value(&track).unwrap();

    assert_eq!(json["generated_for"], "overtakes");
    assert!(json["metrics"]["possibleOvertakes"].is_u64());
    assert!(json["metrics"]["safetyRating"].is_number());
    let first = &json["elements"][0];
    for key in ["kind", "x", "y", "length", "width", "banking", "elevation", "isDRS", "sector"].iter() {
        assert!(first.get(*key).is_some(), "missing key {}", key);
    }
    assert_eq!(first["sector"], 1);
}
