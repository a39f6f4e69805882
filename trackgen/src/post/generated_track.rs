use crate::core::designer::{DesignerConfig, DesignerError, TargetMetric, TrackDesigner};
use crate::core::metrics::{difficulty_label, safety_label, TrackMetrics};
use crate::post::layout::{position_elements, PositionedElement};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

const DEFAULT_LAPS: u32 = 3;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationStats {
    pub generations: usize,
    pub population_size: usize,
    pub best_fitness: f64,
    pub best_fitness_history: Vec<f64>,
}

/// GeneratedTrack is the output record of the track designer.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratedTrack {
    pub name: String,
    pub elements: Vec<PositionedElement>,
    pub metrics: TrackMetrics,
    pub difficulty: String,
    pub laps: u32,
    pub generated_for: TargetMetric,
    pub generation_stats: GenerationStats,
}

impl GeneratedTrack {
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let fh = File::create(path)
            .context(format!("Failed to create track file {}!", path.display()))?;
        serde_json::to_writer_pretty(fh, self)
            .context(format!("Failed to write track file {}!", path.display()))?;
        Ok(())
    }

    /// print_summary prints the metrics of the track to the console output.
    pub fn print_summary(&self) {
        let m = &self.metrics;
        println!("RESULT: {} (optimized for {})", self.name, self.generated_for);
        println!(
            "RESULT: {} elements, {} corners, {} straights, {} DRS zones",
            self.elements.len(),
            m.corner_count,
            m.straight_count,
            m.drs_zone_count
        );
        println!(
            "RESULT: Length {:.0}m, estimated lap time {:.2}s, elevation change {:.0}m",
            m.total_length, m.estimated_lap_time, m.elevation_change
        );
        println!(
            "RESULT: Difficulty {:.1} ({}), safety {:.0} ({}), overtaking spots {}",
            m.difficulty_score,
            self.difficulty,
            m.safety_rating,
            safety_label(m.safety_rating),
            m.possible_overtakes
        );
        println!(
            "RESULT: Best fitness {:.2} after {} generations",
            self.generation_stats.best_fitness, self.generation_stats.generations
        );
    }
}

/// generate_track evolves a track for the configured target and lays it out for rendering.
pub fn generate_track(config: &DesignerConfig) -> Result<GeneratedTrack, DesignerError> {
    let mut designer = TrackDesigner::new(config)?;
    let evolution = designer.evolve();
    let name = designer.choose_name();

    Ok(GeneratedTrack {
        name,
        elements: position_elements(&evolution.elements),
        difficulty: difficulty_label(evolution.metrics.difficulty_score).to_owned(),
        metrics: evolution.metrics,
        laps: DEFAULT_LAPS,
        generated_for: config.target,
        generation_stats: GenerationStats {
            generations: config.generations,
            population_size: config.population_size,
            best_fitness: evolution.best_fitness,
            best_fitness_history: evolution.best_fitness_history,
        },
    })
}
