use crate::core::element::{ElementKind, TrackElement};
use crate::core::metrics::TrackMetrics;
use helpers::general::{argsort, SortOrder};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const STRAIGHT_LENGTH: (u32, u32) = (200, 800);
const CORNER_LENGTH: (u32, u32) = (100, 400);
const MAX_BANKING: u32 = 25;
const MAX_ELEVATION: i32 = 30;
const MIN_CHILD_ELEMENTS: usize = 6;
const DRS_MUTATION_PROB: f64 = 0.3;
const DRS_MIN_STRAIGHT_LENGTH: f64 = 350.0;
const DEFAULT_TARGET_DIFFICULTY: f64 = 80.0;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetMetric {
    Overtakes,
    Speed,
    Difficulty,
    Safety,
    Balanced,
}

impl TargetMetric {
    pub const ALL: [TargetMetric; 5] = [
        TargetMetric::Overtakes,
        TargetMetric::Speed,
        TargetMetric::Difficulty,
        TargetMetric::Safety,
        TargetMetric::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetMetric::Overtakes => "overtakes",
            TargetMetric::Speed => "speed",
            TargetMetric::Difficulty => "difficulty",
            TargetMetric::Safety => "safety",
            TargetMetric::Balanced => "balanced",
        }
    }

    /// Base names of generated tracks.
    pub fn track_names(self) -> &'static [&'static str] {
        match self {
            TargetMetric::Overtakes => &[
                "Overtaking Paradise",
                "Battle Circuit",
                "Racing Arena",
                "Duel Track",
            ],
            TargetMetric::Speed => &[
                "Speed Demon",
                "Velocity Circuit",
                "Straight Blast",
                "Fast Lane",
            ],
            TargetMetric::Difficulty => &[
                "Challenge Circuit",
                "Technical Nightmare",
                "Expert Track",
                "Pro Circuit",
            ],
            TargetMetric::Safety => &[
                "Safe Haven",
                "Security Circuit",
                "Protected Track",
                "Guardian Loop",
            ],
            TargetMetric::Balanced => &[
                "Perfect Balance",
                "Harmony Circuit",
                "Equilibrium Track",
                "Balanced Beauty",
            ],
        }
    }
}

impl Default for TargetMetric {
    fn default() -> Self {
        TargetMetric::Balanced
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown target metric '{0}' (expected overtakes, speed, difficulty, safety or balanced)")]
pub struct ParseTargetError(pub String);

impl FromStr for TargetMetric {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetMetric::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ParseTargetError(s.to_owned()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DesignerError {
    #[error("population size must be at least 2 (got {0})")]
    PopulationTooSmall(usize),
    #[error("mutation rate must be between 0 and 1 (got {0:.3})")]
    InvalidMutationRate(f64),
    #[error("invalid element count range {min}..={max}")]
    InvalidElementRange { min: usize, max: usize },
}

/// * `target` - Metric the evolution optimizes for
/// * `target_value` - Optional target value, only used by the difficulty target (default 80)
/// * `population_size` - Number of tracks per generation
/// * `generations` - Number of generations
/// * `mutation_rate` - Per-element mutation probability
/// * `min_elements`, `max_elements` - Element count range of random tracks
/// * `seed` - Seed of the random number generator, drawn from OS entropy if not set
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DesignerConfig {
    pub target: TargetMetric,
    pub target_value: Option<f64>,
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub min_elements: usize,
    pub max_elements: usize,
    pub seed: Option<u64>,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        DesignerConfig {
            target: TargetMetric::Balanced,
            target_value: None,
            population_size: 20,
            generations: 50,
            mutation_rate: 0.2,
            min_elements: 8,
            max_elements: 15,
            seed: None,
        }
    }
}

/// Objective holds everything the fitness of a track depends on. It carries no random state, so
/// fitness evaluations can run in parallel.
#[derive(Debug, Clone, Copy)]
pub struct Objective {
    pub target: TargetMetric,
    pub target_value: Option<f64>,
}

impl Objective {
    pub fn fitness(&self, elements: &[TrackElement]) -> f64 {
        let m = TrackMetrics::calculate(elements);

        match self.target {
            TargetMetric::Overtakes => {
                m.possible_overtakes as f64 * 20.0 + m.straight_count as f64 * 5.0
                    - (m.difficulty_score - 50.0).abs() * 0.5
            }
            TargetMetric::Speed => {
                let banking_sum: f64 = elements
                    .iter()
                    .filter(|el| el.is_corner())
                    .map(|el| el.banking)
                    .sum();
                m.straight_count as f64 * 10.0 + banking_sum * 2.0
                    - m.estimated_lap_time
                    - m.elevation_change * 0.2
            }
            TargetMetric::Difficulty => {
                let target = self.target_value.unwrap_or(DEFAULT_TARGET_DIFFICULTY);
                100.0 - (m.difficulty_score - target).abs()
                    + m.corner_count as f64 * 2.0
                    + m.elevation_change * 0.5
            }
            TargetMetric::Safety => {
                m.safety_rating - m.difficulty_score * 0.3 + m.straight_count as f64 * 2.0
            }
            TargetMetric::Balanced => {
                100.0
                    - (m.total_length - 5000.0).abs() / 100.0
                    - (m.possible_overtakes as f64 - 5.0).abs() * 5.0
                    - (m.difficulty_score - 50.0).abs() * 0.5
                    + (m.safety_rating - 60.0) * 0.3
            }
        }
    }
}

/// Evolution is the outcome of a genetic search.
#[derive(Debug, Clone)]
pub struct Evolution {
    pub elements: Vec<TrackElement>,
    pub metrics: TrackMetrics,
    pub best_fitness: f64,
    /// Best fitness found up to and including each generation.
    pub best_fitness_history: Vec<f64>,
}

#[derive(Debug)]
pub struct TrackDesigner {
    pub config: DesignerConfig,
    rng: ChaCha8Rng,
}

impl TrackDesigner {
    pub fn new(config: &DesignerConfig) -> Result<TrackDesigner, DesignerError> {
        if config.population_size < 2 {
            return Err(DesignerError::PopulationTooSmall(config.population_size));
        }
        if !(0.0..=1.0).contains(&config.mutation_rate) {
            return Err(DesignerError::InvalidMutationRate(config.mutation_rate));
        }
        if config.min_elements == 0 || config.min_elements > config.max_elements {
            return Err(DesignerError::InvalidElementRange {
                min: config.min_elements,
                max: config.max_elements,
            });
        }

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(TrackDesigner {
            config: config.to_owned(),
            rng,
        })
    }

    pub fn objective(&self) -> Objective {
        Objective {
            target: self.config.target,
            target_value: self.config.target_value,
        }
    }

    pub fn fitness(&self, elements: &[TrackElement]) -> f64 {
        self.objective().fitness(elements)
    }

    // ---------------------------------------------------------------------------------------------
    // GENETIC OPERATORS ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn random_length(&mut self, kind: ElementKind) -> f64 {
        let (min, max) = if kind.is_corner() {
            CORNER_LENGTH
        } else {
            STRAIGHT_LENGTH
        };
        self.rng.gen_range(min..=max) as f64
    }

    fn random_banking(&mut self) -> f64 {
        self.rng.gen_range(0..=MAX_BANKING) as f64
    }

    fn random_elevation(&mut self) -> f64 {
        self.rng.gen_range(-MAX_ELEVATION..=MAX_ELEVATION) as f64
    }

    /// random_element draws a single element, straights are twice as likely as corners.
    pub fn random_element(&mut self) -> TrackElement {
        let kind = *[
            ElementKind::Straight,
            ElementKind::Straight,
            ElementKind::CornerLeft,
            ElementKind::CornerRight,
        ]
        .choose(&mut self.rng)
        .unwrap_or(&ElementKind::Straight);

        let length = self.random_length(kind);
        let banking = if kind.is_corner() {
            self.random_banking()
        } else {
            0.0
        };
        let elevation = self.random_elevation();

        TrackElement::new(kind, length, banking, elevation)
    }

    pub fn random_track(&mut self, min_elements: usize, max_elements: usize) -> Vec<TrackElement> {
        let no_elements = self.rng.gen_range(min_elements..=max_elements.max(min_elements));
        (0..no_elements).map(|_| self.random_element()).collect()
    }

    /// crossover combines the head of `parent_a` with the tail of `parent_b` at a random point.
    /// Parents with fewer than two elements return `parent_a` unchanged. Children shorter than six
    /// elements are padded with random elements.
    pub fn crossover(
        &mut self,
        parent_a: &[TrackElement],
        parent_b: &[TrackElement],
    ) -> Vec<TrackElement> {
        if parent_a.len() < 2 || parent_b.len() < 2 {
            return parent_a.to_vec();
        }

        let point = self.rng.gen_range(1..parent_a.len().min(parent_b.len()));
        let mut child: Vec<TrackElement> = parent_a[..point]
            .iter()
            .chain(parent_b[point..].iter())
            .cloned()
            .collect();

        while child.len() < MIN_CHILD_ELEMENTS {
            child.push(self.random_element());
        }

        child
    }

    /// mutate resamples one random property of every element with probability `rate`.
    pub fn mutate(&mut self, elements: &[TrackElement], rate: f64) -> Vec<TrackElement> {
        let mut mutated = elements.to_vec();

        for el in mutated.iter_mut() {
            if self.rng.gen::<f64>() >= rate {
                continue;
            }

            match self.rng.gen_range(0..5) {
                0 => el.length = self.random_length(el.kind),
                1 => el.banking = self.random_banking(),
                2 => el.elevation = self.random_elevation(),
                3 => {
                    el.kind = *[
                        ElementKind::Straight,
                        ElementKind::CornerLeft,
                        ElementKind::CornerRight,
                    ]
                    .choose(&mut self.rng)
                    .unwrap_or(&el.kind);
                    if el.is_corner() {
                        el.is_drs = false;
                    }
                }
                _ => {
                    if !el.is_corner() {
                        el.is_drs = self.rng.gen::<f64>() < DRS_MUTATION_PROB;
                    }
                }
            }
        }

        mutated
    }

    // ---------------------------------------------------------------------------------------------
    // EVOLUTION -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// evolve runs the genetic search. Every generation is scored in parallel and sorted by
    /// fitness, the better half survives, and the population is refilled with mutated children of
    /// random survivor pairs. The best track ever seen is post-processed (DRS zones, sectors).
    pub fn evolve(&mut self) -> Evolution {
        let pop_size = self.config.population_size;
        let no_survivors = (pop_size / 2).max(1);
        let objective = self.objective();
        let (min_el, max_el) = (self.config.min_elements, self.config.max_elements);
        let mutation_rate = self.config.mutation_rate;

        let mut population: Vec<Vec<TrackElement>> =
            (0..pop_size).map(|_| self.random_track(min_el, max_el)).collect();

        let mut best_track: Vec<TrackElement> = Vec::new();
        let mut best_fitness = f64::NEG_INFINITY;
        let mut best_fitness_history = Vec::with_capacity(self.config.generations);

        for i_gen in 0..self.config.generations {
            let fitness: Vec<f64> = population
                .par_iter()
                .map(|track| objective.fitness(track))
                .collect();

            let ranking = argsort(&fitness, SortOrder::Descending);
            let idx_best = ranking[0];

            if fitness[idx_best] > best_fitness {
                best_fitness = fitness[idx_best];
                best_track = population[idx_best].to_owned();
            }
            best_fitness_history.push(best_fitness);
            log::debug!(
                "Generation {}: best fitness {:.2}, best ever {:.2}",
                i_gen + 1,
                fitness[idx_best],
                best_fitness
            );

            let survivors: Vec<Vec<TrackElement>> = ranking
                .iter()
                .take(no_survivors)
                .map(|&idx| population[idx].to_owned())
                .collect();

            let mut next_population = survivors.to_owned();
            while next_population.len() < pop_size {
                let idx_a = self.rng.gen_range(0..survivors.len());
                let idx_b = self.rng.gen_range(0..survivors.len());
                let child = self.crossover(&survivors[idx_a], &survivors[idx_b]);
                let child = self.mutate(&child, mutation_rate);
                next_population.push(child);
            }
            population = next_population;
        }

        // without generations the best track is taken from the initial population
        if best_track.is_empty() {
            for track in population.iter() {
                let fitness = objective.fitness(track);
                if fitness > best_fitness {
                    best_fitness = fitness;
                    best_track = track.to_owned();
                }
            }
        }

        let mut elements = assign_drs_zones(&best_track);
        assign_sectors(&mut elements);
        let metrics = TrackMetrics::calculate(&elements);

        log::info!(
            "Evolved a {} track with {} elements, fitness {:.2}",
            self.config.target,
            elements.len(),
            best_fitness
        );

        Evolution {
            elements,
            metrics,
            best_fitness,
            best_fitness_history,
        }
    }

    /// choose_name picks a random track name for the configured target.
    pub fn choose_name(&mut self) -> String {
        let name = self
            .config
            .target
            .track_names()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("AI Generated Track");
        format!("{} (AI)", name)
    }
}

/// assign_drs_zones flags every straight longer than 350m that leads (cyclically) into a corner
/// as a DRS zone.
pub fn assign_drs_zones(elements: &[TrackElement]) -> Vec<TrackElement> {
    let mut processed = elements.to_vec();
    let no_elements = processed.len();

    for i in 0..no_elements {
        let next_is_corner = processed[(i + 1) % no_elements].is_corner();
        let el = &mut processed[i];
        if !el.is_corner() && el.length > DRS_MIN_STRAIGHT_LENGTH && next_is_corner {
            el.is_drs = true;
        }
    }

    processed
}

/// assign_sectors splits the track into three contiguous sectors of `len / 3` elements, the
/// remainder joins sector 3.
pub fn assign_sectors(elements: &mut [TrackElement]) {
    let sector_size = elements.len() / 3;

    for (i, el) in elements.iter_mut().enumerate() {
        el.sector = Some(if i < sector_size {
            1
        } else if i < 2 * sector_size {
            2
        } else {
            3
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn designer(target: TargetMetric, seed: u64) -> TrackDesigner {
        TrackDesigner::new(&DesignerConfig {
            target,
            seed: Some(seed),
            ..DesignerConfig::default()
        })
        .unwrap()
    }

    fn short_track() -> Vec<TrackElement> {
        vec![
            TrackElement::straight(500.0),
            TrackElement::corner(ElementKind::CornerLeft, 150.0, 10.0),
            TrackElement::straight(300.0),
            TrackElement::corner(ElementKind::CornerRight, 250.0, 2.0),
        ]
    }

    #[test]
    fn target_metric_parsing() {
        assert_eq!("speed".parse::<TargetMetric>(), Ok(TargetMetric::Speed));
        assert_eq!(" Balanced ".parse::<TargetMetric>(), Ok(TargetMetric::Balanced));
        assert_eq!(
            "fastest".parse::<TargetMetric>(),
            Err(ParseTargetError("fastest".to_owned()))
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let res = TrackDesigner::new(&DesignerConfig {
            population_size: 1,
            ..DesignerConfig::default()
        });
        assert_eq!(res.unwrap_err(), DesignerError::PopulationTooSmall(1));

        let res = TrackDesigner::new(&DesignerConfig {
            mutation_rate: 1.5,
            ..DesignerConfig::default()
        });
        assert!(matches!(res, Err(DesignerError::InvalidMutationRate(_))));
    }

    #[test]
    fn fitness_formulas() {
        let track = short_track();
        let m = TrackMetrics::calculate(&track);

        let overtakes = designer(TargetMetric::Overtakes, 0).fitness(&track);
        assert_relative_eq!(
            overtakes,
            m.possible_overtakes as f64 * 20.0 + 10.0 - (m.difficulty_score - 50.0).abs() * 0.5
        );

        let speed = designer(TargetMetric::Speed, 0).fitness(&track);
        assert_relative_eq!(
            speed,
            20.0 + 12.0 * 2.0 - m.estimated_lap_time - m.elevation_change * 0.2
        );

        let difficulty = designer(TargetMetric::Difficulty, 0).fitness(&track);
        assert_relative_eq!(
            difficulty,
            100.0 - (m.difficulty_score - 80.0).abs() + 4.0 + m.elevation_change * 0.5
        );

        let safety = designer(TargetMetric::Safety, 0).fitness(&track);
        assert_relative_eq!(safety, m.safety_rating - m.difficulty_score * 0.3 + 4.0);

        let balanced = designer(TargetMetric::Balanced, 0).fitness(&track);
        assert_relative_eq!(
            balanced,
            100.0 - (1200.0 - 5000.0f64).abs() / 100.0
                - (m.possible_overtakes as f64 - 5.0).abs() * 5.0
                - (m.difficulty_score - 50.0).abs() * 0.5
                + (m.safety_rating - 60.0) * 0.3
        );
    }

    #[test]
    fn difficulty_target_value_is_used() {
        let track = short_track();
        let m = TrackMetrics::calculate(&track);
        let d = TrackDesigner::new(&DesignerConfig {
            target: TargetMetric::Difficulty,
            target_value: Some(20.0),
            ..DesignerConfig::default()
        })
        .unwrap();
        assert_relative_eq!(
            d.fitness(&track),
            100.0 - (m.difficulty_score - 20.0).abs() + 4.0 + m.elevation_change * 0.5
        );
    }

    #[test]
    fn fitness_is_pure() {
        let mut d = designer(TargetMetric::Balanced, 11);
        let track = d.random_track(8, 15);
        let a = d.fitness(&track);
        d.random_track(8, 15);
        let b = d.fitness(&track);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn random_tracks_respect_ranges() {
        let mut d = designer(TargetMetric::Balanced, 5);
        for _ in 0..50 {
            let track = d.random_track(8, 15);
            assert!((8..=15).contains(&track.len()));
            for el in track.iter() {
                assert!((-30.0..=30.0).contains(&el.elevation));
                assert!(!el.is_drs);
                if el.is_corner() {
                    assert!((100.0..=400.0).contains(&el.length));
                    assert!((0.0..=25.0).contains(&el.banking));
                } else {
                    assert!((200.0..=800.0).contains(&el.length));
                    assert_relative_eq!(el.banking, 0.0);
                }
            }
        }
    }

    #[test]
    fn crossover_edge_cases() {
        let mut d = designer(TargetMetric::Balanced, 3);
        let tiny = vec![TrackElement::straight(400.0)];
        let track = short_track();

        assert_eq!(d.crossover(&tiny, &track), tiny);
        assert_eq!(d.crossover(&track, &tiny), track);

        // children of short parents are padded to six elements
        for _ in 0..20 {
            let child = d.crossover(&track, &track);
            assert_eq!(child.len(), 6);
            assert_eq!(child[0], track[0]);
        }
    }

    #[test]
    fn mutation_rates_zero_and_one() {
        let mut d = designer(TargetMetric::Balanced, 8);
        let track = d.random_track(10, 10);
        assert_eq!(d.mutate(&track, 0.0), track);

        let mutated = d.mutate(&track, 1.0);
        assert_eq!(mutated.len(), track.len());
        for el in mutated.iter() {
            if el.is_corner() {
                assert!(!el.is_drs);
            }
        }
    }

    #[test]
    fn drs_zones_and_sectors() {
        let mut track = vec![
            TrackElement::straight(400.0),
            TrackElement::corner(ElementKind::CornerLeft, 150.0, 10.0),
            TrackElement::straight(300.0),
            TrackElement::straight(600.0),
            TrackElement::corner(ElementKind::CornerRight, 200.0, 5.0),
            TrackElement::straight(800.0),
            TrackElement::straight(450.0),
        ];
        track = assign_drs_zones(&track);
        let drs: Vec<bool> = track.iter().map(|el| el.is_drs).collect();
        // the last straight wraps around to a straight, not a corner
        assert_eq!(drs, vec![true, false, false, true, false, false, false]);

        assign_sectors(&mut track);
        let sectors: Vec<Option<u8>> = track.iter().map(|el| el.sector).collect();
        assert_eq!(
            sectors,
            vec![Some(1), Some(1), Some(2), Some(2), Some(3), Some(3), Some(3)]
        );
    }

    #[test]
    fn evolution_never_regresses() {
        let mut d = TrackDesigner::new(&DesignerConfig {
            target: TargetMetric::Overtakes,
            generations: 30,
            seed: Some(21),
            ..DesignerConfig::default()
        })
        .unwrap();
        let evo = d.evolve();

        assert_eq!(evo.best_fitness_history.len(), 30);
        for pair in evo.best_fitness_history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_relative_eq!(*evo.best_fitness_history.last().unwrap(), evo.best_fitness);
        assert_eq!(evo.metrics, TrackMetrics::calculate(&evo.elements));
        assert!(evo.elements.iter().all(|el| el.sector.is_some()));
    }

    #[test]
    fn evolution_is_reproducible() {
        let evo_a = designer(TargetMetric::Speed, 99).evolve();
        let evo_b = designer(TargetMetric::Speed, 99).evolve();
        assert_eq!(evo_a.elements, evo_b.elements);
        assert_eq!(evo_a.best_fitness_history, evo_b.best_fitness_history);
    }
}
