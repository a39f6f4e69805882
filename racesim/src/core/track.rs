use serde::{Deserialize, Serialize};

/// * `name` - Track name
/// * `total_length` - (m) Length of the track
/// * `estimated_lap_time` - (s) Base lap time before driver, tire, weather and flag effects
/// * `difficulty_score` - Track difficulty in [0, 100], every 10 points cost 1% lap time
/// * `possible_overtakes` - Number of overtaking opportunities per lap
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackPars {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_total_length")]
    pub total_length: f64,
    #[serde(default = "default_estimated_lap_time")]
    pub estimated_lap_time: f64,
    #[serde(default = "default_difficulty_score")]
    pub difficulty_score: f64,
    #[serde(default = "default_possible_overtakes")]
    pub possible_overtakes: u32,
}

fn default_name() -> String {
    "Unknown Track".to_owned()
}

fn default_total_length() -> f64 {
    5000.0
}

fn default_estimated_lap_time() -> f64 {
    90.0
}

fn default_difficulty_score() -> f64 {
    50.0
}

fn default_possible_overtakes() -> u32 {
    3
}

impl Default for TrackPars {
    fn default() -> Self {
        TrackPars {
            name: default_name(),
            total_length: default_total_length(),
            estimated_lap_time: default_estimated_lap_time(),
            difficulty_score: default_difficulty_score(),
            possible_overtakes: default_possible_overtakes(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub length: f64,
    pub t_base: f64,
    pub difficulty: f64,
    pub overtake_difficulty: f64,
}

impl Track {
    pub fn new(track_pars: &TrackPars) -> Track {
        Track {
            name: track_pars.name.to_owned(),
            length: track_pars.total_length,
            t_base: track_pars.estimated_lap_time,
            difficulty: track_pars.difficulty_score.clamp(0.0, 100.0),
            // every overtaking opportunity lowers the difficulty by 10 points
            overtake_difficulty: 100.0 - track_pars.possible_overtakes as f64 * 10.0,
        }
    }

    /// difficulty_factor returns the lap time multiplier caused by the track difficulty.
    pub fn difficulty_factor(&self) -> f64 {
        1.0 + self.difficulty / 1000.0
    }
}
