use crate::core::element::TrackElement;
use serde::{Deserialize, Serialize};

/// Scalar metrics of a track, always derived from its element list.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetrics {
    pub total_length: f64,
    pub estimated_lap_time: f64,
    pub difficulty_score: f64,
    pub possible_overtakes: u32,
    pub safety_rating: f64,
    pub elevation_change: f64,
    pub corner_count: u32,
    pub straight_count: u32,
    pub drs_zone_count: u32,
}

impl Default for TrackMetrics {
    fn default() -> Self {
        TrackMetrics {
            total_length: 0.0,
            estimated_lap_time: 0.0,
            difficulty_score: 0.0,
            possible_overtakes: 0,
            safety_rating: 100.0,
            elevation_change: 0.0,
            corner_count: 0,
            straight_count: 0,
            drs_zone_count: 0,
        }
    }
}

impl TrackMetrics {
    /// calculate derives the metrics of the inserted element list. The list is cyclic, i.e. the
    /// last element connects to the first one. An empty list results in zeroed metrics with a
    /// safety rating of 100.
    pub fn calculate(elements: &[TrackElement]) -> TrackMetrics {
        if elements.is_empty() {
            return TrackMetrics::default();
        }

        let total_length: f64 = elements.iter().map(|el| el.length).sum();
        let corner_count = elements.iter().filter(|el| el.is_corner()).count() as u32;
        let straight_count = elements.len() as u32 - corner_count;
        let drs_zone_count = elements.iter().filter(|el| el.is_drs).count() as u32;

        let elev_max = elements
            .iter()
            .map(|el| el.elevation)
            .fold(f64::NEG_INFINITY, f64::max);
        let elev_min = elements
            .iter()
            .map(|el| el.elevation)
            .fold(f64::INFINITY, f64::min);
        let elevation_change = elev_max - elev_min;

        // lap time
        let mut estimated_lap_time = 0.0;
        for el in elements.iter() {
            if el.is_corner() {
                estimated_lap_time += el.length / 30.0 * (1.0 - el.banking * 0.01);
            } else {
                estimated_lap_time += el.length / 50.0;
                if el.is_drs {
                    estimated_lap_time -= el.length / 70.0;
                }
            }
            estimated_lap_time += el.elevation.abs() * 0.05;
        }

        // difficulty
        let difficulty_score = (corner_count as f64 * 2.0
            + elevation_change / 10.0 * 3.0
            + total_length / 1000.0
            - drs_zone_count as f64 * 2.0)
            .clamp(0.0, 100.0);

        // overtaking opportunities
        let mut overtakes = 0.0;
        for (i, el) in elements.iter().enumerate() {
            let next_el = &elements[(i + 1) % elements.len()];

            if !el.is_corner() && next_el.is_corner() {
                if el.length > 300.0 {
                    overtakes += 1.0;
                }
                if el.is_drs {
                    overtakes += 1.0;
                }
            }

            if el.is_corner() && el.banking < 5.0 {
                overtakes += 0.5;
            }
        }

        // safety
        let mut safety_rating = 100.0;
        for el in elements.iter() {
            if el.is_corner() && el.length > 200.0 {
                safety_rating -= 5.0;
            }
            if el.is_corner() && el.banking < 3.0 {
                safety_rating -= 3.0;
            }
            if el.elevation.abs() > 20.0 {
                safety_rating -= 4.0;
            }
        }

        TrackMetrics {
            total_length,
            estimated_lap_time,
            difficulty_score,
            possible_overtakes: overtakes as u32,
            safety_rating: f64::clamp(safety_rating, 0.0, 100.0),
            elevation_change,
            corner_count,
            straight_count,
            drs_zone_count,
        }
    }
}

/// difficulty_label classifies a difficulty score: easy < 25 <= medium < 50 <= hard < 75 <= extreme.
pub fn difficulty_label(score: f64) -> &'static str {
    if score < 25.0 {
        "easy"
    } else if score < 50.0 {
        "medium"
    } else if score < 75.0 {
        "hard"
    } else {
        "extreme"
    }
}

/// safety_label classifies a safety rating.
pub fn safety_label(rating: f64) -> &'static str {
    if rating >= 80.0 {
        "very safe"
    } else if rating >= 60.0 {
        "safe"
    } else if rating >= 40.0 {
        "moderate"
    } else if rating >= 20.0 {
        "risky"
    } else {
        "dangerous"
    }
}
