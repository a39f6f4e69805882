use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the tire condition, a worn out tire never drops below it.
pub const MIN_TIRE_CONDITION: f64 = 0.3;

/// Per-lap base wear before compound, aggression and weather scaling.
const BASE_WEAR_PER_LAP: f64 = 0.02;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

/// * `grip` - Relative grip level, lap time is divided by grip times tire condition
/// * `wear_rate` - Multiplier on the base wear per lap
/// * `optimal_laps` - (laps) Window after which wear accelerates
#[derive(Debug, Clone, Copy)]
pub struct CompoundPars {
    pub grip: f64,
    pub wear_rate: f64,
    pub optimal_laps: u32,
}

impl Compound {
    pub fn pars(self) -> CompoundPars {
        match self {
            Compound::Soft => CompoundPars {
                grip: 1.0,
                wear_rate: 1.5,
                optimal_laps: 15,
            },
            Compound::Medium => CompoundPars {
                grip: 0.85,
                wear_rate: 1.0,
                optimal_laps: 25,
            },
            Compound::Hard => CompoundPars {
                grip: 0.7,
                wear_rate: 0.6,
                optimal_laps: 40,
            },
            Compound::Intermediate => CompoundPars {
                grip: 0.9,
                wear_rate: 0.8,
                optimal_laps: 30,
            },
            Compound::Wet => CompoundPars {
                grip: 1.0,
                wear_rate: 0.5,
                optimal_laps: 35,
            },
        }
    }

    /// True for the rain compounds (intermediate and wet).
    pub fn is_rain_tire(self) -> bool {
        matches!(self, Compound::Intermediate | Compound::Wet)
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Compound::Soft => "soft",
            Compound::Medium => "medium",
            Compound::Hard => "hard",
            Compound::Intermediate => "intermediate",
            Compound::Wet => "wet",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Tireset {
    pub compound: Compound,
    pub age: u32,
    condition: f64,
}

impl Tireset {
    pub fn new(compound: Compound) -> Tireset {
        Tireset {
            compound,
            age: 0,
            condition: 1.0,
        }
    }

    pub fn condition(&self) -> f64 {
        self.condition
    }

    /// set_condition overrides the current condition, the value is clamped to
    /// [MIN_TIRE_CONDITION, 1.0].
    pub fn set_condition(&mut self, condition: f64) {
        self.condition = condition.clamp(MIN_TIRE_CONDITION, 1.0);
    }

    /// t_factor returns the lap time multiplier caused by the tires, i.e. 1 / (grip * condition).
    pub fn t_factor(&self) -> f64 {
        1.0 / (self.compound.pars().grip * self.condition)
    }

    /// calc_wear returns the condition loss of the coming lap.
    ///
    /// * `wear = 0.02 * wear_rate` within the optimal window
    /// * `wear = 0.02 * wear_rate * (1 + 0.05 * laps_beyond_window)` afterwards
    ///
    /// The result is scaled by `1 + 0.2 * aggression` and doubled for slick tires in the rain.
    /// `age` must already contain the lap that is being driven.
    pub fn calc_wear(&self, aggression: f64, raining: bool) -> f64 {
        let pars = self.compound.pars();
        let mut wear = BASE_WEAR_PER_LAP * pars.wear_rate;

        if self.age > pars.optimal_laps {
            let extra_laps = (self.age - pars.optimal_laps) as f64;
            wear *= 1.0 + extra_laps * 0.05;
        }

        wear *= 1.0 + aggression * 0.2;

        if raining && !self.compound.is_rain_tire() {
            wear *= 2.0;
        }

        wear
    }

    /// drive_lap increases the tire age by one lap and applies the resulting wear.
    pub fn drive_lap(&mut self, aggression: f64, raining: bool) {
        self.age += 1;
        let wear = self.calc_wear(aggression, raining);
        self.set_condition(self.condition - wear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fresh_tireset_is_new() {
        let tireset = Tireset::new(Compound::Soft);
        assert_eq!(tireset.age, 0);
        assert_relative_eq!(tireset.condition(), 1.0);
        assert_relative_eq!(tireset.t_factor(), 1.0);
    }

    #[test]
    fn wear_within_optimal_window() {
        let mut tireset = Tireset::new(Compound::Medium);
        tireset.drive_lap(0.0, false);
        assert_eq!(tireset.age, 1);
        assert_relative_eq!(tireset.condition(), 0.98, epsilon = 1e-12);
    }

    #[test]
    fn wear_accelerates_beyond_window_and_with_aggression() {
        let mut tireset = Tireset::new(Compound::Soft);
        tireset.age = 19;
        // four laps beyond the window of 15, aggression 0.5, slicks in rain
        let expected = 0.02 * 1.5 * (1.0 + 4.0 * 0.05) * (1.0 + 0.5 * 0.2) * 2.0;
        assert_relative_eq!(tireset.calc_wear(0.5, true), expected, epsilon = 1e-12);
    }

    #[test]
    fn condition_never_drops_below_floor() {
        let mut tireset = Tireset::new(Compound::Soft);
        for _ in 0..200 {
            tireset.drive_lap(1.0, true);
            assert!(tireset.condition() >= MIN_TIRE_CONDITION);
            assert!(tireset.condition() <= 1.0);
        }
        assert_relative_eq!(tireset.condition(), MIN_TIRE_CONDITION);
    }

    #[test]
    fn rain_tires_do_not_wear_double_in_rain() {
        let tireset = Tireset::new(Compound::Wet);
        assert_relative_eq!(tireset.calc_wear(0.0, true), tireset.calc_wear(0.0, false));
    }
}
