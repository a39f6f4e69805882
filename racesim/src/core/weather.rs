use crate::core::tireset::Compound;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weather mode of a race as configured before the start.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherMode {
    Dry,
    Rain,
    Variable,
}

impl Default for WeatherMode {
    fn default() -> Self {
        WeatherMode::Dry
    }
}

/// Weather actually present on track during a lap.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherState {
    Dry,
    Rain,
}

impl WeatherMode {
    /// Weather on track at the race start. Variable races start dry.
    pub fn initial_state(self) -> WeatherState {
        match self {
            WeatherMode::Rain => WeatherState::Rain,
            WeatherMode::Dry | WeatherMode::Variable => WeatherState::Dry,
        }
    }
}

impl WeatherState {
    pub fn toggled(self) -> WeatherState {
        match self {
            WeatherState::Dry => WeatherState::Rain,
            WeatherState::Rain => WeatherState::Dry,
        }
    }

    /// weather_factor returns the lap time penalty for driving the given compound in this weather.
    pub fn weather_factor(self, compound: Compound) -> f64 {
        match (self, compound) {
            (WeatherState::Dry, c) if c.is_rain_tire() => 1.15,
            (WeatherState::Dry, _) => 1.0,
            (WeatherState::Rain, Compound::Wet) => 1.05,
            (WeatherState::Rain, Compound::Intermediate) => 1.08,
            (WeatherState::Rain, _) => 1.25,
        }
    }
}

impl fmt::Display for WeatherState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WeatherState::Dry => write!(f, "dry"),
            WeatherState::Rain => write!(f, "rain"),
        }
    }
}
