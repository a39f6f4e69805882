use serde::{Deserialize, Serialize};

/// * `name` - Driver name, e.g. Valtteri Bottas
/// * `skill` - Driver ability in [0, 1], shifts the lap time by -5% to +5%
/// * `aggression` - Driving style in [0, 1], raises tire wear, incident risk and overtake attempts
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverPars {
    pub name: String,
    #[serde(default = "default_skill")]
    pub skill: f64,
    #[serde(default = "default_aggression")]
    pub aggression: f64,
}

fn default_skill() -> f64 {
    0.7
}

fn default_aggression() -> f64 {
    0.5
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub name: String,
    pub skill: f64,
    pub aggression: f64,
}

impl Driver {
    pub fn new(driver_pars: &DriverPars) -> Driver {
        Driver {
            name: driver_pars.name.to_owned(),
            skill: driver_pars.skill.clamp(0.0, 1.0),
            aggression: driver_pars.aggression.clamp(0.0, 1.0),
        }
    }

    /// skill_factor returns the lap time multiplier caused by the driver's skill.
    pub fn skill_factor(&self) -> f64 {
        1.0 - (self.skill * 0.1 - 0.05)
    }
}
