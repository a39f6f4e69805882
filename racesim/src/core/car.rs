use crate::core::driver::Driver;
use crate::core::state_handler::{RetirementReason, StateHandler};
use crate::core::tireset::{Compound, Tireset};
use crate::core::weather::WeatherMode;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Fraction of the race after which a car that has not stopped yet must pit.
const MANDATORY_PIT_LAP_FRAC: f64 = 0.7;

/// Tire condition below which a car pits immediately.
const CRITICAL_TIRE_CONDITION: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Spin,
    Crash,
    Mechanical,
    Puncture,
    Collision,
}

impl IncidentKind {
    pub const ALL: [IncidentKind; 5] = [
        IncidentKind::Spin,
        IncidentKind::Crash,
        IncidentKind::Mechanical,
        IncidentKind::Puncture,
        IncidentKind::Collision,
    ];

    /// Returns the retirement reason if the incident ends the race of the car.
    pub fn retirement_reason(self) -> Option<RetirementReason> {
        match self {
            IncidentKind::Crash => Some(RetirementReason::Crash),
            IncidentKind::Mechanical => Some(RetirementReason::Mechanical),
            _ => None,
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IncidentKind::Spin => "spin",
            IncidentKind::Crash => "crash",
            IncidentKind::Mechanical => "mechanical",
            IncidentKind::Puncture => "puncture",
            IncidentKind::Collision => "collision",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Car {
    pub car_no: u32,
    pub driver: Driver,
    pub sh: StateHandler,
    pub tireset: Tireset,
    pub position: u32,
    pub total_time: f64,
    pub pit_stops: u32,
    pub laptimes: Vec<f64>,
    pub positions: Vec<u32>,
    pub gaps: Vec<f64>,
    pub incidents: Vec<(u32, IncidentKind)>,
    pit_requested: bool,
}

impl Car {
    pub fn new(car_no: u32, driver: Driver, start_compound: Compound) -> Car {
        Car {
            car_no,
            driver,
            sh: StateHandler::default(),
            tireset: Tireset::new(start_compound),
            position: 0,
            total_time: 0.0,
            pit_stops: 0,
            laptimes: Vec::new(),
            positions: Vec::new(),
            gaps: Vec::new(),
            incidents: Vec::new(),
            pit_requested: false,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.sh.is_retired()
    }

    /// request_pit makes the car stop at the next pit decision regardless of its tires.
    pub fn request_pit(&mut self) {
        self.pit_requested = true;
    }

    pub fn pit_requested(&self) -> bool {
        self.pit_requested
    }

    /// pit_this_lap decides whether the car enters the pit lane in the current lap.
    ///
    /// A car pits if a stop was requested, if it has not stopped yet and the race is beyond 70%
    /// distance, if its tires are below 0.4 condition, with 20% probability once the tires are
    /// older than 20 laps, or if its tires do not match the weather mode of the race. Variable
    /// weather never forces a tire change, a car on slicks stays out during a rain spell.
    pub fn pit_this_lap<R: Rng + ?Sized>(
        &self,
        cur_lap: u32,
        tot_no_laps: u32,
        weather_mode: WeatherMode,
        rng: &mut R,
    ) -> bool {
        if self.pit_requested {
            return true;
        }

        if self.pit_stops == 0 && cur_lap as f64 > tot_no_laps as f64 * MANDATORY_PIT_LAP_FRAC {
            return true;
        }

        if self.tireset.condition() < CRITICAL_TIRE_CONDITION {
            return true;
        }

        if self.tireset.age > 20 && rng.gen::<f64>() < 0.2 {
            return true;
        }

        match weather_mode {
            WeatherMode::Rain => !self.tireset.compound.is_rain_tire(),
            WeatherMode::Dry => self.tireset.compound.is_rain_tire(),
            WeatherMode::Variable => false,
        }
    }

    /// perform_pitstop changes the tires and adds the stationary time loss to the race time. The
    /// previous compound is returned.
    pub fn perform_pitstop(&mut self, compound: Compound, t_pit: f64) -> Compound {
        self.sh.act_pit();

        let old_compound = self.tireset.compound;
        self.tireset = Tireset::new(compound);
        self.pit_stops += 1;
        self.total_time += t_pit;
        self.pit_requested = false;

        self.sh.deact_pit();
        old_compound
    }

    /// drive_lap books the lap time and wears the tires.
    pub fn drive_lap(&mut self, laptime: f64, raining: bool) {
        self.total_time += laptime;
        self.laptimes.push(laptime);
        self.tireset.drive_lap(self.driver.aggression, raining);
        self.sh.complete_lap();
    }

    /// retire ends the race of the car.
    pub fn retire(&mut self, reason: RetirementReason) {
        self.sh.retire(reason);
        self.pit_requested = false;
    }

    pub fn had_incident_in_lap(&self, lap: u32) -> bool {
        self.incidents.iter().any(|&(l, _)| l == lap)
    }

    pub fn fastest_lap(&self) -> Option<f64> {
        self.laptimes
            .iter()
            .copied()
            .fold(None, |best: Option<f64>, t| match best {
                Some(b) if b <= t => Some(b),
                _ => Some(t),
            })
    }
}
