use crate::core::race::FlagState;
use crate::core::tireset::Compound;
use crate::core::weather::WeatherState;
use serde::Serialize;

/// CarState is the snapshot of a single car at the end of a lap.
#[derive(Debug, Clone, Serialize)]
pub struct CarState {
    pub car_no: u32,
    pub driver_name: String,
    pub position: u32,
    pub total_time: f64,
    pub gap_to_leader: f64,
    pub compound: Compound,
    pub tire_age: u32,
    pub tire_condition: f64,
    pub pit_stops: u32,
    pub last_laptime: Option<f64>,
    pub incident_this_lap: bool,
    pub retired: bool,
}

/// LapState is sent to the host after every simulated lap. Hosts that stop receiving abort the
/// race before the next lap is simulated.
#[derive(Debug, Clone, Serialize)]
pub struct LapState {
    pub lap: u32,
    pub tot_no_laps: u32,
    pub flag_state: FlagState,
    pub weather: WeatherState,
    pub car_states: Vec<CarState>,
}

impl LapState {
    pub fn get_car_state(&self, car_no: u32) -> Option<&CarState> {
        self.car_states.iter().find(|c| c.car_no == car_no)
    }

    /// Mean lap time of the cars that completed the current lap.
    pub fn mean_laptime(&self) -> f64 {
        let laptimes: Vec<f64> = self
            .car_states
            .iter()
            .filter(|c| !c.retired)
            .filter_map(|c| c.last_laptime)
            .collect();
        helpers::general::mean(&laptimes)
    }
}
