use crate::core::car::{Car, IncidentKind};
use crate::core::driver::{Driver, DriverPars};
use crate::core::tireset::Compound;
use crate::core::track::{Track, TrackPars};
use crate::core::weather::{WeatherMode, WeatherState};
use crate::interfaces::lap_interface::{CarState, LapState};
use crate::post::race_result::{
    Commentary, DnfMarker, DriverResult, EventKind, GapToLeader, RaceResult, DNF_GAP,
};
use helpers::general::{argsort, round_to, SortOrder};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// * `tot_no_laps` - Total number of laps
/// * `weather` - Weather mode of the race (dry, rain or variable)
/// * `sc_prob` - Probability per lap that a safety car is deployed without a cause
/// * `seed` - Seed of the random number generator, drawn from OS entropy if not set
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RacePars {
    pub tot_no_laps: u32,
    #[serde(default)]
    pub weather: WeatherMode,
    #[serde(default = "default_sc_prob")]
    pub sc_prob: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_sc_prob() -> f64 {
    0.05
}

/// Heuristic constants of the overtake model. An attempt is made for every pair of adjacent cars
/// within `max_gap`. Its chance is
///
/// `w_skill * d_skill + w_tire * d_tire + w_aggression * aggression - overtake_difficulty /
/// difficulty_divisor + U(-noise, noise)`
///
/// and it succeeds if the chance exceeds `threshold` and a uniform draw falls below it.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OvertakePars {
    pub max_gap: f64,
    pub threshold: f64,
    pub w_skill: f64,
    pub w_tire: f64,
    pub w_aggression: f64,
    pub difficulty_divisor: f64,
    pub noise: f64,
    pub t_advantage_min: f64,
    pub t_advantage_max: f64,
}

impl Default for OvertakePars {
    fn default() -> Self {
        OvertakePars {
            max_gap: 2.0,
            threshold: 0.3,
            w_skill: 0.3,
            w_tire: 0.3,
            w_aggression: 0.2,
            difficulty_divisor: 200.0,
            noise: 0.1,
            t_advantage_min: 0.3,
            t_advantage_max: 0.8,
        }
    }
}

/// Simulation constants, every field falls back to its default if missing in the parameter file.
///
/// * `weather_change_prob` - Probability per lap of a dry/rain toggle in variable weather
/// * `sc_laps_min`, `sc_laps_max` - (laps) Range of the safety car duration
/// * `sc_factor` - Lap time multiplier behind the safety car
/// * `t_pit_min`, `t_pit_max` - (s) Range of the pit stop time loss
/// * `laptime_noise_min`, `laptime_noise_max` - Range of the random lap time multiplier
/// * `p_incident_*` - Incident probability per lap and its increments
/// * `p_sc_after_retirement` - Probability that a retirement triggers a safety car
/// * `t_incident_min`, `t_incident_max` - (s) Range of the time loss of a non-terminal incident
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SimConstants {
    pub weather_change_prob: f64,
    pub sc_laps_min: u32,
    pub sc_laps_max: u32,
    pub sc_factor: f64,
    pub t_pit_min: f64,
    pub t_pit_max: f64,
    pub laptime_noise_min: f64,
    pub laptime_noise_max: f64,
    pub p_incident_base: f64,
    pub p_incident_aggression: f64,
    pub p_incident_worn_tires: f64,
    pub p_incident_rain: f64,
    pub p_sc_after_retirement: f64,
    pub t_incident_min: f64,
    pub t_incident_max: f64,
    pub overtake: OvertakePars,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            weather_change_prob: 0.1,
            sc_laps_min: 2,
            sc_laps_max: 4,
            sc_factor: 1.3,
            t_pit_min: 20.0,
            t_pit_max: 25.0,
            laptime_noise_min: 0.995,
            laptime_noise_max: 1.015,
            p_incident_base: 0.005,
            p_incident_aggression: 0.01,
            p_incident_worn_tires: 0.02,
            p_incident_rain: 0.015,
            p_sc_after_retirement: 0.6,
            t_incident_min: 5.0,
            t_incident_max: 15.0,
            overtake: OvertakePars::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RaceError {
    #[error("a race needs at least one driver")]
    NoDrivers,
    #[error("a race needs at least one lap")]
    NoLaps,
    #[error("{field} must be between 0 and 1 (got {value:.3})")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct SafetyCar {
    pub active: bool,
    pub laps: u32,
    pub laps_target: u32,
    pub periods: u32,
}

impl SafetyCar {
    pub fn new() -> Self {
        SafetyCar {
            active: false,
            laps: 0,
            laps_target: 0,
            periods: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlagState {
    G,  // green
    Sc, // safety car
    C,  // chequered
}

impl Default for FlagState {
    fn default() -> Self {
        FlagState::G
    }
}

#[derive(Debug)]
pub struct Race {
    pub cur_lap: u32,
    pub tot_no_laps: u32,
    pub weather_mode: WeatherMode,
    pub weather_state: WeatherState,
    pub weather_history: Vec<WeatherState>,
    sc_prob: f64,
    pub safety_car: SafetyCar,
    pub flag_state: FlagState,
    pub track: Track,
    pub cars_list: Vec<Car>,
    running_order: Vec<usize>,
    retired_order: Vec<usize>,
    commentary: Vec<Commentary>,
    sim_consts: SimConstants,
    rng: ChaCha8Rng,
}

impl Race {
    /// new validates the parameters, creates the cars and draws the starting grid. Cars start on
    /// wet tires in rain races and on mediums otherwise.
    pub fn new(
        race_pars: &RacePars,
        sim_consts: &SimConstants,
        track_pars: &TrackPars,
        driver_pars_all: &[DriverPars],
    ) -> Result<Race, RaceError> {
        if driver_pars_all.is_empty() {
            return Err(RaceError::NoDrivers);
        }
        if race_pars.tot_no_laps == 0 {
            return Err(RaceError::NoLaps);
        }
        check_probability("sc_prob", race_pars.sc_prob)?;
        check_probability("weather_change_prob", sim_consts.weather_change_prob)?;
        check_probability("p_sc_after_retirement", sim_consts.p_sc_after_retirement)?;

        let mut rng = match race_pars.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        // create cars, car numbers follow the order of the driver parameters
        let start_compound = match race_pars.weather {
            WeatherMode::Rain => Compound::Wet,
            _ => Compound::Medium,
        };
        let mut cars_list: Vec<Car> = driver_pars_all
            .iter()
            .enumerate()
            .map(|(i, driver_pars)| {
                Car::new(i as u32 + 1, Driver::new(driver_pars), start_compound)
            })
            .collect();

        // draw the starting grid
        cars_list.shuffle(&mut rng);
        for (i, car) in cars_list.iter_mut().enumerate() {
            car.position = i as u32 + 1;
        }

        let weather_state = race_pars.weather.initial_state();

        let mut race = Race {
            cur_lap: 0,
            tot_no_laps: race_pars.tot_no_laps,
            weather_mode: race_pars.weather,
            weather_state,
            weather_history: Vec::with_capacity(race_pars.tot_no_laps as usize),
            sc_prob: race_pars.sc_prob,
            safety_car: SafetyCar::new(),
            flag_state: FlagState::G,
            track: Track::new(track_pars),
            running_order: (0..cars_list.len()).collect(),
            retired_order: Vec::new(),
            commentary: Vec::new(),
            sim_consts: sim_consts.to_owned(),
            rng,
            cars_list,
        };

        race.add_commentary("Race start!".to_owned(), EventKind::RaceStart);
        let grid = race
            .cars_list
            .iter()
            .map(|car| format!("P{} {}", car.position, car.driver.name))
            .collect::<Vec<String>>()
            .join(", ");
        race.add_commentary(format!("Grid: {}", grid), EventKind::Grid);

        Ok(race)
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHODS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// Simulates one lap for the whole field. Does nothing once the race is finished.
    pub fn simulate_lap(&mut self) {
        if self.is_finished() {
            return;
        }

        self.cur_lap += 1;
        log::debug!("Simulating lap {}/{}", self.cur_lap, self.tot_no_laps);

        self.update_weather();
        self.update_safety_car();

        // the lap time factor of the safety car is fixed for the whole lap, deployments caused by
        // incidents in this lap slow the field down from the next lap on
        let sc_this_lap = self.safety_car.active;

        for idx in 0..self.cars_list.len() {
            if self.cars_list[idx].is_retired() {
                continue;
            }

            self.handle_pitstop(idx);

            let laptime = self.calc_laptime(idx, sc_this_lap);
            let raining = matches!(self.weather_state, WeatherState::Rain);
            self.cars_list[idx].drive_lap(laptime, raining);
            self.check_tire_warning(idx);

            self.check_for_incident(idx);
        }

        self.update_positions();

        if !self.safety_car.active {
            self.handle_overtakes();
        }

        self.add_lap_summary();

        if self.is_finished() {
            self.flag_state = FlagState::C;
            let text = match self.running_order.first() {
                Some(&idx) => format!("{} WINS THE RACE!", self.cars_list[idx].driver.name),
                None => "Race over, no car reached the finish!".to_owned(),
            };
            self.add_commentary(text, EventKind::RaceFinish);
            log::info!("Race finished after {} laps", self.tot_no_laps);
        }
    }

    /// Simulates all remaining laps and returns the race result.
    pub fn simulate_race(&mut self) -> RaceResult {
        while !self.is_finished() {
            self.simulate_lap();
        }
        self.get_race_result()
    }

    // ---------------------------------------------------------------------------------------------
    // RACE SIMULATOR PARTS ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// Toggles between dry and rain in variable weather and records the weather of the lap.
    fn update_weather(&mut self) {
        if matches!(self.weather_mode, WeatherMode::Variable)
            && self.rng.gen::<f64>() < self.sim_consts.weather_change_prob
        {
            self.weather_state = self.weather_state.toggled();
            let text = match self.weather_state {
                WeatherState::Rain => format!("Lap {}: Weather change! Now RAIN!", self.cur_lap),
                WeatherState::Dry => format!("Lap {}: Track drying!", self.cur_lap),
            };
            self.add_commentary(text, EventKind::WeatherChange);
            log::info!("Weather changed to {} in lap {}", self.weather_state, self.cur_lap);
        }

        self.weather_history.push(self.weather_state);
    }

    fn update_safety_car(&mut self) {
        if !self.safety_car.active {
            if self.rng.gen::<f64>() < self.sc_prob {
                self.deploy_safety_car();
            }
        } else {
            self.safety_car.laps += 1;
            if self.safety_car.laps >= self.safety_car.laps_target {
                self.clear_safety_car();
            }
        }
    }

    fn deploy_safety_car(&mut self) {
        if self.safety_car.active {
            return;
        }

        self.safety_car.active = true;
        self.safety_car.laps = 0;
        let sc_laps_min = self.sim_consts.sc_laps_min;
        let sc_laps_max = self.sim_consts.sc_laps_max.max(sc_laps_min);
        self.safety_car.laps_target = self.rng.gen_range(sc_laps_min..=sc_laps_max);
        self.safety_car.periods += 1;
        self.flag_state = FlagState::Sc;

        self.add_commentary(
            format!("Lap {}: SAFETY CAR DEPLOYED!", self.cur_lap),
            EventKind::SafetyCar,
        );
        log::info!(
            "Safety car deployed in lap {} for {} laps",
            self.cur_lap,
            self.safety_car.laps_target
        );
    }

    fn clear_safety_car(&mut self) {
        self.safety_car.active = false;
        self.flag_state = FlagState::G;

        self.add_commentary(
            format!("Lap {}: SAFETY CAR IN! Racing resumes!", self.cur_lap),
            EventKind::SafetyCarIn,
        );
        log::info!("Safety car in at lap {}", self.cur_lap);
    }

    /// Decides on a pit stop of the car and executes it.
    fn handle_pitstop(&mut self, idx: usize) {
        let pit = self.cars_list[idx].pit_this_lap(
            self.cur_lap,
            self.tot_no_laps,
            self.weather_mode,
            &mut self.rng,
        );
        if !pit {
            return;
        }

        let compound = self.choose_compound();
        let t_pit = Uniform::new_inclusive(self.sim_consts.t_pit_min, self.sim_consts.t_pit_max)
            .sample(&mut self.rng);

        let car = &mut self.cars_list[idx];
        let old_compound = car.perform_pitstop(compound, t_pit);
        let text = format!(
            "Lap {}: {} pits! {} -> {} (+{:.1}s)",
            self.cur_lap, car.driver.name, old_compound, compound, t_pit
        );
        self.add_commentary(text, EventKind::PitStop);
    }

    /// Chooses the compound of a pit stop on the basis of the weather mode and the race phase.
    fn choose_compound(&mut self) -> Compound {
        let lap_frac = self.cur_lap as f64 / self.tot_no_laps as f64;

        let options: &[Compound] = match self.weather_mode {
            WeatherMode::Rain => {
                return if self.rng.gen::<f64>() < 0.7 {
                    Compound::Wet
                } else {
                    Compound::Intermediate
                };
            }
            WeatherMode::Variable => &[Compound::Soft, Compound::Medium, Compound::Intermediate],
            WeatherMode::Dry if lap_frac < 0.3 => &[Compound::Medium, Compound::Hard],
            WeatherMode::Dry if lap_frac < 0.7 => {
                &[Compound::Medium, Compound::Soft, Compound::Hard]
            }
            WeatherMode::Dry => &[Compound::Soft, Compound::Medium],
        };

        options[self.rng.gen_range(0..options.len())]
    }

    /// Calculates the lap time of the car.
    fn calc_laptime(&mut self, idx: usize, sc_active: bool) -> f64 {
        let car = &self.cars_list[idx];

        let skill_factor = car.driver.skill_factor();
        let tire_factor = car.tireset.t_factor();
        let weather_factor = self.weather_state.weather_factor(car.tireset.compound);
        let sc_factor = if sc_active {
            self.sim_consts.sc_factor
        } else {
            1.0
        };
        let difficulty_factor = self.track.difficulty_factor();
        let noise = Uniform::new_inclusive(
            self.sim_consts.laptime_noise_min,
            self.sim_consts.laptime_noise_max,
        )
        .sample(&mut self.rng);

        self.track.t_base
            * skill_factor
            * tire_factor
            * weather_factor
            * sc_factor
            * difficulty_factor
            * noise
    }

    fn check_tire_warning(&mut self, idx: usize) {
        let car = &self.cars_list[idx];
        if car.tireset.condition() < 0.5 && car.tireset.age % 5 == 0 {
            let text = format!(
                "{} struggling on {}-lap old {} tires",
                car.driver.name, car.tireset.age, car.tireset.compound
            );
            self.add_commentary(text, EventKind::TireWarning);
        }
    }

    /// Checks the car for an incident. Crashes and mechanical failures retire the car, the other
    /// incidents cost time.
    fn check_for_incident(&mut self, idx: usize) {
        let consts = &self.sim_consts;
        let car = &self.cars_list[idx];

        let mut p_incident =
            consts.p_incident_base + car.driver.aggression * consts.p_incident_aggression;
        if car.tireset.condition() < 0.4 {
            p_incident += consts.p_incident_worn_tires;
        }
        if matches!(self.weather_state, WeatherState::Rain) {
            p_incident += consts.p_incident_rain;
        }

        if self.rng.gen::<f64>() >= p_incident {
            return;
        }

        let kind = IncidentKind::ALL[self.rng.gen_range(0..IncidentKind::ALL.len())];
        let cur_lap = self.cur_lap;
        self.cars_list[idx].incidents.push((cur_lap, kind));

        match kind.retirement_reason() {
            Some(reason) => {
                self.cars_list[idx].retire(reason);
                self.retired_order.push(idx);

                let name = self.cars_list[idx].driver.name.to_owned();
                self.add_commentary(
                    format!("Lap {}: {} OUT! {}!", cur_lap, name, kind.to_string().to_uppercase()),
                    EventKind::Retirement,
                );
                log::info!(
                    "Car {} retired in lap {} ({})",
                    self.cars_list[idx].car_no,
                    cur_lap,
                    kind
                );

                if self.rng.gen::<f64>() < self.sim_consts.p_sc_after_retirement {
                    self.deploy_safety_car();
                }
            }
            None => {
                let t_loss = Uniform::new_inclusive(
                    self.sim_consts.t_incident_min,
                    self.sim_consts.t_incident_max,
                )
                .sample(&mut self.rng);
                let car = &mut self.cars_list[idx];
                car.total_time += t_loss;

                let text = format!(
                    "Lap {}: {} has a {}! (+{:.1}s)",
                    cur_lap, car.driver.name, kind, t_loss
                );
                self.add_commentary(text, EventKind::Incident);
            }
        }
    }

    /// Sorts the running cars by race time and records positions and gaps. Retired cars are
    /// classified behind the running cars in the order of their retirement.
    fn update_positions(&mut self) {
        let active: Vec<usize> = (0..self.cars_list.len())
            .filter(|&idx| !self.cars_list[idx].is_retired())
            .collect();
        let racetimes: Vec<f64> = active
            .iter()
            .map(|&idx| self.cars_list[idx].total_time)
            .collect();

        self.running_order = argsort(&racetimes, SortOrder::Ascending)
            .into_iter()
            .map(|i| active[i])
            .collect();

        let t_leader = self
            .running_order
            .first()
            .map(|&idx| self.cars_list[idx].total_time)
            .unwrap_or(0.0);

        for (i, &idx) in self.running_order.iter().enumerate() {
            let car = &mut self.cars_list[idx];
            car.position = i as u32 + 1;
            car.positions.push(car.position);
            car.gaps.push(car.total_time - t_leader);
        }

        let no_active = self.running_order.len();
        for (i, &idx) in self.retired_order.iter().enumerate() {
            let car = &mut self.cars_list[idx];
            car.position = (no_active + i) as u32 + 1;
            car.positions.push(car.position);
            car.gaps.push(DNF_GAP);
        }
    }

    /// Resolves overtakes between adjacent running cars. A successful overtake gives the
    /// following car a small time advantage that swaps the positions in the next lap.
    fn handle_overtakes(&mut self) {
        let ot = self.sim_consts.overtake.to_owned();
        let running_order = self.running_order.to_owned();

        for pair in running_order.windows(2) {
            let (idx_front, idx_rear) = (pair[0], pair[1]);
            let front = &self.cars_list[idx_front];
            let rear = &self.cars_list[idx_rear];

            let gap = rear.total_time - front.total_time;
            if gap.abs() > ot.max_gap {
                continue;
            }

            let skill_diff = rear.driver.skill - front.driver.skill;
            let tire_diff = rear.tireset.condition() - front.tireset.condition();
            let mut chance = skill_diff * ot.w_skill + tire_diff * ot.w_tire
                + rear.driver.aggression * ot.w_aggression
                - self.track.overtake_difficulty / ot.difficulty_divisor;
            chance += Uniform::new_inclusive(-ot.noise, ot.noise).sample(&mut self.rng);

            if chance > ot.threshold && self.rng.gen::<f64>() < chance {
                let t_advantage = Uniform::new_inclusive(ot.t_advantage_min, ot.t_advantage_max)
                    .sample(&mut self.rng);
                self.cars_list[idx_rear].total_time -= t_advantage;

                let text = format!(
                    "Lap {}: {} overtakes {}!",
                    self.cur_lap,
                    self.cars_list[idx_rear].driver.name,
                    self.cars_list[idx_front].driver.name
                );
                self.add_commentary(text, EventKind::Overtake);
            }
        }
    }

    fn add_lap_summary(&mut self) {
        let lap = self.cur_lap;
        if !(lap % 5 == 0 || lap == 1 || lap == self.tot_no_laps) {
            return;
        }

        let leader = match self.running_order.first() {
            Some(&idx) => &self.cars_list[idx],
            None => return,
        };
        let gap_text = match self.running_order.get(1) {
            Some(&idx) => format!(
                " leads by {:.1}s",
                self.cars_list[idx].total_time - leader.total_time
            ),
            None => String::new(),
        };
        let text = format!("Lap {}/{}: {}{}", lap, self.tot_no_laps, leader.driver.name, gap_text);
        self.add_commentary(text, EventKind::LapSummary);
    }

    fn add_commentary(&mut self, text: String, kind: EventKind) {
        self.commentary.push(Commentary {
            lap: self.cur_lap,
            text,
            kind,
        });
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn is_finished(&self) -> bool {
        self.cur_lap >= self.tot_no_laps
    }

    pub fn get_commentary(&self) -> &[Commentary] {
        &self.commentary
    }

    pub fn get_car(&self, car_no: u32) -> Option<&Car> {
        self.cars_list.iter().find(|car| car.car_no == car_no)
    }

    /// request_pit asks the car to pit in the next lap. Returns false if the car does not exist or
    /// has retired.
    pub fn request_pit(&mut self, car_no: u32) -> bool {
        match self.cars_list.iter_mut().find(|car| car.car_no == car_no) {
            Some(car) if !car.is_retired() => {
                car.request_pit();
                true
            }
            _ => false,
        }
    }

    /// lap_state returns a snapshot of the race after the current lap.
    pub fn lap_state(&self) -> LapState {
        let cur_lap = self.cur_lap;
        let mut car_states: Vec<CarState> = self
            .cars_list
            .iter()
            .map(|car| CarState {
                car_no: car.car_no,
                driver_name: car.driver.name.to_owned(),
                position: car.position,
                total_time: car.total_time,
                gap_to_leader: car.gaps.last().copied().unwrap_or(0.0),
                compound: car.tireset.compound,
                tire_age: car.tireset.age,
                tire_condition: car.tireset.condition(),
                pit_stops: car.pit_stops,
                last_laptime: if car.laptimes.len() as u32 == cur_lap && cur_lap > 0 {
                    car.laptimes.last().copied()
                } else {
                    None
                },
                incident_this_lap: car.had_incident_in_lap(cur_lap),
                retired: car.is_retired(),
            })
            .collect();
        car_states.sort_by_key(|c| c.position);

        LapState {
            lap: cur_lap,
            tot_no_laps: self.tot_no_laps,
            flag_state: self.flag_state,
            weather: self.weather_state,
            car_states,
        }
    }

    pub fn get_race_result(&self) -> RaceResult {
        let mut order: Vec<usize> = self
            .running_order
            .iter()
            .copied()
            .filter(|&idx| !self.cars_list[idx].is_retired())
            .collect();
        // overtakes of the last lap are only reflected in the race times
        order.sort_by(|&a, &b| {
            self.cars_list[a]
                .total_time
                .partial_cmp(&self.cars_list[b].total_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let finishers = order.len();
        order.extend(self.retired_order.iter().copied());

        let t_winner = order
            .first()
            .filter(|_| finishers > 0)
            .map(|&idx| self.cars_list[idx].total_time);

        let race_results: Vec<DriverResult> = order
            .iter()
            .enumerate()
            .map(|(i, &idx)| {
                let car = &self.cars_list[idx];
                let (gap_to_leader, status) = match car.sh.get_retirement_reason() {
                    Some(reason) => (
                        GapToLeader::Dnf(DnfMarker::Dnf),
                        format!("DNF - {}", reason),
                    ),
                    None => (
                        GapToLeader::Time(round_to(
                            car.total_time - t_winner.unwrap_or(car.total_time),
                            3,
                        )),
                        "Finished".to_owned(),
                    ),
                };

                DriverResult {
                    position: i as u32 + 1,
                    driver: car.driver.name.to_owned(),
                    car_number: car.car_no,
                    total_time: round_to(car.total_time, 3),
                    gap_to_leader,
                    lap_times: car.laptimes.iter().map(|&t| round_to(t, 3)).collect(),
                    positions: car.positions.to_owned(),
                    gaps: car.gaps.iter().map(|&g| round_to(g, 3)).collect(),
                    pit_stops: car.pit_stops,
                    final_tire: car.tireset.compound,
                    status,
                }
            })
            .collect();

        let mut fastest: Option<(f64, usize)> = None;
        for (idx, car) in self.cars_list.iter().enumerate() {
            if let Some(t) = car.fastest_lap() {
                if fastest.map_or(true, |(t_best, _)| t < t_best) {
                    fastest = Some((t, idx));
                }
            }
        }

        RaceResult {
            winner: order
                .first()
                .filter(|_| finishers > 0)
                .map(|&idx| self.cars_list[idx].driver.name.to_owned()),
            winning_time: t_winner.map(|t| round_to(t, 3)),
            total_laps: self.tot_no_laps,
            fastest_lap: fastest.map(|(t, _)| round_to(t, 3)),
            fastest_lap_driver: fastest.map(|(_, idx)| self.cars_list[idx].driver.name.to_owned()),
            commentary: self.commentary.to_owned(),
            safety_car_periods: self.safety_car.periods,
            weather_summary: self.weather_history.to_owned(),
            track_name: self.track.name.to_owned(),
            finishers,
            race_results,
        }
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), RaceError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RaceError::ProbabilityOutOfRange { field, value })
    }
}
