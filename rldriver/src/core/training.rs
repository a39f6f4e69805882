use crate::core::action::Action;
use crate::core::agent::{RaceOutcome, RlDriver, StepOutcome};
use crate::core::state::RLState;
use anyhow::Context;
use racesim::interfaces::lap_interface::{CarState, LapState};
use racesim::pre::read_sim_pars::SimPars;
use racesim::{Race, SimConstants};

/// Summary of one training episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub final_position: u32,
    pub total_reward: f64,
    /// Reward of every decision, in lap order.
    pub rewards: Vec<f64>,
    pub decisions: u32,
    pub pit_requests: u32,
    pub dnf: bool,
}

fn observe(lap_state: &LapState, car: &CarState) -> RLState {
    RLState {
        lap: lap_state.lap,
        total_laps: lap_state.tot_no_laps,
        position: car.position,
        tire_age: car.tire_age,
        tire_condition: car.tire_condition,
        gap_to_leader: car.gap_to_leader,
        weather: lap_state.weather.to_string(),
    }
}

fn find_car(lap_state: &LapState, car_no: u32) -> anyhow::Result<&CarState> {
    lap_state
        .get_car_state(car_no)
        .context(format!("Car {} is missing in the lap state!", car_no))
}

/// train_in_race lets the agent drive one race against the drivers of `sim_pars`. Before every lap
/// the agent observes its car and chooses an action, PitNow is forwarded to the race as a pit
/// request. After the lap the reward of the observed outcome is used for a Q update, the last
/// transition of the race (finish or retirement) is terminal. Only a car that sees the flag gets
/// the race completion reward. Finally, the race is booked with `train_on_race`.
pub fn train_in_race(
    agent: &mut RlDriver,
    sim_pars: &SimPars,
    sim_consts: &SimConstants,
    seed: Option<u64>,
) -> anyhow::Result<EpisodeSummary> {
    let mut driver_pars_all = sim_pars.driver_pars_all.to_owned();
    driver_pars_all.push(agent.to_driver_config());
    let car_no = driver_pars_all.len() as u32;

    let mut race_pars = sim_pars.race_pars.to_owned();
    if seed.is_some() {
        race_pars.seed = seed;
    }

    let mut race = Race::new(&race_pars, sim_consts, &sim_pars.track_pars, &driver_pars_all)
        .context("Failed to set up the training race!")?;

    let mut lap_state = race.lap_state();
    let mut rewards = Vec::new();
    let mut decisions = 0;
    let mut pit_requests = 0;

    while !race.is_finished() {
        let car = find_car(&lap_state, car_no)?;
        let state = observe(&lap_state, car);

        let action = agent.choose_action(&state, true);
        if action == Action::PitNow && race.request_pit(car_no) {
            pit_requests += 1;
        }
        decisions += 1;

        race.simulate_lap();
        let next_lap_state = race.lap_state();
        let next_car = find_car(&next_lap_state, car_no)?;

        let race_over = race.is_finished() || next_car.retired;
        let final_position = if race.is_finished() && !next_car.retired {
            Some(next_car.position)
        } else {
            None
        };
        let outcome = StepOutcome {
            position_gained: next_car.position < state.position,
            position_lost: next_car.position > state.position,
            faster_than_average: next_car
                .last_laptime
                .map_or(false, |t| t < next_lap_state.mean_laptime()),
            incident: next_car.incident_this_lap,
            dnf: next_car.retired,
            final_position,
        };

        let reward = RlDriver::calculate_reward(&state, action, &outcome);
        rewards.push(reward);

        if race_over {
            agent.update_q_value(&state, action, reward, None);
        } else {
            let next_state = observe(&next_lap_state, next_car);
            agent.update_q_value(&state, action, reward, Some(&next_state));
        }

        let retired = next_car.retired;
        lap_state = next_lap_state;
        if retired {
            break;
        }
    }

    let result = race.simulate_race();
    let driver_result = result
        .get_car_result(car_no)
        .context(format!("Car {} is missing in the race result!", car_no))?;

    agent.train_on_race(&RaceOutcome {
        final_position: driver_result.position,
    });

    Ok(EpisodeSummary {
        final_position: driver_result.position,
        total_reward: rewards.iter().sum(),
        rewards,
        decisions,
        pit_requests,
        dnf: !driver_result.is_finished(),
    })
}
