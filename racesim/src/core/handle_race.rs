use crate::core::race::{Race, SimConstants};
use crate::interfaces::lap_interface::LapState;
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::Sender;

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted, the state of the race is sent after
/// every lap. The race is aborted if the receiving side was dropped.
pub fn handle_race(
    sim_pars: &SimPars,
    sim_consts: &SimConstants,
    tx: Option<&Sender<LapState>>,
) -> anyhow::Result<RaceResult> {
    let mut race = Race::new(
        &sim_pars.race_pars,
        sim_consts,
        &sim_pars.track_pars,
        &sim_pars.driver_pars_all,
    )
    .context("Failed to set up the race!")?;

    log::info!(
        "Simulating {} laps on {} with {} cars",
        race.tot_no_laps,
        race.track.name,
        race.cars_list.len()
    );

    while !race.is_finished() {
        race.simulate_lap();

        if let Some(tx) = tx {
            tx.send(race.lap_state()).context(format!(
                "Lap receiver disconnected, race aborted in lap {}!",
                race.cur_lap
            ))?;
        }

        log::debug!(
            "Lap {} done, flag state {:?}, weather {}",
            race.cur_lap,
            race.flag_state,
            race.weather_state
        );
    }

    Ok(race.get_race_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::DriverPars;
    use crate::core::race::RacePars;
    use crate::core::track::TrackPars;
    use crate::core::weather::WeatherMode;

    fn sim_pars(tot_no_laps: u32) -> SimPars {
        SimPars {
            race_pars: RacePars {
                tot_no_laps,
                weather: WeatherMode::Dry,
                sc_prob: 0.0,
                seed: Some(3),
            },
            track_pars: TrackPars::default(),
            driver_pars_all: vec![
                DriverPars {
                    name: "A".to_owned(),
                    skill: 0.8,
                    aggression: 0.3,
                },
                DriverPars {
                    name: "B".to_owned(),
                    skill: 0.7,
                    aggression: 0.4,
                },
            ],
        }
    }

    #[test]
    fn one_lap_state_per_lap_is_sent() {
        let (tx, rx) = flume::unbounded();
        let result = handle_race(&sim_pars(6), &SimConstants::default(), Some(&tx)).unwrap();
        drop(tx);

        let laps: Vec<u32> = rx.iter().map(|s| s.lap).collect();
        assert_eq!(laps, (1..=6).collect::<Vec<u32>>());
        assert_eq!(result.total_laps, 6);
    }

    #[test]
    fn dropped_receiver_aborts_race() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        let res = handle_race(&sim_pars(6), &SimConstants::default(), Some(&tx));
        assert!(res.is_err());
    }

    #[test]
    fn invalid_race_is_reported() {
        let res = handle_race(&sim_pars(0), &SimConstants::default(), None);
        assert!(res.is_err());
    }
}
