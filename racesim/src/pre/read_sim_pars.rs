use crate::core::driver::DriverPars;
use crate::core::race::{RacePars, SimConstants};
use crate::core::track::TrackPars;
use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs. Car numbers follow the order of
/// `driver_pars_all`.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    #[serde(default)]
    pub track_pars: TrackPars,
    pub driver_pars_all: Vec<DriverPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// read_sim_constants reads the simulation constants from a JSON file. Missing entries keep their
/// default values.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;
    let consts = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;
    Ok(consts)
}

/// read_track_pars reads the track metrics from a JSON file, e.g. a track exported by the track
/// designer.
pub fn read_track_pars(filepath: &Path) -> anyhow::Result<TrackPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open track file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse track file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::weather::WeatherMode;
    use approx::assert_relative_eq;

    #[test]
    fn parameter_file_with_defaults() {
        let pars: SimPars = serde_json::from_str(
            r#"{
                "race_pars": {"tot_no_laps": 20, "weather": "variable"},
                "driver_pars_all": [{"name": "Driver A"}, {"name": "Driver B", "skill": 0.9}]
            }"#,
        )
        .unwrap();

        assert_eq!(pars.race_pars.weather, WeatherMode::Variable);
        assert_relative_eq!(pars.race_pars.sc_prob, 0.05);
        assert_eq!(pars.race_pars.seed, None);
        assert_eq!(pars.track_pars, TrackPars::default());
        assert_relative_eq!(pars.driver_pars_all[0].skill, 0.7);
        assert_relative_eq!(pars.driver_pars_all[1].aggression, 0.5);
    }

    #[test]
    fn partial_constants_keep_defaults() {
        let consts: SimConstants =
            serde_json::from_str(r#"{"sc_factor": 1.4, "overtake": {"threshold": 0.2}}"#).unwrap();
        assert_relative_eq!(consts.sc_factor, 1.4);
        assert_relative_eq!(consts.overtake.threshold, 0.2);
        assert_relative_eq!(consts.overtake.max_gap, 2.0);
        assert_eq!(consts.sc_laps_max, 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let res = read_sim_pars(Path::new("does/not/exist.json"));
        assert!(res.is_err());
    }
}
