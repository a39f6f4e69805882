use crate::core::tireset::Compound;
use crate::core::weather::WeatherState;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// Gap recorded in the per-lap gap history of a retired car.
pub const DNF_GAP: f64 = 999.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum DnfMarker {
    #[serde(rename = "DNF")]
    Dnf,
}

/// Gap to the winner, serialized as a number of seconds or the string "DNF".
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum GapToLeader {
    Time(f64),
    Dnf(DnfMarker),
}

impl GapToLeader {
    pub fn as_time(&self) -> Option<f64> {
        match self {
            GapToLeader::Time(t) => Some(*t),
            GapToLeader::Dnf(_) => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RaceStart,
    Grid,
    LapSummary,
    PitStop,
    TireWarning,
    Overtake,
    Incident,
    Retirement,
    WeatherChange,
    SafetyCar,
    SafetyCarIn,
    RaceFinish,
}

/// One entry of the race commentary log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Commentary {
    pub lap: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

/// DriverResult is the classification entry of a single car.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DriverResult {
    pub position: u32,
    pub driver: String,
    pub car_number: u32,
    pub total_time: f64,
    pub gap_to_leader: GapToLeader,
    pub lap_times: Vec<f64>,
    pub positions: Vec<u32>,
    pub gaps: Vec<f64>,
    pub pit_stops: u32,
    pub final_tire: Compound,
    pub status: String,
}

impl DriverResult {
    pub fn is_finished(&self) -> bool {
        self.gap_to_leader.as_time().is_some()
    }
}

/// RaceResult contains all race information that is required for post-processing the results.
///
/// If no car reaches the finish, `winner` and `winning_time` are `None` and `finishers` is 0.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RaceResult {
    pub race_results: Vec<DriverResult>,
    pub winner: Option<String>,
    pub winning_time: Option<f64>,
    pub total_laps: u32,
    pub fastest_lap: Option<f64>,
    pub fastest_lap_driver: Option<String>,
    pub commentary: Vec<Commentary>,
    pub safety_car_periods: u32,
    pub weather_summary: Vec<WeatherState>,
    pub track_name: String,
    pub finishers: usize,
}

impl RaceResult {
    /// get_car_result returns the classification entry of the given car number.
    pub fn get_car_result(&self, car_no: u32) -> Option<&DriverResult> {
        self.race_results.iter().find(|r| r.car_number == car_no)
    }

    fn laptime_table(&self) -> anyhow::Result<String> {
        let mut table = String::from("lap, ");

        for (i, res) in self.race_results.iter().enumerate() {
            let sep = if i < self.race_results.len() - 1 { ", " } else { "" };
            write!(&mut table, "{:3} ({}){}", res.car_number, res.driver, sep)?;
        }
        writeln!(&mut table)?;

        for lap in 0..self.total_laps as usize {
            write!(&mut table, "{:3}, ", lap + 1)?;

            for (i, res) in self.race_results.iter().enumerate() {
                let sep = if i < self.race_results.len() - 1 { ", " } else { "" };
                match res.lap_times.get(lap) {
                    Some(t) => write!(&mut table, "{:8.3}s{}", t, sep)?,
                    None => write!(&mut table, "{:>9}{}", "-", sep)?,
                }
            }
            writeln!(&mut table)?;
        }

        Ok(table)
    }

    /// print_lap_and_race_times prints the lap times and the final classification to the console
    /// output.
    pub fn print_lap_and_race_times(&self) -> anyhow::Result<()> {
        println!("RESULT: Lap times");
        println!("{}", self.laptime_table()?);

        println!("RESULT: Classification");
        for res in self.race_results.iter() {
            let gap = match res.gap_to_leader {
                GapToLeader::Time(_) if res.position == 1 => format!("{:10.3}s", res.total_time),
                GapToLeader::Time(t) => format!("{:10.3}s (+{:.3}s)", res.total_time, t),
                GapToLeader::Dnf(_) => format!("{:>11}", "DNF"),
            };
            println!(
                "P{:<2} #{:<3} {:<20} {} pits: {} tire: {} status: {}",
                res.position, res.car_number, res.driver, gap, res.pit_stops, res.final_tire, res.status
            );
        }

        match (&self.winner, self.winning_time) {
            (Some(winner), Some(t)) => println!("RESULT: Winner {} in {:.3}s", winner, t),
            _ => println!("RESULT: No car reached the finish"),
        }
        if let (Some(driver), Some(t)) = (&self.fastest_lap_driver, self.fastest_lap) {
            println!("RESULT: Fastest lap {:.3}s by {}", t, driver);
        }

        Ok(())
    }

    /// write_lap_times_csv writes one row per lap and one column per car to a CSV file.
    pub fn write_lap_times_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .context(format!("Failed to create lap time file {}!", path.display()))?;

        let mut header = vec!["lap".to_owned()];
        header.extend(
            self.race_results
                .iter()
                .map(|res| format!("{} ({})", res.car_number, res.driver)),
        );
        writer.write_record(&header)?;

        for lap in 0..self.total_laps as usize {
            let mut row = vec![(lap + 1).to_string()];
            row.extend(self.race_results.iter().map(|res| {
                res.lap_times
                    .get(lap)
                    .map(|t| format!("{:.3}", t))
                    .unwrap_or_default()
            }));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_to_leader_serializes_as_number_or_dnf() {
        let time = serde_json::to_string(&GapToLeader::Time(1.5)).unwrap();
        let dnf = serde_json::to_string(&GapToLeader::Dnf(DnfMarker::Dnf)).unwrap();
        assert_eq!(time, "1.5");
        assert_eq!(dnf, "\"DNF\"");

        let parsed: GapToLeader = serde_json::from_str("\"DNF\"").unwrap();
        assert_eq!(parsed, GapToLeader::Dnf(DnfMarker::Dnf));
    }

    #[test]
    fn commentary_kind_is_serialized_as_type() {
        let entry = Commentary {
            lap: 3,
            text: "Lap 3: SAFETY CAR DEPLOYED!".to_owned(),
            kind: EventKind::SafetyCar,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "safety_car");
        assert_eq!(json["lap"], 3);
    }
}
