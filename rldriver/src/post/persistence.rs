use crate::core::action::Action;
use crate::core::agent::{AgentPars, LearnedPreferences, LearningRecord, RlDriver};
use crate::core::state::{StateKey, StateKeyParseError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum PersistError {
    #[error("unsupported agent schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
    #[error("invalid state key in Q-table: {0}")]
    InvalidStateKey(#[from] StateKeyParseError),
    #[error("invalid action index {0} in Q-table")]
    InvalidAction(usize),
}

/// One Q-table entry, the action is stored as its index.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QEntry {
    pub state: String,
    pub action: usize,
    pub q: f64,
}

/// AgentRecord is the versioned, serializable form of an agent.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentRecord {
    pub schema_version: u32,
    pub name: String,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub q_table: Vec<QEntry>,
    pub races_completed: u32,
    pub total_wins: u32,
    pub total_podiums: u32,
    pub avg_finish_position: f64,
    #[serde(default)]
    pub learning_history: Vec<LearningRecord>,
    #[serde(default)]
    pub learned_preferences: LearnedPreferences,
}

impl RlDriver {
    /// to_record converts the agent into its persisted form. Q-table entries are sorted by state
    /// key and action so that equal agents result in equal records.
    pub fn to_record(&self) -> AgentRecord {
        let mut q_table: Vec<QEntry> = self
            .q_entries()
            .map(|(key, action, q)| QEntry {
                state: key.to_string(),
                action: action.index(),
                q,
            })
            .collect();
        q_table.sort_by(|a, b| a.state.cmp(&b.state).then(a.action.cmp(&b.action)));

        AgentRecord {
            schema_version: SCHEMA_VERSION,
            name: self.name.to_owned(),
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            exploration_rate: self.exploration_rate,
            q_table,
            races_completed: self.races_completed,
            total_wins: self.total_wins,
            total_podiums: self.total_podiums,
            avg_finish_position: self.avg_finish_position,
            learning_history: self.learning_history.to_owned(),
            learned_preferences: self.learned_preferences.to_owned(),
        }
    }

    /// from_record restores an agent. The random number generator is not part of the record and
    /// is seeded with `seed`.
    pub fn from_record(record: &AgentRecord, seed: Option<u64>) -> Result<RlDriver, PersistError> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(PersistError::UnsupportedSchema {
                found: record.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        let mut agent = RlDriver::new(&AgentPars {
            name: record.name.to_owned(),
            learning_rate: record.learning_rate,
            discount_factor: record.discount_factor,
            exploration_rate: record.exploration_rate,
            seed,
        });

        for entry in record.q_table.iter() {
            let key: StateKey = entry.state.parse()?;
            let action =
                Action::from_index(entry.action).ok_or(PersistError::InvalidAction(entry.action))?;
            agent.set_q_value(key, action, entry.q);
        }

        agent.races_completed = record.races_completed;
        agent.total_wins = record.total_wins;
        agent.total_podiums = record.total_podiums;
        agent.avg_finish_position = record.avg_finish_position;
        agent.learning_history = record.learning_history.to_owned();
        agent.learned_preferences = record.learned_preferences.to_owned();

        Ok(agent)
    }

    /// save_model writes the agent as JSON.
    pub fn save_model(&self, filepath: &Path) -> anyhow::Result<()> {
        let fh = File::create(filepath).context(format!(
            "Failed to create agent file {}!",
            filepath.display()
        ))?;
        serde_json::to_writer_pretty(fh, &self.to_record()).context(format!(
            "Failed to write agent file {}!",
            filepath.display()
        ))?;
        log::info!("Saved agent {} to {}", self.name, filepath.display());
        Ok(())
    }

    /// load_model reads an agent from a JSON file written by `save_model`.
    pub fn load_model(filepath: &Path, seed: Option<u64>) -> anyhow::Result<RlDriver> {
        let fh = OpenOptions::new()
            .read(true)
            .open(filepath)
            .context(format!(
                "Failed to open agent file {}!",
                filepath.display()
            ))?;
        let record: AgentRecord = serde_json::from_reader(&fh).context(format!(
            "Failed to parse agent file {}!",
            filepath.display()
        ))?;
        let agent = RlDriver::from_record(&record, seed).context(format!(
            "Failed to restore agent from {}!",
            filepath.display()
        ))?;
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::RaceOutcome;
    use crate::core::state::RLState;

    fn trained_agent() -> RlDriver {
        let mut agent = RlDriver::new(&AgentPars {
            name: "Persisted".to_owned(),
            seed: Some(9),
            ..AgentPars::default()
        });
        let s = RLState {
            lap: 15,
            total_laps: 50,
            position: 3,
            tire_age: 12,
            tire_condition: 0.75,
            gap_to_leader: 2.5,
            weather: "dry".to_owned(),
        };
        agent.update_q_value(&s, Action::PushHard, 10.0, None);
        agent.update_q_value(&s, Action::PitNow, -3.0, None);
        agent.train_on_race(&RaceOutcome { final_position: 2 });
        agent
    }

    #[test]
    fn record_round_trip() {
        let agent = trained_agent();
        let record = agent.to_record();
        assert_eq!(record.schema_version, 1);
        assert_eq!(record.q_table.len(), 2);
        assert_eq!(record.q_table[0].state, "mid_podium_good_good_medium_dry");
        assert_eq!(record.q_table[0].action, 0);

        let restored = RlDriver::from_record(&record, Some(1)).unwrap();
        assert_eq!(restored.to_record(), record);
        assert_eq!(restored.races_completed, agent.races_completed);
        assert_eq!(restored.exploration_rate, agent.exploration_rate);
    }

    #[test]
    fn unknown_schema_and_entries_are_rejected() {
        let mut record = trained_agent().to_record();
        record.schema_version = 2;
        assert_eq!(
            RlDriver::from_record(&record, None).unwrap_err(),
            PersistError::UnsupportedSchema {
                found: 2,
                expected: 1
            }
        );

        let mut record = trained_agent().to_record();
        record.q_table[0].action = 9;
        assert_eq!(
            RlDriver::from_record(&record, None).unwrap_err(),
            PersistError::InvalidAction(9)
        );

        let mut record = trained_agent().to_record();
        record.q_table[0].state = "mid_podium".to_owned();
        assert!(matches!(
            RlDriver::from_record(&record, None),
            Err(PersistError::InvalidStateKey(_))
        ));
    }
}
