use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategic action of the agent for the coming lap.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PushHard,
    ConserveTires,
    PitNow,
    NormalPace,
    DefendPosition,
    AttackAhead,
}

impl Action {
    /// All actions in the order of their indices.
    pub const ALL: [Action; 6] = [
        Action::PushHard,
        Action::ConserveTires,
        Action::PitNow,
        Action::NormalPace,
        Action::DefendPosition,
        Action::AttackAhead,
    ];

    pub fn index(self) -> usize {
        match self {
            Action::PushHard => 0,
            Action::ConserveTires => 1,
            Action::PitNow => 2,
            Action::NormalPace => 3,
            Action::DefendPosition => 4,
            Action::AttackAhead => 5,
        }
    }

    pub fn from_index(idx: usize) -> Option<Action> {
        Action::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::PushHard => "push_hard",
            Action::ConserveTires => "conserve_tires",
            Action::PitNow => "pit_now",
            Action::NormalPace => "normal_pace",
            Action::DefendPosition => "defend_position",
            Action::AttackAhead => "attack_ahead",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
