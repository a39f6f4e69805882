pub mod core;
pub mod post;

pub use crate::core::action::Action;
pub use crate::core::agent::{AgentPars, RaceOutcome, RlDriver, StepOutcome};
pub use crate::core::registry::AgentRegistry;
pub use crate::core::state::{RLState, StateKey};
pub use crate::core::training::train_in_race;
pub use crate::post::persistence::{AgentRecord, PersistError};
