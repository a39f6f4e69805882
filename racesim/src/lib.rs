//! Lap-discrete race simulation: N drivers, tire wear and pit stops, weather, safety car periods,
//! incidents and overtakes on a track described by its metrics.

pub mod core;
pub mod interfaces;
pub mod post;
pub mod pre;

pub use crate::core::handle_race::handle_race;
pub use crate::core::race::{Race, RaceError, RacePars, SimConstants};
pub use crate::post::race_result::RaceResult;
