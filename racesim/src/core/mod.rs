pub mod car;
pub mod driver;
pub mod handle_race;
pub mod race;
pub mod state_handler;
pub mod tireset;
pub mod track;
pub mod weather;
