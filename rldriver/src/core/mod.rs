pub mod action;
pub mod agent;
pub mod registry;
pub mod state;
pub mod training;
