pub mod generated_track;
pub mod layout;
