pub mod designer;
pub mod element;
pub mod metrics;
