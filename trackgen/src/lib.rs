pub mod core;
pub mod post;
pub mod pre;

pub use crate::core::designer::{DesignerConfig, TargetMetric, TrackDesigner};
pub use crate::core::element::{ElementKind, TrackElement};
pub use crate::core::metrics::TrackMetrics;
pub use crate::post::generated_track::{generate_track, GeneratedTrack};
