use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WIDTH: f64 = 15.0;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    #[serde(rename = "straight")]
    Straight,
    #[serde(rename = "corner-left")]
    CornerLeft,
    #[serde(rename = "corner-right")]
    CornerRight,
}

impl ElementKind {
    pub fn is_corner(self) -> bool {
        !matches!(self, ElementKind::Straight)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementKind::Straight => write!(f, "straight"),
            ElementKind::CornerLeft => write!(f, "corner-left"),
            ElementKind::CornerRight => write!(f, "corner-right"),
        }
    }
}

/// * `kind` - Straight, left or right corner
/// * `length` - (m) Length of the element
/// * `banking` - (deg) Banking in [0, 25], only relevant for corners
/// * `elevation` - (m) Elevation in [-30, 30]
/// * `width` - (m) Track width
/// * `is_drs` - DRS zone flag, only set on straights
/// * `sector` - Sector number 1, 2 or 3 once the track is finalized
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrackElement {
    pub kind: ElementKind,
    pub length: f64,
    #[serde(default)]
    pub banking: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default, rename = "isDRS")]
    pub is_drs: bool,
    #[serde(default)]
    pub sector: Option<u8>,
}

fn default_width() -> f64 {
    DEFAULT_WIDTH
}

impl TrackElement {
    pub fn new(kind: ElementKind, length: f64, banking: f64, elevation: f64) -> TrackElement {
        TrackElement {
            kind,
            length,
            banking,
            elevation,
            width: DEFAULT_WIDTH,
            is_drs: false,
            sector: None,
        }
    }

    pub fn straight(length: f64) -> TrackElement {
        TrackElement::new(ElementKind::Straight, length, 0.0, 0.0)
    }

    pub fn corner(kind: ElementKind, length: f64, banking: f64) -> TrackElement {
        TrackElement::new(kind, length, banking, 0.0)
    }

    pub fn is_corner(&self) -> bool {
        self.kind.is_corner()
    }
}
