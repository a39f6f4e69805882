use crate::core::element::{ElementKind, TrackElement};
use serde::{Deserialize, Serialize};

const ORIGIN: (f64, f64) = (400.0, 50.0);
const X_BOUNDS: (f64, f64) = (50.0, 750.0);
const Y_BOUNDS: (f64, f64) = (50.0, 550.0);
const STRAIGHT_SCALE: f64 = 5.0;
const CORNER_SCALE: f64 = 10.0;

/// Drawing direction in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Right,
    Down,
    Left,
    Up,
}

impl Heading {
    fn turned_left(self) -> Heading {
        match self {
            Heading::Right => Heading::Up,
            Heading::Down => Heading::Right,
            Heading::Left => Heading::Down,
            Heading::Up => Heading::Left,
        }
    }

    fn turned_right(self) -> Heading {
        match self {
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
            Heading::Up => Heading::Right,
        }
    }

    fn step(self, x: f64, y: f64, dist: f64) -> (f64, f64) {
        match self {
            Heading::Right => (x + dist, y),
            Heading::Down => (x, y + dist),
            Heading::Left => (x - dist, y),
            Heading::Up => (x, y - dist),
        }
    }
}

/// Track element with the 2D coordinates of its start point.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PositionedElement {
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub element: TrackElement,
}

/// position_elements walks the track from a fixed origin heading down. Straights advance by a
/// fifth of their length, corners turn by 90 deg and advance by a tenth of their length. The
/// position is clamped to the drawing area after every element.
pub fn position_elements(elements: &[TrackElement]) -> Vec<PositionedElement> {
    let (mut x, mut y) = ORIGIN;
    let mut heading = Heading::Down;
    let mut positioned = Vec::with_capacity(elements.len());

    for el in elements.iter() {
        positioned.push(PositionedElement {
            x,
            y,
            element: el.to_owned(),
        });

        let dist = match el.kind {
            ElementKind::Straight => el.length / STRAIGHT_SCALE,
            ElementKind::CornerLeft => {
                heading = heading.turned_left();
                el.length / CORNER_SCALE
            }
            ElementKind::CornerRight => {
                heading = heading.turned_right();
                el.length / CORNER_SCALE
            }
        };

        let (x_new, y_new) = heading.step(x, y, dist);
        x = x_new.clamp(X_BOUNDS.0, X_BOUNDS.1);
        y = y_new.clamp(Y_BOUNDS.0, Y_BOUNDS.1);
    }

    positioned
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn walk_turns_and_clamps() {
        let track = vec![
            TrackElement::straight(500.0),
            TrackElement::corner(ElementKind::CornerLeft, 200.0, 0.0),
            TrackElement::straight(2000.0),
            TrackElement::corner(ElementKind::CornerRight, 100.0, 0.0),
        ];
        let pos = position_elements(&track);

        assert_eq!(pos.len(), 4);
        assert_relative_eq!(pos[0].x, 400.0);
        assert_relative_eq!(pos[0].y, 50.0);
        // straight downwards
        assert_relative_eq!(pos[1].x, 400.0);
        assert_relative_eq!(pos[1].y, 150.0);
        // left turn while heading down points to the right
        assert_relative_eq!(pos[2].x, 420.0);
        assert_relative_eq!(pos[2].y, 150.0);
        // long straight is clamped at the right border
        assert_relative_eq!(pos[3].x, 750.0);
        assert_relative_eq!(pos[3].y, 150.0);
    }

    #[test]
    fn positioned_element_json_is_flat() {
        let pos = position_elements(&[TrackElement::straight(300.0)]);
        let json = serde_json::to_value(&pos[0]).unwrap();
        assert_eq!(json["x"], 400.0);
        assert_eq!(json["kind"], "straight");
        assert_eq!(json["length"], 300.0);
        assert_eq!(json["isDRS"], false);
    }
}
