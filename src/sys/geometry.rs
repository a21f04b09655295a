//! Plain screen-space geometry shared by the barrier detector and the
//! surface collaborators.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { origin: Point::new(x, y), width, height }
    }

    pub fn max_x(&self) -> f64 { self.origin.x + self.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.height }

    pub fn contains(&self, point: Point) -> bool {
        (self.origin.x..=self.max_x()).contains(&point.x)
            && (self.origin.y..=self.max_y()).contains(&point.y)
    }
}

/// Which way a segment runs. Barriers are only ever axis aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Segment {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self { Self { x1, y1, x2, y2 } }

    pub fn length(&self) -> f64 { f64::hypot(self.x2 - self.x1, self.y2 - self.y1) }

    /// Returns `None` for diagonal or zero-length segments.
    pub fn axis(&self) -> Option<Axis> {
        if self.length() <= 0.0 {
            return None;
        }
        if self.y1 == self.y2 {
            Some(Axis::Horizontal)
        } else if self.x1 == self.x2 {
            Some(Axis::Vertical)
        } else {
            None
        }
    }
}
