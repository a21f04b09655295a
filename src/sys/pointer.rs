use std::cell::Cell;
use std::rc::Rc;

use super::geometry::Point;

pub trait PointerState {
    fn current_position(&self) -> Point;
}

/// A pointer position shared between whoever observes pointer motion and the
/// reactor reading it.
#[derive(Debug, Clone, Default)]
pub struct SharedPointer(Rc<Cell<Point>>);

impl SharedPointer {
    pub fn new(position: Point) -> Self { SharedPointer(Rc::new(Cell::new(position))) }

    pub fn set(&self, position: Point) { self.0.set(position) }
}

impl PointerState for SharedPointer {
    fn current_position(&self) -> Point { self.0.get() }
}
