use crate::layout_engine::graph::Orientation;
use crate::layout_engine::state::StateId;
use crate::sys::geometry::Point;

/// A splitter drag between two adjacent siblings, captured at press time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeState {
    /// Orientation of the split being resized.
    pub orientation: Orientation,
    pub prev: StateId,
    pub next: StateId,
    /// Pointer position along the axis, as a fraction of the container.
    pub start_value: f64,
    pub start_prev_weight: f64,
    pub start_next_weight: f64,
    /// Extents along the axis in percent of the container.
    pub start_prev_size: f64,
    pub start_next_size: f64,
}

impl ResizeState {
    pub fn axis_value(&self, pos: Point) -> f64 {
        match self.orientation {
            Orientation::Vertical => pos.y,
            Orientation::Horizontal => pos.x,
        }
    }

    /// New `(prev, next)` weights for a pointer at `pos` (fractions of the
    /// container).
    pub fn weights_at(&self, pos: Point, min_extent: f64) -> (f64, f64) {
        redistribute(
            self.start_prev_size,
            self.start_next_size,
            self.start_prev_weight + self.start_next_weight,
            self.axis_value(pos) - self.start_value,
            min_extent,
        )
    }
}

/// Moves `diff` (fraction of the container) of extent from `next` to `prev`
/// and converts the new extents back into weights with the same sum. Neither
/// extent drops below `min_extent`; the other side absorbs the difference.
pub fn redistribute(
    prev_size: f64,
    next_size: f64,
    weight_sum: f64,
    diff: f64,
    min_extent: f64,
) -> (f64, f64) {
    let total = prev_size + next_size;
    let mut prev = prev_size + 100.0 * diff;
    let mut next = next_size - 100.0 * diff;
    if prev < min_extent {
        prev = min_extent;
        next = total - prev;
    }
    if next < min_extent {
        next = min_extent;
        prev = total - next;
    }
    let next_weight = weight_sum / (prev / next + 1.0);
    (weight_sum - next_weight, next_weight)
}
