use serde::{Deserialize, Serialize};

/// CSS reference pixels per point (96dpi / 72dpi).
pub const DEFAULT_PT_TO_PX: f64 = 96.0 / 72.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, by: Point) -> Point { Point::new(self.x + by.x, self.y + by.y) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

/// A rectangle in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self { Self { origin, size } }

    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(Point::new(x, y), Size::new(w, h))
    }

    /// Half-open containment, matching how a viewport treats its last pixel row.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < self.origin.x + self.size.width
            && p.y < self.origin.y + self.size.height
    }
}

/// A rectangle in percent of the layout container. Every node of a laid-out
/// tree carries one of these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentRect {
    pub const FULL: PercentRect = PercentRect { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };

    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Inclusive on all edges so a point on a shared border hits the first child.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let rx = x - self.left;
        let ry = y - self.top;
        rx >= 0.0 && ry >= 0.0 && rx <= self.width && ry <= self.height
    }

    /// Position of `(x, y)` normalized to this rectangle, `[0,1]²` when inside.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.left) / self.width, (y - self.top) / self.height)
    }
}

/// Parses a CSS length in `px` or `pt`. Other units are not understood.
pub fn parse_size(size: &str, pt_to_px: f64) -> Option<f64> {
    let size = size.trim();
    if let Some(px) = size.strip_suffix("px") {
        px.trim().parse().ok()
    } else if let Some(pt) = size.strip_suffix("pt") {
        pt.trim().parse::<f64>().ok().map(|v| v * pt_to_px)
    } else {
        None
    }
}
