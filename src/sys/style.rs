use std::fmt;

use crate::sys::geometry::Point;

/// One CSS length as the engine emits it. Percentages are relative to the
/// layout container, so a window resize needs no recomputation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Percent(f64),
    /// `calc(percent% + px px)`; a negative `px` renders as a subtraction.
    Calc { percent: f64, px: f64 },
    Pixels(f64),
}

impl Length {
    pub fn offset(percent: f64, px: f64) -> Self {
        if px == 0.0 { Length::Percent(percent) } else { Length::Calc { percent, px } }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Length::Percent(p) => write!(f, "{p}%"),
            Length::Calc { percent, px } if px < 0.0 => write!(f, "calc({percent}% - {}px)", -px),
            Length::Calc { percent, px } => write!(f, "calc({percent}% + {px}px)"),
            Length::Pixels(px) => write!(f, "{px}px"),
        }
    }
}

/// Position and size of an element. `None` leaves the property untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Placement {
    pub left: Option<Length>,
    pub top: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
}

impl Placement {
    /// Percentage placement shifted by a pixel offset; the offset is taken
    /// off the extent so the far edge stays where the percentages put it.
    pub fn percent(
        x: Option<f64>,
        y: Option<f64>,
        w: Option<f64>,
        h: Option<f64>,
        offset: Point,
    ) -> Self {
        Self {
            left: x.map(|x| Length::offset(x, offset.x)),
            top: y.map(|y| Length::offset(y, offset.y)),
            width: w.map(|w| Length::offset(w, -offset.x)),
            height: h.map(|h| Length::offset(h, -offset.y)),
        }
    }

    pub fn pinned(at: Point) -> Self {
        Self {
            left: Some(Length::Pixels(at.x)),
            top: Some(Length::Pixels(at.y)),
            width: None,
            height: None,
        }
    }

    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        [("left", self.left), ("top", self.top), ("width", self.width), ("height", self.height)]
            .into_iter()
            .filter_map(|(name, len)| len.map(|len| (name, len.to_string())))
            .collect()
    }

    pub fn to_css(&self) -> String {
        self.declarations()
            .into_iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
