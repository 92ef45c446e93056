use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NodeKind {
    /// Children stacked top to bottom.
    Vertical,
    /// Children side by side.
    Horizontal,
    /// Children share one rectangle behind a tab strip.
    Stack,
    Element,
}

impl NodeKind {
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            NodeKind::Vertical => Some(Orientation::Vertical),
            NodeKind::Horizontal => Some(Orientation::Horizontal),
            NodeKind::Stack | NodeKind::Element => None,
        }
    }

    /// Whether a state of this kind can be a drop target.
    pub fn is_leaf_like(self) -> bool { matches!(self, NodeKind::Stack | NodeKind::Element) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DockMode {
    Above,
    Below,
    Before,
    After,
    On,
    Header,
    Window,
}

impl DockMode {
    /// Picks a mode from a position normalized to the hovered rectangle:
    /// outer thirds dock beside it, the center tabs onto it.
    pub fn from_relative(rx: f64, ry: f64) -> DockMode {
        if rx < 0.33333 {
            DockMode::Before
        } else if rx > 0.66666 {
            DockMode::After
        } else if ry < 0.33333 {
            DockMode::Above
        } else if ry > 0.66666 {
            DockMode::Below
        } else {
            DockMode::On
        }
    }

    /// Kind of the node a drop with this mode creates around the target.
    pub fn container_kind(self) -> Option<NodeKind> {
        match self {
            DockMode::Above | DockMode::Below => Some(NodeKind::Vertical),
            DockMode::Before | DockMode::After => Some(NodeKind::Horizontal),
            DockMode::On | DockMode::Header => Some(NodeKind::Stack),
            DockMode::Window => None,
        }
    }

    /// Whether the dropped node goes in front of the target.
    pub fn inserts_first(self) -> bool { matches!(self, DockMode::Above | DockMode::Before) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dock_mode_uses_thirds() {
        assert_eq!(DockMode::from_relative(0.1, 0.5), DockMode::Before);
        assert_eq!(DockMode::from_relative(0.9, 0.5), DockMode::After);
        assert_eq!(DockMode::from_relative(0.5, 0.1), DockMode::Above);
        assert_eq!(DockMode::from_relative(0.5, 0.9), DockMode::Below);
        assert_eq!(DockMode::from_relative(0.5, 0.5), DockMode::On);
        // Horizontal thirds win over vertical ones in the corners.
        assert_eq!(DockMode::from_relative(0.1, 0.1), DockMode::Before);
        assert_eq!(DockMode::from_relative(0.95, 0.95), DockMode::After);
    }

    #[test]
    fn dock_mode_is_total_on_unit_square() {
        for i in 0..=20 {
            for j in 0..=20 {
                let mode = DockMode::from_relative(i as f64 / 20.0, j as f64 / 20.0);
                assert!(matches!(
                    mode,
                    DockMode::Before | DockMode::After | DockMode::Above | DockMode::Below | DockMode::On
                ));
            }
        }
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("vertical".parse::<NodeKind>().unwrap(), NodeKind::Vertical);
        assert_eq!("Stack".parse::<NodeKind>().unwrap(), NodeKind::Stack);
        assert!("grid".parse::<NodeKind>().is_err());
        assert_eq!(NodeKind::Horizontal.to_string(), "horizontal");
        assert_eq!(serde_json::to_string(&NodeKind::Element).unwrap(), "\"element\"");
    }
}
