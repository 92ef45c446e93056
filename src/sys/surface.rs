//! The rendering seam. The engine never touches a real document; it drives a
//! [`Surface`] that owns the container and every element placed inside it.

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;
use crate::sys::geometry::{DEFAULT_PT_TO_PX, Point, Rect, Size};
use crate::sys::style::Placement;

slotmap::new_key_type! { pub struct ElementId; }

pub const CLASS_NO_EVENTS: &str = "noevents";
pub const CLASS_MOVING: &str = "moving";
pub const CLASS_DRAGGING: &str = "dragging";

/// Probe classes measured to find the splitter thickness and header height.
pub const SPLITTER_STYLE_CLASS: &str = "dock-splitter horizontal";
pub const HEADER_STYLE_CLASS: &str = "dock-element-header";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderSpec {
    pub title: String,
    pub closeable: bool,
}

/// Everything the host needs to build one panel: a container holding a
/// header (title plus optional close button) and the host's content.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelRequest {
    pub id: String,
    pub header: HeaderSpec,
    pub user_info: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TabSpec {
    pub id: String,
    pub header: HeaderSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementRole {
    /// Bar between two siblings of a split with the given orientation.
    Splitter(Orientation),
    /// Tab strip of a stack.
    TabHeader { tabs: Vec<TabSpec>, active: Option<String> },
    /// Translucent preview of where a drop would land.
    HoverBox,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub size: Size,
    pub scroll: Point,
}

impl Viewport {
    pub fn contains_client(&self, p: Point) -> bool {
        Rect::new(Point::default(), self.size).contains(p)
    }

    pub fn client_to_page(&self, p: Point) -> Point { p.offset(self.scroll) }
}

pub trait Surface {
    fn create_panel(&mut self, request: PanelRequest) -> ElementId;
    fn create_element(&mut self, role: ElementRole) -> ElementId;
    fn place(&mut self, element: ElementId, placement: Placement);
    fn set_visible(&mut self, element: ElementId, visible: bool);
    fn set_class(&mut self, element: ElementId, class: &str, on: bool);
    /// Moves the `active` marker of a tab strip to `tab`.
    fn set_active_tab(&mut self, header: ElementId, tab: &str);
    fn set_container_class(&mut self, class: &str, on: bool);
    fn remove(&mut self, element: ElementId);

    /// Bounds of the layout container in page coordinates.
    fn container_bounds(&self) -> Rect;
    fn viewport(&self) -> Viewport;
    fn computed_style(&self, class: &str, property: &str) -> Option<String>;
    fn pt_to_px(&self) -> f64 { DEFAULT_PT_TO_PX }
}
