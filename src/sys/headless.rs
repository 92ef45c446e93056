use slotmap::SlotMap;

use crate::common::collections::{BTreeSet, HashMap};
use crate::sys::geometry::{DEFAULT_PT_TO_PX, Point, Rect, Size};
use crate::sys::style::Placement;
use crate::sys::surface::{
    ElementId, ElementRole, HEADER_STYLE_CLASS, PanelRequest, SPLITTER_STYLE_CLASS, Surface,
    Viewport,
};

#[derive(Clone, Debug, PartialEq)]
pub enum HeadlessRole {
    Panel(PanelRequest),
    Other(ElementRole),
}

#[derive(Clone, Debug)]
pub struct HeadlessElement {
    pub role: HeadlessRole,
    pub placement: Placement,
    pub visible: bool,
    pub classes: BTreeSet<String>,
    pub active_tab: Option<String>,
}

impl HeadlessElement {
    pub fn panel_id(&self) -> Option<&str> {
        match &self.role {
            HeadlessRole::Panel(request) => Some(&request.id),
            HeadlessRole::Other(_) => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool { self.classes.contains(class) }
}

/// A [`Surface`] that keeps every element in memory. Used by the developer
/// CLI and throughout the tests.
pub struct HeadlessSurface {
    elements: SlotMap<ElementId, HeadlessElement>,
    container: Rect,
    viewport: Viewport,
    container_classes: BTreeSet<String>,
    styles: HashMap<(String, String), String>,
    pt_to_px: f64,
    created: Vec<String>,
}

impl HeadlessSurface {
    pub fn new(size: Size) -> Self {
        let mut styles = HashMap::default();
        styles.insert((SPLITTER_STYLE_CLASS.to_string(), "height".to_string()), "4px".to_string());
        styles.insert((HEADER_STYLE_CLASS.to_string(), "height".to_string()), "15pt".to_string());
        Self {
            elements: SlotMap::with_key(),
            container: Rect::new(Point::default(), size),
            viewport: Viewport { size, scroll: Point::default() },
            container_classes: BTreeSet::new(),
            styles,
            pt_to_px: DEFAULT_PT_TO_PX,
            created: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: Rect) -> Self {
        self.container = container;
        self
    }

    pub fn set_style(&mut self, class: &str, property: &str, value: &str) {
        self.styles.insert((class.to_string(), property.to_string()), value.to_string());
    }

    pub fn set_scroll(&mut self, scroll: Point) { self.viewport.scroll = scroll; }

    pub fn element(&self, id: ElementId) -> Option<&HeadlessElement> { self.elements.get(id) }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &HeadlessElement)> {
        self.elements.iter()
    }

    pub fn panel(&self, id: &str) -> Option<(ElementId, &HeadlessElement)> {
        self.elements.iter().find(|(_, e)| e.panel_id() == Some(id))
    }

    /// Ids of the panels currently shown, in creation order.
    pub fn visible_panels(&self) -> Vec<String> {
        self.elements
            .values()
            .filter(|e| e.visible)
            .filter_map(|e| e.panel_id().map(str::to_string))
            .collect()
    }

    pub fn splitters(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| matches!(e.role, HeadlessRole::Other(ElementRole::Splitter(_))))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn tab_headers(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| matches!(e.role, HeadlessRole::Other(ElementRole::TabHeader { .. })))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn hover_box(&self) -> Option<&HeadlessElement> {
        self.elements
            .values()
            .find(|e| matches!(e.role, HeadlessRole::Other(ElementRole::HoverBox)))
    }

    /// Panel ids in the order the factory was asked to build them.
    pub fn created_panels(&self) -> &[String] { &self.created }

    pub fn has_container_class(&self, class: &str) -> bool {
        self.container_classes.contains(class)
    }
}

impl Surface for HeadlessSurface {
    fn create_panel(&mut self, request: PanelRequest) -> ElementId {
        self.created.push(request.id.clone());
        self.elements.insert(HeadlessElement {
            role: HeadlessRole::Panel(request),
            placement: Placement::default(),
            visible: true,
            classes: BTreeSet::new(),
            active_tab: None,
        })
    }

    fn create_element(&mut self, role: ElementRole) -> ElementId {
        let active_tab = match &role {
            ElementRole::TabHeader { active, .. } => active.clone(),
            _ => None,
        };
        let visible = !matches!(role, ElementRole::HoverBox);
        self.elements.insert(HeadlessElement {
            role: HeadlessRole::Other(role),
            placement: Placement::default(),
            visible,
            classes: BTreeSet::new(),
            active_tab,
        })
    }

    fn place(&mut self, element: ElementId, placement: Placement) {
        let Some(e) = self.elements.get_mut(element) else { return };
        let p = &mut e.placement;
        p.left = placement.left.or(p.left);
        p.top = placement.top.or(p.top);
        p.width = placement.width.or(p.width);
        p.height = placement.height.or(p.height);
    }

    fn set_visible(&mut self, element: ElementId, visible: bool) {
        if let Some(e) = self.elements.get_mut(element) {
            e.visible = visible;
        }
    }

    fn set_class(&mut self, element: ElementId, class: &str, on: bool) {
        if let Some(e) = self.elements.get_mut(element) {
            if on {
                e.classes.insert(class.to_string());
            } else {
                e.classes.remove(class);
            }
        }
    }

    fn set_active_tab(&mut self, header: ElementId, tab: &str) {
        if let Some(e) = self.elements.get_mut(header) {
            e.active_tab = Some(tab.to_string());
        }
    }

    fn set_container_class(&mut self, class: &str, on: bool) {
        if on {
            self.container_classes.insert(class.to_string());
        } else {
            self.container_classes.remove(class);
        }
    }

    fn remove(&mut self, element: ElementId) { self.elements.remove(element); }

    fn container_bounds(&self) -> Rect { self.container }

    fn viewport(&self) -> Viewport { self.viewport }

    fn computed_style(&self, class: &str, property: &str) -> Option<String> {
        self.styles.get(&(class.to_string(), property.to_string())).cloned()
    }

    fn pt_to_px(&self) -> f64 { self.pt_to_px }
}
