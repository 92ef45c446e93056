use tracing::{debug, instrument, trace, warn};

use crate::common::config::Settings;
use crate::common::log::trace_pointer;
use crate::layout_engine::drag::{DragOrigin, DragState, DropOutcome, DropTarget, dock, hover_placement};
use crate::layout_engine::graph::{DockMode, NodeKind, Orientation};
use crate::layout_engine::node::{
    DockLayoutConfig, DockNodeConfig, has_bottom_root_split, has_left_root_split,
    has_right_root_split, has_top_root_split,
};
use crate::layout_engine::resize::ResizeState;
use crate::layout_engine::state::{ElementPool, LayoutPass, NodeGeometry, Splitter, StateId, StateTree};
use crate::sys::geometry::{PercentRect, Point, parse_size};
use crate::sys::style::Placement;
use crate::sys::surface::{
    CLASS_DRAGGING, CLASS_MOVING, CLASS_NO_EVENTS, ElementId, ElementRole, HEADER_STYLE_CLASS,
    SPLITTER_STYLE_CLASS, Surface,
};

/// Sizes and thresholds resolved once per layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub splitter_size: f64,
    pub header_size: f64,
    pub drag_threshold: f64,
    pub special_dock_size: f64,
    pub min_resize_extent: f64,
}

impl Metrics {
    /// Takes splitter and header sizes from the settings when set, otherwise
    /// from the surface's computed styles.
    pub fn measure<S: Surface>(surface: &S, settings: &Settings) -> Self {
        let measured = |class: &str| {
            surface
                .computed_style(class, "height")
                .and_then(|v| parse_size(&v, surface.pt_to_px()))
                .unwrap_or(0.0)
        };
        Self {
            splitter_size: settings.splitter_size.unwrap_or_else(|| measured(SPLITTER_STYLE_CLASS)),
            header_size: settings.header_size.unwrap_or_else(|| measured(HEADER_STYLE_CLASS)),
            drag_threshold: settings.drag_threshold,
            special_dock_size: settings.special_dock_size,
            min_resize_extent: settings.min_resize_extent,
        }
    }
}

/// One layout root: its config, the state tree mirroring it, the elements
/// the tree created, and whatever resize or drag is in progress.
pub struct DockState<S: Surface> {
    surface: S,
    config: DockLayoutConfig,
    tree: StateTree,
    pool: ElementPool,
    splitters: Vec<Splitter>,
    resize: Option<ResizeState>,
    drag: Option<DragState>,
    last_move: Option<Point>,
    metrics: Metrics,
    detachable_root: bool,
    pending_changes: usize,
}

impl<S: Surface> DockState<S> {
    pub fn new(surface: S, config: DockLayoutConfig, metrics: Metrics) -> Self {
        let tree = StateTree::from_config(config.content.as_ref());
        let mut state = Self {
            surface,
            config,
            tree,
            pool: ElementPool::default(),
            splitters: Vec::new(),
            resize: None,
            drag: None,
            last_move: None,
            metrics,
            detachable_root: false,
            pending_changes: 0,
        };
        state.update_layout(false);
        state
    }

    pub fn surface(&self) -> &S { &self.surface }

    pub fn surface_mut(&mut self) -> &mut S { &mut self.surface }

    pub fn config(&self) -> &DockLayoutConfig { &self.config }

    pub fn tree(&self) -> &StateTree { &self.tree }

    pub fn metrics(&self) -> Metrics { self.metrics }

    pub fn splitters(&self) -> &[Splitter] { &self.splitters }

    pub fn drag(&self) -> Option<&DragState> { self.drag.as_ref() }

    pub fn resize(&self) -> Option<&ResizeState> { self.resize.as_ref() }

    /// Lets the root panel be dragged, which only makes sense in a popout.
    pub fn set_detachable_root(&mut self, detachable: bool) { self.detachable_root = detachable; }

    /// Number of layout changes raised since the last call.
    pub fn take_changes(&mut self) -> usize { std::mem::take(&mut self.pending_changes) }

    /// The node this layout is dragging out, once it has left the tree.
    pub fn outgoing_drag(&self) -> Option<(DockNodeConfig, bool)> {
        let drag = self.drag.as_ref()?;
        if !drag.is_removed || drag.is_remote() {
            return None;
        }
        Some((self.tree.config_of(drag.node)?, drag.close_original))
    }

    pub fn update_layout(&mut self, raise: bool) {
        for splitter in self.splitters.drain(..) {
            self.surface.remove(splitter.element);
        }
        if let Some(root) = self.tree.root() {
            let mut pass = LayoutPass {
                surface: &mut self.surface,
                pool: &mut self.pool,
                splitters: &mut self.splitters,
                splitter_size: self.metrics.splitter_size,
            };
            self.tree.layout(root, PercentRect::FULL, Point::default(), &mut pass);
        }
        if let Some(resize) = self.resize {
            if let Some(splitter) = self.splitter_between(resize.prev, resize.next) {
                self.surface.set_class(splitter, CLASS_DRAGGING, true);
            }
        }
        if raise {
            self.pending_changes += 1;
        }
    }

    /// Replaces the whole tree with one built from `config`.
    pub fn update_config(&mut self, config: DockLayoutConfig, raise: bool) {
        if let Some(root) = self.tree.root() {
            self.tree.kill(root, &mut self.surface, &mut self.pool);
        }
        self.config = config;
        if let Some(content) = &self.config.content {
            let root = self.tree.attach(content, None);
            self.tree.set_root(Some(root));
        }
        self.update_layout(raise);
        self.pool.purge_unused(&mut self.surface);
    }

    fn sync_config(&mut self) { self.config.content = self.tree.content(); }

    /// Page coordinates to fractions of the container, clamped to `[0,1]`.
    pub fn make_relative(&self, page: Point) -> Point {
        let bounds = self.surface.container_bounds();
        let rel = |v: f64, origin: f64, extent: f64| {
            if extent > 0.0 { ((v - origin) / extent).clamp(0.0, 1.0) } else { 0.0 }
        };
        Point::new(
            rel(page.x, bounds.origin.x, bounds.size.width),
            rel(page.y, bounds.origin.y, bounds.size.height),
        )
    }

    fn splitter_between(&self, prev: StateId, next: StateId) -> Option<ElementId> {
        self.splitters.iter().find(|s| s.prev == prev && s.next == next).map(|s| s.element)
    }

    fn clear_transients(&mut self) {
        if self.drag.is_some() || self.resize.is_some() {
            debug!("clearing stale drag or resize");
            self.end_drag(true);
        }
    }

    /// Panels on either side of a splitter. Unlike state ids they survive the
    /// tree being rebuilt.
    fn splitter_neighbours(&self, splitter: ElementId) -> Option<(String, String)> {
        let s = self.splitters.iter().find(|s| s.element == splitter)?;
        let prev = self.tree.config_of(s.prev)?;
        let next = self.tree.config_of(s.next)?;
        Some((prev.panel_ids().last()?.to_string(), next.panel_ids().first()?.to_string()))
    }

    fn splitter_around(&self, prev: &str, next: &str) -> Option<ElementId> {
        let holds = |id: StateId, panel: &str| {
            self.tree.config_of(id).is_some_and(|c| c.panel_ids().contains(&panel))
        };
        self.splitters.iter().find(|s| holds(s.prev, prev) && holds(s.next, next)).map(|s| s.element)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn start_resize(&mut self, splitter: ElementId, page: Point) -> bool {
        let splitter = if self.drag.is_some() || self.resize.is_some() {
            // Restoring a stale drag rebuilds every splitter.
            let neighbours = self.splitter_neighbours(splitter);
            self.clear_transients();
            match neighbours.and_then(|(prev, next)| self.splitter_around(&prev, &next)) {
                Some(rebuilt) => rebuilt,
                None => {
                    debug!("pressed splitter is gone after clearing the stale drag");
                    return false;
                }
            }
        } else {
            splitter
        };
        let Some(s) = self.splitters.iter().find(|s| s.element == splitter).copied() else {
            warn!("press on an unknown splitter");
            return false;
        };
        let (Some(prev), Some(next)) = (self.tree.get(s.prev), self.tree.get(s.next)) else {
            return false;
        };
        let (Some(prev_geom), Some(next_geom)) = (prev.geometry, next.geometry) else {
            return false;
        };
        let extent = |g: NodeGeometry| match s.orientation {
            Orientation::Vertical => g.rect.height,
            Orientation::Horizontal => g.rect.width,
        };
        let mut resize = ResizeState {
            orientation: s.orientation,
            prev: s.prev,
            next: s.next,
            start_value: 0.0,
            start_prev_weight: prev.config.weight,
            start_next_weight: next.config.weight,
            start_prev_size: extent(prev_geom),
            start_next_size: extent(next_geom),
        };
        resize.start_value = resize.axis_value(self.make_relative(page));
        self.surface.set_container_class(CLASS_NO_EVENTS, true);
        self.surface.set_class(splitter, CLASS_DRAGGING, true);
        self.resize = Some(resize);
        true
    }

    fn update_resize(&mut self, pos: Point) {
        let Some(resize) = self.resize else { return };
        if !(self.tree.contains(resize.prev) && self.tree.contains(resize.next)) {
            self.resize = None;
            return;
        }
        let (prev_weight, next_weight) = resize.weights_at(pos, self.metrics.min_resize_extent);
        trace!(prev_weight, next_weight, "resize");
        if let Some(prev) = self.tree.get_mut(resize.prev) {
            prev.config.weight = prev_weight;
        }
        if let Some(next) = self.tree.get_mut(resize.next) {
            next.config.weight = next_weight;
        }
        self.sync_config();
        self.update_layout(false);
    }

    fn stop_resize(&mut self) {
        let Some(resize) = self.resize.take() else { return };
        if let Some(splitter) = self.splitter_between(resize.prev, resize.next) {
            self.surface.set_class(splitter, CLASS_DRAGGING, false);
        }
        self.pending_changes += 1;
    }

    /// Arms a drag for `panel` from a header press at `page`. It turns into
    /// a real drag once the pointer travels past the threshold.
    #[instrument(level = "debug", skip(self))]
    pub fn start_drag(&mut self, panel: &str, page: Point) -> bool {
        self.clear_transients();
        let Some(node) = self.tree.find_panel(panel) else {
            warn!(panel, "press on a panel that is not in the layout");
            return false;
        };
        let is_root = self.tree.get(node).is_some_and(|n| n.parent.is_none());
        if is_root && !self.detachable_root {
            return false;
        }
        self.drag = Some(DragState::pending(node, page, is_root));
        self.surface.set_container_class(CLASS_NO_EVENTS, true);
        true
    }

    /// Feeds a pointer position in client coordinates. Returns whether a
    /// resize or drag consumed it.
    pub fn update(&mut self, client: Point) -> bool {
        trace_pointer("move", client.x, client.y);
        let viewport = self.surface.viewport();
        let page = viewport.client_to_page(client);

        if !viewport.contains_client(client) {
            let Some(drag) = self.drag.as_ref() else { return self.resize.is_some() };
            if !drag.is_removed && page.distance_to(drag.start) > self.metrics.drag_threshold {
                self.detach_dragged();
            }
            let Some(drag) = self.drag.as_mut() else { return false };
            if drag.is_removed {
                drag.mode = Some(DockMode::Window);
                drag.target = None;
                let node = drag.node;
                if let Some(hover) = drag.hover {
                    self.surface.set_visible(hover, false);
                }
                self.unpin(node);
                self.set_subtree_visible(node, false);
            }
            return true;
        }

        self.last_move = Some(client);
        let pos = self.make_relative(page);
        if self.resize.is_some() {
            self.update_resize(pos);
            return true;
        }
        let Some(drag) = self.drag.as_ref() else { return false };
        if !drag.is_removed {
            if page.distance_to(drag.start) <= self.metrics.drag_threshold {
                return true;
            }
            self.detach_dragged();
        }
        self.ensure_hover();

        let resolved = self.resolve_target(pos);
        let Some(drag) = self.drag.as_mut() else { return false };
        let (node, hover) = (drag.node, drag.hover);
        match resolved {
            Some((target, mode)) => {
                drag.target = Some(target);
                drag.mode = Some(mode);
                let rect = match target {
                    DropTarget::Node(id) => self.tree.get(id).and_then(|n| n.geometry).map(|g| g.rect),
                    DropTarget::EmptyRoot => Some(PercentRect::FULL),
                };
                if let (Some(hover), Some(rect)) = (hover, rect) {
                    self.surface.place(hover, hover_placement(rect, mode, self.metrics.header_size));
                    self.surface.set_visible(hover, true);
                }
            }
            None => {
                drag.target = None;
                drag.mode = None;
                if let Some(hover) = hover {
                    self.surface.set_visible(hover, false);
                }
            }
        }
        self.pin(node, client);
        true
    }

    /// Takes the dragged node out of the tree, remembering the layout as it
    /// was so a failed drop can put it back.
    fn detach_dragged(&mut self) {
        let Some(drag) = self.drag.as_mut() else { return };
        if drag.is_removed {
            return;
        }
        let snapshot = self.config.clone();
        drag.detached = self.tree.remove(drag.node, &mut self.surface, &mut self.pool);
        drag.is_removed = true;
        drag.origin = DragOrigin::Local { snapshot: Some(snapshot) };
        debug!("drag started");
        self.sync_config();
        let config = self.config.clone();
        self.update_config(config, false);
    }

    fn ensure_hover(&mut self) {
        let Some(drag) = self.drag.as_mut() else { return };
        if drag.hover.is_none() {
            let hover = self.surface.create_element(ElementRole::HoverBox);
            self.surface.set_visible(hover, false);
            drag.hover = Some(hover);
        }
    }

    fn resolve_target(&self, pos: Point) -> Option<(DropTarget, DockMode)> {
        let Some(root) = self.tree.root() else {
            return Some((DropTarget::EmptyRoot, DockMode::On));
        };
        let (x, y) = (100.0 * pos.x, 100.0 * pos.y);
        let under = self.tree.get_element_at(x, y)?;

        if let Some(local) = self.client_position(under, pos) {
            if local.y >= 0.0 && local.y < self.metrics.header_size {
                return Some((DropTarget::Node(under), DockMode::Header));
            }
        }

        if let Some(content) = &self.config.content {
            let edge = self.config.special_dock_size.unwrap_or(self.metrics.special_dock_size);
            if (pos.x < edge && has_left_root_split(content))
                || (pos.x > 1.0 - edge && has_right_root_split(content))
                || (pos.y < edge && has_top_root_split(content))
                || (pos.y > 1.0 - edge && has_bottom_root_split(content))
            {
                return Some((DropTarget::Node(root), DockMode::from_relative(pos.x, pos.y)));
            }
        }

        let rect = self.tree.get(under)?.geometry?.rect;
        let (rx, ry) = rect.normalize(x, y);
        Some((DropTarget::Node(under), DockMode::from_relative(rx, ry)))
    }

    /// Pointer position in pixels relative to the top-left corner of the
    /// element shown for `id`. Stacks answer for their active tab.
    pub fn client_position(&self, id: StateId, pos: Point) -> Option<Point> {
        let node = self.tree.get(id)?;
        if node.kind() == NodeKind::Stack {
            return self.client_position(self.tree.active_child(id)?, pos);
        }
        node.element?;
        let NodeGeometry { rect, offset } = node.geometry?;
        let size = self.surface.container_bounds().size;
        Some(Point::new(
            (100.0 * pos.x - rect.left) / 100.0 * size.width - offset.x,
            (100.0 * pos.y - rect.top) / 100.0 * size.height - offset.y,
        ))
    }

    fn pin(&mut self, node: StateId, at: Point) {
        let Some(element) = self.tree.get(node).and_then(|n| n.element) else { return };
        self.surface.set_class(element, CLASS_MOVING, true);
        self.surface.set_visible(element, true);
        self.surface.place(element, Placement::pinned(at));
    }

    fn unpin(&mut self, node: StateId) {
        if let Some(element) = self.tree.get(node).and_then(|n| n.element) {
            self.surface.set_class(element, CLASS_MOVING, false);
        }
    }

    fn set_subtree_visible(&mut self, node: StateId, visible: bool) {
        for element in self.tree.subtree_elements(node) {
            self.surface.set_visible(element, visible);
        }
    }

    /// Pointer release in client coordinates. A drop onto a target is
    /// committed here; pop-outs and abandoned drops stay pending until
    /// [`DockState::end_drag`].
    #[instrument(level = "debug", skip(self))]
    pub fn release(&mut self, at: Point) -> DropOutcome {
        self.surface.set_container_class(CLASS_NO_EVENTS, false);
        self.last_move = None;
        if self.resize.is_some() {
            self.stop_resize();
            return DropOutcome::Resized;
        }
        let Some(drag) = self.drag.as_mut() else { return DropOutcome::Idle };
        if let Some(hover) = drag.hover.take() {
            self.surface.remove(hover);
        }

        if !drag.is_removed {
            let node = drag.node;
            self.drag = None;
            let Some(panel) = self.tree.get(node).and_then(|n| n.panel_id()).map(str::to_string) else {
                return DropOutcome::Idle;
            };
            self.activate_tab(&panel);
            return DropOutcome::Clicked(panel);
        }

        match (drag.target, drag.mode) {
            (_, Some(DockMode::Window)) => match self.tree.config_of(drag.node) {
                Some(node) => DropOutcome::PopOut { node, at },
                None => DropOutcome::Abandoned,
            },
            (Some(target), Some(mode)) => {
                let Some(drag) = self.drag.take() else { return DropOutcome::Idle };
                if self.stop_drag(&drag, target, mode) {
                    DropOutcome::Docked
                } else {
                    self.drag = Some(drag);
                    DropOutcome::Abandoned
                }
            }
            _ => DropOutcome::Abandoned,
        }
    }

    fn stop_drag(&mut self, drag: &DragState, target: DropTarget, mode: DockMode) -> bool {
        let path = match target {
            DropTarget::Node(id) => match self.tree.path_of(id) {
                Some(path) => path,
                None => return false,
            },
            DropTarget::EmptyRoot => Vec::new(),
        };
        let Some(insert) = self.tree.config_of(drag.node) else { return false };
        let mut content = self.config.content.clone();
        if !dock(&mut content, &path, insert, mode) {
            warn!(%mode, "drop rejected");
            return false;
        }
        debug!(%mode, "docked");
        self.unpin(drag.node);
        let mut config = self.config.clone();
        config.content = content;
        self.update_config(config, true);
        if let Some(detached) = drag.detached {
            self.tree.discard(detached, &mut self.surface);
        }
        true
    }

    /// Ends whatever drag or resize is in progress. A node this layout took
    /// out goes back where it was when `restore` is set; otherwise its
    /// removal is committed and reported as a layout change.
    pub fn end_drag(&mut self, restore: bool) {
        self.surface.set_container_class(CLASS_NO_EVENTS, false);
        self.last_move = None;
        self.resize = None;
        let Some(drag) = self.drag.take() else { return };
        if let Some(hover) = drag.hover {
            self.surface.remove(hover);
        }
        if !drag.is_removed {
            return;
        }
        self.unpin(drag.node);
        if let Some(detached) = drag.detached {
            self.tree.kill(detached, &mut self.surface, &mut self.pool);
        }
        match drag.origin {
            DragOrigin::Local { snapshot: Some(snapshot) } if restore => {
                debug!("restoring layout after failed drop");
                self.update_config(snapshot, false);
            }
            DragOrigin::Local { .. } => {
                self.pool.purge_unused(&mut self.surface);
                self.pending_changes += 1;
            }
            DragOrigin::Remote => self.pool.purge_unused(&mut self.surface),
        }
    }

    /// Starts showing a drag of `node` that began in another window. The
    /// stand-in is built off-tree and only joins the layout on a drop here.
    pub fn adopt_drag(&mut self, node: &DockNodeConfig, close_original: bool) {
        self.clear_transients();
        let shadow = self.tree.attach(node, None);
        let mut splitters = Vec::new();
        let mut pass = LayoutPass {
            surface: &mut self.surface,
            pool: &mut self.pool,
            splitters: &mut splitters,
            splitter_size: self.metrics.splitter_size,
        };
        self.tree.layout(shadow, PercentRect::new(0.0, 0.0, 50.0, 50.0), Point::default(), &mut pass);
        for splitter in splitters {
            self.surface.remove(splitter.element);
        }
        self.set_subtree_visible(shadow, false);
        self.drag = Some(DragState::adopted(shadow, close_original));
    }

    /// Hides drag affordances while the pointer is over another window. The
    /// drag itself survives; a resize ends.
    pub fn hide_drag_and_resize(&mut self) {
        self.surface.set_container_class(CLASS_NO_EVENTS, false);
        self.last_move = None;
        self.stop_resize();
        let Some(drag) = self.drag.as_mut() else { return };
        drag.target = None;
        drag.mode = None;
        let (node, removed) = (drag.node, drag.is_removed);
        if let Some(hover) = drag.hover.take() {
            self.surface.remove(hover);
        }
        if removed {
            self.set_subtree_visible(node, false);
        }
    }

    /// Re-evaluates the last pointer position after the page scrolled.
    pub fn scroll_changed(&mut self) -> bool {
        match self.last_move {
            Some(at) => self.update(at),
            None => false,
        }
    }

    /// Shows `panel` in its stack.
    pub fn activate_tab(&mut self, panel: &str) -> bool {
        let Some(id) = self.tree.find_panel(panel) else { return false };
        let Some(stack) = self.tree.get(id).and_then(|n| n.parent) else { return false };
        let Some(stack_node) = self.tree.get(stack) else { return false };
        if stack_node.kind() != NodeKind::Stack {
            return false;
        }
        let previous = self.tree.active_child(stack);
        if previous == Some(id) {
            return false;
        }
        let header = stack_node.element;
        if let Some(node) = self.tree.get_mut(stack) {
            node.config.active_tab_id = Some(panel.to_string());
        }
        if let Some(header) = header {
            self.surface.set_active_tab(header, panel);
        }
        if let Some(element) = previous.and_then(|p| self.tree.get(p)).and_then(|n| n.element) {
            self.surface.set_visible(element, false);
        }
        if let Some(element) = self.tree.get(id).and_then(|n| n.element) {
            self.surface.set_visible(element, true);
        }
        self.sync_config();
        self.pending_changes += 1;
        true
    }

    /// Removes a closeable panel from the layout.
    pub fn close_panel(&mut self, panel: &str) -> bool {
        self.clear_transients();
        let Some(id) = self.tree.find_panel(panel) else { return false };
        if !self.tree.get(id).is_some_and(|n| n.config.is_closeable) {
            warn!(panel, "close requested for a panel that is not closeable");
            return false;
        }
        let Some(detached) = self.tree.remove(id, &mut self.surface, &mut self.pool) else {
            return false;
        };
        self.tree.kill(detached, &mut self.surface, &mut self.pool);
        self.sync_config();
        let config = self.config.clone();
        self.update_config(config, true);
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::geometry::{Rect, Size};
    use crate::sys::headless::HeadlessSurface;

    fn el(id: &str) -> DockNodeConfig { DockNodeConfig::element(id) }

    fn state(content: DockNodeConfig) -> DockState<HeadlessSurface> {
        let surface = HeadlessSurface::new(Size::new(1000.0, 1000.0));
        let mut settings = Settings::default();
        settings.header_size = Some(20.0);
        let metrics = Metrics::measure(&surface, &settings);
        DockState::new(surface, DockLayoutConfig::new(content), metrics)
    }

    fn drag_to(state: &mut DockState<HeadlessSurface>, panel: &str, from: Point, to: Point) {
        assert!(state.start_drag(panel, from));
        state.update(to);
    }

    #[test]
    fn metrics_prefer_settings_over_measured_styles() {
        let surface = HeadlessSurface::new(Size::new(100.0, 100.0));
        let m = Metrics::measure(&surface, &Settings::default());
        assert_eq!(m.splitter_size, 4.0);
        assert_eq!(m.header_size, 20.0);
        let settings = Settings { splitter_size: Some(6.0), ..Settings::default() };
        assert_eq!(Metrics::measure(&surface, &settings).splitter_size, 6.0);
    }

    #[test]
    fn metrics_read_host_styles() {
        let mut surface = HeadlessSurface::new(Size::new(100.0, 100.0));
        surface.set_style(SPLITTER_STYLE_CLASS, "height", "6px");
        surface.set_style(HEADER_STYLE_CLASS, "height", "12pt");
        let m = Metrics::measure(&surface, &Settings::default());
        assert_eq!(m.splitter_size, 6.0);
        assert_eq!(m.header_size, 16.0);
    }

    #[test]
    fn offset_container_measures_from_its_own_corner() {
        let surface = HeadlessSurface::new(Size::new(1000.0, 1000.0))
            .with_container(Rect::new(Point::new(100.0, 100.0), Size::new(800.0, 800.0)));
        let settings = Settings { header_size: Some(20.0), ..Settings::default() };
        let metrics = Metrics::measure(&surface, &settings);
        let content = DockNodeConfig::horizontal(vec![el("a"), el("b"), el("c")]);
        let mut s = DockState::new(surface, DockLayoutConfig::new(content), metrics);
        assert_eq!(s.make_relative(Point::new(500.0, 500.0)), Point::new(0.5, 0.5));
        assert_eq!(s.make_relative(Point::new(50.0, 950.0)), Point::new(0.0, 1.0));

        // 10px below the top of c, which fills the right half once a is out.
        let at = Point::new(700.0, 110.0);
        drag_to(&mut s, "a", Point::new(150.0, 105.0), at);
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Header));
        let c = s.tree().find_panel("c").unwrap();
        let local = s.client_position(c, s.make_relative(at)).unwrap();
        assert!((local.y - 10.0).abs() < 1e-6, "{local:?}");
        assert!((local.x - 200.0 + s.metrics().splitter_size).abs() < 1e-6, "{local:?}");
    }

    #[test]
    fn make_relative_clamps() {
        let s = state(el("a"));
        assert_eq!(s.make_relative(Point::new(250.0, 500.0)), Point::new(0.25, 0.5));
        assert_eq!(s.make_relative(Point::new(-50.0, 1500.0)), Point::new(0.0, 1.0));
    }

    #[test]
    fn resize_updates_live_and_notifies_once() {
        let mut s = state(DockNodeConfig::vertical(vec![el("a"), el("b")]));
        let splitter = s.splitters()[0].element;
        assert!(s.start_resize(splitter, Point::new(500.0, 500.0)));
        assert!(s.surface().has_container_class(CLASS_NO_EVENTS));

        for y in [550.0, 650.0, 750.0] {
            assert!(s.update(Point::new(500.0, y)));
        }
        assert_eq!(s.take_changes(), 0);
        let splitter = s.splitters()[0].element;
        assert!(s.surface().element(splitter).unwrap().has_class(CLASS_DRAGGING));

        assert_eq!(s.release(Point::new(500.0, 750.0)), DropOutcome::Resized);
        assert_eq!(s.take_changes(), 1);
        assert!(!s.surface().has_container_class(CLASS_NO_EVENTS));
        let weights: Vec<f64> =
            s.config().content.as_ref().unwrap().children.iter().map(|c| c.weight).collect();
        assert!((weights[0] - 1.5).abs() < 1e-9 && (weights[1] - 0.5).abs() < 1e-9, "{weights:?}");
    }

    #[test]
    fn resize_upwards_by_a_sixth() {
        let mut s = state(DockNodeConfig::vertical(vec![el("a"), el("b")]));
        let splitter = s.splitters()[0].element;
        s.start_resize(splitter, Point::new(500.0, 500.0));
        s.update(Point::new(500.0, 500.0 - 1000.0 / 6.0));
        s.release(Point::new(500.0, 500.0 - 1000.0 / 6.0));
        let weights: Vec<f64> =
            s.config().content.as_ref().unwrap().children.iter().map(|c| c.weight).collect();
        assert!((weights[0] - 2.0 / 3.0).abs() < 1e-6, "{weights:?}");
        assert!((weights[1] - 4.0 / 3.0).abs() < 1e-6, "{weights:?}");
        assert!((weights[0] + weights[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn small_moves_are_clicks_that_activate_tabs() {
        let mut s = state(DockNodeConfig::stack(vec![el("a"), el("b")]));
        assert!(s.start_drag("b", Point::new(100.0, 10.0)));
        s.update(Point::new(104.0, 13.0));
        assert_eq!(s.release(Point::new(104.0, 13.0)), DropOutcome::Clicked("b".into()));
        assert_eq!(s.config().content.as_ref().unwrap().active_tab_id.as_deref(), Some("b"));
        assert_eq!(s.surface().visible_panels(), vec!["b".to_string()]);
        assert_eq!(s.take_changes(), 1);
    }

    #[test]
    fn resize_press_during_a_stale_drag_restores_and_resizes() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b"), el("c")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(500.0, 500.0));
        assert!(s.drag().unwrap().is_removed);
        assert_eq!(s.splitters().len(), 1);

        let splitter = s.splitters()[0].element;
        assert!(s.start_resize(splitter, Point::new(500.0, 500.0)));
        assert!(s.drag().is_none());
        assert_eq!(
            s.config().content,
            Some(DockNodeConfig::horizontal(vec![el("a"), el("b"), el("c")]))
        );
        assert_eq!(s.splitters().len(), 2);
        let resize = *s.resize().unwrap();
        assert_eq!(s.tree().get(resize.prev).and_then(|n| n.panel_id()), Some("b"));
        assert_eq!(s.tree().get(resize.next).and_then(|n| n.panel_id()), Some("c"));
        let pressed = s.splitters().iter().find(|sp| sp.prev == resize.prev).unwrap().element;
        assert!(s.surface().element(pressed).unwrap().has_class(CLASS_DRAGGING));
    }

    #[test]
    fn root_panel_is_not_draggable_outside_popouts() {
        let mut s = state(el("a"));
        assert!(!s.start_drag("a", Point::new(10.0, 10.0)));
        s.set_detachable_root(true);
        assert!(s.start_drag("a", Point::new(10.0, 10.0)));
        assert!(s.drag().unwrap().close_original);
    }

    #[test]
    fn crossing_the_threshold_removes_the_node_and_tracks_a_target() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(500.0, 500.0));

        assert_eq!(s.config().content, Some(el("b")));
        let drag = s.drag().unwrap();
        assert!(drag.is_removed);
        assert_eq!(drag.mode, Some(DockMode::On));
        assert_eq!(s.take_changes(), 0);

        let (_, ghost) = s.surface().panel("a").unwrap();
        assert!(ghost.has_class(CLASS_MOVING));
        assert_eq!(ghost.placement, Placement {
            width: ghost.placement.width,
            height: ghost.placement.height,
            ..Placement::pinned(Point::new(500.0, 500.0))
        });
        assert!(s.surface().hover_box().unwrap().visible);
    }

    #[test]
    fn dropping_onto_a_panel_stacks_it_and_activates_the_dropped_tab() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(500.0, 500.0));
        assert_eq!(s.release(Point::new(500.0, 500.0)), DropOutcome::Docked);

        assert_eq!(
            s.config().content,
            Some(DockNodeConfig::stack(vec![el("b"), el("a")]).with_active_tab("a"))
        );
        assert_eq!(s.take_changes(), 1);
        assert_eq!(s.surface().created_panels(), ["a".to_string(), "b".to_string()]);
        assert_eq!(s.surface().visible_panels(), vec!["a".to_string()]);
        assert!(!s.surface().panel("a").unwrap().1.has_class(CLASS_MOVING));
        assert!(s.surface().hover_box().is_none());
        assert!(s.drag().is_none());
    }

    #[test]
    fn header_band_docks_as_tab() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b"), el("c")]));
        // Once a is out, c fills the right half; this is 10px below its top edge.
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(800.0, 10.0));
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Header));
        s.release(Point::new(800.0, 10.0));
        assert_eq!(
            s.config().content,
            Some(DockNodeConfig::horizontal(vec![
                el("b"),
                DockNodeConfig::stack(vec![el("c"), el("a")]).with_active_tab("a"),
            ]))
        );
    }

    #[test]
    fn edge_margin_docks_against_the_root() {
        let mut s = state(DockNodeConfig::vertical(vec![el("a"), el("b"), el("c")]));
        drag_to(&mut s, "c", Point::new(500.0, 700.0), Point::new(20.0, 300.0));
        let drag = s.drag().unwrap();
        assert_eq!(drag.target, Some(DropTarget::Node(s.tree().root().unwrap())));
        assert_eq!(drag.mode, Some(DockMode::Before));
        s.release(Point::new(20.0, 300.0));
        assert_eq!(
            s.config().content,
            Some(DockNodeConfig::horizontal(vec![
                el("c"),
                DockNodeConfig::vertical(vec![el("a"), el("b")]),
            ]))
        );
    }

    #[test]
    fn thirds_pick_the_side() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(500.0, 900.0));
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Below));
        s.release(Point::new(500.0, 900.0));
        assert_eq!(s.config().content, Some(DockNodeConfig::vertical(vec![el("b"), el("a")])));
    }

    #[test]
    fn leaving_the_viewport_switches_to_window_mode() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(750.0, 500.0));
        assert!(s.update(Point::new(1200.0, 500.0)));
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Window));
        assert!(!s.surface().panel("a").unwrap().1.visible);
        assert!(!s.surface().hover_box().unwrap().visible);

        match s.release(Point::new(1200.0, 500.0)) {
            DropOutcome::PopOut { node, at } => {
                assert_eq!(node, el("a"));
                assert_eq!(at, Point::new(1200.0, 500.0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // Without anywhere to go, the node comes back.
        s.end_drag(true);
        assert_eq!(s.config().content, Some(DockNodeConfig::horizontal(vec![el("a"), el("b")])));
        assert_eq!(s.take_changes(), 0);
        assert_eq!(s.surface().visible_panels().len(), 2);
    }

    #[test]
    fn committing_a_removal_reports_a_change() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(1200.0, 500.0));
        assert!(s.outgoing_drag().is_some());
        s.end_drag(false);
        assert_eq!(s.config().content, Some(el("b")));
        assert_eq!(s.take_changes(), 1);
        assert!(!s.surface().panel("a").unwrap().1.visible);
    }

    #[test]
    fn new_press_clears_a_stale_drag() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(750.0, 500.0));
        assert!(s.start_drag("b", Point::new(600.0, 5.0)));
        assert_eq!(s.config().content, Some(DockNodeConfig::horizontal(vec![el("a"), el("b")])));
        assert!(!s.drag().unwrap().is_removed);
    }

    #[test]
    fn adopted_drag_docks_into_this_layout() {
        let mut s = state(el("x"));
        s.adopt_drag(&el("a"), false);
        assert!(!s.surface().panel("a").unwrap().1.visible);
        s.update(Point::new(100.0, 500.0));
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Before));
        assert_eq!(s.release(Point::new(100.0, 500.0)), DropOutcome::Docked);
        assert_eq!(s.config().content, Some(DockNodeConfig::horizontal(vec![el("a"), el("x")])));
        assert_eq!(s.surface().created_panels(), ["x".to_string(), "a".to_string()]);
        assert_eq!(s.tree().len(), 3);
    }

    #[test]
    fn empty_layout_accepts_a_drop() {
        let surface = HeadlessSurface::new(Size::new(400.0, 400.0));
        let metrics = Metrics::measure(&surface, &Settings::default());
        let mut s = DockState::new(surface, DockLayoutConfig::default(), metrics);
        s.adopt_drag(&el("a"), false);
        s.update(Point::new(200.0, 200.0));
        assert_eq!(s.drag().unwrap().target, Some(DropTarget::EmptyRoot));
        assert_eq!(s.release(Point::new(200.0, 200.0)), DropOutcome::Docked);
        assert_eq!(s.config().content, Some(el("a")));
    }

    #[test]
    fn hiding_keeps_the_drag_but_drops_the_preview() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(750.0, 500.0));
        s.hide_drag_and_resize();
        assert!(s.surface().hover_box().is_none());
        assert!(s.drag().unwrap().target.is_none());
        s.update(Point::new(750.0, 500.0));
        assert!(s.surface().hover_box().unwrap().visible);
        assert!(s.surface().panel("a").unwrap().1.visible);
    }

    #[test]
    fn closing_a_panel_collapses_and_notifies() {
        let mut s = state(
            DockNodeConfig::stack(vec![el("a").closeable(), el("b"), el("c")]).with_active_tab("a"),
        );
        assert!(!s.close_panel("b"));
        assert!(s.close_panel("a"));
        assert_eq!(s.config().content, Some(DockNodeConfig::stack(vec![el("b"), el("c")])));
        assert_eq!(s.take_changes(), 1);
        assert_eq!(s.surface().visible_panels(), vec!["b".to_string()]);
    }

    #[test]
    fn scroll_reevaluates_last_pointer() {
        let mut s = state(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        drag_to(&mut s, "a", Point::new(100.0, 5.0), Point::new(500.0, 500.0));
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::On));
        s.surface_mut().set_scroll(Point::new(0.0, 400.0));
        assert!(s.scroll_changed());
        assert_eq!(s.drag().unwrap().mode, Some(DockMode::Below));
    }
}
