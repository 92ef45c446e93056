//! Runtime mirror of a [`DockNodeConfig`] tree.
//!
//! States live in an arena and point at their parent by key. A state owns at
//! most one element on the surface: panels for `Element` nodes and a tab
//! strip for `Stack` nodes. Teardown is explicit through [`StateTree::kill`].

use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::common::collections::HashMap;
use crate::layout_engine::graph::{NodeKind, Orientation};
use crate::layout_engine::node::DockNodeConfig;
use crate::sys::geometry::{PercentRect, Point};
use crate::sys::style::Placement;
use crate::sys::surface::{ElementId, ElementRole, HeaderSpec, PanelRequest, Surface, TabSpec};

slotmap::new_key_type! { pub struct StateId; }

/// Percentage rectangle from the last layout pass plus the pixel offset
/// applied to it for the splitters above or left of it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeGeometry {
    pub rect: PercentRect,
    pub offset: Point,
}

#[derive(Debug)]
pub struct NodeState {
    /// This node's config with `children` left empty; the children are the
    /// states in `children`.
    pub config: DockNodeConfig,
    pub parent: Option<StateId>,
    pub children: Vec<StateId>,
    pub element: Option<ElementId>,
    /// `None` until laid out.
    pub geometry: Option<NodeGeometry>,
}

impl NodeState {
    pub fn kind(&self) -> NodeKind { self.config.kind }

    pub fn panel_id(&self) -> Option<&str> { self.config.id.as_deref() }

    fn header(&self) -> HeaderSpec {
        HeaderSpec {
            title: self.config.display_title().to_string(),
            closeable: self.config.is_closeable,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splitter {
    pub element: ElementId,
    pub orientation: Orientation,
    pub prev: StateId,
    pub next: StateId,
}

/// Panel elements by panel id. Elements that leave the layout either stay
/// hidden in `active` for reuse or park in `unused` until the next purge.
#[derive(Debug, Default)]
pub struct ElementPool {
    active: HashMap<String, ElementId>,
    unused: HashMap<String, ElementId>,
}

impl ElementPool {
    pub fn acquire<S: Surface>(&mut self, surface: &mut S, request: PanelRequest) -> ElementId {
        if let Some(&element) = self.active.get(&request.id) {
            return element;
        }
        if let Some(element) = self.unused.remove(&request.id) {
            self.active.insert(request.id, element);
            return element;
        }
        debug!(panel = %request.id, "create");
        let id = request.id.clone();
        let element = surface.create_panel(request);
        self.active.insert(id, element);
        element
    }

    pub fn release<S: Surface>(
        &mut self,
        surface: &mut S,
        panel: &str,
        element: ElementId,
        delete_invisible: bool,
    ) {
        if delete_invisible {
            if let Some(element) = self.active.remove(panel) {
                self.unused.insert(panel.to_string(), element);
            }
        }
        surface.set_visible(element, false);
    }

    pub fn purge_unused<S: Surface>(&mut self, surface: &mut S) {
        for (panel, element) in self.unused.drain() {
            debug!(%panel, "delete");
            surface.remove(element);
        }
    }

    pub fn element(&self, panel: &str) -> Option<ElementId> { self.active.get(panel).copied() }

    pub fn unused_len(&self) -> usize { self.unused.len() }
}

pub struct LayoutPass<'a, S: Surface> {
    pub surface: &'a mut S,
    pub pool: &'a mut ElementPool,
    pub splitters: &'a mut Vec<Splitter>,
    pub splitter_size: f64,
}

#[derive(Debug, Default)]
pub struct StateTree {
    nodes: SlotMap<StateId, NodeState>,
    root: Option<StateId>,
}

impl StateTree {
    pub fn new() -> Self { Self::default() }

    pub fn from_config(content: Option<&DockNodeConfig>) -> Self {
        let mut tree = Self::new();
        let root = content.map(|c| tree.attach(c, None));
        tree.root = root;
        tree
    }

    pub fn root(&self) -> Option<StateId> { self.root }

    pub fn set_root(&mut self, root: Option<StateId>) { self.root = root; }

    pub fn get(&self, id: StateId) -> Option<&NodeState> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: StateId) -> Option<&mut NodeState> { self.nodes.get_mut(id) }

    pub fn contains(&self, id: StateId) -> bool { self.nodes.contains_key(id) }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Builds states for `config` and its subtree under `parent`. The caller
    /// links the result into the parent's children.
    pub fn attach(&mut self, config: &DockNodeConfig, parent: Option<StateId>) -> StateId {
        let id = self.nodes.insert(NodeState {
            config: DockNodeConfig { children: Vec::new(), ..config.clone() },
            parent,
            children: Vec::new(),
            element: None,
            geometry: None,
        });
        let children = config.children.iter().map(|c| self.attach(c, Some(id))).collect();
        self.nodes[id].children = children;
        id
    }

    /// Reassembles the config of the subtree at `id`.
    pub fn config_of(&self, id: StateId) -> Option<DockNodeConfig> {
        let node = self.nodes.get(id)?;
        let mut config = node.config.clone();
        config.children = node.children.iter().filter_map(|&c| self.config_of(c)).collect();
        Some(config)
    }

    pub fn content(&self) -> Option<DockNodeConfig> { self.root.and_then(|r| self.config_of(r)) }

    /// The attached `Element` state hosting `panel`.
    pub fn find_panel(&self, panel: &str) -> Option<StateId> {
        let mut pending: Vec<StateId> = self.root.into_iter().collect();
        while let Some(id) = pending.pop() {
            let node = &self.nodes[id];
            if node.kind() == NodeKind::Element && node.panel_id() == Some(panel) {
                return Some(id);
            }
            pending.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Child indices from the root down to `id`; `None` for detached states.
    pub fn path_of(&self, id: StateId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes.get(current)?.parent {
            let index = self.nodes[parent].children.iter().position(|&c| c == current)?;
            path.push(index);
            current = parent;
        }
        if Some(current) != self.root {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// The child shown by a stack: its active tab, else its first child.
    pub fn active_child(&self, stack: StateId) -> Option<StateId> {
        let node = self.nodes.get(stack)?;
        let active = node.config.active_tab_id.as_deref();
        node.children
            .iter()
            .copied()
            .find(|&c| active.is_some() && self.nodes[c].panel_id() == active)
            .or_else(|| node.children.first().copied())
    }

    /// Elements owned by the subtree at `id`, tab strips included.
    pub fn subtree_elements(&self, id: StateId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            out.extend(node.element);
            pending.extend(node.children.iter().copied());
        }
        out
    }

    /// Deepest `Element` or `Stack` whose rectangle contains the point, in
    /// percent of the container. Edges count as inside.
    pub fn get_element_at(&self, x: f64, y: f64) -> Option<StateId> {
        self.element_at_from(self.root?, x, y)
    }

    fn element_at_from(&self, id: StateId, x: f64, y: f64) -> Option<StateId> {
        let node = &self.nodes[id];
        if !node.geometry?.rect.contains(x, y) {
            return None;
        }
        if node.kind().is_leaf_like() {
            return Some(id);
        }
        node.children.iter().find_map(|&c| self.element_at_from(c, x, y))
    }

    pub fn layout<S: Surface>(
        &mut self,
        id: StateId,
        rect: PercentRect,
        offset: Point,
        pass: &mut LayoutPass<'_, S>,
    ) {
        let Some(node) = self.nodes.get_mut(id) else { return };
        node.geometry = Some(NodeGeometry { rect, offset });
        let children = node.children.clone();
        let kind = node.kind();

        match kind {
            NodeKind::Vertical | NodeKind::Horizontal => {
                let vertical = kind == NodeKind::Vertical;
                let orientation = if vertical { Orientation::Vertical } else { Orientation::Horizontal };
                let sum: f64 = children.iter().map(|&c| self.nodes[c].config.weight).sum();
                let extent = if vertical { rect.height } else { rect.width };
                let per_weight = if sum > 0.0 { extent / sum } else { 0.0 };

                let (mut x, mut y) = (rect.left, rect.top);
                let mut offset = offset;
                let mut prev: Option<StateId> = None;
                for &child in &children {
                    if let Some(prev) = prev {
                        let element = pass.surface.create_element(ElementRole::Splitter(orientation));
                        let placement = if vertical {
                            offset.y = 0.0;
                            Placement::percent(Some(x), Some(y), Some(rect.width), None, offset)
                        } else {
                            offset.x = 0.0;
                            Placement::percent(Some(x), Some(y), None, Some(rect.height), offset)
                        };
                        pass.surface.place(element, placement);
                        pass.surface.set_visible(element, true);
                        pass.splitters.push(Splitter { element, orientation, prev, next: child });
                        if vertical {
                            offset.y += pass.splitter_size;
                        } else {
                            offset.x += pass.splitter_size;
                        }
                    }
                    let share = self.nodes[child].config.weight * per_weight;
                    let child_rect = if vertical {
                        PercentRect::new(x, y, rect.width, share)
                    } else {
                        PercentRect::new(x, y, share, rect.height)
                    };
                    self.layout(child, child_rect, offset, pass);
                    if vertical {
                        y += share;
                    } else {
                        x += share;
                    }
                    prev = Some(child);
                }
            }
            NodeKind::Element => {
                let node = &self.nodes[id];
                let element = match node.element {
                    Some(element) => element,
                    None => {
                        let Some(panel) = node.panel_id() else {
                            warn!("element node without a panel id is not shown");
                            return;
                        };
                        let request = PanelRequest {
                            id: panel.to_string(),
                            header: node.header(),
                            user_info: node.config.user_info.clone(),
                        };
                        let element = pass.pool.acquire(&mut *pass.surface, request);
                        self.nodes[id].element = Some(element);
                        element
                    }
                };
                pass.surface.set_visible(element, true);
                pass.surface.place(
                    element,
                    Placement::percent(
                        Some(rect.left),
                        Some(rect.top),
                        Some(rect.width),
                        Some(rect.height),
                        offset,
                    ),
                );
            }
            NodeKind::Stack => {
                let active = self.active_child(id);
                let active_id = active.and_then(|a| self.nodes[a].panel_id()).map(str::to_string);
                let header = match self.nodes[id].element {
                    Some(header) => header,
                    None => {
                        let tabs = children
                            .iter()
                            .map(|&c| {
                                let tab = &self.nodes[c];
                                TabSpec {
                                    id: tab.panel_id().unwrap_or_default().to_string(),
                                    header: tab.header(),
                                }
                            })
                            .collect();
                        let header = pass
                            .surface
                            .create_element(ElementRole::TabHeader { tabs, active: active_id.clone() });
                        self.nodes[id].element = Some(header);
                        header
                    }
                };
                pass.surface.place(
                    header,
                    Placement::percent(Some(rect.left), Some(rect.top), Some(rect.width), None, offset),
                );
                if let Some(active_id) = &active_id {
                    pass.surface.set_active_tab(header, active_id);
                }
                for &child in &children {
                    self.layout(child, rect, offset, pass);
                    if let Some(element) = self.nodes[child].element {
                        pass.surface.set_visible(element, Some(child) == active);
                    }
                }
            }
        }
    }

    /// Takes `id` out of the tree. A parent left with one child collapses
    /// into that child, which inherits the parent's weight and slot. A parent
    /// whose only child is `id` is removed in its place, so removing the last
    /// node clears the tree.
    ///
    /// Returns the root of the detached subtree. It stays in the arena, still
    /// owning its elements, until it is killed or discarded.
    pub fn remove<S: Surface>(
        &mut self,
        id: StateId,
        surface: &mut S,
        pool: &mut ElementPool,
    ) -> Option<StateId> {
        let parent = self.nodes.get(id)?.parent;
        let Some(parent) = parent else {
            if self.root == Some(id) {
                self.root = None;
                return Some(id);
            }
            return None;
        };
        if self.nodes[parent].children.len() == 1 {
            return self.remove(parent, surface, pool);
        }

        let index = self.nodes[parent].children.iter().position(|&c| c == id)?;
        let panel = self.nodes[id].config.id.clone();
        let parent_node = &mut self.nodes[parent];
        parent_node.children.remove(index);
        if parent_node.kind() == NodeKind::Stack && parent_node.config.active_tab_id == panel {
            parent_node.config.active_tab_id = None;
        }
        self.nodes[id].parent = None;

        if self.nodes[parent].children.len() == 1 {
            let survivor = self.nodes[parent].children[0];
            self.nodes[survivor].config.weight = self.nodes[parent].config.weight;
            self.replace_with(parent, survivor, surface, pool);
        }
        Some(id)
    }

    /// Puts `replacement` in `old`'s slot (or makes it the root) and kills
    /// whatever is left of `old`. Returns false, changing nothing, when either
    /// id is not in the tree.
    pub fn replace_with<S: Surface>(
        &mut self,
        old: StateId,
        replacement: StateId,
        surface: &mut S,
        pool: &mut ElementPool,
    ) -> bool {
        if old == replacement || !self.nodes.contains_key(replacement) {
            return false;
        }
        let Some(old_parent) = self.nodes.get(old).map(|n| n.parent) else { return false };
        if let Some(prev_parent) = self.nodes[replacement].parent {
            if let Some(parent) = self.nodes.get_mut(prev_parent) {
                parent.children.retain(|&c| c != replacement);
            }
        }
        match old_parent {
            Some(parent) => {
                if let Some(slot) = self.nodes[parent].children.iter_mut().find(|c| **c == old) {
                    *slot = replacement;
                }
            }
            None => self.root = Some(replacement),
        }
        self.nodes[replacement].parent = old_parent;
        self.nodes[old].parent = None;
        self.kill(old, surface, pool);
        true
    }

    /// Tears down the subtree at `id`: panels go back to the pool, tab strips
    /// are removed, and the states leave the arena.
    pub fn kill<S: Surface>(&mut self, id: StateId, surface: &mut S, pool: &mut ElementPool) {
        self.unlink(id);
        self.teardown(id, &mut |node| match (node.kind(), node.element) {
            (NodeKind::Element, Some(element)) => {
                let panel = node.panel_id().unwrap_or_default();
                pool.release(&mut *surface, panel, element, node.config.delete_invisible);
            }
            (_, Some(element)) => surface.remove(element),
            _ => {}
        });
    }

    /// Drops the subtree at `id` from the arena while leaving its panel
    /// elements with the pool, for states whose panels were handed over to a
    /// rebuilt tree.
    pub fn discard<S: Surface>(&mut self, id: StateId, surface: &mut S) {
        self.unlink(id);
        self.teardown(id, &mut |node| {
            if let (NodeKind::Stack, Some(element)) = (node.kind(), node.element) {
                surface.remove(element);
            }
        });
    }

    fn unlink(&mut self, id: StateId) {
        let Some(node) = self.nodes.get(id) else { return };
        match node.parent {
            Some(parent) => self.nodes[parent].children.retain(|&c| c != id),
            None if self.root == Some(id) => self.root = None,
            None => {}
        }
    }

    fn teardown(&mut self, id: StateId, on_node: &mut impl FnMut(&NodeState)) {
        let Some(node) = self.nodes.remove(id) else { return };
        on_node(&node);
        for child in node.children {
            self.teardown(child, on_node);
        }
    }
}
