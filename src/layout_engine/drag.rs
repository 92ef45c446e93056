use crate::layout_engine::graph::{DockMode, NodeKind};
use crate::layout_engine::node::{DockLayoutConfig, DockNodeConfig};
use crate::layout_engine::state::StateId;
use crate::sys::geometry::{PercentRect, Point};
use crate::sys::style::{Length, Placement};
use crate::sys::surface::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Node(StateId),
    /// The layout is empty; the dropped node becomes the root.
    EmptyRoot,
}

#[derive(Debug, Clone)]
pub enum DragOrigin {
    /// The node came out of this layout. `snapshot` is the layout before the
    /// node was taken out, restored when the drop goes nowhere.
    Local { snapshot: Option<DockLayoutConfig> },
    /// A stand-in for a node being dragged out of another window.
    Remote,
}

#[derive(Debug, Clone)]
pub struct DragState {
    pub node: StateId,
    /// Root of the subtree detached from the tree together with `node`.
    pub detached: Option<StateId>,
    /// Pointer position at press time, in page coordinates.
    pub start: Point,
    pub hover: Option<ElementId>,
    pub target: Option<DropTarget>,
    pub mode: Option<DockMode>,
    pub is_removed: bool,
    pub origin: DragOrigin,
    /// Dragging the root of a popout; the popout closes once the node lands
    /// in another window.
    pub close_original: bool,
}

impl DragState {
    pub fn pending(node: StateId, start: Point, close_original: bool) -> Self {
        Self {
            node,
            detached: None,
            start,
            hover: None,
            target: None,
            mode: None,
            is_removed: false,
            origin: DragOrigin::Local { snapshot: None },
            close_original,
        }
    }

    pub fn adopted(node: StateId, close_original: bool) -> Self {
        Self {
            node,
            detached: Some(node),
            start: Point::default(),
            hover: None,
            target: None,
            mode: None,
            is_removed: true,
            origin: DragOrigin::Remote,
            close_original,
        }
    }

    pub fn is_remote(&self) -> bool { matches!(self.origin, DragOrigin::Remote) }
}

/// What a pointer release amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Nothing was being dragged or resized.
    Idle,
    /// A resize finished.
    Resized,
    /// Press and release without crossing the drag threshold.
    Clicked(String),
    Docked,
    /// Released outside the window; `node` should move to a new window.
    PopOut { node: DockNodeConfig, at: Point },
    /// Released with no drop target.
    Abandoned,
}

/// Where the hover box goes for a drop of `mode` onto `rect`.
pub fn hover_placement(rect: PercentRect, mode: DockMode, header_size: f64) -> Placement {
    let PercentRect { left: x, top: y, width: w, height: h } = rect;
    let (x, y, w, h) = match mode {
        DockMode::Above => (x, y, w, h / 2.0),
        DockMode::Below => (x, y + h / 2.0, w, h / 2.0),
        DockMode::Before => (x, y, w / 2.0, h),
        DockMode::After => (x + w / 2.0, y, w / 2.0, h),
        _ => (x, y, w, h),
    };
    let mut placement = Placement::percent(Some(x), Some(y), Some(w), Some(h), Point::default());
    if mode == DockMode::Header {
        placement.height = Some(Length::Pixels(header_size));
    }
    placement
}

/// Inserts `insert` next to, or onto, the node at `target` (a child-index
/// path into `content`). Returns false when the drop cannot happen.
///
/// A drop beside a node inside a split of the same direction joins that
/// split, both nodes sharing the target's weight. Otherwise the target is
/// wrapped in a new split, or in a stack for `On`/`Header`. A stack target
/// with `On` just gains a tab. In every stack case the dropped tab becomes the
/// active one.
pub fn dock(
    content: &mut Option<DockNodeConfig>,
    target: &[usize],
    mut insert: DockNodeConfig,
    mode: DockMode,
) -> bool {
    let Some(root) = content.as_mut() else {
        if target.is_empty() {
            *content = Some(insert);
            return true;
        }
        return false;
    };
    let mode = if mode == DockMode::Header { DockMode::On } else { mode };
    let Some(kind) = mode.container_kind() else { return false };
    let Some(target_node) = root.at_path(target) else { return false };
    insert.weight = target_node.weight;
    let inserted_id = insert.id.clone();

    if target_node.kind == NodeKind::Stack && mode == DockMode::On {
        let Some(stack) = root.at_path_mut(target) else { return false };
        stack.children.push(insert);
        stack.active_tab_id = inserted_id;
        return true;
    }

    if let Some((&index, parent_path)) = target.split_last() {
        let Some(parent) = root.at_path_mut(parent_path) else { return false };
        if parent.kind == kind {
            if kind == NodeKind::Stack {
                parent.active_tab_id = inserted_id;
            } else {
                parent.children[index].weight /= 2.0;
                insert.weight /= 2.0;
            }
            let at = if mode.inserts_first() { index } else { index + 1 };
            parent.children.insert(at, insert);
        } else {
            let target_node = parent.children.remove(index);
            let wrapper = wrap(kind, target_node, insert, mode);
            parent.children.insert(index, wrapper);
        }
        return true;
    }

    if root.kind == kind {
        if kind == NodeKind::Stack {
            root.active_tab_id = inserted_id;
        } else if !root.children.is_empty() {
            insert.weight =
                root.children.iter().map(|c| c.weight).sum::<f64>() / root.children.len() as f64;
        }
        if mode.inserts_first() {
            root.children.insert(0, insert);
        } else {
            root.children.push(insert);
        }
    } else if let Some(old_root) = content.take() {
        *content = Some(wrap(kind, old_root, insert, mode));
    }
    true
}

fn wrap(kind: NodeKind, target: DockNodeConfig, insert: DockNodeConfig, mode: DockMode) -> DockNodeConfig {
    let weight = target.weight;
    let active = (kind == NodeKind::Stack).then(|| insert.id.clone()).flatten();
    let children = if mode.inserts_first() { vec![insert, target] } else { vec![target, insert] };
    DockNodeConfig { active_tab_id: active, ..DockNodeConfig::new(kind, weight, children) }
}
