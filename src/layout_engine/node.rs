//! Persistent layout description. This is what hosts store, what the
//! layout-changed listeners receive, and what popouts are seeded with.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::warn;

use crate::common::collections::HashSet;
use crate::common::error::DockError;
use crate::layout_engine::graph::NodeKind;

fn default_weight() -> f64 { 1.0 }

fn is_false(b: &bool) -> bool { !*b }

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDockNode")]
pub struct DockNodeConfig {
    pub kind: NodeKind,
    pub weight: f64,
    pub children: Vec<DockNodeConfig>,
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_closeable: bool,
    pub active_tab_id: Option<String>,
    pub user_info: Option<serde_json::Value>,
    /// Destroy the panel's element when it leaves the layout instead of
    /// keeping it hidden for reuse.
    #[serde(skip_serializing_if = "is_false")]
    pub delete_invisible: bool,
}

/// Wire form with `kind` left as a string so unknown kinds can be skipped
/// instead of failing the whole document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDockNode {
    kind: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    children: Vec<RawDockNode>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    is_closeable: bool,
    #[serde(default)]
    active_tab_id: Option<String>,
    #[serde(default)]
    user_info: Option<serde_json::Value>,
    #[serde(default)]
    delete_invisible: bool,
}

impl TryFrom<RawDockNode> for DockNodeConfig {
    type Error = DockError;

    fn try_from(raw: RawDockNode) -> Result<Self, Self::Error> {
        let kind = raw.kind.parse::<NodeKind>().map_err(|_| DockError::UnknownKind(raw.kind))?;
        let children = raw
            .children
            .into_iter()
            .filter_map(|child| match DockNodeConfig::try_from(child) {
                Ok(child) => Some(child),
                Err(err) => {
                    warn!("skipping child node: {err}");
                    None
                }
            })
            .collect();
        Ok(DockNodeConfig {
            kind,
            weight: raw.weight,
            children,
            id: raw.id,
            title: raw.title,
            is_closeable: raw.is_closeable,
            active_tab_id: raw.active_tab_id,
            user_info: raw.user_info,
            delete_invisible: raw.delete_invisible,
        })
    }
}

impl DockNodeConfig {
    pub fn new(kind: NodeKind, weight: f64, children: Vec<DockNodeConfig>) -> Self {
        Self {
            kind,
            weight,
            children,
            id: None,
            title: None,
            is_closeable: false,
            active_tab_id: None,
            user_info: None,
            delete_invisible: false,
        }
    }

    pub fn element(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Self::new(NodeKind::Element, default_weight(), Vec::new()) }
    }

    pub fn vertical(children: Vec<DockNodeConfig>) -> Self {
        Self::new(NodeKind::Vertical, default_weight(), children)
    }

    pub fn horizontal(children: Vec<DockNodeConfig>) -> Self {
        Self::new(NodeKind::Horizontal, default_weight(), children)
    }

    pub fn stack(children: Vec<DockNodeConfig>) -> Self {
        Self::new(NodeKind::Stack, default_weight(), children)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_active_tab(mut self, id: impl Into<String>) -> Self {
        self.active_tab_id = Some(id.into());
        self
    }

    pub fn with_user_info(mut self, info: serde_json::Value) -> Self {
        self.user_info = Some(info);
        self
    }

    pub fn closeable(mut self) -> Self {
        self.is_closeable = true;
        self
    }

    pub fn delete_invisible(mut self) -> Self {
        self.delete_invisible = true;
        self
    }

    /// Title shown in headers and tabs.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().or(self.id.as_deref()).unwrap_or_default()
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&DockNodeConfig> {
        path.iter().try_fold(self, |node, &i| node.children.get(i))
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut DockNodeConfig> {
        path.iter().try_fold(self, |node, &i| node.children.get_mut(i))
    }

    /// Ids of every `Element` in depth-first order.
    pub fn panel_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_panel_ids(&mut out);
        out
    }

    fn collect_panel_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        if self.kind == NodeKind::Element {
            if let Some(id) = &self.id {
                out.push(id);
            }
        }
        for child in &self.children {
            child.collect_panel_ids(out);
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::default();
        self.validate_into("root", &mut seen, &mut issues);
        issues
    }

    fn validate_into<'a>(
        &'a self,
        at: &str,
        seen: &mut HashSet<&'a str>,
        issues: &mut Vec<String>,
    ) {
        if !(self.weight > 0.0 && self.weight.is_finite()) {
            issues.push(format!("{at}: weight must be positive, got {}", self.weight));
        }
        match self.kind {
            NodeKind::Element => {
                match &self.id {
                    Some(id) if !seen.insert(id) => {
                        issues.push(format!("{at}: panel id `{id}` appears more than once"))
                    }
                    Some(_) => {}
                    None => issues.push(format!("{at}: element without an id")),
                }
                if !self.children.is_empty() {
                    issues.push(format!("{at}: element must not have children"));
                }
            }
            NodeKind::Stack => {
                if self.children.is_empty() {
                    issues.push(format!("{at}: stack without tabs"));
                }
                if self.children.iter().any(|c| c.kind != NodeKind::Element) {
                    issues.push(format!("{at}: stack children must be elements"));
                }
                if let Some(active) = &self.active_tab_id {
                    if !self.children.iter().any(|c| c.id.as_deref() == Some(active)) {
                        issues.push(format!("{at}: active tab `{active}` is not one of its tabs"));
                    }
                }
            }
            NodeKind::Vertical | NodeKind::Horizontal => {
                if self.children.is_empty() {
                    issues.push(format!("{at}: {} split without children", self.kind));
                }
            }
        }
        for (i, child) in self.children.iter().enumerate() {
            child.validate_into(&format!("{at}/{i}"), seen, issues);
        }
    }
}

// Whether a split already runs along an edge of the layout, which makes the
// margin along that edge dock against the root.

pub fn has_left_root_split(cfg: &DockNodeConfig) -> bool {
    match cfg.kind {
        NodeKind::Vertical => true,
        NodeKind::Horizontal => cfg.children.first().is_some_and(has_left_root_split),
        _ => false,
    }
}

pub fn has_right_root_split(cfg: &DockNodeConfig) -> bool {
    match cfg.kind {
        NodeKind::Vertical => true,
        NodeKind::Horizontal => cfg.children.last().is_some_and(has_right_root_split),
        _ => false,
    }
}

pub fn has_top_root_split(cfg: &DockNodeConfig) -> bool {
    match cfg.kind {
        NodeKind::Horizontal => true,
        NodeKind::Vertical => cfg.children.first().is_some_and(has_top_root_split),
        _ => false,
    }
}

pub fn has_bottom_root_split(cfg: &DockNodeConfig) -> bool {
    match cfg.kind {
        NodeKind::Horizontal => true,
        NodeKind::Vertical => cfg.children.last().is_some_and(has_bottom_root_split),
        _ => false,
    }
}

/// The document a layout is constructed from.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockLayoutConfig {
    #[serde(default)]
    pub content: Option<DockNodeConfig>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_cached_config: bool,
    /// Overrides the root-edge docking margin from the settings.
    #[serde(default)]
    pub special_dock_size: Option<f64>,
}

impl DockLayoutConfig {
    pub fn new(content: DockNodeConfig) -> Self {
        Self { content: Some(content), ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self, DockError> { Ok(serde_json::from_str(json)?) }

    pub fn to_json(&self) -> Result<String, DockError> { Ok(serde_json::to_string(self)?) }

    /// Storage key for layouts that opt into caching.
    pub fn cache_key(&self, prefix: &str) -> Option<String> {
        match &self.app_name {
            Some(app) if self.use_cached_config => Some(format!("{prefix}{app}")),
            _ => None,
        }
    }

    pub fn panel_ids(&self) -> Vec<&str> {
        self.content.as_ref().map(DockNodeConfig::panel_ids).unwrap_or_default()
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.content.as_ref().map(DockNodeConfig::validate).unwrap_or_default();
        if let Some(size) = self.special_dock_size {
            if !(0.0..0.5).contains(&size) {
                issues.push(format!("specialDockSize must be in [0, 0.5), got {size}"));
            }
        }
        issues
    }

    pub fn validated(self) -> Result<Self, DockError> {
        let issues = self.validate();
        if issues.is_empty() { Ok(self) } else { Err(DockError::InvalidLayout(issues)) }
    }
}
