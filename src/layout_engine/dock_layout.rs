//! The object a host holds for one docking container.

use tracing::{debug, warn};

use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::common::error::DockError;
use crate::layout_engine::drag::DropOutcome;
use crate::layout_engine::engine::{DockState, Metrics};
use crate::layout_engine::graph::NodeKind;
use crate::layout_engine::node::{DockLayoutConfig, DockNodeConfig};
use crate::layout_engine::state::{StateId, StateTree};
use crate::sys::geometry::Point;
use crate::sys::storage::KeyValueStore;
use crate::sys::surface::{ElementId, Surface};

/// Pointer and widget input, positions in client coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SplitterPressed { splitter: ElementId, at: Point },
    HeaderPressed { panel: String, at: Point },
    TabClicked { panel: String },
    CloseClicked { panel: String },
    MouseMoved { at: Point },
    MouseReleased { at: Point },
    Scrolled,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventResponse {
    /// The host should not act on the event itself.
    pub consumed: bool,
    /// Set for releases.
    pub outcome: Option<DropOutcome>,
}

pub type LayoutListener = Box<dyn FnMut(&DockLayoutConfig) + Send>;

struct LayoutCache {
    key: String,
    store: Box<dyn KeyValueStore + Send>,
}

pub struct DockLayout<S: Surface> {
    state: DockState<S>,
    listeners: Vec<LayoutListener>,
    cache: Option<LayoutCache>,
    /// Pop-outs and abandoned drops wait for [`DockLayout::end_drag`]
    /// instead of being rolled back on release.
    coordinated: bool,
}

impl<S: Surface> DockLayout<S> {
    pub fn new(surface: S, config: DockLayoutConfig, settings: &Settings) -> Result<Self, DockError> {
        let config = config.validated()?;
        let metrics = Metrics::measure(&surface, settings);
        Ok(Self {
            state: DockState::new(surface, config, metrics),
            listeners: Vec::new(),
            cache: None,
            coordinated: false,
        })
    }

    /// Like [`DockLayout::new`], but a layout that opts into caching starts
    /// from the copy saved in `store` and saves every change back.
    pub fn with_store(
        surface: S,
        config: DockLayoutConfig,
        settings: &Settings,
        store: Box<dyn KeyValueStore + Send>,
    ) -> Result<Self, DockError> {
        let Some(key) = config.cache_key(&settings.cache_key_prefix) else {
            return Self::new(surface, config, settings);
        };
        let initial = match load_cached(store.as_ref(), &key, &config) {
            Ok(Some(cached)) => {
                debug!(%key, "using cached layout");
                DockLayoutConfig { content: cached.content, ..config }
            }
            Ok(None) => config,
            Err(err) => {
                warn!(%key, %err, "ignoring cached layout");
                config
            }
        };
        let mut layout = Self::new(surface, initial, settings)?;
        layout.cache = Some(LayoutCache { key, store });
        Ok(layout)
    }

    pub fn surface(&self) -> &S { self.state.surface() }

    pub fn surface_mut(&mut self) -> &mut S { self.state.surface_mut() }

    pub fn state(&self) -> &DockState<S> { &self.state }

    pub fn cache_store(&self) -> Option<&(dyn KeyValueStore + Send)> {
        self.cache.as_ref().map(|c| c.store.as_ref())
    }

    pub fn current_config(&self) -> DockLayoutConfig { self.state.config().clone() }

    pub fn set_current_config(&mut self, config: DockLayoutConfig, raise: bool) -> Result<(), DockError> {
        let config = config.validated()?;
        self.state.update_config(config, raise);
        self.flush();
        Ok(())
    }

    /// Registers a callback run with the new layout after every change.
    pub fn on_layout_changed(&mut self, listener: impl FnMut(&DockLayoutConfig) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn set_coordinated(&mut self, coordinated: bool) { self.coordinated = coordinated; }

    pub fn set_detachable_root(&mut self, detachable: bool) { self.state.set_detachable_root(detachable); }

    pub fn handle_event(&mut self, event: Event) -> EventResponse {
        let page = |state: &DockState<S>, at: Point| state.surface().viewport().client_to_page(at);
        let response = match event {
            Event::SplitterPressed { splitter, at } => {
                let at = page(&self.state, at);
                consumed(self.state.start_resize(splitter, at))
            }
            Event::HeaderPressed { panel, at } => {
                let at = page(&self.state, at);
                consumed(self.state.start_drag(&panel, at))
            }
            Event::TabClicked { panel } => consumed(self.state.activate_tab(&panel)),
            Event::CloseClicked { panel } => consumed(self.state.close_panel(&panel)),
            Event::MouseMoved { at } => consumed(self.state.update(at)),
            Event::MouseReleased { at } => {
                let outcome = self.state.release(at);
                if !self.coordinated
                    && matches!(outcome, DropOutcome::PopOut { .. } | DropOutcome::Abandoned)
                {
                    self.state.end_drag(true);
                }
                EventResponse { consumed: outcome != DropOutcome::Idle, outcome: Some(outcome) }
            }
            Event::Scrolled => consumed(self.state.scroll_changed()),
        };
        self.flush();
        response
    }

    /// Releases the pointer without settling a pop-out or abandoned drop.
    pub fn release_pointer(&mut self, at: Point) -> DropOutcome {
        let outcome = self.state.release(at);
        self.flush();
        outcome
    }

    pub fn end_drag(&mut self, restore: bool) {
        self.state.end_drag(restore);
        self.flush();
    }

    pub fn adopt_drag(&mut self, node: &DockNodeConfig, close_original: bool) {
        self.state.adopt_drag(node, close_original);
        self.flush();
    }

    pub fn hide_drag_and_resize(&mut self) {
        self.state.hide_drag_and_resize();
        self.flush();
    }

    pub fn outgoing_drag(&self) -> Option<(DockNodeConfig, bool)> { self.state.outgoing_drag() }

    fn flush(&mut self) {
        for _ in 0..self.state.take_changes() {
            let config = self.state.config();
            if let Some(cache) = &mut self.cache {
                let saved = config.to_json().and_then(|json| cache.store.set(&cache.key, &json));
                if let Err(err) = saved {
                    warn!(key = %cache.key, %err, "could not save layout");
                }
            }
            for listener in &mut self.listeners {
                listener(config);
            }
        }
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.state.tree();
        let Some(root) = tree.root() else { return "(empty)\n".to_string() };
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &ascii_node(tree, root)).is_err() {
            warn!("could not draw layout tree");
        }
        out
    }
}

fn consumed(consumed: bool) -> EventResponse { EventResponse { consumed, outcome: None } }

fn load_cached(
    store: &dyn KeyValueStore,
    key: &str,
    default: &DockLayoutConfig,
) -> Result<Option<DockLayoutConfig>, DockError> {
    let Some(json) = store.get(key)? else { return Ok(None) };
    let cached = DockLayoutConfig::from_json(&json)?.validated()?;
    let known = default.panel_ids();
    let unknown: Vec<String> = cached
        .panel_ids()
        .into_iter()
        .filter(|id| !known.contains(id))
        .map(|id| format!("unknown panel `{id}`"))
        .collect();
    if !unknown.is_empty() {
        return Err(DockError::InvalidLayout(unknown));
    }
    Ok(Some(cached))
}

fn ascii_node(tree: &StateTree, id: StateId) -> ascii_tree::Tree {
    let Some(node) = tree.get(id) else { return ascii_tree::Tree::Leaf(vec![String::new()]) };
    let status = match node.parent {
        Some(parent) if tree.get(parent).is_some_and(|p| p.kind() == NodeKind::Stack) => {
            if tree.active_child(parent) == Some(id) { "☒ " } else { "☐ " }
        }
        _ => "",
    };
    let mut desc = format!("{status}{} w={}", node.kind(), node.config.weight);
    if let Some(panel) = node.panel_id() {
        desc = format!("{desc} {panel:?}");
    }
    if let Some(g) = node.geometry {
        let r = g.rect;
        desc = format!("{desc} @ {:.1},{:.1} {:.1}x{:.1}", r.left, r.top, r.width, r.height);
    }
    let children: Vec<_> = node.children.iter().map(|&c| ascii_node(tree, c)).collect();
    if children.is_empty() {
        ascii_tree::Tree::Leaf(vec![desc])
    } else {
        ascii_tree::Tree::Node(desc, children)
    }
}

/// Layouts by container id, for hosts that manage several.
pub struct LayoutRegistry<S: Surface> {
    layouts: HashMap<String, DockLayout<S>>,
}

impl<S: Surface> Default for LayoutRegistry<S> {
    fn default() -> Self { Self { layouts: HashMap::default() } }
}

impl<S: Surface> LayoutRegistry<S> {
    pub fn new() -> Self { Self::default() }

    /// Returns the layout previously registered under `container`, if any.
    pub fn insert(&mut self, container: impl Into<String>, layout: DockLayout<S>) -> Option<DockLayout<S>> {
        self.layouts.insert(container.into(), layout)
    }

    pub fn get(&self, container: &str) -> Option<&DockLayout<S>> { self.layouts.get(container) }

    pub fn get_mut(&mut self, container: &str) -> Option<&mut DockLayout<S>> {
        self.layouts.get_mut(container)
    }

    pub fn remove(&mut self, container: &str) -> Option<DockLayout<S>> { self.layouts.remove(container) }

    pub fn len(&self) -> usize { self.layouts.len() }

    pub fn is_empty(&self) -> bool { self.layouts.is_empty() }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::geometry::Size;
    use crate::sys::headless::HeadlessSurface;
    use crate::sys::storage::MemoryStore;

    fn el(id: &str) -> DockNodeConfig { DockNodeConfig::element(id) }

    fn surface() -> HeadlessSurface { HeadlessSurface::new(Size::new(1000.0, 1000.0)) }

    fn recorded(layout: &mut DockLayout<HeadlessSurface>) -> Arc<Mutex<Vec<DockLayoutConfig>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        layout.on_layout_changed(move |cfg| sink.lock().unwrap().push(cfg.clone()));
        seen
    }

    fn drive(layout: &mut DockLayout<HeadlessSurface>, events: Vec<Event>) -> Vec<EventResponse> {
        events.into_iter().map(|e| layout.handle_event(e)).collect()
    }

    #[test]
    fn dropping_a_onto_b_makes_an_active_stack_with_one_notification() {
        let config = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("A"), el("B")]));
        let mut layout = DockLayout::new(surface(), config, &Settings::default()).unwrap();
        let seen = recorded(&mut layout);

        let responses = drive(&mut layout, vec![
            Event::HeaderPressed { panel: "A".into(), at: Point::new(100.0, 5.0) },
            Event::MouseMoved { at: Point::new(300.0, 400.0) },
            Event::MouseMoved { at: Point::new(500.0, 500.0) },
            Event::MouseReleased { at: Point::new(500.0, 500.0) },
        ]);
        assert!(responses.iter().all(|r| r.consumed));
        assert_eq!(responses[3].outcome, Some(DropOutcome::Docked));

        let expected = DockNodeConfig::stack(vec![el("B"), el("A")]).with_active_tab("A");
        assert_eq!(layout.current_config().content, Some(expected.clone()));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].content, Some(expected));
    }

    #[test]
    fn splitter_drag_notifies_once_with_final_weights() {
        let config = DockLayoutConfig::new(DockNodeConfig::vertical(vec![el("a"), el("b")]));
        let mut layout = DockLayout::new(surface(), config, &Settings::default()).unwrap();
        let seen = recorded(&mut layout);
        let splitter = layout.state().splitters()[0].element;

        drive(&mut layout, vec![
            Event::SplitterPressed { splitter, at: Point::new(500.0, 500.0) },
            Event::MouseMoved { at: Point::new(500.0, 600.0) },
            Event::MouseMoved { at: Point::new(500.0, 750.0) },
        ]);
        assert!(seen.lock().unwrap().is_empty());
        let released = layout.handle_event(Event::MouseReleased { at: Point::new(500.0, 750.0) });
        assert_eq!(released.outcome, Some(DropOutcome::Resized));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let weights: Vec<f64> =
            seen[0].content.as_ref().unwrap().children.iter().map(|c| c.weight).collect();
        assert!((weights[0] - 1.5).abs() < 1e-9 && (weights[1] - 0.5).abs() < 1e-9, "{weights:?}");
    }

    #[test]
    fn drop_outside_the_window_restores_when_standalone() {
        let original = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        let mut layout = DockLayout::new(surface(), original.clone(), &Settings::default()).unwrap();
        let seen = recorded(&mut layout);

        let responses = drive(&mut layout, vec![
            Event::HeaderPressed { panel: "a".into(), at: Point::new(100.0, 5.0) },
            Event::MouseMoved { at: Point::new(1500.0, 200.0) },
            Event::MouseReleased { at: Point::new(1500.0, 200.0) },
        ]);
        assert!(matches!(responses[2].outcome, Some(DropOutcome::PopOut { .. })));
        assert_eq!(layout.current_config(), original);
        assert!(seen.lock().unwrap().is_empty());
        assert!(layout.state().drag().is_none());
    }

    #[test]
    fn coordinated_release_waits_for_end_drag() {
        let config = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        let mut layout = DockLayout::new(surface(), config, &Settings::default()).unwrap();
        layout.set_coordinated(true);
        let seen = recorded(&mut layout);

        drive(&mut layout, vec![
            Event::HeaderPressed { panel: "a".into(), at: Point::new(100.0, 5.0) },
            Event::MouseMoved { at: Point::new(1500.0, 200.0) },
            Event::MouseReleased { at: Point::new(1500.0, 200.0) },
        ]);
        assert_eq!(layout.outgoing_drag(), Some((el("a"), false)));
        layout.end_drag(false);
        assert_eq!(layout.current_config().content, Some(el("b")));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn tab_click_and_close_each_notify() {
        let stack = DockNodeConfig::stack(vec![el("a"), el("b").closeable()]);
        let mut layout =
            DockLayout::new(surface(), DockLayoutConfig::new(stack), &Settings::default()).unwrap();
        let seen = recorded(&mut layout);

        assert!(layout.handle_event(Event::TabClicked { panel: "b".into() }).consumed);
        assert!(!layout.handle_event(Event::TabClicked { panel: "b".into() }).consumed);
        assert!(layout.handle_event(Event::CloseClicked { panel: "b".into() }).consumed);
        assert_eq!(layout.current_config().content, Some(el("a")));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn cached_layout_replaces_the_default_and_is_kept_up_to_date() {
        let mut default = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        default.app_name = Some("demo".into());
        default.use_cached_config = true;
        let cached = DockLayoutConfig::new(DockNodeConfig::vertical(vec![el("b"), el("a")]));

        let mut store = MemoryStore::new();
        store.set("docking-js-demo", &cached.to_json().unwrap()).unwrap();
        let mut layout =
            DockLayout::with_store(surface(), default, &Settings::default(), Box::new(store)).unwrap();

        let config = layout.current_config();
        assert_eq!(config.content, cached.content);
        assert_eq!(config.app_name.as_deref(), Some("demo"));
        assert!(config.use_cached_config);

        layout.handle_event(Event::TabClicked { panel: "a".into() });
        let splitter = layout.state().splitters()[0].element;
        drive(&mut layout, vec![
            Event::SplitterPressed { splitter, at: Point::new(500.0, 500.0) },
            Event::MouseMoved { at: Point::new(500.0, 750.0) },
            Event::MouseReleased { at: Point::new(500.0, 750.0) },
        ]);
        let saved = layout.cache_store().unwrap().get("docking-js-demo").unwrap().unwrap();
        assert_eq!(DockLayoutConfig::from_json(&saved).unwrap(), layout.current_config());
    }

    #[test]
    fn broken_or_foreign_cache_entries_fall_back_to_the_default() {
        let mut default = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        default.app_name = Some("demo".into());
        default.use_cached_config = true;

        for saved in [
            "{not json".to_string(),
            DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("zzz")]))
                .to_json()
                .unwrap(),
        ] {
            let mut store = MemoryStore::new();
            store.set("docking-js-demo", &saved).unwrap();
            let layout = DockLayout::with_store(
                surface(),
                default.clone(),
                &Settings::default(),
                Box::new(store),
            )
            .unwrap();
            assert_eq!(layout.current_config(), default);
        }
    }

    #[test]
    fn layouts_without_an_app_name_are_not_cached() {
        let config = DockLayoutConfig::new(el("a"));
        let layout =
            DockLayout::with_store(surface(), config, &Settings::default(), Box::new(MemoryStore::new()))
                .unwrap();
        assert!(layout.cache_store().is_none());
    }

    #[test]
    fn listeners_all_run_in_registration_order() {
        let config = DockLayoutConfig::new(DockNodeConfig::stack(vec![el("a"), el("b")]));
        let mut layout = DockLayout::new(surface(), config, &Settings::default()).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let order = order.clone();
            layout.on_layout_changed(move |_| order.lock().unwrap().push(name));
        }
        layout.handle_event(Event::TabClicked { panel: "b".into() });
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn set_current_config_rejects_invalid_layouts() {
        let mut layout =
            DockLayout::new(surface(), DockLayoutConfig::new(el("a")), &Settings::default()).unwrap();
        let seen = recorded(&mut layout);
        let bad = DockLayoutConfig::new(DockNodeConfig::stack(vec![el("a")]).with_active_tab("nope"));
        assert!(layout.set_current_config(bad, true).is_err());
        let good = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![el("a"), el("b")]));
        layout.set_current_config(good.clone(), true).unwrap();
        assert_eq!(layout.current_config(), good);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(layout.surface().visible_panels(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn draw_tree_marks_the_active_tab() {
        let config = DockLayoutConfig::new(DockNodeConfig::horizontal(vec![
            el("a"),
            DockNodeConfig::stack(vec![el("b"), el("c")]).with_active_tab("c"),
        ]));
        let layout = DockLayout::new(surface(), config, &Settings::default()).unwrap();
        let drawn = layout.draw_tree();
        assert!(drawn.contains("horizontal w=1 @ 0.0,0.0 100.0x100.0"), "{drawn}");
        assert!(drawn.contains("☐ element w=1 \"b\""), "{drawn}");
        assert!(drawn.contains("☒ element w=1 \"c\""), "{drawn}");
    }

    #[test]
    fn registry_keys_layouts_by_container() {
        let mut registry = LayoutRegistry::new();
        let layout =
            DockLayout::new(surface(), DockLayoutConfig::new(el("a")), &Settings::default()).unwrap();
        assert!(registry.insert("left", layout).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("left").is_some());
        assert!(registry.get_mut("right").is_none());
        assert!(registry.remove("left").is_some());
        assert!(registry.is_empty());
    }
}
