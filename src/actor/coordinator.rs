//! Routes pointer traffic between the main window and its popouts and
//! carries drags from one window to another.
//!
//! Pointer events arrive in screen coordinates. Each move goes to exactly one
//! window (the topmost one under the pointer); the others are told to hide
//! their drag affordances. A window that first sees a drag from elsewhere is
//! given a stand-in copy of the dragged node. A release outside every window
//! pops the dragged node out into a new window.

use tracing::{debug, instrument, warn};

use crate::actor::{self, broadcast, window};
use crate::common::collections::BTreeSet;
use crate::common::config::PopoutSettings;
use crate::common::error::DockError;
use crate::layout_engine::{DockLayoutConfig, DockNodeConfig};
use crate::sys::geometry::Point;
use crate::sys::window::{PopoutRequest, WindowFrame, WindowId, WindowOpener};

#[derive(Debug, Clone)]
pub enum Event {
    MouseMoved { screen: Point },
    MouseReleased { screen: Point },
    /// A window removed `node` from its layout and is dragging it.
    DragStarted { window: WindowId, node: DockNodeConfig, close_original: bool },
    /// A window handled a release sent to it.
    DragCompleted { window: WindowId, docked: bool },
    WindowMoved { window: WindowId, frame: WindowFrame },
    /// The host closed a window on its own.
    WindowClosed { window: WindowId },
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

struct RegisteredWindow {
    id: WindowId,
    name: String,
    frame: WindowFrame,
    requests: window::Sender,
}

struct DragSession {
    source: WindowId,
    node: DockNodeConfig,
    close_original: bool,
    /// Windows already showing the drag, the source included.
    adopted: BTreeSet<WindowId>,
    /// Set once a window has been sent the release.
    released_in: Option<WindowId>,
}

pub struct Coordinator {
    /// Registration order; later windows are stacked above earlier ones.
    windows: Vec<RegisteredWindow>,
    session: Option<DragSession>,
    /// Window that received the last move, which keeps the pointer while it
    /// is outside every window.
    captured: Option<WindowId>,
    opener: Box<dyn WindowOpener + Send>,
    popout: PopoutSettings,
    broadcast: Option<broadcast::BroadcastSender>,
    next_id: u32,
}

impl Coordinator {
    pub fn new(
        main_frame: WindowFrame,
        main: window::Sender,
        opener: Box<dyn WindowOpener + Send>,
        popout: PopoutSettings,
        broadcast: Option<broadcast::BroadcastSender>,
    ) -> Self {
        Self {
            windows: vec![RegisteredWindow {
                id: WindowId::MAIN,
                name: "main".to_string(),
                frame: main_frame,
                requests: main,
            }],
            session: None,
            captured: None,
            opener,
            popout,
            broadcast,
            next_id: 1,
        }
    }

    pub fn windows(&self) -> Vec<WindowId> { self.windows.iter().map(|w| w.id).collect() }

    pub fn frame(&self, window: WindowId) -> Option<WindowFrame> {
        self.window(window).map(|w| w.frame)
    }

    pub fn is_dragging(&self) -> bool { self.session.is_some() }

    pub async fn run(mut self, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
        }
    }

    #[instrument(name = "coordinator::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::MouseMoved { screen } => self.mouse_moved(screen),
            Event::MouseReleased { screen } => self.mouse_released(screen),
            Event::DragStarted { window, node, close_original } => {
                debug!(%window, "drag session started");
                self.session = Some(DragSession {
                    source: window,
                    node,
                    close_original,
                    adopted: BTreeSet::from([window]),
                    released_in: None,
                });
            }
            Event::DragCompleted { window, docked } => self.drag_completed(window, docked),
            Event::WindowMoved { window, frame } => {
                if let Some(w) = self.windows.iter_mut().find(|w| w.id == window) {
                    w.frame = frame;
                }
            }
            Event::WindowClosed { window } => self.unregister(window),
        }
    }

    fn window(&self, id: WindowId) -> Option<&RegisteredWindow> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn window_at(&self, screen: Point) -> Option<WindowId> {
        self.windows.iter().rev().find(|w| w.frame.contains_screen(screen)).map(|w| w.id)
    }

    fn send(&self, id: WindowId, request: window::Request) {
        match self.window(id) {
            Some(w) => w.requests.send(request),
            None => warn!(err = %DockError::WindowGone(id), "dropping request"),
        }
    }

    fn send_others(&self, except: Option<WindowId>, request: window::Request) {
        for w in self.windows.iter().filter(|w| Some(w.id) != except) {
            w.requests.send(request.clone());
        }
    }

    fn mouse_moved(&mut self, screen: Point) {
        let target = self.window_at(screen);
        let Some(id) = target.or(self.session.as_ref().map(|s| s.source)).or(self.captured) else {
            return;
        };
        let Some(frame) = self.frame(id) else { return };

        if let Some(session) = self.session.as_mut() {
            if target == Some(id) && session.adopted.insert(id) {
                debug!(window = %id, "adopting drag");
                let request = window::Request::AdoptDrag {
                    node: session.node.clone(),
                    close_original: session.close_original,
                };
                self.send(id, request);
            }
        }
        self.send(id, window::Request::MouseMoved { at: frame.to_client(screen) });
        if target.is_some() || self.session.is_some() {
            self.send_others(Some(id), window::Request::HideDragAndResize);
        }
        self.captured = Some(id);
    }

    fn mouse_released(&mut self, screen: Point) {
        let target = self.window_at(screen);
        let has_session = self.session.is_some();
        match target {
            Some(id) => {
                let Some(frame) = self.frame(id) else { return };
                self.send(id, window::Request::MouseReleased { at: frame.to_client(screen) });
                match self.session.as_mut() {
                    Some(session) => session.released_in = Some(id),
                    None => {
                        self.send_others(Some(id), window::Request::HideDragAndResize);
                        self.send_others(Some(id), window::Request::EndDrag { restore: true });
                    }
                }
            }
            None if has_session => self.pop_out(screen),
            None => {
                if let Some(id) = self.captured {
                    if let Some(frame) = self.frame(id) {
                        self.send(id, window::Request::MouseReleased { at: frame.to_client(screen) });
                    }
                }
            }
        }
        self.captured = None;
    }

    fn drag_completed(&mut self, window: WindowId, docked: bool) {
        let released_in = self.session.as_ref().and_then(|s| s.released_in);
        if released_in != Some(window) {
            return;
        }
        self.finish(!docked, docked.then_some(window));
    }

    fn pop_out(&mut self, screen: Point) {
        let Some(session) = self.session.as_ref() else { return };
        let id = WindowId(self.next_id);
        let layout = DockLayoutConfig::new(session.node.clone());
        let opened = PopoutRequest::new(id, screen, layout, &self.popout).and_then(|request| {
            let name = request.name.clone();
            self.opener.open(request).map(|opened| (name, opened))
        });
        match opened {
            Ok((name, opened)) => {
                debug!(window = %id, %name, "popout opened");
                self.next_id += 1;
                self.windows.push(RegisteredWindow {
                    id,
                    name: name.clone(),
                    frame: opened.frame,
                    requests: opened.requests,
                });
                if let Some(tx) = &self.broadcast {
                    tx.send(broadcast::BroadcastEvent::WindowOpened { window: id, name });
                }
                self.finish(false, Some(id));
            }
            Err(err) => {
                warn!(%err, "popout failed, restoring layout");
                self.finish(true, None);
            }
        }
    }

    /// Ends the session in every window. The popout the node came from is
    /// closed when the node's root landed in a different window.
    fn finish(&mut self, restore: bool, landed_in: Option<WindowId>) {
        let Some(session) = self.session.take() else { return };
        self.send_others(None, window::Request::EndDrag { restore });
        let moved_away = landed_in.is_some_and(|w| w != session.source);
        if session.close_original && moved_away && session.source != WindowId::MAIN {
            self.close_window(session.source);
        }
    }

    fn close_window(&mut self, id: WindowId) {
        let Some(w) = self.window(id) else { return };
        debug!(window = %id, "closing emptied popout");
        w.requests.send(window::Request::Close);
        let name = w.name.clone();
        self.opener.close(id, &name);
        self.unregister(id);
    }

    fn unregister(&mut self, id: WindowId) {
        if id == WindowId::MAIN {
            return;
        }
        let before = self.windows.len();
        self.windows.retain(|w| w.id != id);
        if self.windows.len() == before {
            return;
        }
        if self.captured == Some(id) {
            self.captured = None;
        }
        if self.session.as_ref().is_some_and(|s| s.source == id) {
            self.finish(true, None);
        }
        if let Some(tx) = &self.broadcast {
            tx.send(broadcast::BroadcastEvent::WindowClosed { window: id });
        }
    }
}
