//! One docking window: a [`DockLayout`] driven over a channel.
//!
//! Local input (presses, tab clicks, close buttons) arrives as
//! [`Request::Input`]. Pointer moves and releases come from the coordinator
//! already translated into this window's client coordinates, because only the
//! coordinator knows which window the pointer is over.

use tracing::{debug, instrument};

use crate::actor::{self, broadcast, coordinator};
use crate::layout_engine::{DockLayout, DockNodeConfig, DropOutcome, Event};
use crate::sys::geometry::Point;
use crate::sys::surface::Surface;
use crate::sys::window::WindowId;

#[derive(Debug, Clone)]
pub enum Request {
    Input(Event),
    MouseMoved { at: Point },
    MouseReleased { at: Point },
    /// Show a node being dragged out of another window.
    AdoptDrag { node: DockNodeConfig, close_original: bool },
    /// The pointer is over another window.
    HideDragAndResize,
    /// The drag session is over everywhere.
    EndDrag { restore: bool },
    Close,
}

pub type Sender = actor::Sender<Request>;
pub type Receiver = actor::Receiver<Request>;

pub struct WindowActor<S: Surface> {
    id: WindowId,
    layout: DockLayout<S>,
    coordinator: Option<coordinator::Sender>,
    /// Whether the coordinator has been told about the current outgoing drag.
    reported_drag: bool,
}

impl<S: Surface> WindowActor<S> {
    pub fn new(
        id: WindowId,
        mut layout: DockLayout<S>,
        coordinator: Option<coordinator::Sender>,
        broadcast: Option<broadcast::BroadcastSender>,
    ) -> Self {
        layout.set_coordinated(coordinator.is_some());
        layout.set_detachable_root(id != WindowId::MAIN);
        if let Some(tx) = broadcast {
            layout.on_layout_changed(move |config| {
                tx.send(broadcast::BroadcastEvent::LayoutChanged { window: id, config: config.clone() })
            });
        }
        Self { id, layout, coordinator, reported_drag: false }
    }

    pub fn id(&self) -> WindowId { self.id }

    pub fn layout(&self) -> &DockLayout<S> { &self.layout }

    pub async fn run(mut self, mut requests: Receiver) {
        while let Some((span, request)) = requests.recv().await {
            let _guard = span.enter();
            if !self.handle_request(request) {
                break;
            }
        }
    }

    /// Returns false once the window has been asked to close.
    #[instrument(name = "window::handle_request", skip(self), fields(window = %self.id))]
    pub fn handle_request(&mut self, request: Request) -> bool {
        match request {
            Request::Input(event) => {
                self.layout.handle_event(event);
            }
            Request::MouseMoved { at } => {
                self.layout.handle_event(Event::MouseMoved { at });
            }
            Request::MouseReleased { at } => {
                let response = self.layout.handle_event(Event::MouseReleased { at });
                let docked = response.outcome == Some(DropOutcome::Docked);
                if let Some(coordinator) = &self.coordinator {
                    coordinator.send(coordinator::Event::DragCompleted { window: self.id, docked });
                }
            }
            Request::AdoptDrag { node, close_original } => {
                self.layout.adopt_drag(&node, close_original);
            }
            Request::HideDragAndResize => self.layout.hide_drag_and_resize(),
            Request::EndDrag { restore } => self.layout.end_drag(restore),
            Request::Close => {
                debug!("closing");
                self.layout.end_drag(true);
                return false;
            }
        }
        self.report_drag();
        true
    }

    fn report_drag(&mut self) {
        match self.layout.outgoing_drag() {
            Some((node, close_original)) if !self.reported_drag => {
                self.reported_drag = true;
                if let Some(coordinator) = &self.coordinator {
                    coordinator.send(coordinator::Event::DragStarted {
                        window: self.id,
                        node,
                        close_original,
                    });
                }
            }
            Some(_) => {}
            None => self.reported_drag = false,
        }
    }
}
