pub mod dock_layout;
pub mod drag;
pub mod engine;
pub(crate) mod graph;
pub mod node;
pub mod resize;
pub mod state;

pub use dock_layout::{DockLayout, Event, EventResponse, LayoutListener, LayoutRegistry};
pub use drag::{DropOutcome, DropTarget};
pub use engine::{DockState, Metrics};
pub use graph::{DockMode, NodeKind, Orientation};
pub use node::{DockLayoutConfig, DockNodeConfig};
pub use resize::ResizeState;
pub use state::{StateId, StateTree};
