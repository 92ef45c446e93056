pub mod actor;
pub mod common;
pub mod layout_engine;
pub mod sys;

pub use layout_engine::{
    DockLayout, DockLayoutConfig, DockMode, DockNodeConfig, Event, EventResponse, NodeKind,
};
