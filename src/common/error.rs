use thiserror::Error;

use crate::sys::window::WindowId;

#[derive(Debug, Error)]
pub enum DockError {
    #[error("could not parse layout: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    #[error("invalid layout: {}", .0.join("; "))]
    InvalidLayout(Vec<String>),
    #[error("layout storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("popout window `{0}` could not be opened (blocked?)")]
    PopoutBlocked(String),
    #[error("window {0} is no longer registered")]
    WindowGone(WindowId),
}
