use serde::{Deserialize, Serialize};

use crate::layout_engine::DockLayoutConfig;
use crate::sys::window::WindowId;

/// Notifications for observers outside the docking machinery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum BroadcastEvent {
    LayoutChanged {
        window: WindowId,
        config: DockLayoutConfig,
    },
    WindowOpened {
        window: WindowId,
        name: String,
    },
    WindowClosed {
        window: WindowId,
    },
}

pub type BroadcastSender = crate::actor::Sender<BroadcastEvent>;
pub type BroadcastReceiver = crate::actor::Receiver<BroadcastEvent>;
