use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::window as window_actor;
use crate::common::config::PopoutSettings;
use crate::common::error::DockError;
use crate::layout_engine::DockLayoutConfig;
use crate::sys::geometry::{Point, Rect, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    pub const MAIN: WindowId = WindowId(0);
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Where a window's client area sits on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    /// Screen position of the client area's top-left corner.
    pub client_origin: Point,
    pub inner: Size,
}

impl WindowFrame {
    pub fn new(client_origin: Point, inner: Size) -> Self { Self { client_origin, inner } }

    pub fn to_client(&self, screen: Point) -> Point {
        Point::new(screen.x - self.client_origin.x, screen.y - self.client_origin.y)
    }

    pub fn contains_screen(&self, screen: Point) -> bool {
        Rect::new(Point::default(), self.inner).contains(self.to_client(screen))
    }
}

/// The feature string handed to the platform when opening a popout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowFeatures {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for WindowFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "menubar=no,scrollbars=no,status=no,titlebar=no,toolbar=no,top={:.0},left={:.0},width={},height={}",
            self.top, self.left, self.width, self.height
        )
    }
}

#[derive(Clone, Debug)]
pub struct PopoutRequest {
    /// Id the new window will be registered under.
    pub window: WindowId,
    pub name: String,
    pub features: WindowFeatures,
    pub layout: DockLayoutConfig,
    /// Bootstrap document for hosts that render into a blank window.
    pub document: String,
}

impl PopoutRequest {
    pub fn new(
        window: WindowId,
        screen: Point,
        layout: DockLayoutConfig,
        settings: &PopoutSettings,
    ) -> Result<Self, DockError> {
        let document = bootstrap_document(&layout.to_json()?, settings);
        Ok(Self {
            window,
            name: format!("dock-popout-{}", window.0),
            features: WindowFeatures {
                top: screen.y,
                left: screen.x,
                width: settings.width,
                height: settings.height,
            },
            layout,
            document,
        })
    }

    /// Frame the popout is expected to occupy until the host reports otherwise.
    pub fn frame(&self) -> WindowFrame {
        WindowFrame::new(
            Point::new(self.features.left, self.features.top),
            Size::new(self.features.width, self.features.height),
        )
    }
}

/// Builds the page a popout boots from: the host's stylesheets and scripts,
/// then the serialized layout it should show.
pub fn bootstrap_document(layout_json: &str, settings: &PopoutSettings) -> String {
    let mut head = Vec::new();
    for href in &settings.stylesheets {
        head.push(format!(
            "<link rel='stylesheet' type='text/css' href='{}' />",
            escape_attr(href)
        ));
    }
    for src in &settings.scripts {
        head.push(format!("<script src='{}'></script>", escape_attr(src)));
    }
    let layout = layout_json.replace("</", "<\\/");
    format!(
        "<html><head>{}\n<script>var layout = {layout};</script></head>\
         <body style='padding: 0; margin: 0; border: 0'>\
         <div style='width: 100%; height: 100%' class='dock-root' id='root'></div></body></html>",
        head.join("\n")
    )
}

fn escape_attr(s: &str) -> String { s.replace('\'', "%27") }

pub struct OpenedWindow {
    pub frame: WindowFrame,
    pub requests: window_actor::Sender,
}

/// Opens and closes top-level windows on behalf of the coordinator. An
/// error from `open` is treated like a blocked pop-up.
pub trait WindowOpener {
    fn open(&mut self, request: PopoutRequest) -> Result<OpenedWindow, DockError>;
    fn close(&mut self, window: WindowId, name: &str);
}
