//! Windowing / system collaborator contracts
//!
//! The windowing layer (window creation, message pump, key translation) is
//! provided by the application. The engine talks to it through [`System`]
//! and receives callbacks through [`SystemListener`].

mod timer;

#[cfg(test)]
pub(crate) mod mock_system;

pub use timer::{StopwatchTimer, Timer};

use std::path::PathBuf;

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::error::Result;
use crate::graphics::{GraphicsApi, PresentationProperties};

/// Keys the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    A,
    D,
    Q,
    E,
    Escape,
    F1,
    F2,
    Other(u32),
}

/// Snapshot of what a backend needs to know about the window
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    /// Native window the backend presents into, if any
    pub window: Option<RawWindowHandle>,
    /// Display connection the window lives on
    pub display: Option<RawDisplayHandle>,
    /// APIs the windowing layer can host
    pub supported_apis: Vec<GraphicsApi>,
    /// Root of the `Shaders/` and `Media/` directories
    pub application_directory: PathBuf,
}

impl SystemInfo {
    pub fn supports_api(&self, api: GraphicsApi) -> bool {
        self.supported_apis.contains(&api)
    }

    /// `<app-dir>/Shaders/<backend>/<name>.<extension>`
    pub fn shader_path(&self, backend: &str, name: &str, extension: &str) -> PathBuf {
        self.application_directory
            .join("Shaders")
            .join(backend)
            .join(format!("{}.{}", name, extension))
    }

    /// `<app-dir>/Media/<file>`
    pub fn media_path(&self, file: &str) -> PathBuf {
        self.application_directory.join("Media").join(file)
    }
}

/// Callbacks from the windowing layer into the engine
pub trait SystemListener {
    /// Called once per loop iteration with no pending OS event
    fn on_idle(&mut self) -> Result<()>;

    fn on_key_down(&mut self, key: Key);

    fn on_key_up(&mut self, key: Key);

    fn on_char(&mut self, character: char);

    /// Swap the active backend for `api` without touching the window
    fn on_graphics_reset(&mut self, api: GraphicsApi) -> Result<()>;

    fn on_window_resize(&mut self, width: u32, height: u32);
}

/// Windowing system: window ownership, message loop, environment queries
pub trait System {
    /// Create the window described by `properties`
    fn initialize(&mut self, properties: &PresentationProperties) -> Result<()>;

    /// Blocking message loop. Returns when the window is closed or a
    /// listener callback fails.
    fn run(&mut self, listener: &mut dyn SystemListener) -> Result<()>;

    /// Destroy the window. Idempotent.
    fn shutdown(&mut self);

    fn current_application_directory(&self) -> PathBuf;

    fn create_timer(&self) -> Box<dyn Timer>;

    /// Window and platform facts handed to the graphics factory
    fn info(&self) -> SystemInfo;
}
