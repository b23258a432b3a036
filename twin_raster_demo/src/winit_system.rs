//! winit-backed windowing system
//!
//! Owns the event loop and the window. The loop polls: every pass with no
//! pending event ends in `about_to_wait`, which drives one engine frame.

use std::path::PathBuf;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use twin_raster_engine::twinraster::log::Log;
use twin_raster_engine::twinraster::system::{Key, StopwatchTimer, System, SystemInfo, SystemListener, Timer};
use twin_raster_engine::twinraster::{Error, GraphicsApi, PresentationProperties, Result};
use twin_raster_engine::{engine_diag, engine_info, engine_warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

const SOURCE: &str = "twinraster::demo::WinitSystem";
const TITLE: &str = "TwinRaster";

pub struct WinitSystem {
    application_directory: PathBuf,
    log: Log,
    event_loop: Option<EventLoop<()>>,
    window: Option<Window>,
}

impl WinitSystem {
    pub fn new(application_directory: PathBuf, log: Log) -> Self {
        Self { application_directory, log, event_loop: None, window: None }
    }
}

impl System for WinitSystem {
    fn initialize(&mut self, properties: &PresentationProperties) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        let event_loop = match self.event_loop.take() {
            Some(event_loop) => event_loop,
            None => EventLoop::new().map_err(|e| Error::InitializationFailed(format!("event loop: {}", e)))?,
        };

        let mut attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(properties.screen_width, properties.screen_height));
        if properties.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        // The window must exist before the backend is built, which is
        // before the loop starts.
        #[allow(deprecated)]
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("window: {}", e)))?;

        engine_info!(
            self.log,
            SOURCE,
            "Window created ({}x{})",
            properties.screen_width,
            properties.screen_height
        );
        self.event_loop = Some(event_loop);
        self.window = Some(window);
        Ok(())
    }

    fn run(&mut self, listener: &mut dyn SystemListener) -> Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| Error::runtime("WinitSystem", "run", "event loop already consumed"))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut handler = LoopHandler { listener, log: &self.log, outcome: Ok(()) };
        event_loop
            .run_app(&mut handler)
            .map_err(|e| Error::BackendError(format!("event loop: {}", e)))?;
        handler.outcome
    }

    fn shutdown(&mut self) {
        if self.window.take().is_some() {
            engine_diag!(self.log, SOURCE, "Window destroyed");
        }
    }

    fn current_application_directory(&self) -> PathBuf {
        self.application_directory.clone()
    }

    fn create_timer(&self) -> Box<dyn Timer> {
        Box::new(StopwatchTimer::new())
    }

    fn info(&self) -> SystemInfo {
        let window = self
            .window
            .as_ref()
            .and_then(|window| window.window_handle().ok())
            .map(|handle| handle.as_raw());
        let display = self
            .window
            .as_ref()
            .and_then(|window| window.display_handle().ok())
            .map(|handle| handle.as_raw());

        let mut supported_apis = Vec::new();
        if cfg!(windows) {
            supported_apis.push(GraphicsApi::Direct3D);
        }
        supported_apis.push(GraphicsApi::OpenGL);

        SystemInfo { window, display, supported_apis, application_directory: self.application_directory.clone() }
    }
}

/// Forwards winit events to the engine listener for one `run`
struct LoopHandler<'a> {
    listener: &'a mut dyn SystemListener,
    log: &'a Log,
    outcome: Result<()>,
}

impl LoopHandler<'_> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        self.outcome = Err(error);
        event_loop.exit();
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };

        if event.state == ElementState::Released {
            if let Some(key) = translate_key(code) {
                self.listener.on_key_up(key);
            }
            return;
        }

        if let Some(text) = event.text.as_ref() {
            for character in text.chars().filter(|c| !c.is_control()) {
                self.listener.on_char(character);
            }
        }

        let Some(key) = translate_key(code) else {
            return;
        };
        self.listener.on_key_down(key);
        if event.repeat {
            return;
        }

        let reset = match key {
            Key::Escape => {
                event_loop.exit();
                return;
            }
            Key::F1 => GraphicsApi::Direct3D,
            Key::F2 => GraphicsApi::OpenGL,
            _ => return,
        };
        // The engine keeps the previous backend when a reset fails; a lost
        // backend surfaces on the next idle frame.
        if let Err(e) = self.listener.on_graphics_reset(reset) {
            engine_warn!(self.log, SOURCE, "Graphics reset to {} failed: {}", reset, e);
        }
    }
}

impl ApplicationHandler for LoopHandler<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!(self.log, SOURCE, "Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.listener.on_window_resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, event),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.outcome.is_err() {
            return;
        }
        if let Err(e) = self.listener.on_idle() {
            engine_warn!(self.log, SOURCE, "Frame failed, leaving the message loop");
            self.fail(event_loop, e);
        }
    }
}

/// Physical key to engine key. Keys the engine ignores map to `None`.
fn translate_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::Escape => Key::Escape,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        _ => return None,
    };
    Some(key)
}
