/// TwinRaster Engine - owns the windowing system, the active backend and
/// the camera/shader/model chain built on top of it
///
/// The engine is a small state machine:
///
/// ```text
/// Shutdown --initialize--> Initialized --run--> Running
///     ^                        |                   |
///     +-------shutdown---------+<--loop returns----+
/// ```
///
/// A graphics reset swaps the backend (and everything created by it) while
/// the window stays open.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::graphics::{Graphics, GraphicsApi, GraphicsFactory, Mesh, PresentationProperties};
use crate::log::Log;
use crate::scene::{Camera, Model, ModelDesc, Shader};
use crate::system::{Key, System, SystemInfo, SystemListener, Timer};

const SOURCE: &str = "twinraster::Engine";

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub presentation: PresentationProperties,
    /// Backend created by `initialize`
    pub api: GraphicsApi,
    pub clear_color: [f32; 4],
    /// Shader file stem under `Shaders/<backend>/`
    pub shader: String,
    /// Diffuse texture under `Media/`
    pub texture: Option<String>,
    pub alpha_blending: bool,
    /// Camera translation speed (units per second)
    pub move_speed: f32,
    /// Camera rotation speed (radians per second)
    pub turn_speed: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            presentation: PresentationProperties::default(),
            api: if cfg!(windows) { GraphicsApi::Direct3D } else { GraphicsApi::OpenGL },
            clear_color: [0.0, 0.0, 0.0, 1.0],
            shader: "Color".to_string(),
            texture: Some("stone.png".to_string()),
            alpha_blending: false,
            move_speed: 5.0,
            turn_speed: 1.5,
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Shutdown,
    Initialized,
    Running,
}

pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    log: Log,
    factory: GraphicsFactory,
    /// Taken out while `run` hands control to the message loop
    system: Option<Box<dyn System>>,
    system_info: Option<SystemInfo>,
    timer: Option<Box<dyn Timer>>,
    graphics: Option<Box<dyn Graphics>>,
    camera: Option<Rc<RefCell<Camera>>>,
    shader: Option<Rc<RefCell<Shader>>>,
    model: Option<Model>,
    pressed: FxHashSet<Key>,
}

impl Engine {
    pub fn new(config: EngineConfig, system: Box<dyn System>, factory: GraphicsFactory, log: Log) -> Self {
        Self {
            config,
            state: EngineState::Shutdown,
            log,
            factory,
            system: Some(system),
            system_info: None,
            timer: None,
            graphics: None,
            camera: None,
            shader: None,
            model: None,
            pressed: FxHashSet::default(),
        }
    }

    /// Log an error before handing it back to the caller
    fn log_and_return_error(&self, error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!(self.log, SOURCE, "Initialization failed: {}", msg);
            }
            _ => {
                crate::engine_error!(self.log, SOURCE, "Engine error: {}", error);
            }
        }
        error
    }

    /// Bring up window, timer, backend, camera, shader and model
    ///
    /// No-op unless the engine is shut down. On failure every partially
    /// created subsystem is released and the engine stays `Shutdown`.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != EngineState::Shutdown {
            return Ok(());
        }

        if let Err(e) = self.initialize_subsystems() {
            let e = self.log_and_return_error(e);
            self.shutdown();
            return Err(e);
        }

        self.state = EngineState::Initialized;
        crate::engine_info!(self.log, SOURCE, "Engine initialized with {}", self.config.api);
        Ok(())
    }

    fn initialize_subsystems(&mut self) -> Result<()> {
        let system = self
            .system
            .as_mut()
            .ok_or_else(|| Error::runtime("Engine", "initialize", "windowing system is in use"))?;

        system.initialize(&self.config.presentation)?;

        let mut timer = system.create_timer();
        timer.start();
        self.timer = Some(timer);
        self.system_info = Some(system.info());

        self.build_backend(self.config.api)
    }

    /// Create the backend for `api` and the chain that depends on it
    ///
    /// Order is fixed: backend, camera (master), shader, model.
    fn build_backend(&mut self, api: GraphicsApi) -> Result<()> {
        let result = self.build_chain(api);
        if result.is_err() {
            self.teardown_backend();
        }
        result
    }

    fn build_chain(&mut self, api: GraphicsApi) -> Result<()> {
        let info = self
            .system_info
            .clone()
            .ok_or_else(|| Error::runtime("Engine", "build_backend", "windowing system is not initialized"))?;

        let graphics = self.factory.create_graphics(api, &info, &self.log)?;
        let graphics = self.graphics.insert(graphics);
        graphics.initialize(&self.config.presentation)?;

        let camera = Rc::new(RefCell::new(graphics.create_camera()?));
        self.camera = Some(Rc::clone(&camera));
        camera.borrow_mut().initialize(&**graphics)?;
        graphics.set_master_camera(&camera);

        let shader = Rc::new(RefCell::new(graphics.create_shader()?));
        self.shader = Some(Rc::clone(&shader));
        shader.borrow_mut().initialize(&mut **graphics, &info, &self.config.shader)?;

        let desc = ModelDesc {
            mesh: Mesh::cube(),
            texture: self.config.texture.as_deref().map(|file| info.media_path(file)),
            alpha_blending: self.config.alpha_blending,
        };
        let model = self.model.insert(graphics.create_model()?);
        model.initialize(&mut **graphics, &shader, &desc)?;

        crate::engine_diag!(self.log, SOURCE, "{} backend chain ready", graphics.name());
        Ok(())
    }

    /// Release model, shader, camera and the backend itself
    fn teardown_backend(&mut self) {
        let model = self.model.take();
        let shader = self.shader.take();
        let camera = self.camera.take();

        if let Some(mut graphics) = self.graphics.take() {
            if let Some(mut model) = model {
                model.shutdown(&mut *graphics);
            }
            if let Some(shader) = shader {
                shader.borrow_mut().shutdown(&mut *graphics);
            }
            if let Some(camera) = camera {
                camera.borrow_mut().shutdown();
            }
            graphics.shutdown();
            crate::engine_diag!(self.log, SOURCE, "{} backend released", graphics.name());
        }
    }

    /// Hand control to the windowing system's message loop
    ///
    /// Returns when the window closes or a frame fails.
    pub fn run(&mut self) -> Result<()> {
        match self.state {
            EngineState::Initialized => {}
            EngineState::Running => {
                return Err(self.log_and_return_error(Error::runtime("Engine", "run", "engine is already running")));
            }
            EngineState::Shutdown => {
                return Err(self.log_and_return_error(Error::runtime("Engine", "run", "engine is not initialized")));
            }
        }

        let mut system = self
            .system
            .take()
            .ok_or_else(|| Error::runtime("Engine", "run", "windowing system is in use"))?;

        self.state = EngineState::Running;
        let result = system.run(self);
        self.system = Some(system);
        if self.state == EngineState::Running {
            self.state = EngineState::Initialized;
        }

        result.map_err(|e| self.log_and_return_error(e))
    }

    /// Release every subsystem and return to `Shutdown`. Idempotent.
    pub fn shutdown(&mut self) {
        let was_active = self.state != EngineState::Shutdown || self.graphics.is_some();

        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.teardown_backend();
        if let Some(system) = self.system.as_mut() {
            system.shutdown();
        }
        self.system_info = None;
        self.pressed.clear();
        self.state = EngineState::Shutdown;

        if was_active {
            crate::engine_info!(self.log, SOURCE, "Engine shut down");
        }
    }

    /// One frame: clear, move the camera, draw the model, present
    fn render_frame(&mut self, elapsed_ms: f32) -> Result<()> {
        let graphics = self
            .graphics
            .as_mut()
            .ok_or_else(|| Error::runtime("Engine", "on_idle", "no graphics backend"))?;
        let camera = self
            .camera
            .as_ref()
            .ok_or_else(|| Error::runtime("Engine", "on_idle", "no camera"))?;

        let [red, green, blue, alpha] = self.config.clear_color;
        graphics.begin_scene(red, green, blue, alpha);

        {
            let mut camera = camera.borrow_mut();
            apply_input(&mut camera, &self.pressed, self.config.move_speed, self.config.turn_speed);
            camera.render(elapsed_ms);
        }

        let drawn = match &self.model {
            Some(model) => model.render(&mut **graphics, elapsed_ms),
            None => Ok(()),
        };
        graphics.end_scene();
        drawn
    }

    // ===== GETTERS =====

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn active_api(&self) -> Option<GraphicsApi> {
        self.graphics.as_ref().map(|g| g.api())
    }

    pub fn graphics(&self) -> Option<&dyn Graphics> {
        self.graphics.as_deref()
    }

    pub fn camera(&self) -> Option<&Rc<RefCell<Camera>>> {
        self.camera.as_ref()
    }

    pub fn shader(&self) -> Option<&Rc<RefCell<Shader>>> {
        self.shader.as_ref()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }
}

/// Map held keys to camera rates
fn apply_input(camera: &mut Camera, pressed: &FxHashSet<Key>, move_speed: f32, turn_speed: f32) {
    let axis = |positive: Key, negative: Key| -> f32 {
        (pressed.contains(&positive) as i32 - pressed.contains(&negative) as i32) as f32
    };

    camera.set_yaw(axis(Key::Right, Key::Left) * turn_speed);
    camera.set_pitch(axis(Key::PageDown, Key::PageUp) * turn_speed);
    camera.set_roll(axis(Key::Q, Key::E) * turn_speed);
    camera.set_forward(axis(Key::Up, Key::Down) * move_speed);
    camera.set_strafe(axis(Key::D, Key::A) * move_speed);
}

impl SystemListener for Engine {
    fn on_idle(&mut self) -> Result<()> {
        let elapsed = match self.timer.as_mut() {
            Some(timer) => {
                timer.run();
                timer.elapsed_time()
            }
            None => 0.0,
        };
        self.render_frame(elapsed)
    }

    fn on_key_down(&mut self, key: Key) {
        self.pressed.insert(key);
    }

    fn on_key_up(&mut self, key: Key) {
        self.pressed.remove(&key);
    }

    fn on_char(&mut self, character: char) {
        crate::engine_trace!(self.log, SOURCE, "Character input '{}'", character);
    }

    /// Swap to `api` without touching the window
    ///
    /// Same API is a no-op. If the new backend cannot be built the previous
    /// API is brought back so frames keep flowing, and the failure is still
    /// returned to the caller.
    fn on_graphics_reset(&mut self, api: GraphicsApi) -> Result<()> {
        if self.state == EngineState::Shutdown {
            return Err(self.log_and_return_error(Error::runtime(
                "Engine",
                "on_graphics_reset",
                "engine is not initialized",
            )));
        }

        let previous = self.active_api();
        if previous == Some(api) {
            crate::engine_diag!(self.log, SOURCE, "{} already active, reset ignored", api);
            return Ok(());
        }

        crate::engine_info!(self.log, SOURCE, "Graphics reset to {}", api);
        self.teardown_backend();

        let Err(e) = self.build_backend(api) else {
            return Ok(());
        };
        let e = self.log_and_return_error(e);

        if let Some(previous) = previous {
            crate::engine_warn!(self.log, SOURCE, "Restoring {} after failed reset", previous);
            if let Err(restore) = self.build_backend(previous) {
                self.log_and_return_error(restore);
            }
        }
        Err(e)
    }

    fn on_window_resize(&mut self, width: u32, height: u32) {
        if let Some(graphics) = self.graphics.as_mut() {
            let width = i32::try_from(width).unwrap_or(i32::MAX);
            let height = i32::try_from(height).unwrap_or(i32::MAX);
            graphics.set_screen_dimensions(width, height);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
