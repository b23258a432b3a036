/// Graphics trait - the capability every native backend satisfies

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;

use crate::error::{Error, Result};
use crate::graphics::{BackendOps, GraphicsApi, MatrixConvention, PresentationProperties};
use crate::log::Log;
use crate::scene::{Camera, Model, Shader};

/// Identity of one backend instance
///
/// Cameras, models and shaders remember the backend that created them and
/// refuse to work with any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(u64);

impl BackendId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BackendId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Main graphics trait
///
/// Implemented by backend-specific graphics classes (Direct3D-style and
/// OpenGL-style). The engine holds exactly one boxed instance at a time.
///
/// Lifecycle: constructed by the factory, initialized, resized zero or more
/// times, shut down (idempotent), dropped. `initialize` may run again after
/// `shutdown`.
pub trait Graphics {
    fn id(&self) -> BackendId;

    fn api(&self) -> GraphicsApi;

    /// Backend name, e.g. "Direct3D"
    fn name(&self) -> &str;

    /// Logging capability this backend was constructed with
    fn log(&self) -> &Log;

    /// Allocate the native device and every surface-dependent resource
    ///
    /// On failure, partial state is released before returning and the
    /// backend is left not ready.
    fn initialize(&mut self, properties: &PresentationProperties) -> Result<()>;

    /// Clear color and depth/stencil targets. No-op if not ready.
    fn begin_scene(&mut self, red: f32, green: f32, blue: f32, alpha: f32);

    /// Present the frame, honoring vsync. No-op if not ready.
    fn end_scene(&mut self);

    /// Release every native resource. Idempotent.
    fn shutdown(&mut self);

    fn is_display_ready(&self) -> bool;

    fn properties(&self) -> &PresentationProperties;

    fn screen_width(&self) -> u32 {
        self.properties().screen_width
    }

    fn screen_height(&self) -> u32 {
        self.properties().screen_height
    }

    /// Resize the presentation surface
    ///
    /// No-op when `height <= 0` or `width <= 0`. Otherwise updates the
    /// stored properties, refreshes the master camera projection and
    /// rebuilds the window-sized resources.
    fn set_screen_dimensions(&mut self, width: i32, height: i32);

    /// Camera currently used for view/projection, if still alive
    fn master_camera(&self) -> Option<Rc<RefCell<Camera>>>;

    /// Observe `camera` as master camera (the backend never owns it)
    fn set_master_camera(&mut self, camera: &Rc<RefCell<Camera>>);

    /// Orthographic projection sized to the screen, for 2D overlays
    fn ortho_matrix(&self) -> Mat4;

    /// Adapter / driver description
    fn video_card_info(&self) -> Result<Vec<String>> {
        Err(Error::NotSupported(format!("{} does not report video card info", self.name())))
    }

    fn convention(&self) -> MatrixConvention;

    /// Native capability accessor used by cameras, models and shaders
    ///
    /// # Errors
    ///
    /// `Runtime` if the backend is not display-ready.
    fn ops(&mut self) -> Result<&mut dyn BackendOps>;

    /// Create a camera bound to this backend
    ///
    /// # Errors
    ///
    /// `Runtime` before a successful `initialize`.
    fn create_camera(&self) -> Result<Camera> {
        self.ensure_ready("create_camera")?;
        Ok(Camera::new(self.id(), self.convention()))
    }

    fn create_model(&self) -> Result<Model> {
        self.ensure_ready("create_model")?;
        Ok(Model::new(self.id()))
    }

    fn create_shader(&self) -> Result<Shader> {
        self.ensure_ready("create_shader")?;
        Ok(Shader::new(self.id()))
    }

    #[doc(hidden)]
    fn ensure_ready(&self, method: &'static str) -> Result<()> {
        if self.is_display_ready() {
            Ok(())
        } else {
            Err(Error::runtime(
                "Graphics",
                method,
                format!("{} backend is not initialized", self.name()),
            ))
        }
    }
}
