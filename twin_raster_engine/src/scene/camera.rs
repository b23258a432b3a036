/// Camera - position, orientation and the view/projection/world matrices
///
/// Movement setters store rates (radians or units per second). The rates are
/// integrated in `render`, scaled by the frame's elapsed time.

use glam::{EulerRot, Mat3, Mat4, Vec3};

use crate::error::{Error, Result};
use crate::graphics::{BackendId, Graphics, MatrixConvention, PresentationProperties};

/// Vertical field of view used for every projection
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_4;

#[derive(Debug, Clone)]
pub struct Camera {
    backend: BackendId,
    convention: MatrixConvention,
    initialized: bool,

    // Movement intent (per second)
    yaw_rate: f32,
    pitch_rate: f32,
    roll_rate: f32,
    forward_rate: f32,
    strafe_rate: f32,

    position: Vec3,
    /// (pitch, yaw, roll) in radians
    orientation: Vec3,
    /// Look direction before orientation is applied
    look_at: Vec3,
    /// Up vector before orientation is applied
    up: Vec3,

    view: Mat4,
    projection: Mat4,
    world: Mat4,
    aspect_ratio: f32,
}

impl Camera {
    pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, -10.0);

    /// Cameras are created through [`Graphics::create_camera`]
    pub(crate) fn new(backend: BackendId, convention: MatrixConvention) -> Self {
        Self {
            backend,
            convention,
            initialized: false,
            yaw_rate: 0.0,
            pitch_rate: 0.0,
            roll_rate: 0.0,
            forward_rate: 0.0,
            strafe_rate: 0.0,
            position: Self::DEFAULT_POSITION,
            orientation: Vec3::ZERO,
            look_at: Vec3::Z,
            up: Vec3::Y,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            aspect_ratio: 0.0,
        }
    }

    /// Compute the projection from the backend's screen aspect and reset
    /// the world matrix to identity
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `graphics` is not the backend that created this
    /// camera, `Runtime` if it is not initialized.
    pub fn initialize(&mut self, graphics: &dyn Graphics) -> Result<()> {
        if graphics.id() != self.backend {
            return Err(Error::invalid_argument(
                "Camera",
                "initialize",
                format!("camera belongs to another backend than {}", graphics.name()),
            ));
        }
        graphics.ensure_ready("Camera::initialize")?;

        self.update_graphics_properties(graphics.properties());
        self.world = Mat4::IDENTITY;
        self.view = self.compute_view();
        self.initialized = true;
        Ok(())
    }

    /// Recompute the projection for new screen dimensions
    ///
    /// Called by the backend whenever its dimensions change.
    pub fn update_graphics_properties(&mut self, properties: &PresentationProperties) {
        let aspect = properties.aspect_ratio();
        if aspect <= 0.0 {
            return;
        }
        self.aspect_ratio = aspect;
        self.projection = self.convention.perspective(
            FIELD_OF_VIEW,
            aspect,
            properties.screen_near,
            properties.screen_far,
        );
    }

    /// Integrate the movement rates over `elapsed_ms` and rebuild the view
    pub fn render(&mut self, elapsed_ms: f32) {
        let dt = elapsed_ms.max(0.0) / 1000.0;

        self.orientation.x += self.pitch_rate * dt;
        self.orientation.y += self.yaw_rate * dt;
        self.orientation.z += self.roll_rate * dt;

        let (forward, up) = self.basis();
        let right = self.convention.right(forward, up);
        self.position += forward * self.forward_rate * dt + right * self.strafe_rate * dt;

        self.view = self.compute_view();
    }

    pub fn shutdown(&mut self) {
        self.initialized = false;
    }

    fn basis(&self) -> (Vec3, Vec3) {
        let rotation = Mat3::from_euler(
            EulerRot::YXZ,
            self.orientation.y,
            self.orientation.x,
            self.orientation.z,
        );
        (rotation * self.look_at, rotation * self.up)
    }

    fn compute_view(&self) -> Mat4 {
        let (forward, up) = self.basis();
        self.convention.look_at(self.position, self.position + forward, up)
    }

    // ===== MOVEMENT RATES =====

    pub fn set_yaw(&mut self, rate: f32) {
        self.yaw_rate = rate;
    }

    pub fn set_pitch(&mut self, rate: f32) {
        self.pitch_rate = rate;
    }

    pub fn set_roll(&mut self, rate: f32) {
        self.roll_rate = rate;
    }

    pub fn set_forward(&mut self, rate: f32) {
        self.forward_rate = rate;
    }

    pub fn set_strafe(&mut self, rate: f32) {
        self.strafe_rate = rate;
    }

    // ===== PLACEMENT =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// (pitch, yaw, roll) in radians
    pub fn set_orientation(&mut self, orientation: Vec3) {
        self.orientation = orientation;
    }

    // ===== GETTERS =====

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn convention(&self) -> MatrixConvention {
        self.convention
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    /// Current look direction (orientation applied)
    pub fn forward(&self) -> Vec3 {
        self.basis().0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Base world matrix models compose their transform onto
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
