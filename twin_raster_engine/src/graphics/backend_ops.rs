/// BackendOps - the native capability set shared by Camera, Model and Shader
///
/// Cameras, models and shaders are single concrete types. Everything that
/// differs between native APIs (buffer creation, draw submission, program
/// compilation, matrix upload) goes through this trait, reached via
/// [`Graphics::ops`](crate::graphics::Graphics::ops).

use glam::{Mat4, Vec3};
use slotmap::new_key_type;

use crate::error::Result;
use crate::graphics::{TextureImage, Vertex};

new_key_type! {
    /// Backend-owned vertex or index buffer
    pub struct BufferHandle;
    /// Backend-owned sampled texture
    pub struct TextureHandle;
    /// Backend-owned compiled vertex + fragment program
    pub struct ProgramHandle;
}

/// Matrix math convention of a backend
///
/// Both conventions compute glam column-vector matrices. They differ in
/// handedness, depth range and whether matrices are transposed on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixConvention {
    /// Left-handed, depth 0..1, transposed on upload
    LeftHanded,
    /// Right-handed, depth -1..1, uploaded as-is
    RightHanded,
}

impl MatrixConvention {
    pub fn perspective(self, fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        match self {
            MatrixConvention::LeftHanded => Mat4::perspective_lh(fov_y, aspect, near, far),
            MatrixConvention::RightHanded => Mat4::perspective_rh_gl(fov_y, aspect, near, far),
        }
    }

    pub fn look_at(self, eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        match self {
            MatrixConvention::LeftHanded => Mat4::look_at_lh(eye, target, up),
            MatrixConvention::RightHanded => Mat4::look_at_rh(eye, target, up),
        }
    }

    /// Screen-sized orthographic projection centered on the origin
    pub fn orthographic(self, width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        let (half_w, half_h) = (width * 0.5, height * 0.5);
        match self {
            MatrixConvention::LeftHanded => {
                Mat4::orthographic_lh(-half_w, half_w, -half_h, half_h, near, far)
            }
            MatrixConvention::RightHanded => {
                Mat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }

    /// Direction to the camera's right, given where it looks and its up vector
    pub fn right(self, forward: Vec3, up: Vec3) -> Vec3 {
        match self {
            MatrixConvention::LeftHanded => up.cross(forward).normalize_or_zero(),
            MatrixConvention::RightHanded => forward.cross(up).normalize_or_zero(),
        }
    }

    /// Whether the shader constant upload must transpose
    pub fn transpose_on_upload(self) -> bool {
        matches!(self, MatrixConvention::LeftHanded)
    }

    /// Column-major floats ready for the native upload call
    pub fn upload_layout(self, matrix: &Mat4) -> [f32; 16] {
        if self.transpose_on_upload() {
            matrix.transpose().to_cols_array()
        } else {
            matrix.to_cols_array()
        }
    }
}

/// Matrices uploaded to a program each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixSet {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for MatrixSet {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// Source text of both program stages, already read from disk
#[derive(Debug, Clone)]
pub struct ProgramSource {
    /// Shader name (file stem), used in diagnostics
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

/// Native operations a backend exposes to cameras, models and shaders
///
/// Handles returned here stay valid until released or until the backend
/// shuts down, whichever comes first.
pub trait BackendOps {
    /// Matrix convention of this backend
    fn convention(&self) -> MatrixConvention;

    /// File extensions of the vertex and fragment stages (without the dot)
    fn stage_extensions(&self) -> (&'static str, &'static str);

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle>;

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Bind a vertex/index buffer pair for the next draw
    fn bind_buffers(&mut self, vertices: BufferHandle, indices: BufferHandle) -> Result<()>;

    /// Draw `index_count` indices from the bound buffers with the bound program
    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle>;

    fn release_texture(&mut self, texture: TextureHandle);

    fn set_alpha_blending(&mut self, enabled: bool) -> Result<()>;

    /// Compile and link both stages
    ///
    /// # Errors
    ///
    /// `Error::ShaderCompilation` carrying the native compiler output.
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle>;

    fn release_program(&mut self, program: ProgramHandle);

    /// Make `program` current and bind `texture` to its sampler
    fn use_program(&mut self, program: ProgramHandle, texture: Option<TextureHandle>) -> Result<()>;

    /// Upload world/view/projection to `program`, transposing if required
    fn upload_matrices(&mut self, program: ProgramHandle, matrices: &MatrixSet) -> Result<()>;
}

#[cfg(test)]
#[path = "backend_ops_tests.rs"]
mod tests;
