/// Model - a renderable mesh with attached shaders and a transform

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::{Error, Result};
use crate::graphics::{BackendId, BackendOps, BufferHandle, Graphics, Mesh, TextureHandle, TextureImage};
use crate::scene::Shader;

/// What `Model::initialize` uploads
#[derive(Debug, Clone)]
pub struct ModelDesc {
    pub mesh: Mesh,
    /// Diffuse texture file, if any
    pub texture: Option<PathBuf>,
    pub alpha_blending: bool,
}

impl Default for ModelDesc {
    fn default() -> Self {
        Self {
            mesh: Mesh::cube(),
            texture: None,
            alpha_blending: false,
        }
    }
}

/// Scale, then rotate, then translate, applied after `base`
///
/// In row-vector notation this is `W · S · R · T`: a vertex is transformed
/// by the base world matrix first and by the translation last.
/// `rotation` is (pitch, yaw, roll) in radians.
pub fn compose_world(base: &Mat4, scale: Vec3, rotation: Vec3, translation: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::YXZ, rotation.y, rotation.x, rotation.z);
    Mat4::from_translation(translation) * Mat4::from_quat(rotation) * Mat4::from_scale(scale) * *base
}

#[derive(Debug)]
pub struct Model {
    backend: BackendId,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    texture: Option<TextureHandle>,
    vertex_count: u32,
    index_count: u32,
    shaders: Vec<Weak<RefCell<Shader>>>,
    rotation: Vec3,
    translation: Vec3,
    scale: Vec3,
    alpha_blending: bool,
}

impl Model {
    /// Models are created through [`Graphics::create_model`]
    pub(crate) fn new(backend: BackendId) -> Self {
        Self {
            backend,
            vertex_buffer: None,
            index_buffer: None,
            texture: None,
            vertex_count: 0,
            index_count: 0,
            shaders: Vec::new(),
            rotation: Vec3::ZERO,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            alpha_blending: false,
        }
    }

    /// Upload the mesh, load the optional texture and attach `shader`
    ///
    /// On failure every buffer created so far is released.
    pub fn initialize(
        &mut self,
        graphics: &mut dyn Graphics,
        shader: &Rc<RefCell<Shader>>,
        desc: &ModelDesc,
    ) -> Result<()> {
        self.check_backend(graphics, "initialize")?;
        if self.vertex_buffer.is_some() {
            return Err(Error::runtime("Model", "initialize", "model already initialized"));
        }
        if desc.mesh.vertices.is_empty() || desc.mesh.indices.is_empty() {
            return Err(Error::invalid_argument("Model", "initialize", "mesh has no geometry"));
        }

        // Decode before touching the device so a bad file leaves nothing behind
        let image = match &desc.texture {
            Some(path) => Some(TextureImage::load(path)?),
            None => None,
        };

        self.attach_shader(shader)?;

        let log = graphics.log().clone();
        let ops = graphics.ops()?;
        if let Err(e) = self.upload(ops, &desc.mesh, image.as_ref()) {
            crate::engine_error!(log, "twinraster::Model", "Model upload failed: {}", e);
            self.release(ops);
            self.shaders.clear();
            return Err(e);
        }

        self.vertex_count = desc.mesh.vertex_count();
        self.index_count = desc.mesh.index_count();
        self.alpha_blending = desc.alpha_blending;
        Ok(())
    }

    /// Attach a shader created by the same backend (not owned)
    pub fn attach_shader(&mut self, shader: &Rc<RefCell<Shader>>) -> Result<()> {
        let shader_backend = shader
            .try_borrow()
            .map_err(|_| Error::runtime("Model", "attach_shader", "shader is busy"))?
            .backend();
        if shader_backend != self.backend {
            return Err(Error::invalid_argument(
                "Model",
                "attach_shader",
                "shader was created by a different backend",
            ));
        }
        self.shaders.push(Rc::downgrade(shader));
        Ok(())
    }

    pub fn detach_shaders(&mut self) {
        self.shaders.clear();
    }

    /// Draw the model with the backend's master camera
    ///
    /// The world matrix is pushed into the first attached shader, every
    /// attached shader binds its program, then the buffers are drawn. With no
    /// live shader attached the draw uses whatever program is bound.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a foreign backend, `Runtime` without a master
    /// camera or before `initialize`.
    pub fn render(&self, graphics: &mut dyn Graphics, _elapsed_ms: f32) -> Result<()> {
        self.check_backend(graphics, "render")?;

        let camera = graphics
            .master_camera()
            .ok_or_else(|| Error::runtime("Model", "render", "no master camera set on the backend"))?;
        let (vertices, indices) = match (self.vertex_buffer, self.index_buffer) {
            (Some(v), Some(i)) => (v, i),
            _ => return Err(Error::runtime("Model", "render", "model is not initialized")),
        };

        let (base, view, projection) = {
            let camera = camera
                .try_borrow()
                .map_err(|_| Error::runtime("Model", "render", "master camera is busy"))?;
            (*camera.world_matrix(), *camera.view_matrix(), *camera.projection_matrix())
        };
        let world = self.world_matrix(&base);

        let shaders: Vec<Rc<RefCell<Shader>>> = self.shaders.iter().filter_map(Weak::upgrade).collect();

        let ops = graphics.ops()?;
        if let Some(first) = shaders.first() {
            first.borrow_mut().set_world(world);
        }
        for shader in &shaders {
            shader.borrow().render(ops, &view, &projection, self.texture)?;
        }

        if self.alpha_blending {
            ops.set_alpha_blending(true)?;
        }
        ops.bind_buffers(vertices, indices)?;
        let drawn = ops.draw_indexed(self.index_count);
        if self.alpha_blending {
            ops.set_alpha_blending(false)?;
        }
        drawn
    }

    /// Release native buffers and reset counts. Safe to call more than once.
    pub fn shutdown(&mut self, graphics: &mut dyn Graphics) {
        if let Ok(ops) = graphics.ops() {
            self.release(ops);
        } else {
            // Backend already gone: its shutdown released everything
            self.vertex_buffer = None;
            self.index_buffer = None;
            self.texture = None;
        }
        self.vertex_count = 0;
        self.index_count = 0;
        self.shaders.clear();
    }

    fn upload(&mut self, ops: &mut dyn BackendOps, mesh: &Mesh, image: Option<&TextureImage>) -> Result<()> {
        self.vertex_buffer = Some(ops.create_vertex_buffer(&mesh.vertices)?);
        self.index_buffer = Some(ops.create_index_buffer(&mesh.indices)?);
        if let Some(image) = image {
            self.texture = Some(ops.create_texture(image)?);
        }
        Ok(())
    }

    fn release(&mut self, ops: &mut dyn BackendOps) {
        if let Some(texture) = self.texture.take() {
            ops.release_texture(texture);
        }
        if let Some(buffer) = self.index_buffer.take() {
            ops.release_buffer(buffer);
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            ops.release_buffer(buffer);
        }
    }

    fn check_backend(&self, graphics: &dyn Graphics, method: &'static str) -> Result<()> {
        if graphics.id() != self.backend {
            return Err(Error::invalid_argument(
                "Model",
                method,
                format!("model belongs to another backend than {}", graphics.name()),
            ));
        }
        Ok(())
    }

    /// World matrix for this model on top of `base`
    pub fn world_matrix(&self, base: &Mat4) -> Mat4 {
        compose_world(base, self.scale, self.rotation, self.translation)
    }

    // ===== TRANSFORM =====

    /// (pitch, yaw, roll) in radians
    pub fn rotate(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    pub fn translate(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    pub fn scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    // ===== GETTERS =====

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.iter().filter(|s| s.strong_count() > 0).count()
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    pub fn alpha_blending(&self) -> bool {
        self.alpha_blending
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
