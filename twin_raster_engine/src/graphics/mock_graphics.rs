/// Mock backend for unit tests (no native API required)
///
/// Implements both `Graphics` and `BackendOps`, recording every native-level
/// call into a shared journal so tests can assert on ordering.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::graphics::{
    BackendId, BackendOps, BufferHandle, Graphics, GraphicsApi, GraphicsBase, MatrixConvention, MatrixSet,
    PresentationProperties, ProgramHandle, ProgramSource, TextureHandle, TextureImage, Vertex,
};
use crate::log::Log;
use crate::scene::Camera;

/// Shared call journal
pub type Journal = Rc<RefCell<Vec<String>>>;

pub struct MockGraphics {
    base: GraphicsBase,
    journal: Journal,
    /// Operation name that fails, e.g. "initialize" or "create_index_buffer"
    fail_on: Option<&'static str>,
    buffers: SlotMap<BufferHandle, usize>,
    textures: SlotMap<TextureHandle, (u32, u32)>,
    programs: SlotMap<ProgramHandle, String>,
    uploads: Vec<MatrixSet>,
    ortho: Mat4,
}

impl MockGraphics {
    pub fn new(api: GraphicsApi, log: Log) -> Self {
        Self {
            base: GraphicsBase::new(api, log),
            journal: Rc::new(RefCell::new(Vec::new())),
            fail_on: None,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            uploads: Vec::new(),
            ortho: Mat4::IDENTITY,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Mock already initialized with default properties
    pub fn ready(api: GraphicsApi) -> Self {
        let mut graphics = Self::new(api, Log::silent());
        graphics
            .initialize(&PresentationProperties::default())
            .expect("mock initialize");
        graphics
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn uploads(&self) -> &[MatrixSet] {
        &self.uploads
    }

    fn record(&self, command: impl Into<String>) {
        self.journal.borrow_mut().push(command.into());
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail_on == Some(operation) {
            return Err(Error::BackendError(format!("mock failure in {}", operation)));
        }
        Ok(())
    }
}

impl Graphics for MockGraphics {
    fn id(&self) -> BackendId {
        self.base.id()
    }

    fn api(&self) -> GraphicsApi {
        self.base.api()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn log(&self) -> &Log {
        self.base.log()
    }

    fn initialize(&mut self, properties: &PresentationProperties) -> Result<()> {
        if self.base.is_display_ready() {
            return Err(Error::runtime("MockGraphics", "initialize", "already initialized"));
        }
        self.base.set_properties(*properties);
        self.record("initialize");
        if let Err(e) = self.check("initialize") {
            self.shutdown();
            return Err(Error::InitializationFailed(e.to_string()));
        }
        self.ortho = Graphics::convention(self).orthographic(
            properties.screen_width as f32,
            properties.screen_height as f32,
            properties.screen_near,
            properties.screen_far,
        );
        self.base.set_display_ready(true);
        Ok(())
    }

    fn begin_scene(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        if !self.base.is_display_ready() {
            return;
        }
        self.record(format!("clear {} {} {} {}", red, green, blue, alpha));
    }

    fn end_scene(&mut self) {
        if !self.base.is_display_ready() {
            return;
        }
        self.record(format!("present vsync={}", self.base.properties().vsync));
    }

    fn shutdown(&mut self) {
        if !self.base.is_display_ready() && self.buffers.is_empty() && self.programs.is_empty() {
            return;
        }
        self.base.set_display_ready(false);
        self.buffers.clear();
        self.textures.clear();
        self.programs.clear();
        self.record("shutdown");
    }

    fn is_display_ready(&self) -> bool {
        self.base.is_display_ready()
    }

    fn properties(&self) -> &PresentationProperties {
        self.base.properties()
    }

    fn set_screen_dimensions(&mut self, width: i32, height: i32) {
        if self.base.update_dimensions(width, height) {
            self.record(format!("resize {}x{}", width, height));
        }
    }

    fn master_camera(&self) -> Option<Rc<RefCell<Camera>>> {
        self.base.master_camera()
    }

    fn set_master_camera(&mut self, camera: &Rc<RefCell<Camera>>) {
        self.base.set_master_camera(camera);
    }

    fn ortho_matrix(&self) -> Mat4 {
        self.ortho
    }

    fn convention(&self) -> MatrixConvention {
        match self.base.api() {
            GraphicsApi::Direct3D => MatrixConvention::LeftHanded,
            GraphicsApi::OpenGL => MatrixConvention::RightHanded,
        }
    }

    fn ops(&mut self) -> Result<&mut dyn BackendOps> {
        self.ensure_ready("ops")?;
        Ok(self)
    }
}

impl BackendOps for MockGraphics {
    fn convention(&self) -> MatrixConvention {
        Graphics::convention(self)
    }

    fn stage_extensions(&self) -> (&'static str, &'static str) {
        ("vs", "ps")
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle> {
        self.check("create_vertex_buffer")?;
        self.record(format!("create_vertex_buffer {}", vertices.len()));
        Ok(self.buffers.insert(vertices.len()))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle> {
        self.check("create_index_buffer")?;
        self.record(format!("create_index_buffer {}", indices.len()));
        Ok(self.buffers.insert(indices.len()))
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(buffer).is_some() {
            self.record("release_buffer");
        }
    }

    fn bind_buffers(&mut self, vertices: BufferHandle, indices: BufferHandle) -> Result<()> {
        if !self.buffers.contains_key(vertices) || !self.buffers.contains_key(indices) {
            return Err(Error::BackendError("unknown buffer".to_string()));
        }
        self.record("bind_buffers");
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.check("draw_indexed")?;
        self.record(format!("draw_indexed {}", index_count));
        Ok(())
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle> {
        self.check("create_texture")?;
        self.record(format!("create_texture {}x{}", image.width, image.height));
        Ok(self.textures.insert((image.width, image.height)))
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(texture).is_some() {
            self.record("release_texture");
        }
    }

    fn set_alpha_blending(&mut self, enabled: bool) -> Result<()> {
        self.record(format!("alpha_blending {}", enabled));
        Ok(())
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle> {
        self.check("compile_program")?;
        for (stage, text) in [("vertex", &source.vertex), ("fragment", &source.fragment)] {
            if !text.contains("main") {
                return Err(Error::ShaderCompilation {
                    shader: source.name.clone(),
                    diagnostic: format!("{} stage: entry point 'main' not found", stage),
                });
            }
        }
        self.record(format!("compile_program {}", source.name));
        Ok(self.programs.insert(source.name.clone()))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program).is_some() {
            self.record("release_program");
        }
    }

    fn use_program(&mut self, program: ProgramHandle, texture: Option<TextureHandle>) -> Result<()> {
        let name = self
            .programs
            .get(program)
            .cloned()
            .ok_or_else(|| Error::BackendError("unknown program".to_string()))?;
        self.record(format!("use_program {} texture={}", name, texture.is_some()));
        Ok(())
    }

    fn upload_matrices(&mut self, program: ProgramHandle, matrices: &MatrixSet) -> Result<()> {
        if !self.programs.contains_key(program) {
            return Err(Error::BackendError("unknown program".to_string()));
        }
        self.uploads.push(*matrices);
        self.record("upload_matrices");
        Ok(())
    }
}
