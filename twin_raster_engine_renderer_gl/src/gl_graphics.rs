/// GlGraphics - OpenGL-style implementation of the Graphics trait
///
/// Owns the window surface, the rendering context and every GL object
/// created through [`BackendOps`]. Matrices are right-handed and uploaded
/// column-major without transpose.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use raw_window_handle::RawWindowHandle;
use slotmap::SlotMap;
use twin_raster_engine::twinraster::graphics::{
    BackendId, BackendOps, BufferHandle, GraphicsBase, MatrixConvention, MatrixSet, ProgramHandle, ProgramSource,
    TextureHandle, TextureImage, Vertex,
};
use twin_raster_engine::twinraster::log::Log;
use twin_raster_engine::twinraster::scene::Camera;
use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{Error, Graphics, GraphicsApi, PresentationProperties, Result};
use twin_raster_engine::{engine_bail, engine_diag, engine_error, engine_info, engine_warn};

use crate::gl_bootstrap::ExtensionLoader;
use crate::gl_driver::{
    AttributeLayout, BufferTarget, ContextHandle, ContextKind, GlDriver, GlExtensions, GlName, ShaderStage,
    StringName, SurfaceHandle,
};

const SOURCE: &str = "twinraster::gl";

/// Vertex attributes, bound by location before linking
pub const ATTRIBUTES: [(u32, &str, i32, u32); 3] = [
    (0, "inputPosition", 3, Vertex::POSITION_OFFSET),
    (1, "inputColor", 4, Vertex::COLOR_OFFSET),
    (2, "inputTexCoord", 2, Vertex::UV_OFFSET),
];

pub const WORLD_UNIFORM: &str = "worldMatrix";
pub const VIEW_UNIFORM: &str = "viewMatrix";
pub const PROJECTION_UNIFORM: &str = "projectionMatrix";
pub const TEXTURE_UNIFORM: &str = "shaderTexture";

#[derive(Debug, Clone, Copy)]
struct GlBuffer {
    name: GlName,
    target: BufferTarget,
}

#[derive(Debug, Clone, Copy)]
struct GlProgram {
    program: GlName,
    vertex_shader: GlName,
    fragment_shader: GlName,
    world: Option<i32>,
    view: Option<i32>,
    projection: Option<i32>,
    texture: Option<i32>,
}

pub struct GlGraphics {
    base: GraphicsBase,
    driver: Box<dyn GlDriver>,
    window: Option<RawWindowHandle>,
    loader: ExtensionLoader,

    surface: Option<SurfaceHandle>,
    context: Option<ContextHandle>,
    context_kind: Option<ContextKind>,
    vertex_array: Option<GlName>,
    video_card: Option<[String; 3]>,

    ortho: Mat4,

    buffers: SlotMap<BufferHandle, GlBuffer>,
    textures: SlotMap<TextureHandle, GlName>,
    programs: SlotMap<ProgramHandle, GlProgram>,
}

impl GlGraphics {
    /// Uninitialized backend presenting into the window described by `system`
    pub fn new(driver: Box<dyn GlDriver>, system: &SystemInfo, log: Log) -> Self {
        Self {
            base: GraphicsBase::new(GraphicsApi::OpenGL, log),
            driver,
            window: system.window,
            loader: ExtensionLoader::new(),
            surface: None,
            context: None,
            context_kind: None,
            vertex_array: None,
            video_card: None,
            ortho: Mat4::IDENTITY,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
        }
    }

    /// Creation path of the current context
    pub fn context_kind(&self) -> Option<ContextKind> {
        self.context_kind
    }

    pub fn extension_loader(&self) -> &ExtensionLoader {
        &self.loader
    }

    fn create_resources(&mut self, properties: &PresentationProperties) -> Result<()> {
        let surface = self.driver.create_surface(self.window)?;
        self.surface = Some(surface);

        let log = self.base.log().clone();
        self.loader.bootstrap(self.driver.as_mut(), &log)?;
        let (context, kind) = self
            .loader
            .create_real_context(self.driver.as_mut(), surface, properties, &log)?;
        self.context = Some(context);
        self.context_kind = Some(kind);
        self.driver
            .resize_surface(surface, properties.screen_width, properties.screen_height)?;
        self.driver.make_current(Some((surface, context)))?;

        if self.loader.extensions().contains(GlExtensions::SWAP_CONTROL) {
            self.driver.set_swap_interval(if properties.vsync { 1 } else { 0 })?;
        } else if properties.vsync {
            engine_warn!(log, SOURCE, "Swap control unavailable, vsync left to the driver");
        }

        self.video_card = Some([
            self.driver.get_string(StringName::Vendor),
            self.driver.get_string(StringName::Renderer),
            self.driver.get_string(StringName::Version),
        ]);

        self.driver.clear_depth(1.0);
        self.driver.set_depth_test(true);
        self.driver.set_cull_back_faces(true);
        self.driver.set_blending(false);

        let vertex_array = self.driver.gen_vertex_array()?;
        self.vertex_array = Some(vertex_array);
        self.driver.bind_vertex_array(Some(vertex_array));

        self.driver.viewport(properties.screen_width, properties.screen_height);
        self.ortho = MatrixConvention::RightHanded.orthographic(
            properties.screen_width as f32,
            properties.screen_height as f32,
            properties.screen_near,
            properties.screen_far,
        );
        Ok(())
    }

    fn delete_program_objects(&mut self, program: &GlProgram) {
        self.driver.detach_shader(program.program, program.vertex_shader);
        self.driver.detach_shader(program.program, program.fragment_shader);
        self.driver.delete_shader(program.vertex_shader);
        self.driver.delete_shader(program.fragment_shader);
        self.driver.delete_program(program.program);
    }

    /// Compile both stages, bind attribute locations, link, resolve uniforms
    fn build_program(&mut self, source: &ProgramSource) -> Result<GlProgram> {
        let vertex_shader = self
            .driver
            .compile_shader(ShaderStage::Vertex, &source.vertex)
            .map_err(|diagnostic| Error::ShaderCompilation {
                shader: format!("{}.vert", source.name),
                diagnostic,
            })?;

        let fragment_shader = match self.driver.compile_shader(ShaderStage::Fragment, &source.fragment) {
            Ok(shader) => shader,
            Err(diagnostic) => {
                self.driver.delete_shader(vertex_shader);
                return Err(Error::ShaderCompilation {
                    shader: format!("{}.frag", source.name),
                    diagnostic,
                });
            }
        };

        let program = match self.driver.create_program() {
            Ok(program) => program,
            Err(e) => {
                self.driver.delete_shader(fragment_shader);
                self.driver.delete_shader(vertex_shader);
                return Err(e);
            }
        };
        self.driver.attach_shader(program, vertex_shader);
        self.driver.attach_shader(program, fragment_shader);
        for (index, name, _, _) in ATTRIBUTES {
            self.driver.bind_attribute_location(program, index, name);
        }

        let mut linked = GlProgram {
            program,
            vertex_shader,
            fragment_shader,
            world: None,
            view: None,
            projection: None,
            texture: None,
        };
        if let Err(diagnostic) = self.driver.link_program(program) {
            self.delete_program_objects(&linked);
            return Err(Error::ShaderCompilation {
                shader: source.name.clone(),
                diagnostic,
            });
        }

        linked.world = self.driver.uniform_location(program, WORLD_UNIFORM);
        linked.view = self.driver.uniform_location(program, VIEW_UNIFORM);
        linked.projection = self.driver.uniform_location(program, PROJECTION_UNIFORM);
        linked.texture = self.driver.uniform_location(program, TEXTURE_UNIFORM);
        Ok(linked)
    }

    fn program(&self, program: ProgramHandle, method: &'static str) -> Result<GlProgram> {
        self.programs
            .get(program)
            .copied()
            .ok_or_else(|| Error::invalid_argument("GlGraphics", method, "unknown program"))
    }
}

impl Graphics for GlGraphics {
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
            return Err(Error::runtime("GlGraphics", "initialize", "already initialized"));
        }
        self.base.set_properties(*properties);

        if let Err(e) = self.create_resources(properties) {
            engine_error!(self.base.log(), SOURCE, "OpenGL initialization failed: {}", e);
            self.shutdown();
            return Err(Error::InitializationFailed(format!("OpenGL: {}", e)));
        }

        self.base.set_display_ready(true);
        engine_info!(
            self.base.log(),
            SOURCE,
            "OpenGL ready: {}x{}, vsync {}, context {:?}",
            properties.screen_width,
            properties.screen_height,
            properties.vsync,
            self.context_kind
        );
        Ok(())
    }

    fn begin_scene(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        if !self.base.is_display_ready() {
            return;
        }
        self.driver.clear([red, green, blue, alpha]);
    }

    fn end_scene(&mut self) {
        if !self.base.is_display_ready() {
            return;
        }
        let Some(surface) = self.surface else {
            return;
        };
        if let Err(e) = self.driver.swap_buffers(surface) {
            engine_warn!(self.base.log(), SOURCE, "Swap buffers failed: {}", e);
        }
    }

    fn shutdown(&mut self) {
        self.base.set_display_ready(false);
        let was_live = self.context.is_some();

        // GL objects can only be deleted while the context is current
        if was_live {
            let programs: Vec<GlProgram> = self.programs.drain().map(|(_, p)| p).collect();
            for program in &programs {
                self.delete_program_objects(program);
            }
            let textures: Vec<GlName> = self.textures.drain().map(|(_, t)| t).collect();
            for texture in textures {
                self.driver.delete_texture(texture);
            }
            let buffers: Vec<GlBuffer> = self.buffers.drain().map(|(_, b)| b).collect();
            for buffer in buffers {
                self.driver.delete_buffer(buffer.name);
            }
            if let Some(vertex_array) = self.vertex_array.take() {
                self.driver.bind_vertex_array(None);
                self.driver.delete_vertex_array(vertex_array);
            }
        } else {
            self.programs.clear();
            self.textures.clear();
            self.buffers.clear();
            self.vertex_array = None;
        }

        if let Some(context) = self.context.take() {
            if let Err(e) = self.driver.make_current(None) {
                engine_warn!(self.base.log(), SOURCE, "Releasing the context failed: {}", e);
            }
            self.driver.delete_context(context);
        }
        if let Some(surface) = self.surface.take() {
            self.driver.destroy_surface(surface);
        }

        self.context_kind = None;
        self.video_card = None;

        if was_live {
            engine_info!(self.base.log(), SOURCE, "OpenGL shut down");
        }
    }

    fn is_display_ready(&self) -> bool {
        self.base.is_display_ready()
    }

    fn properties(&self) -> &PresentationProperties {
        self.base.properties()
    }

    fn set_screen_dimensions(&mut self, width: i32, height: i32) {
        if !self.base.update_dimensions(width, height) || !self.base.is_display_ready() {
            return;
        }
        let properties = *self.base.properties();
        if let Some(surface) = self.surface {
            if let Err(e) = self
                .driver
                .resize_surface(surface, properties.screen_width, properties.screen_height)
            {
                engine_warn!(self.base.log(), SOURCE, "Surface resize failed: {}", e);
            }
        }
        self.driver.viewport(properties.screen_width, properties.screen_height);
        self.ortho = MatrixConvention::RightHanded.orthographic(
            properties.screen_width as f32,
            properties.screen_height as f32,
            properties.screen_near,
            properties.screen_far,
        );
        engine_diag!(self.base.log(), SOURCE, "Viewport resized to {}x{}", width, height);
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

    /// Vendor, renderer and version strings
    fn video_card_info(&self) -> Result<Vec<String>> {
        self.video_card
            .as_ref()
            .map(|strings| strings.to_vec())
            .ok_or_else(|| Error::runtime("GlGraphics", "video_card_info", "backend is not initialized"))
    }

    fn convention(&self) -> MatrixConvention {
        MatrixConvention::RightHanded
    }

    fn ops(&mut self) -> Result<&mut dyn BackendOps> {
        self.ensure_ready("ops")?;
        Ok(self)
    }
}

impl BackendOps for GlGraphics {
    fn convention(&self) -> MatrixConvention {
        MatrixConvention::RightHanded
    }

    fn stage_extensions(&self) -> (&'static str, &'static str) {
        ("vert", "frag")
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle> {
        let name = self.driver.gen_buffer(BufferTarget::Array, bytemuck::cast_slice(vertices))?;
        Ok(self.buffers.insert(GlBuffer { name, target: BufferTarget::Array }))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle> {
        let name = self
            .driver
            .gen_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(indices))?;
        Ok(self.buffers.insert(GlBuffer { name, target: BufferTarget::ElementArray }))
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(buffer) {
            self.driver.delete_buffer(buffer.name);
        }
    }

    fn bind_buffers(&mut self, vertices: BufferHandle, indices: BufferHandle) -> Result<()> {
        let (Some(vertices), Some(indices)) = (self.buffers.get(vertices).copied(), self.buffers.get(indices).copied())
        else {
            return Err(Error::invalid_argument("GlGraphics", "bind_buffers", "unknown buffer"));
        };
        if vertices.target != BufferTarget::Array || indices.target != BufferTarget::ElementArray {
            return Err(Error::invalid_argument("GlGraphics", "bind_buffers", "buffer roles swapped"));
        }

        self.driver.bind_vertex_array(self.vertex_array);
        self.driver.bind_buffer(BufferTarget::Array, vertices.name);
        for (index, _, components, offset) in ATTRIBUTES {
            self.driver.vertex_attribute(&AttributeLayout {
                index,
                components,
                stride: Vertex::STRIDE,
                offset,
            });
        }
        self.driver.bind_buffer(BufferTarget::ElementArray, indices.name);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.driver.draw_elements(index_count)
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle> {
        let name = self.driver.gen_texture(image.width, image.height, &image.pixels)?;
        Ok(self.textures.insert(name))
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(name) = self.textures.remove(texture) {
            self.driver.delete_texture(name);
        }
    }

    fn set_alpha_blending(&mut self, enabled: bool) -> Result<()> {
        self.driver.set_blending(enabled);
        Ok(())
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle> {
        let program = self.build_program(source)?;
        Ok(self.programs.insert(program))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if let Some(program) = self.programs.remove(program) {
            self.delete_program_objects(&program);
        }
    }

    fn use_program(&mut self, program: ProgramHandle, texture: Option<TextureHandle>) -> Result<()> {
        let program = self.program(program, "use_program")?;
        let texture = match texture {
            Some(handle) => Some(
                *self
                    .textures
                    .get(handle)
                    .ok_or_else(|| Error::invalid_argument("GlGraphics", "use_program", "unknown texture"))?,
            ),
            None => None,
        };

        self.driver.use_program(program.program);
        if let Some(texture) = texture {
            self.driver.bind_texture(0, texture);
            if let Some(location) = program.texture {
                self.driver.uniform_int(location, 0);
            }
        }
        Ok(())
    }

    fn upload_matrices(&mut self, program: ProgramHandle, matrices: &MatrixSet) -> Result<()> {
        let program = self.program(program, "upload_matrices")?;
        let convention = MatrixConvention::RightHanded;

        let uniforms = [
            (WORLD_UNIFORM, program.world, &matrices.world),
            (VIEW_UNIFORM, program.view, &matrices.view),
            (PROJECTION_UNIFORM, program.projection, &matrices.projection),
        ];
        for (name, location, matrix) in uniforms {
            let Some(location) = location else {
                engine_bail!(self.base.log(), SOURCE, "uniform '{}' not found in program", name);
            };
            // upload_layout is already in the order the uniform expects
            self.driver.uniform_matrix4(location, false, &convention.upload_layout(matrix));
        }
        Ok(())
    }
}

impl Drop for GlGraphics {
    fn drop(&mut self) {
        self.shutdown();
    }
}
