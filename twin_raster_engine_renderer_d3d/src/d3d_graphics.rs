/// D3dGraphics - Direct3D-style implementation of the Graphics trait
///
/// Owns the device, swap chain, window-sized views and render states, plus
/// every buffer, texture and program created through [`BackendOps`].
/// Matrices are left-handed and transposed on upload.

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
use twin_raster_engine::{engine_diag, engine_error, engine_info, engine_warn};

use crate::d3d_driver::{
    BufferKind, CullMode, D3dDriver, DeviceObjects, DisplayMode, ElementFormat, InputElement, NativeHandle, ProgramBinding,
    RasterizerDesc, Rational, SwapChainDesc,
};

const SOURCE: &str = "twinraster::d3d";

/// Vertex input layout matching [`Vertex`]
pub const INPUT_LAYOUT: [InputElement; 3] = [
    InputElement { semantic: "POSITION", format: ElementFormat::R32G32B32Float, offset: Vertex::POSITION_OFFSET },
    InputElement { semantic: "COLOR", format: ElementFormat::R32G32B32A32Float, offset: Vertex::COLOR_OFFSET },
    InputElement { semantic: "TEXCOORD", format: ElementFormat::R32G32Float, offset: Vertex::UV_OFFSET },
];

pub const VERTEX_ENTRY_POINT: &str = "VSMain";
pub const PIXEL_ENTRY_POINT: &str = "PSMain";
pub const VERTEX_TARGET: &str = "vs_5_0";
pub const PIXEL_TARGET: &str = "ps_5_0";

/// Rate preferred when a resolution has several modes
const PREFERRED_REFRESH_HZ: f64 = 60.0;

/// World, view and projection as 16 floats each
const MATRIX_BUFFER_SIZE: usize = 3 * 16 * std::mem::size_of::<f32>();

/// Primary adapter as reported at initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCard {
    pub description: String,
    pub memory_mb: u64,
}

#[derive(Debug, Clone, Copy)]
struct D3dBuffer {
    native: NativeHandle,
}

#[derive(Debug, Clone, Copy)]
struct D3dTexture {
    texture: NativeHandle,
    view: NativeHandle,
}

#[derive(Debug, Clone, Copy)]
struct D3dProgram {
    vertex_shader: NativeHandle,
    pixel_shader: NativeHandle,
    input_layout: NativeHandle,
    matrix_buffer: NativeHandle,
    sampler: NativeHandle,
}

impl D3dProgram {
    fn handles(&self) -> [NativeHandle; 5] {
        [self.sampler, self.matrix_buffer, self.input_layout, self.pixel_shader, self.vertex_shader]
    }
}

pub struct D3dGraphics {
    base: GraphicsBase,
    driver: Box<dyn D3dDriver>,
    window: Option<RawWindowHandle>,
    video_card: Option<VideoCard>,
    refresh_rate: Rational,

    // Native objects, in creation order
    device: Option<DeviceObjects>,
    render_target_view: Option<NativeHandle>,
    depth_buffer: Option<NativeHandle>,
    depth_stencil_state: Option<NativeHandle>,
    depth_stencil_view: Option<NativeHandle>,
    rasterizer_state: Option<NativeHandle>,
    blend_enabled: Option<NativeHandle>,
    blend_disabled: Option<NativeHandle>,

    ortho: Mat4,

    buffers: SlotMap<BufferHandle, D3dBuffer>,
    textures: SlotMap<TextureHandle, D3dTexture>,
    programs: SlotMap<ProgramHandle, D3dProgram>,
}

impl D3dGraphics {
    /// Uninitialized backend presenting into the window described by `system`
    pub fn new(driver: Box<dyn D3dDriver>, system: &SystemInfo, log: Log) -> Self {
        Self {
            base: GraphicsBase::new(GraphicsApi::Direct3D, log),
            driver,
            window: system.window,
            video_card: None,
            refresh_rate: Rational::UNSPECIFIED,
            device: None,
            render_target_view: None,
            depth_buffer: None,
            depth_stencil_state: None,
            depth_stencil_view: None,
            rasterizer_state: None,
            blend_enabled: None,
            blend_disabled: None,
            ortho: Mat4::IDENTITY,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            programs: SlotMap::with_key(),
        }
    }

    /// Refresh rate chosen for the swap chain
    pub fn refresh_rate(&self) -> Rational {
        self.refresh_rate
    }

    pub fn video_card(&self) -> Option<&VideoCard> {
        self.video_card.as_ref()
    }

    /// Adapter, display mode, device, views and states, in dependency order
    fn create_resources(&mut self, properties: &PresentationProperties) -> Result<()> {
        let adapter = self.driver.primary_adapter()?;
        self.video_card = Some(VideoCard {
            description: adapter.description,
            memory_mb: adapter.dedicated_video_memory / (1024 * 1024),
        });

        let modes = self.driver.display_modes()?;
        self.refresh_rate = if properties.vsync {
            match_refresh_rate(&modes, properties.screen_width, properties.screen_height)
        } else {
            Rational::UNSPECIFIED
        };

        let device = self.driver.create_device_and_swap_chain(&SwapChainDesc {
            window: self.window,
            width: properties.screen_width,
            height: properties.screen_height,
            refresh_rate: self.refresh_rate,
            sample_count: properties.sample_count,
            fullscreen: properties.fullscreen,
        })?;
        self.device = Some(device);

        self.create_window_targets(device.swap_chain, properties)?;

        let depth_state = self.driver.create_depth_stencil_state(true)?;
        self.depth_stencil_state = Some(depth_state);
        self.driver.set_depth_stencil_state(depth_state);

        let rasterizer = self.driver.create_rasterizer_state(&RasterizerDesc {
            cull_mode: CullMode::Back,
            wireframe: false,
            front_counter_clockwise: false,
            depth_clip: true,
            multisample: properties.sample_count > 1,
        })?;
        self.rasterizer_state = Some(rasterizer);
        self.driver.set_rasterizer_state(rasterizer);

        self.driver
            .set_viewport(properties.screen_width as f32, properties.screen_height as f32);

        self.blend_enabled = Some(self.driver.create_blend_state(true)?);
        let blend_disabled = self.driver.create_blend_state(false)?;
        self.blend_disabled = Some(blend_disabled);
        self.driver.set_blend_state(blend_disabled);

        self.ortho = MatrixConvention::LeftHanded.orthographic(
            properties.screen_width as f32,
            properties.screen_height as f32,
            properties.screen_near,
            properties.screen_far,
        );
        Ok(())
    }

    /// Render target view over the back buffer plus depth buffer and view
    fn create_window_targets(&mut self, swap_chain: NativeHandle, properties: &PresentationProperties) -> Result<()> {
        let back_buffer = self.driver.back_buffer(swap_chain)?;
        let view = self.driver.create_render_target_view(back_buffer);
        self.driver.release(back_buffer);
        self.render_target_view = Some(view?);

        let depth_buffer = self.driver.create_depth_buffer(
            properties.screen_width,
            properties.screen_height,
            properties.sample_count,
        )?;
        self.depth_buffer = Some(depth_buffer);
        self.depth_stencil_view = Some(self.driver.create_depth_stencil_view(depth_buffer)?);

        self.driver.set_render_targets(self.render_target_view, self.depth_stencil_view);
        Ok(())
    }

    fn release_window_targets(&mut self) {
        self.driver.set_render_targets(None, None);
        for slot in [&mut self.depth_stencil_view, &mut self.depth_buffer, &mut self.render_target_view] {
            if let Some(handle) = slot.take() {
                self.driver.release(handle);
            }
        }
    }

    /// Resize the swap chain in place, keeping the device
    fn resize_swap_chain(&mut self) -> Result<()> {
        let Some(device) = self.device else {
            return Ok(());
        };
        let properties = *self.base.properties();

        self.release_window_targets();
        self.driver
            .resize_buffers(device.swap_chain, properties.screen_width, properties.screen_height)?;
        self.create_window_targets(device.swap_chain, &properties)?;
        self.driver
            .set_viewport(properties.screen_width as f32, properties.screen_height as f32);
        self.ortho = MatrixConvention::LeftHanded.orthographic(
            properties.screen_width as f32,
            properties.screen_height as f32,
            properties.screen_near,
            properties.screen_far,
        );
        Ok(())
    }

    /// Compile both stages and create the per-program objects
    ///
    /// Every handle created is pushed to `created` so the caller can release
    /// them if a later step fails.
    fn build_program(&mut self, source: &ProgramSource, created: &mut Vec<NativeHandle>) -> Result<D3dProgram> {
        let vertex_code = self
            .driver
            .compile_shader(&source.vertex, VERTEX_ENTRY_POINT, VERTEX_TARGET)
            .map_err(|diagnostic| Error::ShaderCompilation {
                shader: format!("{}.vs", source.name),
                diagnostic,
            })?;
        created.push(vertex_code);

        let pixel_code = self
            .driver
            .compile_shader(&source.fragment, PIXEL_ENTRY_POINT, PIXEL_TARGET)
            .map_err(|diagnostic| Error::ShaderCompilation {
                shader: format!("{}.ps", source.name),
                diagnostic,
            })?;
        created.push(pixel_code);

        let vertex_shader = self.driver.create_vertex_shader(vertex_code)?;
        created.push(vertex_shader);
        let pixel_shader = self.driver.create_pixel_shader(pixel_code)?;
        created.push(pixel_shader);
        let input_layout = self.driver.create_input_layout(&INPUT_LAYOUT, vertex_code)?;
        created.push(input_layout);
        let matrix_buffer = self
            .driver
            .create_buffer(BufferKind::Constant, &[0u8; MATRIX_BUFFER_SIZE])?;
        created.push(matrix_buffer);
        let sampler = self.driver.create_sampler_state()?;
        created.push(sampler);

        // Bytecode is only needed until the shaders and layout exist
        created.retain(|h| *h != vertex_code && *h != pixel_code);
        self.driver.release(pixel_code);
        self.driver.release(vertex_code);

        Ok(D3dProgram { vertex_shader, pixel_shader, input_layout, matrix_buffer, sampler })
    }

    fn program(&self, program: ProgramHandle, method: &'static str) -> Result<D3dProgram> {
        self.programs
            .get(program)
            .copied()
            .ok_or_else(|| Error::invalid_argument("D3dGraphics", method, "unknown program"))
    }
}

impl Graphics for D3dGraphics {
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
            return Err(Error::runtime("D3dGraphics", "initialize", "already initialized"));
        }
        self.base.set_properties(*properties);

        if let Err(e) = self.create_resources(properties) {
            engine_error!(self.base.log(), SOURCE, "Direct3D initialization failed: {}", e);
            self.shutdown();
            return Err(Error::InitializationFailed(format!("Direct3D: {}", e)));
        }

        self.base.set_display_ready(true);
        engine_info!(
            self.base.log(),
            SOURCE,
            "Direct3D ready: {}x{}, vsync {}, refresh {}/{}",
            properties.screen_width,
            properties.screen_height,
            properties.vsync,
            self.refresh_rate.numerator,
            self.refresh_rate.denominator
        );
        Ok(())
    }

    fn begin_scene(&mut self, red: f32, green: f32, blue: f32, alpha: f32) {
        if !self.base.is_display_ready() {
            return;
        }
        if let (Some(rtv), Some(dsv)) = (self.render_target_view, self.depth_stencil_view) {
            self.driver.clear_render_target_view(rtv, [red, green, blue, alpha]);
            self.driver.clear_depth_stencil_view(dsv, 1.0, 0);
        }
    }

    fn end_scene(&mut self) {
        if !self.base.is_display_ready() {
            return;
        }
        let Some(device) = self.device else {
            return;
        };
        let sync_interval = if self.base.properties().vsync { 1 } else { 0 };
        if let Err(e) = self.driver.present(device.swap_chain, sync_interval) {
            engine_warn!(self.base.log(), SOURCE, "Present failed: {}", e);
        }
    }

    fn shutdown(&mut self) {
        self.base.set_display_ready(false);
        let was_live = self.device.is_some();

        // Swap chains must leave fullscreen before release
        if let Some(device) = self.device {
            if self.base.properties().fullscreen {
                if let Err(e) = self.driver.set_fullscreen_state(device.swap_chain, false) {
                    engine_warn!(self.base.log(), SOURCE, "Leaving fullscreen failed: {}", e);
                }
            }
        }

        let programs: Vec<D3dProgram> = self.programs.drain().map(|(_, p)| p).collect();
        for program in programs {
            for handle in program.handles() {
                self.driver.release(handle);
            }
        }
        let textures: Vec<D3dTexture> = self.textures.drain().map(|(_, t)| t).collect();
        for texture in textures {
            self.driver.release(texture.view);
            self.driver.release(texture.texture);
        }
        let buffers: Vec<D3dBuffer> = self.buffers.drain().map(|(_, b)| b).collect();
        for buffer in buffers {
            self.driver.release(buffer.native);
        }

        for slot in [&mut self.blend_disabled, &mut self.blend_enabled, &mut self.rasterizer_state] {
            if let Some(handle) = slot.take() {
                self.driver.release(handle);
            }
        }
        if self.render_target_view.is_some() || self.depth_buffer.is_some() {
            self.release_window_targets();
        }
        if let Some(handle) = self.depth_stencil_state.take() {
            self.driver.release(handle);
        }
        if let Some(device) = self.device.take() {
            self.driver.release(device.swap_chain);
            self.driver.release(device.context);
            self.driver.release(device.device);
        }

        self.video_card = None;
        self.refresh_rate = Rational::UNSPECIFIED;

        if was_live {
            engine_info!(self.base.log(), SOURCE, "Direct3D shut down");
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
        if let Err(e) = self.resize_swap_chain() {
            engine_error!(self.base.log(), SOURCE, "Swap chain resize to {}x{} failed: {}", width, height, e);
            self.base.set_display_ready(false);
            return;
        }
        engine_diag!(self.base.log(), SOURCE, "Swap chain resized to {}x{}", width, height);
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

    fn video_card_info(&self) -> Result<Vec<String>> {
        let card = self
            .video_card
            .as_ref()
            .ok_or_else(|| Error::runtime("D3dGraphics", "video_card_info", "backend is not initialized"))?;
        Ok(vec![card.description.clone(), format!("{} MB", card.memory_mb)])
    }

    fn convention(&self) -> MatrixConvention {
        MatrixConvention::LeftHanded
    }

    fn ops(&mut self) -> Result<&mut dyn BackendOps> {
        self.ensure_ready("ops")?;
        Ok(self)
    }
}

impl BackendOps for D3dGraphics {
    fn convention(&self) -> MatrixConvention {
        MatrixConvention::LeftHanded
    }

    fn stage_extensions(&self) -> (&'static str, &'static str) {
        ("vs", "ps")
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferHandle> {
        let native = self.driver.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(vertices))?;
        Ok(self.buffers.insert(D3dBuffer { native }))
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<BufferHandle> {
        let native = self.driver.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))?;
        Ok(self.buffers.insert(D3dBuffer { native }))
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(buffer) {
            self.driver.release(buffer.native);
        }
    }

    fn bind_buffers(&mut self, vertices: BufferHandle, indices: BufferHandle) -> Result<()> {
        let (Some(vertices), Some(indices)) = (self.buffers.get(vertices).copied(), self.buffers.get(indices).copied())
        else {
            return Err(Error::invalid_argument("D3dGraphics", "bind_buffers", "unknown buffer"));
        };
        self.driver.set_vertex_buffer(vertices.native, Vertex::STRIDE);
        self.driver.set_index_buffer(indices.native);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        self.driver.draw_indexed(index_count)
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle> {
        let texture = self.driver.create_texture_2d(image.width, image.height, &image.pixels)?;
        let view = match self.driver.create_shader_resource_view(texture) {
            Ok(view) => view,
            Err(e) => {
                self.driver.release(texture);
                return Err(e);
            }
        };
        Ok(self.textures.insert(D3dTexture { texture, view }))
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if let Some(texture) = self.textures.remove(texture) {
            self.driver.release(texture.view);
            self.driver.release(texture.texture);
        }
    }

    fn set_alpha_blending(&mut self, enabled: bool) -> Result<()> {
        let state = if enabled { self.blend_enabled } else { self.blend_disabled };
        let state = state.ok_or_else(|| Error::runtime("D3dGraphics", "set_alpha_blending", "no blend states"))?;
        self.driver.set_blend_state(state);
        Ok(())
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle> {
        let mut created = Vec::new();
        match self.build_program(source, &mut created) {
            Ok(program) => Ok(self.programs.insert(program)),
            Err(e) => {
                for handle in created.into_iter().rev() {
                    self.driver.release(handle);
                }
                Err(e)
            }
        }
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if let Some(program) = self.programs.remove(program) {
            for handle in program.handles() {
                self.driver.release(handle);
            }
        }
    }

    fn use_program(&mut self, program: ProgramHandle, texture: Option<TextureHandle>) -> Result<()> {
        let program = self.program(program, "use_program")?;
        let texture = match texture {
            Some(handle) => Some(
                self.textures
                    .get(handle)
                    .ok_or_else(|| Error::invalid_argument("D3dGraphics", "use_program", "unknown texture"))?
                    .view,
            ),
            None => None,
        };
        self.driver.bind_program(&ProgramBinding {
            vertex_shader: program.vertex_shader,
            pixel_shader: program.pixel_shader,
            input_layout: program.input_layout,
            constants: program.matrix_buffer,
            sampler: program.sampler,
            texture,
        });
        Ok(())
    }

    fn upload_matrices(&mut self, program: ProgramHandle, matrices: &MatrixSet) -> Result<()> {
        let program = self.program(program, "upload_matrices")?;
        let convention = MatrixConvention::LeftHanded;

        let mut data = [0.0f32; 48];
        data[0..16].copy_from_slice(&convention.upload_layout(&matrices.world));
        data[16..32].copy_from_slice(&convention.upload_layout(&matrices.view));
        data[32..48].copy_from_slice(&convention.upload_layout(&matrices.projection));

        self.driver.update_buffer(program.matrix_buffer, bytemuck::cast_slice(&data))
    }
}

/// Refresh rate for a `width`x`height` swap chain
///
/// Among the modes of exactly that size, the one nearest 60 Hz wins, the
/// higher rate on a tie. Unspecified when the output has no such mode.
pub fn match_refresh_rate(modes: &[DisplayMode], width: u32, height: u32) -> Rational {
    modes
        .iter()
        .filter(|mode| mode.width == width && mode.height == height && mode.refresh_rate.denominator != 0)
        .map(|mode| mode.refresh_rate)
        .min_by(|a, b| {
            let distance = |rate: &Rational| (rate.hertz() - PREFERRED_REFRESH_HZ).abs();
            distance(a).total_cmp(&distance(b)).then(b.hertz().total_cmp(&a.hertz()))
        })
        .unwrap_or(Rational::UNSPECIFIED)
}

impl Drop for D3dGraphics {
    fn drop(&mut self) {
        self.shutdown();
    }
}
