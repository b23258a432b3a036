/// D3dDriver - the native device/swap-chain calls the Direct3D backend is built on
///
/// Every native object is an opaque [`NativeHandle`]. The backend owns the
/// handles it creates and releases each one exactly once.

use raw_window_handle::RawWindowHandle;
use twin_raster_engine::twinraster::Result;

/// Opaque native object (device, view, state, buffer, shader...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

/// Refresh rate as a rational number (0/1 means "let the driver decide")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub const UNSPECIFIED: Rational = Rational { numerator: 0, denominator: 1 };

    pub fn hertz(self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Display mode of the primary output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: Rational,
}

/// Primary adapter description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDesc {
    pub description: String,
    /// Dedicated video memory in bytes
    pub dedicated_video_memory: u64,
}

/// Swap chain creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SwapChainDesc {
    pub window: Option<RawWindowHandle>,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: Rational,
    pub sample_count: u32,
    pub fullscreen: bool,
}

/// Device, immediate context and swap chain created together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceObjects {
    pub device: NativeHandle,
    pub context: NativeHandle,
    pub swap_chain: NativeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerDesc {
    pub cull_mode: CullMode,
    pub wireframe: bool,
    pub front_counter_clockwise: bool,
    pub depth_clip: bool,
    pub multisample: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFormat {
    R32G32B32Float,
    R32G32B32A32Float,
    R32G32Float,
}

/// One entry of the vertex input layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: &'static str,
    pub format: ElementFormat,
    pub offset: u32,
}

/// Everything bound for one draw with a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBinding {
    pub vertex_shader: NativeHandle,
    pub pixel_shader: NativeHandle,
    pub input_layout: NativeHandle,
    pub constants: NativeHandle,
    pub sampler: NativeHandle,
    pub texture: Option<NativeHandle>,
}

/// Native Direct3D-style API surface
pub trait D3dDriver {
    // ===== ADAPTER =====

    fn primary_adapter(&mut self) -> Result<AdapterDesc>;

    /// Modes supported by the primary output for the back buffer format
    fn display_modes(&mut self) -> Result<Vec<DisplayMode>>;

    // ===== DEVICE / SWAP CHAIN =====

    fn create_device_and_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<DeviceObjects>;

    fn back_buffer(&mut self, swap_chain: NativeHandle) -> Result<NativeHandle>;

    fn resize_buffers(&mut self, swap_chain: NativeHandle, width: u32, height: u32) -> Result<()>;

    fn set_fullscreen_state(&mut self, swap_chain: NativeHandle, fullscreen: bool) -> Result<()>;

    fn present(&mut self, swap_chain: NativeHandle, sync_interval: u32) -> Result<()>;

    // ===== VIEWS AND STATES =====

    fn create_render_target_view(&mut self, resource: NativeHandle) -> Result<NativeHandle>;

    fn create_depth_buffer(&mut self, width: u32, height: u32, sample_count: u32) -> Result<NativeHandle>;

    fn create_depth_stencil_state(&mut self, depth_enabled: bool) -> Result<NativeHandle>;

    fn create_depth_stencil_view(&mut self, depth_buffer: NativeHandle) -> Result<NativeHandle>;

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<NativeHandle>;

    fn create_blend_state(&mut self, enabled: bool) -> Result<NativeHandle>;

    fn set_render_targets(&mut self, render_target: Option<NativeHandle>, depth_stencil: Option<NativeHandle>);

    fn set_depth_stencil_state(&mut self, state: NativeHandle);

    fn set_rasterizer_state(&mut self, state: NativeHandle);

    fn set_blend_state(&mut self, state: NativeHandle);

    fn set_viewport(&mut self, width: f32, height: f32);

    fn clear_render_target_view(&mut self, view: NativeHandle, color: [f32; 4]);

    fn clear_depth_stencil_view(&mut self, view: NativeHandle, depth: f32, stencil: u8);

    // ===== RESOURCES =====

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<NativeHandle>;

    fn update_buffer(&mut self, buffer: NativeHandle, data: &[u8]) -> Result<()>;

    fn set_vertex_buffer(&mut self, buffer: NativeHandle, stride: u32);

    fn set_index_buffer(&mut self, buffer: NativeHandle);

    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;

    fn create_texture_2d(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<NativeHandle>;

    fn create_shader_resource_view(&mut self, texture: NativeHandle) -> Result<NativeHandle>;

    fn create_sampler_state(&mut self) -> Result<NativeHandle>;

    // ===== SHADERS =====

    /// Compile HLSL source to bytecode
    ///
    /// The error carries the compiler's diagnostic output.
    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        target: &str,
    ) -> std::result::Result<NativeHandle, String>;

    fn create_vertex_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle>;

    fn create_pixel_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle>;

    fn create_input_layout(&mut self, elements: &[InputElement], bytecode: NativeHandle) -> Result<NativeHandle>;

    fn bind_program(&mut self, binding: &ProgramBinding);

    // ===== LIFETIME =====

    /// Release one native object
    fn release(&mut self, object: NativeHandle);
}
