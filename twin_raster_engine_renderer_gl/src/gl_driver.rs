/// GlDriver - the native context and GL entry points the OpenGL backend uses
///
/// Window-system calls (surface, pixel format, context creation) and the
/// GL calls the backend needs. GL objects are plain [`GlName`]s; surfaces
/// and contexts are opaque handles.

use raw_window_handle::RawWindowHandle;
use twin_raster_engine::twinraster::Result;

/// GL object name (buffer, texture, shader, program, vertex array)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlName(pub u32);

/// Drawable surface bound to a window (device context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Which creation path produced a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Created through the attribs extension with the requested version
    Versioned { major: u32, minor: u32, core_profile: bool },
    /// Legacy fixed context
    Legacy,
}

/// Pixel format request for the real surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatRequest {
    pub color_bits: u8,
    pub depth_bits: u8,
    pub alpha_bits: u8,
    pub stencil_bits: u8,
    pub sample_count: u32,
    pub double_buffer: bool,
    pub fullscreen: bool,
}

bitflags::bitflags! {
    /// Extensions the loader reports after bootstrap
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GlExtensions: u32 {
        const PIXEL_FORMAT = 1 << 0;
        const CREATE_CONTEXT_ATTRIBS = 1 << 1;
        const SWAP_CONTROL = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringName {
    Vendor,
    Renderer,
    Version,
}

/// Float vertex attribute layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub index: u32,
    pub components: i32,
    pub stride: u32,
    pub offset: u32,
}

/// Native OpenGL-style API surface
pub trait GlDriver {
    // ===== WINDOW SYSTEM =====

    /// Surface on a window. `None` creates a hidden throwaway window.
    fn create_surface(&mut self, window: Option<RawWindowHandle>) -> Result<SurfaceHandle>;

    fn destroy_surface(&mut self, surface: SurfaceHandle);

    /// Drawable size in pixels. Set before the first `make_current` and on
    /// every window resize.
    fn resize_surface(&mut self, surface: SurfaceHandle, width: u32, height: u32) -> Result<()>;

    /// Legacy pixel format, usable before any extension is loaded
    fn set_basic_pixel_format(&mut self, surface: SurfaceHandle) -> Result<()>;

    /// Pixel format chosen through the pixel-format extension
    fn choose_pixel_format(&mut self, surface: SurfaceHandle, request: &PixelFormatRequest) -> Result<()>;

    fn create_legacy_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle>;

    fn create_context_attribs(
        &mut self,
        surface: SurfaceHandle,
        major: u32,
        minor: u32,
        core_profile: bool,
    ) -> Result<ContextHandle>;

    /// Make `context` current on `surface`, or release the current context
    fn make_current(&mut self, target: Option<(SurfaceHandle, ContextHandle)>) -> Result<()>;

    fn delete_context(&mut self, context: ContextHandle);

    /// Load extension entry points. Requires a current context.
    fn load_extensions(&mut self) -> Result<GlExtensions>;

    fn set_swap_interval(&mut self, interval: i32) -> Result<()>;

    fn swap_buffers(&mut self, surface: SurfaceHandle) -> Result<()>;

    // ===== STATE =====

    fn get_string(&mut self, name: StringName) -> String;

    fn clear_depth(&mut self, depth: f32);

    fn set_depth_test(&mut self, enabled: bool);

    /// Back-face culling with clockwise front faces
    fn set_cull_back_faces(&mut self, enabled: bool);

    fn set_blending(&mut self, enabled: bool);

    fn viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: [f32; 4]);

    // ===== BUFFERS =====

    fn gen_vertex_array(&mut self) -> Result<GlName>;

    fn bind_vertex_array(&mut self, vertex_array: Option<GlName>);

    fn delete_vertex_array(&mut self, vertex_array: GlName);

    fn gen_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<GlName>;

    fn bind_buffer(&mut self, target: BufferTarget, buffer: GlName);

    fn delete_buffer(&mut self, buffer: GlName);

    fn vertex_attribute(&mut self, layout: &AttributeLayout);

    fn draw_elements(&mut self, index_count: u32) -> Result<()>;

    // ===== TEXTURES =====

    fn gen_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<GlName>;

    fn bind_texture(&mut self, unit: u32, texture: GlName);

    fn delete_texture(&mut self, texture: GlName);

    // ===== PROGRAMS =====

    /// Compile one stage. The error carries the shader info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> std::result::Result<GlName, String>;

    fn delete_shader(&mut self, shader: GlName);

    fn create_program(&mut self) -> Result<GlName>;

    fn attach_shader(&mut self, program: GlName, shader: GlName);

    fn detach_shader(&mut self, program: GlName, shader: GlName);

    fn bind_attribute_location(&mut self, program: GlName, index: u32, name: &str);

    /// Link. The error carries the program info log.
    fn link_program(&mut self, program: GlName) -> std::result::Result<(), String>;

    fn delete_program(&mut self, program: GlName);

    fn use_program(&mut self, program: GlName);

    fn uniform_location(&mut self, program: GlName, name: &str) -> Option<i32>;

    fn uniform_matrix4(&mut self, location: i32, transpose: bool, value: &[f32; 16]);

    fn uniform_int(&mut self, location: i32, value: i32);
}
