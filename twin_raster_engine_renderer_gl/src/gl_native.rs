/// Native OpenGL driver over glutin (window system) and glow (GL calls)
///
/// glutin resolves the platform's extension entry points when the display
/// is created, so the bootstrap window requested with `create_surface(None)`
/// is virtual: its legacy context is never created natively and
/// `load_extensions` reports what the display supports. Window surfaces are
/// created on the first `make_current`, once the pixel format and size are
/// known.

use std::ffi::CStr;
use std::num::NonZeroU32;

use glow::HasContext;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext, NotCurrentGlContext, PossiblyCurrentContext,
    PossiblyCurrentGlContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, DisplayFeatures, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use rustc_hash::FxHashMap;
use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{Error, Result};

use crate::gl_driver::{
    AttributeLayout, BufferTarget, ContextHandle, GlDriver, GlExtensions, GlName, PixelFormatRequest, ShaderStage,
    StringName, SurfaceHandle,
};

struct SurfaceRecord {
    window: Option<RawWindowHandle>,
    config: Option<Config>,
    size: (u32, u32),
    native: Option<Surface<WindowSurface>>,
}

enum ContextState {
    /// Legacy context of the virtual bootstrap window
    Bootstrap,
    NotCurrent(NotCurrentContext),
    Current(PossiblyCurrentContext),
}

pub struct NativeGl {
    // Declared first so GL entry points go before the contexts they came from
    gl: Option<glow::Context>,
    contexts: FxHashMap<ContextHandle, Option<ContextState>>,
    surfaces: FxHashMap<SurfaceHandle, SurfaceRecord>,
    display: Display,
    current: Option<(SurfaceHandle, ContextHandle)>,
    next_id: u64,
}

fn backend_error(operation: &str, error: impl std::fmt::Display) -> Error {
    Error::BackendError(format!("{}: {}", operation, error))
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

#[cfg(windows)]
fn api_preference(window: Option<RawWindowHandle>) -> DisplayApiPreference {
    DisplayApiPreference::WglThenEgl(window)
}

#[cfg(target_os = "macos")]
fn api_preference(_window: Option<RawWindowHandle>) -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(all(unix, not(target_os = "macos")))]
fn api_preference(_window: Option<RawWindowHandle>) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn native_name(native: NonZeroU32) -> GlName {
    GlName(native.get())
}

fn object(name: GlName) -> Option<NonZeroU32> {
    NonZeroU32::new(name.0)
}

impl NativeGl {
    /// Connect to the display the window described by `system` lives on
    pub fn new(system: &SystemInfo) -> Result<Self> {
        let display_handle: RawDisplayHandle = system
            .display
            .ok_or_else(|| Error::NotSupported("OpenGL needs a display connection".to_string()))?;
        let display = unsafe { Display::new(display_handle, api_preference(system.window)) }
            .map_err(|e| Error::NotSupported(format!("OpenGL display: {}", e)))?;

        Ok(Self {
            gl: None,
            contexts: FxHashMap::default(),
            surfaces: FxHashMap::default(),
            display,
            current: None,
            next_id: 0,
        })
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// GL entry points, only while a native context is current
    fn gl(&self) -> Option<&glow::Context> {
        let (_, context) = self.current?;
        match self.contexts.get(&context) {
            Some(Some(ContextState::Current(_))) => self.gl.as_ref(),
            _ => None,
        }
    }

    fn require_gl(&self, operation: &str) -> Result<&glow::Context> {
        self.gl()
            .ok_or_else(|| Error::BackendError(format!("{}: no current context", operation)))
    }

    fn record(&self, surface: SurfaceHandle, operation: &str) -> Result<&SurfaceRecord> {
        self.surfaces
            .get(&surface)
            .ok_or_else(|| Error::BackendError(format!("{}: invalid surface", operation)))
    }

    /// Configs compatible with `window`, or any config for the virtual window
    fn configs(&self, window: Option<RawWindowHandle>, request: Option<&PixelFormatRequest>) -> Result<Vec<Config>> {
        let mut template = ConfigTemplateBuilder::new();
        if let Some(window) = window {
            template = template.compatible_with_native_window(window);
        }
        if let Some(request) = request {
            template = template
                .with_alpha_size(request.alpha_bits)
                .with_depth_size(request.depth_bits)
                .with_stencil_size(request.stencil_bits)
                .with_single_buffering(!request.double_buffer);
        }
        let configs = unsafe { self.display.find_configs(template.build()) }
            .map_err(|e| backend_error("find_configs", e))?;
        Ok(configs.collect())
    }

    fn create_context(&mut self, surface: SurfaceHandle, api: ContextApi, core_profile: bool) -> Result<ContextHandle> {
        let record = self.record(surface, "create_context")?;
        let (Some(window), Some(config)) = (record.window, record.config.clone()) else {
            return Err(Error::BackendError("create_context: pixel format not set".to_string()));
        };

        let mut attributes = ContextAttributesBuilder::new().with_context_api(api);
        if core_profile {
            attributes = attributes.with_profile(GlProfile::Core);
        }
        let context = unsafe { self.display.create_context(&config, &attributes.build(Some(window))) }
            .map_err(|e| backend_error("create_context", e))?;

        let handle = ContextHandle(self.next());
        self.contexts.insert(handle, Some(ContextState::NotCurrent(context)));
        Ok(handle)
    }

    fn ensure_window_surface(&mut self, surface: SurfaceHandle) -> Result<()> {
        let display = &self.display;
        let record = self
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| Error::BackendError("make_current: invalid surface".to_string()))?;
        if record.native.is_some() {
            return Ok(());
        }
        let (Some(window), Some(config)) = (record.window, record.config.as_ref()) else {
            return Err(Error::BackendError("make_current: pixel format not set".to_string()));
        };

        let attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window,
            non_zero(record.size.0),
            non_zero(record.size.1),
        );
        let native = unsafe { display.create_window_surface(config, &attributes) }
            .map_err(|e| backend_error("create_window_surface", e))?;
        record.native = Some(native);
        Ok(())
    }

    fn release_current(&mut self) -> Result<()> {
        let Some((_, context)) = self.current.take() else {
            return Ok(());
        };
        let Some(slot) = self.contexts.get_mut(&context) else {
            return Ok(());
        };
        match slot.take() {
            Some(ContextState::Current(current)) => {
                let not_current = current
                    .make_not_current()
                    .map_err(|e| backend_error("make_not_current", e))?;
                *slot = Some(ContextState::NotCurrent(not_current));
            }
            other => *slot = other,
        }
        Ok(())
    }

    fn bind(&mut self, surface: SurfaceHandle, context: ContextHandle) -> Result<()> {
        let state = self
            .contexts
            .get_mut(&context)
            .and_then(Option::take)
            .ok_or_else(|| Error::BackendError("make_current: invalid context".to_string()))?;
        if let ContextState::Bootstrap = state {
            self.contexts.insert(context, Some(state));
            self.current = Some((surface, context));
            return Ok(());
        }

        if let Err(e) = self.ensure_window_surface(surface) {
            self.contexts.insert(context, Some(state));
            return Err(e);
        }
        let Some(native) = self.surfaces.get(&surface).and_then(|record| record.native.as_ref()) else {
            self.contexts.insert(context, Some(state));
            return Err(Error::BackendError("make_current: invalid surface".to_string()));
        };

        let (state, outcome) = match state {
            ContextState::NotCurrent(not_current) => match not_current.make_current(native) {
                Ok(current) => (Some(ContextState::Current(current)), Ok(())),
                // The context is consumed by a failed switch
                Err(e) => (None, Err(backend_error("make_current", e))),
            },
            ContextState::Current(current) => {
                let outcome = current.make_current(native).map_err(|e| backend_error("make_current", e));
                (Some(ContextState::Current(current)), outcome)
            }
            ContextState::Bootstrap => (Some(ContextState::Bootstrap), Ok(())),
        };
        match state {
            Some(state) => {
                self.contexts.insert(context, Some(state));
            }
            None => {
                self.contexts.remove(&context);
            }
        }
        outcome?;

        if self.gl.is_none() {
            let display = &self.display;
            let gl = unsafe {
                glow::Context::from_loader_function_cstr(|name: &CStr| display.get_proc_address(name))
            };
            self.gl = Some(gl);
        }
        self.current = Some((surface, context));
        Ok(())
    }

    fn current_context(&self) -> Option<&PossiblyCurrentContext> {
        let (_, context) = self.current?;
        match self.contexts.get(&context) {
            Some(Some(ContextState::Current(current))) => Some(current),
            _ => None,
        }
    }
}

impl GlDriver for NativeGl {
    fn create_surface(&mut self, window: Option<RawWindowHandle>) -> Result<SurfaceHandle> {
        let surface = SurfaceHandle(self.next());
        self.surfaces.insert(surface, SurfaceRecord { window, config: None, size: (1, 1), native: None });
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) {
        if self.current.map(|(s, _)| s) == Some(surface) {
            let _ = self.release_current();
        }
        self.surfaces.remove(&surface);
    }

    fn resize_surface(&mut self, surface: SurfaceHandle, width: u32, height: u32) -> Result<()> {
        let record = self
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| Error::BackendError("resize_surface: invalid surface".to_string()))?;
        record.size = (width, height);

        if self.current.map(|(s, _)| s) != Some(surface) {
            return Ok(());
        }
        let (Some(context), Some(native)) = (
            self.current_context(),
            self.surfaces.get(&surface).and_then(|record| record.native.as_ref()),
        ) else {
            return Ok(());
        };
        native.resize(context, non_zero(width), non_zero(height));
        Ok(())
    }

    fn set_basic_pixel_format(&mut self, surface: SurfaceHandle) -> Result<()> {
        let window = self.record(surface, "set_basic_pixel_format")?.window;
        if window.is_none() {
            return Ok(());
        }
        let config = self
            .configs(window, None)?
            .into_iter()
            .min_by_key(|config| config.num_samples())
            .ok_or_else(|| Error::BackendError("set_basic_pixel_format: no pixel format".to_string()))?;
        if let Some(record) = self.surfaces.get_mut(&surface) {
            record.config = Some(config);
        }
        Ok(())
    }

    fn choose_pixel_format(&mut self, surface: SurfaceHandle, request: &PixelFormatRequest) -> Result<()> {
        let window = self.record(surface, "choose_pixel_format")?.window;
        let config = self
            .configs(window, Some(request))?
            .into_iter()
            .filter(|config| u32::from(config.num_samples()) <= request.sample_count.max(1))
            .max_by_key(|config| config.num_samples())
            .ok_or_else(|| Error::BackendError("choose_pixel_format: no matching format".to_string()))?;
        if let Some(record) = self.surfaces.get_mut(&surface) {
            record.config = Some(config);
        }
        Ok(())
    }

    fn create_legacy_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle> {
        if self.record(surface, "create_legacy_context")?.window.is_none() {
            let context = ContextHandle(self.next());
            self.contexts.insert(context, Some(ContextState::Bootstrap));
            return Ok(context);
        }
        self.create_context(surface, ContextApi::OpenGl(None), false)
    }

    fn create_context_attribs(
        &mut self,
        surface: SurfaceHandle,
        major: u32,
        minor: u32,
        core_profile: bool,
    ) -> Result<ContextHandle> {
        let version = Version::new(
            u8::try_from(major).map_err(|e| backend_error("create_context_attribs", e))?,
            u8::try_from(minor).map_err(|e| backend_error("create_context_attribs", e))?,
        );
        self.create_context(surface, ContextApi::OpenGl(Some(version)), core_profile)
    }

    fn make_current(&mut self, target: Option<(SurfaceHandle, ContextHandle)>) -> Result<()> {
        match target {
            None => self.release_current(),
            Some((surface, context)) => {
                if self.current.is_some_and(|(_, c)| c != context) {
                    self.release_current()?;
                }
                self.bind(surface, context)
            }
        }
    }

    fn delete_context(&mut self, context: ContextHandle) {
        if self.current.map(|(_, c)| c) == Some(context) {
            let _ = self.release_current();
        }
        self.contexts.remove(&context);
        let any_native = self
            .contexts
            .values()
            .any(|state| !matches!(state, Some(ContextState::Bootstrap)));
        if !any_native {
            self.gl = None;
        }
    }

    fn load_extensions(&mut self) -> Result<GlExtensions> {
        if self.current.is_none() {
            return Err(Error::BackendError("load_extensions: no current context".to_string()));
        }
        let mut extensions = GlExtensions::PIXEL_FORMAT | GlExtensions::CREATE_CONTEXT_ATTRIBS;
        if self.display.supported_features().contains(DisplayFeatures::SWAP_CONTROL) {
            extensions |= GlExtensions::SWAP_CONTROL;
        }
        Ok(extensions)
    }

    fn set_swap_interval(&mut self, interval: i32) -> Result<()> {
        let (surface, _) = self
            .current
            .ok_or_else(|| Error::BackendError("set_swap_interval: no current context".to_string()))?;
        let (Some(context), Some(native)) = (
            self.current_context(),
            self.surfaces.get(&surface).and_then(|record| record.native.as_ref()),
        ) else {
            return Err(Error::BackendError("set_swap_interval: no window surface".to_string()));
        };
        let interval = match u32::try_from(interval).ok().and_then(NonZeroU32::new) {
            Some(frames) => SwapInterval::Wait(frames),
            None => SwapInterval::DontWait,
        };
        native
            .set_swap_interval(context, interval)
            .map_err(|e| backend_error("set_swap_interval", e))
    }

    fn swap_buffers(&mut self, surface: SurfaceHandle) -> Result<()> {
        let native = self
            .record(surface, "swap_buffers")?
            .native
            .as_ref()
            .ok_or_else(|| Error::BackendError("swap_buffers: no window surface".to_string()))?;
        let context = self
            .current_context()
            .ok_or_else(|| Error::BackendError("swap_buffers: no current context".to_string()))?;
        native.swap_buffers(context).map_err(|e| backend_error("swap_buffers", e))
    }

    fn get_string(&mut self, name: StringName) -> String {
        let Some(gl) = self.gl() else {
            return String::new();
        };
        let parameter = match name {
            StringName::Vendor => glow::VENDOR,
            StringName::Renderer => glow::RENDERER,
            StringName::Version => glow::VERSION,
        };
        unsafe { gl.get_parameter_string(parameter) }
    }

    fn clear_depth(&mut self, depth: f32) {
        if let Some(gl) = self.gl() {
            unsafe { gl.clear_depth_f32(depth) };
        }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        let Some(gl) = self.gl() else {
            return;
        };
        unsafe {
            if enabled {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LEQUAL);
            } else {
                gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn set_cull_back_faces(&mut self, enabled: bool) {
        let Some(gl) = self.gl() else {
            return;
        };
        unsafe {
            if enabled {
                gl.enable(glow::CULL_FACE);
                gl.cull_face(glow::BACK);
                gl.front_face(glow::CW);
            } else {
                gl.disable(glow::CULL_FACE);
            }
        }
    }

    fn set_blending(&mut self, enabled: bool) {
        let Some(gl) = self.gl() else {
            return;
        };
        unsafe {
            if enabled {
                gl.enable(glow::BLEND);
                gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                gl.disable(glow::BLEND);
            }
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        if let Some(gl) = self.gl() {
            unsafe { gl.viewport(0, 0, width as i32, height as i32) };
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        if let Some(gl) = self.gl() {
            unsafe {
                gl.clear_color(color[0], color[1], color[2], color[3]);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }
        }
    }

    fn gen_vertex_array(&mut self) -> Result<GlName> {
        let gl = self.require_gl("gen_vertex_array")?;
        let vertex_array = unsafe { gl.create_vertex_array() }.map_err(|e| backend_error("gen_vertex_array", e))?;
        Ok(native_name(vertex_array.0))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<GlName>) {
        if let Some(gl) = self.gl() {
            let native = vertex_array.and_then(object).map(glow::NativeVertexArray);
            unsafe { gl.bind_vertex_array(native) };
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: GlName) {
        if let (Some(gl), Some(native)) = (self.gl(), object(vertex_array)) {
            unsafe { gl.delete_vertex_array(glow::NativeVertexArray(native)) };
        }
    }

    fn gen_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<GlName> {
        let gl = self.require_gl("gen_buffer")?;
        let target = buffer_target(target);
        let buffer = unsafe { gl.create_buffer() }.map_err(|e| backend_error("gen_buffer", e))?;
        unsafe {
            gl.bind_buffer(target, Some(buffer));
            gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
        Ok(native_name(buffer.0))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: GlName) {
        if let Some(gl) = self.gl() {
            let native = object(buffer).map(glow::NativeBuffer);
            unsafe { gl.bind_buffer(buffer_target(target), native) };
        }
    }

    fn delete_buffer(&mut self, buffer: GlName) {
        if let (Some(gl), Some(native)) = (self.gl(), object(buffer)) {
            unsafe { gl.delete_buffer(glow::NativeBuffer(native)) };
        }
    }

    fn vertex_attribute(&mut self, layout: &AttributeLayout) {
        if let Some(gl) = self.gl() {
            unsafe {
                gl.enable_vertex_attrib_array(layout.index);
                gl.vertex_attrib_pointer_f32(
                    layout.index,
                    layout.components,
                    glow::FLOAT,
                    false,
                    layout.stride as i32,
                    layout.offset as i32,
                );
            }
        }
    }

    fn draw_elements(&mut self, index_count: u32) -> Result<()> {
        let gl = self.require_gl("draw_elements")?;
        unsafe { gl.draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0) };
        Ok(())
    }

    fn gen_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<GlName> {
        let gl = self.require_gl("gen_texture")?;
        let texture = unsafe { gl.create_texture() }.map_err(|e| backend_error("gen_texture", e))?;
        unsafe {
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR_MIPMAP_LINEAR as i32);
            gl.generate_mipmap(glow::TEXTURE_2D);
        }
        Ok(native_name(texture.0))
    }

    fn bind_texture(&mut self, unit: u32, texture: GlName) {
        if let Some(gl) = self.gl() {
            let native = object(texture).map(glow::NativeTexture);
            unsafe {
                gl.active_texture(glow::TEXTURE0 + unit);
                gl.bind_texture(glow::TEXTURE_2D, native);
            }
        }
    }

    fn delete_texture(&mut self, texture: GlName) {
        if let (Some(gl), Some(native)) = (self.gl(), object(texture)) {
            unsafe { gl.delete_texture(glow::NativeTexture(native)) };
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> std::result::Result<GlName, String> {
        let gl = self.gl().ok_or_else(|| "no current context".to_string())?;
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = gl.create_shader(kind)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let diagnostic = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(diagnostic);
            }
            Ok(native_name(shader.0))
        }
    }

    fn delete_shader(&mut self, shader: GlName) {
        if let (Some(gl), Some(native)) = (self.gl(), object(shader)) {
            unsafe { gl.delete_shader(glow::NativeShader(native)) };
        }
    }

    fn create_program(&mut self) -> Result<GlName> {
        let gl = self.require_gl("create_program")?;
        let program = unsafe { gl.create_program() }.map_err(|e| backend_error("create_program", e))?;
        Ok(native_name(program.0))
    }

    fn attach_shader(&mut self, program: GlName, shader: GlName) {
        if let (Some(gl), Some(program), Some(shader)) = (self.gl(), object(program), object(shader)) {
            unsafe { gl.attach_shader(glow::NativeProgram(program), glow::NativeShader(shader)) };
        }
    }

    fn detach_shader(&mut self, program: GlName, shader: GlName) {
        if let (Some(gl), Some(program), Some(shader)) = (self.gl(), object(program), object(shader)) {
            unsafe { gl.detach_shader(glow::NativeProgram(program), glow::NativeShader(shader)) };
        }
    }

    fn bind_attribute_location(&mut self, program: GlName, index: u32, name: &str) {
        if let (Some(gl), Some(program)) = (self.gl(), object(program)) {
            unsafe { gl.bind_attrib_location(glow::NativeProgram(program), index, name) };
        }
    }

    fn link_program(&mut self, program: GlName) -> std::result::Result<(), String> {
        let gl = self.gl().ok_or_else(|| "no current context".to_string())?;
        let program = glow::NativeProgram(object(program).ok_or_else(|| "invalid program".to_string())?);
        unsafe {
            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                return Err(gl.get_program_info_log(program));
            }
        }
        Ok(())
    }

    fn delete_program(&mut self, program: GlName) {
        if let (Some(gl), Some(native)) = (self.gl(), object(program)) {
            unsafe { gl.delete_program(glow::NativeProgram(native)) };
        }
    }

    fn use_program(&mut self, program: GlName) {
        if let Some(gl) = self.gl() {
            let native = object(program).map(glow::NativeProgram);
            unsafe { gl.use_program(native) };
        }
    }

    fn uniform_location(&mut self, program: GlName, name: &str) -> Option<i32> {
        let gl = self.gl()?;
        let program = glow::NativeProgram(object(program)?);
        let location = unsafe { gl.get_uniform_location(program, name) }?;
        i32::try_from(location.0).ok()
    }

    fn uniform_matrix4(&mut self, location: i32, transpose: bool, value: &[f32; 16]) {
        if let Some(gl) = self.gl() {
            let location = glow::NativeUniformLocation(location as u32);
            unsafe { gl.uniform_matrix_4_f32_slice(Some(&location), transpose, value) };
        }
    }

    fn uniform_int(&mut self, location: i32, value: i32) {
        if let Some(gl) = self.gl() {
            let location = glow::NativeUniformLocation(location as u32);
            unsafe { gl.uniform_1_i32(Some(&location), value) };
        }
    }
}
