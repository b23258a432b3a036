/// Headless software implementation of [`GlDriver`]
///
/// Tracks windows, contexts and GL objects, rejects GL calls made without a
/// current context, and records what a frame did. Shared with tests through
/// [`SoftwareGlMonitor`].

use std::cell::RefCell;
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;
use rustc_hash::FxHashMap;
use twin_raster_engine::twinraster::{Error, Result};

use crate::gl_driver::{
    AttributeLayout, BufferTarget, ContextHandle, GlDriver, GlExtensions, GlName, PixelFormatRequest, ShaderStage,
    StringName, SurfaceHandle,
};

pub const VENDOR: &str = "TwinRaster";
pub const RENDERER: &str = "TwinRaster Software Rasterizer";
pub const VERSION: &str = "3.3.0 TwinRaster Software";

/// Kind of a live GL object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlObjectKind {
    VertexArray,
    Buffer(BufferTarget),
    Texture,
    Shader(ShaderStage),
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFlavor {
    Legacy,
    Versioned { major: u32, minor: u32 },
}

#[derive(Debug, Default)]
struct ProgramRecord {
    shaders: Vec<GlName>,
    uniforms: Vec<String>,
    linked: bool,
}

/// Observable state of the software GL implementation
#[derive(Debug)]
pub struct SoftwareGlState {
    next_id: u64,
    surfaces: FxHashMap<SurfaceHandle, bool>,
    contexts: FxHashMap<ContextHandle, ContextFlavor>,
    objects: FxHashMap<GlName, GlObjectKind>,
    shader_sources: FxHashMap<GlName, String>,
    programs: FxHashMap<GlName, ProgramRecord>,
    uniform_names: Vec<String>,
    /// Operation name that fails, e.g. "create_context_attribs"
    pub fail_on: Option<&'static str>,
    /// Extensions `load_extensions` reports
    pub supported: GlExtensions,
    /// Highest context version the attribs path accepts
    pub max_version: (u32, u32),
    pub current: Option<(SurfaceHandle, ContextHandle)>,
    pub hidden_windows_created: u32,
    pub extension_loads: u32,
    pub swap_interval: Option<i32>,
    pub frames_swapped: u32,
    pub clears: u32,
    pub draws: u32,
    pub indices_drawn: u64,
    pub viewport: (u32, u32),
    /// Last size passed to `resize_surface`
    pub surface_size: Option<(u32, u32)>,
    pub depth_test: bool,
    pub cull_back_faces: bool,
    pub blending: bool,
    pub pixel_format: Option<PixelFormatRequest>,
    pub bound_program: Option<GlName>,
    pub bound_texture: Option<GlName>,
    pub attribute_locations: FxHashMap<String, u32>,
    pub attributes: Vec<AttributeLayout>,
    /// Last value written per uniform name, with the transpose flag
    pub matrices: FxHashMap<String, ([f32; 16], bool)>,
    pub ints: FxHashMap<String, i32>,
    /// GL calls made without a current context or with a dead name
    pub invalid_calls: u32,
}

impl Default for SoftwareGlState {
    fn default() -> Self {
        Self {
            next_id: 0,
            surfaces: FxHashMap::default(),
            surface_size: None,
            contexts: FxHashMap::default(),
            objects: FxHashMap::default(),
            shader_sources: FxHashMap::default(),
            programs: FxHashMap::default(),
            uniform_names: Vec::new(),
            fail_on: None,
            supported: GlExtensions::all(),
            max_version: (4, 6),
            current: None,
            hidden_windows_created: 0,
            extension_loads: 0,
            swap_interval: None,
            frames_swapped: 0,
            clears: 0,
            draws: 0,
            indices_drawn: 0,
            viewport: (0, 0),
            depth_test: false,
            cull_back_faces: false,
            blending: false,
            pixel_format: None,
            bound_program: None,
            bound_texture: None,
            attribute_locations: FxHashMap::default(),
            attributes: Vec::new(),
            matrices: FxHashMap::default(),
            ints: FxHashMap::default(),
            invalid_calls: 0,
        }
    }
}

impl SoftwareGlState {
    pub fn live_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    pub fn context_flavor(&self, context: ContextHandle) -> Option<ContextFlavor> {
        self.contexts.get(&context).copied()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn live_of(&self, kind: GlObjectKind) -> usize {
        self.objects.values().filter(|k| **k == kind).count()
    }

    /// Windows, contexts and GL objects still alive
    pub fn total_live(&self) -> usize {
        self.surfaces.len() + self.contexts.len() + self.objects.len()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail_on == Some(operation) {
            return Err(Error::BackendError(format!("{} failed", operation)));
        }
        Ok(())
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// GL entry points need a current context
    fn gl_ready(&mut self) -> bool {
        if self.current.is_none() {
            self.invalid_calls += 1;
            return false;
        }
        true
    }

    fn allocate(&mut self, operation: &'static str, kind: GlObjectKind) -> Result<GlName> {
        self.check(operation)?;
        if !self.gl_ready() {
            return Err(Error::BackendError(format!("{}: no current context", operation)));
        }
        let name = GlName(self.next() as u32);
        self.objects.insert(name, kind);
        Ok(name)
    }

    fn verify(&mut self, name: GlName, kind: GlObjectKind) -> bool {
        let ok = self.gl_ready() && self.objects.get(&name) == Some(&kind);
        if !ok && self.current.is_some() {
            self.invalid_calls += 1;
        }
        ok
    }

    fn delete(&mut self, name: GlName) {
        if !self.gl_ready() {
            return;
        }
        if self.objects.remove(&name).is_none() {
            self.invalid_calls += 1;
        }
    }

    fn is_shader(&self, name: GlName) -> bool {
        matches!(self.objects.get(&name), Some(GlObjectKind::Shader(_)))
    }
}

pub type SoftwareGlMonitor = Rc<RefCell<SoftwareGlState>>;

/// Software OpenGL-style implementation
#[derive(Debug, Default)]
pub struct SoftwareGl {
    state: SoftwareGlMonitor,
}

impl SoftwareGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the named driver operation
    pub fn failing_on(self, operation: &'static str) -> Self {
        self.state.borrow_mut().fail_on = Some(operation);
        self
    }

    /// Report only `extensions` from `load_extensions`
    pub fn with_extensions(self, extensions: GlExtensions) -> Self {
        self.state.borrow_mut().supported = extensions;
        self
    }

    /// Refuse versioned contexts above `major.minor`
    pub fn with_max_version(self, major: u32, minor: u32) -> Self {
        self.state.borrow_mut().max_version = (major, minor);
        self
    }

    pub fn monitor(&self) -> SoftwareGlMonitor {
        Rc::clone(&self.state)
    }
}

/// Minimal GLSL sanity check: `main` present, braces balanced
fn validate_glsl(source: &str) -> std::result::Result<(), String> {
    if !source.contains("void main") {
        return Err("0:1(1): error: function `main' is not defined".to_string());
    }

    let mut depth = 0i32;
    for (line_index, line) in source.lines().enumerate() {
        for (column, c) in line.chars().enumerate() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!(
                    "0:{}({}): error: syntax error, unexpected '}}'",
                    line_index + 1,
                    column + 1
                ));
            }
        }
    }
    if depth != 0 {
        return Err(format!(
            "0:{}(1): error: syntax error, unexpected end of file",
            source.lines().count() + 1
        ));
    }
    Ok(())
}

impl GlDriver for SoftwareGl {
    fn create_surface(&mut self, window: Option<RawWindowHandle>) -> Result<SurfaceHandle> {
        let mut state = self.state.borrow_mut();
        state.check("create_surface")?;
        let surface = SurfaceHandle(state.next());
        let hidden = window.is_none();
        if hidden {
            state.hidden_windows_created += 1;
        }
        state.surfaces.insert(surface, hidden);
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) {
        let mut state = self.state.borrow_mut();
        if state.current.map(|(s, _)| s) == Some(surface) {
            // Destroying a window under a current context
            state.invalid_calls += 1;
        }
        if state.surfaces.remove(&surface).is_none() {
            state.invalid_calls += 1;
        }
    }

    fn resize_surface(&mut self, surface: SurfaceHandle, width: u32, height: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("resize_surface")?;
        if !state.surfaces.contains_key(&surface) {
            return Err(Error::BackendError("resize_surface: invalid surface".to_string()));
        }
        state.surface_size = Some((width, height));
        Ok(())
    }

    fn set_basic_pixel_format(&mut self, surface: SurfaceHandle) -> Result<()> {
        let state = self.state.borrow();
        state.check("set_basic_pixel_format")?;
        if !state.surfaces.contains_key(&surface) {
            return Err(Error::BackendError("set_basic_pixel_format: invalid surface".to_string()));
        }
        Ok(())
    }

    fn choose_pixel_format(&mut self, surface: SurfaceHandle, request: &PixelFormatRequest) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("choose_pixel_format")?;
        if !state.surfaces.contains_key(&surface) || !state.supported.contains(GlExtensions::PIXEL_FORMAT) {
            return Err(Error::BackendError("choose_pixel_format: no matching format".to_string()));
        }
        state.pixel_format = Some(*request);
        Ok(())
    }

    fn create_legacy_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle> {
        let mut state = self.state.borrow_mut();
        state.check("create_legacy_context")?;
        if !state.surfaces.contains_key(&surface) {
            return Err(Error::BackendError("create_legacy_context: invalid surface".to_string()));
        }
        let context = ContextHandle(state.next());
        state.contexts.insert(context, ContextFlavor::Legacy);
        Ok(context)
    }

    fn create_context_attribs(
        &mut self,
        surface: SurfaceHandle,
        major: u32,
        minor: u32,
        _core_profile: bool,
    ) -> Result<ContextHandle> {
        let mut state = self.state.borrow_mut();
        state.check("create_context_attribs")?;
        if state.extension_loads == 0 || !state.supported.contains(GlExtensions::CREATE_CONTEXT_ATTRIBS) {
            return Err(Error::BackendError("create_context_attribs: entry point not loaded".to_string()));
        }
        if !state.surfaces.contains_key(&surface) {
            return Err(Error::BackendError("create_context_attribs: invalid surface".to_string()));
        }
        if (major, minor) > state.max_version {
            return Err(Error::BackendError(format!("create_context_attribs: {}.{} not supported", major, minor)));
        }
        let context = ContextHandle(state.next());
        state.contexts.insert(context, ContextFlavor::Versioned { major, minor });
        Ok(context)
    }

    fn make_current(&mut self, target: Option<(SurfaceHandle, ContextHandle)>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some((surface, context)) = target {
            state.check("make_current")?;
            if !state.surfaces.contains_key(&surface) || !state.contexts.contains_key(&context) {
                return Err(Error::BackendError("make_current: invalid surface or context".to_string()));
            }
        }
        state.current = target;
        Ok(())
    }

    fn delete_context(&mut self, context: ContextHandle) {
        let mut state = self.state.borrow_mut();
        if state.current.map(|(_, c)| c) == Some(context) {
            state.current = None;
        }
        if state.contexts.remove(&context).is_none() {
            state.invalid_calls += 1;
        }
    }

    fn load_extensions(&mut self) -> Result<GlExtensions> {
        let mut state = self.state.borrow_mut();
        state.check("load_extensions")?;
        if state.current.is_none() {
            return Err(Error::BackendError("load_extensions: no current context".to_string()));
        }
        state.extension_loads += 1;
        Ok(state.supported)
    }

    fn set_swap_interval(&mut self, interval: i32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("set_swap_interval")?;
        if !state.gl_ready() {
            return Err(Error::BackendError("set_swap_interval: no current context".to_string()));
        }
        state.swap_interval = Some(interval);
        Ok(())
    }

    fn swap_buffers(&mut self, surface: SurfaceHandle) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("swap_buffers")?;
        if !state.surfaces.contains_key(&surface) {
            return Err(Error::BackendError("swap_buffers: invalid surface".to_string()));
        }
        state.frames_swapped += 1;
        Ok(())
    }

    fn get_string(&mut self, name: StringName) -> String {
        if !self.state.borrow_mut().gl_ready() {
            return String::new();
        }
        match name {
            StringName::Vendor => VENDOR,
            StringName::Renderer => RENDERER,
            StringName::Version => VERSION,
        }
        .to_string()
    }

    fn clear_depth(&mut self, _depth: f32) {
        self.state.borrow_mut().gl_ready();
    }

    fn set_depth_test(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.depth_test = enabled;
        }
    }

    fn set_cull_back_faces(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.cull_back_faces = enabled;
        }
    }

    fn set_blending(&mut self, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.blending = enabled;
        }
    }

    fn viewport(&mut self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.viewport = (width, height);
        }
    }

    fn clear(&mut self, _color: [f32; 4]) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.clears += 1;
        }
    }

    fn gen_vertex_array(&mut self) -> Result<GlName> {
        self.state.borrow_mut().allocate("gen_vertex_array", GlObjectKind::VertexArray)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<GlName>) {
        let mut state = self.state.borrow_mut();
        match vertex_array {
            Some(name) => {
                state.verify(name, GlObjectKind::VertexArray);
            }
            None => {
                state.gl_ready();
            }
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: GlName) {
        self.state.borrow_mut().delete(vertex_array);
    }

    fn gen_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<GlName> {
        if data.is_empty() {
            return Err(Error::BackendError("gen_buffer: empty data".to_string()));
        }
        self.state.borrow_mut().allocate("gen_buffer", GlObjectKind::Buffer(target))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: GlName) {
        self.state.borrow_mut().verify(buffer, GlObjectKind::Buffer(target));
    }

    fn delete_buffer(&mut self, buffer: GlName) {
        self.state.borrow_mut().delete(buffer);
    }

    fn vertex_attribute(&mut self, layout: &AttributeLayout) {
        let mut state = self.state.borrow_mut();
        if state.gl_ready() {
            state.attributes.retain(|a| a.index != layout.index);
            state.attributes.push(*layout);
        }
    }

    fn draw_elements(&mut self, index_count: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("draw_elements")?;
        if !state.gl_ready() {
            return Err(Error::BackendError("draw_elements: no current context".to_string()));
        }
        state.draws += 1;
        state.indices_drawn += u64::from(index_count);
        Ok(())
    }

    fn gen_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<GlName> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(Error::BackendError("gen_texture: pixel data does not match size".to_string()));
        }
        self.state.borrow_mut().allocate("gen_texture", GlObjectKind::Texture)
    }

    fn bind_texture(&mut self, _unit: u32, texture: GlName) {
        let mut state = self.state.borrow_mut();
        if state.verify(texture, GlObjectKind::Texture) {
            state.bound_texture = Some(texture);
        }
    }

    fn delete_texture(&mut self, texture: GlName) {
        self.state.borrow_mut().delete(texture);
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> std::result::Result<GlName, String> {
        validate_glsl(source)?;
        let mut state = self.state.borrow_mut();
        let shader = state
            .allocate("compile_shader", GlObjectKind::Shader(stage))
            .map_err(|e| e.to_string())?;
        state.shader_sources.insert(shader, source.to_string());
        Ok(shader)
    }

    fn delete_shader(&mut self, shader: GlName) {
        let mut state = self.state.borrow_mut();
        state.shader_sources.remove(&shader);
        state.delete(shader);
    }

    fn create_program(&mut self) -> Result<GlName> {
        let mut state = self.state.borrow_mut();
        let program = state.allocate("create_program", GlObjectKind::Program)?;
        state.programs.insert(program, ProgramRecord::default());
        Ok(program)
    }

    fn attach_shader(&mut self, program: GlName, shader: GlName) {
        let mut state = self.state.borrow_mut();
        if !state.verify(program, GlObjectKind::Program) || !state.is_shader(shader) {
            return;
        }
        if let Some(record) = state.programs.get_mut(&program) {
            record.shaders.push(shader);
        }
    }

    fn detach_shader(&mut self, program: GlName, shader: GlName) {
        let mut state = self.state.borrow_mut();
        if !state.verify(program, GlObjectKind::Program) {
            return;
        }
        if let Some(record) = state.programs.get_mut(&program) {
            record.shaders.retain(|s| *s != shader);
        }
    }

    fn bind_attribute_location(&mut self, program: GlName, index: u32, name: &str) {
        let mut state = self.state.borrow_mut();
        if state.verify(program, GlObjectKind::Program) {
            state.attribute_locations.insert(name.to_string(), index);
        }
    }

    fn link_program(&mut self, program: GlName) -> std::result::Result<(), String> {
        let mut state = self.state.borrow_mut();
        state.check("link_program").map_err(|e| e.to_string())?;
        if !state.verify(program, GlObjectKind::Program) {
            return Err("error: invalid program".to_string());
        }
        let shaders = state.programs.get(&program).map(|r| r.shaders.clone()).unwrap_or_default();
        let has = |stage: ShaderStage| shaders.iter().any(|s| state.objects.get(s) == Some(&GlObjectKind::Shader(stage)));
        if !has(ShaderStage::Vertex) || !has(ShaderStage::Fragment) {
            return Err("error: linking requires a vertex and a fragment shader".to_string());
        }

        // Every `uniform <type> <name>;` declaration becomes an active uniform
        let mut uniforms = Vec::new();
        for shader in &shaders {
            let Some(source) = state.shader_sources.get(shader) else {
                continue;
            };
            for line in source.lines() {
                let mut words = line.trim().trim_end_matches(';').split_whitespace();
                if words.next() == Some("uniform") {
                    if let Some(name) = words.nth(1) {
                        uniforms.push(name.to_string());
                    }
                }
            }
        }
        if let Some(record) = state.programs.get_mut(&program) {
            record.uniforms = uniforms;
            record.linked = true;
        }
        Ok(())
    }

    fn delete_program(&mut self, program: GlName) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.bound_program == Some(program) {
            state.bound_program = None;
        }
        state.delete(program);
    }

    fn use_program(&mut self, program: GlName) {
        let mut state = self.state.borrow_mut();
        let linked = state.programs.get(&program).map(|r| r.linked).unwrap_or(false);
        if state.verify(program, GlObjectKind::Program) {
            if linked {
                state.bound_program = Some(program);
            } else {
                state.invalid_calls += 1;
            }
        }
    }

    fn uniform_location(&mut self, program: GlName, name: &str) -> Option<i32> {
        let mut state = self.state.borrow_mut();
        if !state.verify(program, GlObjectKind::Program) {
            return None;
        }
        let declared = state.programs.get(&program)?.uniforms.iter().any(|u| u == name);
        if !declared {
            return None;
        }
        let location = match state.uniform_names.iter().position(|u| u == name) {
            Some(index) => index,
            None => {
                state.uniform_names.push(name.to_string());
                state.uniform_names.len() - 1
            }
        };
        Some(location as i32)
    }

    fn uniform_matrix4(&mut self, location: i32, transpose: bool, value: &[f32; 16]) {
        let mut state = self.state.borrow_mut();
        if state.bound_program.is_none() || !state.gl_ready() {
            state.invalid_calls += 1;
            return;
        }
        if let Some(name) = state.uniform_names.get(location as usize).cloned() {
            state.matrices.insert(name, (*value, transpose));
        }
    }

    fn uniform_int(&mut self, location: i32, value: i32) {
        let mut state = self.state.borrow_mut();
        if state.bound_program.is_none() || !state.gl_ready() {
            state.invalid_calls += 1;
            return;
        }
        if let Some(name) = state.uniform_names.get(location as usize).cloned() {
            state.ints.insert(name, value);
        }
    }
}
