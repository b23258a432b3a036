/// Headless software implementation of [`D3dDriver`]
///
/// Tracks every native object it hands out, validates handles on use and
/// records what a frame did. Used where no native device is available (CI,
/// non-Windows hosts) and by the integration tests through [`SoftwareD3dMonitor`].

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use twin_raster_engine::twinraster::{Error, Result};

use crate::d3d_driver::{
    AdapterDesc, BufferKind, D3dDriver, DeviceObjects, DisplayMode, InputElement, NativeHandle, ProgramBinding,
    RasterizerDesc, Rational, SwapChainDesc,
};

/// Kind of a live native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Device,
    Context,
    SwapChain,
    BackBuffer,
    RenderTargetView,
    DepthBuffer,
    DepthStencilState,
    DepthStencilView,
    RasterizerState,
    BlendState { enabled: bool },
    Buffer(BufferKind),
    Bytecode,
    VertexShader,
    PixelShader,
    InputLayout,
    Sampler,
    Texture,
    ShaderResourceView,
}

/// Observable state of the software device
#[derive(Debug, Default)]
pub struct SoftwareD3dState {
    next_handle: u64,
    objects: FxHashMap<NativeHandle, NativeKind>,
    /// Operation name that fails, e.g. "create_depth_buffer"
    pub fail_on: Option<&'static str>,
    /// Mode list reported instead of the built-in one
    pub display_modes: Option<Vec<DisplayMode>>,
    pub frames_presented: u32,
    pub last_sync_interval: Option<u32>,
    pub clears: u32,
    pub draws: u32,
    pub indices_drawn: u64,
    pub swap_chain_size: (u32, u32),
    pub swap_chain_refresh: Option<Rational>,
    pub resizes: u32,
    pub fullscreen: bool,
    pub viewport: (f32, f32),
    pub blending: bool,
    pub bound_program: Option<ProgramBinding>,
    /// Last bytes written to a constant buffer
    pub last_constants: Vec<u8>,
    /// Calls made with a handle that is not live (or of the wrong kind)
    pub invalid_calls: u32,
}

impl SoftwareD3dState {
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn live_of(&self, kind: NativeKind) -> usize {
        self.objects.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail_on == Some(operation) {
            return Err(Error::BackendError(format!("{} failed (E_FAIL)", operation)));
        }
        Ok(())
    }

    fn create(&mut self, operation: &'static str, kind: NativeKind) -> Result<NativeHandle> {
        self.check(operation)?;
        self.next_handle += 1;
        let handle = NativeHandle(self.next_handle);
        self.objects.insert(handle, kind);
        Ok(handle)
    }

    fn verify(&mut self, handle: NativeHandle, kind: NativeKind) -> bool {
        let ok = self.objects.get(&handle) == Some(&kind);
        if !ok {
            self.invalid_calls += 1;
        }
        ok
    }

    fn verify_any(&mut self, handle: NativeHandle, accept: impl Fn(NativeKind) -> bool) -> bool {
        let ok = self.objects.get(&handle).copied().map(accept).unwrap_or(false);
        if !ok {
            self.invalid_calls += 1;
        }
        ok
    }
}

/// Shared view of a [`SoftwareD3d`] device kept by tests after the driver is boxed
pub type SoftwareD3dMonitor = Rc<RefCell<SoftwareD3dState>>;

/// Software Direct3D-style device
#[derive(Debug, Default)]
pub struct SoftwareD3d {
    state: SoftwareD3dMonitor,
}

impl SoftwareD3d {
    pub const ADAPTER_DESCRIPTION: &'static str = "TwinRaster Software Adapter";
    pub const ADAPTER_MEMORY: u64 = 256 * 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the named driver operation
    pub fn failing_on(self, operation: &'static str) -> Self {
        self.state.borrow_mut().fail_on = Some(operation);
        self
    }

    /// Report `modes` as the output's mode list
    pub fn with_display_modes(self, modes: Vec<DisplayMode>) -> Self {
        self.state.borrow_mut().display_modes = Some(modes);
        self
    }

    pub fn monitor(&self) -> SoftwareD3dMonitor {
        Rc::clone(&self.state)
    }
}

/// Minimal HLSL sanity check: entry point present, braces balanced
fn validate_hlsl(source: &str, entry_point: &str, target: &str) -> std::result::Result<(), String> {
    if !source.contains(&format!("{}(", entry_point)) && !source.contains(&format!("{} (", entry_point)) {
        return Err(format!(
            "error X3501: '{}': entrypoint not found (target {})",
            entry_point, target
        ));
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
                    "({},{}): error X3000: syntax error: unexpected token '}}'",
                    line_index + 1,
                    column + 1
                ));
            }
        }
    }
    if depth != 0 {
        return Err(format!(
            "({},1): error X3000: syntax error: unexpected end of file",
            source.lines().count() + 1
        ));
    }
    Ok(())
}

impl D3dDriver for SoftwareD3d {
    fn primary_adapter(&mut self) -> Result<AdapterDesc> {
        self.state.borrow().check("primary_adapter")?;
        Ok(AdapterDesc {
            description: Self::ADAPTER_DESCRIPTION.to_string(),
            dedicated_video_memory: Self::ADAPTER_MEMORY,
        })
    }

    fn display_modes(&mut self) -> Result<Vec<DisplayMode>> {
        let state = self.state.borrow();
        state.check("display_modes")?;
        if let Some(modes) = &state.display_modes {
            return Ok(modes.clone());
        }
        let ntsc = Rational { numerator: 60000, denominator: 1001 };
        Ok([(640, 480), (800, 600), (1024, 768), (1280, 720), (1920, 1080)]
            .into_iter()
            .map(|(width, height)| DisplayMode { width, height, refresh_rate: ntsc })
            .chain([
                DisplayMode { width: 1024, height: 768, refresh_rate: Rational { numerator: 75, denominator: 1 } },
                DisplayMode { width: 1920, height: 1080, refresh_rate: Rational { numerator: 144, denominator: 1 } },
            ])
            .collect())
    }

    fn create_device_and_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<DeviceObjects> {
        let mut state = self.state.borrow_mut();
        state.check("create_device_and_swap_chain")?;
        // All three objects or none
        state.check("create_swap_chain")?;
        let device = state.create("create_device", NativeKind::Device)?;
        let context = state.create("create_context", NativeKind::Context)?;
        let swap_chain = state.create("create_swap_chain", NativeKind::SwapChain)?;
        state.swap_chain_size = (desc.width, desc.height);
        state.swap_chain_refresh = Some(desc.refresh_rate);
        state.fullscreen = desc.fullscreen;
        Ok(DeviceObjects { device, context, swap_chain })
    }

    fn back_buffer(&mut self, swap_chain: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(swap_chain, NativeKind::SwapChain) {
            return Err(Error::BackendError("back_buffer: invalid swap chain".to_string()));
        }
        state.create("back_buffer", NativeKind::BackBuffer)
    }

    fn resize_buffers(&mut self, swap_chain: NativeHandle, width: u32, height: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("resize_buffers")?;
        if !state.verify(swap_chain, NativeKind::SwapChain) {
            return Err(Error::BackendError("resize_buffers: invalid swap chain".to_string()));
        }
        // Buffers cannot be resized while views on them are alive
        if state.live_of(NativeKind::RenderTargetView) > 0 || state.live_of(NativeKind::BackBuffer) > 0 {
            return Err(Error::BackendError("resize_buffers: back buffer still referenced".to_string()));
        }
        state.swap_chain_size = (width, height);
        state.resizes += 1;
        Ok(())
    }

    fn set_fullscreen_state(&mut self, swap_chain: NativeHandle, fullscreen: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.verify(swap_chain, NativeKind::SwapChain) {
            return Err(Error::BackendError("set_fullscreen_state: invalid swap chain".to_string()));
        }
        state.fullscreen = fullscreen;
        Ok(())
    }

    fn present(&mut self, swap_chain: NativeHandle, sync_interval: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("present")?;
        if !state.verify(swap_chain, NativeKind::SwapChain) {
            return Err(Error::BackendError("present: invalid swap chain".to_string()));
        }
        state.frames_presented += 1;
        state.last_sync_interval = Some(sync_interval);
        Ok(())
    }

    fn create_render_target_view(&mut self, resource: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(resource, NativeKind::BackBuffer) {
            return Err(Error::BackendError("create_render_target_view: invalid resource".to_string()));
        }
        state.create("create_render_target_view", NativeKind::RenderTargetView)
    }

    fn create_depth_buffer(&mut self, _width: u32, _height: u32, _sample_count: u32) -> Result<NativeHandle> {
        self.state.borrow_mut().create("create_depth_buffer", NativeKind::DepthBuffer)
    }

    fn create_depth_stencil_state(&mut self, _depth_enabled: bool) -> Result<NativeHandle> {
        self.state
            .borrow_mut()
            .create("create_depth_stencil_state", NativeKind::DepthStencilState)
    }

    fn create_depth_stencil_view(&mut self, depth_buffer: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(depth_buffer, NativeKind::DepthBuffer) {
            return Err(Error::BackendError("create_depth_stencil_view: invalid depth buffer".to_string()));
        }
        state.create("create_depth_stencil_view", NativeKind::DepthStencilView)
    }

    fn create_rasterizer_state(&mut self, _desc: &RasterizerDesc) -> Result<NativeHandle> {
        self.state
            .borrow_mut()
            .create("create_rasterizer_state", NativeKind::RasterizerState)
    }

    fn create_blend_state(&mut self, enabled: bool) -> Result<NativeHandle> {
        self.state
            .borrow_mut()
            .create("create_blend_state", NativeKind::BlendState { enabled })
    }

    fn set_render_targets(&mut self, render_target: Option<NativeHandle>, depth_stencil: Option<NativeHandle>) {
        let mut state = self.state.borrow_mut();
        if let Some(view) = render_target {
            state.verify(view, NativeKind::RenderTargetView);
        }
        if let Some(view) = depth_stencil {
            state.verify(view, NativeKind::DepthStencilView);
        }
    }

    fn set_depth_stencil_state(&mut self, state_handle: NativeHandle) {
        self.state.borrow_mut().verify(state_handle, NativeKind::DepthStencilState);
    }

    fn set_rasterizer_state(&mut self, state_handle: NativeHandle) {
        self.state.borrow_mut().verify(state_handle, NativeKind::RasterizerState);
    }

    fn set_blend_state(&mut self, state_handle: NativeHandle) {
        let mut state = self.state.borrow_mut();
        match state.objects.get(&state_handle).copied() {
            Some(NativeKind::BlendState { enabled }) => state.blending = enabled,
            _ => state.invalid_calls += 1,
        }
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        self.state.borrow_mut().viewport = (width, height);
    }

    fn clear_render_target_view(&mut self, view: NativeHandle, _color: [f32; 4]) {
        let mut state = self.state.borrow_mut();
        if state.verify(view, NativeKind::RenderTargetView) {
            state.clears += 1;
        }
    }

    fn clear_depth_stencil_view(&mut self, view: NativeHandle, _depth: f32, _stencil: u8) {
        self.state.borrow_mut().verify(view, NativeKind::DepthStencilView);
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<NativeHandle> {
        if data.is_empty() {
            return Err(Error::BackendError("create_buffer: zero-sized buffer (E_INVALIDARG)".to_string()));
        }
        self.state.borrow_mut().create("create_buffer", NativeKind::Buffer(kind))
    }

    fn update_buffer(&mut self, buffer: NativeHandle, data: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.verify(buffer, NativeKind::Buffer(BufferKind::Constant)) {
            return Err(Error::BackendError("update_buffer: invalid constant buffer".to_string()));
        }
        state.last_constants = data.to_vec();
        Ok(())
    }

    fn set_vertex_buffer(&mut self, buffer: NativeHandle, _stride: u32) {
        self.state.borrow_mut().verify(buffer, NativeKind::Buffer(BufferKind::Vertex));
    }

    fn set_index_buffer(&mut self, buffer: NativeHandle) {
        self.state.borrow_mut().verify(buffer, NativeKind::Buffer(BufferKind::Index));
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check("draw_indexed")?;
        state.draws += 1;
        state.indices_drawn += u64::from(index_count);
        Ok(())
    }

    fn create_texture_2d(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<NativeHandle> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(Error::BackendError("create_texture_2d: bad initial data (E_INVALIDARG)".to_string()));
        }
        self.state.borrow_mut().create("create_texture_2d", NativeKind::Texture)
    }

    fn create_shader_resource_view(&mut self, texture: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(texture, NativeKind::Texture) {
            return Err(Error::BackendError("create_shader_resource_view: invalid texture".to_string()));
        }
        state.create("create_shader_resource_view", NativeKind::ShaderResourceView)
    }

    fn create_sampler_state(&mut self) -> Result<NativeHandle> {
        self.state.borrow_mut().create("create_sampler_state", NativeKind::Sampler)
    }

    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        target: &str,
    ) -> std::result::Result<NativeHandle, String> {
        validate_hlsl(source, entry_point, target)?;
        self.state
            .borrow_mut()
            .create("compile_shader", NativeKind::Bytecode)
            .map_err(|e| e.to_string())
    }

    fn create_vertex_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(bytecode, NativeKind::Bytecode) {
            return Err(Error::BackendError("create_vertex_shader: invalid bytecode".to_string()));
        }
        state.create("create_vertex_shader", NativeKind::VertexShader)
    }

    fn create_pixel_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if !state.verify(bytecode, NativeKind::Bytecode) {
            return Err(Error::BackendError("create_pixel_shader: invalid bytecode".to_string()));
        }
        state.create("create_pixel_shader", NativeKind::PixelShader)
    }

    fn create_input_layout(&mut self, elements: &[InputElement], bytecode: NativeHandle) -> Result<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if elements.is_empty() || !state.verify(bytecode, NativeKind::Bytecode) {
            return Err(Error::BackendError("create_input_layout: invalid arguments".to_string()));
        }
        state.create("create_input_layout", NativeKind::InputLayout)
    }

    fn bind_program(&mut self, binding: &ProgramBinding) {
        let mut state = self.state.borrow_mut();
        state.verify(binding.vertex_shader, NativeKind::VertexShader);
        state.verify(binding.pixel_shader, NativeKind::PixelShader);
        state.verify(binding.input_layout, NativeKind::InputLayout);
        state.verify(binding.constants, NativeKind::Buffer(BufferKind::Constant));
        state.verify(binding.sampler, NativeKind::Sampler);
        if let Some(texture) = binding.texture {
            state.verify_any(texture, |kind| kind == NativeKind::ShaderResourceView);
        }
        state.bound_program = Some(*binding);
    }

    fn release(&mut self, object: NativeHandle) {
        let mut state = self.state.borrow_mut();
        if state.objects.remove(&object).is_none() {
            // Double release
            state.invalid_calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hlsl_reports_missing_entry_point() {
        let result = validate_hlsl("float4 main() : SV_TARGET { return 1; }", "PSMain", "ps_5_0");
        let diagnostic = result.unwrap_err();
        assert!(diagnostic.contains("X3501"));
        assert!(diagnostic.contains("PSMain"));
    }

    #[test]
    fn test_validate_hlsl_reports_unbalanced_braces() {
        let result = validate_hlsl("float4 PSMain() {\n return 1;\n", "PSMain", "ps_5_0");
        assert!(result.unwrap_err().contains("X3000"));
    }

    #[test]
    fn test_release_twice_is_flagged() {
        let mut driver = SoftwareD3d::new();
        let monitor = driver.monitor();
        let sampler = driver.create_sampler_state().unwrap();

        driver.release(sampler);
        driver.release(sampler);

        assert_eq!(monitor.borrow().live_objects(), 0);
        assert_eq!(monitor.borrow().invalid_calls, 1);
    }

    #[test]
    fn test_fault_injection() {
        let mut driver = SoftwareD3d::new().failing_on("create_depth_buffer");
        assert!(driver.create_depth_buffer(8, 8, 1).is_err());
        assert!(driver.create_sampler_state().is_ok());
    }
}
