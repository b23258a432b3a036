/// Native Direct3D 11 driver over DXGI and the `windows` crate
///
/// Every COM object lives in one table keyed by [`NativeHandle`] as an
/// `IUnknown`, and is queried back to its interface on use. Releasing a
/// handle drops the table's reference.

use std::ffi::{c_void, CString};

use raw_window_handle::RawWindowHandle;
use rustc_hash::FxHashMap;
use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{Error, Result};
use windows::core::{IUnknown, Interface, PCSTR};
use windows::Win32::Foundation::{BOOL, HMODULE, HWND};
use windows::Win32::Graphics::Direct3D::Fxc::{D3DCompile, D3DCOMPILE_ENABLE_STRICTNESS};
use windows::Win32::Graphics::Direct3D::{
    ID3DBlob, ID3DInclude, D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL_11_0, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use crate::d3d_driver::{
    AdapterDesc, BufferKind, CullMode, D3dDriver, DeviceObjects, DisplayMode, ElementFormat, InputElement,
    NativeHandle, ProgramBinding, RasterizerDesc, Rational, SwapChainDesc,
};

const BACK_BUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;

fn backend_error(operation: &str, error: impl std::fmt::Display) -> Error {
    Error::BackendError(format!("{}: {}", operation, error))
}

fn element_format(format: ElementFormat) -> DXGI_FORMAT {
    match format {
        ElementFormat::R32G32B32Float => DXGI_FORMAT_R32G32B32_FLOAT,
        ElementFormat::R32G32B32A32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
        ElementFormat::R32G32Float => DXGI_FORMAT_R32G32_FLOAT,
    }
}

/// Text of a compiler message blob
fn blob_text(blob: &ID3DBlob) -> String {
    String::from_utf8_lossy(blob_bytes(blob)).trim_end_matches('\0').to_string()
}

fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

#[derive(Default)]
pub struct NativeD3d {
    objects: FxHashMap<NativeHandle, IUnknown>,
    device: Option<NativeHandle>,
    context: Option<NativeHandle>,
    next_id: u64,
}

impl NativeD3d {
    pub fn new(_system: &SystemInfo) -> Result<Self> {
        Ok(Self::default())
    }

    fn insert<T: Interface>(&mut self, object: &T) -> Result<NativeHandle> {
        let unknown: IUnknown = object.cast().map_err(|e| backend_error("insert", e))?;
        self.next_id += 1;
        let handle = NativeHandle(self.next_id);
        self.objects.insert(handle, unknown);
        Ok(handle)
    }

    fn get<T: Interface>(&self, handle: NativeHandle, operation: &str) -> Result<T> {
        self.objects
            .get(&handle)
            .ok_or_else(|| Error::BackendError(format!("{}: invalid handle", operation)))?
            .cast()
            .map_err(|e| backend_error(operation, e))
    }

    fn device(&self, operation: &str) -> Result<ID3D11Device> {
        let handle = self
            .device
            .ok_or_else(|| Error::BackendError(format!("{}: no device", operation)))?;
        self.get(handle, operation)
    }

    fn context(&self) -> Option<ID3D11DeviceContext> {
        self.context.and_then(|handle| self.get(handle, "context").ok())
    }

    fn primary_output(&self) -> Result<(IDXGIAdapter1, IDXGIOutput)> {
        unsafe {
            let factory: IDXGIFactory1 = CreateDXGIFactory1().map_err(|e| backend_error("CreateDXGIFactory1", e))?;
            let adapter = factory.EnumAdapters1(0).map_err(|e| backend_error("EnumAdapters1", e))?;
            let output = adapter.EnumOutputs(0).map_err(|e| backend_error("EnumOutputs", e))?;
            Ok((adapter, output))
        }
    }

    fn created<T: Interface>(&mut self, object: Option<T>, operation: &str) -> Result<NativeHandle> {
        let object = object.ok_or_else(|| Error::BackendError(format!("{}: no object returned", operation)))?;
        self.insert(&object)
    }
}

impl D3dDriver for NativeD3d {
    fn primary_adapter(&mut self) -> Result<AdapterDesc> {
        let (adapter, _) = self.primary_output()?;
        let desc = unsafe { adapter.GetDesc1() }.map_err(|e| backend_error("GetDesc1", e))?;
        let length = desc.Description.iter().position(|c| *c == 0).unwrap_or(desc.Description.len());
        Ok(AdapterDesc {
            description: String::from_utf16_lossy(&desc.Description[..length]),
            dedicated_video_memory: desc.DedicatedVideoMemory as u64,
        })
    }

    fn display_modes(&mut self) -> Result<Vec<DisplayMode>> {
        let (_, output) = self.primary_output()?;
        let mut count = 0u32;
        unsafe {
            output
                .GetDisplayModeList(BACK_BUFFER_FORMAT, DXGI_ENUM_MODES_INTERLACED, &mut count, None)
                .map_err(|e| backend_error("GetDisplayModeList", e))?;
        }
        let mut modes = vec![DXGI_MODE_DESC::default(); count as usize];
        unsafe {
            output
                .GetDisplayModeList(BACK_BUFFER_FORMAT, DXGI_ENUM_MODES_INTERLACED, &mut count, Some(modes.as_mut_ptr()))
                .map_err(|e| backend_error("GetDisplayModeList", e))?;
        }
        modes.truncate(count as usize);

        Ok(modes
            .iter()
            .map(|mode| DisplayMode {
                width: mode.Width,
                height: mode.Height,
                refresh_rate: Rational {
                    numerator: mode.RefreshRate.Numerator,
                    denominator: mode.RefreshRate.Denominator,
                },
            })
            .collect())
    }

    fn create_device_and_swap_chain(&mut self, desc: &SwapChainDesc) -> Result<DeviceObjects> {
        let Some(RawWindowHandle::Win32(window)) = desc.window else {
            return Err(Error::NotSupported("Direct3D needs a Win32 window".to_string()));
        };

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: desc.width,
                Height: desc.height,
                RefreshRate: DXGI_RATIONAL {
                    Numerator: desc.refresh_rate.numerator,
                    Denominator: desc.refresh_rate.denominator,
                },
                Format: BACK_BUFFER_FORMAT,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC { Count: desc.sample_count.max(1), Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: HWND(window.hwnd.get() as *mut c_void),
            Windowed: BOOL::from(!desc.fullscreen),
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            ..Default::default()
        };

        let mut swap_chain = None;
        let mut device = None;
        let mut context = None;
        unsafe {
            D3D11CreateDeviceAndSwapChain(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                D3D11_CREATE_DEVICE_FLAG(0),
                Some(&[D3D_FEATURE_LEVEL_11_0]),
                D3D11_SDK_VERSION,
                Some(&swap_chain_desc),
                Some(&mut swap_chain),
                Some(&mut device),
                None,
                Some(&mut context),
            )
            .map_err(|e| backend_error("D3D11CreateDeviceAndSwapChain", e))?;
        }
        let (Some(swap_chain), Some(device), Some(context)) = (swap_chain, device, context) else {
            return Err(Error::BackendError("D3D11CreateDeviceAndSwapChain: no objects returned".to_string()));
        };

        let objects = DeviceObjects {
            device: self.insert(&device)?,
            context: self.insert(&context)?,
            swap_chain: self.insert(&swap_chain)?,
        };
        self.device = Some(objects.device);
        self.context = Some(objects.context);
        unsafe { context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST) };
        Ok(objects)
    }

    fn back_buffer(&mut self, swap_chain: NativeHandle) -> Result<NativeHandle> {
        let swap_chain: IDXGISwapChain = self.get(swap_chain, "back_buffer")?;
        let texture: ID3D11Texture2D = unsafe { swap_chain.GetBuffer(0) }.map_err(|e| backend_error("GetBuffer", e))?;
        self.insert(&texture)
    }

    fn resize_buffers(&mut self, swap_chain: NativeHandle, width: u32, height: u32) -> Result<()> {
        let swap_chain: IDXGISwapChain = self.get(swap_chain, "resize_buffers")?;
        unsafe { swap_chain.ResizeBuffers(0, width, height, DXGI_FORMAT_UNKNOWN, Default::default()) }
            .map_err(|e| backend_error("ResizeBuffers", e))
    }

    fn set_fullscreen_state(&mut self, swap_chain: NativeHandle, fullscreen: bool) -> Result<()> {
        let swap_chain: IDXGISwapChain = self.get(swap_chain, "set_fullscreen_state")?;
        unsafe { swap_chain.SetFullscreenState(BOOL::from(fullscreen), None::<&IDXGIOutput>) }
            .map_err(|e| backend_error("SetFullscreenState", e))
    }

    fn present(&mut self, swap_chain: NativeHandle, sync_interval: u32) -> Result<()> {
        let swap_chain: IDXGISwapChain = self.get(swap_chain, "present")?;
        unsafe { swap_chain.Present(sync_interval, Default::default()) }
            .ok()
            .map_err(|e| backend_error("Present", e))
    }

    fn create_render_target_view(&mut self, resource: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_render_target_view")?;
        let resource: ID3D11Resource = self.get(resource, "create_render_target_view")?;
        let mut view = None;
        unsafe { device.CreateRenderTargetView(&resource, None, Some(&mut view)) }
            .map_err(|e| backend_error("CreateRenderTargetView", e))?;
        self.created(view, "CreateRenderTargetView")
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32, sample_count: u32) -> Result<NativeHandle> {
        let device = self.device("create_depth_buffer")?;
        let desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_D24_UNORM_S8_UINT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: sample_count.max(1), Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
            ..Default::default()
        };
        let mut texture = None;
        unsafe { device.CreateTexture2D(&desc, None, Some(&mut texture)) }
            .map_err(|e| backend_error("CreateTexture2D", e))?;
        self.created(texture, "CreateTexture2D")
    }

    fn create_depth_stencil_state(&mut self, depth_enabled: bool) -> Result<NativeHandle> {
        let device = self.device("create_depth_stencil_state")?;
        let face = D3D11_DEPTH_STENCILOP_DESC {
            StencilFailOp: D3D11_STENCIL_OP_KEEP,
            StencilDepthFailOp: D3D11_STENCIL_OP_KEEP,
            StencilPassOp: D3D11_STENCIL_OP_KEEP,
            StencilFunc: D3D11_COMPARISON_ALWAYS,
        };
        let desc = D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: BOOL::from(depth_enabled),
            DepthWriteMask: D3D11_DEPTH_WRITE_MASK_ALL,
            DepthFunc: D3D11_COMPARISON_LESS_EQUAL,
            StencilEnable: BOOL::from(false),
            StencilReadMask: 0xff,
            StencilWriteMask: 0xff,
            FrontFace: face,
            BackFace: face,
        };
        let mut state = None;
        unsafe { device.CreateDepthStencilState(&desc, Some(&mut state)) }
            .map_err(|e| backend_error("CreateDepthStencilState", e))?;
        self.created(state, "CreateDepthStencilState")
    }

    fn create_depth_stencil_view(&mut self, depth_buffer: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_depth_stencil_view")?;
        let resource: ID3D11Resource = self.get(depth_buffer, "create_depth_stencil_view")?;
        let mut view = None;
        unsafe { device.CreateDepthStencilView(&resource, None, Some(&mut view)) }
            .map_err(|e| backend_error("CreateDepthStencilView", e))?;
        self.created(view, "CreateDepthStencilView")
    }

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<NativeHandle> {
        let device = self.device("create_rasterizer_state")?;
        let native = D3D11_RASTERIZER_DESC {
            FillMode: if desc.wireframe { D3D11_FILL_WIREFRAME } else { D3D11_FILL_SOLID },
            CullMode: match desc.cull_mode {
                CullMode::None => D3D11_CULL_NONE,
                CullMode::Front => D3D11_CULL_FRONT,
                CullMode::Back => D3D11_CULL_BACK,
            },
            FrontCounterClockwise: BOOL::from(desc.front_counter_clockwise),
            DepthClipEnable: BOOL::from(desc.depth_clip),
            MultisampleEnable: BOOL::from(desc.multisample),
            ..Default::default()
        };
        let mut state = None;
        unsafe { device.CreateRasterizerState(&native, Some(&mut state)) }
            .map_err(|e| backend_error("CreateRasterizerState", e))?;
        self.created(state, "CreateRasterizerState")
    }

    fn create_blend_state(&mut self, enabled: bool) -> Result<NativeHandle> {
        let device = self.device("create_blend_state")?;
        let mut desc = D3D11_BLEND_DESC::default();
        desc.RenderTarget[0] = D3D11_RENDER_TARGET_BLEND_DESC {
            BlendEnable: BOOL::from(enabled),
            SrcBlend: D3D11_BLEND_SRC_ALPHA,
            DestBlend: D3D11_BLEND_INV_SRC_ALPHA,
            BlendOp: D3D11_BLEND_OP_ADD,
            SrcBlendAlpha: D3D11_BLEND_ONE,
            DestBlendAlpha: D3D11_BLEND_ZERO,
            BlendOpAlpha: D3D11_BLEND_OP_ADD,
            RenderTargetWriteMask: D3D11_COLOR_WRITE_ENABLE_ALL.0 as u8,
        };
        let mut state = None;
        unsafe { device.CreateBlendState(&desc, Some(&mut state)) }
            .map_err(|e| backend_error("CreateBlendState", e))?;
        self.created(state, "CreateBlendState")
    }

    fn set_render_targets(&mut self, render_target: Option<NativeHandle>, depth_stencil: Option<NativeHandle>) {
        let Some(context) = self.context() else {
            return;
        };
        let view: Option<ID3D11RenderTargetView> =
            render_target.and_then(|handle| self.get(handle, "set_render_targets").ok());
        let depth: Option<ID3D11DepthStencilView> =
            depth_stencil.and_then(|handle| self.get(handle, "set_render_targets").ok());
        unsafe { context.OMSetRenderTargets(Some(&[view]), depth.as_ref()) };
    }

    fn set_depth_stencil_state(&mut self, state: NativeHandle) {
        let (Some(context), Ok(state)) = (self.context(), self.get::<ID3D11DepthStencilState>(state, "set")) else {
            return;
        };
        unsafe { context.OMSetDepthStencilState(&state, 1) };
    }

    fn set_rasterizer_state(&mut self, state: NativeHandle) {
        let (Some(context), Ok(state)) = (self.context(), self.get::<ID3D11RasterizerState>(state, "set")) else {
            return;
        };
        unsafe { context.RSSetState(&state) };
    }

    fn set_blend_state(&mut self, state: NativeHandle) {
        let (Some(context), Ok(state)) = (self.context(), self.get::<ID3D11BlendState>(state, "set")) else {
            return;
        };
        unsafe { context.OMSetBlendState(&state, Some(&[0.0; 4]), 0xffff_ffff) };
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        let Some(context) = self.context() else {
            return;
        };
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width,
            Height: height,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe { context.RSSetViewports(Some(&[viewport])) };
    }

    fn clear_render_target_view(&mut self, view: NativeHandle, color: [f32; 4]) {
        let (Some(context), Ok(view)) = (self.context(), self.get::<ID3D11RenderTargetView>(view, "clear")) else {
            return;
        };
        unsafe { context.ClearRenderTargetView(&view, &color) };
    }

    fn clear_depth_stencil_view(&mut self, view: NativeHandle, depth: f32, stencil: u8) {
        let (Some(context), Ok(view)) = (self.context(), self.get::<ID3D11DepthStencilView>(view, "clear")) else {
            return;
        };
        let flags = (D3D11_CLEAR_DEPTH.0 | D3D11_CLEAR_STENCIL.0) as u32;
        unsafe { context.ClearDepthStencilView(&view, flags, depth, stencil) };
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<NativeHandle> {
        let device = self.device("create_buffer")?;
        let (usage, bind, cpu_access) = match kind {
            BufferKind::Vertex => (D3D11_USAGE_DEFAULT, D3D11_BIND_VERTEX_BUFFER, 0),
            BufferKind::Index => (D3D11_USAGE_DEFAULT, D3D11_BIND_INDEX_BUFFER, 0),
            BufferKind::Constant => (
                D3D11_USAGE_DYNAMIC,
                D3D11_BIND_CONSTANT_BUFFER,
                D3D11_CPU_ACCESS_WRITE.0 as u32,
            ),
        };
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: data.len() as u32,
            Usage: usage,
            BindFlags: bind.0 as u32,
            CPUAccessFlags: cpu_access,
            ..Default::default()
        };
        let initial = D3D11_SUBRESOURCE_DATA { pSysMem: data.as_ptr() as *const c_void, ..Default::default() };
        let mut buffer = None;
        unsafe { device.CreateBuffer(&desc, Some(&initial), Some(&mut buffer)) }
            .map_err(|e| backend_error("CreateBuffer", e))?;
        self.created(buffer, "CreateBuffer")
    }

    fn update_buffer(&mut self, buffer: NativeHandle, data: &[u8]) -> Result<()> {
        let context = self
            .context()
            .ok_or_else(|| Error::BackendError("update_buffer: no device".to_string()))?;
        let buffer: ID3D11Buffer = self.get(buffer, "update_buffer")?;
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            context
                .Map(&buffer, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
                .map_err(|e| backend_error("Map", e))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.pData as *mut u8, data.len());
            context.Unmap(&buffer, 0);
        }
        Ok(())
    }

    fn set_vertex_buffer(&mut self, buffer: NativeHandle, stride: u32) {
        let (Some(context), Ok(buffer)) = (self.context(), self.get::<ID3D11Buffer>(buffer, "set_vertex_buffer")) else {
            return;
        };
        let buffers = [Some(buffer)];
        let offset = 0u32;
        unsafe { context.IASetVertexBuffers(0, 1, Some(buffers.as_ptr()), Some(&stride), Some(&offset)) };
    }

    fn set_index_buffer(&mut self, buffer: NativeHandle) {
        let (Some(context), Ok(buffer)) = (self.context(), self.get::<ID3D11Buffer>(buffer, "set_index_buffer")) else {
            return;
        };
        unsafe { context.IASetIndexBuffer(&buffer, DXGI_FORMAT_R32_UINT, 0) };
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        let context = self
            .context()
            .ok_or_else(|| Error::BackendError("draw_indexed: no device".to_string()))?;
        unsafe { context.DrawIndexed(index_count, 0, 0) };
        Ok(())
    }

    fn create_texture_2d(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<NativeHandle> {
        let device = self.device("create_texture_2d")?;
        let desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
            ..Default::default()
        };
        let initial = D3D11_SUBRESOURCE_DATA {
            pSysMem: pixels.as_ptr() as *const c_void,
            SysMemPitch: width * 4,
            SysMemSlicePitch: 0,
        };
        let mut texture = None;
        unsafe { device.CreateTexture2D(&desc, Some(&initial), Some(&mut texture)) }
            .map_err(|e| backend_error("CreateTexture2D", e))?;
        self.created(texture, "CreateTexture2D")
    }

    fn create_shader_resource_view(&mut self, texture: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_shader_resource_view")?;
        let resource: ID3D11Resource = self.get(texture, "create_shader_resource_view")?;
        let mut view = None;
        unsafe { device.CreateShaderResourceView(&resource, None, Some(&mut view)) }
            .map_err(|e| backend_error("CreateShaderResourceView", e))?;
        self.created(view, "CreateShaderResourceView")
    }

    fn create_sampler_state(&mut self) -> Result<NativeHandle> {
        let device = self.device("create_sampler_state")?;
        let desc = D3D11_SAMPLER_DESC {
            Filter: D3D11_FILTER_MIN_MAG_MIP_LINEAR,
            AddressU: D3D11_TEXTURE_ADDRESS_WRAP,
            AddressV: D3D11_TEXTURE_ADDRESS_WRAP,
            AddressW: D3D11_TEXTURE_ADDRESS_WRAP,
            MipLODBias: 0.0,
            MaxAnisotropy: 1,
            ComparisonFunc: D3D11_COMPARISON_ALWAYS,
            BorderColor: [0.0; 4],
            MinLOD: 0.0,
            MaxLOD: D3D11_FLOAT32_MAX,
        };
        let mut sampler = None;
        unsafe { device.CreateSamplerState(&desc, Some(&mut sampler)) }
            .map_err(|e| backend_error("CreateSamplerState", e))?;
        self.created(sampler, "CreateSamplerState")
    }

    fn compile_shader(
        &mut self,
        source: &str,
        entry_point: &str,
        target: &str,
    ) -> std::result::Result<NativeHandle, String> {
        let entry_point = CString::new(entry_point).map_err(|e| e.to_string())?;
        let target = CString::new(target).map_err(|e| e.to_string())?;

        let mut code: Option<ID3DBlob> = None;
        let mut messages: Option<ID3DBlob> = None;
        let compiled = unsafe {
            D3DCompile(
                source.as_ptr() as *const c_void,
                source.len(),
                PCSTR::null(),
                None,
                None::<&ID3DInclude>,
                PCSTR(entry_point.as_ptr() as *const u8),
                PCSTR(target.as_ptr() as *const u8),
                D3DCOMPILE_ENABLE_STRICTNESS,
                0,
                &mut code,
                Some(&mut messages),
            )
        };

        match (compiled, code) {
            (Ok(()), Some(code)) => self.insert(&code).map_err(|e| e.to_string()),
            (result, _) => Err(match messages {
                Some(messages) => blob_text(&messages),
                None => result.err().map(|e| e.to_string()).unwrap_or_default(),
            }),
        }
    }

    fn create_vertex_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_vertex_shader")?;
        let blob: ID3DBlob = self.get(bytecode, "create_vertex_shader")?;
        let mut shader = None;
        unsafe { device.CreateVertexShader(blob_bytes(&blob), None::<&ID3D11ClassLinkage>, Some(&mut shader)) }
            .map_err(|e| backend_error("CreateVertexShader", e))?;
        self.created(shader, "CreateVertexShader")
    }

    fn create_pixel_shader(&mut self, bytecode: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_pixel_shader")?;
        let blob: ID3DBlob = self.get(bytecode, "create_pixel_shader")?;
        let mut shader = None;
        unsafe { device.CreatePixelShader(blob_bytes(&blob), None::<&ID3D11ClassLinkage>, Some(&mut shader)) }
            .map_err(|e| backend_error("CreatePixelShader", e))?;
        self.created(shader, "CreatePixelShader")
    }

    fn create_input_layout(&mut self, elements: &[InputElement], bytecode: NativeHandle) -> Result<NativeHandle> {
        let device = self.device("create_input_layout")?;
        let blob: ID3DBlob = self.get(bytecode, "create_input_layout")?;

        let semantics = elements
            .iter()
            .map(|element| CString::new(element.semantic).map_err(|e| backend_error("create_input_layout", e)))
            .collect::<Result<Vec<_>>>()?;
        let descs: Vec<D3D11_INPUT_ELEMENT_DESC> = elements
            .iter()
            .zip(&semantics)
            .map(|(element, semantic)| D3D11_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(semantic.as_ptr() as *const u8),
                SemanticIndex: 0,
                Format: element_format(element.format),
                InputSlot: 0,
                AlignedByteOffset: element.offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut layout = None;
        unsafe { device.CreateInputLayout(&descs, blob_bytes(&blob), Some(&mut layout)) }
            .map_err(|e| backend_error("CreateInputLayout", e))?;
        self.created(layout, "CreateInputLayout")
    }

    fn bind_program(&mut self, binding: &ProgramBinding) {
        let Some(context) = self.context() else {
            return;
        };
        let (Ok(vertex_shader), Ok(pixel_shader), Ok(layout), Ok(constants), Ok(sampler)) = (
            self.get::<ID3D11VertexShader>(binding.vertex_shader, "bind_program"),
            self.get::<ID3D11PixelShader>(binding.pixel_shader, "bind_program"),
            self.get::<ID3D11InputLayout>(binding.input_layout, "bind_program"),
            self.get::<ID3D11Buffer>(binding.constants, "bind_program"),
            self.get::<ID3D11SamplerState>(binding.sampler, "bind_program"),
        ) else {
            return;
        };
        let texture: Option<ID3D11ShaderResourceView> =
            binding.texture.and_then(|handle| self.get(handle, "bind_program").ok());

        unsafe {
            context.IASetInputLayout(&layout);
            context.VSSetShader(&vertex_shader, None);
            context.VSSetConstantBuffers(0, Some(&[Some(constants)]));
            context.PSSetShader(&pixel_shader, None);
            context.PSSetSamplers(0, Some(&[Some(sampler)]));
            if texture.is_some() {
                context.PSSetShaderResources(0, Some(&[texture]));
            }
        }
    }

    fn release(&mut self, object: NativeHandle) {
        if self.device == Some(object) {
            self.device = None;
        }
        if self.context == Some(object) {
            if let Some(context) = self.context() {
                unsafe {
                    context.ClearState();
                    context.Flush();
                }
            }
            self.context = None;
        }
        self.objects.remove(&object);
    }
}
