/*!
# TwinRaster Engine - Direct3D Backend

Direct3D-style implementation of the TwinRaster `Graphics` capability.

The backend drives a device/immediate-context/swap-chain API through the
[`D3dDriver`] trait. [`SoftwareD3d`] is a headless driver that tracks every
native object, used for headless runs and by the tests. On Windows,
`NativeD3d` drives Direct3D 11 and DXGI through the `windows` crate.

Register the backend with a factory before starting the engine:

```no_run
use twin_raster_engine::twinraster::GraphicsFactory;

let mut factory = GraphicsFactory::new();
twin_raster_engine_renderer_d3d::register(&mut factory);
```
*/

mod d3d_driver;
mod d3d_graphics;
#[cfg(windows)]
mod d3d_native;
mod d3d_software;

pub use d3d_driver::{
    AdapterDesc, BufferKind, CullMode, D3dDriver, DeviceObjects, DisplayMode, ElementFormat, InputElement,
    NativeHandle, ProgramBinding, RasterizerDesc, Rational, SwapChainDesc,
};
pub use d3d_graphics::{
    match_refresh_rate, D3dGraphics, VideoCard, INPUT_LAYOUT, PIXEL_ENTRY_POINT, PIXEL_TARGET, VERTEX_ENTRY_POINT, VERTEX_TARGET,
};
#[cfg(windows)]
pub use d3d_native::NativeD3d;
pub use d3d_software::{NativeKind, SoftwareD3d, SoftwareD3dMonitor, SoftwareD3dState};

use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{GraphicsApi, GraphicsFactory, Result};

/// Register the Direct3D backend over the software driver
pub fn register(factory: &mut GraphicsFactory) {
    register_with(factory, |_system| Ok(Box::new(SoftwareD3d::new())));
}

/// Register the Direct3D backend over Direct3D 11
#[cfg(windows)]
pub fn register_native(factory: &mut GraphicsFactory) {
    register_with(factory, |system| Ok(Box::new(NativeD3d::new(system)?)));
}

/// Register the Direct3D backend over drivers produced by `driver`
///
/// `driver` runs once per backend construction, so every reset gets a
/// fresh device.
pub fn register_with<F>(factory: &mut GraphicsFactory, driver: F)
where
    F: Fn(&SystemInfo) -> Result<Box<dyn D3dDriver>> + 'static,
{
    factory.register(GraphicsApi::Direct3D, move |system, log| {
        Ok(Box::new(D3dGraphics::new(driver(system)?, system, log.clone())))
    });
}
