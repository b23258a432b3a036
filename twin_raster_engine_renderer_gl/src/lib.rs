/*!
# TwinRaster Engine - OpenGL Backend

OpenGL-style implementation of the TwinRaster `Graphics` capability.

The backend drives a surface/context API through the [`GlDriver`] trait.
Context creation is a two-phase protocol handled by [`ExtensionLoader`]:
a throwaway legacy context loads the extension entry points, then the real
context is created through them. [`SoftwareGl`] is a headless driver used
by the tests; [`NativeGl`] drives the platform's GL through glutin and
glow.

```no_run
use twin_raster_engine::twinraster::GraphicsFactory;

let mut factory = GraphicsFactory::new();
twin_raster_engine_renderer_gl::register_native(&mut factory);
```
*/

mod gl_bootstrap;
mod gl_driver;
mod gl_graphics;
mod gl_native;
mod gl_software;

pub use gl_bootstrap::ExtensionLoader;
pub use gl_driver::{
    AttributeLayout, BufferTarget, ContextHandle, ContextKind, GlDriver, GlExtensions, GlName, PixelFormatRequest,
    ShaderStage, StringName, SurfaceHandle,
};
pub use gl_graphics::{
    GlGraphics, ATTRIBUTES, PROJECTION_UNIFORM, TEXTURE_UNIFORM, VIEW_UNIFORM, WORLD_UNIFORM,
};
pub use gl_native::NativeGl;
pub use gl_software::{
    ContextFlavor, GlObjectKind, SoftwareGl, SoftwareGlMonitor, SoftwareGlState, RENDERER, VENDOR, VERSION,
};

use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{GraphicsApi, GraphicsFactory, Result};

/// Register the OpenGL backend over the software driver
pub fn register(factory: &mut GraphicsFactory) {
    register_with(factory, |_system| Ok(Box::new(SoftwareGl::new())));
}

/// Register the OpenGL backend over the platform's GL
pub fn register_native(factory: &mut GraphicsFactory) {
    register_with(factory, |system| Ok(Box::new(NativeGl::new(system)?)));
}

/// Register the OpenGL backend over drivers produced by `driver`
pub fn register_with<F>(factory: &mut GraphicsFactory, driver: F)
where
    F: Fn(&SystemInfo) -> Result<Box<dyn GlDriver>> + 'static,
{
    factory.register(GraphicsApi::OpenGL, move |system, log| {
        Ok(Box::new(GlGraphics::new(driver(system)?, system, log.clone())))
    });
}
