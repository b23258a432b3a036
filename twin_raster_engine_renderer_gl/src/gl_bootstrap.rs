/// Extension loader bootstrap and real context creation
///
/// Extension entry points can only be queried through a current context,
/// and the context we actually want can only be created through those
/// entry points. So bootstrap happens in two phases:
///
/// 1. [`ExtensionLoader::bootstrap`]: throwaway window + legacy context,
///    load the extensions, tear both down. Runs once per loader.
/// 2. [`ExtensionLoader::create_real_context`]: pick the pixel format and
///    create a versioned context on the real surface, falling back to a
///    legacy context when the attribs extension is missing or refuses.

use twin_raster_engine::twinraster::log::Log;
use twin_raster_engine::twinraster::{Error, PresentationProperties, Result};
use twin_raster_engine::{engine_diag, engine_warn};

use crate::gl_driver::{ContextHandle, ContextKind, GlDriver, GlExtensions, PixelFormatRequest, SurfaceHandle};

const SOURCE: &str = "twinraster::gl::ExtensionLoader";

#[derive(Debug, Default)]
pub struct ExtensionLoader {
    initialized: bool,
    extensions: GlExtensions,
}

impl ExtensionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Extensions reported by the last successful bootstrap
    pub fn extensions(&self) -> GlExtensions {
        self.extensions
    }

    /// Phase one. A no-op once it has succeeded.
    pub fn bootstrap(&mut self, driver: &mut dyn GlDriver, log: &Log) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let surface = driver.create_surface(None)?;
        let loaded = Self::load_through(driver, surface);
        driver.destroy_surface(surface);
        let extensions = loaded?;

        self.extensions = extensions;
        self.initialized = true;
        engine_diag!(log, SOURCE, "Extension loader ready: {:?}", extensions);
        Ok(())
    }

    /// Legacy context on `surface`, current just long enough to load
    fn load_through(driver: &mut dyn GlDriver, surface: SurfaceHandle) -> Result<GlExtensions> {
        driver.set_basic_pixel_format(surface)?;
        let context = driver.create_legacy_context(surface)?;

        let loaded = driver
            .make_current(Some((surface, context)))
            .and_then(|()| driver.load_extensions());
        let released = driver.make_current(None);
        driver.delete_context(context);

        let extensions = loaded?;
        released?;
        Ok(extensions)
    }

    /// Phase two: pixel format and context on the real surface
    ///
    /// The returned context is not current yet.
    pub fn create_real_context(
        &self,
        driver: &mut dyn GlDriver,
        surface: SurfaceHandle,
        properties: &PresentationProperties,
        log: &Log,
    ) -> Result<(ContextHandle, ContextKind)> {
        if !self.initialized {
            return Err(Error::runtime(
                "ExtensionLoader",
                "create_real_context",
                "extension loader has not been bootstrapped",
            ));
        }

        if self.extensions.contains(GlExtensions::PIXEL_FORMAT) {
            driver.choose_pixel_format(
                surface,
                &PixelFormatRequest {
                    color_bits: properties.color_bits,
                    depth_bits: properties.depth_bits,
                    alpha_bits: properties.alpha_bits,
                    stencil_bits: properties.stencil_bits,
                    sample_count: properties.sample_count,
                    double_buffer: true,
                    fullscreen: properties.fullscreen,
                },
            )?;
        } else {
            driver.set_basic_pixel_format(surface)?;
        }

        if self.extensions.contains(GlExtensions::CREATE_CONTEXT_ATTRIBS) {
            let (major, minor) = (properties.api_major, properties.api_minor);
            match driver.create_context_attribs(surface, major, minor, true) {
                Ok(context) => {
                    return Ok((context, ContextKind::Versioned { major, minor, core_profile: true }));
                }
                Err(e) => {
                    engine_warn!(log, SOURCE, "{}.{} core context refused ({}), using a legacy context", major, minor, e);
                }
            }
        }

        let context = driver.create_legacy_context(surface)?;
        Ok((context, ContextKind::Legacy))
    }
}

#[cfg(test)]
#[path = "gl_bootstrap_tests.rs"]
mod tests;
