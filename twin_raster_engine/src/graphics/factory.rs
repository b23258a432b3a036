/// Graphics factory - maps a requested API to a backend constructor

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics::{Graphics, GraphicsApi};
use crate::log::Log;
use crate::system::SystemInfo;

/// Backend constructor: builds an uninitialized backend for a window
pub type GraphicsConstructor = Box<dyn Fn(&SystemInfo, &Log) -> Result<Box<dyn Graphics>>>;

/// Dispatch table from [`GraphicsApi`] to backend constructors
///
/// Backend crates register themselves (`register(&mut factory)`); the
/// windowing system decides which APIs are offered on the platform.
#[derive(Default)]
pub struct GraphicsFactory {
    constructors: FxHashMap<GraphicsApi, GraphicsConstructor>,
}

impl GraphicsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `api`
    pub fn register<F>(&mut self, api: GraphicsApi, constructor: F)
    where
        F: Fn(&SystemInfo, &Log) -> Result<Box<dyn Graphics>> + 'static,
    {
        self.constructors.insert(api, Box::new(constructor));
    }

    pub fn is_registered(&self, api: GraphicsApi) -> bool {
        self.constructors.contains_key(&api)
    }

    /// APIs that are both registered and offered by the windowing system
    pub fn available_apis(&self, system: &SystemInfo) -> Vec<GraphicsApi> {
        GraphicsApi::ALL
            .into_iter()
            .filter(|api| self.is_registered(*api) && system.supports_api(*api))
            .collect()
    }

    /// Construct the backend for `api`
    ///
    /// # Errors
    ///
    /// `NotSupported` if the API is unregistered or unavailable on the
    /// windowing system. Constructor errors are passed through.
    pub fn create_graphics(
        &self,
        api: GraphicsApi,
        system: &SystemInfo,
        log: &Log,
    ) -> Result<Box<dyn Graphics>> {
        if !system.supports_api(api) {
            return Err(Error::NotSupported(format!(
                "{} is not available on this windowing system",
                api
            )));
        }

        let constructor = self
            .constructors
            .get(&api)
            .ok_or_else(|| Error::NotSupported(format!("No {} backend registered", api)))?;

        let graphics = constructor(system, log)?;
        crate::engine_info!(log, "twinraster::GraphicsFactory", "Created {} backend", graphics.name());
        Ok(graphics)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
