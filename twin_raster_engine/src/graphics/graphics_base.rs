/// State shared by every backend: identity, presentation properties,
/// display-ready gate and the observed master camera.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::graphics::{BackendId, GraphicsApi, PresentationProperties};
use crate::log::Log;
use crate::scene::Camera;

/// Common backend state, embedded by each concrete graphics type
#[derive(Debug)]
pub struct GraphicsBase {
    id: BackendId,
    api: GraphicsApi,
    properties: PresentationProperties,
    display_ready: bool,
    master_camera: Weak<RefCell<Camera>>,
    log: Log,
}

impl GraphicsBase {
    pub fn new(api: GraphicsApi, log: Log) -> Self {
        Self {
            id: BackendId::next(),
            api,
            properties: PresentationProperties::default(),
            display_ready: false,
            master_camera: Weak::new(),
            log,
        }
    }

    pub fn id(&self) -> BackendId {
        self.id
    }

    pub fn api(&self) -> GraphicsApi {
        self.api
    }

    pub fn name(&self) -> &'static str {
        self.api.name()
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn properties(&self) -> &PresentationProperties {
        &self.properties
    }

    pub fn set_properties(&mut self, properties: PresentationProperties) {
        self.properties = properties;
    }

    pub fn is_display_ready(&self) -> bool {
        self.display_ready
    }

    pub fn set_display_ready(&mut self, ready: bool) {
        self.display_ready = ready;
    }

    pub fn master_camera(&self) -> Option<Rc<RefCell<Camera>>> {
        self.master_camera.upgrade()
    }

    /// Swap the observed camera
    ///
    /// The ready gate is lowered for the swap and restored to its previous
    /// value afterwards. It is never raised on a backend that was not ready.
    pub fn set_master_camera(&mut self, camera: &Rc<RefCell<Camera>>) {
        let was_ready = self.display_ready;
        self.display_ready = false;
        self.master_camera = Rc::downgrade(camera);
        self.display_ready = was_ready;
    }

    /// Store new dimensions and refresh the master camera projection
    ///
    /// Returns false (and changes nothing) for non-positive dimensions.
    pub fn update_dimensions(&mut self, width: i32, height: i32) -> bool {
        if height <= 0 || width <= 0 {
            return false;
        }
        self.properties.screen_width = width as u32;
        self.properties.screen_height = height as u32;

        if let Some(camera) = self.master_camera.upgrade() {
            // A camera mid-render cannot be borrowed; it picks up the new
            // aspect on the next resize notification.
            match camera.try_borrow_mut() {
                Ok(mut camera) => camera.update_graphics_properties(&self.properties),
                Err(_) => crate::engine_warn!(
                    self.log,
                    "twinraster::GraphicsBase",
                    "Master camera busy, projection not refreshed for {}x{}",
                    width,
                    height
                ),
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "graphics_base_tests.rs"]
mod tests;
