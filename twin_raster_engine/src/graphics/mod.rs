/// Graphics module - backend capability, shared backend state and factory

// Module declarations
pub mod backend_ops;
pub mod factory;
pub mod graphics;
pub mod graphics_base;
pub mod mesh;
pub mod presentation;
pub mod texture;

// Re-export everything from graphics.rs
pub use graphics::*;

// Re-export from other modules
pub use backend_ops::*;
pub use factory::*;
pub use graphics_base::*;
pub use mesh::*;
pub use presentation::*;
pub use texture::*;

// Mock backend for tests (no native API required)
#[cfg(test)]
pub mod mock_graphics;
