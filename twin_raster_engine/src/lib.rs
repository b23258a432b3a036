/*!
# TwinRaster Engine

Core traits and types for the TwinRaster dual-backend rendering engine.

This crate provides the platform-agnostic API: a `Graphics` capability that
every native backend implements, and single concrete `Camera`, `Model` and
`Shader` types that reach backend-specific behavior through the small
`BackendOps` trait. Backend crates (Direct3D-style, OpenGL-style) register
constructors with a `GraphicsFactory`; the `Engine` picks one at startup and
can swap it at runtime without recreating the window.

## Architecture

- **Graphics**: backend capability (initialize, begin/end scene, resize, shutdown)
- **BackendOps**: native buffer/texture/program operations used by the scene types
- **GraphicsFactory**: `GraphicsApi` to backend constructor registry
- **Camera / Model / Shader**: backend-bound scene objects
- **System / Timer**: windowing and timing collaborators supplied by the application
- **Engine**: state machine tying everything together
*/

// Internal modules
pub mod error;
mod engine;
pub mod log;
pub mod graphics;
pub mod scene;
pub mod system;

// Main twinraster namespace module
pub mod twinraster {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine orchestrator
    pub use crate::engine::{Engine, EngineConfig, EngineState};

    // Graphics capability and factory
    pub use crate::graphics::{Graphics, GraphicsApi, GraphicsFactory, PresentationProperties};

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, Log, LogEntry, LogSeverity, LogVerbosity, Logger, NullLogger};
    }

    // Graphics sub-module with everything a backend implementation needs
    pub mod graphics {
        pub use crate::graphics::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Windowing / timing collaborators
    pub mod system {
        pub use crate::system::*;
    }
}

// Re-export math library at crate root
pub use glam;
