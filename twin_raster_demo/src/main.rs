//! TwinRaster demo
//!
//! Spinning textured cube. Arrow keys, PageUp/PageDown and A/D/Q/E move the
//! camera; F1 switches to Direct3D, F2 to OpenGL; Escape quits.
//!
//! `Shaders/` and `Media/` are looked up in the working directory, so run
//! from this crate's directory.

mod file_logger;
mod winit_system;

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;

use twin_raster_engine::engine_critical;
use twin_raster_engine::twinraster::log::{Log, LogVerbosity};
use twin_raster_engine::twinraster::{Engine, EngineConfig, GraphicsFactory, Result};

use file_logger::FileLogger;
use winit_system::WinitSystem;

const SOURCE: &str = "twinraster::demo";
const LOG_FILE: &str = "twinraster.log";

fn main() -> ExitCode {
    let application_directory = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Cannot resolve the application directory: {}", e);
            return ExitCode::from(255);
        }
    };

    let logger = match FileLogger::create(&application_directory.join(LOG_FILE)) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Cannot create {}: {}", LOG_FILE, e);
            return ExitCode::from(255);
        }
    };
    let log = Log::new(logger, LogVerbosity::default());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(application_directory, &log)));
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            engine_critical!(log, SOURCE, "{}", e);
            ExitCode::FAILURE
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            engine_critical!(log, SOURCE, "Unhandled panic: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(application_directory: PathBuf, log: &Log) -> Result<()> {
    let mut factory = GraphicsFactory::new();
    #[cfg(windows)]
    twin_raster_engine_renderer_d3d::register_native(&mut factory);
    #[cfg(not(windows))]
    twin_raster_engine_renderer_d3d::register(&mut factory);
    twin_raster_engine_renderer_gl::register_native(&mut factory);

    let system = WinitSystem::new(application_directory, log.clone());
    let mut engine = Engine::new(EngineConfig::default(), Box::new(system), factory, log.clone());

    engine.initialize()?;
    let result = engine.run();
    engine.shutdown();
    result
}
