//! Unit tests for the Engine state machine
//!
//! Tests initialization order, the idle frame, input, graphics reset and
//! shutdown, over MockSystem and MockGraphics.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glam::Vec3;

use super::*;
use crate::graphics::mock_graphics::{Journal, MockGraphics};
use crate::log::{LogEntry, LogSeverity, LogVerbosity, Logger};
use crate::system::mock_system::{MockSystem, ScriptEvent, SystemMonitor};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap()
            .push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

/// Application directory with a "Color" shader for both backends
fn app_dir() -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let root = std::env::temp_dir().join(format!(
        "twinraster_engine_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    for api in GraphicsApi::ALL {
        let dir = root.join("Shaders").join(api.name());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Color.vs"), "void main() {}").unwrap();
        fs::write(dir.join("Color.ps"), "void main() {}").unwrap();
    }
    root
}

fn mock_factory(journal: &Journal, fail_on: Option<&'static str>) -> GraphicsFactory {
    let mut factory = GraphicsFactory::new();
    for api in GraphicsApi::ALL {
        let journal = journal.clone();
        factory.register(api, move |_system, log| {
            let mut graphics = MockGraphics::new(api, log.clone()).with_journal(journal.clone());
            if let Some(operation) = fail_on {
                graphics = graphics.failing_on(operation);
            }
            Ok(Box::new(graphics))
        });
    }
    factory
}

fn test_config() -> EngineConfig {
    EngineConfig {
        api: GraphicsApi::Direct3D,
        texture: None,
        ..EngineConfig::default()
    }
}

struct Harness {
    engine: Engine,
    monitor: Rc<RefCell<SystemMonitor>>,
    journal: Journal,
}

fn harness_with(system: MockSystem, fail_on: Option<&'static str>) -> Harness {
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let monitor = system.monitor();
    let engine = Engine::new(test_config(), Box::new(system), mock_factory(&journal, fail_on), Log::silent());
    Harness { engine, monitor, journal }
}

fn harness(script: Vec<ScriptEvent>) -> Harness {
    harness_with(MockSystem::new(app_dir()).with_script(script), None)
}

fn count(journal: &Journal, command: &str) -> usize {
    journal.borrow().iter().filter(|c| *c == command).count()
}

// ============================================================================
// INITIALIZATION
// ============================================================================

#[test]
fn test_initialize_builds_chain() {
    let mut h = harness(Vec::new());
    h.engine.initialize().unwrap();

    assert_eq!(h.engine.state(), EngineState::Initialized);
    assert_eq!(h.engine.active_api(), Some(GraphicsApi::Direct3D));

    let graphics = h.engine.graphics().unwrap();
    assert!(graphics.is_display_ready());
    let master = graphics.master_camera().unwrap();
    assert!(Rc::ptr_eq(&master, h.engine.camera().unwrap()));
    assert!(h.engine.shader().unwrap().borrow().is_initialized());
    assert_eq!(h.engine.model().unwrap().index_count(), 36);

    let journal = h.journal.borrow();
    let init = journal.iter().position(|c| c == "initialize").unwrap();
    let compile = journal.iter().position(|c| c == "compile_program Color").unwrap();
    let upload = journal.iter().position(|c| c == "create_vertex_buffer 24").unwrap();
    assert!(init < compile && compile < upload);
}

#[test]
fn test_initialize_is_idempotent() {
    let mut h = harness(Vec::new());
    h.engine.initialize().unwrap();
    let camera = Rc::clone(h.engine.camera().unwrap());

    h.engine.initialize().unwrap();

    assert_eq!(h.monitor.borrow().initialize_calls, 1);
    assert!(Rc::ptr_eq(&camera, h.engine.camera().unwrap()));
}

#[test]
fn test_initialize_passes_presentation_properties() {
    let mut h = harness(Vec::new());
    h.engine.initialize().unwrap();

    let properties = h.monitor.borrow().last_properties.unwrap();
    assert_eq!(properties, PresentationProperties::default());
    assert_eq!(h.engine.graphics().unwrap().screen_width(), 1024);
}

#[test]
fn test_window_failure_leaves_engine_shut_down() {
    let mut h = harness_with(MockSystem::new(app_dir()).failing_initialize(), None);

    let result = h.engine.initialize();
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert_eq!(h.engine.state(), EngineState::Shutdown);
    assert!(h.engine.graphics().is_none());
}

#[test]
fn test_unavailable_default_api_is_not_supported() {
    let system = MockSystem::new(app_dir()).with_supported_apis(&[GraphicsApi::OpenGL]);
    let mut h = harness_with(system, None);

    let result = h.engine.initialize();
    assert!(matches!(result, Err(Error::NotSupported(_))));
    assert_eq!(h.engine.state(), EngineState::Shutdown);
    assert!(!h.monitor.borrow().window_open);
}

#[test]
fn test_missing_shader_releases_backend() {
    let system = MockSystem::new(PathBuf::from("/nonexistent/twinraster"));
    let mut h = harness_with(system, None);

    let result = h.engine.initialize();
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(h.engine.graphics().is_none());
    assert!(h.engine.camera().is_none());
    assert_eq!(count(&h.journal, "shutdown"), 1);
}

#[test]
fn test_backend_init_failure_is_logged() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let log = Log::new(TestLogger { entries: entries.clone() }, LogVerbosity::all());
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let mut engine = Engine::new(
        test_config(),
        Box::new(MockSystem::new(app_dir())),
        mock_factory(&journal, Some("initialize")),
        log,
    );

    assert!(engine.initialize().is_err());
    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| e.starts_with(&format!("{:?}: Initialization failed", LogSeverity::Error))));
}

// ============================================================================
// RUN / IDLE FRAME
// ============================================================================

#[test]
fn test_run_before_initialize_fails() {
    let mut h = harness(vec![ScriptEvent::Idle]);
    assert!(matches!(h.engine.run(), Err(Error::Runtime { .. })));
    assert_eq!(h.monitor.borrow().run_calls, 0);
}

#[test]
fn test_idle_renders_one_frame_per_tick() {
    let mut h = harness(vec![ScriptEvent::Idle, ScriptEvent::Idle]);
    h.engine.initialize().unwrap();
    h.journal.borrow_mut().clear();

    h.engine.run().unwrap();

    assert_eq!(h.engine.state(), EngineState::Initialized);
    assert_eq!(count(&h.journal, "clear 0 0 0 1"), 2);
    assert_eq!(count(&h.journal, "draw_indexed 36"), 2);
    assert_eq!(count(&h.journal, "present vsync=true"), 2);

    let journal = h.journal.borrow();
    let clear = journal.iter().position(|c| c == "clear 0 0 0 1").unwrap();
    let draw = journal.iter().position(|c| c == "draw_indexed 36").unwrap();
    let present = journal.iter().position(|c| c == "present vsync=true").unwrap();
    assert!(clear < draw && draw < present);
}

#[test]
fn test_frame_failure_stops_run() {
    let system = MockSystem::new(app_dir()).with_script(vec![ScriptEvent::Idle, ScriptEvent::Idle]);
    let mut h = harness_with(system, Some("draw_indexed"));
    h.engine.initialize().unwrap();

    let result = h.engine.run();
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(h.monitor.borrow().events_delivered, 1);
    assert_eq!(h.engine.state(), EngineState::Initialized);
    assert_eq!(count(&h.journal, "present vsync=true"), 1);
}

#[test]
fn test_held_key_moves_camera() {
    let system = MockSystem::new(app_dir()).with_frame_ms(1000.0).with_script(vec![
        ScriptEvent::KeyDown(Key::Up),
        ScriptEvent::Idle,
        ScriptEvent::KeyUp(Key::Up),
        ScriptEvent::Idle,
    ]);
    let mut h = harness_with(system, None);
    h.engine.initialize().unwrap();

    h.engine.run().unwrap();

    let speed = h.engine.config().move_speed;
    let position = h.engine.camera().unwrap().borrow().position();
    assert!((position - (Camera::DEFAULT_POSITION + Vec3::Z * speed)).length() < 1e-4);
    assert!(!h.engine.is_key_down(Key::Up));
}

#[test]
fn test_char_input_is_ignored() {
    let mut h = harness(vec![ScriptEvent::Char('x'), ScriptEvent::Idle]);
    h.engine.initialize().unwrap();
    h.engine.run().unwrap();
    assert_eq!(h.engine.camera().unwrap().borrow().position(), Camera::DEFAULT_POSITION);
}

// ============================================================================
// GRAPHICS RESET
// ============================================================================

#[test]
fn test_reset_to_active_api_is_noop() {
    let mut h = harness(vec![ScriptEvent::Reset(GraphicsApi::Direct3D), ScriptEvent::Idle]);
    h.engine.initialize().unwrap();
    let backend = h.engine.graphics().unwrap().id();
    let camera = Rc::clone(h.engine.camera().unwrap());
    let shader = Rc::clone(h.engine.shader().unwrap());

    h.engine.run().unwrap();

    assert_eq!(h.engine.graphics().unwrap().id(), backend);
    assert!(Rc::ptr_eq(&camera, h.engine.camera().unwrap()));
    assert!(Rc::ptr_eq(&shader, h.engine.shader().unwrap()));
    assert_eq!(count(&h.journal, "shutdown"), 0);
}

#[test]
fn test_reset_swaps_backend_and_chain() {
    let mut h = harness(vec![ScriptEvent::Idle, ScriptEvent::Reset(GraphicsApi::OpenGL), ScriptEvent::Idle]);
    h.engine.initialize().unwrap();
    let old_backend = h.engine.graphics().unwrap().id();
    let old_camera = Rc::clone(h.engine.camera().unwrap());

    h.engine.run().unwrap();

    let graphics = h.engine.graphics().unwrap();
    assert_eq!(graphics.api(), GraphicsApi::OpenGL);
    assert_ne!(graphics.id(), old_backend);
    assert!(!Rc::ptr_eq(&old_camera, h.engine.camera().unwrap()));
    assert_eq!(h.engine.camera().unwrap().borrow().backend(), graphics.id());
    assert_eq!(h.engine.model().unwrap().backend(), graphics.id());
    assert!(!old_camera.borrow().is_initialized());

    // Window untouched by the swap
    assert_eq!(h.monitor.borrow().initialize_calls, 1);
    assert_eq!(h.monitor.borrow().shutdown_calls, 0);
    assert_eq!(count(&h.journal, "draw_indexed 36"), 2);
}

#[test]
fn test_failed_reset_reports_error_and_keeps_previous_api() {
    let system = MockSystem::new(app_dir()).with_supported_apis(&[GraphicsApi::Direct3D]);
    let mut h = harness_with(system, None);
    h.engine.initialize().unwrap();

    let result = h.engine.on_graphics_reset(GraphicsApi::OpenGL);

    assert!(matches!(result, Err(Error::NotSupported(_))));
    assert_eq!(h.engine.active_api(), Some(GraphicsApi::Direct3D));
    assert!(h.engine.graphics().unwrap().is_display_ready());
    assert!(h.engine.model().is_some());
}

#[test]
fn test_failed_reset_stops_scripted_loop() {
    let system = MockSystem::new(app_dir())
        .with_supported_apis(&[GraphicsApi::Direct3D])
        .with_script(vec![ScriptEvent::Reset(GraphicsApi::OpenGL), ScriptEvent::Idle]);
    let mut h = harness_with(system, None);
    h.engine.initialize().unwrap();

    let result = h.engine.run();

    assert!(matches!(result, Err(Error::NotSupported(_))));
    assert_eq!(h.engine.active_api(), Some(GraphicsApi::Direct3D));
    assert_eq!(count(&h.journal, "draw_indexed 36"), 0);
}

#[test]
fn test_reset_before_initialize_fails() {
    let mut h = harness(Vec::new());
    let result = h.engine.on_graphics_reset(GraphicsApi::OpenGL);
    assert!(matches!(result, Err(Error::Runtime { .. })));
}

// ============================================================================
// RESIZE
// ============================================================================

#[test]
fn test_resize_updates_camera_projection() {
    let mut h = harness(vec![ScriptEvent::Resize(800, 400), ScriptEvent::Resize(800, 0)]);
    h.engine.initialize().unwrap();

    h.engine.run().unwrap();

    let graphics = h.engine.graphics().unwrap();
    assert_eq!(graphics.screen_width(), 800);
    assert_eq!(graphics.screen_height(), 400);
    let projection = *h.engine.camera().unwrap().borrow().projection_matrix();
    assert!((projection.y_axis.y / projection.x_axis.x - 2.0).abs() < 1e-5);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_is_idempotent() {
    let mut h = harness(Vec::new());
    h.engine.initialize().unwrap();

    h.engine.shutdown();
    h.engine.shutdown();

    assert_eq!(h.engine.state(), EngineState::Shutdown);
    assert!(h.engine.graphics().is_none());
    assert!(h.engine.model().is_none());
    assert_eq!(h.monitor.borrow().shutdown_calls, 1);
    assert_eq!(count(&h.journal, "shutdown"), 1);
}

#[test]
fn test_initialize_after_shutdown() {
    let mut h = harness(Vec::new());
    h.engine.initialize().unwrap();
    h.engine.shutdown();

    h.engine.initialize().unwrap();

    assert_eq!(h.engine.state(), EngineState::Initialized);
    assert!(h.engine.graphics().unwrap().is_display_ready());
    assert_eq!(h.monitor.borrow().initialize_calls, 2);
}

#[test]
fn test_drop_shuts_down() {
    let h = harness(Vec::new());
    let monitor = h.monitor.clone();
    let journal = h.journal.clone();
    let mut engine = h.engine;
    engine.initialize().unwrap();

    drop(engine);

    assert!(!monitor.borrow().window_open);
    assert_eq!(count(&journal, "shutdown"), 1);
}
