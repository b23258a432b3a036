//! Integration tests for the Direct3D backend over the software driver
//!
//! The monitor returned by `SoftwareD3d::monitor` stays readable after the
//! driver is boxed into the backend, so every test can check what the
//! backend did to the device.
//!
//! Run with: cargo test --test d3d_graphics_tests

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use twin_raster_engine::glam::{Mat4, Vec3};
use twin_raster_engine::twinraster::graphics::{MatrixSet, ProgramSource, TextureImage, Vertex};
use twin_raster_engine::twinraster::log::Log;
use twin_raster_engine::twinraster::scene::ModelDesc;
use twin_raster_engine::twinraster::system::SystemInfo;
use twin_raster_engine::twinraster::{Error, Graphics, GraphicsApi, GraphicsFactory, PresentationProperties};
use twin_raster_engine_renderer_d3d::{
    match_refresh_rate, BufferKind, D3dGraphics, DisplayMode, NativeKind, Rational, SoftwareD3d, SoftwareD3dMonitor,
};

// ============================================================================
// HELPERS
// ============================================================================

const VERTEX_SHADER: &str = "\
cbuffer MatrixBuffer { matrix worldMatrix; matrix viewMatrix; matrix projectionMatrix; };
PixelInputType VSMain(VertexInputType input) { PixelInputType output; return output; }
";

const PIXEL_SHADER: &str = "\
float4 PSMain(PixelInputType input) : SV_TARGET { return input.color; }
";

fn system_info() -> SystemInfo {
    SystemInfo {
        window: None,
        display: None,
        supported_apis: vec![GraphicsApi::Direct3D],
        application_directory: PathBuf::from("."),
    }
}

fn backend_with(driver: SoftwareD3d) -> (D3dGraphics, SoftwareD3dMonitor) {
    let monitor = driver.monitor();
    (D3dGraphics::new(Box::new(driver), &system_info(), Log::silent()), monitor)
}

fn ready_backend(properties: &PresentationProperties) -> (D3dGraphics, SoftwareD3dMonitor) {
    let (mut graphics, monitor) = backend_with(SoftwareD3d::new());
    graphics.initialize(properties).unwrap();
    (graphics, monitor)
}

fn program_source(vertex: &str, pixel: &str) -> ProgramSource {
    ProgramSource {
        name: "Color".to_string(),
        vertex: vertex.to_string(),
        fragment: pixel.to_string(),
    }
}

fn application_directory(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("twinraster_d3d_{}_{}", tag, std::process::id()));
    let shaders = root.join("Shaders").join("Direct3D");
    fs::create_dir_all(&shaders).unwrap();
    fs::write(shaders.join("Color.vs"), VERTEX_SHADER).unwrap();
    fs::write(shaders.join("Color.ps"), PIXEL_SHADER).unwrap();
    root
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_initialize_creates_device_and_states() {
    let (graphics, monitor) = ready_backend(&PresentationProperties::default());

    assert!(graphics.is_display_ready());
    assert_eq!(graphics.name(), "Direct3D");
    assert_eq!(graphics.api(), GraphicsApi::Direct3D);

    let state = monitor.borrow();
    assert_eq!(state.live_of(NativeKind::Device), 1);
    assert_eq!(state.live_of(NativeKind::SwapChain), 1);
    assert_eq!(state.live_of(NativeKind::RenderTargetView), 1);
    assert_eq!(state.live_of(NativeKind::DepthStencilView), 1);
    assert_eq!(state.live_of(NativeKind::BackBuffer), 0, "back buffer is released once viewed");
    assert_eq!(state.live_of(NativeKind::BlendState { enabled: true }), 1);
    assert_eq!(state.live_of(NativeKind::BlendState { enabled: false }), 1);
    assert!(!state.blending);
    assert_eq!(state.viewport, (1024.0, 768.0));
    assert_eq!(state.swap_chain_size, (1024, 768));
    assert_eq!(state.invalid_calls, 0);
}

#[test]
fn test_initialize_twice_is_rejected() {
    let (mut graphics, _monitor) = ready_backend(&PresentationProperties::default());
    let result = graphics.initialize(&PresentationProperties::default());
    assert!(matches!(result, Err(Error::Runtime { .. })));
    assert!(graphics.is_display_ready());
}

#[test]
fn test_shutdown_releases_everything() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    graphics.ops().unwrap().create_vertex_buffer(&[Vertex::new([0.0; 3], [1.0; 4], [0.0; 2]); 3]).unwrap();
    graphics.ops().unwrap().compile_program(&program_source(VERTEX_SHADER, PIXEL_SHADER)).unwrap();

    graphics.shutdown();

    assert!(!graphics.is_display_ready());
    assert_eq!(monitor.borrow().live_objects(), 0);
    assert_eq!(monitor.borrow().invalid_calls, 0);

    // Idempotent
    graphics.shutdown();
    assert_eq!(monitor.borrow().invalid_calls, 0);
}

#[test]
fn test_initialize_after_shutdown() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    graphics.shutdown();

    graphics.initialize(&PresentationProperties::default()).unwrap();
    assert!(graphics.is_display_ready());
    assert_eq!(monitor.borrow().live_of(NativeKind::Device), 1);
}

#[test]
fn test_drop_releases_everything() {
    let (graphics, monitor) = ready_backend(&PresentationProperties::default());
    drop(graphics);
    assert_eq!(monitor.borrow().live_objects(), 0);
}

#[test]
fn test_failure_at_each_stage_leaves_nothing_live() {
    let stages = [
        "primary_adapter",
        "display_modes",
        "create_device_and_swap_chain",
        "create_swap_chain",
        "back_buffer",
        "create_render_target_view",
        "create_depth_buffer",
        "create_depth_stencil_view",
        "create_depth_stencil_state",
        "create_rasterizer_state",
        "create_blend_state",
    ];
    for stage in stages {
        let (mut graphics, monitor) = backend_with(SoftwareD3d::new().failing_on(stage));

        let result = graphics.initialize(&PresentationProperties::default());

        assert!(matches!(result, Err(Error::InitializationFailed(_))), "stage {}", stage);
        assert!(!graphics.is_display_ready(), "stage {}", stage);
        assert!(graphics.video_card_info().is_err(), "stage {}", stage);
        let state = monitor.borrow();
        assert_eq!(state.live_objects(), 0, "stage {} leaked", stage);
        assert_eq!(state.invalid_calls, 0, "stage {} released twice", stage);
    }
}

// ============================================================================
// FRAMES
// ============================================================================

#[test]
fn test_begin_end_scene_before_initialize_is_noop() {
    let (mut graphics, monitor) = backend_with(SoftwareD3d::new());
    graphics.begin_scene(0.0, 0.0, 0.0, 1.0);
    graphics.end_scene();

    let state = monitor.borrow();
    assert_eq!(state.clears, 0);
    assert_eq!(state.frames_presented, 0);
}

#[test]
fn test_frame_clears_and_presents_with_vsync() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    graphics.begin_scene(0.0, 0.0, 0.0, 1.0);
    graphics.end_scene();

    let state = monitor.borrow();
    assert_eq!(state.clears, 1);
    assert_eq!(state.frames_presented, 1);
    assert_eq!(state.last_sync_interval, Some(1));
}

#[test]
fn test_refresh_rate_follows_vsync() {
    let (graphics, monitor) = ready_backend(&PresentationProperties::default());
    let expected = Rational { numerator: 60000, denominator: 1001 };
    assert_eq!(graphics.refresh_rate(), expected);
    assert_eq!(monitor.borrow().swap_chain_refresh, Some(expected));

    let properties = PresentationProperties { vsync: false, ..PresentationProperties::default() };
    let (mut graphics, monitor) = ready_backend(&properties);
    assert_eq!(graphics.refresh_rate(), Rational::UNSPECIFIED);

    graphics.begin_scene(0.0, 0.0, 0.0, 1.0);
    graphics.end_scene();
    assert_eq!(monitor.borrow().last_sync_interval, Some(0));
}

fn mode(width: u32, height: u32, numerator: u32, denominator: u32) -> DisplayMode {
    DisplayMode { width, height, refresh_rate: Rational { numerator, denominator } }
}

#[test]
fn test_refresh_rate_prefers_nearest_sixty_hertz() {
    let modes = [
        mode(1024, 768, 144, 1),
        mode(1024, 768, 59940, 1000),
        mode(1024, 768, 75, 1),
        mode(800, 600, 60, 1),
    ];
    assert_eq!(match_refresh_rate(&modes, 1024, 768), Rational { numerator: 59940, denominator: 1000 });
}

#[test]
fn test_refresh_rate_tie_takes_higher_rate() {
    let modes = [mode(1024, 768, 50, 1), mode(1024, 768, 70, 1)];
    assert_eq!(match_refresh_rate(&modes, 1024, 768), Rational { numerator: 70, denominator: 1 });
}

#[test]
fn test_refresh_rate_ignores_mode_order() {
    let mut modes = vec![mode(1024, 768, 75, 1), mode(1024, 768, 60, 1), mode(1024, 768, 120, 1)];
    let first = match_refresh_rate(&modes, 1024, 768);
    modes.reverse();
    assert_eq!(match_refresh_rate(&modes, 1024, 768), first);
    assert_eq!(first, Rational { numerator: 60, denominator: 1 });
}

#[test]
fn test_refresh_rate_skips_zero_denominator() {
    let modes = [mode(1024, 768, 60, 0), mode(1024, 768, 75, 1)];
    assert_eq!(match_refresh_rate(&modes, 1024, 768), Rational { numerator: 75, denominator: 1 });
    assert_eq!(match_refresh_rate(&modes, 640, 480), Rational::UNSPECIFIED);
}

#[test]
fn test_swap_chain_uses_matched_refresh_rate() {
    let driver = SoftwareD3d::new().with_display_modes(vec![
        mode(1024, 768, 144, 1),
        mode(1024, 768, 60, 1),
        mode(1024, 768, 75, 1),
    ]);
    let (mut graphics, monitor) = backend_with(driver);
    graphics.initialize(&PresentationProperties::default()).unwrap();

    let expected = Rational { numerator: 60, denominator: 1 };
    assert_eq!(graphics.refresh_rate(), expected);
    assert_eq!(monitor.borrow().swap_chain_refresh, Some(expected));
}

#[test]
fn test_unlisted_resolution_uses_unspecified_refresh() {
    let properties = PresentationProperties { screen_width: 1000, screen_height: 700, ..PresentationProperties::default() };
    let (graphics, _monitor) = ready_backend(&properties);
    assert_eq!(graphics.refresh_rate(), Rational::UNSPECIFIED);
}

// ============================================================================
// RESIZE
// ============================================================================

#[test]
fn test_resize_keeps_device_and_rebuilds_targets() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    let camera = Rc::new(RefCell::new(graphics.create_camera().unwrap()));
    camera.borrow_mut().initialize(&graphics).unwrap();
    graphics.set_master_camera(&camera);

    graphics.set_screen_dimensions(800, 400);

    assert!(graphics.is_display_ready());
    assert_eq!(graphics.screen_width(), 800);
    assert_eq!(graphics.screen_height(), 400);
    assert_eq!(camera.borrow().aspect_ratio(), 2.0);

    let state = monitor.borrow();
    assert_eq!(state.resizes, 1);
    assert_eq!(state.swap_chain_size, (800, 400));
    assert_eq!(state.viewport, (800.0, 400.0));
    assert_eq!(state.live_of(NativeKind::Device), 1);
    assert_eq!(state.live_of(NativeKind::RenderTargetView), 1);
    assert_eq!(state.live_of(NativeKind::DepthBuffer), 1);
    assert_eq!(state.invalid_calls, 0);
}

#[test]
fn test_resize_ignores_non_positive_dimensions() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    graphics.set_screen_dimensions(0, 600);
    graphics.set_screen_dimensions(800, -1);

    assert_eq!(graphics.screen_width(), 1024);
    assert_eq!(monitor.borrow().resizes, 0);
}

#[test]
fn test_resize_updates_ortho_matrix() {
    let (mut graphics, _monitor) = ready_backend(&PresentationProperties::default());
    let before = graphics.ortho_matrix();
    graphics.set_screen_dimensions(512, 512);
    assert_ne!(graphics.ortho_matrix(), before);
}

#[test]
fn test_failed_resize_leaves_backend_not_ready() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    monitor.borrow_mut().fail_on = Some("resize_buffers");

    graphics.set_screen_dimensions(640, 480);

    assert!(!graphics.is_display_ready());
    graphics.shutdown();
    assert_eq!(monitor.borrow().live_objects(), 0);
}

// ============================================================================
// VIDEO CARD
// ============================================================================

#[test]
fn test_video_card_info() {
    let (graphics, _monitor) = ready_backend(&PresentationProperties::default());
    let info = graphics.video_card_info().unwrap();
    assert_eq!(info, vec![SoftwareD3d::ADAPTER_DESCRIPTION.to_string(), "256 MB".to_string()]);
    assert_eq!(graphics.video_card().unwrap().memory_mb, 256);
}

#[test]
fn test_video_card_info_requires_initialize() {
    let (graphics, _monitor) = backend_with(SoftwareD3d::new());
    assert!(matches!(graphics.video_card_info(), Err(Error::Runtime { .. })));
}

// ============================================================================
// BACKEND OPS
// ============================================================================

#[test]
fn test_ops_requires_initialize() {
    let (mut graphics, _monitor) = backend_with(SoftwareD3d::new());
    assert!(matches!(graphics.ops(), Err(Error::Runtime { .. })));
}

#[test]
fn test_upload_matrices_transposes() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    let ops = graphics.ops().unwrap();
    let program = ops.compile_program(&program_source(VERTEX_SHADER, PIXEL_SHADER)).unwrap();

    let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    ops.upload_matrices(program, &MatrixSet { world, ..MatrixSet::default() }).unwrap();

    let state = monitor.borrow();
    assert_eq!(state.last_constants.len(), 192);
    let floats: Vec<f32> = state
        .last_constants
        .chunks_exact(4)
        .map(|bytes| f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect();
    assert_eq!(&floats[0..16], &world.transpose().to_cols_array()[..]);
    assert_eq!(&floats[16..32], &Mat4::IDENTITY.to_cols_array()[..]);
}

#[test]
fn test_compile_error_carries_diagnostic() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    let live_before = monitor.borrow().live_objects();

    let result = graphics
        .ops()
        .unwrap()
        .compile_program(&program_source(VERTEX_SHADER, "float4 main() : SV_TARGET { return 1; }"));

    match result {
        Err(Error::ShaderCompilation { shader, diagnostic }) => {
            assert_eq!(shader, "Color.ps");
            assert!(diagnostic.contains("X3501"));
        }
        other => panic!("expected a compile error, got {:?}", other),
    }
    assert_eq!(monitor.borrow().live_objects(), live_before);
}

#[test]
fn test_program_objects_and_bytecode_lifetime() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    let program = graphics
        .ops()
        .unwrap()
        .compile_program(&program_source(VERTEX_SHADER, PIXEL_SHADER))
        .unwrap();

    {
        let state = monitor.borrow();
        assert_eq!(state.live_of(NativeKind::Bytecode), 0);
        assert_eq!(state.live_of(NativeKind::VertexShader), 1);
        assert_eq!(state.live_of(NativeKind::PixelShader), 1);
        assert_eq!(state.live_of(NativeKind::InputLayout), 1);
        assert_eq!(state.live_of(NativeKind::Buffer(BufferKind::Constant)), 1);
        assert_eq!(state.live_of(NativeKind::Sampler), 1);
    }

    graphics.ops().unwrap().release_program(program);
    let state = monitor.borrow();
    assert_eq!(state.live_of(NativeKind::VertexShader), 0);
    assert_eq!(state.live_of(NativeKind::Sampler), 0);
}

#[test]
fn test_alpha_blending_switches_state() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    graphics.ops().unwrap().set_alpha_blending(true).unwrap();
    assert!(monitor.borrow().blending);
    graphics.ops().unwrap().set_alpha_blending(false).unwrap();
    assert!(!monitor.borrow().blending);
}

#[test]
fn test_texture_checks_pixel_data() {
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());
    let ops = graphics.ops().unwrap();

    let texture = ops.create_texture(&TextureImage::solid(4, 4, [255, 0, 0, 255])).unwrap();
    assert_eq!(monitor.borrow().live_of(NativeKind::ShaderResourceView), 1);

    let bad = TextureImage { width: 4, height: 4, pixels: vec![0; 3] };
    assert!(matches!(ops.create_texture(&bad), Err(Error::BackendError(_))));

    ops.release_texture(texture);
    assert_eq!(monitor.borrow().live_of(NativeKind::Texture), 0);
}

// ============================================================================
// SCENE OBJECTS ON THE BACKEND
// ============================================================================

#[test]
fn test_model_renders_through_backend() {
    let root = application_directory("model");
    let system = SystemInfo { application_directory: root, ..system_info() };
    let (mut graphics, monitor) = ready_backend(&PresentationProperties::default());

    let camera = Rc::new(RefCell::new(graphics.create_camera().unwrap()));
    camera.borrow_mut().initialize(&graphics).unwrap();
    graphics.set_master_camera(&camera);

    let shader = Rc::new(RefCell::new(graphics.create_shader().unwrap()));
    shader.borrow_mut().initialize(&mut graphics, &system, "Color").unwrap();

    let mut model = graphics.create_model().unwrap();
    model.initialize(&mut graphics, &shader, &ModelDesc::default()).unwrap();

    graphics.begin_scene(0.0, 0.0, 0.0, 1.0);
    model.render(&mut graphics, 16.0).unwrap();
    graphics.end_scene();

    {
        let state = monitor.borrow();
        assert_eq!(state.draws, 1);
        assert_eq!(state.indices_drawn, 36);
        assert!(state.bound_program.is_some());
        assert_eq!(state.invalid_calls, 0);
    }

    model.shutdown(&mut graphics);
    shader.borrow_mut().shutdown(&mut graphics);
    graphics.shutdown();
    assert_eq!(monitor.borrow().live_objects(), 0);
}

#[test]
fn test_register_builds_independent_devices() {
    let monitors: Rc<RefCell<Vec<SoftwareD3dMonitor>>> = Rc::default();
    let mut factory = GraphicsFactory::new();
    let recorded = Rc::clone(&monitors);
    twin_raster_engine_renderer_d3d::register_with(&mut factory, move |_system| {
        let driver = SoftwareD3d::new();
        recorded.borrow_mut().push(driver.monitor());
        Ok(Box::new(driver))
    });

    let log = Log::silent();
    let mut first = factory.create_graphics(GraphicsApi::Direct3D, &system_info(), &log).unwrap();
    let second = factory.create_graphics(GraphicsApi::Direct3D, &system_info(), &log).unwrap();
    first.initialize(&PresentationProperties::default()).unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(monitors.borrow().len(), 2);
    assert_eq!(monitors.borrow()[0].borrow().live_of(NativeKind::Device), 1);
    assert_eq!(monitors.borrow()[1].borrow().live_objects(), 0);
}

#[test]
fn test_register_default_driver() {
    let mut factory = GraphicsFactory::new();
    twin_raster_engine_renderer_d3d::register(&mut factory);
    assert!(factory.is_registered(GraphicsApi::Direct3D));
    assert!(!factory.is_registered(GraphicsApi::OpenGL));
}

#[test]
fn test_driver_failure_fails_creation() {
    let mut factory = GraphicsFactory::new();
    twin_raster_engine_renderer_d3d::register_with(&mut factory, |_system| {
        Err(Error::NotSupported("no adapter".to_string()))
    });

    let result = factory.create_graphics(GraphicsApi::Direct3D, &system_info(), &Log::silent());
    assert!(matches!(result, Err(Error::NotSupported(_))));
}

#[cfg(windows)]
#[test]
fn test_native_driver_without_window_fails_initialize() {
    let mut factory = GraphicsFactory::new();
    twin_raster_engine_renderer_d3d::register_native(&mut factory);

    let mut graphics = factory
        .create_graphics(GraphicsApi::Direct3D, &system_info(), &Log::silent())
        .unwrap();
    let result = graphics.initialize(&PresentationProperties::default());

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert!(!graphics.is_display_ready());
}
