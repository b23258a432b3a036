/// Unit tests for the two-phase extension loader bootstrap

use super::*;
use crate::gl_software::{ContextFlavor, SoftwareGl};

fn real_surface(driver: &mut SoftwareGl) -> SurfaceHandle {
    driver.create_surface(None).unwrap()
}

// ============================================================================
// PHASE ONE
// ============================================================================

#[test]
fn test_bootstrap_tears_down_dummy_window_and_context() {
    let mut driver = SoftwareGl::new();
    let monitor = driver.monitor();
    let mut loader = ExtensionLoader::new();

    loader.bootstrap(&mut driver, &Log::silent()).unwrap();

    let state = monitor.borrow();
    assert!(loader.is_initialized());
    assert_eq!(loader.extensions(), GlExtensions::all());
    assert_eq!(state.hidden_windows_created, 1);
    assert_eq!(state.extension_loads, 1);
    assert_eq!(state.total_live(), 0);
    assert!(state.current.is_none());
    assert_eq!(state.invalid_calls, 0);
}

#[test]
fn test_bootstrap_runs_once() {
    let mut driver = SoftwareGl::new();
    let monitor = driver.monitor();
    let mut loader = ExtensionLoader::new();

    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();

    assert_eq!(monitor.borrow().hidden_windows_created, 1);
    assert_eq!(monitor.borrow().extension_loads, 1);
}

#[test]
fn test_bootstrap_failure_cleans_up_and_can_retry() {
    let mut driver = SoftwareGl::new().failing_on("load_extensions");
    let monitor = driver.monitor();
    let mut loader = ExtensionLoader::new();

    assert!(loader.bootstrap(&mut driver, &Log::silent()).is_err());
    assert!(!loader.is_initialized());
    assert_eq!(monitor.borrow().total_live(), 0);
    assert!(monitor.borrow().current.is_none());

    monitor.borrow_mut().fail_on = None;
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    assert!(loader.is_initialized());
}

#[test]
fn test_loaders_are_independent() {
    let mut driver = SoftwareGl::new();
    let monitor = driver.monitor();
    let mut first = ExtensionLoader::new();
    let mut second = ExtensionLoader::new();

    first.bootstrap(&mut driver, &Log::silent()).unwrap();
    assert!(!second.is_initialized());
    second.bootstrap(&mut driver, &Log::silent()).unwrap();

    assert_eq!(monitor.borrow().extension_loads, 2);
}

// ============================================================================
// PHASE TWO
// ============================================================================

#[test]
fn test_real_context_requires_bootstrap() {
    let mut driver = SoftwareGl::new();
    let surface = real_surface(&mut driver);
    let loader = ExtensionLoader::new();

    let result = loader.create_real_context(&mut driver, surface, &PresentationProperties::default(), &Log::silent());
    assert!(matches!(result, Err(Error::Runtime { .. })));
}

#[test]
fn test_real_context_prefers_versioned_core_profile() {
    let mut driver = SoftwareGl::new();
    let monitor = driver.monitor();
    let mut loader = ExtensionLoader::new();
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    let surface = real_surface(&mut driver);
    let properties = PresentationProperties::default();

    let (context, kind) = loader
        .create_real_context(&mut driver, surface, &properties, &Log::silent())
        .unwrap();

    assert_eq!(kind, ContextKind::Versioned { major: 3, minor: 3, core_profile: true });
    let state = monitor.borrow();
    assert_eq!(state.context_flavor(context), Some(ContextFlavor::Versioned { major: 3, minor: 3 }));
    let format = state.pixel_format.unwrap();
    assert_eq!(format.depth_bits, properties.depth_bits);
    assert!(format.double_buffer);
}

#[test]
fn test_real_context_falls_back_without_attribs_extension() {
    let mut driver = SoftwareGl::new().with_extensions(GlExtensions::PIXEL_FORMAT);
    let mut loader = ExtensionLoader::new();
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    let surface = real_surface(&mut driver);

    let (_, kind) = loader
        .create_real_context(&mut driver, surface, &PresentationProperties::default(), &Log::silent())
        .unwrap();
    assert_eq!(kind, ContextKind::Legacy);
}

#[test]
fn test_real_context_falls_back_when_version_refused() {
    let mut driver = SoftwareGl::new().with_max_version(2, 1);
    let mut loader = ExtensionLoader::new();
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    let surface = real_surface(&mut driver);

    let (_, kind) = loader
        .create_real_context(&mut driver, surface, &PresentationProperties::default(), &Log::silent())
        .unwrap();
    assert_eq!(kind, ContextKind::Legacy);
}

#[test]
fn test_real_context_uses_basic_pixel_format_without_extension() {
    let mut driver = SoftwareGl::new().with_extensions(GlExtensions::empty());
    let monitor = driver.monitor();
    let mut loader = ExtensionLoader::new();
    loader.bootstrap(&mut driver, &Log::silent()).unwrap();
    let surface = real_surface(&mut driver);

    loader
        .create_real_context(&mut driver, surface, &PresentationProperties::default(), &Log::silent())
        .unwrap();
    assert!(monitor.borrow().pixel_format.is_none());
}
