/// Presentation properties and API selection

use std::fmt;

/// Native graphics API a backend is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    /// Immediate-mode, swap-chain based pipeline
    Direct3D,
    /// Context/surface based pipeline
    OpenGL,
}

impl GraphicsApi {
    pub const ALL: [GraphicsApi; 2] = [GraphicsApi::Direct3D, GraphicsApi::OpenGL];

    /// Backend name, also used as the shader sub-directory
    pub fn name(self) -> &'static str {
        match self {
            GraphicsApi::Direct3D => "Direct3D",
            GraphicsApi::OpenGL => "OpenGL",
        }
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a backend is asked to present: resolution, buffer formats and timing
///
/// Copied into the backend by `initialize`, then mutated only through
/// `set_screen_dimensions` or a new `initialize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationProperties {
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_bits: u8,
    pub depth_bits: u8,
    pub alpha_bits: u8,
    pub stencil_bits: u8,
    pub sample_count: u32,
    pub vsync: bool,
    pub fullscreen: bool,
    pub screen_near: f32,
    pub screen_far: f32,
    pub api_major: u32,
    pub api_minor: u32,
}

impl PresentationProperties {
    /// Width over height. Zero if the height is zero.
    pub fn aspect_ratio(&self) -> f32 {
        if self.screen_height == 0 {
            return 0.0;
        }
        self.screen_width as f32 / self.screen_height as f32
    }
}

impl Default for PresentationProperties {
    fn default() -> Self {
        Self {
            screen_width: 1024,
            screen_height: 768,
            color_bits: 32,
            depth_bits: 24,
            alpha_bits: 8,
            stencil_bits: 8,
            sample_count: 1,
            vsync: true,
            fullscreen: false,
            screen_near: 0.1,
            screen_far: 1000.0,
            api_major: 3,
            api_minor: 3,
        }
    }
}
