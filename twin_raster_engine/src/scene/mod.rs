//! Scene objects - camera, model and shader
//!
//! One concrete type each, bound to the backend that created them. The
//! engine owns them; backends only observe the master camera.

mod camera;
mod model;
mod shader;

pub use camera::{Camera, FIELD_OF_VIEW};
pub use model::{compose_world, Model, ModelDesc};
pub use shader::Shader;
