/// Shader - a compiled vertex + fragment program and its per-frame uploads

use std::fs;

use glam::Mat4;

use crate::error::{Error, Result};
use crate::graphics::{BackendId, BackendOps, Graphics, MatrixSet, ProgramHandle, ProgramSource, TextureHandle};
use crate::system::SystemInfo;

#[derive(Debug)]
pub struct Shader {
    backend: BackendId,
    name: String,
    program: Option<ProgramHandle>,
    world: Mat4,
}

impl Shader {
    /// Shaders are created through [`Graphics::create_shader`]
    pub(crate) fn new(backend: BackendId) -> Self {
        Self {
            backend,
            name: String::new(),
            program: None,
            world: Mat4::IDENTITY,
        }
    }

    /// Read `<app-dir>/Shaders/<backend>/<name>.<ext>` for both stages,
    /// then compile and link them
    ///
    /// Compile failures are logged with the compiler output and returned
    /// as `InitializationFailed`.
    pub fn initialize(&mut self, graphics: &mut dyn Graphics, system: &SystemInfo, name: &str) -> Result<()> {
        if graphics.id() != self.backend {
            return Err(Error::invalid_argument(
                "Shader",
                "initialize",
                format!("shader belongs to another backend than {}", graphics.name()),
            ));
        }
        if self.program.is_some() {
            return Err(Error::runtime("Shader", "initialize", format!("shader '{}' already initialized", self.name)));
        }

        let log = graphics.log().clone();
        let backend_name = graphics.name().to_string();
        let ops = graphics.ops()?;
        let (vertex_ext, fragment_ext) = ops.stage_extensions();

        let vertex_path = system.shader_path(&backend_name, name, vertex_ext);
        let fragment_path = system.shader_path(&backend_name, name, fragment_ext);

        let read = |path: &std::path::Path| {
            fs::read_to_string(path)
                .map_err(|e| Error::Io(format!("Failed to read shader '{}': {}", path.display(), e)))
        };
        let source = ProgramSource {
            name: name.to_string(),
            vertex: read(&vertex_path)?,
            fragment: read(&fragment_path)?,
        };

        match ops.compile_program(&source) {
            Ok(program) => {
                self.program = Some(program);
                self.name = name.to_string();
                self.world = Mat4::IDENTITY;
                crate::engine_diag!(log, "twinraster::Shader", "Compiled {} shader '{}'", backend_name, name);
                Ok(())
            }
            Err(Error::ShaderCompilation { shader, diagnostic }) => {
                crate::engine_error!(
                    log,
                    "twinraster::Shader",
                    "Shader '{}' failed to compile:\n{}",
                    shader,
                    diagnostic
                );
                Err(Error::InitializationFailed(format!("shader '{}' did not compile", shader)))
            }
            Err(e) => Err(e),
        }
    }

    /// World matrix uploaded by the next `render`
    pub fn set_world(&mut self, world: Mat4) {
        self.world = world;
    }

    /// Activate the program, upload world/view/projection and bind `texture`
    pub fn render(
        &self,
        ops: &mut dyn BackendOps,
        view: &Mat4,
        projection: &Mat4,
        texture: Option<TextureHandle>,
    ) -> Result<()> {
        let program = self
            .program
            .ok_or_else(|| Error::runtime("Shader", "render", "shader is not initialized"))?;

        ops.use_program(program, texture)?;
        ops.upload_matrices(
            program,
            &MatrixSet {
                world: self.world,
                view: *view,
                projection: *projection,
            },
        )
    }

    /// Release the compiled program. Safe to call more than once.
    pub fn shutdown(&mut self, graphics: &mut dyn Graphics) {
        if let Some(program) = self.program.take() {
            if let Ok(ops) = graphics.ops() {
                ops.release_program(program);
            }
        }
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.program.is_some()
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
