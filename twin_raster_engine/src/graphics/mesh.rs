/// Vertex layout and built-in meshes

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position, RGBA color, texture UV
///
/// Byte offsets: position 0, color 12, uv 28. Stride 36.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
    pub const POSITION_OFFSET: u32 = 0;
    pub const COLOR_OFFSET: u32 = 12;
    pub const UV_OFFSET: u32 = 28;

    pub const fn new(position: [f32; 3], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self { position, color, uv }
    }
}

/// CPU-side geometry uploaded by `Model::initialize`
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Single triangle facing -Z, clockwise winding
    pub fn triangle() -> Self {
        Self {
            vertices: vec![
                Vertex::new([-1.0, -1.0, 0.0], [1.0, 0.0, 0.0, 1.0], [0.0, 1.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0], [0.5, 0.0]),
                Vertex::new([1.0, -1.0, 0.0], [0.0, 0.0, 1.0, 1.0], [1.0, 1.0]),
            ],
            indices: vec![0, 1, 2],
        }
    }

    /// Unit cube centered on the origin (half-extent 1), one color per face,
    /// clockwise winding seen from outside
    pub fn cube() -> Self {
        // face center, right, up, color
        const FACES: [([f32; 3], [f32; 3], [f32; 3], [f32; 4]); 6] = [
            ([0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0, 1.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0, 1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 1.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (center, right, up, color) in FACES {
            let base = vertices.len() as u32;
            let corner = |r: f32, u: f32| {
                [
                    center[0] + right[0] * r + up[0] * u,
                    center[1] + right[1] * r + up[1] * u,
                    center[2] + right[2] * r + up[2] * u,
                ]
            };
            vertices.push(Vertex::new(corner(-1.0, -1.0), color, [0.0, 1.0]));
            vertices.push(Vertex::new(corner(-1.0, 1.0), color, [0.0, 0.0]));
            vertices.push(Vertex::new(corner(1.0, 1.0), color, [1.0, 0.0]));
            vertices.push(Vertex::new(corner(1.0, -1.0), color, [1.0, 1.0]));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}
