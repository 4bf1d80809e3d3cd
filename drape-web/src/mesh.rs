//! GPU upload of mesh data. Builders in `drape_gpu_shared::mesh` produce the
//! vertex streams; these functions push them into fresh buffers and keep only
//! the handles.

use drape_gpu_shared::mesh::{self, NormalFacing};

use crate::error::HostError;
use crate::gpu::{BufferId, BufferUsage, GpuError, Graphics};

/// Floats per vertex in each attribute stream.
pub const COMPONENTS: i32 = 3;

/// Separate position/color/normal vertex buffers bound to attribute slots 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub position: BufferId,
    pub color: BufferId,
    pub normal: BufferId,
}

impl MeshBuffers {
    pub fn create<G: Graphics + ?Sized>(gpu: &mut G) -> Result<Self, GpuError> {
        Ok(Self {
            position: gpu.create_buffer()?,
            color: gpu.create_buffer()?,
            normal: gpu.create_buffer()?,
        })
    }

    /// Replace all three streams at once.
    pub fn upload<G: Graphics + ?Sized>(
        &self,
        gpu: &mut G,
        positions: &[f32],
        colors: &[f32],
        normals: &[f32],
        usage: BufferUsage,
    ) -> Result<(), GpuError> {
        gpu.upload_floats(self.position, positions, usage)?;
        gpu.upload_floats(self.color, colors, usage)?;
        gpu.upload_floats(self.normal, normals, usage)?;
        Ok(())
    }

    /// Attribute slot for each buffer, in binding order.
    pub fn slots(&self) -> [(u32, BufferId); 3] {
        [(0, self.position), (1, self.color), (2, self.normal)]
    }
}

/// A 16-bit index buffer and how many indices it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBuffer {
    pub buffer: BufferId,
    pub count: usize,
}

pub fn load_index_buffer<G: Graphics + ?Sized>(gpu: &mut G, indices: &[u16]) -> Result<IndexBuffer, GpuError> {
    let buffer = gpu.create_buffer()?;
    gpu.upload_indices(buffer, indices, BufferUsage::Static)?;
    Ok(IndexBuffer {
        buffer,
        count: indices.len(),
    })
}

/// Index buffer for a row-major `width` x `height` vertex grid.
pub fn load_grid_index_buffer<G: Graphics + ?Sized>(
    gpu: &mut G,
    width: usize,
    height: usize,
) -> Result<IndexBuffer, HostError> {
    let indices = mesh::grid_quad_indices(width, height)?;
    Ok(load_index_buffer(gpu, &indices)?)
}

/// Static UV sphere: vertex buffers plus index buffer.
pub fn load_sphere<G: Graphics + ?Sized>(
    gpu: &mut G,
    radius: f32,
    latitude_bands: u32,
    longitude_bands: u32,
    facing: NormalFacing,
) -> Result<(MeshBuffers, IndexBuffer), HostError> {
    let sphere = mesh::uv_sphere(radius, latitude_bands, longitude_bands, facing)?;

    let buffers = MeshBuffers::create(gpu)?;
    buffers.upload(
        gpu,
        &sphere.positions,
        &sphere.colors,
        &sphere.normals,
        BufferUsage::Static,
    )?;
    let index = load_index_buffer(gpu, &sphere.indices)?;

    log::debug!(
        "sphere r={radius}: {} vertices, {} indices",
        sphere.vertex_count(),
        index.count
    );
    Ok((buffers, index))
}
