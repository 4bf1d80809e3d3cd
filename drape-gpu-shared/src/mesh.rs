use glam::Vec3;
use thiserror::Error;

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_INDEXED_VERTICES: usize = u16::MAX as usize + 1;

/// Vertex color of generated spheres.
pub const MID_GRAY: [f32; 3] = [0.5, 0.5, 0.5];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh has {vertices} vertices but 16-bit indices address at most {MAX_INDEXED_VERTICES}")]
    IndexOverflow { vertices: usize },
    #[error("sphere needs at least one latitude and one longitude band (got {latitude}x{longitude})")]
    NoBands { latitude: u32, longitude: u32 },
}

/// Which way generated sphere normals point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalFacing {
    /// Unit position, pointing away from the center.
    Outward,
    /// Negated unit position. The cloth shader lights the ball from inside
    /// with these.
    Inward,
}

/// CPU-side mesh data laid out as separate attribute streams (3 floats per
/// vertex each) plus a 16-bit index list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

fn addressable(vertices: Option<usize>) -> Result<usize, MeshError> {
    match vertices {
        Some(vertices) if vertices <= MAX_INDEXED_VERTICES => Ok(vertices),
        vertices => Err(MeshError::IndexOverflow {
            vertices: vertices.unwrap_or(usize::MAX),
        }),
    }
}

/// Vertex count of a `width` x `height` grid, if 16-bit indices can address it.
pub fn grid_vertex_count(width: usize, height: usize) -> Result<usize, MeshError> {
    addressable(width.checked_mul(height))
}

/// Vertex count of a [`uv_sphere`] with the given bands, if 16-bit indices can
/// address it. A product that overflows `usize` reports `usize::MAX` vertices.
pub fn sphere_vertex_count(latitude_bands: u32, longitude_bands: u32) -> Result<usize, MeshError> {
    let rings = (latitude_bands as usize).checked_add(1);
    let segments = (longitude_bands as usize).checked_add(1);
    addressable(rings.zip(segments).and_then(|(r, s)| r.checked_mul(s)))
}

/// Triangle indices for a `width` x `height` grid of vertices stored row-major.
///
/// Each quad cell becomes `base, base+1, base+w` and `base+1, base+w+1, base+w`.
/// Grids narrower or shorter than two vertices have no cells and yield no indices.
pub fn grid_quad_indices(width: usize, height: usize) -> Result<Vec<u16>, MeshError> {
    grid_vertex_count(width, height)?;
    if width < 2 || height < 2 {
        return Ok(Vec::new());
    }

    let mut indices = Vec::with_capacity((width - 1) * (height - 1) * 6);
    for y in 0..height - 1 {
        for x in 0..width - 1 {
            let base = (y * width + x) as u16;
            let w = width as u16;
            indices.extend_from_slice(&[
                base,
                base + 1,
                base + w,
                base + 1,
                base + w + 1,
                base + w,
            ]);
        }
    }
    Ok(indices)
}

/// Triangle indices for the band grid produced by [`uv_sphere`].
pub fn sphere_indices(latitude_bands: u32, longitude_bands: u32) -> Result<Vec<u16>, MeshError> {
    sphere_vertex_count(latitude_bands, longitude_bands)?;
    let lat = latitude_bands as usize;
    let lon = longitude_bands as usize;

    let mut indices = Vec::with_capacity(lat * lon * 6);
    for band in 0..lat {
        for segment in 0..lon {
            let first = (band * (lon + 1) + segment) as u16;
            let second = first + lon as u16 + 1;
            indices.extend_from_slice(&[first, second, first + 1]);
            indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }
    Ok(indices)
}

/// Generate a UV sphere with `(latitude_bands + 1) * (longitude_bands + 1)` vertices.
///
/// theta sweeps pole to pole over latitude bands, phi sweeps the full circle
/// over longitude bands; the unit direction is `(cos phi sin theta, cos theta,
/// sin phi sin theta)`. Every vertex is colored [`MID_GRAY`].
pub fn uv_sphere(
    radius: f32,
    latitude_bands: u32,
    longitude_bands: u32,
    facing: NormalFacing,
) -> Result<MeshData, MeshError> {
    if latitude_bands == 0 || longitude_bands == 0 {
        return Err(MeshError::NoBands {
            latitude: latitude_bands,
            longitude: longitude_bands,
        });
    }
    let vertex_count = sphere_vertex_count(latitude_bands, longitude_bands)?;
    let indices = sphere_indices(latitude_bands, longitude_bands)?;

    let mut mesh = MeshData {
        positions: Vec::with_capacity(vertex_count * 3),
        colors: Vec::with_capacity(vertex_count * 3),
        normals: Vec::with_capacity(vertex_count * 3),
        indices,
    };

    let sign = match facing {
        NormalFacing::Outward => 1.0,
        NormalFacing::Inward => -1.0,
    };

    for lat in 0..=latitude_bands {
        let theta = lat as f32 * std::f32::consts::PI / latitude_bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for lon in 0..=longitude_bands {
            let phi = lon as f32 * std::f32::consts::TAU / longitude_bands as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let unit = Vec3::new(cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
            mesh.positions.extend_from_slice(&(unit * radius).to_array());
            mesh.normals.extend_from_slice(&(unit * sign).to_array());
            mesh.colors.extend_from_slice(&MID_GRAY);
        }
    }

    Ok(mesh)
}
