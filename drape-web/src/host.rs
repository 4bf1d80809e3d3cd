//! The host context: everything the module's callbacks touch, owned in one
//! place instead of page-wide globals.

use drape_gpu_shared::ViewProjection;

use crate::config::HostConfig;
use crate::error::HostError;
use crate::gpu::{BufferUsage, Graphics, UniformValue};
use crate::input::Viewport;
use crate::memory::{MemoryError, ModuleMemory, FLOAT_SIZE};
use crate::scene::{DrawStats, SceneTable, UniformStore, CLOTH, VIEW_PROJECTION};
use crate::shader::{ShaderError, ShaderRegistry};

/// Floats per cloth vertex in each uploaded stream.
const CLOTH_COMPONENTS: usize = 3;

pub struct Host<G: Graphics, M: ModuleMemory> {
    gpu: G,
    shaders: ShaderRegistry,
    uniforms: UniformStore,
    scene: SceneTable,
    memory: Option<M>,
    viewport: Viewport,
    cloth_vertices: usize,
    shader_failures: Vec<ShaderError>,
}

impl<G: Graphics, M: ModuleMemory> Host<G, M> {
    /// Compile `shaders`, build the cloth scene and set the initial GPU state.
    /// Programs that fail to build are logged; the objects using them are
    /// simply not drawn.
    pub fn new(mut gpu: G, mut shaders: ShaderRegistry, config: &HostConfig) -> Result<Self, HostError> {
        let shader_failures = shaders.compile_all(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, config)?;

        gpu.clear(config.clear_color);
        gpu.apply_state(&scene.baseline());

        log::info!(
            "host ready: {} shader programs ({} failed), {} scene objects",
            shaders.len(),
            shader_failures.len(),
            scene.len(),
        );

        Ok(Self {
            gpu,
            shaders,
            uniforms: UniformStore::new(),
            scene,
            memory: None,
            viewport: Viewport::new(0, 0),
            cloth_vertices: config.cloth.vertex_count(),
            shader_failures,
        })
    }

    /// Attach the module's memory once the module is instantiated.
    pub fn attach_memory(&mut self, memory: M) {
        self.memory = Some(memory);
    }

    fn attached_memory(&self) -> Result<&M, HostError> {
        self.memory.as_ref().ok_or(HostError::MemoryDetached)
    }

    /// `set_view_projection(ptr)`: copy 16 floats into the uniform store.
    pub fn set_view_projection(&mut self, ptr: u32) -> Result<(), HostError> {
        let view_projection = ViewProjection(self.attached_memory()?.read_array(ptr)?);
        self.uniforms
            .set(VIEW_PROJECTION, UniformValue::Mat4(view_projection.to_mat4()));
        Ok(())
    }

    /// `upload_cloth_vertices(count, positions, colors, normals)`: replace the
    /// cloth's three vertex streams with `count` vertices read from memory.
    pub fn upload_cloth_vertices(
        &mut self,
        count: u32,
        positions: u32,
        colors: u32,
        normals: u32,
    ) -> Result<(), HostError> {
        let memory = self.attached_memory()?;
        let floats = (count as usize)
            .checked_mul(CLOTH_COMPONENTS)
            .ok_or_else(|| MemoryError::OutOfBounds {
                start: positions as usize / FLOAT_SIZE,
                end: usize::MAX,
                len: memory.byte_len() / FLOAT_SIZE,
            })?;
        if count as usize != self.cloth_vertices {
            log::warn!(
                "module uploaded {count} cloth vertices, index buffer expects {}",
                self.cloth_vertices
            );
        }

        let position_data = memory.read_floats(positions, floats)?;
        let color_data = memory.read_floats(colors, floats)?;
        let normal_data = memory.read_floats(normals, floats)?;

        let cloth = self
            .scene
            .get(CLOTH)
            .and_then(|object| object.mesh())
            .ok_or_else(|| HostError::MissingObject(CLOTH.to_string()))?;
        cloth.buffers.upload(
            &mut self.gpu,
            &position_data,
            &color_data,
            &normal_data,
            BufferUsage::Dynamic,
        )?;
        Ok(())
    }

    /// `draw_scene()`.
    pub fn draw_scene(&mut self) -> Result<DrawStats, HostError> {
        Ok(self.scene.draw(&mut self.gpu, &self.shaders, &self.uniforms)?)
    }

    /// `get_aspect()`.
    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.aspect_ratio()
    }

    /// Apply a new drawing-buffer size to the GL viewport.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.gpu.set_viewport(viewport.width, viewport.height);
        log::info!("resized: {}x{}", viewport.width, viewport.height);
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn memory(&self) -> Option<&M> {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut M> {
        self.memory.as_mut()
    }

    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    pub fn scene(&self) -> &SceneTable {
        &self.scene
    }

    pub fn shaders(&self) -> &ShaderRegistry {
        &self.shaders
    }

    pub fn shader_failures(&self) -> &[ShaderError] {
        &self.shader_failures
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::GpuCommand;
    use crate::gpu::{HeadlessGpu, PipelineState};
    use crate::memory::{MemoryError, SliceMemory};
    use glam::{Mat4, Vec3};

    type TestHost = Host<HeadlessGpu, SliceMemory>;

    fn host() -> TestHost {
        Host::new(HeadlessGpu::new(), ShaderRegistry::with_builtins(), &HostConfig::default()).unwrap()
    }

    #[test]
    fn test_new_sets_baseline_state() {
        let host = host();
        assert!(host.shader_failures().is_empty());
        assert_eq!(host.gpu().state(), PipelineState::OPAQUE);
        assert!(host.gpu().commands().contains(&GpuCommand::Clear([0.0, 0.0, 0.2, 1.0])));
    }

    #[test]
    fn test_callbacks_need_memory() {
        let mut host = host();
        assert!(matches!(host.set_view_projection(0), Err(HostError::MemoryDetached)));
        assert!(matches!(
            host.upload_cloth_vertices(1200, 0, 0, 0),
            Err(HostError::MemoryDetached)
        ));
    }

    #[test]
    fn test_set_view_projection_copies_matrix() {
        let mut host = host();
        let mut memory = SliceMemory::zeroed(256);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        memory.write_floats(64, &m.to_cols_array()).unwrap();
        host.attach_memory(memory);

        host.set_view_projection(64).unwrap();
        assert_eq!(host.uniforms().get(VIEW_PROJECTION), Some(&UniformValue::Mat4(m)));

        // The store holds a copy: later writes to module memory do not leak in.
        host.memory_mut().unwrap().write_floats(64, &[0.0; 16]).unwrap();
        assert_eq!(host.uniforms().get(VIEW_PROJECTION), Some(&UniformValue::Mat4(m)));
    }

    #[test]
    fn test_out_of_range_pointer_is_an_error() {
        let mut host = host();
        host.attach_memory(SliceMemory::zeroed(32));
        let err = host.set_view_projection(16).unwrap_err();
        assert!(matches!(err, HostError::Memory(MemoryError::OutOfBounds { .. })));
        assert!(host.uniforms().is_empty());
    }

    #[test]
    fn test_oversized_cloth_count_is_out_of_bounds() {
        let mut host = host();
        host.attach_memory(SliceMemory::zeroed(64 * 1024));
        host.gpu_mut().take_commands();

        let err = host.upload_cloth_vertices(u32::MAX, 0, 0, 0).unwrap_err();
        assert!(matches!(err, HostError::Memory(MemoryError::OutOfBounds { .. })));
        assert!(!host
            .gpu()
            .commands()
            .iter()
            .any(|c| matches!(c, GpuCommand::UploadFloats { .. })));
    }

    #[test]
    fn test_resize_updates_viewport_and_aspect() {
        let mut host = host();
        assert_eq!(host.aspect_ratio(), 1.0);
        host.resize(Viewport::new(800, 400));
        assert_eq!(host.gpu().viewport(), (800, 400));
        assert_eq!(host.aspect_ratio(), 2.0);
    }
}
