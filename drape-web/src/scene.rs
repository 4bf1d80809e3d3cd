//! Scene table: the fixed list of drawables and the uniform store they read.

use std::collections::HashMap;

use drape_gpu_shared::NormalFacing;

use crate::config::HostConfig;
use crate::error::HostError;
use crate::gpu::{GpuError, Graphics, PipelineState, UniformValue};
use crate::mesh::{self, IndexBuffer, MeshBuffers, COMPONENTS};
use crate::shader::ShaderRegistry;

/// Uniform holding the module's view-projection matrix.
pub const VIEW_PROJECTION: &str = "mat4_ViewProj";

/// Name of the object whose vertices the module streams every frame.
pub const CLOTH: &str = "cloth";

/// Current uniform values by name.
#[derive(Debug, Clone, Default)]
pub struct UniformStore {
    values: HashMap<String, UniformValue>,
}

impl UniformStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Vertex streams plus index buffer of an indexed drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneMesh {
    pub buffers: MeshBuffers,
    pub index: IndexBuffer,
}

/// How an object issues its draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drawable {
    /// Non-indexed triangles; vertices come from the shader itself.
    Arrays { vertex_count: i32 },
    /// Triangles from the object's own buffers.
    Indexed(SceneMesh),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub shader: String,
    pub uniforms: Vec<String>,
    pub drawable: Drawable,
    pub state: PipelineState,
}

impl SceneObject {
    pub fn new(name: &str, shader: &str, drawable: Drawable) -> Self {
        Self {
            name: name.to_string(),
            shader: shader.to_string(),
            uniforms: vec![VIEW_PROJECTION.to_string()],
            drawable,
            state: PipelineState::OPAQUE,
        }
    }

    pub fn with_state(mut self, state: PipelineState) -> Self {
        self.state = state;
        self
    }

    pub fn mesh(&self) -> Option<&SceneMesh> {
        match &self.drawable {
            Drawable::Indexed(mesh) => Some(mesh),
            Drawable::Arrays { .. } => None,
        }
    }
}

/// Outcome of one pass over the scene table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    pub skipped: usize,
}

/// Ordered drawables. Each object's [`PipelineState`] is applied before its
/// draw and `baseline` is restored after it.
#[derive(Debug, Clone)]
pub struct SceneTable {
    objects: Vec<SceneObject>,
    baseline: PipelineState,
}

impl SceneTable {
    pub fn new(baseline: PipelineState) -> Self {
        Self {
            objects: Vec::new(),
            baseline,
        }
    }

    /// The cloth scene: skybox, translucent floor, streamed cloth, and the ball
    /// it drapes over.
    pub fn cloth_scene<G: Graphics + ?Sized>(gpu: &mut G, config: &HostConfig) -> Result<Self, HostError> {
        let mut scene = Self::new(PipelineState::OPAQUE);

        scene.push(SceneObject::new(
            "skybox",
            "skybox",
            Drawable::Arrays {
                vertex_count: config.skybox_vertices,
            },
        ));
        scene.push(
            SceneObject::new(
                "floor",
                "floor",
                Drawable::Arrays {
                    vertex_count: config.floor_vertices,
                },
            )
            .with_state(PipelineState::TRANSLUCENT_OVERLAY),
        );

        let cloth = SceneMesh {
            buffers: MeshBuffers::create(gpu)?,
            index: mesh::load_grid_index_buffer(gpu, config.cloth.width, config.cloth.height)?,
        };
        scene.push(SceneObject::new(CLOTH, "cloth", Drawable::Indexed(cloth)));

        let facing = if config.ball.inward_normals {
            NormalFacing::Inward
        } else {
            NormalFacing::Outward
        };
        let (buffers, index) = mesh::load_sphere(
            gpu,
            config.ball.radius,
            config.ball.latitude_bands,
            config.ball.longitude_bands,
            facing,
        )?;
        scene.push(SceneObject::new(
            "ball",
            "cloth",
            Drawable::Indexed(SceneMesh { buffers, index }),
        ));

        Ok(scene)
    }

    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn baseline(&self) -> PipelineState {
        self.baseline
    }

    /// Draw every object in table order. Objects whose program is missing are
    /// skipped without touching the GPU.
    pub fn draw<G: Graphics + ?Sized>(
        &self,
        gpu: &mut G,
        shaders: &ShaderRegistry,
        uniforms: &UniformStore,
    ) -> Result<DrawStats, GpuError> {
        let mut stats = DrawStats::default();

        for object in &self.objects {
            let Some(program) = shaders.program(&object.shader) else {
                log::trace!("skipping `{}`: shader `{}` is unavailable", object.name, object.shader);
                stats.skipped += 1;
                continue;
            };

            gpu.use_program(program)?;
            for name in &object.uniforms {
                match uniforms.get(name) {
                    Some(value) => gpu.set_uniform(program, name, value)?,
                    None => log::trace!("`{}`: uniform `{name}` not set yet", object.name),
                }
            }

            gpu.apply_state(&object.state);
            match &object.drawable {
                Drawable::Arrays { vertex_count } => gpu.draw_arrays(*vertex_count),
                Drawable::Indexed(mesh) => {
                    for (slot, buffer) in mesh.buffers.slots() {
                        gpu.bind_vertex_attribute(slot, buffer, COMPONENTS)?;
                    }
                    gpu.bind_index_buffer(mesh.index.buffer)?;
                    gpu.draw_indexed(mesh.index.count as i32);
                }
            }
            if object.state != self.baseline {
                gpu.apply_state(&self.baseline);
            }
            stats.drawn += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::GpuCommand;
    use crate::gpu::{CullFace, HeadlessGpu, ShaderStage};
    use glam::Mat4;

    fn compiled_builtins(gpu: &mut HeadlessGpu) -> ShaderRegistry {
        let mut shaders = ShaderRegistry::with_builtins();
        assert!(shaders.compile_all(gpu).is_empty());
        shaders
    }

    fn view_projection() -> UniformStore {
        let mut uniforms = UniformStore::new();
        uniforms.set(VIEW_PROJECTION, UniformValue::Mat4(Mat4::IDENTITY));
        uniforms
    }

    // ── cloth_scene ──

    #[test]
    fn test_cloth_scene_layout() {
        let mut gpu = HeadlessGpu::new();
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();

        let names: Vec<&str> = scene.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["skybox", "floor", "cloth", "ball"]);
        assert_eq!(scene.get("ball").unwrap().shader, "cloth");
        assert_eq!(scene.get(CLOTH).unwrap().mesh().unwrap().index.count, 6786);
        assert_eq!(scene.get("floor").unwrap().state, PipelineState::TRANSLUCENT_OVERLAY);
        assert!(scene.get("skybox").unwrap().mesh().is_none());
    }

    // ── draw ──

    #[test]
    fn test_draw_issues_one_call_per_object() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        gpu.take_commands();

        let stats = scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();
        assert_eq!(stats, DrawStats { drawn: 4, skipped: 0 });

        let draws: Vec<GpuCommand> = gpu.commands().iter().filter(|c| c.is_draw()).cloned().collect();
        assert_eq!(
            draws,
            vec![
                GpuCommand::DrawArrays(36),
                GpuCommand::DrawArrays(6),
                GpuCommand::DrawIndexed(6786),
                GpuCommand::DrawIndexed(50 * 50 * 6),
            ]
        );
    }

    #[test]
    fn test_draw_uploads_view_projection_per_object() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        gpu.take_commands();

        scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();
        let uploads = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::SetUniform { name, value: UniformValue::Mat4(m), .. }
                if name == VIEW_PROJECTION && *m == Mat4::IDENTITY))
            .count();
        assert_eq!(uploads, 4);
    }

    #[test]
    fn test_draw_skips_unset_uniform() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        gpu.take_commands();

        scene.draw(&mut gpu, &shaders, &UniformStore::new()).unwrap();
        assert!(!gpu.commands().iter().any(|c| matches!(c, GpuCommand::SetUniform { .. })));
        assert_eq!(gpu.draw_count(), 4);
    }

    #[test]
    fn test_indexed_draw_binds_fixed_slots() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        let cloth = *scene.get(CLOTH).unwrap().mesh().unwrap();
        gpu.take_commands();

        scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();
        let commands = gpu.commands();
        let draw_at = commands
            .iter()
            .position(|c| *c == GpuCommand::DrawIndexed(6786))
            .unwrap();
        assert_eq!(
            &commands[draw_at - 4..draw_at],
            &[
                GpuCommand::BindVertexAttribute { slot: 0, buffer: cloth.buffers.position, components: 3 },
                GpuCommand::BindVertexAttribute { slot: 1, buffer: cloth.buffers.color, components: 3 },
                GpuCommand::BindVertexAttribute { slot: 2, buffer: cloth.buffers.normal, components: 3 },
                GpuCommand::BindIndexBuffer(cloth.index.buffer),
            ]
        );
    }

    #[test]
    fn test_state_restored_after_translucent_object() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        gpu.take_commands();

        scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();

        // Every draw runs under the state of its own object, regardless of order.
        let mut current = None;
        let mut seen = Vec::new();
        for command in gpu.commands() {
            match command {
                GpuCommand::ApplyState(state) => current = Some(*state),
                c if c.is_draw() => seen.push(current),
                _ => {}
            }
        }
        assert_eq!(
            seen,
            vec![
                Some(PipelineState::OPAQUE),
                Some(PipelineState::TRANSLUCENT_OVERLAY),
                Some(PipelineState::OPAQUE),
                Some(PipelineState::OPAQUE),
            ]
        );
        assert_eq!(gpu.state(), scene.baseline());
    }

    #[test]
    fn test_culled_object_state_is_undone() {
        let mut gpu = HeadlessGpu::new();
        let shaders = compiled_builtins(&mut gpu);
        let mut scene = SceneTable::new(PipelineState::OPAQUE);
        assert!(scene.is_empty());

        let culled = PipelineState {
            cull: Some(CullFace::Back),
            ..PipelineState::OPAQUE
        };
        scene.push(
            SceneObject::new("box", "skybox", Drawable::Arrays { vertex_count: 36 }).with_state(culled),
        );
        assert!(!scene.is_empty());
        gpu.take_commands();

        scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();
        let states: Vec<PipelineState> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                GpuCommand::ApplyState(state) => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![culled, PipelineState::OPAQUE]);
        assert_eq!(gpu.state().cull, None);
    }

    #[test]
    fn test_object_with_failed_shader_is_not_drawn() {
        let mut gpu = HeadlessGpu::new();
        gpu.reject_shaders_containing("BROKEN");
        let mut shaders = ShaderRegistry::with_builtins();
        shaders.insert_stage("floor", ShaderStage::Fragment, "BROKEN");
        assert_eq!(shaders.compile_all(&mut gpu).len(), 1);

        let scene = SceneTable::cloth_scene(&mut gpu, &HostConfig::default()).unwrap();
        gpu.take_commands();

        let stats = scene.draw(&mut gpu, &shaders, &view_projection()).unwrap();
        assert_eq!(stats, DrawStats { drawn: 3, skipped: 1 });
        assert!(!gpu.commands().contains(&GpuCommand::DrawArrays(6)));
        assert!(!gpu
            .commands()
            .contains(&GpuCommand::ApplyState(PipelineState::TRANSLUCENT_OVERLAY)));
    }
}
