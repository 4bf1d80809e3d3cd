//! Graphics abstraction the host draws through.
//!
//! The WebGL2 backend drives the page's canvas; the headless backend records
//! every call and keeps buffer contents so the host can run without a browser.

mod handle;
pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod webgl;

use std::fmt;

use glam::{Mat4, Vec3};
use thiserror::Error;

pub use handle::HandleStore;
pub use headless::HeadlessGpu;
#[cfg(target_arch = "wasm32")]
pub use webgl::WebGlGpu;

/// Opaque handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u64);

/// Opaque handle to a compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub(crate) u64);

/// Opaque handle to a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("failed to create {0}")]
    CreateFailed(&'static str),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },
    #[error("compile failed: {0}")]
    CompileFailed(String),
    #[error("link failed: {0}")]
    LinkFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded once.
    Static,
    /// Replaced wholesale, typically every frame.
    Dynamic,
}

/// Value of a shader uniform. The variant picks the upload call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    Float(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    Back,
}

/// Fixed-function state a draw call runs under. Applied in full before each
/// scene object so no object depends on what the previous one left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub blend: Option<BlendMode>,
    pub cull: Option<CullFace>,
}

impl PipelineState {
    /// Depth-tested, opaque, no culling.
    pub const OPAQUE: Self = Self {
        depth_test: true,
        blend: None,
        cull: None,
    };

    /// Alpha-blended overlay that neither tests depth nor culls.
    pub const TRANSLUCENT_OVERLAY: Self = Self {
        depth_test: false,
        blend: Some(BlendMode::Alpha),
        cull: None,
    };
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// The subset of WebGL2 the host needs.
pub trait Graphics {
    fn create_buffer(&mut self) -> Result<BufferId, GpuError>;

    /// Replace the contents of a vertex buffer.
    fn upload_floats(&mut self, buffer: BufferId, data: &[f32], usage: BufferUsage) -> Result<(), GpuError>;

    /// Replace the contents of an index buffer.
    fn upload_indices(&mut self, buffer: BufferId, data: &[u16], usage: BufferUsage) -> Result<(), GpuError>;

    /// Compile one stage. `source` must already carry its `#version` line.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GpuError>;

    fn delete_shader(&mut self, shader: ShaderId);

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GpuError>;

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError>;

    /// Resolve `name` in `program` and upload `value`. Names the program does
    /// not use are ignored, like `getUniformLocation` returning null.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue) -> Result<(), GpuError>;

    /// Bind `buffer` to attribute `slot` as tightly packed `components`-wide floats.
    fn bind_vertex_attribute(&mut self, slot: u32, buffer: BufferId, components: i32) -> Result<(), GpuError>;

    fn bind_index_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError>;

    fn apply_state(&mut self, state: &PipelineState);

    fn draw_arrays(&mut self, vertex_count: i32);

    /// Draw triangles from the bound 16-bit index buffer.
    fn draw_indexed(&mut self, index_count: i32);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: [f32; 4]);
}
