use super::{
    BufferId, BufferUsage, GpuError, Graphics, HandleStore, PipelineState, ProgramId, ShaderId,
    ShaderStage, UniformValue,
};

/// One call made against the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateBuffer(BufferId),
    UploadFloats { buffer: BufferId, len: usize, usage: BufferUsage },
    UploadIndices { buffer: BufferId, len: usize, usage: BufferUsage },
    CompileShader { stage: ShaderStage, ok: bool },
    DeleteShader(ShaderId),
    LinkProgram { ok: bool },
    UseProgram(ProgramId),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    BindVertexAttribute { slot: u32, buffer: BufferId, components: i32 },
    BindIndexBuffer(BufferId),
    ApplyState(PipelineState),
    DrawArrays(i32),
    DrawIndexed(i32),
    Viewport { width: u32, height: u32 },
    Clear([f32; 4]),
}

impl GpuCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, GpuCommand::DrawArrays(_) | GpuCommand::DrawIndexed(_))
    }
}

/// Contents of a headless buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BufferContents {
    #[default]
    Empty,
    Floats(Vec<f32>),
    Indices(Vec<u16>),
}

/// Backend that performs no rendering. It records every command, keeps buffer
/// contents, and tracks the fixed-function state the way a GL context would.
#[derive(Debug)]
pub struct HeadlessGpu {
    buffers: HandleStore<BufferContents>,
    shaders: HandleStore<ShaderStage>,
    programs: HandleStore<(ShaderId, ShaderId)>,
    commands: Vec<GpuCommand>,
    rejected_markers: Vec<String>,
    state: PipelineState,
    viewport: (u32, u32),
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self {
            buffers: HandleStore::new(),
            shaders: HandleStore::new(),
            programs: HandleStore::new(),
            commands: Vec::new(),
            rejected_markers: Vec::new(),
            // Fresh GL contexts start with every capability disabled.
            state: PipelineState {
                depth_test: false,
                blend: None,
                cull: None,
            },
            viewport: (0, 0),
        }
    }

    /// Make compilation fail for any source containing `marker`.
    pub fn reject_shaders_containing(&mut self, marker: impl Into<String>) {
        self.rejected_markers.push(marker.into());
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    pub fn buffer(&self, buffer: BufferId) -> Option<&BufferContents> {
        self.buffers.get(buffer.0)
    }

    pub fn floats(&self, buffer: BufferId) -> Option<&[f32]> {
        match self.buffers.get(buffer.0)? {
            BufferContents::Floats(data) => Some(data),
            _ => None,
        }
    }

    pub fn indices(&self, buffer: BufferId) -> Option<&[u16]> {
        match self.buffers.get(buffer.0)? {
            BufferContents::Indices(data) => Some(data),
            _ => None,
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn buffer_mut(&mut self, buffer: BufferId) -> Result<&mut BufferContents, GpuError> {
        self.buffers.get_mut(buffer.0).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.0,
        })
    }

    fn check_buffer(&self, buffer: BufferId) -> Result<(), GpuError> {
        match self.buffers.get(buffer.0) {
            Some(_) => Ok(()),
            None => Err(GpuError::UnknownHandle { kind: "buffer", id: buffer.0 }),
        }
    }
}

impl Default for HeadlessGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics for HeadlessGpu {
    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        let id = BufferId(self.buffers.insert(BufferContents::Empty));
        self.commands.push(GpuCommand::CreateBuffer(id));
        Ok(id)
    }

    fn upload_floats(&mut self, buffer: BufferId, data: &[f32], usage: BufferUsage) -> Result<(), GpuError> {
        *self.buffer_mut(buffer)? = BufferContents::Floats(data.to_vec());
        self.commands.push(GpuCommand::UploadFloats { buffer, len: data.len(), usage });
        Ok(())
    }

    fn upload_indices(&mut self, buffer: BufferId, data: &[u16], usage: BufferUsage) -> Result<(), GpuError> {
        *self.buffer_mut(buffer)? = BufferContents::Indices(data.to_vec());
        self.commands.push(GpuCommand::UploadIndices { buffer, len: data.len(), usage });
        Ok(())
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GpuError> {
        let rejected = self.rejected_markers.iter().find(|m| source.contains(m.as_str()));
        if let Some(marker) = rejected {
            let log = format!("ERROR: 0:1: '{marker}' : syntax error");
            self.commands.push(GpuCommand::CompileShader { stage, ok: false });
            return Err(GpuError::CompileFailed(log));
        }
        if !source.starts_with("#version 300 es") {
            self.commands.push(GpuCommand::CompileShader { stage, ok: false });
            return Err(GpuError::CompileFailed("ERROR: missing #version 300 es".to_string()));
        }
        self.commands.push(GpuCommand::CompileShader { stage, ok: true });
        Ok(ShaderId(self.shaders.insert(stage)))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(shader.0);
        self.commands.push(GpuCommand::DeleteShader(shader));
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GpuError> {
        let stages = (self.shaders.get(vertex.0).copied(), self.shaders.get(fragment.0).copied());
        if stages != (Some(ShaderStage::Vertex), Some(ShaderStage::Fragment)) {
            self.commands.push(GpuCommand::LinkProgram { ok: false });
            return Err(GpuError::LinkFailed(format!(
                "expected a vertex and a fragment shader, got {stages:?}"
            )));
        }
        self.commands.push(GpuCommand::LinkProgram { ok: true });
        Ok(ProgramId(self.programs.insert((vertex, fragment))))
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        if self.programs.get(program.0).is_none() {
            return Err(GpuError::UnknownHandle { kind: "program", id: program.0 });
        }
        self.commands.push(GpuCommand::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue) -> Result<(), GpuError> {
        self.commands.push(GpuCommand::SetUniform {
            program,
            name: name.to_string(),
            value: *value,
        });
        Ok(())
    }

    fn bind_vertex_attribute(&mut self, slot: u32, buffer: BufferId, components: i32) -> Result<(), GpuError> {
        self.check_buffer(buffer)?;
        self.commands.push(GpuCommand::BindVertexAttribute { slot, buffer, components });
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError> {
        self.check_buffer(buffer)?;
        self.commands.push(GpuCommand::BindIndexBuffer(buffer));
        Ok(())
    }

    fn apply_state(&mut self, state: &PipelineState) {
        self.state = *state;
        self.commands.push(GpuCommand::ApplyState(*state));
    }

    fn draw_arrays(&mut self, vertex_count: i32) {
        self.commands.push(GpuCommand::DrawArrays(vertex_count));
    }

    fn draw_indexed(&mut self, index_count: i32) {
        self.commands.push(GpuCommand::DrawIndexed(index_count));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.commands.push(GpuCommand::Viewport { width, height });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(GpuCommand::Clear(color));
    }
}
