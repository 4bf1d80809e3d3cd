use js_sys::{Float32Array, Uint16Array};
use web_sys::{WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader};

use super::{
    BlendMode, BufferId, BufferUsage, CullFace, GpuError, Graphics, HandleStore, PipelineState,
    ProgramId, ShaderId, ShaderStage, UniformValue,
};

/// [`Graphics`] over the page's WebGL2 context.
pub struct WebGlGpu {
    gl: GL,
    buffers: HandleStore<WebGlBuffer>,
    shaders: HandleStore<WebGlShader>,
    programs: HandleStore<WebGlProgram>,
}

impl WebGlGpu {
    pub fn new(gl: GL) -> Self {
        Self {
            gl,
            buffers: HandleStore::new(),
            shaders: HandleStore::new(),
            programs: HandleStore::new(),
        }
    }

    pub fn context(&self) -> &GL {
        &self.gl
    }

    fn buffer(&self, buffer: BufferId) -> Result<&WebGlBuffer, GpuError> {
        self.buffers.get(buffer.0).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.0,
        })
    }

    fn program(&self, program: ProgramId) -> Result<&WebGlProgram, GpuError> {
        self.programs.get(program.0).ok_or(GpuError::UnknownHandle {
            kind: "program",
            id: program.0,
        })
    }

    fn shader(&self, shader: ShaderId) -> Result<&WebGlShader, GpuError> {
        self.shaders.get(shader.0).ok_or(GpuError::UnknownHandle {
            kind: "shader",
            id: shader.0,
        })
    }
}

fn usage_hint(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => GL::STATIC_DRAW,
        BufferUsage::Dynamic => GL::DYNAMIC_DRAW,
    }
}

fn set_capability(gl: &GL, capability: u32, enabled: bool) {
    if enabled {
        gl.enable(capability);
    } else {
        gl.disable(capability);
    }
}

impl Graphics for WebGlGpu {
    fn create_buffer(&mut self) -> Result<BufferId, GpuError> {
        let buffer = self.gl.create_buffer().ok_or(GpuError::CreateFailed("buffer"))?;
        Ok(BufferId(self.buffers.insert(buffer)))
    }

    fn upload_floats(&mut self, buffer: BufferId, data: &[f32], usage: BufferUsage) -> Result<(), GpuError> {
        let handle = self.buffer(buffer)?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(handle));
        let array = Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, usage_hint(usage));
        Ok(())
    }

    fn upload_indices(&mut self, buffer: BufferId, data: &[u16], usage: BufferUsage) -> Result<(), GpuError> {
        let handle = self.buffer(buffer)?;
        self.gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(handle));
        let array = Uint16Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ELEMENT_ARRAY_BUFFER, &array, usage_hint(usage));
        Ok(())
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GpuError> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self.gl.create_shader(kind).ok_or(GpuError::CreateFailed("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !compiled {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            return Err(GpuError::CompileFailed(log));
        }
        Ok(ShaderId(self.shaders.insert(shader)))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(handle) = self.shaders.remove(shader.0) {
            self.gl.delete_shader(Some(&handle));
        }
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GpuError> {
        let program = self.gl.create_program().ok_or(GpuError::CreateFailed("program"))?;
        self.gl.attach_shader(&program, self.shader(vertex)?);
        self.gl.attach_shader(&program, self.shader(fragment)?);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            return Err(GpuError::LinkFailed(log));
        }
        Ok(ProgramId(self.programs.insert(program)))
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        self.gl.use_program(Some(self.program(program)?));
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &UniformValue) -> Result<(), GpuError> {
        let location = self.gl.get_uniform_location(self.program(program)?, name);
        match value {
            UniformValue::Mat4(m) => {
                self.gl
                    .uniform_matrix4fv_with_f32_array(location.as_ref(), false, &m.to_cols_array());
            }
            UniformValue::Vec3(v) => self.gl.uniform3f(location.as_ref(), v.x, v.y, v.z),
            UniformValue::Float(f) => self.gl.uniform1f(location.as_ref(), *f),
        }
        Ok(())
    }

    fn bind_vertex_attribute(&mut self, slot: u32, buffer: BufferId, components: i32) -> Result<(), GpuError> {
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(self.buffer(buffer)?));
        self.gl
            .vertex_attrib_pointer_with_i32(slot, components, GL::FLOAT, false, 0, 0);
        self.gl.enable_vertex_attrib_array(slot);
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) -> Result<(), GpuError> {
        self.gl
            .bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(self.buffer(buffer)?));
        Ok(())
    }

    fn apply_state(&mut self, state: &PipelineState) {
        set_capability(&self.gl, GL::DEPTH_TEST, state.depth_test);

        set_capability(&self.gl, GL::BLEND, state.blend.is_some());
        if let Some(BlendMode::Alpha) = state.blend {
            self.gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        }

        set_capability(&self.gl, GL::CULL_FACE, state.cull.is_some());
        if let Some(CullFace::Back) = state.cull {
            self.gl.cull_face(GL::BACK);
        }
    }

    fn draw_arrays(&mut self, vertex_count: i32) {
        self.gl.draw_arrays(GL::TRIANGLES, 0, vertex_count);
    }

    fn draw_indexed(&mut self, index_count: i32) {
        self.gl
            .draw_elements_with_i32(GL::TRIANGLES, index_count, GL::UNSIGNED_SHORT, 0);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        self.gl.clear_color(r, g, b, a);
        self.gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
    }
}
