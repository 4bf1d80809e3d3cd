use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Number of floats the module writes for a view-projection matrix.
pub const VIEW_PROJECTION_FLOATS: usize = 16;

/// View-projection matrix as the module lays it out in linear memory:
/// 16 consecutive `f32`, column-major.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewProjection(pub [f32; VIEW_PROJECTION_FLOATS]);

impl ViewProjection {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, //
    ]);

    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(self))
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.0)
    }
}

impl From<Mat4> for ViewProjection {
    fn from(m: Mat4) -> Self {
        Self(m.to_cols_array())
    }
}

/// Width over height, falling back to 1.0 for a collapsed viewport.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    width as f32 / height as f32
}

/// Reciprocal of the frame delta, `None` when no time has elapsed.
pub fn frames_per_second(delta_seconds: f64) -> Option<f64> {
    if delta_seconds > 0.0 && delta_seconds.is_finite() {
        Some(1.0 / delta_seconds)
    } else {
        None
    }
}

/// Text shown in the on-page frame-rate element.
pub fn fps_readout(delta_seconds: f64) -> String {
    match frames_per_second(delta_seconds) {
        Some(fps) => format!("FPS: {fps:.1}"),
        None => "FPS: --".to_string(),
    }
}
