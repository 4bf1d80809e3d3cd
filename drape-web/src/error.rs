use drape_gpu_shared::MeshError;
use thiserror::Error;

use crate::gpu::GpuError;
use crate::memory::MemoryError;

/// Errors surfaced by the host layer.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("DOM error: {0}")]
    Dom(String),
    #[error("JavaScript error: {0}")]
    Js(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("invalid host configuration: {0}")]
    Config(String),
    #[error("module does not export `{0}`")]
    MissingExport(&'static str),
    #[error("module memory is not attached")]
    MemoryDetached,
    #[error("scene has no indexed object named `{0}`")]
    MissingObject(String),
}

#[cfg(target_arch = "wasm32")]
impl HostError {
    /// Wrap a thrown JS value, keeping its message when it has one.
    pub fn from_js(value: wasm_bindgen::JsValue) -> Self {
        use wasm_bindgen::JsCast;

        let message = match value.dyn_ref::<js_sys::Error>() {
            Some(err) => String::from(err.message()),
            None => value.as_string().unwrap_or_else(|| format!("{value:?}")),
        };
        HostError::Js(message)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<HostError> for wasm_bindgen::JsValue {
    fn from(err: HostError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
