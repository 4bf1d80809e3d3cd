//! Boundary with the compiled simulation module.

use crate::error::HostError;

/// Names the module exports.
pub mod exports {
    pub const MEMORY: &str = "memory";
    pub const SETUP: &str = "setup";
    pub const UPDATE: &str = "update";
    pub const POINTER_DOWN: &str = "on_mouse_down";
    pub const POINTER_UP: &str = "on_mouse_up";
    pub const POINTER_MOVE: &str = "on_mouse_move";
    pub const KEY_DOWN: &str = "on_key_down";
}

/// Names the module imports from the host.
pub mod imports {
    pub const NAMESPACE: &str = "env";
    pub const SET_VIEW_PROJECTION: &str = "set_view_projection";
    pub const SIN: &str = "sinf";
    pub const COS: &str = "cosf";
    pub const GET_ASPECT: &str = "get_aspect";
    pub const DRAW_SCENE: &str = "draw_scene";
    pub const UPLOAD_CLOTH_VERTICES: &str = "upload_cloth_vertices";
}

/// Entry points of the simulation module.
///
/// `update` may call back into the host (uniform set, vertex upload, scene
/// draw) before it returns, so callers must not hold a borrow of the host
/// across it.
pub trait SimulationModule {
    fn setup(&self) -> Result<(), HostError>;
    fn update(&self, delta_seconds: f32) -> Result<(), HostError>;
    fn pointer_down(&self) -> Result<(), HostError>;
    fn pointer_up(&self) -> Result<(), HostError>;
    fn pointer_move(&self, x: f64, y: f64) -> Result<(), HostError>;
    fn key_down(&self, code: u32) -> Result<(), HostError>;
}

#[cfg(target_arch = "wasm32")]
pub use js::JsModule;

#[cfg(target_arch = "wasm32")]
mod js {
    use js_sys::{Function, Reflect, WebAssembly};
    use wasm_bindgen::{JsCast, JsValue};

    use super::{exports, SimulationModule};
    use crate::error::HostError;

    /// Exports of an instantiated `WebAssembly.Instance`.
    pub struct JsModule {
        memory: WebAssembly::Memory,
        setup: Function,
        update: Function,
        pointer_down: Function,
        pointer_up: Function,
        pointer_move: Function,
        key_down: Function,
    }

    fn export<T: JsCast>(exports: &JsValue, name: &'static str) -> Result<T, HostError> {
        Reflect::get(exports, &JsValue::from_str(name))
            .map_err(HostError::from_js)?
            .dyn_into::<T>()
            .map_err(|_| HostError::MissingExport(name))
    }

    fn called(result: Result<JsValue, JsValue>) -> Result<(), HostError> {
        result.map(drop).map_err(HostError::from_js)
    }

    impl JsModule {
        pub fn from_instance(instance: &JsValue) -> Result<Self, HostError> {
            let exports_object = Reflect::get(instance, &JsValue::from_str("exports")).map_err(HostError::from_js)?;
            Ok(Self {
                memory: export(&exports_object, exports::MEMORY)?,
                setup: export(&exports_object, exports::SETUP)?,
                update: export(&exports_object, exports::UPDATE)?,
                pointer_down: export(&exports_object, exports::POINTER_DOWN)?,
                pointer_up: export(&exports_object, exports::POINTER_UP)?,
                pointer_move: export(&exports_object, exports::POINTER_MOVE)?,
                key_down: export(&exports_object, exports::KEY_DOWN)?,
            })
        }

        pub fn memory(&self) -> &WebAssembly::Memory {
            &self.memory
        }
    }

    impl SimulationModule for JsModule {
        fn setup(&self) -> Result<(), HostError> {
            called(self.setup.call0(&JsValue::NULL))
        }

        fn update(&self, delta_seconds: f32) -> Result<(), HostError> {
            called(self.update.call1(&JsValue::NULL, &JsValue::from(delta_seconds)))
        }

        fn pointer_down(&self) -> Result<(), HostError> {
            called(self.pointer_down.call0(&JsValue::NULL))
        }

        fn pointer_up(&self) -> Result<(), HostError> {
            called(self.pointer_up.call0(&JsValue::NULL))
        }

        fn pointer_move(&self, x: f64, y: f64) -> Result<(), HostError> {
            called(self.pointer_move.call2(&JsValue::NULL, &JsValue::from(x), &JsValue::from(y)))
        }

        fn key_down(&self, code: u32) -> Result<(), HostError> {
            called(self.key_down.call1(&JsValue::NULL, &JsValue::from(code)))
        }
    }
}
