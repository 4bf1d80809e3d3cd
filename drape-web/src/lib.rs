//! Drape WASM host
//!
//! Loads a compiled cloth-simulation module, forwards browser input to it, and
//! renders the vertex and uniform data it produces through WebGL2. The
//! simulation itself lives in the module; this crate owns shaders, the scene
//! table, and the frame loop.

pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod host;
pub mod input;
pub mod memory;
pub mod mesh;
pub mod module;
pub mod scene;
pub mod shader;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod dom;

pub use config::HostConfig;
pub use error::HostError;
pub use host::Host;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point, called when the WASM module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Trace).expect("Failed to init logger");
    log::set_max_level(log::LevelFilter::Info);
}

/// Load the simulation module and start rendering.
///
/// `options` is an optional object of [`HostConfig`] fields in camelCase.
/// Resolves once the module's `setup` has run and the frame loop is scheduled.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub async fn start_host(options: JsValue) -> Result<(), JsValue> {
    let config: HostConfig = if options.is_undefined() || options.is_null() {
        HostConfig::default()
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsValue::from_str(&format!("Invalid host options: {e}")))?
    };
    config.validate()?;
    log::set_max_level(config.log_level()?.to_level_filter());

    app::run(config).await?;
    Ok(())
}
