//! Browser input relayed to the module, plus viewport sizing.

use drape_gpu_shared::math;

use crate::error::HostError;
use crate::module::SimulationModule;

/// A DOM event the module cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown,
    PointerUp,
    /// The pointer left the document; treated as a release.
    PointerLeave,
    PointerMove { x: f64, y: f64 },
    /// `KeyboardEvent.key`.
    KeyDown(String),
}

/// Code forwarded to the module for a `KeyboardEvent.key` value.
///
/// Single characters map to their code point. Named keys with an ASCII
/// control code map to it; other named keys (modifiers, arrows, function
/// keys) have no code and are not forwarded.
pub fn key_code(key: &str) -> Option<u32> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c as u32);
    }
    match key {
        "Backspace" => Some(8),
        "Tab" => Some(9),
        "Enter" => Some(13),
        "Escape" => Some(27),
        "Delete" => Some(127),
        _ => None,
    }
}

/// Relay one event. Returns whether the module was called.
pub fn forward<M: SimulationModule + ?Sized>(module: &M, event: &InputEvent) -> Result<bool, HostError> {
    match event {
        InputEvent::PointerDown => module.pointer_down()?,
        InputEvent::PointerUp | InputEvent::PointerLeave => module.pointer_up()?,
        InputEvent::PointerMove { x, y } => module.pointer_move(*x, *y)?,
        InputEvent::KeyDown(key) => match key_code(key) {
            Some(code) => module.key_down(code)?,
            None => {
                log::trace!("key `{key}` has no code, not forwarded");
                return Ok(false);
            }
        },
    }
    Ok(true)
}

/// Drawing-buffer size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// From `window.innerWidth` / `window.innerHeight`.
    pub fn from_window(inner_width: f64, inner_height: f64) -> Self {
        let pixels = |v: f64| if v.is_finite() && v > 0.0 { v as u32 } else { 0 };
        Self::new(pixels(inner_width), pixels(inner_height))
    }

    pub fn aspect_ratio(&self) -> f32 {
        math::aspect_ratio(self.width, self.height)
    }
}
