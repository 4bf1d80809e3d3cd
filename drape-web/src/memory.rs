//! Typed view over the module's linear memory.
//!
//! The module hands the host byte offsets to `f32` arrays. This is the only
//! place where those offsets become float indices.

use std::ops::Range;

use thiserror::Error;

/// Size in bytes of the only element type the module shares.
pub const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("pointer {offset:#x} is not aligned to a {FLOAT_SIZE}-byte float")]
    Misaligned { offset: u32 },
    #[error("float range {start}..{end} lies outside module memory of {len} floats")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Float index range `[offset / 4, offset / 4 + count)`, checked against a
/// memory of `byte_len` bytes.
pub fn float_range(offset: u32, count: usize, byte_len: usize) -> Result<Range<usize>, MemoryError> {
    if offset as usize % FLOAT_SIZE != 0 {
        return Err(MemoryError::Misaligned { offset });
    }
    let start = offset as usize / FLOAT_SIZE;
    let len = byte_len / FLOAT_SIZE;
    let end = start.checked_add(count).unwrap_or(usize::MAX);
    if end > len {
        return Err(MemoryError::OutOfBounds { start, end, len });
    }
    Ok(start..end)
}

/// Read access to the module's linear memory.
///
/// Implementations must observe the memory as it is at call time; a view
/// cached across a `memory.grow` would read a detached buffer.
pub trait ModuleMemory {
    /// Current size of the memory in bytes.
    fn byte_len(&self) -> usize;

    /// Copy `count` floats starting at byte `offset`.
    fn read_floats(&self, offset: u32, count: usize) -> Result<Vec<f32>, MemoryError>;

    /// Copy a fixed-size float array starting at byte `offset`.
    fn read_array<const N: usize>(&self, offset: u32) -> Result<[f32; N], MemoryError> {
        let floats = self.read_floats(offset, N)?;
        let mut array = [0.0; N];
        array.copy_from_slice(&floats);
        Ok(array)
    }
}

/// Memory backed by an owned byte vector. Used when the module is driven
/// natively (headless runs and tests).
#[derive(Debug, Clone, Default)]
pub struct SliceMemory {
    bytes: Vec<u8>,
}

impl SliceMemory {
    pub fn zeroed(byte_len: usize) -> Self {
        Self { bytes: vec![0; byte_len] }
    }

    pub fn from_floats(floats: &[f32]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(floats).to_vec(),
        }
    }

    /// Store floats at byte `offset`, the way the module writes its arrays.
    pub fn write_floats(&mut self, offset: u32, floats: &[f32]) -> Result<(), MemoryError> {
        let range = float_range(offset, floats.len(), self.bytes.len())?;
        let bytes = &mut self.bytes[range.start * FLOAT_SIZE..range.end * FLOAT_SIZE];
        bytes.copy_from_slice(bytemuck::cast_slice(floats));
        Ok(())
    }

    /// Grow by `extra` zeroed bytes.
    pub fn grow(&mut self, extra: usize) {
        self.bytes.resize(self.bytes.len() + extra, 0);
    }
}

impl ModuleMemory for SliceMemory {
    fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    fn read_floats(&self, offset: u32, count: usize) -> Result<Vec<f32>, MemoryError> {
        let range = float_range(offset, count, self.bytes.len())?;
        let bytes = &self.bytes[range.start * FLOAT_SIZE..range.end * FLOAT_SIZE];
        Ok(bytes
            .chunks_exact(FLOAT_SIZE)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }
}

#[cfg(target_arch = "wasm32")]
pub use js::JsMemory;

#[cfg(target_arch = "wasm32")]
mod js {
    use js_sys::{ArrayBuffer, Float32Array, WebAssembly};
    use wasm_bindgen::JsCast;

    use super::{float_range, MemoryError, ModuleMemory, FLOAT_SIZE};

    /// The module's exported `WebAssembly.Memory`. The backing `ArrayBuffer`
    /// is fetched on every access, so growth is always observed.
    #[derive(Debug, Clone)]
    pub struct JsMemory {
        memory: WebAssembly::Memory,
    }

    impl JsMemory {
        pub fn new(memory: WebAssembly::Memory) -> Self {
            Self { memory }
        }

        fn buffer(&self) -> ArrayBuffer {
            self.memory.buffer().unchecked_into()
        }
    }

    impl ModuleMemory for JsMemory {
        fn byte_len(&self) -> usize {
            self.buffer().byte_length() as usize
        }

        fn read_floats(&self, offset: u32, count: usize) -> Result<Vec<f32>, MemoryError> {
            let buffer = self.buffer();
            let range = float_range(offset, count, buffer.byte_length() as usize)?;
            let view = Float32Array::new_with_byte_offset_and_length(
                &buffer,
                (range.start * FLOAT_SIZE) as u32,
                range.len() as u32,
            );
            Ok(view.to_vec())
        }
    }
}
