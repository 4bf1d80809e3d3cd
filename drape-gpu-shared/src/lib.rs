//! Platform-independent pieces of the Drape host: mesh generation, the
//! view-projection wire type, and the GLSL sources of the default scene.
//!
//! Nothing in here touches the browser, so everything is testable natively.

pub mod math;
pub mod mesh;
pub mod shaders;

pub use math::ViewProjection;
pub use mesh::{MeshData, MeshError, NormalFacing};
