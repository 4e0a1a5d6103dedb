//! Resource management
//!
//! CPU-side descriptions of buffers, meshes and textures, each mirrored by a
//! device object the render backend creates and updates lazily.

mod buffer;
mod device_object;
mod mesh;
mod texture;

pub use buffer::*;
pub use device_object::*;
pub use mesh::*;
pub use texture::*;
