//! Device driver surface
//!
//! The renderer talks to the graphics device exclusively through [`DeviceDriver`].
//! Implementations wrap a real API binding; [`DummyDevice`](super::DummyDevice)
//! records calls for tests.
//!
//! Every method must be called from the thread that owns the device context.

use crate::backend::types::*;
use thiserror::Error;

/// Error reported by the device driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to allocate device object: {0}")]
    AllocationFailed(String),
    #[error("Failed to compile stage: {0}")]
    CompileFailed(String),
    #[error("Failed to link program: {0}")]
    LinkFailed(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Opaque handle of a device-side object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

/// Primitive operations of a graphics device
///
/// Object-safe so the lifecycle tracker can issue deletions through `&mut dyn DeviceDriver`.
pub trait DeviceDriver {
    /// Human readable driver name
    fn name(&self) -> &str;

    // Buffers
    fn create_buffer(&mut self) -> DeviceResult<ObjectHandle>;
    fn delete_buffer(&mut self, buffer: ObjectHandle);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<ObjectHandle>);
    /// Replace the storage of the buffer bound to `target`
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Overwrite part of the storage of the buffer bound to `target`
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // Stages and programs
    fn create_stage(&mut self, kind: StageKind) -> DeviceResult<ObjectHandle>;
    /// Compile `source`; the error carries the driver's diagnostic log
    fn compile_stage(&mut self, stage: ObjectHandle, source: &str) -> DeviceResult<()>;
    fn delete_stage(&mut self, stage: ObjectHandle);
    fn create_program(&mut self) -> DeviceResult<ObjectHandle>;
    fn attach_stage(&mut self, program: ObjectHandle, stage: ObjectHandle);
    fn detach_stage(&mut self, program: ObjectHandle, stage: ObjectHandle);
    fn link_program(&mut self, program: ObjectHandle) -> DeviceResult<()>;
    fn delete_program(&mut self, program: ObjectHandle);
    fn use_program(&mut self, program: Option<ObjectHandle>);
    fn uniform_location(&mut self, program: ObjectHandle, name: &str) -> Option<u32>;
    fn attribute_location(&mut self, program: ObjectHandle, name: &str) -> Option<u32>;
    /// Write a uniform of the program currently in use
    fn write_uniform(&mut self, slot: u32, value: &UniformValue);

    // Vertex attributes
    fn enable_attribute(&mut self, slot: u32);
    fn disable_attribute(&mut self, slot: u32);
    /// Point `slot` at the buffer bound to [`BufferTarget::Array`]
    fn attribute_pointer(&mut self, slot: u32, layout: &AttributeLayout);

    // Textures
    fn create_texture(&mut self) -> DeviceResult<ObjectHandle>;
    fn delete_texture(&mut self, texture: ObjectHandle);
    fn bind_texture(&mut self, unit: u32, dimension: TextureDimension, texture: Option<ObjectHandle>);
    /// Upload RGBA8 texels into the most recently bound texture
    fn upload_texture(
        &mut self,
        dimension: TextureDimension,
        size: TextureSize,
        rgba: &[u8],
    ) -> DeviceResult<()>;
    fn texture_filters(&mut self, dimension: TextureDimension, min: MinFilter, mag: MagFilter);
    fn texture_wrap(&mut self, dimension: TextureDimension, axis: TextureAxis, mode: WrapMode);
    fn texture_anisotropy(&mut self, dimension: TextureDimension, level: f32);
    /// Build the mip chain of the bound texture from its base level
    fn generate_mipmaps(&mut self, dimension: TextureDimension);

    // Fixed-function state
    fn set_capability(&mut self, capability: Capability, enabled: bool);
    fn depth_func(&mut self, func: CompareFunction);
    fn cull_face(&mut self, face: CullFace);
    fn front_face(&mut self, winding: FrontFace);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn polygon_mode(&mut self, mode: PolygonMode);
    fn line_width(&mut self, width: f32);
    fn point_size(&mut self, size: f32);
    fn viewport(&mut self, rect: Rect);
    fn scissor(&mut self, rect: Rect);

    // Draw
    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32);
    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, format: ElementFormat);

    /// Delete an object of the given kind
    fn delete_object(&mut self, kind: ObjectKind, handle: ObjectHandle) {
        match kind {
            ObjectKind::Buffer => self.delete_buffer(handle),
            ObjectKind::Stage => self.delete_stage(handle),
            ObjectKind::Program => self.delete_program(handle),
            ObjectKind::Texture => self.delete_texture(handle),
        }
    }
}
