//! Buffer and mesh uploads

use crate::backend::{DeviceDriver, ObjectKind};
use crate::error::RendererResult;
use crate::resources::{BufferResource, BufferSemantic, DeviceObject, MeshResource};

use super::RenderBackend;

impl<D: DeviceDriver> RenderBackend<D> {
    /// Upload `buffer` if it is dirty or has no device storage yet
    ///
    /// A payload of the same byte length is written in place; anything else
    /// replaces the storage. Views and CPU-only buffers never touch the device.
    pub fn upload_buffer(&mut self, buffer: &mut BufferResource) -> RendererResult<()> {
        if buffer.semantic() == BufferSemantic::CpuOnly || buffer.is_view() {
            buffer.cell().clear_dirty();
            return Ok(());
        }
        let allocated = buffer.device_id().handle();
        if !buffer.is_dirty() && allocated.is_some() {
            return Ok(());
        }

        let (handle, fresh) = match allocated {
            Some(handle) => (handle, false),
            None => (self.allocate(&*buffer, |device| device.create_buffer())?, true),
        };
        let target = buffer.semantic().target();
        self.cache.bind_buffer(&mut self.device, target, Some(handle));

        let Some(data) = buffer.data() else {
            return Ok(());
        };
        let bytes = data.as_bytes();
        if !fresh && buffer.uploaded_len() == bytes.len() && !bytes.is_empty() {
            self.device.buffer_sub_data(target, 0, bytes);
        } else {
            self.device.buffer_data(target, bytes, buffer.usage());
        }
        log::trace!("Uploaded {} ({} bytes)", buffer.label(), bytes.len());

        let len = bytes.len();
        buffer.set_uploaded_len(len);
        buffer.cell().clear_dirty();
        Ok(())
    }

    /// Upload every dirty buffer of `mesh`
    pub fn upload_mesh(&mut self, mesh: &mut MeshResource) -> RendererResult<()> {
        for buffer in mesh.buffers_mut() {
            self.upload_buffer(buffer)?;
        }
        Ok(())
    }

    /// Delete `buffer` from the device now
    pub fn delete_buffer(&mut self, buffer: &mut BufferResource) {
        if let Some(handle) = buffer.device_id().handle() {
            self.release(ObjectKind::Buffer, handle);
        }
        buffer.reset_object();
    }

    /// Delete every buffer of `mesh` from the device now
    pub fn delete_mesh(&mut self, mesh: &mut MeshResource) {
        for buffer in mesh.buffers_mut() {
            self.delete_buffer(buffer);
        }
    }
}
