//! Texture uploads and unit bindings

use crate::backend::{DeviceDriver, ObjectHandle, ObjectKind};
use crate::error::{RendererError, RendererResult};
use crate::resources::{DeviceObject, TextureResource};

use super::RenderBackend;

impl<D: DeviceDriver> RenderBackend<D> {
    /// Bind `texture` to `unit`, uploading it first when dirty
    pub fn set_texture(&mut self, unit: u32, texture: &mut TextureResource) -> RendererResult<()> {
        let max_units = self.cache.max_texture_units();
        if unit >= max_units {
            return Err(RendererError::InvalidParameter(format!(
                "texture unit {} exceeds the limit of {}",
                unit, max_units
            )));
        }

        let handle = match texture.device_id().handle() {
            Some(handle) if !texture.is_dirty() => handle,
            _ => self.upload_texture(unit, texture)?,
        };
        self.cache
            .bind_texture(&mut self.device, unit, texture.dimension(), Some(handle))?;
        Ok(())
    }

    /// Delete `texture` from the device now
    pub fn delete_texture(&mut self, texture: &mut TextureResource) {
        if let Some(handle) = texture.device_id().handle() {
            self.release(ObjectKind::Texture, handle);
        }
        texture.reset_object();
    }

    fn upload_texture(
        &mut self,
        unit: u32,
        texture: &mut TextureResource,
    ) -> RendererResult<ObjectHandle> {
        let handle = match texture.device_id().handle() {
            Some(handle) => handle,
            None => self.allocate(&*texture, |device| device.create_texture())?,
        };
        let dimension = texture.dimension();
        self.cache
            .bind_texture(&mut self.device, unit, dimension, Some(handle))?;

        let data = texture.data();
        self.device.upload_texture(dimension, data.size(), &data.data)?;
        self.device
            .texture_filters(dimension, texture.min_filter(), texture.mag_filter());
        let wrap = texture.wrap();
        for (&axis, &mode) in dimension.axes().iter().zip(wrap.iter()) {
            self.device.texture_wrap(dimension, axis, mode);
        }
        if texture.anisotropy() > 1.0 {
            self.device.texture_anisotropy(dimension, texture.anisotropy());
        }
        if texture.min_filter().uses_mipmaps() {
            self.device.generate_mipmaps(dimension);
        }

        log::debug!(
            "Uploaded texture '{}' ({}x{}x{})",
            texture.name(),
            data.width,
            data.height,
            data.depth
        );
        texture.cell().clear_dirty();
        Ok(handle)
    }
}
