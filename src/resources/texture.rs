//! Texture loading and sampling parameters

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use crate::backend::{MagFilter, MinFilter, ObjectKind, TextureDimension, TextureSize, WrapMode};
use crate::error::{RendererError, RendererResult};

use super::device_object::{DeviceCell, DeviceObject};

/// Loaded RGBA8 texel data
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub dimension: TextureDimension,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Wrap raw texels, inferring the dimension from the extent
    pub fn new(name: &str, width: u32, height: u32, depth: u32, data: Vec<u8>) -> RendererResult<Self> {
        let expected = width as usize * height.max(1) as usize * depth.max(1) as usize * 4;
        if data.len() != expected {
            return Err(RendererError::InvalidParameter(format!(
                "texture '{}' expects {} bytes of RGBA8 data, got {}",
                name,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height: height.max(1),
            depth: depth.max(1),
            dimension: infer_dimension(width, height, depth),
            data,
            name: name.to_string(),
        })
    }

    /// Load texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RendererResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path)?;
        Ok(Self::from_image(img, &name))
    }

    /// Decode an encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8], name: &str) -> RendererResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            depth: 1,
            dimension: infer_dimension(width, height, 1),
            data: img.to_rgba8().into_raw(),
            name: name.to_string(),
        }
    }

    /// Create a 1x1 texture of one color
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            dimension: infer_dimension(1, 1, 1),
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Create a checkerboard texture with 8 texel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let data = (0..size)
            .flat_map(|y| {
                (0..size).flat_map(move |x| {
                    if ((x / 8) + (y / 8)) % 2 == 0 {
                        color1
                    } else {
                        color2
                    }
                })
            })
            .collect();

        Self {
            width: size,
            height: size,
            depth: 1,
            dimension: infer_dimension(size, size, 1),
            data,
            name: "checkerboard".to_string(),
        }
    }

    pub fn size(&self) -> TextureSize {
        TextureSize {
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }
}

/// Texel data plus sampling parameters mirrored by a device texture
pub struct TextureResource {
    cell: Arc<DeviceCell>,
    data: TextureData,
    min_filter: MinFilter,
    mag_filter: MagFilter,
    wrap: [WrapMode; 3],
    anisotropy: f32,
}

impl TextureResource {
    pub fn new(data: TextureData) -> Self {
        Self {
            cell: DeviceCell::new(),
            data,
            min_filter: MinFilter::default(),
            mag_filter: MagFilter::default(),
            wrap: [WrapMode::default(); 3],
            anisotropy: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn data(&self) -> &TextureData {
        &self.data
    }

    pub fn dimension(&self) -> TextureDimension {
        self.data.dimension
    }

    /// Replace the texels
    pub fn set_data(&mut self, data: TextureData) {
        self.data = data;
        self.cell.mark_dirty();
    }

    pub fn min_filter(&self) -> MinFilter {
        self.min_filter
    }

    pub fn set_min_filter(&mut self, filter: MinFilter) {
        if self.min_filter != filter {
            self.min_filter = filter;
            self.cell.mark_dirty();
        }
    }

    pub fn mag_filter(&self) -> MagFilter {
        self.mag_filter
    }

    pub fn set_mag_filter(&mut self, filter: MagFilter) {
        if self.mag_filter != filter {
            self.mag_filter = filter;
            self.cell.mark_dirty();
        }
    }

    /// Wrap mode for S, T and R
    pub fn wrap(&self) -> [WrapMode; 3] {
        self.wrap
    }

    pub fn set_wrap(&mut self, mode: WrapMode) {
        self.set_wrap_per_axis([mode; 3]);
    }

    pub fn set_wrap_per_axis(&mut self, modes: [WrapMode; 3]) {
        if self.wrap != modes {
            self.wrap = modes;
            self.cell.mark_dirty();
        }
    }

    pub fn anisotropy(&self) -> f32 {
        self.anisotropy
    }

    /// Anisotropic filtering level, never below 1.0 (disabled)
    pub fn set_anisotropy(&mut self, level: f32) {
        let level = if level.is_nan() { 1.0 } else { level.max(1.0) };
        if self.anisotropy != level {
            self.anisotropy = level;
            self.cell.mark_dirty();
        }
    }
}

impl DeviceObject for TextureResource {
    fn cell(&self) -> &Arc<DeviceCell> {
        &self.cell
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Texture
    }

    fn label(&self) -> String {
        format!("texture '{}'", self.data.name)
    }
}

impl fmt::Debug for TextureResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureResource")
            .field("name", &self.data.name)
            .field("size", &self.data.size())
            .field("id", &self.cell.id())
            .field("dirty", &self.cell.is_dirty())
            .finish()
    }
}

/// A single row wider than one texel is 1D; a lone texel samples as 2D
fn infer_dimension(width: u32, height: u32, depth: u32) -> TextureDimension {
    if depth > 1 {
        TextureDimension::D3
    } else if height > 1 || width <= 1 {
        TextureDimension::D2
    } else {
        TextureDimension::D1
    }
}
