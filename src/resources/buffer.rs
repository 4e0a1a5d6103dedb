//! Vertex and index buffers

use std::fmt;
use std::sync::Arc;

use crate::backend::{AttributeLayout, BufferTarget, BufferUsage, ElementFormat, ObjectKind};
use crate::error::{RendererError, RendererResult};

use super::device_object::{DeviceCell, DeviceObject};

/// What a buffer holds inside a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferSemantic {
    Vertex,
    Normal,
    Color,
    /// Texture coordinate set, starting at 0
    TexCoord(u8),
    Index,
    /// Several attributes packed with a shared stride
    Interleaved,
    /// Kept on the CPU, never uploaded
    CpuOnly,
}

impl BufferSemantic {
    /// Whether the buffer feeds a vertex attribute slot
    pub fn is_attribute(&self) -> bool {
        !matches!(
            self,
            BufferSemantic::Index | BufferSemantic::Interleaved | BufferSemantic::CpuOnly
        )
    }

    /// Shader attribute name the semantic binds to
    pub fn attribute_name(&self) -> String {
        match self {
            BufferSemantic::Vertex => "position".to_string(),
            BufferSemantic::Normal => "normal".to_string(),
            BufferSemantic::Color => "color".to_string(),
            BufferSemantic::TexCoord(set) => format!("texcoord{}", set),
            BufferSemantic::Index => "index".to_string(),
            BufferSemantic::Interleaved => "interleaved".to_string(),
            BufferSemantic::CpuOnly => "cpu_only".to_string(),
        }
    }

    pub fn target(&self) -> BufferTarget {
        match self {
            BufferSemantic::Index => BufferTarget::ElementArray,
            _ => BufferTarget::Array,
        }
    }
}

/// Typed buffer payload
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl BufferData {
    /// Element format of the payload
    pub fn format(&self) -> ElementFormat {
        match self {
            BufferData::F32(_) => ElementFormat::Float,
            BufferData::F64(_) => ElementFormat::Double,
            BufferData::I8(_) => ElementFormat::Byte,
            BufferData::U8(_) => ElementFormat::UnsignedByte,
            BufferData::I16(_) => ElementFormat::Short,
            BufferData::U16(_) => ElementFormat::UnsignedShort,
            BufferData::I32(_) => ElementFormat::Int,
            BufferData::U32(_) => ElementFormat::UnsignedInt,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            BufferData::F32(v) => v.len(),
            BufferData::F64(v) => v.len(),
            BufferData::I8(v) => v.len(),
            BufferData::U8(v) => v.len(),
            BufferData::I16(v) => v.len(),
            BufferData::U16(v) => v.len(),
            BufferData::I32(v) => v.len(),
            BufferData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get payload as bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BufferData::F32(v) => bytemuck::cast_slice(v),
            BufferData::F64(v) => bytemuck::cast_slice(v),
            BufferData::I8(v) => bytemuck::cast_slice(v),
            BufferData::U8(v) => v,
            BufferData::I16(v) => bytemuck::cast_slice(v),
            BufferData::U16(v) => bytemuck::cast_slice(v),
            BufferData::I32(v) => bytemuck::cast_slice(v),
            BufferData::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

macro_rules! impl_buffer_data_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for BufferData {
                fn from(values: Vec<$ty>) -> Self {
                    BufferData::$variant(values)
                }
            }

            impl From<&[$ty]> for BufferData {
                fn from(values: &[$ty]) -> Self {
                    BufferData::$variant(values.to_vec())
                }
            }
        )*
    };
}

impl_buffer_data_from! {
    f32 => F32,
    f64 => F64,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
}

/// A typed block of vertex or index data mirrored by a device buffer
///
/// A buffer without payload is a view: its layout points into the mesh's
/// interleaved buffer and it never owns device storage.
pub struct BufferResource {
    cell: Arc<DeviceCell>,
    semantic: BufferSemantic,
    usage: BufferUsage,
    layout: AttributeLayout,
    data: Option<BufferData>,
    uploaded_len: usize,
}

impl BufferResource {
    pub fn new(semantic: BufferSemantic) -> Self {
        Self {
            cell: DeviceCell::new(),
            semantic,
            usage: BufferUsage::default(),
            layout: AttributeLayout::packed(1, ElementFormat::Float),
            data: None,
            uploaded_len: 0,
        }
    }

    /// A view into the interleaved buffer
    pub(crate) fn view(semantic: BufferSemantic, layout: AttributeLayout) -> Self {
        let mut buffer = Self::new(semantic);
        buffer.layout = layout;
        buffer
    }

    pub fn semantic(&self) -> BufferSemantic {
        self.semantic
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn set_usage(&mut self, usage: BufferUsage) {
        if self.usage != usage {
            self.usage = usage;
            self.uploaded_len = 0;
            self.cell.mark_dirty();
        }
    }

    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    pub fn data(&self) -> Option<&BufferData> {
        self.data.as_ref()
    }

    pub fn is_view(&self) -> bool {
        self.data.is_none()
    }

    /// Number of elements in the payload
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, BufferData::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the payload, taking the element format from the data itself
    pub fn set_data(&mut self, components: u8, data: impl Into<BufferData>) -> RendererResult<()> {
        let data = data.into();
        let format = data.format();
        self.set_data_with_format(components, format, data)
    }

    /// Replace the payload, checking it against a declared element format
    ///
    /// Fails before any device interaction when the payload does not match.
    pub fn set_data_with_format(
        &mut self,
        components: u8,
        format: ElementFormat,
        data: impl Into<BufferData>,
    ) -> RendererResult<()> {
        let data = data.into();
        validate_components(components)?;
        if data.format() != format {
            return Err(RendererError::IncompatibleFormat {
                semantic: self.semantic,
                declared: format,
                payload: data.format(),
            });
        }
        if self.semantic == BufferSemantic::Index && !format.is_unsigned() {
            return Err(RendererError::IncompatibleFormat {
                semantic: self.semantic,
                declared: format,
                payload: data.format(),
            });
        }

        if self.is_view() {
            // A view's stride and offset address the interleaved block
            self.layout = AttributeLayout::packed(components, format);
        } else {
            self.layout.components = components;
            self.layout.format = format;
        }
        self.data = Some(data);
        self.cell.mark_dirty();
        Ok(())
    }

    pub(crate) fn set_stride(&mut self, stride: u32) {
        self.layout.stride = stride;
    }

    /// Byte length of the last upload
    pub(crate) fn uploaded_len(&self) -> usize {
        self.uploaded_len
    }

    pub(crate) fn set_uploaded_len(&mut self, len: usize) {
        self.uploaded_len = len;
    }
}

pub(crate) fn validate_components(components: u8) -> RendererResult<()> {
    if (1..=4).contains(&components) {
        Ok(())
    } else {
        Err(RendererError::InvalidParameter(format!(
            "component count must be between 1 and 4, got {}",
            components
        )))
    }
}

impl DeviceObject for BufferResource {
    fn cell(&self) -> &Arc<DeviceCell> {
        &self.cell
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Buffer
    }

    fn label(&self) -> String {
        format!("{:?} buffer", self.semantic)
    }

    fn reset_object(&mut self) {
        self.cell.reset();
        self.uploaded_len = 0;
    }
}

impl fmt::Debug for BufferResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferResource")
            .field("semantic", &self.semantic)
            .field("id", &self.cell.id())
            .field("dirty", &self.cell.is_dirty())
            .field("layout", &self.layout)
            .field("len", &self.len())
            .finish()
    }
}
