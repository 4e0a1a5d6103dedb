//! Common types shared between the device surface and the resource layer

use glam::{IVec2, IVec3, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Kind of device-side object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Buffer,
    Stage,
    Program,
    Texture,
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Array,
    /// Index data
    ElementArray,
}

/// How often buffer contents are expected to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsageFrequency {
    #[default]
    Static,
    Dynamic,
    Stream,
}

/// Who reads and writes the buffer contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsageNature {
    #[default]
    Draw,
    Read,
    Copy,
}

/// Buffer usage hint handed to the device on allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferUsage {
    pub frequency: UsageFrequency,
    pub nature: UsageNature,
}

impl BufferUsage {
    pub const STATIC_DRAW: Self = Self::new(UsageFrequency::Static, UsageNature::Draw);
    pub const STATIC_READ: Self = Self::new(UsageFrequency::Static, UsageNature::Read);
    pub const STATIC_COPY: Self = Self::new(UsageFrequency::Static, UsageNature::Copy);
    pub const DYNAMIC_DRAW: Self = Self::new(UsageFrequency::Dynamic, UsageNature::Draw);
    pub const DYNAMIC_READ: Self = Self::new(UsageFrequency::Dynamic, UsageNature::Read);
    pub const DYNAMIC_COPY: Self = Self::new(UsageFrequency::Dynamic, UsageNature::Copy);
    pub const STREAM_DRAW: Self = Self::new(UsageFrequency::Stream, UsageNature::Draw);
    pub const STREAM_READ: Self = Self::new(UsageFrequency::Stream, UsageNature::Read);
    pub const STREAM_COPY: Self = Self::new(UsageFrequency::Stream, UsageNature::Copy);

    pub const fn new(frequency: UsageFrequency, nature: UsageNature) -> Self {
        Self { frequency, nature }
    }
}

/// Element type of a buffer payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementFormat {
    Float,
    Double,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
}

impl ElementFormat {
    /// Size of one element in bytes
    pub fn size(&self) -> u32 {
        match self {
            ElementFormat::Byte | ElementFormat::UnsignedByte => 1,
            ElementFormat::Short | ElementFormat::UnsignedShort => 2,
            ElementFormat::Float | ElementFormat::Int | ElementFormat::UnsignedInt => 4,
            ElementFormat::Double => 8,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            ElementFormat::UnsignedByte | ElementFormat::UnsignedShort | ElementFormat::UnsignedInt
        )
    }
}

/// Layout of one attribute stream inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    /// Components per vertex (1-4)
    pub components: u8,
    pub format: ElementFormat,
    pub normalized: bool,
    /// Distance in bytes between consecutive vertices, 0 for tightly packed
    pub stride: u32,
    /// Byte offset of the first component
    pub offset: u32,
}

impl AttributeLayout {
    pub fn packed(components: u8, format: ElementFormat) -> Self {
        Self {
            components,
            format,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

/// Primitive assembly rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
}

impl PrimitiveTopology {
    /// Number of primitives assembled from `vertex_count` vertices
    pub fn element_count(&self, vertex_count: u32) -> u32 {
        let n = vertex_count;
        match self {
            PrimitiveTopology::Points | PrimitiveTopology::LineLoop => n,
            PrimitiveTopology::Lines => n / 2,
            PrimitiveTopology::LineStrip => n.saturating_sub(1),
            PrimitiveTopology::Triangles => n / 3,
            PrimitiveTopology::TriangleStrip | PrimitiveTopology::TriangleFan => n.saturating_sub(2),
            PrimitiveTopology::Quads | PrimitiveTopology::QuadStrip => n / 4,
        }
    }
}

/// Program stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Geometry => "geometry",
            StageKind::Compute => "compute",
        }
    }
}

/// Device toggles the state cache tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Blend,
    ScissorTest,
    LineSmooth,
}

/// Comparison function for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Faces removed by culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

/// Winding order of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    Cw,
    #[default]
    Ccw,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    OneMinusSrcColor,
}

/// Rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
}

/// Integer rectangle for viewports and scissor boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
}

impl TextureDimension {
    /// Wrap axes that apply to this dimensionality
    pub fn axes(&self) -> &'static [TextureAxis] {
        match self {
            TextureDimension::D1 => &[TextureAxis::S],
            TextureDimension::D2 => &[TextureAxis::S, TextureAxis::T],
            TextureDimension::D3 => &[TextureAxis::S, TextureAxis::T, TextureAxis::R],
        }
    }
}

/// Texture coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAxis {
    S,
    T,
    R,
}

/// Minification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinFilter {
    Nearest,
    #[default]
    Bilinear,
    Trilinear,
    NearestMipNearest,
    NearestMipLinear,
    BilinearMipNearest,
}

impl MinFilter {
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Bilinear)
    }
}

/// Magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MagFilter {
    Nearest,
    #[default]
    Bilinear,
}

/// Texture coordinate wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Texture extent in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Value type of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Mat3,
    Mat4,
}

/// Uniform payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::IVec2(_) => UniformType::IVec2,
            UniformValue::IVec3(_) => UniformType::IVec3,
            UniformValue::IVec4(_) => UniformType::IVec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }
}

macro_rules! impl_uniform_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

impl_uniform_from! {
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    i32 => Int,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
}
