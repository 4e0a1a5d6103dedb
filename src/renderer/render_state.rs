//! Render state descriptor handed in by the scene layer

use crate::backend::{BlendFactor, CompareFunction, CullFace, FrontFace};
use crate::error::{RendererError, RendererResult};

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFaceMode {
    Off,
    Front,
    #[default]
    Back,
    FrontAndBack,
}

impl CullFaceMode {
    pub fn face(&self) -> Option<CullFace> {
        match self {
            CullFaceMode::Off => None,
            CullFaceMode::Front => Some(CullFace::Front),
            CullFaceMode::Back => Some(CullFace::Back),
            CullFaceMode::FrontAndBack => Some(CullFace::FrontAndBack),
        }
    }
}

/// Depth test function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthTest {
    Off,
    Never,
    #[default]
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

impl DepthTest {
    pub fn function(&self) -> Option<CompareFunction> {
        match self {
            DepthTest::Off => None,
            DepthTest::Never => Some(CompareFunction::Never),
            DepthTest::Less => Some(CompareFunction::Less),
            DepthTest::Equal => Some(CompareFunction::Equal),
            DepthTest::LessOrEqual => Some(CompareFunction::LessOrEqual),
            DepthTest::Greater => Some(CompareFunction::Greater),
            DepthTest::NotEqual => Some(CompareFunction::NotEqual),
            DepthTest::GreaterOrEqual => Some(CompareFunction::GreaterOrEqual),
            DepthTest::Always => Some(CompareFunction::Always),
        }
    }
}

/// Blend mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    Off,
    /// Source replaces destination
    Default,
    Additive,
    Color,
    #[default]
    Alpha,
}

impl BlendMode {
    /// Source and destination factors, `None` when blending is disabled
    pub fn factors(&self) -> Option<(BlendFactor, BlendFactor)> {
        match self {
            BlendMode::Off => None,
            BlendMode::Default => Some((BlendFactor::One, BlendFactor::Zero)),
            BlendMode::Additive => Some((BlendFactor::One, BlendFactor::One)),
            BlendMode::Color => Some((BlendFactor::One, BlendFactor::OneMinusSrcColor)),
            BlendMode::Alpha => Some((BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)),
        }
    }
}

/// Fixed-function state for a draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub cull_face: CullFaceMode,
    pub front_face: FrontFace,
    pub depth_test: DepthTest,
    pub blend: BlendMode,
    pub line_width: f32,
    pub point_size: f32,
    pub wireframe: bool,
    pub smooth_lines: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull_face: CullFaceMode::Back,
            front_face: FrontFace::Ccw,
            depth_test: DepthTest::Less,
            blend: BlendMode::Alpha,
            line_width: 1.0,
            point_size: 1.0,
            wireframe: false,
            smooth_lines: false,
        }
    }
}

impl RenderState {
    /// Reject line widths and point sizes the device cannot draw with
    pub fn validate(&self) -> RendererResult<()> {
        check_positive("render state line width", self.line_width)?;
        check_positive("render state point size", self.point_size)
    }

    /// Opaque geometry without blending
    pub fn opaque() -> Self {
        Self {
            blend: BlendMode::Off,
            ..Default::default()
        }
    }

    /// Additive blending without depth test, for overlays and particles
    pub fn additive() -> Self {
        Self {
            blend: BlendMode::Additive,
            depth_test: DepthTest::Off,
            cull_face: CullFaceMode::Off,
            ..Default::default()
        }
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_cull_face(mut self, cull_face: CullFaceMode) -> Self {
        self.cull_face = cull_face;
        self
    }

    pub fn with_depth_test(mut self, depth_test: DepthTest) -> Self {
        self.depth_test = depth_test;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

pub(crate) fn check_positive(what: &str, value: f32) -> RendererResult<()> {
    // NaN fails the comparison too
    if value > 0.0 {
        Ok(())
    } else {
        Err(RendererError::InvalidParameter(format!("{} is {}", what, value)))
    }
}
