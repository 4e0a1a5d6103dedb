//! Renderer error types

use crate::backend::{DeviceError, ElementFormat, ObjectKind, StageKind};
use crate::resources::BufferSemantic;
use thiserror::Error;

/// Errors surfaced by the resource layer and the render backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendererError {
    #[error("Failed to allocate {kind:?} for '{label}': {reason}")]
    AllocationFailure {
        kind: ObjectKind,
        label: String,
        reason: String,
    },
    #[error("Failed to compile {} stage '{label}': {log}", .stage.label())]
    CompileFailure {
        stage: StageKind,
        label: String,
        log: String,
    },
    #[error("Failed to link program '{program}': {log}")]
    LinkFailure { program: String, log: String },
    #[error("Program '{program}' has no variable named '{name}'")]
    BindingNotFound { program: String, name: String },
    #[error("{semantic:?} buffer declared as {declared:?} but payload holds {payload:?}")]
    IncompatibleFormat {
        semantic: BufferSemantic,
        declared: ElementFormat,
        payload: ElementFormat,
    },
    #[error("Invalid geometry state: {0}")]
    InvalidGeometryState(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{repository} already contains '{key}'")]
    DuplicateEntry { repository: &'static str, key: String },
    #[error("Failed to decode image: {0}")]
    Image(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type RendererResult<T> = Result<T, RendererError>;

impl From<std::io::Error> for RendererError {
    fn from(err: std::io::Error) -> Self {
        RendererError::Io(err.to_string())
    }
}

impl From<image::ImageError> for RendererError {
    fn from(err: image::ImageError) -> Self {
        RendererError::Image(err.to_string())
    }
}
