//! Retained Renderer - GPU resource management and render state synchronization
//!
//! CPU-side resources mirror device objects and track what changed; the
//! render backend turns a draw request into the smallest set of device calls.
//!
//! # Features
//! - Dirty-tracked buffers, textures, stage sources and programs
//! - Lazy uniform and attribute slot resolution, re-resolved after every relink
//! - Diffed render state: bindings and toggles reach the device only when they change
//! - Deferred deletion of device objects whose owners were dropped
//! - Hot reload of file-backed stage sources
//! - A call-recording dummy device for tests

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod renderer;
pub mod repository;
pub mod resources;
pub mod shader;

pub use backend::{DeviceDriver, DummyDevice, ObjectHandle};
pub use error::{RendererError, RendererResult};
pub use lifecycle::ResourceLifecycleTracker;
pub use renderer::{DeviceStateCache, RenderBackend, RenderState};
pub use repository::{MeshRepository, ProgramRepository, Shared, TextureRepository};

/// Configuration of a render backend
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of texture units the device exposes
    pub max_texture_units: u32,
    /// Prepended to semantic attribute names before slot lookup
    pub attribute_prefix: String,
    /// State the scene layer starts from
    pub default_render_state: RenderState,
    /// Delete unreferenced device objects in `end_frame`
    pub sweep_on_end_frame: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_texture_units: 80,
            attribute_prefix: String::new(),
            default_render_state: RenderState::default(),
            sweep_on_end_frame: true,
        }
    }
}

static_assertions::assert_impl_all!(resources::BufferResource: Send, Sync);
static_assertions::assert_impl_all!(resources::MeshResource: Send, Sync);
static_assertions::assert_impl_all!(resources::TextureResource: Send, Sync);
static_assertions::assert_impl_all!(shader::StageSource: Send, Sync);
static_assertions::assert_impl_all!(shader::ProgramResource: Send, Sync);
