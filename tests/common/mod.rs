//! Shared setup for the renderer integration tests.

#![allow(dead_code)]

use retained_renderer::backend::{DeviceCall, DummyDevice, StageKind};
use retained_renderer::resources::{BufferSemantic, MeshResource};
use retained_renderer::shader::{ProgramResource, StageSource};
use retained_renderer::{RenderBackend, RendererConfig};

/// Install the test logger once per process.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Dummy device that knows the attribute and uniform names used by the tests.
pub fn device() -> DummyDevice {
    DummyDevice::new()
        .with_attribute("position", 0)
        .with_attribute("normal", 1)
        .with_attribute("texcoord0", 2)
        .with_uniform("mvp", 0)
        .with_uniform("tint", 1)
        .with_uniform("albedo", 2)
}

pub fn backend() -> RenderBackend<DummyDevice> {
    init_logging();
    RenderBackend::new(device(), RendererConfig::default())
}

pub fn flat_program() -> ProgramResource {
    ProgramResource::from_stages(
        "flat",
        [
            StageSource::from_string(
                StageKind::Vertex,
                "flat.vert",
                "uniform mat4 mvp; in vec3 position; void main() {}",
            ),
            StageSource::from_string(
                StageKind::Fragment,
                "flat.frag",
                "uniform vec4 tint; void main() {}",
            ),
        ],
    )
}

/// Non-indexed triangle with discrete position buffer.
pub fn triangle() -> MeshResource {
    let mut mesh = MeshResource::new("triangle");
    mesh.set_buffer(
        BufferSemantic::Vertex,
        3,
        vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    )
    .unwrap();
    mesh
}

pub fn count(backend: &RenderBackend<DummyDevice>, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
    backend.device().count_calls(predicate)
}
