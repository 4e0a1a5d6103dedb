//! Draw orchestration tests against the call-recording dummy device.
//!
//! Every test drives the public [`RenderBackend`] API and inspects the device
//! calls it produced.

mod common;

use rstest::rstest;

use common::{backend, count, flat_program, triangle};
use retained_renderer::backend::{
    AttributeLayout, BufferTarget, Capability, CompareFunction, DeviceCall, DummyDevice,
    ElementFormat, PrimitiveTopology, Rect, UniformValue,
};
use retained_renderer::renderer::{BlendMode, DepthTest, RenderState};
use retained_renderer::repository::shared;
use retained_renderer::resources::{
    BufferSemantic, DeviceObject, MeshResource, TextureData, TextureResource,
};
use retained_renderer::shader::SlotState;
use retained_renderer::{RenderBackend, RendererError};

// ============================================================================
// Basic Draws
// ============================================================================

#[test]
fn test_draw_triangle() {
    let mut backend = backend();
    let mut mesh = triangle();
    let mut program = flat_program();

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();

    assert_eq!(
        count(&backend, |c| *c
            == DeviceCall::DrawArrays {
                topology: PrimitiveTopology::Triangles,
                first: 0,
                count: 3,
            }),
        1
    );
    assert_eq!(count(&backend, |c| *c == DeviceCall::EnableAttribute(0)), 1);
    assert_eq!(count(&backend, |c| *c == DeviceCall::DisableAttribute(0)), 1);
    assert!(!mesh.buffer(BufferSemantic::Vertex).unwrap().is_dirty());
    assert!(!program.is_dirty());
}

#[test]
fn test_repeated_draw_only_binds_attributes() {
    let mut backend = backend();
    let mut mesh = triangle();
    let mut program = flat_program();
    let state = RenderState::default();
    backend.draw(&mut mesh, &mut program, &state).unwrap();
    backend.device_mut().clear_calls();

    backend.draw(&mut mesh, &mut program, &state).unwrap();

    let layout = AttributeLayout::packed(3, ElementFormat::Float);
    assert_eq!(
        backend.device().calls(),
        &[
            DeviceCall::EnableAttribute(0),
            DeviceCall::AttributePointer { slot: 0, layout },
            DeviceCall::DrawArrays {
                topology: PrimitiveTopology::Triangles,
                first: 0,
                count: 3,
            },
            DeviceCall::DisableAttribute(0),
        ]
    );
}

#[test]
fn test_indexed_quad_draws_elements() {
    let mut backend = backend();
    let mut mesh = MeshResource::quad();
    let mut program = flat_program();

    backend
        .draw(&mut mesh, &mut program, &RenderState::opaque())
        .unwrap();

    assert_eq!(
        count(&backend, |c| *c
            == DeviceCall::DrawElements {
                topology: PrimitiveTopology::Triangles,
                count: 6,
                format: ElementFormat::UnsignedInt,
            }),
        1
    );
    assert_eq!(
        backend.cache().bound_buffer(BufferTarget::ElementArray),
        mesh.buffer(BufferSemantic::Index).unwrap().device_id().handle()
    );
    // position and texcoord0 enabled, then both disabled again
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::EnableAttribute(_))), 2);
    assert_eq!(count(&backend, |c| *c == DeviceCall::DisableAttribute(0)), 1);
    assert_eq!(count(&backend, |c| *c == DeviceCall::DisableAttribute(2)), 1);
}

#[test]
fn test_interleaved_mesh_shares_one_buffer() {
    let mut backend = backend();
    let mut mesh = MeshResource::new("interleaved");
    #[rustfmt::skip]
    let vertices: Vec<f32> = vec![
        0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
    ];
    mesh.set_interleaved(vertices, 24).unwrap();
    mesh.set_pointer(BufferSemantic::Vertex, 3, ElementFormat::Float, 24, 0, false)
        .unwrap();
    mesh.set_pointer(BufferSemantic::Normal, 3, ElementFormat::Float, 24, 12, false)
        .unwrap();
    assert_eq!(mesh.vertex_count(), 3);

    let mut program = flat_program();
    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();

    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateBuffer(_))), 1);
    assert_eq!(
        count(&backend, |c| matches!(
            c,
            DeviceCall::AttributePointer {
                slot: 1,
                layout: AttributeLayout { offset: 12, stride: 24, .. },
            }
        )),
        1
    );
    assert_eq!(
        count(&backend, |c| matches!(c, DeviceCall::BindBuffer(BufferTarget::Array, _))),
        1
    );
}

#[test]
fn test_empty_mesh_is_not_drawn() {
    let mut backend = backend();
    let mut mesh = MeshResource::new("empty");
    let mut program = flat_program();

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();
    assert_eq!(count(&backend, DeviceCall::is_draw), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_link_failure_leaves_state_untouched() {
    let mut backend = backend();
    backend.device_mut().set_link_failure(true);
    let mut mesh = triangle();
    let mut program = flat_program();

    let result = backend.draw(&mut mesh, &mut program, &RenderState::default());
    assert!(matches!(result, Err(RendererError::LinkFailure { .. })));

    assert_eq!(count(&backend, DeviceCall::is_draw), 0);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::SetCapability(..))), 0);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::BufferData { .. })), 0);
    assert_eq!(backend.cache().bound_program(), None);
    assert_eq!(backend.cache().capability(Capability::DepthTest), None);
}

#[test]
fn test_failed_mesh_does_not_block_others() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut broken = triangle();
    broken.set_line_width(0.0);
    let mut good = triangle();

    assert!(matches!(
        backend.draw(&mut broken, &mut program, &RenderState::default()),
        Err(RendererError::InvalidParameter(_))
    ));
    backend
        .draw(&mut good, &mut program, &RenderState::default())
        .unwrap();
    assert_eq!(count(&backend, DeviceCall::is_draw), 1);
}

#[test]
fn test_draw_mesh_requires_bound_program() {
    let mut backend = backend();
    let mut mesh = triangle();
    let mut program = flat_program();
    backend.ensure_program(&mut program).unwrap();

    assert!(matches!(
        backend.draw_mesh(&mut mesh, &mut program),
        Err(RendererError::InvalidGeometryState(_))
    ));
}

#[test]
fn test_incompatible_payload_never_reaches_device() {
    let mut backend = backend();
    let mut mesh = triangle();
    let result =
        mesh.set_buffer_with_format(BufferSemantic::Color, 4, ElementFormat::Int, vec![1.0f32; 12]);

    assert!(matches!(result, Err(RendererError::IncompatibleFormat { .. })));
    assert!(mesh.buffer(BufferSemantic::Color).is_none());

    let mut program = flat_program();
    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateBuffer(_))), 1);
}

#[test]
fn test_missing_attribute_is_skipped_and_looked_up_once() {
    let mut backend = backend();
    let mut mesh = triangle();
    mesh.set_buffer(BufferSemantic::Color, 4, vec![1.0f32; 12]).unwrap();
    let mut program = flat_program();

    for _ in 0..3 {
        backend
            .draw(&mut mesh, &mut program, &RenderState::default())
            .unwrap();
    }

    assert_eq!(
        count(&backend, |c| matches!(
            c,
            DeviceCall::AttributeLocation { name, .. } if name == "color"
        )),
        1
    );
    assert_eq!(
        program.find_attribute(BufferSemantic::Color).unwrap().slot(),
        SlotState::NotFound
    );
    assert_eq!(count(&backend, DeviceCall::is_draw), 3);
}

#[test]
fn test_renamed_attribute_is_looked_up_by_new_name() {
    let mut backend = backend();
    let mut mesh = triangle();
    mesh.set_buffer(BufferSemantic::Color, 4, vec![1.0f32; 12]).unwrap();
    let mut program = flat_program();
    program.set_attribute_name(BufferSemantic::Color, "normal");

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();

    assert_eq!(
        program.find_attribute(BufferSemantic::Color).unwrap().slot(),
        SlotState::Resolved(1)
    );
    assert_eq!(count(&backend, |c| *c == DeviceCall::EnableAttribute(1)), 1);
    assert_eq!(
        count(&backend, |c| matches!(
            c,
            DeviceCall::AttributeLocation { name, .. } if name == "color"
        )),
        0
    );
}

// ============================================================================
// Uniforms and Samplers
// ============================================================================

#[test]
fn test_uniform_resolves_after_link() {
    let mut backend = backend();
    let mut program = flat_program();
    assert_eq!(program.uniform("mvp").slot(), SlotState::Unknown);

    program.set_uniform("mvp", glam::Mat4::IDENTITY).unwrap();
    backend.set_program(&mut program).unwrap();

    assert_eq!(program.uniform("mvp").slot(), SlotState::Resolved(0));
    assert!(!program.uniform("mvp").is_dirty());
}

#[test]
fn test_uniform_written_only_when_changed() {
    let mut backend = backend();
    let mut mesh = triangle();
    let mut program = flat_program();
    let state = RenderState::default();
    let tint_writes = |backend: &RenderBackend<DummyDevice>| {
        count(backend, |c| matches!(c, DeviceCall::WriteUniform { slot: 1, .. }))
    };

    program.set_uniform("tint", glam::Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    backend.draw(&mut mesh, &mut program, &state).unwrap();
    backend.draw(&mut mesh, &mut program, &state).unwrap();
    assert_eq!(tint_writes(&backend), 1);

    program.set_uniform("tint", glam::Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    backend.draw(&mut mesh, &mut program, &state).unwrap();
    assert_eq!(tint_writes(&backend), 1);

    program.set_uniform("tint", glam::Vec4::ONE).unwrap();
    backend.draw(&mut mesh, &mut program, &state).unwrap();
    assert_eq!(tint_writes(&backend), 2);
}

#[test]
fn test_sampler_binds_texture_and_unit_uniform() {
    let mut backend = backend();
    let mut mesh = MeshResource::quad();
    let mut program = flat_program();
    let texture = shared(TextureResource::new(TextureData::solid_color([255; 4], "white")));
    program.bind_sampler("albedo", 1, texture.clone());

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();

    let handle = texture.read().device_id().handle();
    assert_eq!(backend.cache().bound_texture(1), handle);
    assert_eq!(
        count(&backend, |c| *c
            == DeviceCall::WriteUniform {
                slot: 2,
                value: UniformValue::Int(1),
            }),
        1
    );

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::UploadTexture { .. })), 1);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::BindTexture { .. })), 1);
}

// ============================================================================
// Render State
// ============================================================================

#[test]
fn test_state_change_issues_only_the_difference() {
    let mut backend = backend();
    let state = RenderState::default();
    assert!(backend.apply_render_state(&state).unwrap() > 0);
    assert_eq!(backend.apply_render_state(&state).unwrap(), 0);

    backend.device_mut().clear_calls();
    let greater = state.with_depth_test(DepthTest::Greater);
    assert_eq!(backend.apply_render_state(&greater).unwrap(), 1);
    assert_eq!(
        backend.device().calls(),
        &[DeviceCall::DepthFunc(CompareFunction::Greater)]
    );

    assert_eq!(backend.apply_render_state(&greater.with_blend(BlendMode::Off)).unwrap(), 1);
}

#[test]
fn test_invalidate_reissues_everything() {
    let mut backend = backend();
    let state = RenderState::default();
    let first = backend.apply_render_state(&state).unwrap();
    backend.invalidate_state();
    assert_eq!(backend.apply_render_state(&state).unwrap(), first);
}

#[test]
fn test_default_render_state_from_config() {
    let mut backend = backend();
    assert!(backend.apply_default_render_state().unwrap() > 0);
    assert_eq!(backend.apply_render_state(&RenderState::default()).unwrap(), 0);
}

#[test]
fn test_clip_rect() {
    let mut backend = backend();
    let rect = Rect::new(0, 0, 320, 240);
    assert_eq!(backend.set_clip_rect(rect), 2);
    assert_eq!(backend.set_clip_rect(rect), 0);
    assert_eq!(backend.clear_clip_rect(), 1);
    assert_eq!(backend.cache().scissor(), None);
    assert_eq!(backend.set_clip_rect(rect), 2);

    assert!(backend.set_viewport(rect));
    assert!(!backend.set_viewport(rect));
}

// ============================================================================
// Counts per Topology
// ============================================================================

#[rstest]
#[case::points(PrimitiveTopology::Points, 300)]
#[case::lines(PrimitiveTopology::Lines, 150)]
#[case::line_strip(PrimitiveTopology::LineStrip, 299)]
#[case::line_loop(PrimitiveTopology::LineLoop, 300)]
#[case::triangles(PrimitiveTopology::Triangles, 100)]
#[case::triangle_strip(PrimitiveTopology::TriangleStrip, 298)]
#[case::triangle_fan(PrimitiveTopology::TriangleFan, 298)]
#[case::quads(PrimitiveTopology::Quads, 75)]
#[case::quad_strip(PrimitiveTopology::QuadStrip, 75)]
fn test_element_count_per_topology(#[case] topology: PrimitiveTopology, #[case] expected: u32) {
    let mut mesh = MeshResource::new("indexed");
    mesh.set_buffer(BufferSemantic::Vertex, 3, vec![0.0f32; 900]).unwrap();
    mesh.set_buffer(BufferSemantic::Index, 1, (0..300u32).collect::<Vec<_>>())
        .unwrap();
    mesh.set_topology(topology);

    assert_eq!(mesh.vertex_count(), 300);
    assert_eq!(mesh.element_count(), expected);
}

#[rstest]
#[case::triangles(PrimitiveTopology::Triangles)]
#[case::lines(PrimitiveTopology::Lines)]
#[case::points(PrimitiveTopology::Points)]
fn test_draw_uses_vertex_count(#[case] topology: PrimitiveTopology) {
    let mut backend = backend();
    let mut mesh = MeshResource::new("strip");
    mesh.set_buffer(BufferSemantic::Vertex, 3, vec![0.0f32; 12]).unwrap();
    mesh.set_topology(topology);
    let mut program = flat_program();

    backend
        .draw(&mut mesh, &mut program, &RenderState::default())
        .unwrap();
    assert_eq!(
        count(&backend, |c| *c
            == DeviceCall::DrawArrays {
                topology,
                first: 0,
                count: 4,
            }),
        1
    );
}

#[rstest]
#[case::zero_line_width(0.0, 1.0)]
#[case::nan_line_width(f32::NAN, 1.0)]
#[case::negative_point_size(1.0, -2.0)]
#[case::nan_point_size(1.0, f32::NAN)]
fn test_invalid_widths_never_reach_the_device(#[case] line_width: f32, #[case] point_size: f32) {
    let mut backend = backend();
    let mut program = flat_program();

    let mut mesh = triangle();
    mesh.set_line_width(line_width);
    mesh.set_point_size(point_size);
    let result = backend.draw(&mut mesh, &mut program, &RenderState::default());
    assert!(matches!(result, Err(RendererError::InvalidParameter(_))));

    let state = RenderState {
        line_width,
        point_size,
        ..Default::default()
    };
    backend.device_mut().clear_calls();
    let result = backend.draw(&mut triangle(), &mut program, &state);
    assert!(matches!(result, Err(RendererError::InvalidParameter(_))));
    assert!(matches!(
        backend.apply_render_state(&state),
        Err(RendererError::InvalidParameter(_))
    ));
    assert_eq!(backend.device().call_count(), 0);
}
