//! Device object lifecycle tests: deferred deletion, shutdown, context loss
//! and hot reload.

mod common;

use std::io::Write;
use std::time::{Duration, SystemTime};

use rstest::rstest;

use common::{backend, count, device, flat_program, init_logging, triangle};
use retained_renderer::backend::{BufferTarget, DeviceCall, ObjectKind, StageKind};
use retained_renderer::renderer::RenderState;
use retained_renderer::repository::{shared, MeshRepository};
use retained_renderer::resources::{BufferSemantic, DeviceId, DeviceObject, MeshResource};
use retained_renderer::shader::{ProgramResource, StageSource};
use retained_renderer::{DummyDevice, RenderBackend, RendererConfig, RendererError};

fn draw(
    backend: &mut RenderBackend<DummyDevice>,
    mesh: &mut MeshResource,
    program: &mut ProgramResource,
) {
    backend
        .draw(mesh, program, &RenderState::default())
        .unwrap();
}

// ============================================================================
// Deferred Deletion
// ============================================================================

#[test]
fn test_dropped_owners_are_deleted_exactly_once() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut tri = triangle();
    let mut quad = MeshResource::quad();

    backend.begin_frame();
    draw(&mut backend, &mut tri, &mut program);
    draw(&mut backend, &mut quad, &mut program);
    assert_eq!(backend.end_frame(), 0);

    // two stages and a program, one triangle buffer, three quad buffers
    assert_eq!(backend.device().live_objects(), 7);
    assert_eq!(backend.tracker().len(), 7);

    drop(program);
    drop(tri);
    drop(quad);

    backend.begin_frame();
    assert_eq!(backend.end_frame(), 7);
    assert_eq!(backend.end_frame(), 0);
    assert_eq!(count(&backend, DeviceCall::is_delete), 7);
    assert_eq!(backend.device().deleted(ObjectKind::Stage).len(), 2);
    assert_eq!(backend.device().deleted(ObjectKind::Program).len(), 1);
    assert_eq!(backend.device().deleted(ObjectKind::Buffer).len(), 4);
    assert_eq!(backend.device().live_objects(), 0);
    assert!(backend.tracker().is_empty());
}

#[test]
fn test_live_owner_survives_sweep() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut kept = triangle();
    let mut dropped = MeshResource::quad();
    draw(&mut backend, &mut kept, &mut program);
    draw(&mut backend, &mut dropped, &mut program);
    drop(dropped);

    assert_eq!(backend.sweep_unreferenced(), 3);
    for buffer in [BufferTarget::Array, BufferTarget::ElementArray] {
        let bound = backend.cache().bound_buffer(buffer);
        assert!(bound.map_or(true, |h| backend.device().is_live(ObjectKind::Buffer, h)));
    }
    let handle = kept
        .buffer(BufferSemantic::Vertex)
        .unwrap()
        .device_id()
        .handle()
        .unwrap();
    assert!(backend.device().is_live(ObjectKind::Buffer, handle));
    assert!(backend.device().is_live(
        ObjectKind::Program,
        program.device_id().handle().unwrap()
    ));

    backend.device_mut().clear_calls();
    draw(&mut backend, &mut kept, &mut program);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateBuffer(_))), 0);
}

#[test]
fn test_end_frame_without_sweep() {
    init_logging();
    let config = RendererConfig {
        sweep_on_end_frame: false,
        ..Default::default()
    };
    let mut backend = RenderBackend::new(device(), config);
    let mut program = flat_program();
    let mut mesh = triangle();
    draw(&mut backend, &mut mesh, &mut program);
    drop(mesh);

    assert_eq!(backend.end_frame(), 0);
    assert_eq!(backend.sweep_unreferenced(), 1);
}

#[test]
fn test_removed_buffer_is_reclaimed_by_sweep() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut mesh = triangle();
    mesh.set_buffer(BufferSemantic::Normal, 3, vec![0.0f32; 9]).unwrap();
    draw(&mut backend, &mut mesh, &mut program);

    let normals = mesh.remove_buffer(BufferSemantic::Normal).unwrap();
    let handle = normals.device_id().handle().unwrap();
    drop(normals);

    assert_eq!(backend.end_frame(), 1);
    assert_eq!(count(&backend, |c| *c == DeviceCall::DeleteBuffer(handle)), 1);
}

// ============================================================================
// Shutdown and Context Loss
// ============================================================================

#[test]
fn test_shutdown_deletes_everything() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut mesh = triangle();
    let mut orphan = MeshResource::quad();
    draw(&mut backend, &mut mesh, &mut program);
    draw(&mut backend, &mut orphan, &mut program);
    drop(orphan);

    assert_eq!(backend.shutdown(), 7);
    assert!(backend.tracker().is_empty());
    assert_eq!(backend.device().live_objects(), 0);
    assert_eq!(program.device_id(), DeviceId::Unset);
    assert!(program.is_dirty());

    // resources still owned come back on the next draw
    draw(&mut backend, &mut mesh, &mut program);
    assert_eq!(backend.device().live_objects(), 4);
}

#[test]
fn test_context_loss_recreates_without_deleting() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut mesh = triangle();
    program.set_uniform("tint", glam::Vec4::ONE).unwrap();
    draw(&mut backend, &mut mesh, &mut program);
    let old_program = program.device_id().handle().unwrap();

    assert_eq!(backend.on_context_lost(), 4);
    assert!(backend.tracker().is_empty());
    assert!(mesh.buffer(BufferSemantic::Vertex).unwrap().is_dirty());
    backend.device_mut().clear_calls();

    draw(&mut backend, &mut mesh, &mut program);
    assert_eq!(count(&backend, DeviceCall::is_delete), 0);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateStage(..))), 2);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateBuffer(_))), 1);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::WriteUniform { slot: 1, .. })), 1);
    assert!(program.device_id().handle().unwrap() > old_program);
    assert_eq!(backend.tracker().len(), 4);
}

// ============================================================================
// Allocation Failure
// ============================================================================

#[test]
fn test_allocation_failure_is_retried() {
    let mut backend = backend();
    let mut program = flat_program();
    backend.set_program(&mut program).unwrap();
    let mut mesh = triangle();

    backend.device_mut().set_allocation_failure(true);
    let result = backend.draw(&mut mesh, &mut program, &RenderState::default());
    assert!(matches!(
        result,
        Err(RendererError::AllocationFailure {
            kind: ObjectKind::Buffer,
            ..
        })
    ));
    let buffer = mesh.buffer(BufferSemantic::Vertex).unwrap();
    assert_eq!(buffer.device_id(), DeviceId::Invalid);
    assert!(buffer.is_dirty());

    backend.device_mut().set_allocation_failure(false);
    draw(&mut backend, &mut mesh, &mut program);
    assert!(mesh
        .buffer(BufferSemantic::Vertex)
        .unwrap()
        .device_id()
        .is_allocated());
}

// ============================================================================
// Dirty Tracking
// ============================================================================

#[rstest]
#[case::unrelated_draws(false)]
#[case::after_invalidate(true)]
fn test_uploaded_objects_stay_clean(#[case] invalidate: bool) {
    let mut backend = backend();
    let mut program = flat_program();
    let mut mesh = MeshResource::cube();
    let mut other = triangle();
    draw(&mut backend, &mut mesh, &mut program);

    for _ in 0..3 {
        if invalidate {
            backend.invalidate_state();
        }
        draw(&mut backend, &mut other, &mut program);
        assert!(mesh.buffers().all(|b| !b.is_dirty()));
        assert!(!program.is_dirty());
    }

    mesh.set_buffer(BufferSemantic::Normal, 3, vec![0.0f32; 72]).unwrap();
    assert!(mesh.buffer(BufferSemantic::Normal).unwrap().is_dirty());
    assert!(!mesh.buffer(BufferSemantic::Vertex).unwrap().is_dirty());
}

#[test]
fn test_mesh_edited_on_another_thread_is_reuploaded() {
    let mut backend = backend();
    let mut program = flat_program();
    let mut meshes = MeshRepository::new();
    let mesh = meshes.insert(triangle()).unwrap();
    draw(&mut backend, &mut mesh.write(), &mut program);

    let editor = mesh.clone();
    std::thread::spawn(move || {
        editor
            .write()
            .set_buffer(BufferSemantic::Vertex, 3, vec![1.0f32; 9])
            .unwrap();
    })
    .join()
    .unwrap();

    backend.device_mut().clear_calls();
    draw(&mut backend, &mut mesh.write(), &mut program);
    assert_eq!(
        count(&backend, |c| matches!(c, DeviceCall::BufferSubData { .. })),
        1
    );
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CreateBuffer(_))), 0);
}

// ============================================================================
// Hot Reload
// ============================================================================

#[test]
fn test_stage_file_edit_relinks_program() {
    let mut backend = backend();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "void main() {{}}").unwrap();
    file.flush().unwrap();

    let vertex = StageSource::from_file(StageKind::Vertex, file.path()).unwrap();
    let fragment = StageSource::from_string(StageKind::Fragment, "flat.frag", "void main() {}");
    let program = shared(ProgramResource::from_stages("reload", [vertex, fragment]));
    let mut mesh = triangle();
    draw(&mut backend, &mut mesh, &mut program.write());
    let first = program.read().device_id().handle().unwrap();

    std::fs::write(file.path(), "void main() { gl_Position = vec4(0.0); }").unwrap();
    file.as_file()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
    let reloaded = program
        .write()
        .stage_mut(StageKind::Vertex)
        .unwrap()
        .poll_modified()
        .unwrap();
    assert!(reloaded);

    backend.device_mut().clear_calls();
    draw(&mut backend, &mut mesh, &mut program.write());
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CompileStage(_))), 1);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::LinkProgram(_))), 1);
    assert_eq!(count(&backend, |c| *c == DeviceCall::DeleteProgram(first)), 1);
    assert_eq!(count(&backend, DeviceCall::is_draw), 1);
}

#[test]
fn test_broken_edit_keeps_previous_program_drawing() {
    let mut backend = backend();
    backend.device_mut().fail_sources_containing(Some("#error"));
    let mut program = flat_program();
    let mut mesh = triangle();
    draw(&mut backend, &mut mesh, &mut program);

    program
        .stage_mut(StageKind::Fragment)
        .unwrap()
        .update_source("#error unfinished edit");
    let result = backend.draw(&mut mesh, &mut program, &RenderState::default());
    assert!(matches!(result, Err(RendererError::CompileFailure { .. })));

    // the failure is cached, so later frames keep drawing with the last good build
    backend.device_mut().clear_calls();
    draw(&mut backend, &mut mesh, &mut program);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::CompileStage(_))), 0);
    assert_eq!(count(&backend, DeviceCall::is_draw), 1);

    program
        .stage_mut(StageKind::Fragment)
        .unwrap()
        .update_source("void main() {}");
    backend.device_mut().clear_calls();
    draw(&mut backend, &mut mesh, &mut program);
    assert_eq!(count(&backend, |c| matches!(c, DeviceCall::LinkProgram(_))), 1);
}
