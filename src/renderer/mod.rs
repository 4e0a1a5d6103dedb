//! Render backend
//!
//! Turns a mesh, a program and a render state into the minimal sequence of
//! device calls: build what is missing, upload what is dirty, bind what
//! changed, draw. Device objects are released through the lifecycle tracker
//! at frame boundaries or explicitly through the `delete_*` methods.
//!
//! Upload and bind logic is split by resource type:
//! - `buffers.rs`: vertex/index buffers and meshes
//! - `programs.rs`: stage compilation, linking and uniforms
//! - `textures.rs`: texture upload and unit binding

mod buffers;
mod programs;
mod render_state;
mod state_cache;
mod textures;

pub use render_state::*;
pub use state_cache::*;

use render_state::check_positive;

use crate::backend::{BufferTarget, DeviceDriver, DeviceError, ObjectHandle, ObjectKind, Rect};
use crate::error::{RendererError, RendererResult};
use crate::lifecycle::ResourceLifecycleTracker;
use crate::resources::{BufferSemantic, DeviceId, DeviceObject, MeshResource};
use crate::shader::{ProgramResource, SlotState};
use crate::RendererConfig;

/// Orchestrates device object creation, uploads, state diffing and draws
///
/// Owns the device; must live on the thread that owns the device context.
pub struct RenderBackend<D: DeviceDriver> {
    device: D,
    cache: DeviceStateCache,
    tracker: ResourceLifecycleTracker,
    config: RendererConfig,
    frame: u64,
}

impl<D: DeviceDriver> RenderBackend<D> {
    pub fn new(device: D, config: RendererConfig) -> Self {
        log::info!(
            "Render backend created on {} ({} texture units)",
            device.name(),
            config.max_texture_units
        );
        Self {
            cache: DeviceStateCache::new(config.max_texture_units),
            tracker: ResourceLifecycleTracker::new(),
            device,
            config,
            frame: 0,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn cache(&self) -> &DeviceStateCache {
        &self.cache
    }

    pub fn tracker(&self) -> &ResourceLifecycleTracker {
        &self.tracker
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Number of frames begun so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // ========================================================================
    // Frame boundaries and context lifecycle
    // ========================================================================

    pub fn begin_frame(&mut self) {
        self.frame += 1;
        log::trace!("Begin frame {}", self.frame);
    }

    /// Finish the frame; reclaims unreferenced objects when configured to
    pub fn end_frame(&mut self) -> usize {
        if self.config.sweep_on_end_frame {
            self.sweep_unreferenced()
        } else {
            0
        }
    }

    /// Delete device objects whose owners were dropped
    pub fn sweep_unreferenced(&mut self) -> usize {
        let cache = &mut self.cache;
        self.tracker
            .sweep_unreferenced_with(&mut self.device, |kind, handle| cache.forget(kind, handle))
    }

    /// Release every device object; live resources will allocate again on next use
    pub fn shutdown(&mut self) -> usize {
        log::info!("Shutting down render backend after {} frames", self.frame);
        self.cache.invalidate();
        self.tracker.delete_all(&mut self.device)
    }

    /// Forget all device state after the context was lost
    ///
    /// Nothing is deleted; every tracked resource is re-created on next use.
    pub fn on_context_lost(&mut self) -> usize {
        log::warn!("Device context lost, resetting device objects");
        self.cache.invalidate();
        self.tracker.reset_all()
    }

    /// Forget cached device state after something else changed it
    pub fn invalidate_state(&mut self) {
        self.cache.invalidate();
    }

    // ========================================================================
    // Fixed-function state
    // ========================================================================

    /// Apply the aspects of `state` that differ from the device; returns the calls issued
    pub fn apply_render_state(&mut self, state: &RenderState) -> RendererResult<usize> {
        state.validate()?;
        Ok(self.cache.apply(&mut self.device, state))
    }

    /// Apply the configured default render state
    pub fn apply_default_render_state(&mut self) -> RendererResult<usize> {
        let state = self.config.default_render_state;
        self.apply_render_state(&state)
    }

    pub fn set_viewport(&mut self, rect: Rect) -> bool {
        self.cache.set_viewport(&mut self.device, rect)
    }

    /// Restrict drawing to `rect`
    pub fn set_clip_rect(&mut self, rect: Rect) -> usize {
        self.cache.set_scissor(&mut self.device, Some(rect))
    }

    pub fn clear_clip_rect(&mut self) -> usize {
        self.cache.set_scissor(&mut self.device, None)
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Draw `mesh` with `program` under `state`
    ///
    /// A program that fails to build or an invalid state aborts the draw
    /// before any state is touched. Meshes without vertices are skipped.
    pub fn draw(
        &mut self,
        mesh: &mut MeshResource,
        program: &mut ProgramResource,
        state: &RenderState,
    ) -> RendererResult<()> {
        state.validate()?;
        self.ensure_program(program)?;
        validate_mesh(mesh)?;
        self.upload_mesh(mesh)?;
        self.apply_render_state(state)?;
        self.bind_program(program)?;
        self.draw_mesh(mesh, program)
    }

    /// Draw `mesh` with the already bound `program`
    pub fn draw_mesh(
        &mut self,
        mesh: &mut MeshResource,
        program: &mut ProgramResource,
    ) -> RendererResult<()> {
        let Some(handle) = program.device_id().handle() else {
            return Err(RendererError::InvalidGeometryState(format!(
                "{} is not linked",
                program.label()
            )));
        };
        if self.cache.bound_program() != Some(handle) {
            return Err(RendererError::InvalidGeometryState(format!(
                "{} is not bound",
                program.label()
            )));
        }
        if mesh.vertex_count() == 0 {
            log::trace!("Skipping mesh '{}' without vertices", mesh.name());
            return Ok(());
        }
        validate_mesh(mesh)?;

        self.cache.set_line_width(&mut self.device, mesh.line_width());
        self.cache.set_point_size(&mut self.device, mesh.point_size());

        let mut enabled = Vec::new();
        let result = self.bind_and_draw(mesh, program, handle, &mut enabled);
        for slot in enabled {
            self.device.disable_attribute(slot);
        }
        result
    }

    fn bind_and_draw(
        &mut self,
        mesh: &mut MeshResource,
        program: &mut ProgramResource,
        program_handle: ObjectHandle,
        enabled: &mut Vec<u32>,
    ) -> RendererResult<()> {
        let interleaved = match mesh.buffer_mut(BufferSemantic::Interleaved) {
            Some(buffer) => {
                self.upload_buffer(buffer)?;
                buffer.device_id().handle()
            }
            None => None,
        };

        for semantic in mesh.attribute_semantics() {
            let Some(slot) = self.resolve_attribute(program, program_handle, semantic) else {
                continue;
            };
            let Some(buffer) = mesh.buffer_mut(semantic) else {
                continue;
            };
            let source = if buffer.is_view() {
                interleaved
            } else {
                self.upload_buffer(buffer)?;
                buffer.device_id().handle()
            };
            let Some(source) = source else {
                log::warn!("{:?} attribute has no buffer to read from", semantic);
                continue;
            };

            self.cache
                .bind_buffer(&mut self.device, BufferTarget::Array, Some(source));
            self.device.enable_attribute(slot);
            self.device.attribute_pointer(slot, buffer.layout());
            enabled.push(slot);
        }

        let topology = mesh.topology();
        let count = mesh.vertex_count();
        match mesh.buffer_mut(BufferSemantic::Index) {
            Some(index) => {
                self.upload_buffer(index)?;
                self.cache.bind_buffer(
                    &mut self.device,
                    BufferTarget::ElementArray,
                    index.device_id().handle(),
                );
                self.device.draw_elements(topology, count, index.layout().format);
            }
            None => self.device.draw_arrays(topology, 0, count),
        }
        Ok(())
    }

    fn resolve_attribute(
        &mut self,
        program: &mut ProgramResource,
        program_handle: ObjectHandle,
        semantic: BufferSemantic,
    ) -> Option<u32> {
        let prefix = &self.config.attribute_prefix;
        let device = &mut self.device;
        let binding = program.attribute(semantic);
        let first_lookup = binding.slot() == SlotState::Unknown;
        let state = binding.resolve_with(|name| {
            device.attribute_location(program_handle, &format!("{}{}", prefix, name))
        });

        if state == SlotState::NotFound && first_lookup {
            let name = binding.name().to_string();
            log::warn!(
                "{}",
                RendererError::BindingNotFound {
                    program: program.name().to_string(),
                    name,
                }
            );
        }
        state.slot()
    }

    // ========================================================================
    // Allocation helpers
    // ========================================================================

    /// Allocate a device object for `object` and start tracking it
    fn allocate(
        &mut self,
        object: &dyn DeviceObject,
        create: impl FnOnce(&mut D) -> Result<ObjectHandle, DeviceError>,
    ) -> RendererResult<ObjectHandle> {
        match create(&mut self.device) {
            Ok(handle) => {
                object.cell().set_id(DeviceId::Allocated(handle));
                self.tracker.register(object);
                Ok(handle)
            }
            Err(err) => {
                object.cell().set_id(DeviceId::Invalid);
                Err(allocation_failure(object, err))
            }
        }
    }

    /// Delete a device object now and stop tracking it
    fn release(&mut self, kind: ObjectKind, handle: ObjectHandle) {
        self.cache.forget(kind, handle);
        self.tracker.unregister(kind, handle);
        self.device.delete_object(kind, handle);
    }
}

fn allocation_failure(object: &dyn DeviceObject, err: DeviceError) -> RendererError {
    let label = object.label();
    log::error!("Failed to allocate {}: {}", label, err);
    RendererError::AllocationFailure {
        kind: object.kind(),
        label,
        reason: err.to_string(),
    }
}

fn validate_mesh(mesh: &MeshResource) -> RendererResult<()> {
    check_positive(&format!("mesh '{}' line width", mesh.name()), mesh.line_width())?;
    check_positive(&format!("mesh '{}' point size", mesh.name()), mesh.point_size())
}
