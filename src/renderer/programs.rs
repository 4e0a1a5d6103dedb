//! Program compilation, linking and variable uploads

use crate::backend::{DeviceDriver, DeviceError, ObjectHandle, ObjectKind, UniformValue};
use crate::error::{RendererError, RendererResult};
use crate::resources::{DeviceId, DeviceObject};
use crate::shader::{ProgramResource, SlotState, StageSource};

use super::{allocation_failure, RenderBackend};

impl<D: DeviceDriver> RenderBackend<D> {
    /// Build `program` if needed and make it current
    pub fn set_program(&mut self, program: &mut ProgramResource) -> RendererResult<()> {
        self.ensure_program(program)?;
        self.bind_program(program)
    }

    /// Compile dirty stages and relink `program` when it needs it
    ///
    /// A build that already failed for the current sources is not retried. If
    /// an earlier build linked, that program keeps serving draws until the
    /// sources change.
    pub fn ensure_program(&mut self, program: &mut ProgramResource) -> RendererResult<()> {
        if !program.is_dirty() {
            return Ok(());
        }
        let cached = program.has_cached_failure();
        match self.build_program(program) {
            Ok(()) => Ok(()),
            Err(err) if cached && program.device_id().is_allocated() => {
                log::trace!("Using previous build of {}: {}", program.label(), err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Delete `program` and its stages from the device now
    pub fn delete_program(&mut self, program: &mut ProgramResource) {
        for stage in program.stages_mut() {
            if let Some(handle) = stage.device_id().handle() {
                self.release(ObjectKind::Stage, handle);
            }
        }
        if let Some(handle) = program.device_id().handle() {
            self.release(ObjectKind::Program, handle);
        }
        program.reset_object();
    }

    /// Make `program` current and write its samplers and dirty uniforms
    pub(super) fn bind_program(&mut self, program: &mut ProgramResource) -> RendererResult<()> {
        let Some(handle) = program.device_id().handle() else {
            return Err(RendererError::InvalidGeometryState(format!(
                "{} has never linked",
                program.label()
            )));
        };
        self.cache.bind_program(&mut self.device, Some(handle));

        for sampler in program.samplers().to_vec() {
            self.set_texture(sampler.unit, &mut sampler.texture.write())?;
            program.set_uniform(&sampler.uniform, UniformValue::Int(sampler.unit as i32))?;
        }
        self.upload_uniforms(program, handle);
        Ok(())
    }

    fn upload_uniforms(&mut self, program: &mut ProgramResource, handle: ObjectHandle) {
        let mut missing = Vec::new();
        for binding in program.uniforms_mut() {
            if !binding.is_dirty() {
                continue;
            }
            let first_lookup = binding.slot() == SlotState::Unknown;
            let device = &mut self.device;
            let state = binding.resolve_with(|name| device.uniform_location(handle, name));
            match (state, binding.value()) {
                (SlotState::Resolved(slot), Some(value)) => self.device.write_uniform(slot, value),
                (SlotState::NotFound, _) if first_lookup => missing.push(binding.name().to_string()),
                _ => {}
            }
            binding.clear_dirty();
        }

        for name in missing {
            log::warn!(
                "{}",
                RendererError::BindingNotFound {
                    program: program.name().to_string(),
                    name,
                }
            );
        }
    }

    fn build_program(&mut self, program: &mut ProgramResource) -> RendererResult<()> {
        if program.stages().is_empty() {
            return Err(RendererError::InvalidParameter(format!(
                "{} has no stages",
                program.label()
            )));
        }
        for stage in program.stages_mut() {
            if stage.is_dirty() {
                self.compile_stage(stage)?;
            }
        }
        if let Some(log) = program.link_failure() {
            return Err(RendererError::LinkFailure {
                program: program.name().to_string(),
                log: log.to_string(),
            });
        }
        self.link_program(program)
    }

    fn compile_stage(&mut self, stage: &mut StageSource) -> RendererResult<()> {
        if let Some(log) = stage.compile_failure() {
            return Err(compile_failure(stage, log.to_string()));
        }
        let handle = match stage.device_id().handle() {
            Some(handle) => handle,
            None => {
                let kind = stage.kind();
                self.allocate(&*stage, |device| device.create_stage(kind))?
            }
        };

        match self.device.compile_stage(handle, stage.text()) {
            Ok(()) => {
                log::debug!("Compiled {}", stage.label());
                stage.mark_compiled();
                Ok(())
            }
            Err(err) => {
                let log = diagnostic(err);
                log::error!("Failed to compile {}: {}", stage.label(), log);
                stage.record_failure(log.clone());
                Err(compile_failure(stage, log))
            }
        }
    }

    /// Link the compiled stages into a fresh program object
    ///
    /// The previous object is replaced only when the link succeeds.
    fn link_program(&mut self, program: &mut ProgramResource) -> RendererResult<()> {
        let stages: Vec<ObjectHandle> = program
            .stages()
            .iter()
            .filter_map(|stage| stage.device_id().handle())
            .collect();

        let linked = match self.device.create_program() {
            Ok(handle) => handle,
            Err(err) => {
                if !program.device_id().is_allocated() {
                    program.cell().set_id(DeviceId::Invalid);
                }
                return Err(allocation_failure(&*program, err));
            }
        };

        for &stage in &stages {
            self.device.attach_stage(linked, stage);
        }
        let result = self.device.link_program(linked);
        for &stage in &stages {
            self.device.detach_stage(linked, stage);
        }

        match result {
            Ok(()) => {
                if let Some(previous) = program.device_id().handle() {
                    self.release(ObjectKind::Program, previous);
                }
                program.cell().set_id(DeviceId::Allocated(linked));
                self.tracker.register(&*program);
                program.mark_linked();
                log::debug!("Linked {} as {:?}", program.label(), linked);
                Ok(())
            }
            Err(err) => {
                self.device.delete_program(linked);
                let log = diagnostic(err);
                log::error!("Failed to link {}: {}", program.label(), log);
                program.record_link_failure(log.clone());
                Err(RendererError::LinkFailure {
                    program: program.name().to_string(),
                    log,
                })
            }
        }
    }
}

fn compile_failure(stage: &StageSource, log: String) -> RendererError {
    RendererError::CompileFailure {
        stage: stage.kind(),
        label: stage.name().to_string(),
        log,
    }
}

/// Driver log text without the error prefix
fn diagnostic(err: DeviceError) -> String {
    match err {
        DeviceError::CompileFailed(log) | DeviceError::LinkFailed(log) => log,
        other => other.to_string(),
    }
}
