//! Linked programs and their variable bindings

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::backend::{ObjectKind, StageKind, UniformValue};
use crate::error::RendererResult;
use crate::repository::Shared;
use crate::resources::{BufferSemantic, DeviceCell, DeviceObject, TextureResource};

use super::source::StageSource;
use super::variable::VariableBinding;

/// Link state of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStatus {
    /// Needs (re)linking
    Dirty,
    Linked,
    LinkFailed,
}

/// A texture sampled through a uniform
#[derive(Debug, Clone)]
pub struct SamplerBinding {
    pub uniform: String,
    pub unit: u32,
    pub texture: Shared<TextureResource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkFailure {
    generations: Vec<u64>,
    log: String,
}

/// Stage sources linked into one device program plus the variables it exposes
///
/// The program needs relinking whenever one of its stages needs compiling;
/// that is read from the stages, never stored here.
pub struct ProgramResource {
    cell: Arc<DeviceCell>,
    name: String,
    stages: Vec<StageSource>,
    uniforms: HashMap<String, VariableBinding>,
    attributes: BTreeMap<BufferSemantic, VariableBinding>,
    samplers: Vec<SamplerBinding>,
    stages_changed: bool,
    status: ProgramStatus,
    link_failure: Option<LinkFailure>,
}

impl ProgramResource {
    pub fn new(name: &str) -> Self {
        Self {
            cell: DeviceCell::new(),
            name: name.to_string(),
            stages: Vec::new(),
            uniforms: HashMap::new(),
            attributes: BTreeMap::new(),
            samplers: Vec::new(),
            stages_changed: false,
            status: ProgramStatus::Dirty,
            link_failure: None,
        }
    }

    pub fn from_stages(name: &str, stages: impl IntoIterator<Item = StageSource>) -> Self {
        let mut program = Self::new(name);
        for stage in stages {
            program.attach(stage);
        }
        program
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a stage, replacing and returning any stage of the same kind
    pub fn attach(&mut self, mut stage: StageSource) -> Option<StageSource> {
        stage.set_attached(true);
        self.stages_changed = true;
        self.link_failure = None;
        match self.stages.iter().position(|s| s.kind() == stage.kind()) {
            Some(index) => {
                let mut previous = std::mem::replace(&mut self.stages[index], stage);
                previous.set_attached(false);
                Some(previous)
            }
            None => {
                self.stages.push(stage);
                None
            }
        }
    }

    /// Detach the stage of the given kind
    pub fn detach(&mut self, kind: StageKind) -> Option<StageSource> {
        let index = self.stages.iter().position(|s| s.kind() == kind)?;
        let mut stage = self.stages.remove(index);
        stage.set_attached(false);
        self.stages_changed = true;
        self.link_failure = None;
        Some(stage)
    }

    pub fn stages(&self) -> &[StageSource] {
        &self.stages
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageSource> {
        self.stages.iter().find(|s| s.kind() == kind)
    }

    pub fn stage_mut(&mut self, kind: StageKind) -> Option<&mut StageSource> {
        self.stages.iter_mut().find(|s| s.kind() == kind)
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [StageSource] {
        &mut self.stages
    }

    /// Uniform binding by name, created on first access
    pub fn uniform(&mut self, name: &str) -> &mut VariableBinding {
        self.uniforms
            .entry(name.to_string())
            .or_insert_with(|| VariableBinding::uniform(name))
    }

    pub fn find_uniform(&self, name: &str) -> Option<&VariableBinding> {
        self.uniforms.get(name)
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> RendererResult<()> {
        self.uniform(name).set_value(value)
    }

    pub(crate) fn uniforms_mut(&mut self) -> impl Iterator<Item = &mut VariableBinding> {
        self.uniforms.values_mut()
    }

    /// Attribute binding by buffer semantic, created on first access
    pub fn attribute(&mut self, semantic: BufferSemantic) -> &mut VariableBinding {
        self.attributes
            .entry(semantic)
            .or_insert_with(|| VariableBinding::attribute(semantic))
    }

    /// Look `semantic` up under `name` instead of its default attribute name
    pub fn set_attribute_name(&mut self, semantic: BufferSemantic, name: &str) {
        self.attribute(semantic).set_name(name);
    }

    pub fn find_attribute(&self, semantic: BufferSemantic) -> Option<&VariableBinding> {
        self.attributes.get(&semantic)
    }

    /// Sample `texture` on `unit` through the sampler uniform `uniform`
    pub fn bind_sampler(&mut self, uniform: &str, unit: u32, texture: Shared<TextureResource>) {
        self.samplers.retain(|s| s.uniform != uniform);
        self.samplers.push(SamplerBinding {
            uniform: uniform.to_string(),
            unit,
            texture,
        });
    }

    pub fn samplers(&self) -> &[SamplerBinding] {
        &self.samplers
    }

    pub fn status(&self) -> ProgramStatus {
        if self.status == ProgramStatus::Linked && self.is_dirty() {
            ProgramStatus::Dirty
        } else {
            self.status
        }
    }

    /// Diagnostic of a failed link of the current stages, if any
    pub fn link_failure(&self) -> Option<&str> {
        self.link_failure
            .as_ref()
            .filter(|failure| failure.generations == self.generations())
            .map(|failure| failure.log.as_str())
    }

    /// Whether the current stage generations already failed to build
    pub fn has_cached_failure(&self) -> bool {
        self.link_failure().is_some() || self.stages.iter().any(|s| s.compile_failure().is_some())
    }

    fn generations(&self) -> Vec<u64> {
        self.stages.iter().map(StageSource::generation).collect()
    }

    pub(crate) fn mark_linked(&mut self) {
        self.cell.clear_dirty();
        self.stages_changed = false;
        self.status = ProgramStatus::Linked;
        self.link_failure = None;
        for binding in self.uniforms.values_mut() {
            binding.reset_slot();
        }
        for binding in self.attributes.values_mut() {
            binding.reset_slot();
        }
    }

    pub(crate) fn record_link_failure(&mut self, log: String) {
        self.cell.mark_dirty();
        self.status = ProgramStatus::LinkFailed;
        self.link_failure = Some(LinkFailure {
            generations: self.generations(),
            log,
        });
    }
}

impl DeviceObject for ProgramResource {
    fn cell(&self) -> &Arc<DeviceCell> {
        &self.cell
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Program
    }

    fn label(&self) -> String {
        format!("program '{}'", self.name)
    }

    fn is_dirty(&self) -> bool {
        self.cell.is_dirty() || self.stages_changed || self.stages.iter().any(StageSource::is_dirty)
    }

    fn reset_object(&mut self) {
        self.cell.reset();
        self.status = ProgramStatus::Dirty;
        for stage in &mut self.stages {
            stage.reset_object();
        }
    }
}

impl fmt::Debug for ProgramResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramResource")
            .field("name", &self.name)
            .field("id", &self.cell.id())
            .field("status", &self.status())
            .field("stages", &self.stages)
            .field("uniforms", &self.uniforms.len())
            .field("attributes", &self.attributes.len())
            .finish()
    }
}
