//! Named shader variables and their resolved slots

use crate::backend::{UniformType, UniformValue};
use crate::error::{RendererError, RendererResult};
use crate::resources::BufferSemantic;

/// Resolution state of a variable's slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotState {
    /// Not looked up since the last link
    #[default]
    Unknown,
    /// Looked up and absent; inert until the program relinks
    NotFound,
    Resolved(u32),
}

impl SlotState {
    pub fn slot(&self) -> Option<u32> {
        match self {
            SlotState::Resolved(slot) => Some(*slot),
            SlotState::Unknown | SlotState::NotFound => None,
        }
    }
}

/// Uniform or attribute payload of a binding
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    Uniform { value: Option<UniformValue> },
    Attribute { semantic: BufferSemantic },
}

/// A named variable of a program
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    name: String,
    slot: SlotState,
    dirty: bool,
    kind: VariableKind,
}

impl VariableBinding {
    pub fn uniform(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slot: SlotState::Unknown,
            dirty: false,
            kind: VariableKind::Uniform { value: None },
        }
    }

    pub fn attribute(semantic: BufferSemantic) -> Self {
        Self {
            name: semantic.attribute_name(),
            slot: SlotState::Unknown,
            dirty: false,
            kind: VariableKind::Attribute { semantic },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename an attribute; the slot must be looked up again
    pub(crate) fn set_name(&mut self, name: &str) {
        if self.name != name {
            self.name = name.to_string();
            self.slot = SlotState::Unknown;
        }
    }

    pub fn slot(&self) -> SlotState {
        self.slot
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_inert(&self) -> bool {
        self.slot == SlotState::NotFound
    }

    pub fn value(&self) -> Option<&UniformValue> {
        match &self.kind {
            VariableKind::Uniform { value } => value.as_ref(),
            VariableKind::Attribute { .. } => None,
        }
    }

    pub fn value_type(&self) -> Option<UniformType> {
        self.value().map(UniformValue::ty)
    }

    /// Stage a uniform value; equal values leave the binding clean
    pub fn set_value(&mut self, new_value: impl Into<UniformValue>) -> RendererResult<()> {
        let new_value = new_value.into();
        match &mut self.kind {
            VariableKind::Uniform { value } => {
                if value.as_ref() != Some(&new_value) {
                    *value = Some(new_value);
                    self.dirty = true;
                }
                Ok(())
            }
            VariableKind::Attribute { semantic } => Err(RendererError::InvalidParameter(format!(
                "attribute '{}' ({:?}) cannot hold a uniform value",
                self.name, semantic
            ))),
        }
    }

    /// Resolve the slot, querying only while it is unknown
    ///
    /// `lookup` receives the variable name. Returns the state after resolution.
    pub fn resolve_with(&mut self, lookup: impl FnOnce(&str) -> Option<u32>) -> SlotState {
        if self.slot == SlotState::Unknown {
            self.slot = match lookup(&self.name) {
                Some(slot) => SlotState::Resolved(slot),
                None => SlotState::NotFound,
            };
        }
        self.slot
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Forget the slot after a relink; staged values must be written again
    pub(crate) fn reset_slot(&mut self) {
        self.slot = SlotState::Unknown;
        if let VariableKind::Uniform { value: Some(_) } = self.kind {
            self.dirty = true;
        }
    }
}
