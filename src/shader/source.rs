//! Program stage sources with hot reload

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::backend::{ObjectKind, StageKind};
use crate::error::RendererResult;
use crate::resources::{DeviceCell, DeviceObject};

/// Compile state of a stage source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    /// Not part of any program
    Unattached,
    /// Needs (re)compilation
    Dirty,
    Compiled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Inline,
    File(PathBuf),
}

/// Source text of one program stage
pub struct StageSource {
    cell: Arc<DeviceCell>,
    kind: StageKind,
    name: String,
    text: String,
    origin: Origin,
    last_modified: SystemTime,
    generation: u64,
    failure: Option<(u64, String)>,
    attached: bool,
}

impl StageSource {
    pub fn from_string(kind: StageKind, name: &str, text: &str) -> Self {
        Self {
            cell: DeviceCell::new(),
            kind,
            name: name.to_string(),
            text: text.to_string(),
            origin: Origin::Inline,
            last_modified: SystemTime::now(),
            generation: 0,
            failure: None,
            attached: false,
        }
    }

    /// Load a stage from disk; [`poll_modified`](Self::poll_modified) picks up later edits
    pub fn from_file<P: AsRef<Path>>(kind: StageKind, path: P) -> RendererResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let last_modified = fs::metadata(path)?.modified()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut source = Self::from_string(kind, &name, &text);
        source.origin = Origin::File(path.to_path_buf());
        source.last_modified = last_modified;
        Ok(source)
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File(path) => Some(path),
            Origin::Inline => None,
        }
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// Bumped on every edit
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> StageStatus {
        if self.cell.is_dirty() {
            StageStatus::Dirty
        } else if !self.attached {
            StageStatus::Unattached
        } else {
            StageStatus::Compiled
        }
    }

    /// Replace the source text
    pub fn update_source(&mut self, text: &str) {
        self.text = text.to_string();
        self.last_modified = SystemTime::now();
        self.touch();
    }

    /// Compile again even though the text is unchanged
    pub fn request_recompile(&mut self) {
        self.touch();
    }

    /// Reload a file-backed source if it changed on disk since it was read
    ///
    /// Returns whether the source was reloaded.
    pub fn poll_modified(&mut self) -> RendererResult<bool> {
        let Origin::File(path) = &self.origin else {
            return Ok(false);
        };
        let modified = fs::metadata(path)?.modified()?;
        if modified <= self.last_modified {
            return Ok(false);
        }

        log::debug!("Reloading stage source {}", path.display());
        self.text = fs::read_to_string(path)?;
        self.last_modified = modified;
        self.touch();
        Ok(true)
    }

    /// Diagnostic of a failed compile of the current text, if any
    pub fn compile_failure(&self) -> Option<&str> {
        match &self.failure {
            Some((generation, log)) if *generation == self.generation => Some(log),
            _ => None,
        }
    }

    pub(crate) fn record_failure(&mut self, log: String) {
        self.failure = Some((self.generation, log));
    }

    pub(crate) fn mark_compiled(&mut self) {
        self.failure = None;
        self.cell.clear_dirty();
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    fn touch(&mut self) {
        self.generation += 1;
        self.cell.mark_dirty();
    }
}

impl DeviceObject for StageSource {
    fn cell(&self) -> &Arc<DeviceCell> {
        &self.cell
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Stage
    }

    fn label(&self) -> String {
        format!("{} stage '{}'", self.kind.label(), self.name)
    }
}

impl fmt::Debug for StageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSource")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("id", &self.cell.id())
            .field("status", &self.status())
            .field("generation", &self.generation)
            .finish()
    }
}
