//! Named caches of programs, textures and meshes
//!
//! Repositories are plain values handed to whoever needs lookups; nothing here
//! is global. Entries are shared so the scene layer can keep using a resource
//! while another thread edits it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{DeviceDriver, StageKind};
use crate::error::{RendererError, RendererResult};
use crate::renderer::RenderBackend;
use crate::resources::{MeshResource, TextureData, TextureResource};
use crate::shader::{ProgramResource, StageSource};

/// A resource shared between the scene layer and the repositories
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Name under which the fallback program is registered
pub const FALLBACK_PROGRAM: &str = "Fallback";

/// Key of a program built from named stages: `vertex_fragment[_geometry]`
pub fn program_key(vertex: &str, fragment: &str, geometry: Option<&str>) -> String {
    match geometry {
        Some(geometry) => format!("{}_{}_{}", vertex, fragment, geometry),
        None => format!("{}_{}", vertex, fragment),
    }
}

fn duplicate(repository: &'static str, key: &str) -> RendererError {
    RendererError::DuplicateEntry {
        repository,
        key: key.to_string(),
    }
}

// ============================================================================
// Programs
// ============================================================================

/// Programs deduplicated by the stages they are built from
#[derive(Debug, Default)]
pub struct ProgramRepository {
    programs: HashMap<String, Shared<ProgramResource>>,
}

impl ProgramRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Shared<ProgramResource>> {
        self.programs.get(key).cloned()
    }

    /// Register a program under an explicit key
    pub fn register(
        &mut self,
        key: &str,
        program: ProgramResource,
    ) -> RendererResult<Shared<ProgramResource>> {
        if self.programs.contains_key(key) {
            return Err(duplicate("ProgramRepository", key));
        }
        let program = shared(program);
        self.programs.insert(key.to_string(), program.clone());
        Ok(program)
    }

    /// Program built from the named stages, created on first request
    ///
    /// `load` turns a stage name into its source and is only called when the
    /// combination is not cached yet.
    pub fn get_or_create(
        &mut self,
        vertex: &str,
        fragment: &str,
        geometry: Option<&str>,
        mut load: impl FnMut(StageKind, &str) -> RendererResult<StageSource>,
    ) -> RendererResult<Shared<ProgramResource>> {
        let key = program_key(vertex, fragment, geometry);
        if let Some(program) = self.programs.get(&key) {
            return Ok(program.clone());
        }

        let mut stages = vec![
            load(StageKind::Vertex, vertex)?,
            load(StageKind::Fragment, fragment)?,
        ];
        if let Some(geometry) = geometry {
            stages.push(load(StageKind::Geometry, geometry)?);
        }

        log::debug!("Creating program '{}'", key);
        let program = shared(ProgramResource::from_stages(&key, stages));
        self.programs.insert(key, program.clone());
        Ok(program)
    }

    pub fn fallback(&self) -> Option<Shared<ProgramResource>> {
        self.get(FALLBACK_PROGRAM)
    }

    /// Remove a program and delete it and its stages from the device
    pub fn evict<D: DeviceDriver>(
        &mut self,
        key: &str,
        backend: &mut RenderBackend<D>,
    ) -> Option<Shared<ProgramResource>> {
        let program = self.programs.remove(key)?;
        backend.delete_program(&mut program.write());
        Some(program)
    }
}

// ============================================================================
// Textures
// ============================================================================

/// Textures by unique name
#[derive(Debug, Default)]
pub struct TextureRepository {
    textures: HashMap<String, Shared<TextureResource>>,
}

impl TextureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Create a texture named after its data
    pub fn create(&mut self, data: TextureData) -> RendererResult<Shared<TextureResource>> {
        if self.textures.contains_key(&data.name) {
            return Err(duplicate("TextureRepository", &data.name));
        }
        let name = data.name.clone();
        let texture = shared(TextureResource::new(data));
        self.textures.insert(name, texture.clone());
        Ok(texture)
    }

    pub fn get(&self, name: &str) -> Option<Shared<TextureResource>> {
        self.textures.get(name).cloned()
    }

    /// Remove a texture and delete it from the device
    pub fn evict<D: DeviceDriver>(
        &mut self,
        name: &str,
        backend: &mut RenderBackend<D>,
    ) -> Option<Shared<TextureResource>> {
        let texture = self.textures.remove(name)?;
        backend.delete_texture(&mut texture.write());
        Some(texture)
    }
}

// ============================================================================
// Meshes
// ============================================================================

/// Meshes by unique name
#[derive(Debug, Default)]
pub struct MeshRepository {
    meshes: HashMap<String, Shared<MeshResource>>,
}

impl MeshRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn insert(&mut self, mesh: MeshResource) -> RendererResult<Shared<MeshResource>> {
        let name = mesh.name().to_string();
        if self.meshes.contains_key(&name) {
            return Err(duplicate("MeshRepository", &name));
        }
        let mesh = shared(mesh);
        self.meshes.insert(name, mesh.clone());
        Ok(mesh)
    }

    pub fn get(&self, name: &str) -> Option<Shared<MeshResource>> {
        self.meshes.get(name).cloned()
    }

    /// Remove a mesh and delete its buffers from the device
    pub fn evict<D: DeviceDriver>(
        &mut self,
        name: &str,
        backend: &mut RenderBackend<D>,
    ) -> Option<Shared<MeshResource>> {
        let mesh = self.meshes.remove(name)?;
        backend.delete_mesh(&mut mesh.write());
        Some(mesh)
    }
}
