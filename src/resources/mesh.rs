//! Mesh data structures and generation

use std::collections::BTreeMap;
use std::fmt;

use glam::{Vec2, Vec3};

use crate::backend::{AttributeLayout, BufferUsage, ElementFormat, PrimitiveTopology};
use crate::error::{RendererError, RendererResult};

use super::buffer::{validate_components, BufferData, BufferResource, BufferSemantic};
use super::device_object::DeviceObject;

/// A set of buffers drawn with one topology
///
/// Vertex and element counts are derived whenever a buffer or the topology
/// changes, so reading them never scans buffers.
pub struct MeshResource {
    name: String,
    buffers: BTreeMap<BufferSemantic, BufferResource>,
    topology: PrimitiveTopology,
    line_width: f32,
    point_size: f32,
    vertex_count: u32,
    element_count: u32,
}

impl MeshResource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            buffers: BTreeMap::new(),
            topology: PrimitiveTopology::Triangles,
            line_width: 1.0,
            point_size: 1.0,
            vertex_count: 0,
            element_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
        self.update_counts();
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    /// Must be positive and not NaN when the mesh is drawn
    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.point_size = size;
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn buffer(&self, semantic: BufferSemantic) -> Option<&BufferResource> {
        self.buffers.get(&semantic)
    }

    pub fn buffer_mut(&mut self, semantic: BufferSemantic) -> Option<&mut BufferResource> {
        self.buffers.get_mut(&semantic)
    }

    pub fn buffers(&self) -> impl Iterator<Item = &BufferResource> {
        self.buffers.values()
    }

    pub(crate) fn buffers_mut(&mut self) -> impl Iterator<Item = &mut BufferResource> {
        self.buffers.values_mut()
    }

    pub fn is_indexed(&self) -> bool {
        self.buffers.contains_key(&BufferSemantic::Index)
    }

    pub fn is_interleaved(&self) -> bool {
        self.buffers.contains_key(&BufferSemantic::Interleaved)
    }

    /// Semantics that feed vertex attribute slots, in a stable order
    pub fn attribute_semantics(&self) -> Vec<BufferSemantic> {
        self.buffers
            .keys()
            .copied()
            .filter(BufferSemantic::is_attribute)
            .collect()
    }

    /// Set a buffer, taking the element format from the payload
    pub fn set_buffer(
        &mut self,
        semantic: BufferSemantic,
        components: u8,
        data: impl Into<BufferData>,
    ) -> RendererResult<()> {
        let data = data.into();
        let format = data.format();
        self.set_buffer_with_format(semantic, components, format, data)
    }

    /// Set a buffer with a declared element format
    ///
    /// The payload replaces any previous contents of that semantic.
    pub fn set_buffer_with_format(
        &mut self,
        semantic: BufferSemantic,
        components: u8,
        format: ElementFormat,
        data: impl Into<BufferData>,
    ) -> RendererResult<()> {
        let inserted = !self.buffers.contains_key(&semantic);
        let buffer = self
            .buffers
            .entry(semantic)
            .or_insert_with(|| BufferResource::new(semantic));
        let result = buffer.set_data_with_format(components, format, data);
        if result.is_err() && inserted {
            self.buffers.remove(&semantic);
        }
        result?;
        self.update_counts();
        Ok(())
    }

    /// Set the interleaved block; `stride` is the byte size of one vertex
    pub fn set_interleaved(
        &mut self,
        data: impl Into<BufferData>,
        stride: u32,
    ) -> RendererResult<()> {
        self.set_buffer(BufferSemantic::Interleaved, 1, data)?;
        if let Some(buffer) = self.buffers.get_mut(&BufferSemantic::Interleaved) {
            buffer.set_stride(stride);
        }
        self.update_counts();
        Ok(())
    }

    /// Describe where an attribute lives inside the interleaved buffer
    pub fn set_pointer(
        &mut self,
        semantic: BufferSemantic,
        components: u8,
        format: ElementFormat,
        stride: u32,
        offset: u32,
        normalized: bool,
    ) -> RendererResult<()> {
        if !self.is_interleaved() {
            return Err(RendererError::InvalidGeometryState(format!(
                "mesh '{}' has no interleaved buffer for the {:?} pointer",
                self.name, semantic
            )));
        }
        if !semantic.is_attribute() {
            return Err(RendererError::InvalidParameter(format!(
                "{:?} cannot point into an interleaved buffer",
                semantic
            )));
        }
        validate_components(components)?;

        let layout = AttributeLayout {
            components,
            format,
            normalized,
            stride,
            offset,
        };
        self.buffers
            .insert(semantic, BufferResource::view(semantic, layout));
        self.update_counts();
        Ok(())
    }

    pub fn set_usage(&mut self, semantic: BufferSemantic, usage: BufferUsage) {
        if let Some(buffer) = self.buffers.get_mut(&semantic) {
            buffer.set_usage(usage);
        }
    }

    /// Detach a buffer; the caller decides when its device object goes away
    pub fn remove_buffer(&mut self, semantic: BufferSemantic) -> Option<BufferResource> {
        let removed = self.buffers.remove(&semantic);
        self.update_counts();
        removed
    }

    fn update_counts(&mut self) {
        let vertex_count = if let Some(index) = self.buffers.get(&BufferSemantic::Index) {
            index.len()
        } else if let Some(interleaved) = self.buffers.get(&BufferSemantic::Interleaved) {
            let layout = interleaved.layout();
            let per_vertex = layout.stride / layout.format.size();
            if per_vertex == 0 {
                log::warn!("Mesh '{}': interleaved buffer has no stride", self.name);
                0
            } else {
                interleaved.len() / per_vertex as usize
            }
        } else if let Some(vertices) = self.buffers.get(&BufferSemantic::Vertex) {
            let components = vertices.layout().components;
            if components == 0 {
                log::warn!("Mesh '{}': vertex buffer has zero components", self.name);
                0
            } else {
                vertices.len() / components as usize
            }
        } else {
            0
        };

        self.vertex_count = u32::try_from(vertex_count).unwrap_or(u32::MAX);
        self.element_count = self.topology.element_count(self.vertex_count);
    }

    /// A unit quad in the XY plane
    pub fn quad() -> Self {
        let mut mesh = MeshResource::new("quad");
        let positions: Vec<f32> = vec![
            -0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0,
        ];
        let uvs: Vec<f32> = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        mesh.insert_valid(BufferSemantic::Vertex, 3, positions);
        mesh.insert_valid(BufferSemantic::TexCoord(0), 2, uvs);
        mesh.insert_valid(BufferSemantic::Index, 1, vec![0u32, 1, 2, 0, 2, 3]);
        mesh
    }

    /// A unit cube centered at origin with normals and texture coordinates
    pub fn cube() -> Self {
        let mut mesh = MeshResource::new("cube");

        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];
        let corners = [
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
        ];

        let mut positions = Vec::with_capacity(72);
        let mut normals = Vec::with_capacity(72);
        let mut uvs = Vec::with_capacity(48);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, right)) in faces.iter().enumerate() {
            let up = normal.cross(*right);
            for corner in corners {
                let position = *normal * 0.5 + *right * corner.x + up * corner.y;
                positions.extend_from_slice(&position.to_array());
                normals.extend_from_slice(&normal.to_array());
                uvs.extend_from_slice(&[corner.x + 0.5, 0.5 - corner.y]);
            }
            let base = face as u32 * 4;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh.insert_valid(BufferSemantic::Vertex, 3, positions);
        mesh.insert_valid(BufferSemantic::Normal, 3, normals);
        mesh.insert_valid(BufferSemantic::TexCoord(0), 2, uvs);
        mesh.insert_valid(BufferSemantic::Index, 1, indices);
        mesh
    }

    fn insert_valid(&mut self, semantic: BufferSemantic, components: u8, data: impl Into<BufferData>) {
        if let Err(err) = self.set_buffer(semantic, components, data) {
            log::error!("Mesh '{}': generated buffer rejected: {}", self.name, err);
        }
    }
}

impl fmt::Debug for MeshResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshResource")
            .field("name", &self.name)
            .field("topology", &self.topology)
            .field("buffers", &self.buffers.keys().collect::<Vec<_>>())
            .field("vertex_count", &self.vertex_count)
            .field("element_count", &self.element_count)
            .finish()
    }
}
