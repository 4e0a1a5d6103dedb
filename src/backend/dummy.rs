//! Dummy device for testing and development.
//!
//! This device doesn't talk to any GPU. It hands out sequential handles,
//! records every call it receives and answers location queries from
//! configurable tables, which makes it usable as a call-counting fake.

use std::collections::{HashMap, HashSet};

use super::traits::*;
use super::types::*;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(ObjectHandle),
    DeleteBuffer(ObjectHandle),
    BindBuffer(BufferTarget, Option<ObjectHandle>),
    BufferData { target: BufferTarget, len: usize },
    BufferSubData { target: BufferTarget, offset: usize, len: usize },
    CreateStage(StageKind, ObjectHandle),
    CompileStage(ObjectHandle),
    DeleteStage(ObjectHandle),
    CreateProgram(ObjectHandle),
    AttachStage { program: ObjectHandle, stage: ObjectHandle },
    DetachStage { program: ObjectHandle, stage: ObjectHandle },
    LinkProgram(ObjectHandle),
    DeleteProgram(ObjectHandle),
    UseProgram(Option<ObjectHandle>),
    UniformLocation { program: ObjectHandle, name: String },
    AttributeLocation { program: ObjectHandle, name: String },
    WriteUniform { slot: u32, value: UniformValue },
    EnableAttribute(u32),
    DisableAttribute(u32),
    AttributePointer { slot: u32, layout: AttributeLayout },
    CreateTexture(ObjectHandle),
    DeleteTexture(ObjectHandle),
    BindTexture { unit: u32, texture: Option<ObjectHandle> },
    UploadTexture { size: TextureSize, len: usize },
    TextureFilters { min: MinFilter, mag: MagFilter },
    TextureWrap { axis: TextureAxis, mode: WrapMode },
    TextureAnisotropy(f32),
    GenerateMipmaps(TextureDimension),
    SetCapability(Capability, bool),
    DepthFunc(CompareFunction),
    CullFace(CullFace),
    FrontFace(FrontFace),
    BlendFunc(BlendFactor, BlendFactor),
    PolygonMode(PolygonMode),
    LineWidth(f32),
    PointSize(f32),
    Viewport(Rect),
    Scissor(Rect),
    DrawArrays { topology: PrimitiveTopology, first: u32, count: u32 },
    DrawElements { topology: PrimitiveTopology, count: u32, format: ElementFormat },
}

impl DeviceCall {
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            DeviceCall::DeleteBuffer(_)
                | DeviceCall::DeleteStage(_)
                | DeviceCall::DeleteProgram(_)
                | DeviceCall::DeleteTexture(_)
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, DeviceCall::DrawArrays { .. } | DeviceCall::DrawElements { .. })
    }
}

/// Dummy device.
#[derive(Debug)]
pub struct DummyDevice {
    next_handle: u32,
    calls: Vec<DeviceCall>,
    live: HashSet<(ObjectKind, ObjectHandle)>,
    deleted: HashMap<ObjectKind, Vec<ObjectHandle>>,
    uniform_slots: HashMap<String, u32>,
    attribute_slots: HashMap<String, u32>,
    fail_allocation: bool,
    fail_link: bool,
    compile_error_marker: Option<String>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            calls: Vec::new(),
            live: HashSet::new(),
            deleted: HashMap::new(),
            uniform_slots: HashMap::new(),
            attribute_slots: HashMap::new(),
            fail_allocation: false,
            fail_link: false,
            compile_error_marker: None,
        }
    }

    /// Report `slot` for uniform `name` in every program.
    pub fn with_uniform(mut self, name: &str, slot: u32) -> Self {
        self.uniform_slots.insert(name.to_string(), slot);
        self
    }

    /// Report `slot` for attribute `name` in every program.
    pub fn with_attribute(mut self, name: &str, slot: u32) -> Self {
        self.attribute_slots.insert(name.to_string(), slot);
        self
    }

    /// Make every allocation fail while set.
    pub fn set_allocation_failure(&mut self, fail: bool) {
        self.fail_allocation = fail;
    }

    /// Make every link fail while set.
    pub fn set_link_failure(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    /// Fail compilation of any source containing `marker`.
    pub fn fail_sources_containing(&mut self, marker: Option<&str>) {
        self.compile_error_marker = marker.map(str::to_string);
    }

    /// All calls recorded so far
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of allocated objects not yet deleted
    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, kind: ObjectKind, handle: ObjectHandle) -> bool {
        self.live.contains(&(kind, handle))
    }

    /// Handles of `kind` deleted so far, in deletion order
    pub fn deleted(&self, kind: ObjectKind) -> &[ObjectHandle] {
        self.deleted.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn allocate(&mut self, kind: ObjectKind) -> DeviceResult<ObjectHandle> {
        if self.fail_allocation {
            log::trace!("DummyDevice: refusing {:?} allocation", kind);
            return Err(DeviceError::AllocationFailed(format!(
                "dummy device out of {:?} objects",
                kind
            )));
        }
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert((kind, handle));
        log::trace!("DummyDevice: created {:?} {:?}", kind, handle);
        Ok(handle)
    }

    fn release(&mut self, kind: ObjectKind, handle: ObjectHandle) {
        if !self.live.remove(&(kind, handle)) {
            log::warn!("DummyDevice: deleting unknown {:?} {:?}", kind, handle);
        }
        self.deleted.entry(kind).or_default().push(handle);
    }

    fn record(&mut self, call: DeviceCall) {
        log::trace!("DummyDevice: {:?}", call);
        self.calls.push(call);
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDriver for DummyDevice {
    fn name(&self) -> &str {
        "Dummy Device"
    }

    fn create_buffer(&mut self) -> DeviceResult<ObjectHandle> {
        let handle = self.allocate(ObjectKind::Buffer)?;
        self.record(DeviceCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: ObjectHandle) {
        self.release(ObjectKind::Buffer, buffer);
        self.record(DeviceCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<ObjectHandle>) {
        self.record(DeviceCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        self.record(DeviceCall::BufferData {
            target,
            len: data.len(),
        });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.record(DeviceCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn create_stage(&mut self, kind: StageKind) -> DeviceResult<ObjectHandle> {
        let handle = self.allocate(ObjectKind::Stage)?;
        self.record(DeviceCall::CreateStage(kind, handle));
        Ok(handle)
    }

    fn compile_stage(&mut self, stage: ObjectHandle, source: &str) -> DeviceResult<()> {
        self.record(DeviceCall::CompileStage(stage));
        match &self.compile_error_marker {
            Some(marker) if source.contains(marker.as_str()) => Err(DeviceError::CompileFailed(
                format!("0:1: error: unexpected '{}'", marker),
            )),
            _ => Ok(()),
        }
    }

    fn delete_stage(&mut self, stage: ObjectHandle) {
        self.release(ObjectKind::Stage, stage);
        self.record(DeviceCall::DeleteStage(stage));
    }

    fn create_program(&mut self) -> DeviceResult<ObjectHandle> {
        let handle = self.allocate(ObjectKind::Program)?;
        self.record(DeviceCall::CreateProgram(handle));
        Ok(handle)
    }

    fn attach_stage(&mut self, program: ObjectHandle, stage: ObjectHandle) {
        self.record(DeviceCall::AttachStage { program, stage });
    }

    fn detach_stage(&mut self, program: ObjectHandle, stage: ObjectHandle) {
        self.record(DeviceCall::DetachStage { program, stage });
    }

    fn link_program(&mut self, program: ObjectHandle) -> DeviceResult<()> {
        self.record(DeviceCall::LinkProgram(program));
        if self.fail_link {
            return Err(DeviceError::LinkFailed(
                "error: vertex output does not match fragment input".to_string(),
            ));
        }
        Ok(())
    }

    fn delete_program(&mut self, program: ObjectHandle) {
        self.release(ObjectKind::Program, program);
        self.record(DeviceCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Option<ObjectHandle>) {
        self.record(DeviceCall::UseProgram(program));
    }

    fn uniform_location(&mut self, program: ObjectHandle, name: &str) -> Option<u32> {
        self.record(DeviceCall::UniformLocation {
            program,
            name: name.to_string(),
        });
        self.uniform_slots.get(name).copied()
    }

    fn attribute_location(&mut self, program: ObjectHandle, name: &str) -> Option<u32> {
        self.record(DeviceCall::AttributeLocation {
            program,
            name: name.to_string(),
        });
        self.attribute_slots.get(name).copied()
    }

    fn write_uniform(&mut self, slot: u32, value: &UniformValue) {
        self.record(DeviceCall::WriteUniform {
            slot,
            value: *value,
        });
    }

    fn enable_attribute(&mut self, slot: u32) {
        self.record(DeviceCall::EnableAttribute(slot));
    }

    fn disable_attribute(&mut self, slot: u32) {
        self.record(DeviceCall::DisableAttribute(slot));
    }

    fn attribute_pointer(&mut self, slot: u32, layout: &AttributeLayout) {
        self.record(DeviceCall::AttributePointer {
            slot,
            layout: *layout,
        });
    }

    fn create_texture(&mut self) -> DeviceResult<ObjectHandle> {
        let handle = self.allocate(ObjectKind::Texture)?;
        self.record(DeviceCall::CreateTexture(handle));
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: ObjectHandle) {
        self.release(ObjectKind::Texture, texture);
        self.record(DeviceCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, _dimension: TextureDimension, texture: Option<ObjectHandle>) {
        self.record(DeviceCall::BindTexture { unit, texture });
    }

    fn upload_texture(
        &mut self,
        _dimension: TextureDimension,
        size: TextureSize,
        rgba: &[u8],
    ) -> DeviceResult<()> {
        self.record(DeviceCall::UploadTexture {
            size,
            len: rgba.len(),
        });
        Ok(())
    }

    fn texture_filters(&mut self, _dimension: TextureDimension, min: MinFilter, mag: MagFilter) {
        self.record(DeviceCall::TextureFilters { min, mag });
    }

    fn texture_wrap(&mut self, _dimension: TextureDimension, axis: TextureAxis, mode: WrapMode) {
        self.record(DeviceCall::TextureWrap { axis, mode });
    }

    fn texture_anisotropy(&mut self, _dimension: TextureDimension, level: f32) {
        self.record(DeviceCall::TextureAnisotropy(level));
    }

    fn generate_mipmaps(&mut self, dimension: TextureDimension) {
        self.record(DeviceCall::GenerateMipmaps(dimension));
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.record(DeviceCall::SetCapability(capability, enabled));
    }

    fn depth_func(&mut self, func: CompareFunction) {
        self.record(DeviceCall::DepthFunc(func));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.record(DeviceCall::CullFace(face));
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.record(DeviceCall::FrontFace(winding));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.record(DeviceCall::BlendFunc(src, dst));
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.record(DeviceCall::PolygonMode(mode));
    }

    fn line_width(&mut self, width: f32) {
        self.record(DeviceCall::LineWidth(width));
    }

    fn point_size(&mut self, size: f32) {
        self.record(DeviceCall::PointSize(size));
    }

    fn viewport(&mut self, rect: Rect) {
        self.record(DeviceCall::Viewport(rect));
    }

    fn scissor(&mut self, rect: Rect) {
        self.record(DeviceCall::Scissor(rect));
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32) {
        self.record(DeviceCall::DrawArrays {
            topology,
            first,
            count,
        });
    }

    fn draw_elements(&mut self, topology: PrimitiveTopology, count: u32, format: ElementFormat) {
        self.record(DeviceCall::DrawElements {
            topology,
            count,
            format,
        });
    }
}
