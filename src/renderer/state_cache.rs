//! Last-known device state used to suppress redundant calls
//!
//! Every setter compares the request with the cached value and only calls the
//! device when they differ. `None` means "unknown": the next request for that
//! aspect always reaches the device. The cache is only correct while the
//! backend is the sole mutator of device state; call
//! [`invalidate`](DeviceStateCache::invalidate) after anything else touched it.

use std::collections::HashMap;

use crate::backend::{
    BlendFactor, BufferTarget, Capability, CompareFunction, CullFace, DeviceDriver, FrontFace,
    ObjectHandle, ObjectKind, PolygonMode, Rect, TextureDimension,
};
use crate::error::{RendererError, RendererResult};

use super::render_state::{BlendMode, CullFaceMode, DepthTest, RenderState};

fn update<T: PartialEq>(cached: &mut Option<T>, value: T) -> bool {
    if cached.as_ref() == Some(&value) {
        false
    } else {
        *cached = Some(value);
        true
    }
}

/// Mirror of the device's bound objects and toggles
#[derive(Debug)]
pub struct DeviceStateCache {
    max_texture_units: u32,
    program: Option<Option<ObjectHandle>>,
    array_buffer: Option<Option<ObjectHandle>>,
    element_buffer: Option<Option<ObjectHandle>>,
    textures: HashMap<u32, Option<ObjectHandle>>,
    active_unit: Option<u32>,
    capabilities: HashMap<Capability, bool>,
    viewport: Option<Rect>,
    scissor: Option<Rect>,
    depth_func: Option<CompareFunction>,
    cull_face: Option<CullFace>,
    front_face: Option<FrontFace>,
    blend_func: Option<(BlendFactor, BlendFactor)>,
    polygon_mode: Option<PolygonMode>,
    line_width: Option<f32>,
    point_size: Option<f32>,
}

impl DeviceStateCache {
    pub fn new(max_texture_units: u32) -> Self {
        Self {
            max_texture_units,
            program: None,
            array_buffer: None,
            element_buffer: None,
            textures: HashMap::new(),
            active_unit: None,
            capabilities: HashMap::new(),
            viewport: None,
            scissor: None,
            depth_func: None,
            cull_face: None,
            front_face: None,
            blend_func: None,
            polygon_mode: None,
            line_width: None,
            point_size: None,
        }
    }

    /// Forget everything; every aspect reads as changed afterwards
    pub fn invalidate(&mut self) {
        log::trace!("Invalidating device state cache");
        *self = Self::new(self.max_texture_units);
    }

    pub fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    pub fn bound_program(&self) -> Option<ObjectHandle> {
        self.program.flatten()
    }

    pub fn bound_buffer(&self, target: BufferTarget) -> Option<ObjectHandle> {
        match target {
            BufferTarget::Array => self.array_buffer.flatten(),
            BufferTarget::ElementArray => self.element_buffer.flatten(),
        }
    }

    pub fn bound_texture(&self, unit: u32) -> Option<ObjectHandle> {
        self.textures.get(&unit).copied().flatten()
    }

    pub fn active_unit(&self) -> Option<u32> {
        self.active_unit
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn scissor(&self) -> Option<Rect> {
        self.scissor
    }

    pub fn capability(&self, capability: Capability) -> Option<bool> {
        self.capabilities.get(&capability).copied()
    }

    // ------------------------------------------------------------------------
    // Object bindings
    // ------------------------------------------------------------------------

    pub fn bind_program(&mut self, device: &mut dyn DeviceDriver, program: Option<ObjectHandle>) -> bool {
        if !update(&mut self.program, program) {
            return false;
        }
        device.use_program(program);
        true
    }

    pub fn bind_buffer(
        &mut self,
        device: &mut dyn DeviceDriver,
        target: BufferTarget,
        buffer: Option<ObjectHandle>,
    ) -> bool {
        let cached = match target {
            BufferTarget::Array => &mut self.array_buffer,
            BufferTarget::ElementArray => &mut self.element_buffer,
        };
        if !update(cached, buffer) {
            return false;
        }
        device.bind_buffer(target, buffer);
        true
    }

    /// Bind `texture` to `unit`; each unit is diffed on its own
    pub fn bind_texture(
        &mut self,
        device: &mut dyn DeviceDriver,
        unit: u32,
        dimension: TextureDimension,
        texture: Option<ObjectHandle>,
    ) -> RendererResult<bool> {
        if unit >= self.max_texture_units {
            return Err(RendererError::InvalidParameter(format!(
                "texture unit {} exceeds the limit of {}",
                unit, self.max_texture_units
            )));
        }
        if self.textures.get(&unit) == Some(&texture) {
            return Ok(false);
        }
        device.bind_texture(unit, dimension, texture);
        self.textures.insert(unit, texture);
        self.active_unit = Some(unit);
        Ok(true)
    }

    /// Drop cached bindings of an object that is about to be deleted
    pub fn forget(&mut self, kind: ObjectKind, handle: ObjectHandle) {
        let bound = Some(Some(handle));
        match kind {
            ObjectKind::Program => {
                if self.program == bound {
                    self.program = None;
                }
            }
            ObjectKind::Buffer => {
                if self.array_buffer == bound {
                    self.array_buffer = None;
                }
                if self.element_buffer == bound {
                    self.element_buffer = None;
                }
            }
            ObjectKind::Texture => self.textures.retain(|_, texture| *texture != Some(handle)),
            ObjectKind::Stage => {}
        }
    }

    // ------------------------------------------------------------------------
    // Fixed-function state
    // ------------------------------------------------------------------------

    pub fn set_capability(&mut self, device: &mut dyn DeviceDriver, capability: Capability, enabled: bool) -> bool {
        if self.capabilities.get(&capability) == Some(&enabled) {
            return false;
        }
        device.set_capability(capability, enabled);
        self.capabilities.insert(capability, enabled);
        true
    }

    pub fn set_viewport(&mut self, device: &mut dyn DeviceDriver, rect: Rect) -> bool {
        if !update(&mut self.viewport, rect) {
            return false;
        }
        device.viewport(rect);
        true
    }

    /// Enable scissoring with `rect`, or disable it with `None`
    ///
    /// Returns the number of device calls issued.
    pub fn set_scissor(&mut self, device: &mut dyn DeviceDriver, rect: Option<Rect>) -> usize {
        match rect {
            Some(rect) => {
                let mut calls = usize::from(self.set_capability(device, Capability::ScissorTest, true));
                if update(&mut self.scissor, rect) {
                    device.scissor(rect);
                    calls += 1;
                }
                calls
            }
            None => {
                self.scissor = None;
                usize::from(self.set_capability(device, Capability::ScissorTest, false))
            }
        }
    }

    pub fn set_depth_test(&mut self, device: &mut dyn DeviceDriver, depth_test: DepthTest) -> usize {
        match depth_test.function() {
            None => usize::from(self.set_capability(device, Capability::DepthTest, false)),
            Some(func) => {
                let mut calls = usize::from(self.set_capability(device, Capability::DepthTest, true));
                if update(&mut self.depth_func, func) {
                    device.depth_func(func);
                    calls += 1;
                }
                calls
            }
        }
    }

    pub fn set_cull_face(&mut self, device: &mut dyn DeviceDriver, mode: CullFaceMode) -> usize {
        match mode.face() {
            None => usize::from(self.set_capability(device, Capability::CullFace, false)),
            Some(face) => {
                let mut calls = usize::from(self.set_capability(device, Capability::CullFace, true));
                if update(&mut self.cull_face, face) {
                    device.cull_face(face);
                    calls += 1;
                }
                calls
            }
        }
    }

    pub fn set_front_face(&mut self, device: &mut dyn DeviceDriver, winding: FrontFace) -> bool {
        if !update(&mut self.front_face, winding) {
            return false;
        }
        device.front_face(winding);
        true
    }

    pub fn set_blend(&mut self, device: &mut dyn DeviceDriver, mode: BlendMode) -> usize {
        match mode.factors() {
            None => usize::from(self.set_capability(device, Capability::Blend, false)),
            Some((src, dst)) => {
                let mut calls = usize::from(self.set_capability(device, Capability::Blend, true));
                if update(&mut self.blend_func, (src, dst)) {
                    device.blend_func(src, dst);
                    calls += 1;
                }
                calls
            }
        }
    }

    pub fn set_wireframe(&mut self, device: &mut dyn DeviceDriver, wireframe: bool) -> bool {
        let mode = if wireframe { PolygonMode::Line } else { PolygonMode::Fill };
        if !update(&mut self.polygon_mode, mode) {
            return false;
        }
        device.polygon_mode(mode);
        true
    }

    pub fn set_line_width(&mut self, device: &mut dyn DeviceDriver, width: f32) -> bool {
        if !update(&mut self.line_width, width) {
            return false;
        }
        device.line_width(width);
        true
    }

    pub fn set_point_size(&mut self, device: &mut dyn DeviceDriver, size: f32) -> bool {
        if !update(&mut self.point_size, size) {
            return false;
        }
        device.point_size(size);
        true
    }

    /// Apply every aspect of `state`; returns the number of device calls issued
    pub fn apply(&mut self, device: &mut dyn DeviceDriver, state: &RenderState) -> usize {
        let mut calls = 0;
        calls += usize::from(self.set_wireframe(device, state.wireframe));
        calls += self.set_depth_test(device, state.depth_test);
        calls += self.set_cull_face(device, state.cull_face);
        calls += usize::from(self.set_front_face(device, state.front_face));
        calls += self.set_blend(device, state.blend);
        calls += usize::from(self.set_point_size(device, state.point_size));
        calls += usize::from(self.set_capability(device, Capability::LineSmooth, state.smooth_lines));
        calls += usize::from(self.set_line_width(device, state.line_width));
        if calls > 0 {
            log::trace!("Render state applied with {} device calls", calls);
        }
        calls
    }
}
