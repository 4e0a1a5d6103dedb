//! Base contract for CPU-side proxies of device resources

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{ObjectHandle, ObjectKind};

/// Device identity of a resource proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceId {
    /// Nothing allocated yet
    #[default]
    Unset,
    /// The last allocation attempt failed
    Invalid,
    Allocated(ObjectHandle),
}

impl DeviceId {
    pub fn handle(&self) -> Option<ObjectHandle> {
        match self {
            DeviceId::Allocated(handle) => Some(*handle),
            DeviceId::Unset | DeviceId::Invalid => None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, DeviceId::Allocated(_))
    }
}

#[derive(Debug)]
struct CellState {
    id: DeviceId,
    dirty: bool,
}

/// Device id and dirty flag of one proxy.
///
/// The owning resource holds the only strong reference; the lifecycle tracker
/// observes it through a [`Weak`] so that dropping the resource is what makes
/// its device object unreachable. The flag may be flipped from any thread.
#[derive(Debug)]
pub struct DeviceCell {
    state: Mutex<CellState>,
}

impl DeviceCell {
    /// A fresh cell is dirty and unset
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CellState {
                id: DeviceId::Unset,
                dirty: true,
            }),
        })
    }

    pub fn id(&self) -> DeviceId {
        self.state.lock().id
    }

    pub fn handle(&self) -> Option<ObjectHandle> {
        self.id().handle()
    }

    pub fn set_id(&self, id: DeviceId) {
        self.state.lock().id = id;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn mark_dirty(&self) {
        self.state.lock().dirty = true;
    }

    pub fn clear_dirty(&self) {
        self.state.lock().dirty = false;
    }

    /// Forget the device id and require a fresh upload
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.id = DeviceId::Unset;
        state.dirty = true;
    }

    /// Drop the id only if it still names `handle`; returns whether it did
    pub fn reset_if(&self, handle: ObjectHandle) -> bool {
        let mut state = self.state.lock();
        if state.id == DeviceId::Allocated(handle) {
            state.id = DeviceId::Unset;
            state.dirty = true;
            true
        } else {
            false
        }
    }
}

/// A CPU-side description mirrored by a device object
pub trait DeviceObject {
    fn cell(&self) -> &Arc<DeviceCell>;

    fn kind(&self) -> ObjectKind;

    /// Name used in log messages and errors
    fn label(&self) -> String;

    fn device_id(&self) -> DeviceId {
        self.cell().id()
    }

    /// Must be (re)uploaded before next use
    fn is_dirty(&self) -> bool {
        self.cell().is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell().mark_dirty();
    }

    /// Forget device state after the context was lost
    fn reset_object(&mut self) {
        self.cell().reset();
    }

    fn downgrade(&self) -> Weak<DeviceCell> {
        Arc::downgrade(self.cell())
    }
}
