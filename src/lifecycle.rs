//! Deferred release of device objects whose owners went away
//!
//! Every device object the backend allocates is registered here together with
//! a weak reference to its owner's [`DeviceCell`]. Dropping the owner does not
//! touch the device; the object is deleted on the next sweep at a frame
//! boundary, after all draws that could still use it were issued.
//!
//! ```text
//! register(obj)        entry { kind, handle, weak cell }
//! drop(owner)          weak cell dies, device object still alive
//! sweep_unreferenced   delete_<kind>(handle), entry removed
//! ```

use std::collections::HashMap;
use std::sync::Weak;

use crate::backend::{DeviceDriver, ObjectHandle, ObjectKind};
use crate::resources::{DeviceCell, DeviceObject};

struct TrackedObject {
    label: String,
    cell: Weak<DeviceCell>,
}

/// Registry of allocated device objects
#[derive(Default)]
pub struct ResourceLifecycleTracker {
    entries: HashMap<(ObjectKind, ObjectHandle), TrackedObject>,
}

impl ResourceLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_tracked(&self, kind: ObjectKind, handle: ObjectHandle) -> bool {
        self.entries.contains_key(&(kind, handle))
    }

    /// Track the object's current device allocation
    ///
    /// Objects without an allocation are ignored; returns whether an entry was added.
    pub fn register(&mut self, object: &dyn DeviceObject) -> bool {
        let Some(handle) = object.device_id().handle() else {
            log::warn!("Not registering {}: nothing allocated", object.label());
            return false;
        };
        let label = object.label();
        log::debug!("Registering {} as {:?} {:?}", label, object.kind(), handle);
        self.entries.insert(
            (object.kind(), handle),
            TrackedObject {
                label,
                cell: object.downgrade(),
            },
        );
        true
    }

    /// Stop tracking an object that was deleted explicitly
    pub fn unregister(&mut self, kind: ObjectKind, handle: ObjectHandle) -> bool {
        self.entries.remove(&(kind, handle)).is_some()
    }

    /// Delete the device objects of every dropped owner
    ///
    /// Entries whose owner moved on to another allocation are dropped without a
    /// device call. Returns the number of deleted objects.
    pub fn sweep_unreferenced(&mut self, device: &mut dyn DeviceDriver) -> usize {
        self.sweep_unreferenced_with(device, |_, _| {})
    }

    /// Like [`sweep_unreferenced`](Self::sweep_unreferenced), reporting each deletion to `on_delete`
    pub fn sweep_unreferenced_with(
        &mut self,
        device: &mut dyn DeviceDriver,
        mut on_delete: impl FnMut(ObjectKind, ObjectHandle),
    ) -> usize {
        let mut deleted = 0;
        self.entries.retain(|&(kind, handle), entry| match entry.cell.upgrade() {
            None => {
                log::trace!("Deleting unreferenced {}", entry.label);
                device.delete_object(kind, handle);
                on_delete(kind, handle);
                deleted += 1;
                false
            }
            Some(cell) => cell.handle() == Some(handle),
        });
        if deleted > 0 {
            log::debug!("{} device objects were deleted", deleted);
        }
        deleted
    }

    /// Delete every tracked object, reachable or not
    ///
    /// Live owners are reset so a later upload allocates again.
    pub fn delete_all(&mut self, device: &mut dyn DeviceDriver) -> usize {
        let mut deleted = 0;
        for ((kind, handle), entry) in self.entries.drain() {
            let still_owned = match entry.cell.upgrade() {
                Some(cell) => cell.reset_if(handle),
                None => true,
            };
            if still_owned {
                device.delete_object(kind, handle);
                deleted += 1;
            }
        }
        log::debug!("Deleted all {} device objects", deleted);
        deleted
    }

    /// Forget every allocation after the device context was lost
    ///
    /// Live owners are reset to unset and dirty; no device call is made.
    pub fn reset_all(&mut self) -> usize {
        let mut reset = 0;
        for ((_, handle), entry) in self.entries.drain() {
            if let Some(cell) = entry.cell.upgrade() {
                if cell.reset_if(handle) {
                    reset += 1;
                }
            }
        }
        log::debug!("Reset {} device objects", reset);
        reset
    }
}

impl std::fmt::Debug for ResourceLifecycleTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLifecycleTracker")
            .field("entries", &self.entries.len())
            .finish()
    }
}
