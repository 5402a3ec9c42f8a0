use crate::error::{CorrelationError, Result};
use serde::{Deserialize, Serialize};

/// Logical role of a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferRole {
    Input,
    TargetDeviations,
    GenerationPool,
    Working,
    Scratch,
    BestFit,
    GeneratedValues,
    BestFitValues,
}

/// Handle to an arena allocation.
///
/// Handles carry the epoch of the slot they were issued for, so a handle kept
/// past `release` is rejected instead of reaching the slot's next tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    index: usize,
    epoch: u32,
    role: BufferRole,
    len: usize,
}

impl BufferHandle {
    pub fn role(&self) -> BufferRole {
        self.role
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
struct Slot {
    role: BufferRole,
    epoch: u32,
    live: bool,
    mapped: bool,
    data: Vec<f32>,
}

/// Device memory arena. Every allocation is owned by exactly one slot.
#[derive(Debug, Default)]
pub struct BufferArena {
    slots: Vec<Slot>,
}

impl BufferArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, role: BufferRole, len: usize) -> Result<BufferHandle> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            CorrelationError::fault(format!(
                "could not allocate {:?} buffer of {} values ({})",
                role, len, e
            ))
        })?;
        data.resize(len, 0.0);

        let index = match self.slots.iter().position(|slot| !slot.live) {
            Some(free) => {
                let slot = &mut self.slots[free];
                slot.epoch = slot.epoch.wrapping_add(1);
                slot.role = role;
                slot.live = true;
                slot.mapped = false;
                slot.data = data;
                free
            }
            None => {
                self.slots.push(Slot {
                    role,
                    epoch: 0,
                    live: true,
                    mapped: false,
                    data,
                });
                self.slots.len() - 1
            }
        };

        Ok(BufferHandle {
            index,
            epoch: self.slots[index].epoch,
            role,
            len,
        })
    }

    pub fn release(&mut self, handle: BufferHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if slot.mapped {
            return Err(CorrelationError::fault(format!(
                "{:?} buffer released while still mapped",
                handle.role
            )));
        }
        slot.live = false;
        slot.data = Vec::new();
        Ok(())
    }

    /// Check out `handles` exclusively for the duration of `f`.
    ///
    /// Fails when a handle is stale, when a buffer is mapped for host reading,
    /// or when the same allocation appears twice.
    pub fn with_buffers<const N: usize, T>(
        &mut self,
        handles: [BufferHandle; N],
        f: impl FnOnce(&mut [Vec<f32>; N]) -> Result<T>,
    ) -> Result<T> {
        for (i, handle) in handles.iter().enumerate() {
            let slot = self.slot(*handle)?;
            if slot.mapped {
                return Err(CorrelationError::fault(format!(
                    "{:?} buffer is mapped for host access",
                    handle.role
                )));
            }
            if handles[..i].iter().any(|other| other.index == handle.index) {
                return Err(CorrelationError::fault(format!(
                    "{:?} buffer aliased within one operation",
                    handle.role
                )));
            }
        }

        let mut buffers: [Vec<f32>; N] =
            handles.map(|handle| std::mem::take(&mut self.slots[handle.index].data));

        let result = f(&mut buffers);

        for (handle, buffer) in handles.iter().zip(buffers) {
            self.slots[handle.index].data = buffer;
        }

        result
    }

    /// Blocking copy of the buffer contents.
    pub fn read(&self, handle: BufferHandle) -> Result<Vec<f32>> {
        Ok(self.slot(handle)?.data.clone())
    }

    pub fn map(&mut self, handle: BufferHandle) -> Result<Vec<f32>> {
        let slot = self.slot_mut(handle)?;
        if slot.mapped {
            return Err(CorrelationError::fault(format!(
                "{:?} buffer is already mapped",
                handle.role
            )));
        }
        slot.mapped = true;
        Ok(slot.data.clone())
    }

    pub fn unmap(&mut self, handle: BufferHandle) {
        if let Ok(slot) = self.slot_mut(handle) {
            slot.mapped = false;
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }

    fn slot(&self, handle: BufferHandle) -> Result<&Slot> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.live && slot.epoch == handle.epoch && slot.role == handle.role)
            .ok_or_else(|| stale(handle))
    }

    fn slot_mut(&mut self, handle: BufferHandle) -> Result<&mut Slot> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.live && slot.epoch == handle.epoch && slot.role == handle.role)
            .ok_or_else(|| stale(handle))
    }
}

fn stale(handle: BufferHandle) -> CorrelationError {
    CorrelationError::fault(format!("stale {:?} buffer handle", handle.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_reuses_released_slot() {
        let mut arena = BufferArena::new();
        let first = arena.allocate(BufferRole::Working, 4).unwrap();
        arena.release(first).unwrap();

        let second = arena.allocate(BufferRole::Scratch, 8).unwrap();
        assert_eq!(arena.live_buffers(), 1);
        assert!(arena.read(first).is_err());
        assert_eq!(arena.read(second).unwrap().len(), 8);
    }

    #[test]
    fn test_aliasing_rejected() {
        let mut arena = BufferArena::new();
        let handle = arena.allocate(BufferRole::Working, 4).unwrap();
        let result = arena.with_buffers([handle, handle], |_| Ok(()));
        assert!(matches!(result, Err(CorrelationError::AcceleratorFault(_))));
        // The failed checkout must leave the contents in place
        assert_eq!(arena.read(handle).unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_mapped_buffer_is_locked() {
        let mut arena = BufferArena::new();
        let handle = arena.allocate(BufferRole::GeneratedValues, 2).unwrap();
        arena.map(handle).unwrap();

        assert!(arena.with_buffers([handle], |_| Ok(())).is_err());
        assert!(arena.release(handle).is_err());

        arena.unmap(handle);
        assert!(arena.with_buffers([handle], |_| Ok(())).is_ok());
    }

    #[test]
    fn test_with_buffers_restores_data() {
        let mut arena = BufferArena::new();
        let a = arena.allocate(BufferRole::Working, 2).unwrap();
        let b = arena.allocate(BufferRole::Scratch, 2).unwrap();

        arena
            .with_buffers([a, b], |buffers| {
                let [a, b] = buffers;
                a[0] = 1.0;
                b[1] = 2.0;
                Ok(())
            })
            .unwrap();

        assert_eq!(arena.read(a).unwrap(), vec![1.0, 0.0]);
        assert_eq!(arena.read(b).unwrap(), vec![0.0, 2.0]);
    }
}
