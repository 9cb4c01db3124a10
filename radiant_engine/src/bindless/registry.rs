/// BindlessRegistry — per-class slot allocation with frame-deferred
/// recycling.
///
/// Each resource class owns one slot space bounded by its declared
/// array capacity. A fresh slot is minted the first time; afterwards
/// allocation prefers slots whose quarantine has expired. A freed slot
/// sits in quarantine until `frames_in_flight` more frames have begun,
/// so no in-flight command buffer can still reference it when it is
/// reassigned. Indices are allocated and freed only on the render
/// thread.

use crate::error::{Error, Result};

/// Stable index into one of the global bindless arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindlessIndex(u32);

impl BindlessIndex {
    /// The null resource. Shaders treat it as "absent" (e.g. skybox
    /// disabled).
    pub const NULL: BindlessIndex = BindlessIndex(u32::MAX);

    /// Raw value pushed to the GPU.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Whether this is the null index.
    pub fn is_null(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// The global arrays a slot can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    SampledTexture,
    StorageImage,
    AccelerationStructure,
    /// Cascade-level infos and camera data, read by slot index
    UniformBuffer,
}

impl ResourceClass {
    fn ordinal(&self) -> usize {
        match self {
            ResourceClass::SampledTexture => 0,
            ResourceClass::StorageImage => 1,
            ResourceClass::AccelerationStructure => 2,
            ResourceClass::UniformBuffer => 3,
        }
    }

    /// Declared array capacity for this class; allocation past it is
    /// an `Error::Allocation`.
    fn capacity(&self) -> u32 {
        match self {
            ResourceClass::SampledTexture => 16384,
            ResourceClass::StorageImage => 1024,
            ResourceClass::AccelerationStructure => 16,
            ResourceClass::UniformBuffer => 256,
        }
    }
}

/// Slot bookkeeping for one resource class.
struct ClassState {
    /// Slots whose quarantine expired, ready for reassignment
    reusable: Vec<u32>,
    /// (frame the free was requested in, slot), still quarantined
    quarantine: Vec<(u64, u32)>,
    /// Slots ever minted; also the minimum backing array size
    minted: u32,
    /// Slots currently held by resources (quarantined ones included)
    held: u32,
}

impl ClassState {
    fn take_slot(&mut self, class: ResourceClass) -> Result<BindlessIndex> {
        if self.held >= class.capacity() {
            return Err(Error::Allocation(format!(
                "bindless {:?} array exhausted ({} slots)",
                class,
                class.capacity()
            )));
        }

        let slot = match self.reusable.pop() {
            Some(slot) => slot,
            None => {
                let slot = self.minted;
                self.minted += 1;
                slot
            }
        };
        self.held += 1;
        Ok(BindlessIndex(slot))
    }

    /// Release every quarantined slot whose frame is old enough.
    fn release_expired(&mut self, current_frame: u64, frames_in_flight: u64) {
        let mut i = 0;
        while i < self.quarantine.len() {
            let (freed_in, slot) = self.quarantine[i];
            if current_frame >= freed_in + frames_in_flight + 1 {
                self.quarantine.swap_remove(i);
                self.reusable.push(slot);
                self.held -= 1;
            } else {
                i += 1;
            }
        }
    }
}

/// Per-class slot spaces with deferred recycling.
pub struct BindlessRegistry {
    classes: [ClassState; 4],
    frames_in_flight: u64,
    frame_counter: u64,
}

impl BindlessRegistry {
    /// Create a registry for `frames_in_flight` concurrent frames.
    pub fn new(frames_in_flight: u32) -> Self {
        Self {
            classes: std::array::from_fn(|_| ClassState {
                reusable: Vec::new(),
                quarantine: Vec::new(),
                minted: 0,
                held: 0,
            }),
            frames_in_flight: frames_in_flight as u64,
            frame_counter: 0,
        }
    }

    /// Allocate a slot in `class`.
    pub fn allocate(&mut self, class: ResourceClass) -> Result<BindlessIndex> {
        self.classes[class.ordinal()].take_slot(class)
    }

    /// Quarantine a slot until every frame that may reference it has
    /// completed. Freeing the null index is a no-op.
    pub fn free(&mut self, class: ResourceClass, index: BindlessIndex) {
        if index.is_null() {
            return;
        }
        let state = &mut self.classes[class.ordinal()];
        debug_assert!(
            index.get() < state.minted,
            "bindless {:?} slot {} was never handed out",
            class,
            index.get()
        );
        state.quarantine.push((self.frame_counter, index.get()));
    }

    /// Advance the frame counter and move quarantined slots whose
    /// freeing frame plus every in-flight frame has retired into the
    /// reusable pool.
    pub fn begin_frame(&mut self) {
        self.frame_counter += 1;
        let current_frame = self.frame_counter;
        let frames_in_flight = self.frames_in_flight;
        for state in &mut self.classes {
            state.release_expired(current_frame, frames_in_flight);
        }
    }

    /// Number of slots resources currently hold in `class`
    /// (quarantined slots still count).
    pub fn live_count(&self, class: ResourceClass) -> u32 {
        self.classes[class.ordinal()].held
    }

    /// Minimum backing array capacity for `class`: the highest slot
    /// ever minted plus one.
    pub fn high_water_mark(&self, class: ResourceClass) -> u32 {
        self.classes[class.ordinal()].minted
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
