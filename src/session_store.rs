//! In-memory angle slots for one assessment session.

use crate::{
    error::AcquisitionError,
    movement::{Side, SLOTS_PER_SIDE},
    rom::{self, RomResult},
};

/// Eight slots per side, `None` until a measurement lands.
pub type SideSlots = [Option<f64>; SLOTS_PER_SIDE];

/// Owns every angle recorded this session. Nothing is persisted; a slot is
/// only ever overwritten by a newer measurement or cleared by
/// [`SessionStore::reset_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStore {
    slots: [SideSlots; 2],
}

impl SessionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The angle at `(side, index)`, `None` if unset or out of range.
    pub fn get_slot(&self, side: Side, index: usize) -> Option<f64> {
        self.slots[side.index()].get(index).copied().flatten()
    }

    /// Records `value` at `(side, index)`, replacing any previous angle.
    pub fn set_slot(&mut self, side: Side, index: usize, value: f64) -> Result<(), AcquisitionError> {
        let slot = self.slots[side.index()]
            .get_mut(index)
            .ok_or(AcquisitionError::InvalidSlot(index))?;
        *slot = Some(value);
        Ok(())
    }

    /// Clears all sixteen slots.
    pub fn reset_all(&mut self) {
        self.slots = [[None; SLOTS_PER_SIDE]; 2];
    }

    /// A copy of one side's slots.
    pub fn snapshot_side(&self, side: Side) -> SideSlots {
        self.slots[side.index()]
    }

    /// ROM for one side, derived from the current slots.
    pub fn rom(&self, side: Side) -> RomResult {
        rom::compute(&self.slots[side.index()])
    }
}
