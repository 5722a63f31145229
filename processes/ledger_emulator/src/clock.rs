//! Ledger clock: slot, block height, epoch and POSIX time
use emulator_common::{calculations::SlotConfig, Epoch, Slot};

/// Slots added by one block
pub const SLOTS_PER_BLOCK: u64 = 20;

/// Point in ledger time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub slot: Slot,
    pub block: u64,
    pub epoch: Epoch,
    /// POSIX ms
    pub time: u64,
}

/// Monotonic clock over a slot configuration
#[derive(Debug, Clone)]
pub struct LedgerClock {
    config: SlotConfig,
    slot: Slot,
    block: u64,
}

impl LedgerClock {
    pub fn new(config: SlotConfig) -> Self {
        Self {
            slot: config.zero_slot,
            block: 0,
            config,
        }
    }

    pub fn now(&self) -> Clock {
        Clock {
            slot: self.slot,
            block: self.block,
            epoch: self.epoch(),
            time: self.config.slot_to_time(self.slot),
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch_at(self.slot)
    }

    pub fn epoch_at(&self, slot: Slot) -> Epoch {
        self.config.slot_to_epoch(slot)
    }

    /// Slot that starts the epoch after the current one
    pub fn next_epoch_slot(&self) -> Slot {
        self.config.epoch_first_slot(self.epoch() + 1)
    }

    /// Produce one block at `slot`. The caller guarantees `slot` is ahead.
    pub(crate) fn tick_to(&mut self, slot: Slot) {
        self.slot = slot;
        self.block += 1;
    }
}
