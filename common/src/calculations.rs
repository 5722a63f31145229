//! Slot, epoch and wall-clock conversions

use crate::types::{Epoch, Slot};

pub const DEFAULT_SLOTS_PER_EPOCH: u64 = 432_000;
pub const DEFAULT_SLOT_LENGTH_MS: u64 = 1_000;

/// Mapping between slots, epochs and POSIX time in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlotConfig {
    /// POSIX time (ms) of `zero_slot`
    pub zero_time: u64,
    pub zero_slot: Slot,
    /// Slot length in ms
    pub slot_length: u64,
    pub slots_per_epoch: u64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            zero_time: 0,
            zero_slot: 0,
            slot_length: DEFAULT_SLOT_LENGTH_MS,
            slots_per_epoch: DEFAULT_SLOTS_PER_EPOCH,
        }
    }
}

impl SlotConfig {
    pub fn slot_to_epoch(&self, slot: Slot) -> Epoch {
        slot.saturating_sub(self.zero_slot) / self.slots_per_epoch
    }

    pub fn epoch_first_slot(&self, epoch: Epoch) -> Slot {
        self.zero_slot + epoch * self.slots_per_epoch
    }

    pub fn slot_to_time(&self, slot: Slot) -> u64 {
        self.zero_time + slot.saturating_sub(self.zero_slot) * self.slot_length
    }

    /// Slot containing the given POSIX time; times before `zero_time` map to `zero_slot`
    pub fn time_to_slot(&self, time: u64) -> Slot {
        self.zero_slot + time.saturating_sub(self.zero_time) / self.slot_length
    }
}

// -- Tests --
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_boundaries() {
        let config = SlotConfig::default();
        assert_eq!(config.slot_to_epoch(0), 0);
        assert_eq!(config.slot_to_epoch(431_999), 0);
        assert_eq!(config.slot_to_epoch(432_000), 1);
        assert_eq!(config.epoch_first_slot(2), 864_000);
    }

    #[test]
    fn offset_slot_zero() {
        let config = SlotConfig {
            zero_time: 1_666_656_000_000,
            zero_slot: 100,
            slot_length: 1_000,
            slots_per_epoch: 10,
        };
        assert_eq!(config.slot_to_epoch(99), 0);
        assert_eq!(config.slot_to_epoch(110), 1);
        assert_eq!(config.slot_to_time(120), 1_666_656_020_000);
        assert_eq!(config.time_to_slot(1_666_656_020_999), 120);
    }
}
