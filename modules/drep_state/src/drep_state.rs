//! Ledger emulator DRep state module
//! Registry of DReps with their deposits and activity

mod state;

pub use state::State as DRepState;
