//! Ledger emulator process
//! Wires the state modules and the validator into a deterministic, in-process ledger

mod clock;
mod emulator;
mod error;
mod timer;

pub use clock::{Clock, SLOTS_PER_BLOCK};
pub use emulator::Emulator;
pub use error::EmulatorError;
pub use timer::BlockTimer;

pub use emulator_module_tx_validator::{DeclaredBudgetEvaluator, Evaluator};
