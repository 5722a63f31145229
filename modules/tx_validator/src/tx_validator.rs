//! Ledger emulator transaction validator module
//! Decides whether a transaction is accepted and computes what accepting it changes

pub mod certificates;
mod context;
mod evaluator;
pub mod fees;
mod governance;
pub mod utxo;
mod validate;
mod witnesses;

pub use context::{LedgerContext, ScratchLedger, StagedDelta};
pub use evaluator::{DeclaredBudgetEvaluator, Evaluator};
pub use validate::validate_and_stage;
