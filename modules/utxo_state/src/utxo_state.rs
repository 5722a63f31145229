//! Ledger emulator UTxO state module
//! Holds the flushed UTxO set, the datum table and the pending block

mod mempool;
mod state;

pub use mempool::{Mempool, PendingTx, PendingView};
pub use state::{UTxOLookup, UTxOStore};
