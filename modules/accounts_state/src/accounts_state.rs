//! Ledger emulator accounts state module
//! Reward accounts, pools, pots and the stake snapshots ratification reads

mod monetary;
mod snapshot;
mod state;

pub use monetary::Pots;
pub use snapshot::StakeSnapshot;
pub use state::{AccountState, PoolState, State as AccountsState};
