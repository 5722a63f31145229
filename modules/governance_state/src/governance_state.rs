//! Ledger emulator governance state module
//! Proposals and votes, the constitutional committee and constitution, and the
//! ratification and enactment run at each epoch boundary

mod committee;
mod conway_voting;
mod state;
mod voting_state;

pub use committee::CommitteeState;
pub use conway_voting::{committee_hot_credential, Proposal};
pub use state::{EnactContext, EpochOutcome, State as GovernanceState};
pub use voting_state::VotingRules;
