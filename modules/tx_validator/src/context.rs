//! What validation reads, and what an accepted transaction changes

use emulator_common::{
    protocol_params::{MinFeeReferenceScripts, ProtocolParams},
    Epoch, GovActionId, Lovelace, NetworkId, PlutusData, ProposalProcedure, Slot, TxHash,
    TxOutput, UTxOIdentifier, Voter, VotingProcedure,
};
use emulator_module_accounts_state::AccountsState;
use emulator_module_drep_state::DRepState;
use emulator_module_governance_state::{CommitteeState, GovernanceState};
use emulator_module_utxo_state::{PendingTx, UTxOLookup};

/// Read-only view of the ledger a transaction is validated against
pub struct LedgerContext<'a, L: UTxOLookup> {
    /// Unspent outputs, including those of transactions still pending in the block
    pub utxos: &'a L,
    pub accounts: &'a AccountsState,
    pub dreps: &'a DRepState,
    pub governance: &'a GovernanceState,
    pub params: &'a ProtocolParams,
    pub ref_script_fee: &'a MinFeeReferenceScripts,
    pub network: NetworkId,

    /// Current slot, checked against the validity interval
    pub slot: Slot,
    pub epoch: Epoch,
}

impl<'a, L: UTxOLookup> LedgerContext<'a, L> {
    /// Clones of the mutable registries, for certificates and withdrawals to run against
    pub fn scratch(&self) -> ScratchLedger {
        ScratchLedger {
            accounts: self.accounts.clone(),
            dreps: self.dreps.clone(),
            committee: self.governance.committee().clone(),
        }
    }
}

/// Registry state as it would be after the transaction. Dropped if validation fails,
/// swapped in when the transaction is accepted.
#[derive(Debug, Clone)]
pub struct ScratchLedger {
    pub accounts: AccountsState,
    pub dreps: DRepState,
    pub committee: CommitteeState,
}

/// Every effect of an accepted transaction, ready to be committed
#[derive(Debug, Clone)]
pub struct StagedDelta {
    pub tx_hash: TxHash,
    pub consumes: Vec<UTxOIdentifier>,
    pub produces: Vec<(UTxOIdentifier, TxOutput)>,
    pub datums: Vec<PlutusData>,
    pub fee: Lovelace,
    pub donation: Lovelace,
    pub proposals: Vec<(GovActionId, ProposalProcedure)>,
    pub votes: Vec<(Voter, GovActionId, VotingProcedure)>,

    /// Registries with withdrawals, certificates, deposits, fee and donation applied
    pub ledger: ScratchLedger,
}

impl StagedDelta {
    /// UTxO part of the delta, for the pending block
    pub fn pending_tx(&self) -> PendingTx {
        PendingTx {
            tx_hash: self.tx_hash,
            consumes: self.consumes.clone(),
            produces: self.produces.clone(),
            datums: self.datums.clone(),
        }
    }
}
