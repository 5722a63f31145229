//! The emulator: owns the ledger, mempool, clock and governance state, and exposes
//! submission, time and query operations over them
use crate::clock::{Clock, LedgerClock, SLOTS_PER_BLOCK};
use crate::error::EmulatorError;
use anyhow::anyhow;
use emulator_common::{
    configuration::EmulatorConfig,
    protocol_params::{MinFeeReferenceScripts, ProtocolParams},
    Address, Committee, Constitution, DRepCredential, DRepRecord, DatumHash, Epoch, Hash,
    GovActionId, Lovelace, PlutusData, PoolId, PoolRegistration, ScriptHash, ScriptRef, Slot,
    StakeAddress, Transaction, TxHash, TxOutput, UTxOIdentifier, Value,
};
use emulator_module_accounts_state::{AccountState, AccountsState, Pots};
use emulator_module_drep_state::DRepState;
use emulator_module_governance_state::{EnactContext, GovernanceState, Proposal};
use emulator_module_tx_validator::{
    validate_and_stage, DeclaredBudgetEvaluator, Evaluator, LedgerContext, StagedDelta,
};
use emulator_module_utxo_state::{Mempool, UTxOLookup, UTxOStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transaction id carried by outputs inserted with [`Emulator::fund_address`]
const GENESIS_TX_HASH: TxHash = Hash::new([0; 32]);

pub struct Emulator {
    config: EmulatorConfig,
    clock: LedgerClock,

    /// Flushed UTxO set and datum table
    store: UTxOStore,

    /// Transactions accepted since the last block
    mempool: Mempool,

    accounts: AccountsState,
    dreps: DRepState,
    governance: GovernanceState,

    /// Current protocol parameters, updated by enacted parameter changes
    params: ProtocolParams,
    ref_script_fee: MinFeeReferenceScripts,

    /// Named test wallets
    wallets: BTreeMap<String, Address>,

    /// Outputs inserted directly so far, used as their output index
    genesis_outputs: u64,

    evaluator: Arc<dyn Evaluator>,
}

impl Emulator {
    /// Emulator whose scripts all succeed within their declared budgets
    pub fn new(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        Self::with_evaluator(config, Arc::new(DeclaredBudgetEvaluator))
    }

    pub fn with_evaluator(
        config: EmulatorConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self, EmulatorError> {
        config.validate().map_err(|e| EmulatorError::Config(format!("{e:#}")))?;
        info!(
            network = ?config.network,
            bootstrap = config.bootstrap,
            slots_per_epoch = config.slot.slots_per_epoch,
            "Creating ledger emulator"
        );
        Ok(Self {
            clock: LedgerClock::new(config.slot),
            store: UTxOStore::new(),
            mempool: Mempool::new(),
            accounts: AccountsState::new(config.initial_treasury),
            dreps: DRepState::new(),
            governance: GovernanceState::new(config.bootstrap),
            params: config.protocol_params.clone(),
            ref_script_fee: config.ref_script_fee.clone(),
            wallets: BTreeMap::new(),
            genesis_outputs: 0,
            evaluator,
            config,
        })
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    // -- Submission --

    /// Validate a transaction against the ledger plus the pending block and, if accepted,
    /// stage it for the next block. A rejected transaction leaves everything unchanged.
    pub async fn submit(&mut self, tx: &Transaction) -> Result<TxHash, EmulatorError> {
        let now = self.clock.now();
        let staged = {
            let view = self.mempool.view(&self.store);
            let ctx = LedgerContext {
                utxos: &view,
                accounts: &self.accounts,
                dreps: &self.dreps,
                governance: &self.governance,
                params: &self.params,
                ref_script_fee: &self.ref_script_fee,
                network: self.config.network,
                slot: now.slot,
                epoch: now.epoch,
            };
            validate_and_stage(&ctx, tx, self.evaluator.as_ref()).await
        };

        match staged {
            Ok(delta) => self.commit(delta, now.epoch),
            Err(error) => {
                warn!("Rejected transaction {}: {error}", tx.id());
                Err(EmulatorError::Validation(error))
            }
        }
    }

    fn commit(&mut self, delta: StagedDelta, epoch: Epoch) -> Result<TxHash, EmulatorError> {
        self.mempool.stage(delta.pending_tx())?;

        let StagedDelta {
            tx_hash,
            proposals,
            votes,
            ledger,
            ..
        } = delta;
        self.accounts = ledger.accounts;
        self.dreps = ledger.dreps;
        *self.governance.committee_mut() = ledger.committee;

        let lifetime = self.params.governance_action_validity_period;
        for (id, procedure) in &proposals {
            self.governance.add_proposal(*id, procedure, epoch, lifetime)?;
        }
        for (voter, id, procedure) in &votes {
            self.governance.record_vote(voter, id, procedure)?;
        }

        debug!(
            "Committed {tx_hash}: {} proposals, {} votes, {} pending",
            proposals.len(),
            votes.len(),
            self.mempool.len()
        );
        Ok(tx_hash)
    }

    // -- Time --

    /// Produce one block at `slot`, which must be ahead of the current slot
    pub fn advance_to_slot(&mut self, slot: Slot) -> Result<(), EmulatorError> {
        let current = self.clock.slot();
        if slot <= current {
            return Err(EmulatorError::TimeTravel {
                current,
                target: slot,
            });
        }
        self.produce_block(slot)
    }

    pub fn advance_one_block(&mut self) -> Result<(), EmulatorError> {
        self.produce_block(self.clock.slot() + SLOTS_PER_BLOCK)
    }

    /// Produce one block at the first slot of the next epoch
    pub fn advance_to_epoch_boundary(&mut self) -> Result<(), EmulatorError> {
        self.produce_block(self.clock.next_epoch_slot())
    }

    /// Produce a block if the transaction is still pending. Returns whether one was produced.
    pub fn await_confirmation(&mut self, tx_hash: &TxHash) -> Result<bool, EmulatorError> {
        if !self.mempool.is_pending(tx_hash) {
            return Ok(false);
        }
        self.advance_one_block()?;
        Ok(true)
    }

    fn produce_block(&mut self, slot: Slot) -> Result<(), EmulatorError> {
        let from_epoch = self.clock.epoch();
        if self.clock.epoch_at(slot) > from_epoch {
            self.check_fee_split()?;
        }
        self.clock.tick_to(slot);
        let flushed = self.mempool.flush(&mut self.store)?;

        let now = self.clock.now();
        debug!(
            slot = now.slot,
            block = now.block,
            "Block produced with {} transactions",
            flushed.len()
        );

        for epoch in from_epoch..now.epoch {
            self.close_epoch(epoch)?;
        }
        Ok(())
    }

    /// Fail before anything moves if the fee pot cannot cover the treasury share.
    /// Later boundaries in the same block only see a smaller pot.
    fn check_fee_split(&self) -> Result<(), EmulatorError> {
        let fees = self.accounts.get_pots().fees;
        let cut = self.accounts.treasury_fee_share(&self.config.treasury_fee_share)?;
        if cut > fees {
            return Err(anyhow!("Treasury share {cut} exceeds the fee pot {fees}").into());
        }
        Ok(())
    }

    /// Boundary work for the end of `epoch`: governance, fee transfer, stake snapshot
    fn close_epoch(&mut self, epoch: Epoch) -> Result<(), EmulatorError> {
        let mut ctx = EnactContext {
            accounts: &mut self.accounts,
            dreps: &mut self.dreps,
            params: &mut self.params,
            ref_script_fee: &mut self.ref_script_fee,
        };
        self.governance.process_epoch_boundary(epoch, &mut ctx)?;
        self.accounts.transfer_fees(&self.config.treasury_fee_share)?;
        self.accounts.take_snapshot(epoch);

        let pots = self.accounts.get_pots();
        info!(
            epoch = epoch + 1,
            treasury = pots.treasury,
            deposits = pots.deposits,
            "New epoch"
        );
        Ok(())
    }

    // -- Queries --

    pub fn clock(&self) -> Clock {
        self.clock.now()
    }

    /// Unspent outputs of flushed blocks; pending transactions are not included
    pub fn utxos(&self) -> Vec<(UTxOIdentifier, TxOutput)> {
        self.store.utxos()
    }

    pub fn utxo(&self, input: &UTxOIdentifier) -> Option<TxOutput> {
        self.store.lookup_utxo(input)
    }

    pub fn utxos_at(&self, address: &Address) -> Vec<(UTxOIdentifier, TxOutput)> {
        self.store.utxos_at(address)
    }

    pub fn is_pending(&self, tx_hash: &TxHash) -> bool {
        self.mempool.is_pending(tx_hash)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn ref_script_fee(&self) -> &MinFeeReferenceScripts {
        &self.ref_script_fee
    }

    pub fn account(&self, stake_address: &StakeAddress) -> Option<AccountState> {
        self.accounts.get_account(stake_address)
    }

    pub fn drep(&self, credential: &DRepCredential) -> Option<DRepRecord> {
        self.dreps.get_drep(credential)
    }

    pub fn pool(&self, pool: &PoolId) -> Option<PoolRegistration> {
        self.accounts.get_pool(pool)
    }

    /// A proposal with its status and last tally
    pub fn proposal(&self, id: &GovActionId) -> Option<Proposal> {
        self.governance.get_proposal(id)
    }

    pub fn proposals(&self) -> &[Proposal] {
        self.governance.list_proposals()
    }

    pub fn committee(&self) -> &Committee {
        &self.governance.committee().committee
    }

    pub fn constitution(&self) -> &Constitution {
        self.governance.constitution()
    }

    pub fn governance(&self) -> &GovernanceState {
        &self.governance
    }

    pub fn pots(&self) -> Pots {
        self.accounts.get_pots()
    }

    /// Treasury share of the fees collected so far this epoch
    pub fn treasury_fee_share(&self) -> Result<Lovelace, EmulatorError> {
        Ok(self
            .accounts
            .treasury_fee_share(&self.config.treasury_fee_share)?)
    }

    pub fn datum(&self, hash: &DatumHash) -> Option<PlutusData> {
        self.store.datum(hash)
    }

    /// Script carried as a reference script by an unspent output
    pub fn script(&self, hash: &ScriptHash) -> Option<ScriptRef> {
        self.store.script_by_hash(hash)
    }

    // -- Setup --

    /// Insert an output straight into the ledger, visible immediately
    pub fn fund_address(
        &mut self,
        address: Address,
        value: Value,
    ) -> Result<UTxOIdentifier, EmulatorError> {
        let input = UTxOIdentifier::new(GENESIS_TX_HASH, self.genesis_outputs);
        debug!("Funding {input} with {}", value.coin());
        self.store.add_utxo(input, TxOutput::new(address, value))?;
        self.genesis_outputs += 1;
        Ok(input)
    }

    pub fn register_wallet(&mut self, name: &str, address: Address) {
        if self.wallets.insert(name.to_string(), address).is_some() {
            debug!("Wallet {name} replaced");
        }
    }

    pub fn wallet(&self, name: &str) -> Result<&Address, EmulatorError> {
        self.wallets
            .get(name)
            .ok_or_else(|| EmulatorError::UnknownWallet(name.to_string()))
    }

    pub fn fund_wallet(&mut self, name: &str, value: Value) -> Result<UTxOIdentifier, EmulatorError> {
        let address = self.wallet(name)?.clone();
        self.fund_address(address, value)
    }

    /// Add to a reward balance, registering the account without a deposit if needed
    pub fn credit_rewards(
        &mut self,
        stake_address: &StakeAddress,
        amount: Lovelace,
    ) -> Result<(), EmulatorError> {
        if !self.accounts.is_registered(stake_address) {
            self.accounts.register_stake_address(stake_address, 0)?;
        }
        self.accounts.add_rewards(stake_address, amount)?;
        Ok(())
    }

    /// Replace the committee; hot key authorizations of removed members are dropped
    pub fn set_committee(&mut self, committee: Committee) {
        info!(members = committee.members.len(), "Committee set");
        self.governance.set_committee(committee);
    }

    pub fn set_bootstrap(&mut self, bootstrap: bool) {
        self.governance.set_bootstrap(bootstrap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::rational_number::RationalNumber;
    use emulator_test_utils::{ada_output, signed, transfer, TestWallet};

    fn emulator() -> Emulator {
        Emulator::new(EmulatorConfig::default()).unwrap()
    }

    #[test]
    fn funded_outputs_are_visible_at_once() -> Result<(), EmulatorError> {
        let mut emulator = emulator();
        let alice = TestWallet::new("alice");
        let first = emulator.fund_address(alice.address(), Value::lovelace(5_000_000))?;
        let second = emulator.fund_address(alice.address(), Value::lovelace(7_000_000))?;

        assert_ne!(first, second);
        assert_eq!(emulator.utxos_at(&alice.address()).len(), 2);
        assert_eq!(emulator.utxo(&second).map(|o| o.value.coin()), Some(7_000_000));
        Ok(())
    }

    #[test]
    fn time_travel_is_rejected() -> Result<(), EmulatorError> {
        let mut emulator = emulator();
        emulator.advance_to_slot(100)?;

        let error = emulator.advance_to_slot(100).unwrap_err();
        assert!(matches!(
            error,
            EmulatorError::TimeTravel {
                current: 100,
                target: 100
            }
        ));
        assert!(emulator.advance_to_slot(50).is_err());
        assert_eq!(emulator.clock().block, 1);
        Ok(())
    }

    #[test]
    fn epoch_boundary_opens_the_next_epoch() -> Result<(), EmulatorError> {
        let mut emulator = emulator();
        emulator.advance_to_epoch_boundary()?;

        let clock = emulator.clock();
        assert_eq!(clock.epoch, 1);
        assert_eq!(clock.slot, 432_000);
        assert_eq!(clock.time, 432_000_000);
        Ok(())
    }

    #[test]
    fn unknown_wallet() {
        let mut emulator = emulator();
        emulator.register_wallet("alice", TestWallet::new("alice").address());
        assert!(emulator.wallet("alice").is_ok());
        assert!(matches!(
            emulator.fund_wallet("bob", Value::lovelace(1)),
            Err(EmulatorError::UnknownWallet(name)) if name == "bob"
        ));
    }

    #[test]
    fn unusable_configuration_is_rejected() {
        let mut config = EmulatorConfig::default();
        config.slot.slots_per_epoch = 0;
        assert!(matches!(Emulator::new(config), Err(EmulatorError::Config(_))));

        let mut config = EmulatorConfig::default();
        config.treasury_fee_share = RationalNumber::new(3, 2);
        assert!(matches!(Emulator::new(config), Err(EmulatorError::Config(_))));
    }

    #[test]
    fn credit_rewards_registers_the_account() -> Result<(), EmulatorError> {
        let mut emulator = emulator();
        let alice = TestWallet::new("alice");
        emulator.credit_rewards(&alice.stake_address(), 10)?;
        emulator.credit_rewards(&alice.stake_address(), 5)?;

        let account = emulator.account(&alice.stake_address());
        assert_eq!(account.map(|a| (a.rewards, a.deposit)), Some((15, 0)));
        Ok(())
    }

    #[tokio::test]
    async fn fees_reach_the_treasury_at_the_boundary() -> Result<(), EmulatorError> {
        let mut emulator = emulator();
        let alice = TestWallet::new("alice");
        let bob = TestWallet::new("bob");
        let input = emulator.fund_address(alice.address(), Value::lovelace(10_000_000))?;

        let body = transfer(
            input,
            10_000_000,
            vec![ada_output(bob.address(), 2_000_000)],
            &alice.address(),
            200_000,
        );
        emulator.submit(&signed(body, &[alice.payment_key()])).await?;
        assert_eq!(emulator.pots().fees, 200_000);
        assert_eq!(emulator.treasury_fee_share()?, 200_000);

        emulator.advance_to_epoch_boundary()?;
        let pots = emulator.pots();
        assert_eq!((pots.fees, pots.treasury), (0, 200_000));
        Ok(())
    }
}
