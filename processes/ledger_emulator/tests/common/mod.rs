//! Shared harness: one funded wallet whose change output feeds every transaction
#![allow(dead_code)]

use emulator_common::{
    configuration::EmulatorConfig, crypto::ed25519::SecretKey, Anchor, DRepChoice,
    DRepRegistration, GovActionId, GovernanceAction, Lovelace, ProposalProcedure, TransactionBody,
    TxCertificate, TxHash, UTxOIdentifier, Value, Vote, VoteDelegation, Voter, VotingProcedure,
};
use emulator_test_utils::{signed, transfer, TestWallet};
use ledger_emulator::{Emulator, EmulatorError};

pub const FUNDS: Lovelace = 1_000_000_000_000;
pub const FEE: Lovelace = 500_000;

/// Reward balance delegated to the harness DRep
pub const STAKE: Lovelace = 5_000_000_000;

pub struct Harness {
    pub emulator: Emulator,
    pub alice: TestWallet,

    /// Alice's latest change output and its value
    change: (UTxOIdentifier, Lovelace),
}

impl Harness {
    pub fn new(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        let mut emulator = Emulator::new(config)?;
        let alice = TestWallet::new("alice");
        emulator.register_wallet("alice", alice.address());
        let input = emulator.fund_wallet("alice", Value::lovelace(FUNDS))?;
        Ok(Self {
            emulator,
            alice,
            change: (input, FUNDS),
        })
    }

    /// Submit a transaction spending Alice's change, with `deposits` taken out of it,
    /// shaped by `build` and signed by Alice plus `keys`
    pub async fn submit(
        &mut self,
        deposits: Lovelace,
        keys: &[&SecretKey],
        build: impl FnOnce(&mut TransactionBody),
    ) -> Result<TxHash, EmulatorError> {
        let (input, value) = self.change;
        let available = value - deposits;
        let mut body = transfer(input, available, vec![], &self.alice.address(), FEE);
        build(&mut body);

        let mut signers = vec![self.alice.payment_key()];
        signers.extend_from_slice(keys);
        let tx = signed(body, &signers);

        let tx_hash = self.emulator.submit(&tx).await?;
        self.change = (UTxOIdentifier::new(tx_hash, 0), available - FEE);
        Ok(tx_hash)
    }

    pub async fn register_account(&mut self, wallet: &TestWallet) -> Result<TxHash, EmulatorError> {
        let account = wallet.stake_address();
        let deposit = self.emulator.params().key_deposit;
        self.submit(deposit, &[], |body| {
            body.certificates.push(TxCertificate::StakeRegistration(account));
        })
        .await
    }

    /// Register `wallet`'s stake account and DRep, delegate the account to that DRep and
    /// give it `STAKE` of reward balance
    pub async fn register_drep(&mut self, wallet: &TestWallet) -> Result<(), EmulatorError> {
        let params = self.emulator.params().clone();
        let account = wallet.stake_address();
        let credential = wallet.stake_credential();
        self.submit(params.key_deposit + params.drep_deposit, &[wallet.stake_key()], |body| {
            body.certificates.push(TxCertificate::StakeRegistration(account));
            body.certificates.push(TxCertificate::DRepRegistration(DRepRegistration {
                credential,
                deposit: params.drep_deposit,
                anchor: None,
            }));
            body.certificates.push(TxCertificate::VoteDelegation(VoteDelegation {
                stake_address: account,
                drep: DRepChoice::from(credential),
            }));
        })
        .await?;
        self.emulator.credit_rewards(&account, STAKE)
    }

    /// Propose `action` with Alice's stake account as the return account
    pub async fn propose(&mut self, action: GovernanceAction) -> Result<GovActionId, EmulatorError> {
        let deposit = self.emulator.params().governance_action_deposit;
        let procedure = ProposalProcedure {
            deposit,
            reward_account: self.alice.stake_address(),
            gov_action: action,
            anchor: Anchor::default(),
        };
        let tx_hash = self
            .submit(deposit, &[], |body| body.proposal_procedures.push(procedure))
            .await?;
        Ok(GovActionId::new(tx_hash, 0))
    }

    pub async fn vote(
        &mut self,
        voter: Voter,
        key: &SecretKey,
        id: GovActionId,
        vote: Vote,
    ) -> Result<TxHash, EmulatorError> {
        self.submit(0, &[key], |body| {
            body.voting_procedures
                .insert(voter, [(id, VotingProcedure { vote, anchor: None })].into());
        })
        .await
    }

    pub fn advance_epochs(&mut self, count: u64) -> Result<(), EmulatorError> {
        for _ in 0..count {
            self.emulator.advance_to_epoch_boundary()?;
        }
        Ok(())
    }

    pub fn rewards(&self, wallet: &TestWallet) -> Lovelace {
        self.emulator.account(&wallet.stake_address()).map_or(0, |a| a.rewards)
    }
}
