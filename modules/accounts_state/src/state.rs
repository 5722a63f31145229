//! Emulator AccountsState: State storage
use crate::monetary::{calculate_fee_transfer, credit, debit, treasury_fee_cut, Pots};
use crate::snapshot::StakeSnapshot;
use anyhow::{bail, Result};
use emulator_common::{
    rational_number::RationalNumber,
    validation::{ValidationError, ValidationResult},
    DRepChoice, Epoch, KeyHash, Lovelace, PoolId, PoolRegistration, StakeAddress,
};
use imbl::OrdMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of past snapshots kept; ratification only reads the previous epoch's
const SNAPSHOTS_KEPT: usize = 3;

/// State of an individual registered stake address
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AccountState {
    /// Value in reward account
    pub rewards: Lovelace,

    /// Deposit paid at registration, refunded on deregistration
    pub deposit: Lovelace,

    /// SPO ID they are delegated to ("operator" ID)
    pub delegated_spo: Option<PoolId>,

    /// DRep they are delegated to
    pub delegated_drep: Option<DRepChoice>,
}

/// Active pool with the deposit it paid
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PoolState {
    pub registration: PoolRegistration,
    pub deposit: Lovelace,
}

/// Overall state. Maps are persistent so a scratch clone for validation is cheap.
#[derive(Debug, Default, Clone)]
pub struct State {
    /// Registered stake addresses
    accounts: OrdMap<StakeAddress, AccountState>,

    /// Map of active SPOs by pool ID
    spos: OrdMap<PoolId, PoolState>,

    /// Global account pots
    pots: Pots,

    /// Recent stake snapshots by the epoch they close
    snapshots: BTreeMap<Epoch, Arc<StakeSnapshot>>,
}

impl State {
    pub fn new(initial_treasury: Lovelace) -> Self {
        Self {
            pots: Pots {
                treasury: initial_treasury,
                ..Pots::default()
            },
            ..Self::default()
        }
    }

    pub fn get_account(&self, stake_address: &StakeAddress) -> Option<AccountState> {
        self.accounts.get(stake_address).cloned()
    }

    pub fn is_registered(&self, stake_address: &StakeAddress) -> bool {
        self.accounts.contains_key(stake_address)
    }

    pub fn get_pool(&self, pool: &PoolId) -> Option<PoolRegistration> {
        self.spos.get(pool).map(|p| p.registration.clone())
    }

    pub fn is_pool_registered(&self, pool: &PoolId) -> bool {
        self.spos.contains_key(pool)
    }

    /// Resolve a voting key to the pool it operates or co-owns
    pub fn resolve_pool(&self, key_hash: &KeyHash) -> Option<PoolId> {
        if self.spos.contains_key(key_hash) {
            return Some(*key_hash);
        }
        self.spos
            .iter()
            .find(|(_, pool)| pool.registration.pool_owners.contains(key_hash))
            .map(|(id, _)| *id)
    }

    pub fn get_pots(&self) -> Pots {
        self.pots
    }

    pub fn snapshot(&self, epoch: Epoch) -> Option<Arc<StakeSnapshot>> {
        self.snapshots.get(&epoch).cloned()
    }

    /// Register a stake address with the given deposit
    pub fn register_stake_address(
        &mut self,
        stake_address: &StakeAddress,
        deposit: Lovelace,
    ) -> ValidationResult {
        debug!("Register stake address {stake_address}");
        if self.accounts.contains_key(stake_address) {
            return Err(Box::new(ValidationError::StakeAlreadyRegistered {
                account: *stake_address,
            }));
        }

        credit(&mut self.pots.deposits, "Deposits", deposit)?;
        self.accounts.insert(
            *stake_address,
            AccountState {
                deposit,
                ..AccountState::default()
            },
        );
        Ok(())
    }

    /// Deregister a stake address, returning the refund.
    /// A declared refund must match the recorded deposit.
    pub fn deregister_stake_address(
        &mut self,
        stake_address: &StakeAddress,
        refund: Option<Lovelace>,
    ) -> ValidationResult<Lovelace> {
        debug!("Deregister stake address {stake_address}");
        let account = self.accounts.get(stake_address).ok_or_else(|| {
            Box::new(ValidationError::StakeNotRegistered {
                account: *stake_address,
            })
        })?;

        if account.rewards > 0 {
            return Err(Box::new(ValidationError::NonZeroRewardBalance {
                account: *stake_address,
                balance: account.rewards,
            }));
        }
        if let Some(found) = refund.filter(|r| *r != account.deposit) {
            return Err(Box::new(ValidationError::WrongRefund {
                expected: account.deposit,
                found,
            }));
        }

        let deposit = account.deposit;
        debit(&mut self.pots.deposits, "Deposits", deposit)?;
        self.accounts.remove(stake_address);
        Ok(deposit)
    }

    /// Record a stake delegation
    pub fn record_stake_delegation(
        &mut self,
        stake_address: &StakeAddress,
        spo: &PoolId,
    ) -> ValidationResult {
        if !self.spos.contains_key(spo) {
            return Err(Box::new(ValidationError::UnknownPool { pool: *spo }));
        }
        let account = self.account_mut(stake_address)?;
        debug!("Delegation of {stake_address} to {spo}");
        account.delegated_spo = Some(*spo);
        Ok(())
    }

    /// Record a DRep delegation. Whether a credential DRep is registered is checked by
    /// the caller, which owns the DRep registry.
    pub fn record_drep_delegation(
        &mut self,
        stake_address: &StakeAddress,
        drep: &DRepChoice,
    ) -> ValidationResult {
        let account = self.account_mut(stake_address)?;
        debug!("Vote delegation of {stake_address} to {drep}");
        account.delegated_drep = Some(*drep);
        Ok(())
    }

    /// Withdraw the whole reward balance; the declared amount must equal it
    pub fn process_withdrawal(
        &mut self,
        stake_address: &StakeAddress,
        amount: Lovelace,
    ) -> ValidationResult {
        let account = self.account_mut(stake_address)?;
        if account.rewards != amount {
            return Err(Box::new(ValidationError::WithdrawalMismatch {
                account: *stake_address,
                declared: amount,
                balance: account.rewards,
            }));
        }
        debug!("Withdrawal of {amount} from {stake_address}");
        account.rewards = 0;
        Ok(())
    }

    /// Register a pool or update its parameters. Returns the deposit charged,
    /// which is zero for a re-registration.
    pub fn register_pool(
        &mut self,
        registration: &PoolRegistration,
        pool_deposit: Lovelace,
    ) -> Result<Lovelace> {
        match self.spos.get_mut(&registration.operator) {
            Some(pool) => {
                debug!("Updating pool {}", registration.operator);
                pool.registration = registration.clone();
                Ok(0)
            }
            None => {
                debug!("Registering pool {}", registration.operator);
                credit(&mut self.pots.deposits, "Deposits", pool_deposit)?;
                self.spos.insert(
                    registration.operator,
                    PoolState {
                        registration: registration.clone(),
                        deposit: pool_deposit,
                    },
                );
                Ok(pool_deposit)
            }
        }
    }

    /// Retire a pool now, refunding its deposit to the reward account,
    /// or to the treasury if that account is gone
    pub fn retire_pool(&mut self, pool: &PoolId) -> ValidationResult {
        let retired = self
            .spos
            .remove(pool)
            .ok_or_else(|| Box::new(ValidationError::UnknownPool { pool: *pool }))?;
        info!("Retiring pool {pool}");
        self.refund_deposit(&retired.registration.reward_account, retired.deposit)?;
        Ok(())
    }

    /// Move a deposit into the deposit pot
    pub fn charge_deposit(&mut self, amount: Lovelace) -> Result<()> {
        credit(&mut self.pots.deposits, "Deposits", amount)
    }

    /// Take a deposit out of the deposit pot
    fn release_deposit(&mut self, amount: Lovelace) -> Result<()> {
        debit(&mut self.pots.deposits, "Deposits", amount)
    }

    /// Release a deposit to a reward account, or to the treasury if the account is not
    /// registered. Returns whether the account was credited.
    pub fn refund_deposit(&mut self, stake_address: &StakeAddress, amount: Lovelace) -> Result<bool> {
        self.release_deposit(amount)?;
        match self.accounts.get_mut(stake_address) {
            Some(account) => {
                credit(&mut account.rewards, "Rewards", amount)?;
                Ok(true)
            }
            None => {
                warn!("Refund of {amount} for unregistered {stake_address} goes to the treasury");
                credit(&mut self.pots.treasury, "Treasury", amount)?;
                Ok(false)
            }
        }
    }

    /// Credit a registered reward account
    pub fn add_rewards(&mut self, stake_address: &StakeAddress, amount: Lovelace) -> Result<()> {
        let Some(account) = self.accounts.get_mut(stake_address) else {
            bail!("Stake address {stake_address} is not registered");
        };
        credit(&mut account.rewards, "Rewards", amount)
    }

    /// Pay a treasury withdrawal. Returns false, leaving everything untouched, when the
    /// treasury cannot cover it or the target is not registered.
    pub fn pay_from_treasury(
        &mut self,
        stake_address: &StakeAddress,
        amount: Lovelace,
    ) -> Result<bool> {
        if self.pots.treasury < amount || !self.accounts.contains_key(stake_address) {
            return Ok(false);
        }
        debit(&mut self.pots.treasury, "Treasury", amount)?;
        self.add_rewards(stake_address, amount)?;
        Ok(true)
    }

    pub fn collect_fee(&mut self, fee: Lovelace) -> Result<()> {
        credit(&mut self.pots.fees, "Fees", fee)
    }

    pub fn donate(&mut self, amount: Lovelace) -> Result<()> {
        credit(&mut self.pots.treasury, "Treasury", amount)
    }

    /// Treasury share of the current fee pot
    pub fn treasury_fee_share(&self, share: &RationalNumber) -> Result<Lovelace> {
        treasury_fee_cut(&self.pots, share)
    }

    /// Move the treasury share of the fee pot into the treasury
    pub fn transfer_fees(&mut self, share: &RationalNumber) -> Result<()> {
        self.pots = calculate_fee_transfer(&self.pots, share)?;
        Ok(())
    }

    /// Take the stake snapshot closing `epoch`
    pub fn take_snapshot(&mut self, epoch: Epoch) {
        let snapshot = StakeSnapshot::new(epoch, &self.accounts, &self.spos);
        self.snapshots.insert(epoch, Arc::new(snapshot));
        while self.snapshots.len() > SNAPSHOTS_KEPT {
            self.snapshots.pop_first();
        }
    }

    fn account_mut(&mut self, stake_address: &StakeAddress) -> ValidationResult<&mut AccountState> {
        self.accounts.get_mut(stake_address).ok_or_else(|| {
            Box::new(ValidationError::StakeNotRegistered {
                account: *stake_address,
            })
        })
    }
}
