//! Emulator AccountsState: per-epoch stake snapshots for ratification

use crate::state::AccountState;
use emulator_common::{DRepChoice, Epoch, Lovelace, PoolId, StakeAddress};
use imbl::OrdMap;
use std::collections::BTreeMap;
use tracing::debug;

/// Reward-balance stake delegated to each DRep and each pool, taken at the end of an epoch
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StakeSnapshot {
    /// Epoch it's for (the one that has just ended)
    pub epoch: Epoch,

    /// Stake per DRep choice, predefined choices included
    pub dreps: BTreeMap<DRepChoice, Lovelace>,

    /// Stake per pool operator
    pub spos: BTreeMap<PoolId, Lovelace>,
}

impl StakeSnapshot {
    /// Aggregate the current accounts. Accounts with a zero balance are skipped,
    /// and so are delegations to pools that are no longer registered.
    pub fn new<P>(
        epoch: Epoch,
        accounts: &OrdMap<StakeAddress, AccountState>,
        spos: &OrdMap<PoolId, P>,
    ) -> Self
    where
        P: Clone,
    {
        let mut snapshot = Self {
            epoch,
            ..Self::default()
        };

        for account in accounts.values().filter(|a| a.rewards > 0) {
            if let Some(drep) = &account.delegated_drep {
                let stake = snapshot.dreps.entry(*drep).or_default();
                *stake = stake.saturating_add(account.rewards);
            }
            if let Some(spo) = account.delegated_spo.filter(|spo| spos.contains_key(spo)) {
                let stake = snapshot.spos.entry(spo).or_default();
                *stake = stake.saturating_add(account.rewards);
            }
        }

        debug!(
            epoch,
            dreps = snapshot.dreps.len(),
            spos = snapshot.spos.len(),
            "Stake snapshot: {:?} {:?}",
            snapshot.dreps,
            snapshot.spos
        );
        snapshot
    }

    pub fn drep_stake(&self, drep: &DRepChoice) -> Lovelace {
        self.dreps.get(drep).copied().unwrap_or(0)
    }

    pub fn spo_stake(&self, spo: &PoolId) -> Lovelace {
        self.spos.get(spo).copied().unwrap_or(0)
    }
}
