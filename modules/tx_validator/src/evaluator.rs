//! Script evaluation seam
//!
//! The ledger never runs Plutus itself. An evaluator reports the execution units each
//! redeemer actually needs; the validator checks them against the declared budgets and
//! prices them into the minimum fee.

use anyhow::Result;
use async_trait::async_trait;
use emulator_common::{Redeemer, Transaction, TxOutput, UTxOIdentifier};

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate every script of `tx`, given the resolved spent inputs and reference inputs.
    /// Returns the redeemers with the units actually consumed. An error means a script
    /// failed.
    async fn evaluate(
        &self,
        tx: &Transaction,
        resolved: &[(UTxOIdentifier, TxOutput)],
    ) -> Result<Vec<Redeemer>>;
}

/// Trusts the declared budgets: every redeemer is reported as consuming exactly what it
/// declares
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredBudgetEvaluator;

#[async_trait]
impl Evaluator for DeclaredBudgetEvaluator {
    async fn evaluate(
        &self,
        tx: &Transaction,
        _resolved: &[(UTxOIdentifier, TxOutput)],
    ) -> Result<Vec<Redeemer>> {
        Ok(tx.witnesses.redeemers.clone())
    }
}
