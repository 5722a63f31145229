//! Pending block: UTxO changes of accepted transactions, applied on the next clock advance
use crate::state::{UTxOLookup, UTxOStore};
use anyhow::{bail, Result};
use emulator_common::{PlutusData, TxHash, TxOutput, UTxOIdentifier};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// UTxO changes of one accepted transaction
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub tx_hash: TxHash,
    pub consumes: Vec<UTxOIdentifier>,
    pub produces: Vec<(UTxOIdentifier, TxOutput)>,
    pub datums: Vec<PlutusData>,
}

#[derive(Debug, Default)]
pub struct Mempool {
    /// Staged transactions in submission order
    pending: Vec<PendingTx>,

    /// Inputs consumed by any pending transaction
    spent: HashSet<UTxOIdentifier>,

    /// Outputs created by pending transactions and not yet spent by a later one
    produced: HashMap<UTxOIdentifier, TxOutput>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a transaction behind the ones already pending
    pub fn stage(&mut self, tx: PendingTx) -> Result<()> {
        if self.is_pending(&tx.tx_hash) {
            bail!("Transaction {} is already pending", tx.tx_hash);
        }
        if let Some(input) = tx.consumes.iter().find(|i| self.spent.contains(i)) {
            bail!("Input {input} is already spent by a pending transaction");
        }

        for input in &tx.consumes {
            self.spent.insert(*input);
            self.produced.remove(input);
        }
        for (key, output) in &tx.produces {
            self.produced.insert(*key, output.clone());
        }
        debug!(
            "Staged {}: {} inputs, {} outputs",
            tx.tx_hash,
            tx.consumes.len(),
            tx.produces.len()
        );
        self.pending.push(tx);
        Ok(())
    }

    pub fn is_pending(&self, tx_hash: &TxHash) -> bool {
        self.pending.iter().any(|tx| &tx.tx_hash == tx_hash)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply every pending transaction to the store in submission order, emptying the pool.
    /// Returns the flushed transaction ids.
    pub fn flush(&mut self, store: &mut UTxOStore) -> Result<Vec<TxHash>> {
        let pending = std::mem::take(&mut self.pending);
        self.spent.clear();
        self.produced.clear();

        let mut flushed = Vec::with_capacity(pending.len());
        for tx in pending {
            for input in &tx.consumes {
                store.delete_utxo(input)?;
            }
            for (key, output) in tx.produces {
                store.add_utxo(key, output)?;
            }
            for datum in tx.datums {
                store.add_datum(datum);
            }
            flushed.push(tx.tx_hash);
        }

        if !flushed.is_empty() {
            info!("Flushed {} transactions, {} UTxOs unspent", flushed.len(), store.len());
        }
        Ok(flushed)
    }

    /// The store as it will look once the pending block is flushed
    pub fn view<'a>(&'a self, store: &'a UTxOStore) -> PendingView<'a> {
        PendingView {
            store,
            mempool: self,
        }
    }
}

/// Store overlaid with the pending block
pub struct PendingView<'a> {
    store: &'a UTxOStore,
    mempool: &'a Mempool,
}

impl UTxOLookup for PendingView<'_> {
    fn lookup_utxo(&self, key: &UTxOIdentifier) -> Option<TxOutput> {
        if self.mempool.spent.contains(key) {
            return None;
        }
        match self.mempool.produced.get(key) {
            Some(output) => Some(output.clone()),
            None => self.store.lookup_utxo(key),
        }
    }
}
