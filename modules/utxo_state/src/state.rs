//! Flushed ledger UTxO set and datum table
use emulator_common::{
    Address, DatumHash, PlutusData, ScriptHash, ScriptRef, TxOutput, UTxOIdentifier,
};
use anyhow::{anyhow, bail, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Read access to unspent outputs, as needed to resolve transaction inputs
pub trait UTxOLookup {
    /// Lookup a UTxO; `None` if it does not exist or is already spent
    fn lookup_utxo(&self, key: &UTxOIdentifier) -> Option<TxOutput>;
}

/// Unspent outputs of every flushed transaction
#[derive(Debug, Default, Clone)]
pub struct UTxOStore {
    /// Unspent outputs, ordered by (transaction id, index)
    utxos: BTreeMap<UTxOIdentifier, TxOutput>,

    /// Witness datums of accepted transactions
    datums: BTreeMap<DatumHash, PlutusData>,
}

impl UTxOStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a UTxO. Replacing an existing entry is an invariant violation.
    pub fn add_utxo(&mut self, key: UTxOIdentifier, value: TxOutput) -> Result<()> {
        if self.utxos.contains_key(&key) {
            bail!("UTxO {key} already exists");
        }
        self.utxos.insert(key, value);
        Ok(())
    }

    /// Delete a UTxO, returning it
    pub fn delete_utxo(&mut self, key: &UTxOIdentifier) -> Result<TxOutput> {
        self.utxos.remove(key).ok_or_else(|| anyhow!("UTxO {key} does not exist"))
    }

    /// Get the number of UTxOs in the store
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// All unspent outputs
    pub fn utxos(&self) -> Vec<(UTxOIdentifier, TxOutput)> {
        self.utxos.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Unspent outputs paying to `address`
    pub fn utxos_at(&self, address: &Address) -> Vec<(UTxOIdentifier, TxOutput)> {
        self.utxos
            .iter()
            .filter(|(_, output)| &output.address == address)
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Get the total lovelace of all UTxOs in the store
    pub fn sum_lovelace(&self) -> u128 {
        self.utxos.values().map(|o| o.value.lovelace as u128).sum()
    }

    /// Record a witness datum
    pub fn add_datum(&mut self, datum: PlutusData) {
        let hash = datum.compute_hash();
        debug!("Storing datum {hash}");
        self.datums.insert(hash, datum);
    }

    pub fn datum(&self, hash: &DatumHash) -> Option<PlutusData> {
        self.datums.get(hash).cloned()
    }

    /// Find a script carried as a reference script by an unspent output
    pub fn script_by_hash(&self, hash: &ScriptHash) -> Option<ScriptRef> {
        self.utxos
            .values()
            .filter_map(|output| output.script_ref.as_ref())
            .find(|script| &script.compute_hash() == hash)
            .cloned()
    }
}

impl UTxOLookup for UTxOStore {
    fn lookup_utxo(&self, key: &UTxOIdentifier) -> Option<TxOutput> {
        self.utxos.get(key).cloned()
    }
}
