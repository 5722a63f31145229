//! Witness inventory and the consumption ledger
//!
//! Every witness a transaction carries must be needed by something in it, and every
//! credential something needs must be witnessed. The inventory records what is provided,
//! `require` records what is needed, and `check_extraneous` compares the two.

use emulator_common::{
    validation::{ValidationError, ValidationResult, WitnessCategory},
    Credential, DatumHash, ExUnits, KeyHash, NativeScript, PlutusData, RedeemerPointer,
    RedeemerTag, ScriptHash, ScriptRef, Slot, Transaction, TxHash,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct WitnessInventory {
    /// Key hashes of verified vkey witnesses
    vkeys: HashSet<KeyHash>,

    /// Native scripts attached or available through script references
    native: HashMap<ScriptHash, NativeScript>,

    /// Plutus script hashes attached or available through script references
    plutus: HashSet<ScriptHash>,

    attached_native: BTreeSet<ScriptHash>,
    attached_plutus: BTreeSet<ScriptHash>,
    datums: BTreeMap<DatumHash, PlutusData>,
    redeemers: HashMap<RedeemerPointer, ExUnits>,

    valid_from: Option<Slot>,
    valid_until: Option<Slot>,

    consumed_keys: HashSet<KeyHash>,
    consumed_scripts: HashSet<ScriptHash>,
    consumed_datums: HashSet<DatumHash>,
}

impl WitnessInventory {
    /// Verify every vkey witness against the transaction id and index what is attached
    pub fn new(tx: &Transaction, tx_hash: &TxHash) -> ValidationResult<Self> {
        let mut inventory = Self {
            valid_from: tx.body.valid_from,
            valid_until: tx.body.valid_until,
            ..Self::default()
        };

        for witness in &tx.witnesses.vkeys {
            let key_hash = witness.key_hash();
            if !witness.verify(tx_hash) {
                return Err(Box::new(ValidationError::InvalidSignature { key_hash }));
            }
            inventory.vkeys.insert(key_hash);
        }

        for script in &tx.witnesses.native_scripts {
            let hash = script.compute_hash();
            inventory.attached_native.insert(hash);
            inventory.native.insert(hash, script.clone());
        }
        for script in &tx.witnesses.plutus_scripts {
            let hash = script.compute_hash();
            inventory.attached_plutus.insert(hash);
            inventory.plutus.insert(hash);
        }
        for datum in &tx.witnesses.plutus_data {
            inventory.datums.insert(datum.compute_hash(), datum.clone());
        }
        for redeemer in &tx.witnesses.redeemers {
            inventory.redeemers.insert(redeemer.pointer(), redeemer.ex_units);
        }

        debug!(
            "Witnesses of {tx_hash}: {} vkeys, {} native, {} plutus, {} datums, {} redeemers",
            inventory.vkeys.len(),
            inventory.attached_native.len(),
            inventory.attached_plutus.len(),
            inventory.datums.len(),
            inventory.redeemers.len()
        );
        Ok(inventory)
    }

    /// Make a script carried by a resolved input or reference input available
    pub fn add_script_ref(&mut self, script: &ScriptRef) {
        match script {
            ScriptRef::Native(native) => {
                self.native.insert(native.compute_hash(), native.clone());
            }
            ScriptRef::Plutus(plutus) => {
                self.plutus.insert(plutus.compute_hash());
            }
        }
    }

    pub fn has_redeemers(&self) -> bool {
        !self.redeemers.is_empty()
    }

    pub fn declared_budget(&self, pointer: &RedeemerPointer) -> Option<ExUnits> {
        self.redeemers.get(pointer).copied()
    }

    pub fn is_verified(&self, key_hash: &KeyHash) -> bool {
        self.vkeys.contains(key_hash)
    }

    /// Consume a verified key witness
    pub fn require_key(&mut self, key_hash: &KeyHash) -> ValidationResult {
        if !self.vkeys.contains(key_hash) {
            return Err(Box::new(ValidationError::MissingVKeyWitness {
                key_hash: *key_hash,
            }));
        }
        self.consumed_keys.insert(*key_hash);
        Ok(())
    }

    /// Consume the witness of a credential. A script credential is satisfied by a native
    /// script that evaluates to true, or by a Plutus script with a redeemer at `(tag, index)`.
    pub fn require(&mut self, credential: &Credential, tag: RedeemerTag, index: u32) -> ValidationResult {
        match credential {
            Credential::AddrKeyHash(key_hash) => self.require_key(key_hash),
            Credential::ScriptHash(script_hash) => self.require_script(script_hash, tag, index),
        }
    }

    fn require_script(&mut self, script_hash: &ScriptHash, tag: RedeemerTag, index: u32) -> ValidationResult {
        if let Some(script) = self.native.get(script_hash) {
            if !script.eval(&self.vkeys, self.valid_from, self.valid_until) {
                return Err(Box::new(ValidationError::NativeScriptFailed {
                    script_hash: *script_hash,
                }));
            }
            let signers: Vec<KeyHash> = script
                .key_hashes()
                .into_iter()
                .filter(|k| self.vkeys.contains(k))
                .collect();
            self.consumed_keys.extend(signers);
            self.consumed_scripts.insert(*script_hash);
            return Ok(());
        }

        if self.plutus.contains(script_hash) {
            if !self.redeemers.contains_key(&(tag, index)) {
                return Err(Box::new(ValidationError::MissingRedeemer { tag, index }));
            }
            self.consumed_scripts.insert(*script_hash);
            return Ok(());
        }

        Err(Box::new(ValidationError::MissingScriptWitness {
            script_hash: *script_hash,
        }))
    }

    /// A datum hash referenced by an input, reference input or output
    pub fn consume_datum(&mut self, hash: &DatumHash) {
        self.consumed_datums.insert(*hash);
    }

    /// Attached witness datums, stored by the ledger on acceptance
    pub fn datums(&self) -> Vec<PlutusData> {
        self.datums.values().cloned().collect()
    }

    /// Every verified key, attached script and attached datum must have been consumed
    pub fn check_extraneous(&self) -> ValidationResult {
        let mut keys: Vec<&KeyHash> =
            self.vkeys.iter().filter(|k| !self.consumed_keys.contains(*k)).collect();
        keys.sort();
        if let Some(key) = keys.first() {
            return Err(extraneous(WitnessCategory::VKey, key.to_string()));
        }

        if let Some(hash) = self.attached_native.iter().find(|h| !self.consumed_scripts.contains(*h)) {
            return Err(extraneous(WitnessCategory::NativeScript, hash.to_string()));
        }
        if let Some(hash) = self.attached_plutus.iter().find(|h| !self.consumed_scripts.contains(*h)) {
            return Err(extraneous(WitnessCategory::PlutusScript, hash.to_string()));
        }
        if let Some(hash) = self.datums.keys().find(|h| !self.consumed_datums.contains(*h)) {
            return Err(extraneous(WitnessCategory::Datum, hash.to_string()));
        }
        Ok(())
    }
}

fn extraneous(category: WitnessCategory, hash: String) -> Box<ValidationError> {
    Box::new(ValidationError::ExtraneousWitness { category, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::{
        crypto::ed25519::SecretKey, Hash, PlutusLanguage, PlutusScript, Redeemer,
        TransactionBody,
    };

    fn signed(keys: &[SecretKey]) -> Transaction {
        let mut tx = Transaction::new(TransactionBody {
            fee: 1,
            ..TransactionBody::default()
        });
        for key in keys {
            tx.sign(key);
        }
        tx
    }

    #[test]
    fn forged_signature_is_rejected() {
        let key = SecretKey::from_seed([1; 32]);
        let mut tx = signed(&[key]);
        let id = tx.id();
        tx.body.fee = 2;
        let err = WitnessInventory::new(&tx, &tx.id()).unwrap_err();
        assert!(matches!(*err, ValidationError::InvalidSignature { .. }));
        assert!(WitnessInventory::new(&tx, &id).is_ok());
    }

    #[test]
    fn unused_key_is_extraneous() {
        let payer = SecretKey::from_seed([1; 32]);
        let stranger = SecretKey::from_seed([2; 32]);
        let tx = signed(&[payer.clone(), stranger.clone()]);
        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();

        inventory.require_key(&payer.public_key().hash()).unwrap();
        let err = inventory.check_extraneous().unwrap_err();
        assert_eq!(
            *err,
            ValidationError::ExtraneousWitness {
                category: WitnessCategory::VKey,
                hash: stranger.public_key().hash().to_string(),
            }
        );

        inventory.require_key(&stranger.public_key().hash()).unwrap();
        assert!(inventory.check_extraneous().is_ok());
    }

    #[test]
    fn native_script_consumes_its_signers() {
        let signer = SecretKey::from_seed([3; 32]);
        let key_hash = signer.public_key().hash();
        let script = NativeScript::ScriptAll(vec![
            NativeScript::ScriptPubkey(key_hash),
            NativeScript::InvalidHereafter(100),
        ]);
        let script_hash = script.compute_hash();

        let mut tx = Transaction::new(TransactionBody {
            valid_until: Some(50),
            ..TransactionBody::default()
        });
        tx.witnesses.native_scripts.push(script);
        tx.sign(&signer);

        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();
        inventory
            .require(&Credential::ScriptHash(script_hash), RedeemerTag::Spend, 0)
            .unwrap();
        assert!(inventory.check_extraneous().is_ok());
    }

    #[test]
    fn failing_native_script_is_fatal() {
        let script = NativeScript::ScriptPubkey(Hash::new([9; 28]));
        let script_hash = script.compute_hash();
        let mut tx = Transaction::new(TransactionBody::default());
        tx.witnesses.native_scripts.push(script);

        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();
        let err = inventory
            .require(&Credential::ScriptHash(script_hash), RedeemerTag::Spend, 0)
            .unwrap_err();
        assert_eq!(*err, ValidationError::NativeScriptFailed { script_hash });
    }

    #[test]
    fn plutus_script_needs_matching_redeemer() {
        let script = PlutusScript::new(PlutusLanguage::V3, vec![1, 2, 3]);
        let script_hash = script.compute_hash();
        let mut tx = Transaction::new(TransactionBody::default());
        tx.witnesses.plutus_scripts.push(script);
        tx.witnesses.redeemers.push(Redeemer {
            tag: RedeemerTag::Mint,
            index: 0,
            data: PlutusData(vec![0x80]),
            ex_units: ExUnits::new(10, 10),
        });

        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();
        let credential = Credential::ScriptHash(script_hash);
        let err = inventory.require(&credential, RedeemerTag::Mint, 1).unwrap_err();
        assert_eq!(*err, ValidationError::MissingRedeemer { tag: RedeemerTag::Mint, index: 1 });
        inventory.require(&credential, RedeemerTag::Mint, 0).unwrap();
        assert!(inventory.check_extraneous().is_ok());
    }

    #[test]
    fn unknown_script_is_missing() {
        let tx = Transaction::new(TransactionBody::default());
        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();
        let err = inventory
            .require(&Credential::ScriptHash(Hash::new([4; 28])), RedeemerTag::Cert, 0)
            .unwrap_err();
        assert!(matches!(*err, ValidationError::MissingScriptWitness { .. }));
    }

    #[test]
    fn unreferenced_datum_is_extraneous() {
        let datum = PlutusData(vec![0x01]);
        let mut tx = Transaction::new(TransactionBody::default());
        tx.witnesses.plutus_data.push(datum.clone());
        let mut inventory = WitnessInventory::new(&tx, &tx.id()).unwrap();

        let err = inventory.check_extraneous().unwrap_err();
        assert!(matches!(
            *err,
            ValidationError::ExtraneousWitness { category: WitnessCategory::Datum, .. }
        ));
        inventory.consume_datum(&datum.compute_hash());
        assert!(inventory.check_extraneous().is_ok());
    }
}
