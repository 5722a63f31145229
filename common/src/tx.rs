//! Transaction body, witness set and the signed transaction

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    address::{NetworkId, StakeAddress},
    asset::{Lovelace, Mint},
    cbor::{canonical_size, to_canonical_cbor},
    certificate::TxCertificate,
    crypto::{
        blake2b_256,
        ed25519::{PublicKey, SecretKey, Signature},
    },
    governance::{ProposalProcedure, VotingProcedures},
    hash::{KeyHash, TxHash},
    script::{NativeScript, PlutusData, PlutusScript, Redeemer},
    types::{Slot, TxOutput, UTxOIdentifier},
};

#[derive(
    Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
pub struct TransactionBody {
    /// Spent inputs, ordered by (transaction id, index)
    #[n(0)]
    pub inputs: BTreeSet<UTxOIdentifier>,
    #[n(1)]
    pub outputs: Vec<TxOutput>,
    #[n(2)]
    pub fee: Lovelace,
    /// Exclusive upper bound of the validity interval
    #[n(3)]
    pub valid_until: Option<Slot>,
    #[n(4)]
    pub certificates: Vec<TxCertificate>,
    #[n(5)]
    pub withdrawals: BTreeMap<StakeAddress, Lovelace>,
    /// Inclusive lower bound of the validity interval
    #[n(8)]
    pub valid_from: Option<Slot>,
    #[n(9)]
    pub mint: Mint,
    #[n(13)]
    pub collateral: BTreeSet<UTxOIdentifier>,
    #[n(14)]
    pub required_signers: BTreeSet<KeyHash>,
    #[n(15)]
    pub network_id: Option<NetworkId>,
    #[n(16)]
    pub collateral_return: Option<TxOutput>,
    #[n(17)]
    pub total_collateral: Option<Lovelace>,
    #[n(18)]
    pub reference_inputs: BTreeSet<UTxOIdentifier>,
    #[n(19)]
    pub voting_procedures: VotingProcedures,
    #[n(20)]
    pub proposal_procedures: Vec<ProposalProcedure>,
    #[n(22)]
    pub donation: Option<Lovelace>,
}

impl TransactionBody {
    /// Transaction id: blake2b-256 of the canonical body
    pub fn hash(&self) -> TxHash {
        blake2b_256(&to_canonical_cbor(self))
    }
}

/// A verification key and its signature over the transaction id
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct VKeyWitness {
    #[n(0)]
    pub vkey: PublicKey,
    #[n(1)]
    pub signature: Signature,
}

impl VKeyWitness {
    pub fn new(vkey: PublicKey, signature: Signature) -> Self {
        Self { vkey, signature }
    }

    pub fn key_hash(&self) -> KeyHash {
        self.vkey.hash()
    }

    pub fn verify(&self, tx_hash: &TxHash) -> bool {
        self.vkey.verify(tx_hash.as_ref(), &self.signature)
    }
}

#[derive(
    Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
pub struct WitnessSet {
    #[n(0)]
    pub vkeys: Vec<VKeyWitness>,
    #[n(1)]
    pub native_scripts: Vec<NativeScript>,
    #[n(3)]
    pub plutus_scripts: Vec<PlutusScript>,
    #[n(4)]
    pub plutus_data: Vec<PlutusData>,
    #[n(5)]
    pub redeemers: Vec<Redeemer>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct Transaction {
    #[n(0)]
    pub body: TransactionBody,
    #[n(1)]
    pub witnesses: WitnessSet,
    #[n(2)]
    pub is_valid: bool,
}

impl Transaction {
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            witnesses: WitnessSet::default(),
            is_valid: true,
        }
    }

    pub fn id(&self) -> TxHash {
        self.body.hash()
    }

    /// Serialized size, as charged by the linear fee
    pub fn size(&self) -> u64 {
        canonical_size(self)
    }

    /// Add a key witness over the current body. Changing the body afterwards invalidates it.
    pub fn sign(&mut self, key: &SecretKey) {
        let id = self.id();
        self.witnesses.vkeys.push(VKeyWitness::new(key.public_key(), key.sign(id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        address::{Address, Credential},
        asset::Value,
        hash::Hash,
    };

    fn body() -> TransactionBody {
        let address =
            Address::new(NetworkId::Testnet, Credential::AddrKeyHash(Hash::new([1; 28])), None);
        TransactionBody {
            inputs: [UTxOIdentifier::new(Hash::new([2; 32]), 0)].into_iter().collect(),
            outputs: vec![TxOutput::new(address, Value::lovelace(2_000_000))],
            fee: 180_000,
            ..Default::default()
        }
    }

    #[test]
    fn witnesses_do_not_change_the_id() {
        let mut tx = Transaction::new(body());
        let id = tx.id();
        let size = tx.size();
        tx.sign(&SecretKey::from_seed([7; 32]));
        assert_eq!(tx.id(), id);
        assert!(tx.size() > size);
        assert!(tx.witnesses.vkeys[0].verify(&id));
    }

    #[test]
    fn body_changes_change_the_id() {
        let mut other = body();
        other.fee += 1;
        assert_ne!(body().hash(), other.hash());
    }
}
