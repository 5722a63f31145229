//! DRep (Delegated Representative) types and structures

use crate::{
    address::Credential, asset::Lovelace, cbor::rational_cbor_codec, hash::KeyHash,
    rational_number::RationalNumber, types::Epoch,
};
use serde_with::{hex::Hex, serde_as};
use std::fmt;

pub type DRepCredential = Credential;

/// Anchor - verifiable link on-chain identifiers with off-chain content,
/// typically metadata that describes a DRep's identity, platform, or governance
/// philosophy.
#[serde_as]
#[derive(Default, Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Anchor {
    /// Metadata URL
    pub url: String,

    /// Metadata hash
    #[serde_as(as = "Hex")]
    pub data_hash: Vec<u8>,
}

impl Anchor {
    pub fn new(url: &str, data_hash: &[u8]) -> Self {
        Self {
            url: url.to_string(),
            data_hash: data_hash.to_vec(),
        }
    }
}

impl<C> minicbor::Encode<C> for Anchor {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.str(&self.url)?.bytes(&self.data_hash)?;
        Ok(())
    }
}

/// DRep Record - the state of a DRep in the ledger
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DRepRecord {
    /// Deposit amount in lovelace
    pub deposit: Lovelace,

    /// Optional anchor (metadata reference)
    pub anchor: Option<Anchor>,

    /// Last epoch the DRep registered, updated or voted
    pub last_active: Epoch,

    /// Cleared by deregistration and by the idle sweep
    pub registered: bool,

    /// `last_active + drep_activity`
    pub expiry: Epoch,
}

impl DRepRecord {
    pub fn new(deposit: Lovelace, anchor: Option<Anchor>, epoch: Epoch, activity: u32) -> Self {
        Self {
            deposit,
            anchor,
            last_active: epoch,
            registered: true,
            expiry: epoch + activity as u64,
        }
    }

    pub fn touch(&mut self, epoch: Epoch, activity: u32) {
        self.last_active = epoch;
        self.expiry = epoch + activity as u64;
    }
}

/// DRepChoice (=CDDL drep, badly named)
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
)]
pub enum DRepChoice {
    /// Address key
    #[n(0)]
    Key(#[n(0)] KeyHash),

    /// Script key
    #[n(1)]
    Script(#[n(0)] KeyHash),

    /// Abstain
    #[n(2)]
    Abstain,

    /// No confidence
    #[n(3)]
    NoConfidence,
}

impl DRepChoice {
    /// Credential of a registered-DRep choice; the two predefined choices have none
    pub fn credential(&self) -> Option<DRepCredential> {
        match self {
            DRepChoice::Key(hash) => Some(Credential::AddrKeyHash(*hash)),
            DRepChoice::Script(hash) => Some(Credential::ScriptHash(*hash)),
            DRepChoice::Abstain | DRepChoice::NoConfidence => None,
        }
    }
}

impl From<DRepCredential> for DRepChoice {
    fn from(credential: DRepCredential) -> Self {
        match credential {
            Credential::AddrKeyHash(hash) => DRepChoice::Key(hash),
            Credential::ScriptHash(hash) => DRepChoice::Script(hash),
        }
    }
}

impl fmt::Display for DRepChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DRepChoice::Key(hash) => write!(f, "drep-key:{hash}"),
            DRepChoice::Script(hash) => write!(f, "drep-script:{hash}"),
            DRepChoice::Abstain => f.write_str("abstain"),
            DRepChoice::NoConfidence => f.write_str("no-confidence"),
        }
    }
}

/// DRep voting thresholds for governance actions
#[derive(Default, serde::Serialize, serde::Deserialize, Debug, PartialEq, Eq, Clone, minicbor::Encode)]
pub struct DRepVotingThresholds {
    #[cbor(n(0), encode_with = "rational_cbor_codec::encode")]
    pub motion_no_confidence: RationalNumber,
    #[cbor(n(1), encode_with = "rational_cbor_codec::encode")]
    pub committee_normal: RationalNumber,
    #[cbor(n(2), encode_with = "rational_cbor_codec::encode")]
    pub committee_no_confidence: RationalNumber,
    #[cbor(n(3), encode_with = "rational_cbor_codec::encode")]
    pub update_constitution: RationalNumber,
    #[cbor(n(4), encode_with = "rational_cbor_codec::encode")]
    pub hard_fork_initiation: RationalNumber,
    #[cbor(n(5), encode_with = "rational_cbor_codec::encode")]
    pub pp_network_group: RationalNumber,
    #[cbor(n(6), encode_with = "rational_cbor_codec::encode")]
    pub pp_economic_group: RationalNumber,
    #[cbor(n(7), encode_with = "rational_cbor_codec::encode")]
    pub pp_technical_group: RationalNumber,
    #[cbor(n(8), encode_with = "rational_cbor_codec::encode")]
    pub pp_governance_group: RationalNumber,
    #[cbor(n(9), encode_with = "rational_cbor_codec::encode")]
    pub treasury_withdrawal: RationalNumber,
}

impl DRepVotingThresholds {
    /// Conway mainnet values
    pub fn mainnet() -> Self {
        Self {
            motion_no_confidence: RationalNumber::new(67, 100),
            committee_normal: RationalNumber::new(67, 100),
            committee_no_confidence: RationalNumber::new(3, 5),
            update_constitution: RationalNumber::new(3, 4),
            hard_fork_initiation: RationalNumber::new(3, 5),
            pp_network_group: RationalNumber::new(67, 100),
            pp_economic_group: RationalNumber::new(67, 100),
            pp_technical_group: RationalNumber::new(67, 100),
            pp_governance_group: RationalNumber::new(3, 4),
            treasury_withdrawal: RationalNumber::new(67, 100),
        }
    }
}

/// Stake pool voting thresholds
#[derive(Default, serde::Serialize, serde::Deserialize, Debug, PartialEq, Eq, Clone, minicbor::Encode)]
pub struct PoolVotingThresholds {
    #[cbor(n(0), encode_with = "rational_cbor_codec::encode")]
    pub motion_no_confidence: RationalNumber,
    #[cbor(n(1), encode_with = "rational_cbor_codec::encode")]
    pub committee_normal: RationalNumber,
    #[cbor(n(2), encode_with = "rational_cbor_codec::encode")]
    pub committee_no_confidence: RationalNumber,
    #[cbor(n(3), encode_with = "rational_cbor_codec::encode")]
    pub hard_fork_initiation: RationalNumber,
    #[cbor(n(4), encode_with = "rational_cbor_codec::encode")]
    pub security_voting_threshold: RationalNumber,
}

impl PoolVotingThresholds {
    pub fn mainnet() -> Self {
        Self {
            motion_no_confidence: RationalNumber::new(51, 100),
            committee_normal: RationalNumber::new(51, 100),
            committee_no_confidence: RationalNumber::new(51, 100),
            hard_fork_initiation: RationalNumber::new(51, 100),
            security_voting_threshold: RationalNumber::new(51, 100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;

    #[test]
    fn touching_moves_expiry() {
        let mut record = DRepRecord::new(500, None, 3, 20);
        assert_eq!(record.expiry, 23);
        record.touch(10, 20);
        assert_eq!(record.last_active, 10);
        assert_eq!(record.expiry, 30);
    }

    #[test]
    fn predefined_choices_have_no_credential() {
        assert!(DRepChoice::Abstain.credential().is_none());
        assert!(DRepChoice::NoConfidence.credential().is_none());
        let key = Credential::AddrKeyHash(Hash::new([4; 28]));
        assert_eq!(DRepChoice::from(key).credential(), Some(key));
    }
}
