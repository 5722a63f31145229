//! Certificate type definitions

use crate::{
    address::{Credential, StakeAddress},
    asset::Lovelace,
    cbor::rational_cbor_codec,
    drep::{Anchor, DRepChoice, DRepCredential},
    governance::CommitteeCredential,
    hash::{Hash, KeyHash, PoolId},
    rational_number::RationalNumber,
    types::Epoch,
};
use std::collections::BTreeSet;

pub type VrfKeyHash = Hash<32>;

// === Pool certificate types ===

/// Pool registration data
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, PartialEq, Eq)]
pub struct PoolRegistration {
    /// Operator pool key hash - used as ID
    #[n(0)]
    pub operator: PoolId,

    /// VRF key hash
    #[n(1)]
    pub vrf_key_hash: VrfKeyHash,

    /// Pledged Ada
    #[n(2)]
    pub pledge: Lovelace,

    /// Fixed cost
    #[n(3)]
    pub cost: Lovelace,

    /// Marginal cost (fraction)
    #[cbor(n(4), encode_with = "rational_cbor_codec::encode")]
    pub margin: RationalNumber,

    /// Reward account
    #[n(5)]
    pub reward_account: StakeAddress,

    /// Pool owners by their key hash
    #[n(6)]
    pub pool_owners: BTreeSet<KeyHash>,

    // Metadata
    #[n(7)]
    pub pool_metadata: Option<Anchor>,
}

/// Pool retirement data
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct PoolRetirement {
    /// Operator pool key hash - used as ID
    #[n(0)]
    pub operator: PoolId,

    /// Announced retirement epoch; retirement takes effect on acceptance
    #[n(1)]
    pub epoch: Epoch,
}

// === Stake delegation types ===

/// Stake delegation data
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct StakeDelegation {
    /// Stake address
    #[n(0)]
    pub stake_address: StakeAddress,

    /// Pool ID to delegate to
    #[n(1)]
    pub operator: PoolId,
}

/// Stake registration with an explicit deposit
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct Registration {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub deposit: Lovelace,
}

/// Stake deregistration with an explicit refund
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct Deregistration {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub refund: Lovelace,
}

/// Vote delegation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct VoteDelegation {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub drep: DRepChoice,
}

/// Stake and vote delegation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct StakeAndVoteDelegation {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub operator: PoolId,
    #[n(2)]
    pub drep: DRepChoice,
}

/// Stake registration and SPO delegation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct StakeRegistrationAndDelegation {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub operator: PoolId,
    #[n(2)]
    pub deposit: Lovelace,
}

/// Stake registration and vote delegation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct StakeRegistrationAndVoteDelegation {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub drep: DRepChoice,
    #[n(2)]
    pub deposit: Lovelace,
}

/// Stake registration with both SPO and vote delegation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct StakeRegistrationAndStakeAndVoteDelegation {
    #[n(0)]
    pub stake_address: StakeAddress,
    #[n(1)]
    pub operator: PoolId,
    #[n(2)]
    pub drep: DRepChoice,
    #[n(3)]
    pub deposit: Lovelace,
}

// === Committee certificate types ===

/// Authorise a committee hot credential
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct AuthCommitteeHot {
    #[n(0)]
    pub cold_credential: CommitteeCredential,
    #[n(1)]
    pub hot_credential: CommitteeCredential,
}

/// Resign a committee cold credential
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct ResignCommitteeCold {
    #[n(0)]
    pub cold_credential: CommitteeCredential,
    #[n(1)]
    pub anchor: Option<Anchor>,
}

// === DRep certificate types ===

/// DRep Registration = reg_drep_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct DRepRegistration {
    /// DRep credential
    #[n(0)]
    pub credential: DRepCredential,

    /// Deposit paid
    #[n(1)]
    pub deposit: Lovelace,

    /// Optional anchor
    #[n(2)]
    pub anchor: Option<Anchor>,
}

/// DRep Deregistration = unreg_drep_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct DRepDeregistration {
    /// DRep credential
    #[n(0)]
    pub credential: DRepCredential,

    /// Deposit to refund
    #[n(1)]
    pub refund: Lovelace,
}

/// DRep Update = update_drep_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub struct DRepUpdate {
    /// DRep credential
    #[n(0)]
    pub credential: DRepCredential,

    /// Optional anchor
    #[n(1)]
    pub anchor: Option<Anchor>,
}

// === TxCertificate enum ===

/// Certificate in a transaction. Variant numbers follow the ledger's certificate tags.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, minicbor::Encode, Eq, PartialEq)]
pub enum TxCertificate {
    /// Stake registration, deposit implied by the key deposit parameter
    #[n(0)]
    StakeRegistration(#[n(0)] StakeAddress),

    /// Stake de-registration, refund implied by the recorded deposit
    #[n(1)]
    StakeDeregistration(#[n(0)] StakeAddress),

    /// Stake Delegation to a pool
    #[n(2)]
    StakeDelegation(#[n(0)] StakeDelegation),

    /// Pool registration
    #[n(3)]
    PoolRegistration(#[n(0)] PoolRegistration),

    /// Pool retirement
    #[n(4)]
    PoolRetirement(#[n(0)] PoolRetirement),

    /// New stake registration
    #[n(7)]
    Registration(#[n(0)] Registration),

    /// Stake deregistration
    #[n(8)]
    Deregistration(#[n(0)] Deregistration),

    /// Vote delegation
    #[n(9)]
    VoteDelegation(#[n(0)] VoteDelegation),

    /// Combined stake and vote delegation
    #[n(10)]
    StakeAndVoteDelegation(#[n(0)] StakeAndVoteDelegation),

    /// Stake registration and SPO delegation
    #[n(11)]
    StakeRegistrationAndDelegation(#[n(0)] StakeRegistrationAndDelegation),

    /// Stake registration and vote delegation
    #[n(12)]
    StakeRegistrationAndVoteDelegation(#[n(0)] StakeRegistrationAndVoteDelegation),

    /// Stake registration and combined SPO and vote delegation
    #[n(13)]
    StakeRegistrationAndStakeAndVoteDelegation(#[n(0)] StakeRegistrationAndStakeAndVoteDelegation),

    /// Authorise a committee hot credential
    #[n(14)]
    AuthCommitteeHot(#[n(0)] AuthCommitteeHot),

    /// Resign a committee cold credential
    #[n(15)]
    ResignCommitteeCold(#[n(0)] ResignCommitteeCold),

    /// DRep registration
    #[n(16)]
    DRepRegistration(#[n(0)] DRepRegistration),

    /// DRep deregistration
    #[n(17)]
    DRepDeregistration(#[n(0)] DRepDeregistration),

    /// DRep update
    #[n(18)]
    DRepUpdate(#[n(0)] DRepUpdate),
}

impl TxCertificate {
    /// Credentials that must witness this certificate.
    /// Legacy stake registration is the only certificate that needs none.
    pub fn required_witnesses(&self) -> Vec<Credential> {
        match self {
            Self::StakeRegistration(_) => Vec::new(),
            Self::StakeDeregistration(addr) => vec![addr.credential],
            Self::StakeDelegation(d) => vec![d.stake_address.credential],
            Self::PoolRegistration(reg) => {
                let mut creds = vec![Credential::AddrKeyHash(reg.operator)];
                creds.extend(
                    reg.pool_owners
                        .iter()
                        .filter(|owner| **owner != reg.operator)
                        .map(|owner| Credential::AddrKeyHash(*owner)),
                );
                creds
            }
            Self::PoolRetirement(ret) => vec![Credential::AddrKeyHash(ret.operator)],
            Self::Registration(r) => vec![r.stake_address.credential],
            Self::Deregistration(d) => vec![d.stake_address.credential],
            Self::VoteDelegation(d) => vec![d.stake_address.credential],
            Self::StakeAndVoteDelegation(d) => vec![d.stake_address.credential],
            Self::StakeRegistrationAndDelegation(d) => vec![d.stake_address.credential],
            Self::StakeRegistrationAndVoteDelegation(d) => vec![d.stake_address.credential],
            Self::StakeRegistrationAndStakeAndVoteDelegation(d) => {
                vec![d.stake_address.credential]
            }
            Self::AuthCommitteeHot(a) => vec![a.cold_credential],
            Self::ResignCommitteeCold(r) => vec![r.cold_credential],
            Self::DRepRegistration(r) => vec![r.credential],
            Self::DRepDeregistration(d) => vec![d.credential],
            Self::DRepUpdate(u) => vec![u.credential],
        }
    }

    pub fn get_cert_name(&self) -> &'static str {
        match self {
            Self::StakeRegistration(_) => "StakeRegistration",
            Self::StakeDeregistration(_) => "StakeDeregistration",
            Self::StakeDelegation(_) => "StakeDelegation",
            Self::PoolRegistration(_) => "PoolRegistration",
            Self::PoolRetirement(_) => "PoolRetirement",
            Self::Registration(_) => "Registration",
            Self::Deregistration(_) => "Deregistration",
            Self::VoteDelegation(_) => "VoteDelegation",
            Self::StakeAndVoteDelegation(_) => "StakeAndVoteDelegation",
            Self::StakeRegistrationAndDelegation(_) => "StakeRegistrationAndDelegation",
            Self::StakeRegistrationAndVoteDelegation(_) => "StakeRegistrationAndVoteDelegation",
            Self::StakeRegistrationAndStakeAndVoteDelegation(_) => {
                "StakeRegistrationAndStakeAndVoteDelegation"
            }
            Self::AuthCommitteeHot(_) => "AuthCommitteeHot",
            Self::ResignCommitteeCold(_) => "ResignCommitteeCold",
            Self::DRepRegistration(_) => "DRepRegistration",
            Self::DRepDeregistration(_) => "DRepDeregistration",
            Self::DRepUpdate(_) => "DRepUpdate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NetworkId;

    fn stake(b: u8) -> StakeAddress {
        StakeAddress::new(Credential::AddrKeyHash(Hash::new([b; 28])), NetworkId::Testnet)
    }

    #[test]
    fn legacy_registration_needs_no_witness() {
        assert!(TxCertificate::StakeRegistration(stake(1)).required_witnesses().is_empty());
        let conway = TxCertificate::Registration(Registration {
            stake_address: stake(1),
            deposit: 2_000_000,
        });
        assert_eq!(conway.required_witnesses(), vec![stake(1).credential]);
    }

    #[test]
    fn pool_registration_needs_operator_and_owners() {
        let operator = Hash::new([1; 28]);
        let owner = Hash::new([2; 28]);
        let cert = TxCertificate::PoolRegistration(PoolRegistration {
            operator,
            vrf_key_hash: Hash::new([0; 32]),
            pledge: 0,
            cost: 340_000_000,
            margin: RationalNumber::new(1, 100),
            reward_account: stake(3),
            pool_owners: [operator, owner].into_iter().collect(),
            pool_metadata: None,
        });
        assert_eq!(
            cert.required_witnesses(),
            vec![Credential::AddrKeyHash(operator), Credential::AddrKeyHash(owner)]
        );
    }
}
