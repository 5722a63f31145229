//! Conway governance primitives: actions, proposals, votes and tallies

use crate::{
    address::{Credential, StakeAddress},
    asset::Lovelace,
    cbor::rational_cbor_codec,
    drep::Anchor,
    hash::{KeyHash, PoolId, ScriptHash, TxHash},
    protocol_params::{ProtocolParamUpdate, ProtocolVersion},
    rational_number::RationalNumber,
    types::Epoch,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

pub type CommitteeCredential = Credential;

/// Governance action identity: submitting transaction and position in its proposal list
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
)]
pub struct GovActionId {
    #[n(0)]
    pub transaction_id: TxHash,
    #[n(1)]
    pub action_index: u32,
}

impl GovActionId {
    pub fn new(transaction_id: TxHash, action_index: u32) -> Self {
        Self {
            transaction_id,
            action_index,
        }
    }
}

impl fmt::Display for GovActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.action_index)
    }
}

#[derive(
    Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
pub struct Constitution {
    #[n(0)]
    pub anchor: Anchor,
    #[n(1)]
    pub guardrail_script: Option<ScriptHash>,
}

/// Committee members with their term-expiry epochs, and the quorum fraction
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Committee {
    pub members: BTreeMap<CommitteeCredential, Epoch>,
    pub threshold: RationalNumber,
}

impl Committee {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A member whose term epoch is at least `epoch` may still vote
    pub fn is_active_member(&self, cold: &CommitteeCredential, epoch: Epoch) -> bool {
        self.members.get(cold).is_some_and(|term| *term >= epoch)
    }

    pub fn active_size(&self, epoch: Epoch) -> u64 {
        self.members.values().filter(|term| **term >= epoch).count() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct CommitteeChange {
    /// Removed committee members
    #[n(0)]
    pub removed_committee_members: BTreeSet<CommitteeCredential>,

    /// New committee members with their term-expiry epochs
    #[n(1)]
    pub new_committee_members: BTreeMap<CommitteeCredential, Epoch>,

    /// Replacement quorum
    #[cbor(n(2), encode_with = "rational_cbor_codec::encode")]
    pub terms: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct ParameterChangeAction {
    #[n(0)]
    pub previous_action_id: Option<GovActionId>,
    #[n(1)]
    pub protocol_param_update: Box<ProtocolParamUpdate>,
    #[n(2)]
    pub script_hash: Option<ScriptHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct HardForkInitiationAction {
    #[n(0)]
    pub previous_action_id: Option<GovActionId>,
    #[n(1)]
    pub protocol_version: ProtocolVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct TreasuryWithdrawalsAction {
    #[n(0)]
    pub rewards: BTreeMap<StakeAddress, Lovelace>,
    #[n(1)]
    pub script_hash: Option<ScriptHash>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct NoConfidenceAction {
    #[n(0)]
    pub previous_action_id: Option<GovActionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct UpdateCommitteeAction {
    #[n(0)]
    pub previous_action_id: Option<GovActionId>,
    #[n(1)]
    pub data: CommitteeChange,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct NewConstitutionAction {
    #[n(0)]
    pub previous_action_id: Option<GovActionId>,
    #[n(1)]
    pub new_constitution: Constitution,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub enum GovernanceAction {
    #[n(0)]
    ParameterChange(#[n(0)] ParameterChangeAction),
    #[n(1)]
    HardForkInitiation(#[n(0)] HardForkInitiationAction),
    #[n(2)]
    TreasuryWithdrawals(#[n(0)] TreasuryWithdrawalsAction),
    #[n(3)]
    NoConfidence(#[n(0)] NoConfidenceAction),
    #[n(4)]
    UpdateCommittee(#[n(0)] UpdateCommitteeAction),
    #[n(5)]
    NewConstitution(#[n(0)] NewConstitutionAction),
    #[n(6)]
    Information,
}

/// Actions of the same purpose form a chain through their previous-action links
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum GovernancePurpose {
    ParameterChange,
    HardFork,
    Committee,
    Constitution,
}

impl GovernanceAction {
    pub fn get_previous_action_id(&self) -> Option<GovActionId> {
        match self {
            GovernanceAction::ParameterChange(a) => a.previous_action_id,
            GovernanceAction::HardForkInitiation(a) => a.previous_action_id,
            GovernanceAction::TreasuryWithdrawals(_) => None,
            GovernanceAction::NoConfidence(a) => a.previous_action_id,
            GovernanceAction::UpdateCommittee(a) => a.previous_action_id,
            GovernanceAction::NewConstitution(a) => a.previous_action_id,
            GovernanceAction::Information => None,
        }
    }

    pub fn get_action_name(&self) -> &str {
        match self {
            GovernanceAction::ParameterChange(_) => "ParameterChange",
            GovernanceAction::HardForkInitiation(_) => "HardForkInitiation",
            GovernanceAction::TreasuryWithdrawals(_) => "TreasuryWithdrawals",
            GovernanceAction::NoConfidence(_) => "NoConfidence",
            GovernanceAction::UpdateCommittee(_) => "UpdateCommittee",
            GovernanceAction::NewConstitution(_) => "NewConstitution",
            GovernanceAction::Information => "Information",
        }
    }

    pub fn purpose(&self) -> Option<GovernancePurpose> {
        match self {
            GovernanceAction::ParameterChange(_) => Some(GovernancePurpose::ParameterChange),
            GovernanceAction::HardForkInitiation(_) => Some(GovernancePurpose::HardFork),
            GovernanceAction::NoConfidence(_) | GovernanceAction::UpdateCommittee(_) => {
                Some(GovernancePurpose::Committee)
            }
            GovernanceAction::NewConstitution(_) => Some(GovernancePurpose::Constitution),
            GovernanceAction::TreasuryWithdrawals(_) | GovernanceAction::Information => None,
        }
    }

    /// Guardrail policy hash declared by the action, for the kinds that carry one
    pub fn policy_hash(&self) -> Option<ScriptHash> {
        match self {
            GovernanceAction::ParameterChange(a) => a.script_hash,
            GovernanceAction::TreasuryWithdrawals(a) => a.script_hash,
            _ => None,
        }
    }

    /// Kinds that must be witnessed by the constitution's guardrail script when one is set
    pub fn is_guarded(&self) -> bool {
        matches!(
            self,
            GovernanceAction::ParameterChange(_) | GovernanceAction::TreasuryWithdrawals(_)
        )
    }

    /// The only kinds that can be ratified while governance is bootstrapping
    pub fn allowed_in_bootstrap(&self) -> bool {
        matches!(
            self,
            GovernanceAction::ParameterChange(_)
                | GovernanceAction::HardForkInitiation(_)
                | GovernanceAction::Information
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct ProposalProcedure {
    #[n(0)]
    pub deposit: Lovelace,
    #[n(1)]
    pub reward_account: StakeAddress,
    #[n(2)]
    pub gov_action: GovernanceAction,
    #[n(3)]
    pub anchor: Anchor,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
)]
pub enum Voter {
    #[n(0)]
    ConstitutionalCommitteeKey(#[n(0)] KeyHash),
    #[n(1)]
    ConstitutionalCommitteeScript(#[n(0)] ScriptHash),
    #[n(2)]
    DRepKey(#[n(0)] KeyHash),
    #[n(3)]
    DRepScript(#[n(0)] ScriptHash),
    #[n(4)]
    StakePoolKey(#[n(0)] PoolId),
}

impl Voter {
    /// Credential that must witness the vote
    pub fn credential(&self) -> Credential {
        match self {
            Voter::ConstitutionalCommitteeKey(h) | Voter::DRepKey(h) | Voter::StakePoolKey(h) => {
                Credential::AddrKeyHash(*h)
            }
            Voter::ConstitutionalCommitteeScript(h) | Voter::DRepScript(h) => {
                Credential::ScriptHash(*h)
            }
        }
    }
}

impl fmt::Display for Voter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voter::ConstitutionalCommitteeKey(h) => write!(f, "cc-key:{h}"),
            Voter::ConstitutionalCommitteeScript(h) => write!(f, "cc-script:{h}"),
            Voter::DRepKey(h) => write!(f, "drep-key:{h}"),
            Voter::DRepScript(h) => write!(f, "drep-script:{h}"),
            Voter::StakePoolKey(h) => write!(f, "pool:{h}"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
pub enum Vote {
    #[n(0)]
    No,
    #[n(1)]
    Yes,
    #[n(2)]
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct VotingProcedure {
    #[n(0)]
    pub vote: Vote,
    #[n(1)]
    pub anchor: Option<Anchor>,
}

impl VotingProcedure {
    pub fn new(vote: Vote) -> Self {
        Self { vote, anchor: None }
    }
}

/// Votes carried by one transaction, ordered by voter then by action
pub type VotingProcedures = BTreeMap<Voter, BTreeMap<GovActionId, VotingProcedure>>;

#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct VoteCount {
    pub yes: u64,
    pub no: u64,
    pub abstain: u64,
}

impl VoteCount {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.yes + self.no + self.abstain
    }
}

impl fmt::Display for VoteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "y{}/n{}/a{}", self.yes, self.no, self.abstain)
    }
}

/// One value per voter class
#[derive(Default, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VoteResult<T> {
    pub committee: T,
    pub drep: T,
    pub pool: T,
}

impl<T> VoteResult<T> {
    pub fn new(committee: T, drep: T, pool: T) -> Self {
        Self {
            committee,
            drep,
            pool,
        }
    }
}

impl<T: fmt::Display> fmt::Display for VoteResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}:d{}:p{}", self.committee, self.drep, self.pool)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub enum ProposalStatus {
    Active,
    Ratified,
    Enacted,
    Expired,
    Rejected,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Enacted | ProposalStatus::Expired | ProposalStatus::Rejected
        )
    }
}
