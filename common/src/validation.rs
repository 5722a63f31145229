//! Transaction validation errors

use std::fmt;

use thiserror::Error;

use crate::{
    address::{Credential, NetworkId, StakeAddress},
    asset::Lovelace,
    drep::DRepCredential,
    governance::{GovActionId, Voter},
    hash::{KeyHash, PoolId, ScriptHash},
    script::{ExUnits, RedeemerTag},
    types::{Slot, UTxOIdentifier},
};

pub type ValidationResult<T = ()> = Result<T, Box<ValidationError>>;

/// Kind of witness reported as extraneous
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WitnessCategory {
    VKey,
    NativeScript,
    PlutusScript,
    Datum,
}

impl fmt::Display for WitnessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WitnessCategory::VKey => "vkey",
            WitnessCategory::NativeScript => "native script",
            WitnessCategory::PlutusScript => "plutus script",
            WitnessCategory::Datum => "datum",
        })
    }
}

/// Reason a submitted transaction was rejected. Every variant leaves the ledger untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // Resolution
    #[error("Input not found: {input}")]
    InputNotFound { input: UTxOIdentifier },

    #[error("Collateral input not found: {input}")]
    CollateralInputNotFound { input: UTxOIdentifier },

    #[error("Reference input not found: {input}")]
    ReferenceInputNotFound { input: UTxOIdentifier },

    // Witnesses
    #[error("Invalid signature from key {key_hash}")]
    InvalidSignature { key_hash: KeyHash },

    #[error("Missing vkey witness {key_hash}")]
    MissingVKeyWitness { key_hash: KeyHash },

    #[error("Missing script witness {script_hash}")]
    MissingScriptWitness { script_hash: ScriptHash },

    #[error("Missing redeemer {tag:?}#{index}")]
    MissingRedeemer { tag: RedeemerTag, index: u32 },

    #[error("Native script {script_hash} failed")]
    NativeScriptFailed { script_hash: ScriptHash },

    #[error("Extraneous {category} witness {hash}")]
    ExtraneousWitness {
        category: WitnessCategory,
        hash: String,
    },

    #[error("Vote from unregistered DRep {voter}")]
    UnregisteredDRepVote { voter: Voter },

    #[error("Voter {voter} is not authorized")]
    UnauthorizedCommitteeVote { voter: Voter },

    #[error("Voter {voter} does not resolve to an active pool")]
    UnknownPoolVoter { voter: Voter },

    // Balance
    #[error("Value not conserved: {delta}")]
    ValueNotConserved { delta: String },

    #[error("Withdrawal of {declared} from {account} does not match balance {balance}")]
    WithdrawalMismatch {
        account: StakeAddress,
        declared: Lovelace,
        balance: Lovelace,
    },

    #[error("Insufficient collateral: {provided} provided, {required} required")]
    InsufficientCollateral { provided: Lovelace, required: Lovelace },

    #[error("Total collateral declared as {declared}, actual {actual}")]
    TotalCollateralMismatch { declared: Lovelace, actual: Lovelace },

    #[error("Fee {declared} below minimum {minimum}")]
    FeeTooSmall { declared: Lovelace, minimum: Lovelace },

    #[error("Underestimated budget for {tag:?}#{index}: declared {declared:?}, needs {evaluated:?}")]
    UnderestimatedBudget {
        tag: RedeemerTag,
        index: u32,
        declared: ExUnits,
        evaluated: ExUnits,
    },

    #[error("Evaluated redeemer {tag:?}#{index} was not declared")]
    UndeclaredRedeemer { tag: RedeemerTag, index: u32 },

    #[error("Script evaluation failed: {reason}")]
    EvaluationFailure { reason: String },

    // Shape
    #[error("Transaction has no inputs")]
    EmptyInputs,

    #[error("Input {input} is also a reference input")]
    OverlappingReferenceInput { input: UTxOIdentifier },

    #[error("Output {index} holds {coin} lovelace, minimum is {minimum}")]
    OutputTooSmall {
        index: usize,
        coin: Lovelace,
        minimum: Lovelace,
    },

    #[error("Output {index} value is {size} bytes, maximum is {max}")]
    OutputValueTooLarge { index: usize, size: u64, max: u64 },

    #[error("Transaction is {size} bytes, maximum is {max}")]
    TxTooLarge { size: u64, max: u64 },

    #[error("Slot {slot} outside validity interval [{valid_from:?}, {valid_until:?})")]
    OutsideValidityInterval {
        slot: Slot,
        valid_from: Option<Slot>,
        valid_until: Option<Slot>,
    },

    #[error("Validity interval starts at {valid_from} but ends at {valid_until}")]
    InvertedValidityInterval { valid_from: Slot, valid_until: Slot },

    #[error("Wrong network: expected {expected:?}, found {found:?}")]
    WrongNetwork { expected: NetworkId, found: NetworkId },

    #[error("{count} collateral inputs, maximum is {max}")]
    TooManyCollateralInputs { count: usize, max: u64 },

    #[error("Collateral input {input} is locked by a script")]
    ScriptCollateral { input: UTxOIdentifier },

    #[error("Transaction with redeemers is flagged invalid")]
    ValidityFlagFalse,

    // Certificates and governance
    #[error("Stake address {account} already registered")]
    StakeAlreadyRegistered { account: StakeAddress },

    #[error("Stake address {account} not registered")]
    StakeNotRegistered { account: StakeAddress },

    #[error("Stake address {account} still holds {balance} in rewards")]
    NonZeroRewardBalance {
        account: StakeAddress,
        balance: Lovelace,
    },

    #[error("Unknown pool {pool}")]
    UnknownPool { pool: PoolId },

    #[error("Unknown DRep {credential}")]
    UnknownDRep { credential: DRepCredential },

    #[error("DRep {credential} already registered")]
    DRepAlreadyRegistered { credential: DRepCredential },

    #[error("DRep {credential} not registered")]
    DRepNotRegistered { credential: DRepCredential },

    #[error("Unknown committee member {credential}")]
    UnknownCommitteeMember { credential: Credential },

    #[error("Governance action {id} already exists")]
    DuplicateGovActionId { id: GovActionId },

    #[error("Wrong deposit: expected {expected}, found {found}")]
    WrongDeposit { expected: Lovelace, found: Lovelace },

    #[error("Wrong refund: expected {expected}, found {found}")]
    WrongRefund { expected: Lovelace, found: Lovelace },

    #[error("Governance action {id} is unknown or closed to votes")]
    ProposalNotActive { id: GovActionId },

    #[error("Constitution proposal links to {found:?}, last enacted is {expected:?}")]
    WrongPreviousConstitution {
        expected: Option<GovActionId>,
        found: Option<GovActionId>,
    },

    #[error("Committee member {credential} term {term} is not after epoch {epoch}")]
    ExpiredCommitteeTerm {
        credential: Credential,
        term: u64,
        epoch: u64,
    },

    #[error("Proposal return account {account} is not registered")]
    UnregisteredReturnAccount { account: StakeAddress },

    #[error("Wrong policy hash: expected {expected:?}, found {found:?}")]
    WrongPolicyHash {
        expected: Option<ScriptHash>,
        found: Option<ScriptHash>,
    },

    #[error("Ledger state error: {0}")]
    LedgerState(String),
}

impl From<anyhow::Error> for Box<ValidationError> {
    fn from(e: anyhow::Error) -> Self {
        Box::new(ValidationError::LedgerState(e.to_string()))
    }
}
