//! Errors returned by the emulator's public operations
use emulator_common::{validation::ValidationError, Slot};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmulatorError {
    /// The submitted transaction was rejected; the ledger is unchanged
    #[error("Transaction rejected: {0}")]
    Validation(Box<ValidationError>),

    #[error("Cannot move time back from slot {current} to slot {target}")]
    TimeTravel { current: Slot, target: Slot },

    #[error("Unknown wallet {0}")]
    UnknownWallet(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Block timer: {0}")]
    Timer(String),

    /// Broken ledger bookkeeping; not caused by the submitted transaction
    #[error("Internal ledger error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<Box<ValidationError>> for EmulatorError {
    fn from(error: Box<ValidationError>) -> Self {
        Self::Validation(error)
    }
}

impl EmulatorError {
    /// The validation failure, when this is a rejected submission
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}
