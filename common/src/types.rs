//! Core UTxO types

use std::fmt;

use crate::{
    address::Address,
    asset::Value,
    hash::TxHash,
    script::{Datum, ScriptRef},
};

pub type Slot = u64;
pub type Epoch = u64;

/// Transaction input: the transaction that produced an output and the output's index.
///
/// Ordering is (transaction id, index), which is the order spend redeemers are indexed in.
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
pub struct UTxOIdentifier {
    #[n(0)]
    pub tx_hash: TxHash,
    #[n(1)]
    pub output_index: u64,
}

impl UTxOIdentifier {
    pub fn new(tx_hash: TxHash, output_index: u64) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

impl fmt::Display for UTxOIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct TxOutput {
    #[n(0)]
    pub address: Address,
    #[n(1)]
    pub value: Value,
    #[n(2)]
    pub datum: Option<Datum>,
    #[n(3)]
    pub script_ref: Option<ScriptRef>,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: None,
            script_ref: None,
        }
    }

    pub fn with_datum(mut self, datum: Datum) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: ScriptRef) -> Self {
        self.script_ref = Some(script);
        self
    }
}
