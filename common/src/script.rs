use std::collections::HashSet;

use crate::{
    cbor::to_canonical_cbor,
    crypto::{blake2b_224, blake2b_224_tagged, blake2b_256},
    hash::{DatumHash, KeyHash, ScriptHash},
};

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
pub enum PlutusLanguage {
    #[n(0)]
    V1,
    #[n(1)]
    V2,
    #[n(2)]
    V3,
}

impl PlutusLanguage {
    /// Prefix byte of the script hash preimage
    pub fn hash_tag(&self) -> u8 {
        match self {
            PlutusLanguage::V1 => 1,
            PlutusLanguage::V2 => 2,
            PlutusLanguage::V3 => 3,
        }
    }
}

/// A Plutus script, kept as its flat-encoded bytes
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlutusScript {
    pub language: PlutusLanguage,
    pub bytes: Vec<u8>,
}

impl PlutusScript {
    pub fn new(language: PlutusLanguage, bytes: Vec<u8>) -> Self {
        Self { language, bytes }
    }

    pub fn compute_hash(&self) -> ScriptHash {
        blake2b_224_tagged(self.language.hash_tag(), &self.bytes)
    }
}

impl<C> minicbor::Encode<C> for PlutusScript {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.encode_with(self.language, ctx)?;
        e.bytes(&self.bytes)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NativeScript {
    ScriptPubkey(KeyHash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK(u32, Vec<NativeScript>),
    InvalidBefore(u64),
    InvalidHereafter(u64),
}

impl<C> minicbor::encode::Encode<C> for NativeScript {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            NativeScript::ScriptPubkey(v) => {
                e.array(2)?;
                e.encode_with(0, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAll(v) => {
                e.array(2)?;
                e.encode_with(1, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptAny(v) => {
                e.array(2)?;
                e.encode_with(2, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::ScriptNOfK(a, b) => {
                e.array(3)?;
                e.encode_with(3, ctx)?;
                e.encode_with(a, ctx)?;
                e.encode_with(b, ctx)?;
            }
            NativeScript::InvalidBefore(v) => {
                e.array(2)?;
                e.encode_with(4, ctx)?;
                e.encode_with(v, ctx)?;
            }
            NativeScript::InvalidHereafter(v) => {
                e.array(2)?;
                e.encode_with(5, ctx)?;
                e.encode_with(v, ctx)?;
            }
        }

        Ok(())
    }
}

impl NativeScript {
    pub fn compute_hash(&self) -> ScriptHash {
        let mut data = vec![0u8];
        data.extend_from_slice(&to_canonical_cbor(self));
        blake2b_224(&data)
    }

    /// Evaluate against the transaction's key witnesses and validity interval
    pub fn eval(
        &self,
        vkey_hashes_provided: &HashSet<KeyHash>,
        low_bnd: Option<u64>,
        upp_bnd: Option<u64>,
    ) -> bool {
        match self {
            Self::ScriptAll(scripts) => {
                scripts.iter().all(|script| script.eval(vkey_hashes_provided, low_bnd, upp_bnd))
            }
            Self::ScriptAny(scripts) => {
                scripts.iter().any(|script| script.eval(vkey_hashes_provided, low_bnd, upp_bnd))
            }
            Self::ScriptPubkey(hash) => vkey_hashes_provided.contains(hash),
            Self::ScriptNOfK(val, scripts) => {
                let count = scripts
                    .iter()
                    .map(|script| script.eval(vkey_hashes_provided, low_bnd, upp_bnd))
                    .fold(0, |x, y| x + y as u32);
                count >= *val
            }
            Self::InvalidBefore(val) => match low_bnd {
                Some(slot) => *val <= slot,
                None => false,
            },
            Self::InvalidHereafter(val) => match upp_bnd {
                Some(slot) => *val >= slot,
                None => false,
            },
        }
    }

    /// Every key hash mentioned by a signature leaf
    pub fn key_hashes(&self) -> Vec<KeyHash> {
        match self {
            Self::ScriptPubkey(hash) => vec![*hash],
            Self::ScriptAll(scripts) | Self::ScriptAny(scripts) | Self::ScriptNOfK(_, scripts) => {
                scripts.iter().flat_map(|s| s.key_hashes()).collect()
            }
            Self::InvalidBefore(_) | Self::InvalidHereafter(_) => Vec::new(),
        }
    }
}

/// Script carried by an output as a reference script
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScriptRef {
    Native(NativeScript),
    Plutus(PlutusScript),
}

impl ScriptRef {
    pub fn compute_hash(&self) -> ScriptHash {
        match self {
            ScriptRef::Native(script) => script.compute_hash(),
            ScriptRef::Plutus(script) => script.compute_hash(),
        }
    }

    /// Size counted by the reference script fee
    pub fn size(&self) -> u64 {
        match self {
            ScriptRef::Native(script) => to_canonical_cbor(script).len() as u64,
            ScriptRef::Plutus(script) => script.bytes.len() as u64,
        }
    }
}

impl<C> minicbor::Encode<C> for ScriptRef {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            ScriptRef::Native(script) => {
                e.u8(0)?;
                e.encode_with(script, ctx)?;
            }
            ScriptRef::Plutus(script) => {
                e.u8(script.language.hash_tag())?;
                e.bytes(&script.bytes)?;
            }
        }
        Ok(())
    }
}

/// Opaque Plutus data, kept as its CBOR bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PlutusData(pub Vec<u8>);

impl PlutusData {
    pub fn compute_hash(&self) -> DatumHash {
        blake2b_256(&self.0)
    }
}

impl<C> minicbor::Encode<C> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?.ok()
    }
}

/// Datum (inline or hash)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub enum Datum {
    #[n(0)]
    Hash(#[n(0)] DatumHash),
    #[n(1)]
    Inline(#[n(0)] PlutusData),
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
pub enum RedeemerTag {
    #[n(0)]
    Spend,
    #[n(1)]
    Mint,
    #[n(2)]
    Cert,
    #[n(3)]
    Reward,
    #[n(4)]
    Vote,
    #[n(5)]
    Propose,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
pub struct ExUnits {
    #[n(0)]
    pub mem: u64,
    #[n(1)]
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }

    /// Both dimensions at least as large as `other`
    pub fn covers(&self, other: &ExUnits) -> bool {
        self.mem >= other.mem && self.steps >= other.steps
    }
}

/// Redeemer lookup key: purpose tag and index within that purpose
pub type RedeemerPointer = (RedeemerTag, u32);

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct Redeemer {
    #[n(0)]
    pub tag: RedeemerTag,
    #[n(1)]
    pub index: u32,
    #[n(2)]
    pub data: PlutusData,
    #[n(3)]
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub fn pointer(&self) -> RedeemerPointer {
        (self.tag, self.index)
    }
}
