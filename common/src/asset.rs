use std::{
    collections::BTreeMap,
    fmt,
    ops::{AddAssign, SubAssign},
};

use dashu_int::IBig;

use crate::hash::ScriptHash;

pub type PolicyId = ScriptHash;
pub type Lovelace = u64;

/// Asset name, at most 32 bytes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() > 32 {
            return None;
        }
        Some(Self(data.to_vec()))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl<C> minicbor::Encode<C> for AssetName {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?.ok()
    }
}

pub type NativeAssets = BTreeMap<PolicyId, BTreeMap<AssetName, u64>>;

/// Signed asset quantities, as carried by a mint field (negative = burn)
pub type Mint = BTreeMap<PolicyId, BTreeMap<AssetName, i64>>;

/// Ada plus native assets. Zero quantities are never stored.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Value {
    pub lovelace: Lovelace,
    pub assets: NativeAssets,
}

impl Value {
    pub fn new(lovelace: Lovelace, assets: NativeAssets) -> Self {
        Self { lovelace, assets }
    }

    pub fn lovelace(lovelace: Lovelace) -> Self {
        Self::new(lovelace, NativeAssets::new())
    }

    pub fn coin(&self) -> Lovelace {
        self.lovelace
    }

    pub fn with_asset(mut self, policy: PolicyId, name: AssetName, quantity: u64) -> Self {
        if quantity > 0 {
            *self.assets.entry(policy).or_default().entry(name).or_default() += quantity;
        }
        self
    }

    pub fn is_pure_ada(&self) -> bool {
        self.assets.is_empty()
    }
}

// Pure-ada values encode as a bare coin, otherwise as [coin, multiasset]
impl<C> minicbor::Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if self.assets.is_empty() {
            e.u64(self.lovelace)?;
        } else {
            e.array(2)?;
            e.u64(self.lovelace)?;
            e.encode_with(&self.assets, ctx)?;
        }
        Ok(())
    }
}

/// Exact running balance of a transaction, per asset, in arbitrary precision.
///
/// Consumed amounts are added and produced amounts subtracted; a balanced transaction leaves
/// every entry at zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValueBalance {
    lovelace: IBig,
    assets: BTreeMap<(PolicyId, AssetName), IBig>,
}

impl ValueBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lovelace(&mut self, amount: Lovelace) {
        self.lovelace += IBig::from(amount);
    }

    pub fn sub_lovelace(&mut self, amount: Lovelace) {
        self.lovelace -= IBig::from(amount);
    }

    /// Apply a mint field: positive quantities add, burns subtract
    pub fn add_mint(&mut self, mint: &Mint) {
        for (policy, names) in mint {
            for (name, quantity) in names {
                self.adjust_asset(policy, name, IBig::from(*quantity));
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.lovelace == IBig::ZERO && self.assets.is_empty()
    }

    pub fn lovelace_delta(&self) -> &IBig {
        &self.lovelace
    }

    /// Non-zero asset entries, for diagnostics
    pub fn asset_deltas(&self) -> Vec<(PolicyId, AssetName, IBig)> {
        self.assets
            .iter()
            .map(|((policy, name), amount)| (*policy, name.clone(), amount.clone()))
            .collect()
    }

    fn adjust_asset(&mut self, policy: &PolicyId, name: &AssetName, delta: IBig) {
        let key = (*policy, name.clone());
        let entry = self.assets.entry(key.clone()).or_default();
        *entry += delta;
        if *entry == IBig::ZERO {
            self.assets.remove(&key);
        }
    }
}

impl AddAssign<&Value> for ValueBalance {
    fn add_assign(&mut self, other: &Value) {
        self.lovelace += IBig::from(other.lovelace);
        for (policy, names) in &other.assets {
            for (name, quantity) in names {
                self.adjust_asset(policy, name, IBig::from(*quantity));
            }
        }
    }
}

impl SubAssign<&Value> for ValueBalance {
    fn sub_assign(&mut self, other: &Value) {
        self.lovelace -= IBig::from(other.lovelace);
        for (policy, names) in &other.assets {
            for (name, quantity) in names {
                self.adjust_asset(policy, name, -IBig::from(*quantity));
            }
        }
    }
}

impl fmt::Display for ValueBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lovelace", self.lovelace)?;
        for ((policy, name), amount) in &self.assets {
            write!(f, ", {amount} {policy}.{name}")?;
        }
        Ok(())
    }
}
