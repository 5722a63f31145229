//! Shelley-style payment and stake addresses
use crate::hash::{KeyHash, ScriptHash};
use anyhow::{anyhow, bail, Result};
use std::fmt::{self, Display};

/// Network discriminant carried in address headers and transaction bodies
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
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    #[default]
    #[n(0)]
    Testnet,
    #[n(1)]
    Mainnet,
}

impl NetworkId {
    fn header_bits(&self) -> u8 {
        match self {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }
}

/// A key or script credential
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
pub enum Credential {
    /// Key hash of a verification key
    #[n(0)]
    AddrKeyHash(#[n(0)] KeyHash),

    /// Script hash
    #[n(1)]
    ScriptHash(#[n(0)] ScriptHash),
}

pub type StakeCredential = Credential;

impl Credential {
    pub fn hash(&self) -> &[u8; 28] {
        match self {
            Credential::AddrKeyHash(h) | Credential::ScriptHash(h) => h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::ScriptHash(_))
    }

    fn header_bit(&self) -> u8 {
        match self {
            Credential::AddrKeyHash(_) => 0,
            Credential::ScriptHash(_) => 1,
        }
    }
}

impl Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::AddrKeyHash(h) => write!(f, "key:{h}"),
            Credential::ScriptHash(h) => write!(f, "script:{h}"),
        }
    }
}

/// A Shelley base or enterprise address. Pointer and Byron addresses are not modelled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Address {
    pub network: NetworkId,
    pub payment: Credential,
    pub delegation: Option<StakeCredential>,
}

impl Address {
    pub fn new(network: NetworkId, payment: Credential, delegation: Option<Credential>) -> Self {
        Self {
            network,
            payment,
            delegation,
        }
    }

    /// Raw header + hashes, as carried in outputs
    pub fn to_binary(&self) -> Vec<u8> {
        let delegation_bits = match &self.delegation {
            Some(cred) => cred.header_bit() << 1,
            None => 3,
        };
        let header = self.network.header_bits()
            | (self.payment.header_bit() << 4)
            | (delegation_bits << 5);

        let mut data = vec![header];
        data.extend(self.payment.hash());
        if let Some(cred) = &self.delegation {
            data.extend(cred.hash());
        }
        data
    }

    pub fn from_binary(data: &[u8]) -> Result<Self> {
        let header = *data.first().ok_or_else(|| anyhow!("Empty address data"))?;
        let network = match header & 0x0f {
            0 => NetworkId::Testnet,
            1 => NetworkId::Mainnet,
            n => bail!("Unknown network id {n} in address header"),
        };
        let credential = |bit: u8, bytes: &[u8]| -> Result<Credential> {
            let hash = bytes.try_into()?;
            Ok(match bit {
                0 => Credential::AddrKeyHash(hash),
                _ => Credential::ScriptHash(hash),
            })
        };
        if data.len() < 29 {
            bail!("Address too short: {} bytes", data.len());
        }
        let payment = credential((header >> 4) & 0x01, &data[1..29])?;
        let delegation = match (header >> 5) & 0x07 {
            0 | 1 if data.len() == 57 => Some(credential((header >> 5) & 0x01, &data[29..57])?),
            3 if data.len() == 29 => None,
            kind => bail!("Unsupported address kind {kind} ({} bytes)", data.len()),
        };
        Ok(Self {
            network,
            payment,
            delegation,
        })
    }

    /// Reward account sharing this address's delegation part
    pub fn stake_address(&self) -> Option<StakeAddress> {
        self.delegation.map(|credential| StakeAddress::new(credential, self.network))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = match self.network {
            NetworkId::Mainnet => "addr",
            NetworkId::Testnet => "addr_test",
        };
        bech32_string(hrp, &self.to_binary(), f)
    }
}

impl<C> minicbor::Encode<C> for Address {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_binary())?.ok()
    }
}

/// A reward account (stake address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct StakeAddress {
    pub network: NetworkId,
    pub credential: StakeCredential,
}

impl StakeAddress {
    pub fn new(credential: StakeCredential, network: NetworkId) -> Self {
        StakeAddress {
            network,
            credential,
        }
    }

    pub fn to_binary(&self) -> Vec<u8> {
        let header = 0xe0 | (self.credential.header_bit() << 4) | self.network.header_bits();
        let mut data = vec![header];
        data.extend(self.credential.hash());
        data
    }
}

impl Display for StakeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = match self.network {
            NetworkId::Mainnet => "stake",
            NetworkId::Testnet => "stake_test",
        };
        bech32_string(hrp, &self.to_binary(), f)
    }
}

impl<C> minicbor::Encode<C> for StakeAddress {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_binary())?.ok()
    }
}

fn bech32_string(hrp: &str, data: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let hrp = bech32::Hrp::parse(hrp).map_err(|_| fmt::Error)?;
    let text = bech32::encode::<bech32::Bech32>(hrp, data).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;

    fn key(b: u8) -> Credential {
        Credential::AddrKeyHash(Hash::new([b; 28]))
    }

    #[test]
    fn base_address_round_trips_through_binary() -> Result<()> {
        let address = Address::new(NetworkId::Testnet, key(1), Some(key(2)));
        let binary = address.to_binary();
        assert_eq!(binary.len(), 57);
        assert_eq!(binary[0], 0x00);
        assert_eq!(Address::from_binary(&binary)?, address);
        Ok(())
    }

    #[test]
    fn enterprise_script_address_header() -> Result<()> {
        let address =
            Address::new(NetworkId::Testnet, Credential::ScriptHash(Hash::new([9; 28])), None);
        let binary = address.to_binary();
        assert_eq!(binary[0], 0x70);
        assert_eq!(binary.len(), 29);
        assert_eq!(Address::from_binary(&binary)?, address);
        Ok(())
    }

    #[test]
    fn display_uses_network_prefix() {
        let address = Address::new(NetworkId::Testnet, key(1), None);
        assert!(address.to_string().starts_with("addr_test1"));
        let stake = StakeAddress::new(key(1), NetworkId::Testnet);
        assert!(stake.to_string().starts_with("stake_test1"));
        assert_eq!(stake.to_binary()[0], 0xe0);
    }
}
