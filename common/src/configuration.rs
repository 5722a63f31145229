use anyhow::{bail, Result};
use config::Config;
use tracing::info;

use crate::{
    address::NetworkId,
    calculations::{SlotConfig, DEFAULT_SLOTS_PER_EPOCH, DEFAULT_SLOT_LENGTH_MS},
    protocol_params::{MinFeeReferenceScripts, ProtocolParams},
    rational_number::{rational_number_from_str, RationalNumber},
};

pub const CONFIG_KEY_NETWORK: &str = "network";
pub const CONFIG_KEY_SLOT_ZERO_TIME: &str = "slot.zero-time";
pub const CONFIG_KEY_SLOT_ZERO_SLOT: &str = "slot.zero-slot";
pub const CONFIG_KEY_SLOT_LENGTH: &str = "slot.length";
pub const CONFIG_KEY_SLOTS_PER_EPOCH: &str = "slot.per-epoch";
pub const CONFIG_KEY_BLOCK_INTERVAL_MS: &str = "block.interval-ms";
pub const CONFIG_KEY_BOOTSTRAP: &str = "governance.bootstrap";
pub const CONFIG_KEY_TREASURY_FEE_SHARE: &str = "governance.treasury-fee-share";
pub const CONFIG_KEY_INITIAL_TREASURY: &str = "treasury.initial";
pub const CONFIG_KEY_REF_SCRIPT_FEE_BASE: &str = "ref-script-fee.base";
pub const CONFIG_KEY_REF_SCRIPT_FEE_RANGE: &str = "ref-script-fee.range";
pub const CONFIG_KEY_REF_SCRIPT_FEE_MULTIPLIER: &str = "ref-script-fee.multiplier";

pub const DEFAULT_BLOCK_INTERVAL_MS: u64 = 20_000;

/// Everything the emulator needs at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub network: NetworkId,
    pub slot: SlotConfig,
    pub block_interval_ms: u64,
    pub bootstrap: bool,
    pub treasury_fee_share: RationalNumber,
    pub initial_treasury: u64,
    pub ref_script_fee: MinFeeReferenceScripts,
    pub protocol_params: ProtocolParams,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::Testnet,
            slot: SlotConfig::default(),
            block_interval_ms: DEFAULT_BLOCK_INTERVAL_MS,
            bootstrap: true,
            treasury_fee_share: RationalNumber::from_integer(1),
            initial_treasury: 0,
            ref_script_fee: MinFeeReferenceScripts::default(),
            protocol_params: ProtocolParams::default(),
        }
    }
}

impl EmulatorConfig {
    /// Read every key with its default; only malformed fractions are errors
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Self::default();
        let rational = |key: &str, default: &RationalNumber| -> Result<RationalNumber> {
            match config.get_string(key) {
                Ok(text) => rational_number_from_str(&text),
                Err(_) => Ok(*default),
            }
        };

        let slot = SlotConfig {
            zero_time: config.get::<u64>(CONFIG_KEY_SLOT_ZERO_TIME).unwrap_or(0),
            zero_slot: config.get::<u64>(CONFIG_KEY_SLOT_ZERO_SLOT).unwrap_or(0),
            slot_length: config.get::<u64>(CONFIG_KEY_SLOT_LENGTH).unwrap_or(DEFAULT_SLOT_LENGTH_MS),
            slots_per_epoch: config
                .get::<u64>(CONFIG_KEY_SLOTS_PER_EPOCH)
                .unwrap_or(DEFAULT_SLOTS_PER_EPOCH),
        };

        let ref_script_fee = MinFeeReferenceScripts {
            base: rational(CONFIG_KEY_REF_SCRIPT_FEE_BASE, &defaults.ref_script_fee.base)?,
            range: config
                .get::<u64>(CONFIG_KEY_REF_SCRIPT_FEE_RANGE)
                .unwrap_or(defaults.ref_script_fee.range),
            multiplier: rational(
                CONFIG_KEY_REF_SCRIPT_FEE_MULTIPLIER,
                &defaults.ref_script_fee.multiplier,
            )?,
        };

        let parsed = Self {
            network: config.get::<NetworkId>(CONFIG_KEY_NETWORK).unwrap_or(defaults.network),
            slot,
            block_interval_ms: config
                .get::<u64>(CONFIG_KEY_BLOCK_INTERVAL_MS)
                .unwrap_or(DEFAULT_BLOCK_INTERVAL_MS),
            bootstrap: config.get::<bool>(CONFIG_KEY_BOOTSTRAP).unwrap_or(true),
            treasury_fee_share: rational(
                CONFIG_KEY_TREASURY_FEE_SHARE,
                &defaults.treasury_fee_share,
            )?,
            initial_treasury: config.get::<u64>(CONFIG_KEY_INITIAL_TREASURY).unwrap_or(0),
            ref_script_fee,
            protocol_params: defaults.protocol_params,
        };
        parsed.validate()?;
        info!(
            network = ?parsed.network,
            slot_length = parsed.slot.slot_length,
            slots_per_epoch = parsed.slot.slots_per_epoch,
            treasury_fee_share = %parsed.treasury_fee_share,
            "Loaded emulator configuration"
        );
        Ok(parsed)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.slot.slot_length == 0 {
            bail!("{CONFIG_KEY_SLOT_LENGTH} must be positive");
        }
        if self.slot.slots_per_epoch == 0 {
            bail!("{CONFIG_KEY_SLOTS_PER_EPOCH} must be positive");
        }
        if self.treasury_fee_share > RationalNumber::from_integer(1) {
            bail!(
                "{CONFIG_KEY_TREASURY_FEE_SHARE} {} is more than the whole fee pot",
                self.treasury_fee_share
            );
        }
        Ok(())
    }
}
