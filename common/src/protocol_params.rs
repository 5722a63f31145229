use crate::{
    cbor::rational_cbor_codec,
    drep::{DRepVotingThresholds, PoolVotingThresholds},
    rational_number::RationalNumber,
    script::{ExUnits, PlutusLanguage},
};
use bitmask_enum::bitmask;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolVersion {
    #[n(0)]
    pub major: u64,
    #[n(1)]
    pub minor: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct ExUnitPrices {
    #[cbor(n(0), encode_with = "rational_cbor_codec::encode")]
    pub mem_price: RationalNumber,
    #[cbor(n(1), encode_with = "rational_cbor_codec::encode")]
    pub step_price: RationalNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CostModel(Vec<i64>);

impl CostModel {
    pub fn new(m: Vec<i64>) -> Self {
        CostModel(m)
    }

    pub fn as_vec(&self) -> &Vec<i64> {
        &self.0
    }
}

impl<C> minicbor::Encode<C> for CostModel {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.encode_with(&self.0, ctx)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, minicbor::Encode)]
pub struct CostModels {
    #[n(0)]
    pub plutus_v1: Option<CostModel>,
    #[n(1)]
    pub plutus_v2: Option<CostModel>,
    #[n(2)]
    pub plutus_v3: Option<CostModel>,
}

impl CostModels {
    pub fn get(&self, language: PlutusLanguage) -> Option<&CostModel> {
        match language {
            PlutusLanguage::V1 => self.plutus_v1.as_ref(),
            PlutusLanguage::V2 => self.plutus_v2.as_ref(),
            PlutusLanguage::V3 => self.plutus_v3.as_ref(),
        }
    }

    /// Languages present in `update` replace ours, the others are kept
    pub fn merge(&mut self, update: &CostModels) {
        if let Some(m) = &update.plutus_v1 {
            self.plutus_v1 = Some(m.clone());
        }
        if let Some(m) = &update.plutus_v2 {
            self.plutus_v2 = Some(m.clone());
        }
        if let Some(m) = &update.plutus_v3 {
            self.plutus_v3 = Some(m.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plutus_v1.is_none() && self.plutus_v2.is_none() && self.plutus_v3.is_none()
    }
}

/// Tiered pricing of reference scripts: each `range` bytes cost `multiplier` times the
/// previous tier's per-byte price, starting at `base`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MinFeeReferenceScripts {
    pub base: RationalNumber,
    pub range: u64,
    pub multiplier: RationalNumber,
}

impl Default for MinFeeReferenceScripts {
    fn default() -> Self {
        Self {
            base: RationalNumber::from_integer(15),
            range: 25_600,
            multiplier: RationalNumber::new(6, 5),
        }
    }
}

/// Conway protocol parameters. The reference script base price is not part of this set;
/// it lives in [`MinFeeReferenceScripts`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProtocolParams {
    pub minfee_a: u64,
    pub minfee_b: u64,
    pub max_block_body_size: u64,
    pub max_transaction_size: u64,
    pub max_block_header_size: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub maximum_epoch: u64,
    pub desired_number_of_stake_pools: u64,
    pub pool_pledge_influence: RationalNumber,
    pub expansion_rate: RationalNumber,
    pub treasury_growth_rate: RationalNumber,
    pub min_pool_cost: u64,
    pub coins_per_utxo_byte: u64,
    pub cost_models: CostModels,
    pub execution_costs: ExUnitPrices,
    pub max_tx_ex_units: ExUnits,
    pub max_block_ex_units: ExUnits,
    pub max_value_size: u64,
    pub collateral_percentage: u64,
    pub max_collateral_inputs: u64,
    pub max_reference_scripts_size: u64,
    pub pool_voting_thresholds: PoolVotingThresholds,
    pub drep_voting_thresholds: DRepVotingThresholds,
    pub min_committee_size: u64,
    pub committee_term_limit: u64,
    pub governance_action_validity_period: u64,
    pub governance_action_deposit: u64,
    pub drep_deposit: u64,
    pub drep_inactivity_period: u64,
    pub protocol_version: ProtocolVersion,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            minfee_a: 44,
            minfee_b: 155_381,
            max_block_body_size: 90_112,
            max_transaction_size: 16_384,
            max_block_header_size: 1_100,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            maximum_epoch: 18,
            desired_number_of_stake_pools: 500,
            pool_pledge_influence: RationalNumber::new(3, 10),
            expansion_rate: RationalNumber::new(3, 1000),
            treasury_growth_rate: RationalNumber::new(1, 5),
            min_pool_cost: 170_000_000,
            coins_per_utxo_byte: 4_310,
            cost_models: CostModels::default(),
            execution_costs: ExUnitPrices {
                mem_price: RationalNumber::new(577, 10_000),
                step_price: RationalNumber::new(721, 10_000_000),
            },
            max_tx_ex_units: ExUnits::new(14_000_000, 10_000_000_000),
            max_block_ex_units: ExUnits::new(62_000_000, 20_000_000_000),
            max_value_size: 5_000,
            collateral_percentage: 150,
            max_collateral_inputs: 3,
            max_reference_scripts_size: 204_800,
            pool_voting_thresholds: PoolVotingThresholds::mainnet(),
            drep_voting_thresholds: DRepVotingThresholds::mainnet(),
            min_committee_size: 7,
            committee_term_limit: 146,
            governance_action_validity_period: 6,
            governance_action_deposit: 100_000_000_000,
            drep_deposit: 500_000_000,
            drep_inactivity_period: 20,
            protocol_version: ProtocolVersion { major: 9, minor: 0 },
        }
    }
}

impl ProtocolParams {
    /// Merge a ratified update. Cost models merge per language. The reference script price
    /// carried by the update is returned for the caller to store, it is not a field here.
    pub fn apply_update(&mut self, p: &ProtocolParamUpdate) -> Option<RationalNumber> {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &p.$field {
                    self.$field = v.clone();
                })*
            };
        }

        merge!(
            minfee_a,
            minfee_b,
            max_block_body_size,
            max_transaction_size,
            max_block_header_size,
            key_deposit,
            pool_deposit,
            maximum_epoch,
            desired_number_of_stake_pools,
            pool_pledge_influence,
            expansion_rate,
            treasury_growth_rate,
            min_pool_cost,
            coins_per_utxo_byte,
            execution_costs,
            max_tx_ex_units,
            max_block_ex_units,
            max_value_size,
            collateral_percentage,
            max_collateral_inputs,
            pool_voting_thresholds,
            drep_voting_thresholds,
            min_committee_size,
            committee_term_limit,
            governance_action_validity_period,
            governance_action_deposit,
            drep_deposit,
            drep_inactivity_period,
        );

        if let Some(cost_models) = &p.cost_models {
            self.cost_models.merge(cost_models);
        }

        p.minfee_refscript_cost_per_byte
    }
}

#[bitmask(u8)]
pub enum ProtocolParamType {
    NetworkGroup,
    EconomicGroup,
    TechnicalGroup,
    GovernanceGroup,
    SecurityProperty,
}

/// A parameter-change payload: every field is optional
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProtocolParamUpdate {
    pub minfee_a: Option<u64>,
    pub minfee_b: Option<u64>,
    pub max_block_body_size: Option<u64>,
    pub max_transaction_size: Option<u64>,
    pub max_block_header_size: Option<u64>,
    pub key_deposit: Option<u64>,
    pub pool_deposit: Option<u64>,
    pub maximum_epoch: Option<u64>,
    pub desired_number_of_stake_pools: Option<u64>,
    pub pool_pledge_influence: Option<RationalNumber>,
    pub expansion_rate: Option<RationalNumber>,
    pub treasury_growth_rate: Option<RationalNumber>,
    pub min_pool_cost: Option<u64>,
    pub coins_per_utxo_byte: Option<u64>,
    pub cost_models: Option<CostModels>,
    pub execution_costs: Option<ExUnitPrices>,
    pub max_tx_ex_units: Option<ExUnits>,
    pub max_block_ex_units: Option<ExUnits>,
    pub max_value_size: Option<u64>,
    pub collateral_percentage: Option<u64>,
    pub max_collateral_inputs: Option<u64>,
    pub pool_voting_thresholds: Option<PoolVotingThresholds>,
    pub drep_voting_thresholds: Option<DRepVotingThresholds>,
    pub min_committee_size: Option<u64>,
    pub committee_term_limit: Option<u64>,
    pub governance_action_validity_period: Option<u64>,
    pub governance_action_deposit: Option<u64>,
    pub drep_deposit: Option<u64>,
    pub drep_inactivity_period: Option<u64>,
    pub minfee_refscript_cost_per_byte: Option<RationalNumber>,
}

impl ProtocolParamUpdate {
    /// Parameter groups touched by this update, which decide its voting thresholds
    pub fn param_types(&self) -> ProtocolParamType {
        let p = self;
        let mut result = ProtocolParamType::none();

        if p.max_block_body_size.is_some()
            || p.max_block_header_size.is_some()
            || p.max_transaction_size.is_some()
            || p.max_value_size.is_some()
            || p.max_block_ex_units.is_some()
            || p.governance_action_deposit.is_some()
            || p.coins_per_utxo_byte.is_some()
            || p.minfee_refscript_cost_per_byte.is_some()
            || p.minfee_a.is_some()
            || p.minfee_b.is_some()
        {
            result |= ProtocolParamType::SecurityProperty;
        }

        if p.max_block_body_size.is_some()
            || p.max_transaction_size.is_some()
            || p.max_block_header_size.is_some()
            || p.max_value_size.is_some()
            || p.max_tx_ex_units.is_some()
            || p.max_block_ex_units.is_some()
            || p.max_collateral_inputs.is_some()
        {
            result |= ProtocolParamType::NetworkGroup;
        }

        if p.minfee_a.is_some()
            || p.minfee_b.is_some()
            || p.key_deposit.is_some()
            || p.pool_deposit.is_some()
            || p.expansion_rate.is_some()
            || p.treasury_growth_rate.is_some()
            || p.min_pool_cost.is_some()
            || p.coins_per_utxo_byte.is_some()
            || p.execution_costs.is_some()
            || p.minfee_refscript_cost_per_byte.is_some()
        {
            result |= ProtocolParamType::EconomicGroup;
        }

        if p.pool_pledge_influence.is_some()
            || p.maximum_epoch.is_some()
            || p.desired_number_of_stake_pools.is_some()
            || p.cost_models.is_some()
            || p.collateral_percentage.is_some()
        {
            result |= ProtocolParamType::TechnicalGroup;
        }

        if p.pool_voting_thresholds.is_some()
            || p.drep_voting_thresholds.is_some()
            || p.governance_action_validity_period.is_some()
            || p.governance_action_deposit.is_some()
            || p.drep_deposit.is_some()
            || p.drep_inactivity_period.is_some()
            || p.min_committee_size.is_some()
            || p.committee_term_limit.is_some()
        {
            result |= ProtocolParamType::GovernanceGroup;
        }

        result
    }
}

// Sparse map keyed by the ledger's parameter numbers, in ascending key order
impl<C> minicbor::Encode<C> for ProtocolParamUpdate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let p = self;
        let present = [
            p.minfee_a.is_some(),
            p.minfee_b.is_some(),
            p.max_block_body_size.is_some(),
            p.max_transaction_size.is_some(),
            p.max_block_header_size.is_some(),
            p.key_deposit.is_some(),
            p.pool_deposit.is_some(),
            p.maximum_epoch.is_some(),
            p.desired_number_of_stake_pools.is_some(),
            p.pool_pledge_influence.is_some(),
            p.expansion_rate.is_some(),
            p.treasury_growth_rate.is_some(),
            p.min_pool_cost.is_some(),
            p.coins_per_utxo_byte.is_some(),
            p.cost_models.is_some(),
            p.execution_costs.is_some(),
            p.max_tx_ex_units.is_some(),
            p.max_block_ex_units.is_some(),
            p.max_value_size.is_some(),
            p.collateral_percentage.is_some(),
            p.max_collateral_inputs.is_some(),
            p.pool_voting_thresholds.is_some(),
            p.drep_voting_thresholds.is_some(),
            p.min_committee_size.is_some(),
            p.committee_term_limit.is_some(),
            p.governance_action_validity_period.is_some(),
            p.governance_action_deposit.is_some(),
            p.drep_deposit.is_some(),
            p.drep_inactivity_period.is_some(),
            p.minfee_refscript_cost_per_byte.is_some(),
        ];
        e.map(present.iter().filter(|x| **x).count() as u64)?;

        macro_rules! field {
            ($key:expr, $field:ident) => {
                if let Some(v) = &p.$field {
                    e.u8($key)?;
                    e.encode_with(v, ctx)?;
                }
            };
        }
        macro_rules! ratio {
            ($key:expr, $field:ident) => {
                if let Some(v) = &p.$field {
                    e.u8($key)?;
                    rational_cbor_codec::encode(v, e, ctx)?;
                }
            };
        }

        field!(0, minfee_a);
        field!(1, minfee_b);
        field!(2, max_block_body_size);
        field!(3, max_transaction_size);
        field!(4, max_block_header_size);
        field!(5, key_deposit);
        field!(6, pool_deposit);
        field!(7, maximum_epoch);
        field!(8, desired_number_of_stake_pools);
        ratio!(9, pool_pledge_influence);
        ratio!(10, expansion_rate);
        ratio!(11, treasury_growth_rate);
        field!(16, min_pool_cost);
        field!(17, coins_per_utxo_byte);
        field!(18, cost_models);
        field!(19, execution_costs);
        field!(20, max_tx_ex_units);
        field!(21, max_block_ex_units);
        field!(22, max_value_size);
        field!(23, collateral_percentage);
        field!(24, max_collateral_inputs);
        field!(25, pool_voting_thresholds);
        field!(26, drep_voting_thresholds);
        field!(27, min_committee_size);
        field!(28, committee_term_limit);
        field!(29, governance_action_validity_period);
        field!(30, governance_action_deposit);
        field!(31, drep_deposit);
        field!(32, drep_inactivity_period);
        ratio!(33, minfee_refscript_cost_per_byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::to_canonical_cbor;

    #[test]
    fn cost_models_merge_per_language() {
        let mut params = ProtocolParams::default();
        params.cost_models.plutus_v1 = Some(CostModel::new(vec![1, 2]));
        params.cost_models.plutus_v2 = Some(CostModel::new(vec![3]));

        let update = ProtocolParamUpdate {
            cost_models: Some(CostModels {
                plutus_v2: Some(CostModel::new(vec![9, 9])),
                ..Default::default()
            }),
            ..Default::default()
        };
        params.apply_update(&update);

        assert_eq!(params.cost_models.get(PlutusLanguage::V1).map(|m| m.as_vec().clone()), Some(vec![1, 2]));
        assert_eq!(params.cost_models.get(PlutusLanguage::V2).map(|m| m.as_vec().clone()), Some(vec![9, 9]));
        assert!(params.cost_models.plutus_v3.is_none());
    }

    #[test]
    fn reference_script_price_is_excised() {
        let mut params = ProtocolParams::default();
        let before = params.clone();
        let update = ProtocolParamUpdate {
            minfee_refscript_cost_per_byte: Some(RationalNumber::from_integer(20)),
            ..Default::default()
        };
        assert_eq!(params.apply_update(&update), Some(RationalNumber::from_integer(20)));
        assert_eq!(params, before);
    }

    #[test]
    fn param_groups() {
        let update = ProtocolParamUpdate {
            max_transaction_size: Some(20_000),
            ..Default::default()
        };
        let types = update.param_types();
        assert!(types.contains(ProtocolParamType::SecurityProperty));
        assert!(types.contains(ProtocolParamType::NetworkGroup));
        assert!(!types.contains(ProtocolParamType::GovernanceGroup));

        let update = ProtocolParamUpdate {
            drep_inactivity_period: Some(5),
            ..Default::default()
        };
        let types = update.param_types();
        assert!(types.contains(ProtocolParamType::GovernanceGroup));
        assert!(!types.contains(ProtocolParamType::SecurityProperty));
    }

    #[test]
    fn update_encodes_as_sparse_map() {
        let update = ProtocolParamUpdate {
            minfee_b: Some(1),
            max_value_size: Some(2),
            ..Default::default()
        };
        // map(2) {1: 1, 22: 2}
        assert_eq!(to_canonical_cbor(&update), vec![0xa2, 0x01, 0x01, 0x16, 0x02]);
    }
}
