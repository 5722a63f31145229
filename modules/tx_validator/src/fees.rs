//! Minimum fee: the linear size fee, the execution units fee and the tiered
//! reference script fee

use anyhow::{anyhow, Result};
use emulator_common::{
    protocol_params::{ExUnitPrices, MinFeeReferenceScripts, ProtocolParams},
    rational_number::RationalNumber,
    Lovelace, Redeemer,
};
use dashu_int::UBig;
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedMul, ToPrimitive};

fn widen(r: &RationalNumber) -> Ratio<u128> {
    Ratio::new(*r.numer() as u128, *r.denom() as u128)
}

fn overflow(what: &str) -> anyhow::Error {
    anyhow!("Overflow computing {what}")
}

/// `minfee_a × size + minfee_b`
pub fn linear_fee(params: &ProtocolParams, tx_size: u64) -> Result<Lovelace> {
    params
        .minfee_a
        .checked_mul(tx_size)
        .and_then(|f| f.checked_add(params.minfee_b))
        .ok_or_else(|| overflow("linear fee"))
}

/// Price of the evaluated budgets, rounded up once over the sum
pub fn evaluation_fee(prices: &ExUnitPrices, evaluated: &[Redeemer]) -> Result<Lovelace> {
    let mem_price = widen(&prices.mem_price);
    let step_price = widen(&prices.step_price);

    let mut total = Ratio::<u128>::from_integer(0);
    for redeemer in evaluated {
        let mem = Ratio::from_integer(redeemer.ex_units.mem as u128)
            .checked_mul(&mem_price)
            .ok_or_else(|| overflow("memory fee"))?;
        let steps = Ratio::from_integer(redeemer.ex_units.steps as u128)
            .checked_mul(&step_price)
            .ok_or_else(|| overflow("step fee"))?;
        total = total
            .checked_add(&mem)
            .and_then(|t| t.checked_add(&steps))
            .ok_or_else(|| overflow("execution fee"))?;
    }
    total.ceil().to_integer().to_u64().ok_or_else(|| overflow("execution fee"))
}

/// Reference scripts are charged per byte in tiers of `range` bytes. Each tier's price is
/// the previous one times `multiplier`. The total is rounded down.
pub fn reference_script_fee(config: &MinFeeReferenceScripts, total_size: u64) -> Result<Lovelace> {
    if config.range == 0 {
        return Err(anyhow!("Reference script fee range is zero"));
    }
    let multiplier_num = UBig::from(*config.multiplier.numer());
    let multiplier_den = UBig::from(*config.multiplier.denom());

    // `fee` and `price` share the denominator `denom`, which grows by one factor per tier
    let mut price = UBig::from(*config.base.numer());
    let mut denom = UBig::from(*config.base.denom());
    let mut fee = UBig::ZERO;
    let mut remaining = total_size;

    while remaining > 0 {
        let tier = remaining.min(config.range);
        fee += UBig::from(tier) * &price;
        remaining -= tier;
        if remaining > 0 {
            price *= &multiplier_num;
            fee *= &multiplier_den;
            denom *= &multiplier_den;
        }
    }
    // A fee beyond any payable amount rejects the transaction as underpaid
    Ok(Lovelace::try_from(fee / denom).unwrap_or(Lovelace::MAX))
}

/// Sum of the three components
pub fn minimum_fee(
    params: &ProtocolParams,
    ref_script_config: &MinFeeReferenceScripts,
    tx_size: u64,
    evaluated: &[Redeemer],
    ref_script_size: u64,
) -> Result<Lovelace> {
    let linear = linear_fee(params, tx_size)?;
    let execution = evaluation_fee(&params.execution_costs, evaluated)?;
    let reference = reference_script_fee(ref_script_config, ref_script_size)?;
    linear
        .checked_add(execution)
        .and_then(|f| f.checked_add(reference))
        .ok_or_else(|| overflow("minimum fee"))
}
