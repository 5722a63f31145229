//! Shape, output, collateral and validity interval rules

use emulator_common::{
    cbor::canonical_size,
    protocol_params::ProtocolParams,
    rational_number::{mul_ceil, RationalNumber},
    validation::{ValidationError, ValidationResult},
    Lovelace, NetworkId, Slot, Transaction, TxOutput, UTxOIdentifier,
};

/// Bytes of ledger bookkeeping charged on top of an output's own size
pub const OUTPUT_OVERHEAD_BYTES: u64 = 160;

pub type UTxOValidationResult = ValidationResult;

fn check_network(expected: NetworkId, found: NetworkId) -> UTxOValidationResult {
    if expected != found {
        return Err(Box::new(ValidationError::WrongNetwork { expected, found }));
    }
    Ok(())
}

/// Checks that need nothing but the transaction and the parameters
pub fn validate_shape(
    tx: &Transaction,
    network: NetworkId,
    params: &ProtocolParams,
) -> UTxOValidationResult {
    let body = &tx.body;
    if body.inputs.is_empty() {
        return Err(Box::new(ValidationError::EmptyInputs));
    }
    if let Some(found) = body.network_id {
        check_network(network, found)?;
    }
    for output in body.outputs.iter().chain(body.collateral_return.iter()) {
        check_network(network, output.address.network)?;
    }
    for account in body.withdrawals.keys() {
        check_network(network, account.network)?;
    }

    let count = body.collateral.len();
    if count as u64 > params.max_collateral_inputs {
        return Err(Box::new(ValidationError::TooManyCollateralInputs {
            count,
            max: params.max_collateral_inputs,
        }));
    }
    Ok(())
}

/// An input may not also be read as a reference input
pub fn validate_disjoint(tx: &Transaction) -> UTxOValidationResult {
    match tx.body.inputs.intersection(&tx.body.reference_inputs).next() {
        Some(input) => Err(Box::new(ValidationError::OverlappingReferenceInput { input: *input })),
        None => Ok(()),
    }
}

/// Minimum lovelace an output must hold
pub fn min_ada(params: &ProtocolParams, output: &TxOutput) -> Lovelace {
    params
        .coins_per_utxo_byte
        .saturating_mul(canonical_size(output).saturating_add(OUTPUT_OVERHEAD_BYTES))
}

fn validate_output(index: usize, output: &TxOutput, params: &ProtocolParams) -> UTxOValidationResult {
    let minimum = min_ada(params, output);
    if output.value.coin() < minimum {
        return Err(Box::new(ValidationError::OutputTooSmall {
            index,
            coin: output.value.coin(),
            minimum,
        }));
    }

    let size = canonical_size(&output.value);
    if size > params.max_value_size {
        return Err(Box::new(ValidationError::OutputValueTooLarge {
            index,
            size,
            max: params.max_value_size,
        }));
    }
    Ok(())
}

/// Minimum ada and maximum value size of every output. A collateral return is checked
/// as if it followed the regular outputs.
pub fn validate_outputs(tx: &Transaction, params: &ProtocolParams) -> UTxOValidationResult {
    for (index, output) in tx.body.outputs.iter().chain(tx.body.collateral_return.iter()).enumerate()
    {
        validate_output(index, output, params)?;
    }
    Ok(())
}

/// Collateral inputs must be locked by keys
pub fn validate_collateral_keys(collateral: &[(UTxOIdentifier, TxOutput)]) -> UTxOValidationResult {
    match collateral.iter().find(|(_, output)| output.address.payment.is_script()) {
        Some((input, _)) => Err(Box::new(ValidationError::ScriptCollateral { input: *input })),
        None => Ok(()),
    }
}

/// Collateral amount rules, applied when the transaction carries redeemers
pub fn validate_collateral_amount(
    tx: &Transaction,
    collateral: &[(UTxOIdentifier, TxOutput)],
    collateral_percentage: u64,
) -> UTxOValidationResult {
    if !tx.is_valid {
        return Err(Box::new(ValidationError::ValidityFlagFalse));
    }

    let total: u128 = collateral.iter().map(|(_, output)| output.value.coin() as u128).sum();
    let returned = tx.body.collateral_return.as_ref().map_or(0, |r| r.value.coin() as u128);
    let provided = Lovelace::try_from(total.saturating_sub(returned)).unwrap_or(Lovelace::MAX);

    let required = mul_ceil(tx.body.fee, &RationalNumber::new(collateral_percentage, 100))?;
    if provided < required {
        return Err(Box::new(ValidationError::InsufficientCollateral { provided, required }));
    }
    if let Some(declared) = tx.body.total_collateral {
        if declared != provided {
            return Err(Box::new(ValidationError::TotalCollateralMismatch {
                declared,
                actual: provided,
            }));
        }
    }
    Ok(())
}

/// `valid_from ≤ slot < valid_until`, each bound optional
pub fn validate_validity_interval(tx: &Transaction, slot: Slot) -> UTxOValidationResult {
    let (valid_from, valid_until) = (tx.body.valid_from, tx.body.valid_until);
    if let (Some(from), Some(until)) = (valid_from, valid_until) {
        if from >= until {
            return Err(Box::new(ValidationError::InvertedValidityInterval {
                valid_from: from,
                valid_until: until,
            }));
        }
    }

    let after_start = valid_from.map_or(true, |from| slot >= from);
    let before_end = valid_until.map_or(true, |until| slot < until);
    if !(after_start && before_end) {
        return Err(Box::new(ValidationError::OutsideValidityInterval {
            slot,
            valid_from,
            valid_until,
        }));
    }
    Ok(())
}
