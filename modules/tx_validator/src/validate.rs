//! Full validation of a submitted transaction
//!
//! Phases run in a fixed order and the first failure wins. Nothing outside the returned
//! [`StagedDelta`] is modified, so a rejected transaction leaves the ledger untouched.

use crate::{
    certificates,
    context::{LedgerContext, StagedDelta},
    evaluator::Evaluator,
    fees, governance,
    utxo::{
        validate_collateral_amount, validate_collateral_keys, validate_disjoint,
        validate_outputs, validate_shape, validate_validity_interval,
    },
    witnesses::WitnessInventory,
};
use emulator_common::{
    validation::{ValidationError, ValidationResult},
    Credential, Datum, RedeemerTag, Transaction, TxOutput, UTxOIdentifier, ValueBalance,
};
use emulator_module_utxo_state::UTxOLookup;
use std::collections::BTreeSet;
use tracing::{debug, info};

type Resolved = Vec<(UTxOIdentifier, TxOutput)>;

fn resolve<L: UTxOLookup>(
    utxos: &L,
    inputs: &BTreeSet<UTxOIdentifier>,
    not_found: fn(UTxOIdentifier) -> ValidationError,
) -> ValidationResult<Resolved> {
    inputs
        .iter()
        .map(|input| match utxos.lookup_utxo(input) {
            Some(output) => Ok((*input, output)),
            None => Err(Box::new(not_found(*input))),
        })
        .collect()
}

fn index(i: usize) -> ValidationResult<u32> {
    Ok(u32::try_from(i).map_err(|_| anyhow::anyhow!("Redeemer index {i} out of range"))?)
}

fn consume_datum(inventory: &mut WitnessInventory, output: &TxOutput) {
    if let Some(Datum::Hash(hash)) = &output.datum {
        inventory.consume_datum(hash);
    }
}

/// Validate `tx` against `ctx` and collect everything accepting it changes
pub async fn validate_and_stage<L: UTxOLookup + Sync>(
    ctx: &LedgerContext<'_, L>,
    tx: &Transaction,
    evaluator: &dyn Evaluator,
) -> ValidationResult<StagedDelta> {
    let tx_hash = tx.id();
    let body = &tx.body;
    let params = ctx.params;
    debug!("Validating {tx_hash} at slot {}", ctx.slot);

    validate_shape(tx, ctx.network, params)?;

    // Witness inventory and resolution
    let mut inventory = WitnessInventory::new(tx, &tx_hash)?;
    let inputs = resolve(ctx.utxos, &body.inputs, |input| ValidationError::InputNotFound {
        input,
    })?;
    let reference_inputs = resolve(ctx.utxos, &body.reference_inputs, |input| {
        ValidationError::ReferenceInputNotFound { input }
    })?;
    let collateral = resolve(ctx.utxos, &body.collateral, |input| {
        ValidationError::CollateralInputNotFound { input }
    })?;

    let mut ref_script_size: u64 = 0;
    for (_, output) in inputs.iter().chain(reference_inputs.iter()) {
        if let Some(script) = &output.script_ref {
            inventory.add_script_ref(script);
            ref_script_size = ref_script_size.saturating_add(script.size());
        }
    }

    validate_disjoint(tx)?;

    // Consumption: spends in input order, withdrawals, mints, required signers, datums
    for (i, (_, output)) in inputs.iter().enumerate() {
        inventory.require(&output.address.payment, RedeemerTag::Spend, index(i)?)?;
    }
    for (i, account) in body.withdrawals.keys().enumerate() {
        inventory.require(&account.credential, RedeemerTag::Reward, index(i)?)?;
    }
    for (i, policy) in body.mint.keys().enumerate() {
        inventory.require(&Credential::ScriptHash(*policy), RedeemerTag::Mint, index(i)?)?;
    }
    for signer in &body.required_signers {
        inventory.require_key(signer)?;
    }
    for (_, output) in inputs.iter().chain(reference_inputs.iter()) {
        consume_datum(&mut inventory, output);
    }
    for output in &body.outputs {
        consume_datum(&mut inventory, output);
    }

    // Balance: consumed minus produced
    let mut ledger = ctx.scratch();
    let mut balance = ValueBalance::new();
    for (_, output) in &inputs {
        balance += &output.value;
    }
    for (account, amount) in &body.withdrawals {
        ledger.accounts.process_withdrawal(account, *amount)?;
        balance.add_lovelace(*amount);
    }
    for output in &body.outputs {
        balance -= &output.value;
    }
    balance.sub_lovelace(body.fee);
    let donation = body.donation.unwrap_or(0);
    balance.sub_lovelace(donation);
    balance.add_mint(&body.mint);

    validate_outputs(tx, params)?;

    // Collateral inputs are key-locked and witnessed whether or not scripts run
    validate_collateral_keys(&collateral)?;
    for (_, output) in &collateral {
        inventory.require(&output.address.payment, RedeemerTag::Spend, 0)?;
    }
    if inventory.has_redeemers() {
        validate_collateral_amount(tx, &collateral, params.collateral_percentage)?;
    }

    validate_validity_interval(tx, ctx.slot)?;

    for (i, cert) in body.certificates.iter().enumerate() {
        for credential in cert.required_witnesses() {
            inventory.require(&credential, RedeemerTag::Cert, index(i)?)?;
        }
        let charge = certificates::charge(cert, params, &ledger)?;
        certificates::apply(cert, &mut ledger, params, ctx.epoch, ctx.network)?;
        balance.sub_lovelace(charge.deposit);
        balance.add_lovelace(charge.refund);
    }

    let proposals = governance::validate_proposals(
        tx,
        &tx_hash,
        params,
        ctx.governance,
        ctx.epoch,
        &mut ledger,
        &mut inventory,
    )?;
    balance.sub_lovelace(proposals.deposits);
    let votes = governance::validate_votes(
        tx,
        params,
        ctx.governance,
        ctx.epoch,
        &mut ledger,
        &mut inventory,
    )?;

    inventory.check_extraneous()?;

    // Size, scripts and fee
    let size = tx.size();
    if size > params.max_transaction_size {
        return Err(Box::new(ValidationError::TxTooLarge {
            size,
            max: params.max_transaction_size,
        }));
    }

    let evaluated = if inventory.has_redeemers() {
        let resolved: Resolved = inputs.iter().chain(reference_inputs.iter()).cloned().collect();
        evaluator.evaluate(tx, &resolved).await.map_err(|e| {
            Box::new(ValidationError::EvaluationFailure {
                reason: e.to_string(),
            })
        })?
    } else {
        Vec::new()
    };
    for redeemer in &evaluated {
        let declared = inventory.declared_budget(&redeemer.pointer()).ok_or_else(|| {
            Box::new(ValidationError::UndeclaredRedeemer {
                tag: redeemer.tag,
                index: redeemer.index,
            })
        })?;
        if !declared.covers(&redeemer.ex_units) {
            return Err(Box::new(ValidationError::UnderestimatedBudget {
                tag: redeemer.tag,
                index: redeemer.index,
                declared,
                evaluated: redeemer.ex_units,
            }));
        }
    }

    let minimum = fees::minimum_fee(params, ctx.ref_script_fee, size, &evaluated, ref_script_size)?;
    if body.fee < minimum {
        return Err(Box::new(ValidationError::FeeTooSmall {
            declared: body.fee,
            minimum,
        }));
    }

    if !balance.is_zero() {
        return Err(Box::new(ValidationError::ValueNotConserved {
            delta: balance.to_string(),
        }));
    }

    ledger.accounts.collect_fee(body.fee)?;
    ledger.accounts.donate(donation)?;

    let produces = body
        .outputs
        .iter()
        .enumerate()
        .map(|(i, output)| (UTxOIdentifier::new(tx_hash, i as u64), output.clone()))
        .collect();

    info!(
        "Accepted {tx_hash}: {} inputs, {} outputs, fee {} (minimum {minimum}), {} certificates, {} proposals, {} votes",
        inputs.len(),
        body.outputs.len(),
        body.fee,
        body.certificates.len(),
        proposals.proposals.len(),
        votes.len()
    );

    Ok(StagedDelta {
        tx_hash,
        consumes: inputs.into_iter().map(|(input, _)| input).collect(),
        produces,
        datums: inventory.datums(),
        fee: body.fee,
        donation,
        proposals: proposals.proposals,
        votes,
        ledger,
    })
}
