//! Emulator AccountsState: pots (deposits, fees, treasury) and their epoch transfer

use anyhow::{anyhow, bail, Result};
use emulator_common::{
    rational_number::{mul_floor, RationalNumber},
    Lovelace,
};
use tracing::info;

/// Global account pots
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pots {
    /// Deposits held for registered stake addresses, pools, DReps and proposals
    pub deposits: Lovelace,

    /// Fees collected since the last epoch transfer
    pub fees: Lovelace,

    /// Treasury
    pub treasury: Lovelace,
}

/// Add to a pot, failing on overflow
pub(crate) fn credit(pot: &mut Lovelace, name: &str, amount: Lovelace) -> Result<()> {
    *pot = pot
        .checked_add(amount)
        .ok_or_else(|| anyhow!("{name} pot overflow adding {amount} to {pot}"))?;
    Ok(())
}

/// Take from a pot, failing if it does not hold enough
pub(crate) fn debit(pot: &mut Lovelace, name: &str, amount: Lovelace) -> Result<()> {
    if amount > *pot {
        bail!("{name} pot underflow taking {amount} from {pot}");
    }
    *pot -= amount;
    Ok(())
}

/// Treasury share of the fee pot, rounded down
pub fn treasury_fee_cut(pots: &Pots, share: &RationalNumber) -> Result<Lovelace> {
    mul_floor(pots.fees, share)
}

/// Move the treasury share of the fee pot into the treasury; the remainder stays behind.
/// Returns the updated pots.
pub fn calculate_fee_transfer(old_pots: &Pots, share: &RationalNumber) -> Result<Pots> {
    let mut new_pots = *old_pots;
    let cut = treasury_fee_cut(old_pots, share)?;

    debit(&mut new_pots.fees, "Fees", cut)?;
    credit(&mut new_pots.treasury, "Treasury", cut)?;

    info!(fees = old_pots.fees, %share, cut, treasury = new_pots.treasury, "Treasury:");
    Ok(new_pots)
}
