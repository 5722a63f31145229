//! Certificate processing against the scratch ledger
//!
//! `charge` prices a certificate for the transaction balance, `apply` performs it. Both
//! run in list order, so a certificate sees the effects of the ones before it.

use crate::context::ScratchLedger;
use emulator_common::{
    protocol_params::ProtocolParams,
    validation::{ValidationError, ValidationResult},
    DRepChoice, Epoch, Lovelace, NetworkId, StakeAddress, TxCertificate,
};
use tracing::debug;

/// Balance contribution of a certificate: deposits are produced, refunds consumed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CertificateCharge {
    pub deposit: Lovelace,
    pub refund: Lovelace,
}

impl CertificateCharge {
    fn deposit(deposit: Lovelace) -> Self {
        Self { deposit, refund: 0 }
    }

    fn refund(refund: Lovelace) -> Self {
        Self { deposit: 0, refund }
    }
}

/// Epochs a DRep stays active without voting or updating
pub fn drep_activity(params: &ProtocolParams) -> u32 {
    u32::try_from(params.drep_inactivity_period).unwrap_or(u32::MAX)
}

fn check_deposit(expected: Lovelace, found: Lovelace) -> ValidationResult {
    if expected != found {
        return Err(Box::new(ValidationError::WrongDeposit { expected, found }));
    }
    Ok(())
}

fn recorded_stake_deposit(ledger: &ScratchLedger, account: &StakeAddress) -> ValidationResult<Lovelace> {
    ledger.accounts.get_account(account).map(|a| a.deposit).ok_or_else(|| {
        Box::new(ValidationError::StakeNotRegistered { account: *account })
    })
}

/// Deposit charged or refund released by a certificate, checking declared amounts
pub fn charge(
    cert: &TxCertificate,
    params: &ProtocolParams,
    ledger: &ScratchLedger,
) -> ValidationResult<CertificateCharge> {
    let charge = match cert {
        TxCertificate::StakeRegistration(_) => CertificateCharge::deposit(params.key_deposit),
        TxCertificate::Registration(reg) => {
            check_deposit(params.key_deposit, reg.deposit)?;
            CertificateCharge::deposit(reg.deposit)
        }
        TxCertificate::StakeRegistrationAndDelegation(reg) => {
            check_deposit(params.key_deposit, reg.deposit)?;
            CertificateCharge::deposit(reg.deposit)
        }
        TxCertificate::StakeRegistrationAndVoteDelegation(reg) => {
            check_deposit(params.key_deposit, reg.deposit)?;
            CertificateCharge::deposit(reg.deposit)
        }
        TxCertificate::StakeRegistrationAndStakeAndVoteDelegation(reg) => {
            check_deposit(params.key_deposit, reg.deposit)?;
            CertificateCharge::deposit(reg.deposit)
        }
        TxCertificate::StakeDeregistration(account) => {
            CertificateCharge::refund(recorded_stake_deposit(ledger, account)?)
        }
        TxCertificate::Deregistration(dereg) => {
            let recorded = recorded_stake_deposit(ledger, &dereg.stake_address)?;
            if recorded != dereg.refund {
                return Err(Box::new(ValidationError::WrongRefund {
                    expected: recorded,
                    found: dereg.refund,
                }));
            }
            CertificateCharge::refund(recorded)
        }
        TxCertificate::PoolRegistration(reg) => {
            if ledger.accounts.is_pool_registered(&reg.operator) {
                CertificateCharge::default()
            } else {
                CertificateCharge::deposit(params.pool_deposit)
            }
        }
        TxCertificate::DRepRegistration(reg) => {
            check_deposit(params.drep_deposit, reg.deposit)?;
            CertificateCharge::deposit(reg.deposit)
        }
        TxCertificate::DRepDeregistration(dereg) => {
            let drep = ledger
                .dreps
                .get_drep(&dereg.credential)
                .filter(|d| d.registered)
                .ok_or_else(|| {
                    Box::new(ValidationError::DRepNotRegistered {
                        credential: dereg.credential,
                    })
                })?;
            if drep.deposit != dereg.refund {
                return Err(Box::new(ValidationError::WrongRefund {
                    expected: drep.deposit,
                    found: dereg.refund,
                }));
            }
            CertificateCharge::default()
        }
        // Pool and DRep deposits return through the reward account, not the transaction
        TxCertificate::PoolRetirement(_)
        | TxCertificate::StakeDelegation(_)
        | TxCertificate::VoteDelegation(_)
        | TxCertificate::StakeAndVoteDelegation(_)
        | TxCertificate::AuthCommitteeHot(_)
        | TxCertificate::ResignCommitteeCold(_)
        | TxCertificate::DRepUpdate(_) => CertificateCharge::default(),
    };
    Ok(charge)
}

fn delegate_vote(ledger: &mut ScratchLedger, account: &StakeAddress, drep: &DRepChoice) -> ValidationResult {
    if let Some(credential) = drep.credential() {
        if !ledger.dreps.is_registered(&credential) {
            return Err(Box::new(ValidationError::UnknownDRep { credential }));
        }
    }
    ledger.accounts.record_drep_delegation(account, drep)
}

/// Apply a certificate to the scratch ledger
pub fn apply(
    cert: &TxCertificate,
    ledger: &mut ScratchLedger,
    params: &ProtocolParams,
    epoch: Epoch,
    network: NetworkId,
) -> ValidationResult {
    debug!("Applying {} certificate", cert.get_cert_name());
    match cert {
        TxCertificate::StakeRegistration(account) => {
            ledger.accounts.register_stake_address(account, params.key_deposit)?;
        }
        TxCertificate::Registration(reg) => {
            ledger.accounts.register_stake_address(&reg.stake_address, reg.deposit)?;
        }
        TxCertificate::StakeDeregistration(account) => {
            ledger.accounts.deregister_stake_address(account, None)?;
        }
        TxCertificate::Deregistration(dereg) => {
            ledger.accounts.deregister_stake_address(&dereg.stake_address, Some(dereg.refund))?;
        }
        TxCertificate::StakeDelegation(delegation) => {
            ledger.accounts.record_stake_delegation(&delegation.stake_address, &delegation.operator)?;
        }
        TxCertificate::VoteDelegation(delegation) => {
            delegate_vote(ledger, &delegation.stake_address, &delegation.drep)?;
        }
        TxCertificate::StakeAndVoteDelegation(delegation) => {
            ledger.accounts.record_stake_delegation(&delegation.stake_address, &delegation.operator)?;
            delegate_vote(ledger, &delegation.stake_address, &delegation.drep)?;
        }
        TxCertificate::StakeRegistrationAndDelegation(reg) => {
            ledger.accounts.register_stake_address(&reg.stake_address, reg.deposit)?;
            ledger.accounts.record_stake_delegation(&reg.stake_address, &reg.operator)?;
        }
        TxCertificate::StakeRegistrationAndVoteDelegation(reg) => {
            ledger.accounts.register_stake_address(&reg.stake_address, reg.deposit)?;
            delegate_vote(ledger, &reg.stake_address, &reg.drep)?;
        }
        TxCertificate::StakeRegistrationAndStakeAndVoteDelegation(reg) => {
            ledger.accounts.register_stake_address(&reg.stake_address, reg.deposit)?;
            ledger.accounts.record_stake_delegation(&reg.stake_address, &reg.operator)?;
            delegate_vote(ledger, &reg.stake_address, &reg.drep)?;
        }
        TxCertificate::PoolRegistration(reg) => {
            ledger.accounts.register_pool(reg, params.pool_deposit)?;
        }
        TxCertificate::PoolRetirement(retirement) => {
            ledger.accounts.retire_pool(&retirement.operator)?;
        }
        TxCertificate::AuthCommitteeHot(auth) => {
            ledger.committee.authorize_hot(&auth.cold_credential, &auth.hot_credential)?;
        }
        TxCertificate::ResignCommitteeCold(resign) => {
            ledger.committee.resign(&resign.cold_credential)?;
        }
        TxCertificate::DRepRegistration(reg) => {
            ledger.dreps.register(
                &reg.credential,
                reg.deposit,
                params.drep_deposit,
                reg.anchor.clone(),
                epoch,
                drep_activity(params),
            )?;
            ledger.accounts.charge_deposit(reg.deposit)?;
        }
        TxCertificate::DRepDeregistration(dereg) => {
            let deposit = ledger.dreps.deregister(&dereg.credential, dereg.refund)?;
            let reward_account = StakeAddress::new(dereg.credential, network);
            ledger.accounts.refund_deposit(&reward_account, deposit)?;
        }
        TxCertificate::DRepUpdate(update) => {
            ledger.dreps.update(&update.credential, update.anchor.clone(), epoch, drep_activity(params))?;
        }
    }
    Ok(())
}
