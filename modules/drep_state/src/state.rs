//! Emulator DRepState: State storage

use emulator_common::{
    validation::{ValidationError, ValidationResult},
    Anchor, DRepCredential, DRepRecord, Epoch, Lovelace,
};
use imbl::OrdMap;
use tracing::{debug, info, warn};

/// Every DRep ever registered; deregistered ones are kept with the flag cleared
#[derive(Debug, Default, Clone)]
pub struct State {
    dreps: OrdMap<DRepCredential, DRepRecord>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.dreps.values().filter(|d| d.registered).count()
    }

    pub fn get_drep(&self, credential: &DRepCredential) -> Option<DRepRecord> {
        self.dreps.get(credential).cloned()
    }

    pub fn is_registered(&self, credential: &DRepCredential) -> bool {
        self.dreps.get(credential).is_some_and(|d| d.registered)
    }

    /// Registered DReps
    pub fn list(&self) -> Vec<DRepCredential> {
        self.dreps.iter().filter(|(_, d)| d.registered).map(|(c, _)| *c).collect()
    }

    /// Register a DRep. The deposit must equal `expected_deposit`. A DRep that was
    /// deregistered or expired may register again.
    pub fn register(
        &mut self,
        credential: &DRepCredential,
        deposit: Lovelace,
        expected_deposit: Lovelace,
        anchor: Option<Anchor>,
        epoch: Epoch,
        activity: u32,
    ) -> ValidationResult {
        if self.is_registered(credential) {
            return Err(Box::new(ValidationError::DRepAlreadyRegistered {
                credential: *credential,
            }));
        }
        if deposit != expected_deposit {
            return Err(Box::new(ValidationError::WrongDeposit {
                expected: expected_deposit,
                found: deposit,
            }));
        }

        debug!("Registering DRep {credential} with deposit {deposit}");
        self.dreps.insert(*credential, DRepRecord::new(deposit, anchor, epoch, activity));
        Ok(())
    }

    /// Deregister a DRep, returning its deposit. The declared refund must match it.
    pub fn deregister(
        &mut self,
        credential: &DRepCredential,
        refund: Lovelace,
    ) -> ValidationResult<Lovelace> {
        let drep = self
            .dreps
            .get_mut(credential)
            .filter(|d| d.registered)
            .ok_or_else(|| {
                Box::new(ValidationError::DRepNotRegistered {
                    credential: *credential,
                })
            })?;
        if refund != drep.deposit {
            return Err(Box::new(ValidationError::WrongRefund {
                expected: drep.deposit,
                found: refund,
            }));
        }

        debug!("Deregistering DRep {credential}");
        drep.registered = false;
        Ok(std::mem::take(&mut drep.deposit))
    }

    /// Replace the anchor of a registered DRep and mark it active
    pub fn update(
        &mut self,
        credential: &DRepCredential,
        anchor: Option<Anchor>,
        epoch: Epoch,
        activity: u32,
    ) -> ValidationResult {
        let drep = self.registered_mut(credential)?;
        drep.anchor = anchor;
        drep.touch(epoch, activity);
        Ok(())
    }

    /// Mark a registered DRep active, as voting does
    pub fn touch(&mut self, credential: &DRepCredential, epoch: Epoch, activity: u32) -> ValidationResult {
        self.registered_mut(credential)?.touch(epoch, activity);
        Ok(())
    }

    /// Deregister every DRep idle for more than `activity` epochs at `epoch`.
    /// Their deposits are forfeited, not refunded; the forfeited amounts are returned.
    pub fn expire_idle(&mut self, epoch: Epoch, activity: u32) -> Vec<(DRepCredential, Lovelace)> {
        let idle: Vec<DRepCredential> = self
            .dreps
            .iter()
            .filter(|(_, d)| d.registered && epoch.saturating_sub(d.last_active) > activity as u64)
            .map(|(c, _)| *c)
            .collect();

        let mut expired = Vec::with_capacity(idle.len());
        for credential in idle {
            if let Some(drep) = self.dreps.get_mut(&credential) {
                warn!(
                    "DRep {credential} idle since epoch {}, expired at {epoch} without refund",
                    drep.last_active
                );
                drep.registered = false;
                expired.push((credential, std::mem::take(&mut drep.deposit)));
            }
        }
        if !expired.is_empty() {
            info!("Epoch {epoch}: {} DReps expired", expired.len());
        }
        expired
    }

    fn registered_mut(&mut self, credential: &DRepCredential) -> ValidationResult<&mut DRepRecord> {
        self.dreps.get_mut(credential).filter(|d| d.registered).ok_or_else(|| {
            Box::new(ValidationError::DRepNotRegistered {
                credential: *credential,
            })
        })
    }
}
