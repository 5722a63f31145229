//! Proposal and vote checks
use crate::{certificates::drep_activity, context::ScratchLedger, witnesses::WitnessInventory};
use emulator_common::{
    protocol_params::ProtocolParams,
    validation::{ValidationError, ValidationResult},
    Epoch, GovActionId, GovernanceAction, GovernancePurpose, Credential, Lovelace,
    ProposalProcedure, RedeemerTag, Transaction, TxHash, Voter, VotingProcedure,
};
use emulator_module_governance_state::{committee_hot_credential, GovernanceState};
use tracing::debug;

/// Proposals of a transaction with their identities, and the deposits they charge
#[derive(Debug, Default)]
pub struct ProposalOutcome {
    pub proposals: Vec<(GovActionId, ProposalProcedure)>,
    pub deposits: Lovelace,
}

fn validate_action(
    action: &GovernanceAction,
    governance: &GovernanceState,
    epoch: Epoch,
) -> ValidationResult {
    match action {
        GovernanceAction::NewConstitution(constitution) => {
            let expected = governance.last_enacted(GovernancePurpose::Constitution);
            if constitution.previous_action_id != expected {
                return Err(Box::new(ValidationError::WrongPreviousConstitution {
                    expected,
                    found: constitution.previous_action_id,
                }));
            }
        }
        GovernanceAction::UpdateCommittee(update) => {
            if let Some((credential, term)) =
                update.data.new_committee_members.iter().find(|(_, term)| **term <= epoch)
            {
                return Err(Box::new(ValidationError::ExpiredCommitteeTerm {
                    credential: *credential,
                    term: *term,
                    epoch,
                }));
            }
        }
        _ => {}
    }

    if action.is_guarded() {
        let expected = governance.constitution().guardrail_script;
        let found = action.policy_hash();
        if expected != found {
            return Err(Box::new(ValidationError::WrongPolicyHash { expected, found }));
        }
    }
    Ok(())
}

/// Check every proposal, witness its guardrail policy and charge its deposit
pub fn validate_proposals(
    tx: &Transaction,
    tx_hash: &TxHash,
    params: &ProtocolParams,
    governance: &GovernanceState,
    epoch: Epoch,
    ledger: &mut ScratchLedger,
    inventory: &mut WitnessInventory,
) -> ValidationResult<ProposalOutcome> {
    let mut outcome = ProposalOutcome::default();

    for (index, procedure) in tx.body.proposal_procedures.iter().enumerate() {
        let index = u32::try_from(index)
            .map_err(|_| anyhow::anyhow!("Proposal index {index} out of range"))?;

        if procedure.deposit != params.governance_action_deposit {
            return Err(Box::new(ValidationError::WrongDeposit {
                expected: params.governance_action_deposit,
                found: procedure.deposit,
            }));
        }
        if !ledger.accounts.is_registered(&procedure.reward_account) {
            return Err(Box::new(ValidationError::UnregisteredReturnAccount {
                account: procedure.reward_account,
            }));
        }
        validate_action(&procedure.gov_action, governance, epoch)?;
        if let Some(policy) = procedure.gov_action.policy_hash() {
            inventory.require(&Credential::ScriptHash(policy), RedeemerTag::Propose, index)?;
        }

        let id = GovActionId::new(*tx_hash, index);
        if governance.contains(&id) {
            return Err(Box::new(ValidationError::DuplicateGovActionId { id }));
        }

        ledger.accounts.charge_deposit(procedure.deposit)?;
        outcome.deposits = outcome
            .deposits
            .checked_add(procedure.deposit)
            .ok_or_else(|| anyhow::anyhow!("Proposal deposits overflow"))?;
        debug!("Proposal {id}: {}", procedure.gov_action.get_action_name());
        outcome.proposals.push((id, procedure.clone()));
    }
    Ok(outcome)
}

fn validate_voter(voter: &Voter, ledger: &ScratchLedger) -> ValidationResult {
    let eligible = match voter {
        Voter::DRepKey(_) | Voter::DRepScript(_) => {
            if !ledger.dreps.is_registered(&voter.credential()) {
                return Err(Box::new(ValidationError::UnregisteredDRepVote { voter: *voter }));
            }
            true
        }
        Voter::ConstitutionalCommitteeKey(_) | Voter::ConstitutionalCommitteeScript(_) => {
            committee_hot_credential(voter).is_some_and(|hot| ledger.committee.is_authorized_hot(&hot))
        }
        Voter::StakePoolKey(key_hash) => {
            if ledger.accounts.resolve_pool(key_hash).is_none() {
                return Err(Box::new(ValidationError::UnknownPoolVoter { voter: *voter }));
            }
            true
        }
    };
    if !eligible {
        return Err(Box::new(ValidationError::UnauthorizedCommitteeVote { voter: *voter }));
    }
    Ok(())
}

/// Check every vote against existing active proposals, witness each voter once, and mark
/// voting DReps active
pub fn validate_votes(
    tx: &Transaction,
    params: &ProtocolParams,
    governance: &GovernanceState,
    epoch: Epoch,
    ledger: &mut ScratchLedger,
    inventory: &mut WitnessInventory,
) -> ValidationResult<Vec<(Voter, GovActionId, VotingProcedure)>> {
    let mut votes = Vec::new();

    for (index, (voter, procedures)) in tx.body.voting_procedures.iter().enumerate() {
        let index =
            u32::try_from(index).map_err(|_| anyhow::anyhow!("Voter index {index} out of range"))?;
        validate_voter(voter, ledger)?;
        inventory.require(&voter.credential(), RedeemerTag::Vote, index)?;

        for (id, procedure) in procedures {
            if !governance.is_open(id) {
                return Err(Box::new(ValidationError::ProposalNotActive { id: *id }));
            }
            votes.push((*voter, *id, procedure.clone()));
        }

        if matches!(voter, Voter::DRepKey(_) | Voter::DRepScript(_)) {
            ledger.dreps.touch(&voter.credential(), epoch, drep_activity(params))?;
        }
    }
    Ok(votes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::{
        rational_number::RationalNumber, CommitteeChange, Hash, NewConstitutionAction,
        TreasuryWithdrawalsAction, UpdateCommitteeAction,
    };
    use std::collections::BTreeMap;

    fn cold(b: u8) -> Credential {
        Credential::AddrKeyHash(Hash::new([b; 28]))
    }

    #[test]
    fn constitution_must_follow_the_last_enacted_one() {
        let governance = GovernanceState::new(false);
        let stale = GovActionId::new(Hash::new([1; 32]), 0);
        let action = GovernanceAction::NewConstitution(NewConstitutionAction {
            previous_action_id: Some(stale),
            new_constitution: Default::default(),
        });
        assert_eq!(
            *validate_action(&action, &governance, 3).unwrap_err(),
            ValidationError::WrongPreviousConstitution { expected: None, found: Some(stale) }
        );
    }

    #[test]
    fn new_members_need_a_future_term() {
        let governance = GovernanceState::new(false);
        let action = GovernanceAction::UpdateCommittee(UpdateCommitteeAction {
            previous_action_id: None,
            data: CommitteeChange {
                removed_committee_members: Default::default(),
                new_committee_members: [(cold(1), 10), (cold(2), 5)].into(),
                terms: RationalNumber::new(1, 2),
            },
        });
        assert_eq!(
            *validate_action(&action, &governance, 5).unwrap_err(),
            ValidationError::ExpiredCommitteeTerm { credential: cold(2), term: 5, epoch: 5 }
        );
        assert!(validate_action(&action, &governance, 4).is_ok());
    }

    #[test]
    fn guarded_actions_carry_the_guardrail_hash() {
        let governance = GovernanceState::new(false);
        let action = GovernanceAction::TreasuryWithdrawals(TreasuryWithdrawalsAction {
            rewards: BTreeMap::new(),
            script_hash: Some(Hash::new([7; 28])),
        });
        assert_eq!(
            *validate_action(&action, &governance, 0).unwrap_err(),
            ValidationError::WrongPolicyHash { expected: None, found: Some(Hash::new([7; 28])) }
        );
        assert!(validate_action(&GovernanceAction::Information, &governance, 0).is_ok());
    }
}
