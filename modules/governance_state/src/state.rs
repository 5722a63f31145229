//! Emulator Governance State: State storage

use crate::committee::CommitteeState;
use crate::conway_voting::{get_actual_votes, ConwayVoting, Proposal, TallyContext};
use crate::voting_state::VotingRules;
use anyhow::{anyhow, Result};
use emulator_common::{
    protocol_params::{MinFeeReferenceScripts, ProtocolParams},
    validation::ValidationResult,
    Committee, Constitution, DRepCredential, Epoch, GovActionId, GovernanceAction,
    GovernancePurpose, Lovelace, ProposalProcedure, ProposalStatus, Voter, VotingProcedure,
};
use emulator_module_accounts_state::AccountsState;
use emulator_module_drep_state::DRepState;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Ledger state an epoch boundary reads and mutates besides governance itself
pub struct EnactContext<'a> {
    pub accounts: &'a mut AccountsState,
    pub dreps: &'a mut DRepState,
    pub params: &'a mut ProtocolParams,
    pub ref_script_fee: &'a mut MinFeeReferenceScripts,
}

/// What happened to governance at one epoch boundary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EpochOutcome {
    pub epoch: Epoch,
    pub enacted: Vec<GovActionId>,
    pub ratified: Vec<GovActionId>,
    pub expired: Vec<GovActionId>,
    pub rejected: Vec<GovActionId>,
    pub expired_dreps: Vec<DRepCredential>,
}

#[derive(Debug, Clone)]
pub struct State {
    voting: ConwayVoting,
    committee: CommitteeState,
    constitution: Constitution,

    /// Last enacted action per purpose; a new proposal of that purpose must link to it
    last_enacted: BTreeMap<GovernancePurpose, GovActionId>,

    /// Ratified actions with the epoch at whose boundary they take effect
    enactment_queue: Vec<(Epoch, GovActionId)>,

    bootstrap: bool,
}

impl State {
    pub fn new(bootstrap: bool) -> Self {
        Self {
            voting: ConwayVoting::default(),
            committee: CommitteeState::default(),
            constitution: Constitution::default(),
            last_enacted: BTreeMap::new(),
            enactment_queue: Vec::new(),
            bootstrap,
        }
    }

    pub fn is_bootstrap(&self) -> bool {
        self.bootstrap
    }

    pub fn set_bootstrap(&mut self, bootstrap: bool) {
        info!("Governance bootstrap mode {}", if bootstrap { "on" } else { "off" });
        self.bootstrap = bootstrap;
    }

    pub fn committee(&self) -> &CommitteeState {
        &self.committee
    }

    pub fn committee_mut(&mut self) -> &mut CommitteeState {
        &mut self.committee
    }

    pub fn set_committee(&mut self, committee: Committee) {
        self.committee.replace(committee);
    }

    pub fn constitution(&self) -> &Constitution {
        &self.constitution
    }

    pub fn last_enacted(&self, purpose: GovernancePurpose) -> Option<GovActionId> {
        self.last_enacted.get(&purpose).copied()
    }

    pub fn get_proposal(&self, id: &GovActionId) -> Option<Proposal> {
        self.voting.get(id).cloned()
    }

    pub fn list_proposals(&self) -> &[Proposal] {
        self.voting.list()
    }

    /// Whether votes on `id` are accepted
    pub fn is_open(&self, id: &GovActionId) -> bool {
        self.voting.get(id).is_some_and(|p| p.is_open())
    }

    pub fn contains(&self, id: &GovActionId) -> bool {
        self.voting.get(id).is_some()
    }

    /// Register a proposal submitted in `epoch`. The deposit is charged by the caller.
    pub fn add_proposal(
        &mut self,
        id: GovActionId,
        procedure: &ProposalProcedure,
        epoch: Epoch,
        lifetime: u64,
    ) -> ValidationResult {
        self.voting.insert_proposal_procedure(id, epoch, lifetime, procedure)
    }

    pub fn record_vote(
        &mut self,
        voter: &Voter,
        id: &GovActionId,
        procedure: &VotingProcedure,
    ) -> ValidationResult {
        self.voting.insert_voting_procedure(voter, id, procedure)
    }

    /// Governance work for the boundary closing `epoch`: enact what was ratified for this
    /// epoch, then expire or ratify active proposals, then sweep idle DReps.
    pub fn process_epoch_boundary(
        &mut self,
        epoch: Epoch,
        ctx: &mut EnactContext,
    ) -> Result<EpochOutcome> {
        let mut outcome = EpochOutcome {
            epoch,
            ..EpochOutcome::default()
        };

        let (due, later): (Vec<_>, Vec<_>) =
            self.enactment_queue.drain(..).partition(|(at, _)| *at == epoch);
        self.enactment_queue = later;
        for (_, id) in due {
            self.enact(&id, epoch, ctx, &mut outcome)?;
        }

        self.ratify(epoch, ctx, &mut outcome)?;

        let activity = u32::try_from(ctx.params.drep_inactivity_period)?;
        // Forfeited deposits stay in the deposit pot
        for (credential, forfeited) in ctx.dreps.expire_idle(epoch, activity) {
            debug!("DRep {credential} forfeits {forfeited}");
            outcome.expired_dreps.push(credential);
        }

        info!(
            epoch,
            enacted = outcome.enacted.len(),
            ratified = outcome.ratified.len(),
            expired = outcome.expired.len(),
            rejected = outcome.rejected.len(),
            expired_dreps = outcome.expired_dreps.len(),
            "Governance epoch boundary"
        );
        Ok(outcome)
    }

    fn ratify(&mut self, epoch: Epoch, ctx: &mut EnactContext, outcome: &mut EpochOutcome) -> Result<()> {
        let snapshot = epoch.checked_sub(1).and_then(|e| ctx.accounts.snapshot(e));
        if snapshot.is_none() {
            debug!("No stake snapshot for epoch {}, skipping tallies", epoch.saturating_sub(1));
        }

        // Chain heads as they move within this pass
        let mut roots = self.last_enacted.clone();

        for id in self.voting.active_ids() {
            let Some(proposal) = self.voting.get(&id) else {
                continue;
            };

            if proposal.expires <= epoch {
                let procedure = proposal.procedure.clone();
                self.close(&id, ProposalStatus::Expired)?;
                ctx.accounts.refund_deposit(&procedure.reward_account, procedure.deposit)?;
                info!("Proposal {id} expired at epoch {epoch}");
                outcome.expired.push(id);
                continue;
            }

            let Some(snapshot) = snapshot.as_deref() else {
                continue;
            };

            let votes = get_actual_votes(
                proposal,
                &TallyContext {
                    epoch,
                    snapshot,
                    committee: &self.committee,
                    accounts: ctx.accounts,
                    dreps: ctx.dreps,
                },
            );

            let action = &proposal.procedure.gov_action;
            let rules = VotingRules::new(ctx.params, &self.committee.committee, self.bootstrap);
            let threshold = rules.get_action_thresholds(action);
            let accepted = rules.compare_votes(action, &votes, &threshold);
            let purpose = action.purpose();
            let linked = match purpose {
                Some(p) => action.get_previous_action_id() == roots.get(&p).copied(),
                None => true,
            };

            debug!(
                "Tally of {id} ({}): votes {votes}, thresholds {threshold}, accepted {accepted}, linked {linked}",
                action.get_action_name()
            );

            let proposal = self
                .voting
                .get_mut(&id)
                .ok_or_else(|| anyhow!("Proposal {id} vanished during ratification"))?;
            proposal.last_tally = Some(votes);

            if accepted && linked {
                proposal.status = ProposalStatus::Ratified;
                proposal.ratified_at = Some(epoch);
                if let Some(p) = purpose {
                    roots.insert(p, id);
                }
                self.enactment_queue.push((epoch + 1, id));
                info!("Proposal {id} ratified at epoch {epoch}, enacted at {}", epoch + 1);
                outcome.ratified.push(id);
            }
        }
        Ok(())
    }

    fn enact(
        &mut self,
        id: &GovActionId,
        epoch: Epoch,
        ctx: &mut EnactContext,
        outcome: &mut EpochOutcome,
    ) -> Result<()> {
        let proposal = self.voting.get(id).cloned().ok_or_else(|| {
            error!("Ratified proposal {id} is not stored");
            anyhow!("Ratified proposal {id} is not stored")
        })?;
        let action = &proposal.procedure.gov_action;

        match action {
            GovernanceAction::ParameterChange(change) => {
                if let Some(base) = ctx.params.apply_update(&change.protocol_param_update) {
                    ctx.ref_script_fee.base = base;
                }
            }
            GovernanceAction::TreasuryWithdrawals(withdrawals) => {
                for (account, amount) in &withdrawals.rewards {
                    if !ctx.accounts.pay_from_treasury(account, *amount)? {
                        warn!(
                            "Treasury withdrawal of {amount} to {account} skipped, treasury {}",
                            ctx.accounts.get_pots().treasury
                        );
                    }
                }
            }
            GovernanceAction::UpdateCommittee(update) => self.committee.apply_change(&update.data),
            GovernanceAction::NewConstitution(constitution) => {
                self.constitution = constitution.new_constitution.clone();
            }
            GovernanceAction::HardForkInitiation(_)
            | GovernanceAction::NoConfidence(_)
            | GovernanceAction::Information => {}
        }

        let proposal_mut = self
            .voting
            .get_mut(id)
            .ok_or_else(|| anyhow!("Proposal {id} vanished during enactment"))?;
        proposal_mut.status = ProposalStatus::Enacted;
        proposal_mut.enacted_at = Some(epoch);
        refund(ctx, &proposal)?;
        info!("Proposal {id} ({}) enacted at epoch {epoch}", action.get_action_name());
        outcome.enacted.push(*id);

        if let Some(purpose) = action.purpose() {
            self.last_enacted.insert(purpose, *id);
            self.reject_siblings(&proposal, purpose, ctx, outcome)?;
        }
        Ok(())
    }

    /// Active proposals competing for the same chain link can no longer be enacted
    fn reject_siblings(
        &mut self,
        enacted: &Proposal,
        purpose: GovernancePurpose,
        ctx: &mut EnactContext,
        outcome: &mut EpochOutcome,
    ) -> Result<()> {
        let link = enacted.procedure.gov_action.get_previous_action_id();
        let siblings: Vec<Proposal> = self
            .voting
            .list()
            .iter()
            .filter(|p| {
                p.is_active()
                    && p.id != enacted.id
                    && p.procedure.gov_action.purpose() == Some(purpose)
                    && p.procedure.gov_action.get_previous_action_id() == link
            })
            .cloned()
            .collect();

        for sibling in siblings {
            self.close(&sibling.id, ProposalStatus::Rejected)?;
            refund(ctx, &sibling)?;
            info!("Proposal {} rejected, {} enacted first", sibling.id, enacted.id);
            outcome.rejected.push(sibling.id);
        }
        Ok(())
    }

    fn close(&mut self, id: &GovActionId, status: ProposalStatus) -> Result<()> {
        let proposal = self
            .voting
            .get_mut(id)
            .ok_or_else(|| anyhow!("Proposal {id} is not stored"))?;
        proposal.status = status;
        Ok(())
    }
}

fn refund(ctx: &mut EnactContext, proposal: &Proposal) -> Result<Lovelace> {
    let deposit = proposal.procedure.deposit;
    ctx.accounts.refund_deposit(&proposal.procedure.reward_account, deposit)?;
    Ok(deposit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::{
        protocol_params::ProtocolParamUpdate, rational_number::RationalNumber, Anchor,
        Credential, DRepChoice, Hash, NetworkId, ParameterChangeAction, StakeAddress,
        TreasuryWithdrawalsAction, Vote,
    };

    const DEPOSIT: Lovelace = 1_000;

    struct Ledger {
        accounts: AccountsState,
        dreps: DRepState,
        params: ProtocolParams,
        ref_script_fee: MinFeeReferenceScripts,
    }

    impl Ledger {
        fn new(treasury: Lovelace) -> Self {
            Self {
                accounts: AccountsState::new(treasury),
                dreps: DRepState::new(),
                params: ProtocolParams::default(),
                ref_script_fee: MinFeeReferenceScripts::default(),
            }
        }

        fn boundary(&mut self, gov: &mut State, epoch: Epoch) -> Result<EpochOutcome> {
            let outcome = gov.process_epoch_boundary(
                epoch,
                &mut EnactContext {
                    accounts: &mut self.accounts,
                    dreps: &mut self.dreps,
                    params: &mut self.params,
                    ref_script_fee: &mut self.ref_script_fee,
                },
            )?;
            self.accounts.take_snapshot(epoch);
            Ok(outcome)
        }

        fn propose(&mut self, gov: &mut State, id: GovActionId, action: GovernanceAction, epoch: Epoch) -> Result<()> {
            self.accounts.charge_deposit(DEPOSIT)?;
            gov.add_proposal(id, &procedure(action), epoch, 6).map_err(|e| anyhow!("{e}"))
        }
    }

    fn account(b: u8) -> StakeAddress {
        StakeAddress::new(Credential::AddrKeyHash(Hash::new([b; 28])), NetworkId::Testnet)
    }

    fn drep(b: u8) -> DRepCredential {
        Credential::AddrKeyHash(Hash::new([b; 28]))
    }

    fn procedure(gov_action: GovernanceAction) -> ProposalProcedure {
        ProposalProcedure {
            deposit: DEPOSIT,
            reward_account: account(1),
            gov_action,
            anchor: Anchor::new("https://proposal", &[0; 32]),
        }
    }

    fn id(i: u32) -> GovActionId {
        GovActionId::new(Hash::new([9; 32]), i)
    }

    fn key_deposit_change(value: u64, previous: Option<GovActionId>) -> GovernanceAction {
        GovernanceAction::ParameterChange(ParameterChangeAction {
            previous_action_id: previous,
            protocol_param_update: Box::new(ProtocolParamUpdate {
                key_deposit: Some(value),
                ..ProtocolParamUpdate::default()
            }),
            script_hash: None,
        })
    }

    /// Proposer account plus a staked account delegating to a registered DRep
    fn seeded(treasury: Lovelace) -> Result<Ledger> {
        let mut ledger = Ledger::new(treasury);
        ledger.accounts.register_stake_address(&account(1), 2).map_err(|e| anyhow!("{e}"))?;
        ledger.accounts.register_stake_address(&account(2), 2).map_err(|e| anyhow!("{e}"))?;
        ledger.accounts.add_rewards(&account(2), 1_000_000)?;
        ledger
            .dreps
            .register(&drep(3), 500, 500, None, 0, 20)
            .map_err(|e| anyhow!("{e}"))?;
        ledger.accounts.charge_deposit(500)?;
        ledger
            .accounts
            .record_drep_delegation(&account(2), &DRepChoice::from(drep(3)))
            .map_err(|e| anyhow!("{e}"))?;
        Ok(ledger)
    }

    fn vote_yes(gov: &mut State, id: GovActionId) -> Result<()> {
        gov.record_vote(&Voter::DRepKey(Hash::new([3; 28])), &id, &VotingProcedure::new(Vote::Yes))
            .map_err(|e| anyhow!("{e}"))
    }

    #[test]
    fn ratify_then_enact_next_boundary() -> Result<()> {
        let mut ledger = seeded(0)?;
        let mut gov = State::new(false);
        ledger.boundary(&mut gov, 0)?;

        ledger.propose(&mut gov, id(0), key_deposit_change(5_000_000, None), 1)?;
        vote_yes(&mut gov, id(0))?;

        let outcome = ledger.boundary(&mut gov, 1)?;
        assert_eq!(outcome.ratified, vec![id(0)]);
        assert_eq!(gov.get_proposal(&id(0)).map(|p| p.status), Some(ProposalStatus::Ratified));
        assert_eq!(ledger.params.key_deposit, 2_000_000);

        let outcome = ledger.boundary(&mut gov, 2)?;
        assert_eq!(outcome.enacted, vec![id(0)]);
        assert_eq!(ledger.params.key_deposit, 5_000_000);
        assert_eq!(gov.last_enacted(GovernancePurpose::ParameterChange), Some(id(0)));
        assert_eq!(ledger.accounts.get_account(&account(1)).map(|a| a.rewards), Some(DEPOSIT));
        Ok(())
    }

    #[test]
    fn stake_delegated_after_snapshot_does_not_count() -> Result<()> {
        let mut ledger = Ledger::new(0);
        let mut gov = State::new(false);
        ledger.accounts.register_stake_address(&account(1), 2).map_err(|e| anyhow!("{e}"))?;
        ledger.boundary(&mut gov, 0)?;

        // Delegation lands in epoch 1, after the epoch 0 snapshot
        ledger.accounts.register_stake_address(&account(2), 2).map_err(|e| anyhow!("{e}"))?;
        ledger.accounts.add_rewards(&account(2), 1_000_000)?;
        ledger.dreps.register(&drep(3), 500, 500, None, 1, 20).map_err(|e| anyhow!("{e}"))?;
        ledger.accounts.charge_deposit(500)?;
        ledger
            .accounts
            .record_drep_delegation(&account(2), &DRepChoice::from(drep(3)))
            .map_err(|e| anyhow!("{e}"))?;
        ledger.propose(&mut gov, id(0), key_deposit_change(3, None), 1)?;
        vote_yes(&mut gov, id(0))?;

        assert!(ledger.boundary(&mut gov, 1)?.ratified.is_empty());
        assert_eq!(gov.get_proposal(&id(0)).and_then(|p| p.last_tally).map(|t| t.drep.yes), Some(0));
        assert_eq!(ledger.boundary(&mut gov, 2)?.ratified, vec![id(0)]);
        Ok(())
    }

    #[test]
    fn unvoted_proposal_expires_with_refund() -> Result<()> {
        let mut ledger = seeded(0)?;
        let mut gov = State::new(false);
        ledger.accounts.charge_deposit(DEPOSIT)?;
        gov.add_proposal(id(0), &procedure(key_deposit_change(7, None)), 0, 1)
            .map_err(|e| anyhow!("{e}"))?;

        assert!(ledger.boundary(&mut gov, 0)?.expired.is_empty());
        let outcome = ledger.boundary(&mut gov, 1)?;
        assert_eq!(outcome.expired, vec![id(0)]);
        assert_eq!(gov.get_proposal(&id(0)).map(|p| p.status), Some(ProposalStatus::Expired));
        assert_eq!(ledger.params.key_deposit, 2_000_000);
        assert_eq!(ledger.accounts.get_account(&account(1)).map(|a| a.rewards), Some(DEPOSIT));
        Ok(())
    }

    #[test]
    fn chained_proposals_ratify_in_one_pass_and_siblings_are_rejected() -> Result<()> {
        let mut ledger = seeded(0)?;
        let mut gov = State::new(false);
        ledger.boundary(&mut gov, 0)?;

        ledger.propose(&mut gov, id(0), key_deposit_change(3, None), 1)?;
        ledger.propose(&mut gov, id(1), key_deposit_change(4, Some(id(0))), 1)?;
        ledger.propose(&mut gov, id(2), key_deposit_change(5, None), 1)?;
        for i in 0..3 {
            vote_yes(&mut gov, id(i))?;
        }

        let outcome = ledger.boundary(&mut gov, 1)?;
        assert_eq!(outcome.ratified, vec![id(0), id(1)]);

        let outcome = ledger.boundary(&mut gov, 2)?;
        assert_eq!(outcome.enacted, vec![id(0), id(1)]);
        assert_eq!(outcome.rejected, vec![id(2)]);
        assert_eq!(ledger.params.key_deposit, 4);
        assert_eq!(gov.get_proposal(&id(2)).map(|p| p.status), Some(ProposalStatus::Rejected));
        assert_eq!(ledger.accounts.get_pots().deposits, 2 + 2 + 500);
        Ok(())
    }

    #[test]
    fn treasury_withdrawals_apply_partially() -> Result<()> {
        let mut ledger = seeded(150)?;
        let mut gov = State::new(false);
        ledger.boundary(&mut gov, 0)?;

        let action = GovernanceAction::TreasuryWithdrawals(TreasuryWithdrawalsAction {
            rewards: BTreeMap::from([(account(1), 100), (account(2), 100)]),
            script_hash: None,
        });
        ledger.propose(&mut gov, id(0), action, 1)?;
        vote_yes(&mut gov, id(0))?;
        ledger.boundary(&mut gov, 1)?;
        ledger.boundary(&mut gov, 2)?;

        assert_eq!(gov.get_proposal(&id(0)).map(|p| p.status), Some(ProposalStatus::Enacted));
        assert_eq!(ledger.accounts.get_pots().treasury, 50);
        assert_eq!(ledger.accounts.get_account(&account(1)).map(|a| a.rewards), Some(100 + DEPOSIT));
        assert_eq!(ledger.accounts.get_account(&account(2)).map(|a| a.rewards), Some(1_000_000));
        Ok(())
    }

    #[test]
    fn bootstrap_blocks_treasury_withdrawals() -> Result<()> {
        let mut ledger = seeded(1_000)?;
        let mut gov = State::new(true);
        ledger.boundary(&mut gov, 0)?;

        let action = GovernanceAction::TreasuryWithdrawals(TreasuryWithdrawalsAction {
            rewards: BTreeMap::from([(account(1), 100)]),
            script_hash: None,
        });
        ledger.propose(&mut gov, id(0), action, 1)?;
        vote_yes(&mut gov, id(0))?;
        assert!(ledger.boundary(&mut gov, 1)?.ratified.is_empty());
        Ok(())
    }

    #[test]
    fn idle_drep_deposit_is_forfeited_in_place() -> Result<()> {
        let mut ledger = seeded(0)?;
        ledger.params.drep_inactivity_period = 2;
        let mut gov = State::new(false);
        let deposits = ledger.accounts.get_pots().deposits;

        for epoch in 0..3 {
            assert!(ledger.boundary(&mut gov, epoch)?.expired_dreps.is_empty());
        }
        assert_eq!(ledger.boundary(&mut gov, 3)?.expired_dreps, vec![drep(3)]);
        assert_eq!(ledger.accounts.get_pots().deposits, deposits);
        assert_eq!(ledger.accounts.get_pots().treasury, 0);
        assert_eq!(ledger.dreps.get_drep(&drep(3)).map(|d| d.deposit), Some(0));
        Ok(())
    }

    #[test]
    fn committee_update_enacts_members_and_quorum() -> Result<()> {
        use emulator_common::{CommitteeChange, UpdateCommitteeAction};
        use std::collections::BTreeSet;

        let mut ledger = seeded(0)?;
        let mut gov = State::new(false);
        ledger.params.pool_voting_thresholds.committee_normal = RationalNumber::from_integer(0);
        ledger.params.pool_voting_thresholds.committee_no_confidence =
            RationalNumber::from_integer(0);
        ledger.boundary(&mut gov, 0)?;

        let action = GovernanceAction::UpdateCommittee(UpdateCommitteeAction {
            previous_action_id: None,
            data: CommitteeChange {
                removed_committee_members: BTreeSet::new(),
                new_committee_members: BTreeMap::from([(drep(7), 50)]),
                terms: RationalNumber::new(1, 2),
            },
        });
        ledger.propose(&mut gov, id(0), action, 1)?;
        vote_yes(&mut gov, id(0))?;
        ledger.boundary(&mut gov, 1)?;
        ledger.boundary(&mut gov, 2)?;

        assert!(gov.committee().is_active_member(&drep(7), 3));
        assert_eq!(gov.committee().committee.threshold, RationalNumber::new(1, 2));
        assert_eq!(gov.last_enacted(GovernancePurpose::Committee), Some(id(0)));
        Ok(())
    }
}
