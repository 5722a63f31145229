use crate::committee::CommitteeState;
use emulator_common::{
    validation::{ValidationError, ValidationResult},
    Credential, DRepChoice, Epoch, GovActionId, ProposalProcedure, ProposalStatus, Vote,
    VoteCount, VoteResult, Voter, VotingProcedure,
};
use emulator_module_accounts_state::{AccountsState, StakeSnapshot};
use emulator_module_drep_state::DRepState;
use tracing::debug;

/// A governance proposal with its lifecycle and the votes cast on it
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Proposal {
    pub id: GovActionId,
    pub procedure: ProposalProcedure,

    /// Epoch it was submitted in
    pub submitted: Epoch,

    /// Expired at the boundary of this epoch unless ratified before
    pub expires: Epoch,

    pub status: ProposalStatus,

    /// Votes in the order first cast; a later vote by the same voter replaces its entry
    pub votes: Vec<(Voter, VotingProcedure)>,

    pub ratified_at: Option<Epoch>,
    pub enacted_at: Option<Epoch>,

    /// Result of the latest tally
    pub last_tally: Option<VoteResult<VoteCount>>,
}

impl Proposal {
    pub fn new(id: GovActionId, procedure: ProposalProcedure, epoch: Epoch, lifetime: u64) -> Self {
        Self {
            id,
            procedure,
            submitted: epoch,
            expires: epoch + lifetime,
            status: ProposalStatus::Active,
            votes: Vec::new(),
            ratified_at: None,
            enacted_at: None,
            last_tally: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProposalStatus::Active
    }

    /// Still accepts votes: active, or ratified and waiting for enactment
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn vote_of(&self, voter: &Voter) -> Option<Vote> {
        self.votes.iter().find(|(v, _)| v == voter).map(|(_, p)| p.vote)
    }
}

/// Proposals in the order they were submitted
#[derive(Debug, Default, Clone)]
pub struct ConwayVoting {
    proposals: Vec<Proposal>,
}

impl ConwayVoting {
    pub fn insert_proposal_procedure(
        &mut self,
        id: GovActionId,
        epoch: Epoch,
        lifetime: u64,
        procedure: &ProposalProcedure,
    ) -> ValidationResult {
        if self.get(&id).is_some() {
            return Err(Box::new(ValidationError::DuplicateGovActionId { id }));
        }
        debug!("New proposal {id}: {}", procedure.gov_action.get_action_name());
        self.proposals.push(Proposal::new(id, procedure.clone(), epoch, lifetime));
        Ok(())
    }

    /// Record a vote on an active proposal. Re-voting is allowed; the new vote is the one
    /// that counts.
    pub fn insert_voting_procedure(
        &mut self,
        voter: &Voter,
        id: &GovActionId,
        procedure: &VotingProcedure,
    ) -> ValidationResult {
        let proposal = self
            .get_mut(id)
            .filter(|p| p.is_open())
            .ok_or_else(|| Box::new(ValidationError::ProposalNotActive { id: *id }))?;

        match proposal.votes.iter_mut().find(|(v, _)| v == voter) {
            Some((_, previous)) => {
                debug!(
                    "Vote by {voter} for {id} replaced: new {:?}, old {:?}",
                    procedure.vote, previous.vote
                );
                *previous = procedure.clone();
            }
            None => proposal.votes.push((*voter, procedure.clone())),
        }
        Ok(())
    }

    pub fn get(&self, id: &GovActionId) -> Option<&Proposal> {
        self.proposals.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &GovActionId) -> Option<&mut Proposal> {
        self.proposals.iter_mut().find(|p| &p.id == id)
    }

    pub fn list(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Active proposals, in stored order
    pub fn active_ids(&self) -> Vec<GovActionId> {
        self.proposals.iter().filter(|p| p.is_active()).map(|p| p.id).collect()
    }
}

/// Sources a tally reads: the stake snapshot and the registries that resolve voters
pub struct TallyContext<'a> {
    pub epoch: Epoch,
    pub snapshot: &'a StakeSnapshot,
    pub committee: &'a CommitteeState,
    pub accounts: &'a AccountsState,
    pub dreps: &'a DRepState,
}

/// Returns the cast votes weighted per class. Voters who did not vote are not counted.
/// Committee members count once each while their term lasts; DReps and pools count
/// their snapshot stake.
pub fn get_actual_votes(proposal: &Proposal, ctx: &TallyContext) -> VoteResult<VoteCount> {
    let mut votes = VoteResult::<VoteCount>::default();

    for (voter, procedure) in &proposal.votes {
        let (count, weight) = match voter {
            Voter::ConstitutionalCommitteeKey(_) | Voter::ConstitutionalCommitteeScript(_) => {
                let counted = ctx
                    .committee
                    .cold_for_hot(&voter.credential())
                    .is_some_and(|cold| ctx.committee.is_active_member(&cold, ctx.epoch));
                (&mut votes.committee, u64::from(counted))
            }
            Voter::DRepKey(_) | Voter::DRepScript(_) => {
                let credential = voter.credential();
                let stake = if ctx.dreps.is_registered(&credential) {
                    ctx.snapshot.drep_stake(&DRepChoice::from(credential))
                } else {
                    0
                };
                (&mut votes.drep, stake)
            }
            Voter::StakePoolKey(key_hash) => {
                let stake = ctx
                    .accounts
                    .resolve_pool(key_hash)
                    .map(|pool| ctx.snapshot.spo_stake(&pool))
                    .unwrap_or(0);
                (&mut votes.pool, stake)
            }
        };

        debug!(
            "Vote for {}, epoch {}: {voter} = {:?} weight {weight}",
            proposal.id, ctx.epoch, procedure.vote
        );
        match procedure.vote {
            Vote::Yes => count.yes = count.yes.saturating_add(weight),
            Vote::No => count.no = count.no.saturating_add(weight),
            Vote::Abstain => count.abstain = count.abstain.saturating_add(weight),
        }
    }

    votes
}

/// Committee voters are identified by their hot credential
pub fn committee_hot_credential(voter: &Voter) -> Option<Credential> {
    match voter {
        Voter::ConstitutionalCommitteeKey(_) | Voter::ConstitutionalCommitteeScript(_) => {
            Some(voter.credential())
        }
        _ => None,
    }
}
