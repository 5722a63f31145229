use emulator_common::{
    protocol_params::{ProtocolParamType, ProtocolParams},
    rational_number::{fraction_at_least, RationalNumber},
    Committee, GovernanceAction, VoteCount, VoteResult,
};
use std::cmp::max;
use tracing::warn;

/// What a proposal is measured against at ratification time
#[derive(Debug, Clone, Copy)]
pub struct VotingRules<'a> {
    pub params: &'a ProtocolParams,
    pub committee: &'a Committee,
    pub bootstrap: bool,
}

impl<'a> VotingRules<'a> {
    pub fn new(params: &'a ProtocolParams, committee: &'a Committee, bootstrap: bool) -> Self {
        Self {
            params,
            committee,
            bootstrap,
        }
    }

    /// Computes the fraction of cast yes/no votes needed to accept `action`, for each
    /// class of voter. A zero threshold means the class is not consulted.
    pub fn get_action_thresholds(&self, action: &GovernanceAction) -> VoteResult<RationalNumber> {
        let d = &self.params.drep_voting_thresholds;
        let p = &self.params.pool_voting_thresholds;
        let c = &self.committee.threshold;
        let zero = RationalNumber::from_integer(0);
        let one = RationalNumber::from_integer(1);

        match action {
            GovernanceAction::ParameterChange(action) => {
                let param_types = action.protocol_param_update.param_types();

                let mut p_th = zero;
                let mut d_th = zero;

                if param_types.contains(ProtocolParamType::SecurityProperty) {
                    p_th = p.security_voting_threshold;
                }
                if param_types.contains(ProtocolParamType::EconomicGroup) {
                    d_th = max(d_th, d.pp_economic_group);
                }
                if param_types.contains(ProtocolParamType::NetworkGroup) {
                    d_th = max(d_th, d.pp_network_group);
                }
                if param_types.contains(ProtocolParamType::TechnicalGroup) {
                    d_th = max(d_th, d.pp_technical_group);
                }
                if param_types.contains(ProtocolParamType::GovernanceGroup) {
                    d_th = max(d_th, d.pp_governance_group);
                }

                VoteResult::new(*c, d_th, p_th)
            }
            GovernanceAction::HardForkInitiation(_) => {
                VoteResult::new(*c, d.hard_fork_initiation, p.hard_fork_initiation)
            }
            GovernanceAction::TreasuryWithdrawals(_) => {
                VoteResult::new(*c, d.treasury_withdrawal, zero)
            }
            GovernanceAction::NoConfidence(_) => {
                VoteResult::new(zero, d.motion_no_confidence, p.motion_no_confidence)
            }
            GovernanceAction::UpdateCommittee(_) => {
                if self.committee.is_empty() {
                    VoteResult::new(zero, d.committee_no_confidence, p.committee_no_confidence)
                } else {
                    VoteResult::new(zero, d.committee_normal, p.committee_normal)
                }
            }
            GovernanceAction::NewConstitution(_) => {
                VoteResult::new(*c, d.update_constitution, zero)
            }
            GovernanceAction::Information => VoteResult::new(zero, one, one),
        }
    }

    /// `yes / (yes + no) >= threshold` in every consulted class.
    /// While bootstrapping only parameter changes, hard forks and info can pass.
    pub fn compare_votes(
        &self,
        action: &GovernanceAction,
        votes: &VoteResult<VoteCount>,
        threshold: &VoteResult<RationalNumber>,
    ) -> bool {
        if self.bootstrap && !action.allowed_in_bootstrap() {
            warn!(
                "Action {} cannot be ratified while governance is bootstrapping",
                action.get_action_name()
            );
            return false;
        }

        let passes = |count: &VoteCount, th: &RationalNumber| {
            *th.numer() == 0 || fraction_at_least(count.yes, count.no, th)
        };

        passes(&votes.committee, &threshold.committee)
            && passes(&votes.drep, &threshold.drep)
            && passes(&votes.pool, &threshold.pool)
    }
}
