//! Proposal lifecycle across epoch boundaries
mod common;

use common::{Harness, FEE, STAKE};
use emulator_common::{
    configuration::EmulatorConfig, protocol_params::ProtocolParamUpdate,
    validation::ValidationError, DRepDeregistration, GovernanceAction, Hash,
    ParameterChangeAction, ProposalStatus, TreasuryWithdrawalsAction, TxCertificate, Value, Vote,
    Voter,
};
use emulator_test_utils::TestWallet;
use ledger_emulator::EmulatorError;

fn key_deposit_change(key_deposit: u64) -> GovernanceAction {
    GovernanceAction::ParameterChange(ParameterChangeAction {
        previous_action_id: None,
        protocol_param_update: Box::new(ProtocolParamUpdate {
            key_deposit: Some(key_deposit),
            ..ProtocolParamUpdate::default()
        }),
        script_hash: None,
    })
}

#[tokio::test]
async fn ratified_parameter_change_is_enacted_a_boundary_later() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    let deposit = h.emulator.params().governance_action_deposit;
    let original = h.emulator.params().key_deposit;

    // Epoch 0: the DRep and its stake exist before the snapshot
    h.register_drep(&alice).await?;
    h.advance_epochs(1)?;

    // Epoch 1: propose and vote
    let id = h.propose(key_deposit_change(original + 1_000_000)).await?;
    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::Yes).await?;
    assert_eq!(h.emulator.pots().deposits, original + h.emulator.params().drep_deposit + deposit);

    h.advance_epochs(1)?;
    let proposal = h.emulator.proposal(&id).expect("proposal stored");
    assert_eq!(proposal.status, ProposalStatus::Ratified);
    assert_eq!(proposal.last_tally.map(|t| t.drep.yes), Some(STAKE));
    assert_eq!(h.emulator.params().key_deposit, original);

    h.advance_epochs(1)?;
    let proposal = h.emulator.proposal(&id).expect("proposal stored");
    assert_eq!(proposal.status, ProposalStatus::Enacted);
    assert_eq!(h.emulator.params().key_deposit, original + 1_000_000);
    assert_eq!(h.rewards(&alice), STAKE + deposit);
    Ok(())
}

#[tokio::test]
async fn unvoted_proposal_expires_with_refund() -> Result<(), EmulatorError> {
    let mut config = EmulatorConfig::default();
    config.protocol_params.governance_action_validity_period = 1;
    let mut h = Harness::new(config)?;
    let alice = h.alice.clone();
    let deposit = h.emulator.params().governance_action_deposit;
    let params = h.emulator.params().clone();

    h.register_account(&alice).await?;
    let id = h.propose(key_deposit_change(params.key_deposit * 2)).await?;

    h.advance_epochs(1)?;
    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Active));

    h.advance_epochs(1)?;
    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Expired));
    assert_eq!(h.rewards(&alice), deposit);
    assert_eq!(h.emulator.pots().deposits, params.key_deposit);
    assert_eq!(h.emulator.params(), &params);
    Ok(())
}

#[tokio::test]
async fn idle_drep_expires_without_refund() -> Result<(), EmulatorError> {
    let mut config = EmulatorConfig::default();
    config.protocol_params.drep_inactivity_period = 1;
    let mut h = Harness::new(config)?;
    let alice = h.alice.clone();
    let params = h.emulator.params().clone();

    h.register_drep(&alice).await?;
    h.advance_epochs(3)?;

    let drep = h.emulator.drep(&alice.stake_credential()).expect("drep record kept");
    assert!(!drep.registered);
    assert_eq!(drep.deposit, 0);
    assert_eq!(h.rewards(&alice), STAKE);

    // The forfeited deposit stays locked in the deposit pot
    let pots = h.emulator.pots();
    assert_eq!(pots.deposits, params.key_deposit + params.drep_deposit);
    assert_eq!(pots.treasury, FEE);
    Ok(())
}

#[tokio::test]
async fn drep_unregistration_refunds_its_reward_account() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    let params = h.emulator.params().clone();
    h.register_drep(&alice).await?;

    let credential = alice.stake_credential();
    h.submit(0, &[alice.stake_key()], |body| {
        body.certificates.push(TxCertificate::DRepDeregistration(DRepDeregistration {
            credential,
            refund: params.drep_deposit,
        }));
    })
    .await?;

    assert_eq!(h.rewards(&alice), STAKE + params.drep_deposit);
    assert_eq!(h.emulator.pots().deposits, params.key_deposit);
    assert!(!h.emulator.drep(&credential).is_some_and(|d| d.registered));
    Ok(())
}

#[tokio::test]
async fn drep_unregistration_cannot_claim_the_refund_as_change() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    let params = h.emulator.params().clone();
    h.register_drep(&alice).await?;

    let credential = alice.stake_credential();
    let refund = params.drep_deposit;
    let error = h
        .submit(0, &[alice.stake_key()], |body| {
            body.certificates.push(TxCertificate::DRepDeregistration(DRepDeregistration {
                credential,
                refund,
            }));
            if let Some(change) = body.outputs.last_mut() {
                change.value = Value::lovelace(change.value.coin() + refund);
            }
        })
        .await
        .unwrap_err();
    assert!(matches!(error.validation(), Some(ValidationError::ValueNotConserved { .. })));
    assert_eq!(h.rewards(&alice), STAKE);
    Ok(())
}

#[tokio::test]
async fn ratified_proposal_still_accepts_votes() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    h.register_drep(&alice).await?;
    h.advance_epochs(1)?;

    let id = h.propose(key_deposit_change(1)).await?;
    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::Yes).await?;
    h.advance_epochs(1)?;
    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Ratified));

    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::No).await?;
    let proposal = h.emulator.proposal(&id).expect("proposal stored");
    assert_eq!(proposal.vote_of(&alice.drep_voter()), Some(Vote::No));

    // Once enacted the proposal is closed
    h.advance_epochs(1)?;
    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Enacted));
    let error = h
        .vote(alice.drep_voter(), alice.stake_key(), id, Vote::Yes)
        .await
        .unwrap_err();
    assert_eq!(error.validation(), Some(&ValidationError::ProposalNotActive { id }));
    Ok(())
}

#[tokio::test]
async fn treasury_withdrawals_apply_partially() -> Result<(), EmulatorError> {
    let mut config = EmulatorConfig::default();
    config.initial_treasury = 50_000_000;
    config.bootstrap = false;
    let mut h = Harness::new(config)?;
    let alice = h.alice.clone();
    let stranger = TestWallet::new("stranger");

    h.register_drep(&alice).await?;
    h.advance_epochs(1)?;

    let action = GovernanceAction::TreasuryWithdrawals(TreasuryWithdrawalsAction {
        rewards: [
            (alice.stake_address(), 10_000_000),
            (stranger.stake_address(), 5_000_000),
        ]
        .into(),
        script_hash: None,
    });
    let id = h.propose(action).await?;
    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::Yes).await?;
    h.advance_epochs(1)?;
    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Ratified));

    let treasury = h.emulator.pots().treasury;
    let rewards = h.rewards(&alice);
    h.advance_epochs(1)?;

    assert_eq!(h.emulator.proposal(&id).map(|p| p.status), Some(ProposalStatus::Enacted));
    assert_eq!(h.emulator.pots().treasury, treasury - 10_000_000);
    let deposit = h.emulator.params().governance_action_deposit;
    assert_eq!(h.rewards(&alice), rewards + 10_000_000 + deposit);
    assert!(h.emulator.account(&stranger.stake_address()).is_none());
    Ok(())
}

#[tokio::test]
async fn latest_vote_replaces_the_earlier_one() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    h.register_drep(&alice).await?;
    let id = h.propose(key_deposit_change(1)).await?;

    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::No).await?;
    h.vote(alice.drep_voter(), alice.stake_key(), id, Vote::Yes).await?;

    let proposal = h.emulator.proposal(&id).expect("proposal stored");
    assert_eq!(proposal.votes.len(), 1);
    assert_eq!(proposal.vote_of(&alice.drep_voter()), Some(Vote::Yes));
    Ok(())
}

#[tokio::test]
async fn unregistered_drep_cannot_vote() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    let bob = TestWallet::new("bob");
    h.register_account(&alice).await?;
    let id = h.propose(key_deposit_change(1)).await?;

    let error = h
        .vote(bob.drep_voter(), bob.stake_key(), id, Vote::Yes)
        .await
        .unwrap_err();
    assert_eq!(
        error.validation(),
        Some(&ValidationError::UnregisteredDRepVote {
            voter: bob.drep_voter()
        })
    );
    Ok(())
}

#[tokio::test]
async fn committee_vote_needs_an_authorized_hot_key() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    let hot = TestWallet::new("hot");
    h.register_account(&alice).await?;
    let id = h.propose(key_deposit_change(1)).await?;

    let voter = Voter::ConstitutionalCommitteeKey(hot.key_hash());
    let error = h.vote(voter, hot.payment_key(), id, Vote::Yes).await.unwrap_err();
    assert_eq!(
        error.validation(),
        Some(&ValidationError::UnauthorizedCommitteeVote { voter })
    );
    Ok(())
}

#[tokio::test]
async fn vote_on_unknown_proposal_is_rejected() -> Result<(), EmulatorError> {
    let mut h = Harness::new(EmulatorConfig::default())?;
    let alice = h.alice.clone();
    h.register_drep(&alice).await?;

    let missing = emulator_common::GovActionId::new(Hash::new([9; 32]), 0);
    let error = h
        .vote(alice.drep_voter(), alice.stake_key(), missing, Vote::Yes)
        .await
        .unwrap_err();
    assert_eq!(
        error.validation(),
        Some(&ValidationError::ProposalNotActive { id: missing })
    );
    Ok(())
}
