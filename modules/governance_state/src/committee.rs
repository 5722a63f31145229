//! Emulator Governance State: constitutional committee and hot key authorizations

use emulator_common::{
    validation::{ValidationError, ValidationResult},
    Committee, CommitteeChange, CommitteeCredential, Epoch,
};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommitteeState {
    pub committee: Committee,

    /// Cold credential to its authorized hot credential
    hot_keys: BTreeMap<CommitteeCredential, Option<CommitteeCredential>>,
}

impl CommitteeState {
    pub fn new(committee: Committee) -> Self {
        Self {
            committee,
            hot_keys: BTreeMap::new(),
        }
    }

    pub fn hot_key(&self, cold: &CommitteeCredential) -> Option<CommitteeCredential> {
        self.hot_keys.get(cold).copied().flatten()
    }

    /// Member a hot credential currently stands for
    pub fn cold_for_hot(&self, hot: &CommitteeCredential) -> Option<CommitteeCredential> {
        self.hot_keys
            .iter()
            .find(|(cold, h)| h.as_ref() == Some(hot) && self.committee.members.contains_key(cold))
            .map(|(cold, _)| *cold)
    }

    pub fn is_authorized_hot(&self, hot: &CommitteeCredential) -> bool {
        self.cold_for_hot(hot).is_some()
    }

    /// Authorize a hot credential for a current member
    pub fn authorize_hot(
        &mut self,
        cold: &CommitteeCredential,
        hot: &CommitteeCredential,
    ) -> ValidationResult {
        self.check_member(cold)?;
        debug!("Committee member {cold} authorizes hot key {hot}");
        self.hot_keys.insert(*cold, Some(*hot));
        Ok(())
    }

    /// Remove a member that resigns, with its hot key
    pub fn resign(&mut self, cold: &CommitteeCredential) -> ValidationResult {
        self.check_member(cold)?;
        debug!("Committee member {cold} resigns");
        self.committee.members.remove(cold);
        self.hot_keys.remove(cold);
        Ok(())
    }

    /// Enact an update-committee action
    pub fn apply_change(&mut self, change: &CommitteeChange) {
        for cold in &change.removed_committee_members {
            self.committee.members.remove(cold);
            self.hot_keys.remove(cold);
        }
        for (cold, term) in &change.new_committee_members {
            self.committee.members.insert(*cold, *term);
        }
        self.committee.threshold = change.terms;
    }

    /// Replace the whole committee, dropping authorizations of members that left
    pub fn replace(&mut self, committee: Committee) {
        self.hot_keys.retain(|cold, _| committee.members.contains_key(cold));
        self.committee = committee;
    }

    pub fn is_active_member(&self, cold: &CommitteeCredential, epoch: Epoch) -> bool {
        self.committee.is_active_member(cold, epoch)
    }

    fn check_member(&self, cold: &CommitteeCredential) -> ValidationResult {
        if self.committee.members.contains_key(cold) {
            Ok(())
        } else {
            Err(Box::new(ValidationError::UnknownCommitteeMember { credential: *cold }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::{rational_number::RationalNumber, Credential, Hash};
    use std::collections::BTreeSet;

    fn cred(b: u8) -> CommitteeCredential {
        Credential::AddrKeyHash(Hash::new([b; 28]))
    }

    fn committee() -> CommitteeState {
        let mut committee = Committee::default();
        committee.members.insert(cred(1), 10);
        committee.members.insert(cred(2), 3);
        committee.threshold = RationalNumber::new(2, 3);
        CommitteeState::new(committee)
    }

    #[test]
    fn hot_keys_follow_membership() {
        let mut state = committee();
        let err = state.authorize_hot(&cred(9), &cred(19)).unwrap_err();
        assert!(matches!(*err, ValidationError::UnknownCommitteeMember { .. }));

        state.authorize_hot(&cred(1), &cred(11)).unwrap();
        assert_eq!(state.cold_for_hot(&cred(11)), Some(cred(1)));
        assert!(state.is_authorized_hot(&cred(11)));

        state.resign(&cred(1)).unwrap();
        assert!(!state.is_authorized_hot(&cred(11)));
        assert!(!state.committee.members.contains_key(&cred(1)));
    }

    #[test]
    fn change_removes_adds_and_sets_quorum() {
        let mut state = committee();
        state.authorize_hot(&cred(2), &cred(12)).unwrap();
        state.apply_change(&CommitteeChange {
            removed_committee_members: BTreeSet::from([cred(2)]),
            new_committee_members: BTreeMap::from([(cred(3), 20)]),
            terms: RationalNumber::new(1, 2),
        });
        assert_eq!(state.hot_key(&cred(2)), None);
        assert_eq!(state.committee.members.len(), 2);
        assert_eq!(state.committee.threshold, RationalNumber::new(1, 2));
        assert!(state.is_active_member(&cred(3), 20));
        assert!(!state.is_active_member(&cred(3), 21));
    }
}
