//! Anonymous voting on top of identity proofs.
//!
//! A [`Ballot`] accepts one vote per document holder. The caller must be the
//! signal the proof was bound to, the proof must be recent, and its user
//! nullifier must not have voted before within the ballot's replay scope.

use num_bigint::BigUint;
use serde::Serialize;
use std::time::Duration;

use crate::codec::{decimal, PackedProof};
use crate::nullifier::NullifierRegistry;
use crate::protocol::{self, PairingCheck, PublicSignals, RejectReason, Signal};

/// Default window in which a proof's document timestamp is accepted.
pub const DEFAULT_MAX_PROOF_AGE: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("unknown proposal {index} (ballot has {count})")]
    UnknownProposal { index: usize, count: usize },

    #[error("wrong user signal sent")]
    WrongSignal,

    #[error("proof timestamp {timestamp} is outside the accepted window")]
    StaleProof { timestamp: String },

    #[error("proof is invalid: {0}")]
    Rejected(RejectReason),

    #[error("this identity has already voted")]
    AlreadyVoted,
}

/// Which votes share a nullifier namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayScope {
    /// One vote per holder across the whole ballot.
    #[default]
    PerBallot,
    /// One vote per holder per proposal.
    PerProposal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub description: String,
    pub vote_count: u64,
}

/// Emitted for every accepted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum VoteEvent {
    #[serde(rename_all = "camelCase")]
    Voted {
        proposal_index: usize,
        #[serde(with = "decimal")]
        user_nullifier: BigUint,
    },
}

pub struct Ballot<P: PairingCheck> {
    question: String,
    proposals: Vec<Proposal>,
    verifier: P,
    registry: NullifierRegistry,
    replay_scope: ReplayScope,
    max_proof_age: Duration,
}

impl<P: PairingCheck> Ballot<P> {
    pub fn new(
        question: impl Into<String>,
        proposals: impl IntoIterator<Item = impl Into<String>>,
        verifier: P,
    ) -> Self {
        Self {
            question: question.into(),
            proposals: proposals
                .into_iter()
                .map(|description| Proposal {
                    description: description.into(),
                    vote_count: 0,
                })
                .collect(),
            verifier,
            registry: NullifierRegistry::new(),
            replay_scope: ReplayScope::default(),
            max_proof_age: DEFAULT_MAX_PROOF_AGE,
        }
    }

    pub fn with_replay_scope(mut self, scope: ReplayScope) -> Self {
        self.replay_scope = scope;
        self
    }

    pub fn with_max_proof_age(mut self, age: Duration) -> Self {
        self.max_proof_age = age;
        self
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Cast a vote for `index` on behalf of `caller`.
    ///
    /// `now` is the current unix time in seconds. Nothing is recorded unless
    /// every check passes.
    pub fn vote_for_proposal(
        &mut self,
        caller: &Signal,
        index: usize,
        signals: &PublicSignals,
        proof: &PackedProof,
        now: u64,
    ) -> Result<VoteEvent, VoteError> {
        let count = self.proposals.len();
        if index >= count {
            return Err(VoteError::UnknownProposal { index, count });
        }

        if &signals.external_signal != caller.value() {
            tracing::warn!(caller = %caller, "vote rejected: wrong user signal");
            return Err(VoteError::WrongSignal);
        }

        if !self.is_fresh(signals, now) {
            tracing::warn!(timestamp = %signals.timestamp, now, "vote rejected: stale proof");
            return Err(VoteError::StaleProof {
                timestamp: signals.timestamp.to_string(),
            });
        }

        if let Some(reason) = protocol::verify(proof, signals, caller, &self.verifier).reason() {
            tracing::warn!(%reason, "vote rejected");
            return Err(VoteError::Rejected(reason));
        }

        let key = self.replay_key(index);
        if !self.registry.record(key, signals.user_nullifier.clone()) {
            tracing::warn!(proposal = index, "vote rejected: nullifier already used");
            return Err(VoteError::AlreadyVoted);
        }

        self.proposals[index].vote_count += 1;
        tracing::info!(proposal = index, "vote accepted");

        Ok(VoteEvent::Voted {
            proposal_index: index,
            user_nullifier: signals.user_nullifier.clone(),
        })
    }

    pub fn has_voted(&self, index: usize, user_nullifier: &BigUint) -> bool {
        self.registry.contains(self.replay_key(index), user_nullifier)
    }

    fn replay_key(&self, index: usize) -> u64 {
        match self.replay_scope {
            ReplayScope::PerBallot => 0,
            ReplayScope::PerProposal => index as u64,
        }
    }

    fn is_fresh(&self, signals: &PublicSignals, now: u64) -> bool {
        match signals.timestamp_secs() {
            Some(ts) => ts <= now && now - ts <= self.max_proof_age.as_secs(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;
    const VOTER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn accept_all(_: &PackedProof, _: &PublicSignals) -> bool {
        true
    }

    fn reject_all(_: &PackedProof, _: &PublicSignals) -> bool {
        false
    }

    fn proof() -> PackedProof {
        PackedProof::new((1..=8u32).map(BigUint::from).collect()).unwrap()
    }

    fn signals(signal: &Signal, user_nullifier: u32, timestamp: u64) -> PublicSignals {
        PublicSignals {
            identity_nullifier: BigUint::from(99u32),
            user_nullifier: BigUint::from(user_nullifier),
            timestamp: BigUint::from(timestamp),
            external_signal: signal.value().clone(),
        }
    }

    fn ballot<P: PairingCheck>(verifier: P) -> Ballot<P> {
        Ballot::new("Do you like this app?", ["yes", "no", "maybe"], verifier)
    }

    #[test]
    fn test_vote_emits_event() {
        let mut ballot = ballot(accept_all);
        let voter = Signal::from_address(VOTER).unwrap();

        let event = ballot
            .vote_for_proposal(&voter, 0, &signals(&voter, 5, NOW - 60), &proof(), NOW)
            .unwrap();

        assert_eq!(
            event,
            VoteEvent::Voted {
                proposal_index: 0,
                user_nullifier: BigUint::from(5u32)
            }
        );
        assert_eq!(ballot.proposals()[0].vote_count, 1);
        assert!(ballot.has_voted(0, &BigUint::from(5u32)));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"event": "voted", "proposalIndex": 0, "userNullifier": "5"})
        );
    }

    #[test]
    fn test_wrong_signal_rejected() {
        let mut ballot = ballot(accept_all);
        let voter = Signal::from_address(VOTER).unwrap();
        let other = Signal::from_u64(40);

        let err = ballot
            .vote_for_proposal(&other, 0, &signals(&voter, 5, NOW), &proof(), NOW)
            .unwrap_err();
        assert_eq!(err, VoteError::WrongSignal);
        assert_eq!(err.to_string(), "wrong user signal sent");
        assert_eq!(ballot.proposals()[0].vote_count, 0);
    }

    #[test]
    fn test_invalid_proof_rejected() {
        let mut ballot = ballot(reject_all);
        let voter = Signal::from_u64(1);
        let err = ballot
            .vote_for_proposal(&voter, 1, &signals(&voter, 5, NOW), &proof(), NOW)
            .unwrap_err();
        assert_eq!(err, VoteError::Rejected(RejectReason::ProofInvalid));
        assert!(!ballot.has_voted(1, &BigUint::from(5u32)));
    }

    #[test]
    fn test_replay_rejected_per_ballot() {
        let mut ballot = ballot(accept_all);
        let voter = Signal::from_u64(1);
        let s = signals(&voter, 5, NOW);

        ballot.vote_for_proposal(&voter, 0, &s, &proof(), NOW).unwrap();
        assert_eq!(
            ballot.vote_for_proposal(&voter, 0, &s, &proof(), NOW),
            Err(VoteError::AlreadyVoted)
        );
        assert_eq!(
            ballot.vote_for_proposal(&voter, 2, &s, &proof(), NOW),
            Err(VoteError::AlreadyVoted)
        );
        assert_eq!(ballot.proposals()[0].vote_count, 1);
        assert_eq!(ballot.proposals()[2].vote_count, 0);
    }

    #[test]
    fn test_shifted_nullifier_does_not_vote_twice() {
        let mut ballot = ballot(accept_all);
        let voter = Signal::from_u64(1);
        let s = signals(&voter, 5, NOW);
        ballot.vote_for_proposal(&voter, 0, &s, &proof(), NOW).unwrap();

        let mut shifted = s.clone();
        shifted.user_nullifier += crate::protocol::scalar_field_modulus();
        assert_eq!(
            ballot.vote_for_proposal(&voter, 0, &shifted, &proof(), NOW),
            Err(VoteError::Rejected(RejectReason::ProofInvalid))
        );
        assert!(!ballot.has_voted(0, &shifted.user_nullifier));
        assert_eq!(ballot.proposals()[0].vote_count, 1);
    }

    #[test]
    fn test_replay_scope_per_proposal() {
        let mut ballot = ballot(accept_all).with_replay_scope(ReplayScope::PerProposal);
        let voter = Signal::from_u64(1);
        let s = signals(&voter, 5, NOW);

        ballot.vote_for_proposal(&voter, 0, &s, &proof(), NOW).unwrap();
        ballot.vote_for_proposal(&voter, 1, &s, &proof(), NOW).unwrap();
        assert_eq!(
            ballot.vote_for_proposal(&voter, 1, &s, &proof(), NOW),
            Err(VoteError::AlreadyVoted)
        );
    }

    #[test]
    fn test_stale_and_future_proofs_rejected() {
        let mut ballot = ballot(accept_all).with_max_proof_age(Duration::from_secs(100));
        let voter = Signal::from_u64(1);

        let old = signals(&voter, 5, NOW - 101);
        assert!(matches!(
            ballot.vote_for_proposal(&voter, 0, &old, &proof(), NOW),
            Err(VoteError::StaleProof { .. })
        ));

        let future = signals(&voter, 5, NOW + 1);
        assert!(matches!(
            ballot.vote_for_proposal(&voter, 0, &future, &proof(), NOW),
            Err(VoteError::StaleProof { .. })
        ));

        // boundary is inclusive
        let edge = signals(&voter, 5, NOW - 100);
        assert!(ballot.vote_for_proposal(&voter, 0, &edge, &proof(), NOW).is_ok());
    }

    #[test]
    fn test_unknown_proposal() {
        let mut ballot = ballot(accept_all);
        let voter = Signal::from_u64(1);
        assert_eq!(
            ballot.vote_for_proposal(&voter, 3, &signals(&voter, 5, NOW), &proof(), NOW),
            Err(VoteError::UnknownProposal { index: 3, count: 3 })
        );
    }
}
