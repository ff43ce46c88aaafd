use std::{collections::BTreeSet, sync::Arc};

use parse_display::Display;
use thiserror::Error;
use types::{
    attestation_bits::CommitteeSizes, combined::SignedAggregateAndProof,
    phase0::primitives::ValidatorIndex,
};

/// Result of the checks shared by all attestations received over gossip.
pub enum CheckOutcome<S> {
    /// The attestation is timely and its target state is available.
    Accept(Arc<S>),
    Reject(anyhow::Error),
    Ignore,
    /// A block or state the attestation depends on has not been processed yet.
    SaveForFuture,
    /// The checker is over capacity. Not the fault of the sender.
    NoCapacity,
}

pub enum AggregateAndProofAction {
    Accept {
        aggregate_and_proof: Arc<SignedAggregateAndProof>,
        attesting_indices: BTreeSet<ValidatorIndex>,
        /// Present for aggregates identifying committees with `committee_bits`.
        committee_sizes: Option<CommitteeSizes>,
    },
    Ignore(IgnoreReason),
    Reject(RejectionReason),
    SaveForFuture,
}

impl AggregateAndProofAction {
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Ignore(_) => "ignore",
            Self::Reject(_) => "reject",
            Self::SaveForFuture => "save_for_future",
        }
    }

    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum IgnoreReason {
    #[display("ignored by attestation checks")]
    Checker,
    #[display("attestation checks are over capacity")]
    NoCapacity,
    #[display("aggregate with identical content already seen")]
    DuplicateAggregate,
    #[display("aggregate from aggregator already seen in slot")]
    AggregatorAlreadySeen,
    #[display("attesting indices are covered by an aggregate already seen")]
    Redundant,
}

#[derive(Debug, Error)]
pub enum RejectionReason {
    #[error("attestation checks failed: {0:#}")]
    Checker(anyhow::Error),
    #[error("no participants")]
    NoParticipants,
    #[error("aggregate does not cover exactly 1 committee")]
    NotSingleCommittee,
    #[error("aggregation bits are invalid: {0:#}")]
    InvalidAggregationBits(anyhow::Error),
    #[error("aggregator not in committee")]
    AggregatorNotInCommittee,
    #[error("selection proof does not select aggregator")]
    NotAggregator,
    #[error("selection proof invalid")]
    SelectionProofInvalid,
    #[error("aggregate and proof signature invalid")]
    AggregateAndProofSignatureInvalid,
    #[error("aggregate signature invalid")]
    AggregateSignatureInvalid,
    #[error("signature verification failed: {0:#}")]
    SignatureVerificationFailed(anyhow::Error),
}
