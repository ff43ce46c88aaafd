use bls::{AggregateSignature, SignatureBytes};
use types::{
    attestation_bits::{AttestationBits, Error as AttestationBitsError},
    combined::Attestation,
    phase0::{containers::AttestationData, primitives::Slot},
};

use crate::attestation_agg_pool::attestation_group::AttestationGroup;

/// State a block is being proposed on.
pub trait ProposalState {
    fn slot(&self) -> Slot;

    /// Whether an attestation with `data` could be included in a block built on this state.
    fn is_valid_attestation_data(&self, data: &AttestationData) -> bool;

    /// Maximum number of attestations from the previous epoch a block built on this state may hold.
    fn previous_epoch_attestation_capacity(&self) -> usize;
}

pub trait AttestationForkChecker {
    fn are_from_correct_fork(&self, group: &AttestationGroup) -> bool;
}

impl<F: Fn(&AttestationGroup) -> bool> AttestationForkChecker for F {
    fn are_from_correct_fork(&self, group: &AttestationGroup) -> bool {
        self(group)
    }
}

/// A distinct aggregation bit pattern retained in an [`AttestationGroup`].
#[derive(Clone, Debug)]
pub struct PooledAttestation {
    bits: AttestationBits,
    signature: AggregateSignature,
    participant_count: usize,
}

impl PooledAttestation {
    #[must_use]
    pub fn new(bits: AttestationBits, signature: AggregateSignature) -> Self {
        let participant_count = bits.count_ones();

        Self {
            bits,
            signature,
            participant_count,
        }
    }

    #[must_use]
    pub const fn bits(&self) -> &AttestationBits {
        &self.bits
    }

    #[must_use]
    pub const fn signature(&self) -> AggregateSignature {
        self.signature
    }

    #[must_use]
    pub const fn participant_count(&self) -> usize {
        self.participant_count
    }
}

/// Non-overlapping attestations combined into one.
#[derive(Clone, Debug)]
pub struct Aggregate {
    pub bits: AttestationBits,
    pub signature: AggregateSignature,
}

impl From<&PooledAttestation> for Aggregate {
    fn from(attestation: &PooledAttestation) -> Self {
        Self {
            bits: attestation.bits.clone(),
            signature: attestation.signature,
        }
    }
}

impl Aggregate {
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn into_attestation(
        self,
        data: AttestationData,
    ) -> Result<Attestation, AttestationBitsError> {
        let Self { bits, signature } = self;

        bits.into_attestation(data, SignatureBytes::from(signature))
    }
}
