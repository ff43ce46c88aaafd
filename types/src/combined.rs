use bls::SignatureBytes;
use derive_more::From;

use crate::{
    collections::{self, BitList},
    electra::{
        consts::{MAX_ATTESTERS_PER_SLOT, MAX_COMMITTEES_PER_SLOT},
        containers::{
            Attestation as ElectraAttestation,
            SignedAggregateAndProof as ElectraSignedAggregateAndProof,
        },
    },
    nonstandard::Phase,
    phase0::{
        consts::MAX_VALIDATORS_PER_COMMITTEE,
        containers::{
            Attestation as Phase0Attestation, AttestationData,
            SignedAggregateAndProof as Phase0SignedAggregateAndProof,
        },
        primitives::{CommitteeIndex, Slot, ValidatorIndex, H256},
    },
    traits::SszHash,
};

#[derive(Clone, PartialEq, Eq, Debug, From)]
pub enum Attestation {
    Phase0(Phase0Attestation),
    Electra(ElectraAttestation),
}

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(attestation) => attestation.hash_tree_root(),
            Self::Electra(attestation) => attestation.hash_tree_root(),
        }
    }
}

impl Attestation {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Electra(_) => Phase::Electra,
        }
    }

    #[must_use]
    pub const fn data(&self) -> AttestationData {
        match self {
            Self::Phase0(attestation) => attestation.data,
            Self::Electra(attestation) => attestation.data,
        }
    }

    #[must_use]
    pub const fn aggregation_bits(&self) -> &BitList {
        match self {
            Self::Phase0(attestation) => &attestation.aggregation_bits,
            Self::Electra(attestation) => &attestation.aggregation_bits,
        }
    }

    #[must_use]
    pub const fn signature(&self) -> SignatureBytes {
        match self {
            Self::Phase0(attestation) => attestation.signature,
            Self::Electra(attestation) => attestation.signature,
        }
    }

    #[must_use]
    pub const fn committee_bits(&self) -> Option<&BitList> {
        match self {
            Self::Phase0(_) => None,
            Self::Electra(attestation) => Some(&attestation.committee_bits),
        }
    }

    /// Committees covered by the attestation in ascending order.
    #[must_use]
    pub fn committee_indices(&self) -> Vec<CommitteeIndex> {
        match self {
            Self::Phase0(attestation) => vec![attestation.data.index],
            Self::Electra(attestation) => attestation
                .committee_bits
                .iter_ones()
                .map(|index| index as CommitteeIndex)
                .collect(),
        }
    }

    /// The committee the attestation is attributed to on gossip.
    ///
    /// Aggregates published on gossip cover exactly one committee.
    /// Malformed post-Electra aggregates without committee bits fall back to committee 0.
    #[must_use]
    pub fn committee_index(&self) -> CommitteeIndex {
        match self {
            Self::Phase0(attestation) => attestation.data.index,
            Self::Electra(attestation) => attestation
                .committee_bits
                .first_one()
                .map_or(0, |index| index as CommitteeIndex),
        }
    }

    /// Identifies the attestation by its vote and participants, ignoring the signature.
    #[must_use]
    pub fn content_root(&self) -> H256 {
        let bits_root = match self {
            Self::Phase0(attestation) => collections::bit_list_root(
                &attestation.aggregation_bits,
                MAX_VALIDATORS_PER_COMMITTEE,
            ),
            Self::Electra(attestation) => hashing::hash_256_256(
                collections::bit_list_root(&attestation.aggregation_bits, MAX_ATTESTERS_PER_SLOT),
                collections::bit_vector_root(&attestation.committee_bits, MAX_COMMITTEES_PER_SLOT),
            ),
        };

        hashing::hash_256_256(self.data().hash_tree_root(), bits_root)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, From)]
pub enum SignedAggregateAndProof {
    Phase0(Phase0SignedAggregateAndProof),
    Electra(ElectraSignedAggregateAndProof),
}

impl SignedAggregateAndProof {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Electra(_) => Phase::Electra,
        }
    }

    #[must_use]
    pub const fn aggregator_index(&self) -> ValidatorIndex {
        match self {
            Self::Phase0(signed) => signed.message.aggregator_index,
            Self::Electra(signed) => signed.message.aggregator_index,
        }
    }

    #[must_use]
    pub const fn selection_proof(&self) -> SignatureBytes {
        match self {
            Self::Phase0(signed) => signed.message.selection_proof,
            Self::Electra(signed) => signed.message.selection_proof,
        }
    }

    #[must_use]
    pub const fn signature(&self) -> SignatureBytes {
        match self {
            Self::Phase0(signed) => signed.signature,
            Self::Electra(signed) => signed.signature,
        }
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.data().slot
    }

    #[must_use]
    pub const fn data(&self) -> AttestationData {
        match self {
            Self::Phase0(signed) => signed.message.aggregate.data,
            Self::Electra(signed) => signed.message.aggregate.data,
        }
    }

    #[must_use]
    pub const fn aggregation_bits(&self) -> &BitList {
        match self {
            Self::Phase0(signed) => &signed.message.aggregate.aggregation_bits,
            Self::Electra(signed) => &signed.message.aggregate.aggregation_bits,
        }
    }

    #[must_use]
    pub fn aggregate(&self) -> Attestation {
        match self {
            Self::Phase0(signed) => Attestation::Phase0(signed.message.aggregate.clone()),
            Self::Electra(signed) => Attestation::Electra(signed.message.aggregate.clone()),
        }
    }

    /// `hash_tree_root` of the unsigned `AggregateAndProof`.
    #[must_use]
    pub fn message_root(&self) -> H256 {
        match self {
            Self::Phase0(signed) => signed.message.hash_tree_root(),
            Self::Electra(signed) => signed.message.hash_tree_root(),
        }
    }
}
