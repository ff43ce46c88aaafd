use std::collections::BTreeMap;

use bitvec::{order::Lsb0, slice::BitSlice};
use bls::SignatureBytes;
use thiserror::Error;

use crate::{
    collections::BitList,
    combined::Attestation,
    electra::{consts::MAX_COMMITTEES_PER_SLOT, containers::Attestation as ElectraAttestation},
    phase0::{
        containers::{Attestation as Phase0Attestation, AttestationData},
        primitives::CommitteeIndex,
    },
};

/// Number of validators in each committee of a slot.
pub type CommitteeSizes = BTreeMap<CommitteeIndex, usize>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("committee sizes are needed to split aggregation bits by committee")]
    MissingCommitteeSizes,
    #[error("committee {committee_index} is not present in committee sizes")]
    UnknownCommittee { committee_index: CommitteeIndex },
    #[error("aggregation bits have length {actual} but committees have {expected} members")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("committee index {committee_index} does not fit in committee bits")]
    CommitteeIndexOutOfBounds { committee_index: CommitteeIndex },
    #[error("attestations without committee bits must cover exactly 1 committee (covers {count})")]
    NotSingleCommittee { count: usize },
}

/// Aggregation bits split by committee.
///
/// Pre-Electra attestations always cover a single committee named by `AttestationData.index`.
/// Post-Electra attestations concatenate the bits of every committee set in `committee_bits`,
/// so splitting them requires the committee sizes of the slot.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AttestationBits {
    committees: BTreeMap<CommitteeIndex, BitList>,
    requires_committee_bits: bool,
}

impl AttestationBits {
    /// Bits without any committees, used as the starting point for unions.
    #[must_use]
    pub const fn empty(requires_committee_bits: bool) -> Self {
        Self {
            committees: BTreeMap::new(),
            requires_committee_bits,
        }
    }

    #[must_use]
    pub fn single(committee_index: CommitteeIndex, bits: BitList) -> Self {
        Self {
            committees: BTreeMap::from([(committee_index, bits)]),
            requires_committee_bits: false,
        }
    }

    pub fn from_attestation(
        attestation: &Attestation,
        committee_sizes: Option<&CommitteeSizes>,
    ) -> Result<Self, Error> {
        match attestation {
            Attestation::Phase0(attestation) => Ok(Self::single(
                attestation.data.index,
                attestation.aggregation_bits.clone(),
            )),
            Attestation::Electra(attestation) => {
                let committee_sizes = committee_sizes.ok_or(Error::MissingCommitteeSizes)?;
                Self::split(attestation, committee_sizes)
            }
        }
    }

    fn split(
        attestation: &ElectraAttestation,
        committee_sizes: &CommitteeSizes,
    ) -> Result<Self, Error> {
        let sizes = attestation
            .committee_bits
            .iter_ones()
            .map(|index| {
                let committee_index = index as CommitteeIndex;

                committee_sizes
                    .get(&committee_index)
                    .map(|size| (committee_index, *size))
                    .ok_or(Error::UnknownCommittee { committee_index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let expected = sizes.iter().map(|(_, size)| size).sum();
        let actual = attestation.aggregation_bits.len();

        if expected != actual {
            return Err(Error::LengthMismatch { expected, actual });
        }

        let mut offset = 0;
        let mut committees = BTreeMap::new();

        for (committee_index, size) in sizes {
            let bits = &attestation.aggregation_bits[offset..offset + size];
            committees.insert(committee_index, bits.to_bitvec());
            offset += size;
        }

        Ok(Self {
            committees,
            requires_committee_bits: true,
        })
    }

    #[must_use]
    pub const fn requires_committee_bits(&self) -> bool {
        self.requires_committee_bits
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.committees.values().map(|bits| bits.count_ones()).sum()
    }

    #[must_use]
    pub fn not_any(&self) -> bool {
        self.committees.values().all(|bits| bits.not_any())
    }

    pub fn committee_indices(&self) -> impl Iterator<Item = CommitteeIndex> + '_ {
        self.committees.keys().copied()
    }

    #[must_use]
    pub fn committee(&self, committee_index: CommitteeIndex) -> Option<&BitList> {
        self.committees.get(&committee_index)
    }

    #[must_use]
    pub fn is_single_committee(&self, committee_index: CommitteeIndex) -> bool {
        self.committees.len() == 1 && self.committees.contains_key(&committee_index)
    }

    /// Whether every validator in `other` is also in `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other
            .committees
            .iter()
            .all(|(committee_index, theirs)| match self.committees.get(committee_index) {
                Some(ours) => is_subset(theirs, ours),
                None => theirs.not_any(),
            })
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.committees.iter().any(|(committee_index, ours)| {
            other
                .committees
                .get(committee_index)
                .is_some_and(|theirs| intersects(ours, theirs))
        })
    }

    pub fn union_with(&mut self, other: &Self) {
        for (committee_index, theirs) in &other.committees {
            let ours = self
                .committees
                .entry(*committee_index)
                .or_insert_with(|| BitList::repeat(false, theirs.len()));

            union_with(ours, theirs);
        }
    }

    pub fn into_attestation(
        self,
        data: AttestationData,
        signature: SignatureBytes,
    ) -> Result<Attestation, Error> {
        let Self {
            committees,
            requires_committee_bits,
        } = self;

        if !requires_committee_bits {
            let count = committees.len();

            let Some(aggregation_bits) = committees.into_values().next().filter(|_| count == 1)
            else {
                return Err(Error::NotSingleCommittee { count });
            };

            return Ok(Attestation::Phase0(Phase0Attestation {
                aggregation_bits,
                data,
                signature,
            }));
        }

        let mut aggregation_bits = BitList::new();
        let mut committee_bits = BitList::repeat(false, MAX_COMMITTEES_PER_SLOT);

        for (committee_index, bits) in committees {
            let index = usize::try_from(committee_index)
                .ok()
                .filter(|index| *index < MAX_COMMITTEES_PER_SLOT)
                .ok_or(Error::CommitteeIndexOutOfBounds { committee_index })?;

            committee_bits.set(index, true);
            aggregation_bits.extend_from_bitslice(&bits);
        }

        Ok(Attestation::Electra(ElectraAttestation {
            aggregation_bits,
            data,
            signature,
            committee_bits,
        }))
    }
}

fn is_subset(subset: &BitSlice<u8, Lsb0>, superset: &BitSlice<u8, Lsb0>) -> bool {
    subset
        .iter_ones()
        .all(|index| superset.get(index).is_some_and(|bit| *bit))
}

fn intersects(left: &BitSlice<u8, Lsb0>, right: &BitSlice<u8, Lsb0>) -> bool {
    left.iter_ones()
        .any(|index| right.get(index).is_some_and(|bit| *bit))
}

fn union_with(target: &mut BitList, source: &BitSlice<u8, Lsb0>) {
    if target.len() < source.len() {
        target.resize(source.len(), false);
    }

    for index in source.iter_ones() {
        target.set(index, true);
    }
}
