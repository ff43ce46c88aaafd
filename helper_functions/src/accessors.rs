use std::collections::BTreeSet;

use anyhow::{ensure, Result};
use bls::PublicKey;
use types::{
    attestation_bits::{AttestationBits, CommitteeSizes},
    combined::Attestation,
    phase0::primitives::{CommitteeIndex, Domain, DomainType, Epoch, Slot, ValidatorIndex},
    traits::BeaconState,
};

use crate::{error::Error, misc};

pub fn beacon_committee(
    state: &(impl BeaconState + ?Sized),
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<&[ValidatorIndex]> {
    state
        .beacon_committee(slot, committee_index)
        .ok_or_else(|| Error::CommitteeIndexOutOfBounds {
            slot,
            committee_index,
        })
        .map_err(Into::into)
}

pub fn public_key(
    state: &(impl BeaconState + ?Sized),
    validator_index: ValidatorIndex,
) -> Result<&PublicKey> {
    state
        .public_key(validator_index)
        .ok_or(Error::PublicKeyNotFound { validator_index })
        .map_err(Into::into)
}

/// Sizes of all committees at `slot`, as needed to split post-Electra aggregation bits.
pub fn committee_sizes(state: &(impl BeaconState + ?Sized), slot: Slot) -> Result<CommitteeSizes> {
    (0..state.committee_count_per_slot(slot))
        .map(|committee_index| {
            let committee = beacon_committee(state, slot, committee_index)?;
            Ok((committee_index, committee.len()))
        })
        .collect()
}

pub fn get_domain(
    state: &(impl BeaconState + ?Sized),
    domain_type: DomainType,
    epoch: Epoch,
) -> Domain {
    misc::compute_domain(
        domain_type,
        state.fork_version(epoch),
        state.genesis_validators_root(),
    )
}

/// Validators whose votes are aggregated in `attestation`.
///
/// Fails if a committee named by the attestation does not exist or if its aggregation bits do not
/// have the length of the committee.
pub fn get_attesting_indices(
    state: &(impl BeaconState + ?Sized),
    attestation: &Attestation,
) -> Result<BTreeSet<ValidatorIndex>> {
    let slot = attestation.data().slot;
    let sizes = committee_sizes(state, slot)?;
    let bits = AttestationBits::from_attestation(attestation, Some(&sizes))?;

    let mut attesting_indices = BTreeSet::new();

    for committee_index in bits.committee_indices() {
        let committee = beacon_committee(state, slot, committee_index)?;

        let Some(aggregation_bits) = bits.committee(committee_index) else {
            continue;
        };

        ensure!(
            aggregation_bits.len() == committee.len(),
            Error::CommitteeLengthMismatch {
                aggregation_bitlist_length: aggregation_bits.len(),
                committee_length: committee.len(),
            },
        );

        attesting_indices.extend(
            aggregation_bits
                .iter()
                .by_vals()
                .zip(committee)
                .filter_map(|(present, validator_index)| present.then_some(*validator_index)),
        );
    }

    Ok(attesting_indices)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bitvec::{bitvec, order::Lsb0};
    use types::{
        collections::BitList,
        electra::{consts::MAX_COMMITTEES_PER_SLOT, containers::Attestation as ElectraAttestation},
        phase0::{
            containers::{Attestation as Phase0Attestation, AttestationData},
            primitives::{Version, H256},
        },
    };

    use super::*;

    struct CommitteeState {
        committees: BTreeMap<CommitteeIndex, Vec<ValidatorIndex>>,
    }

    impl BeaconState for CommitteeState {
        fn slot(&self) -> Slot {
            0
        }

        fn genesis_validators_root(&self) -> H256 {
            H256::zero()
        }

        fn fork_version(&self, _epoch: Epoch) -> Version {
            Version::zero()
        }

        fn committee_count_per_slot(&self, _slot: Slot) -> u64 {
            self.committees.len() as u64
        }

        fn beacon_committee(
            &self,
            _slot: Slot,
            committee_index: CommitteeIndex,
        ) -> Option<&[ValidatorIndex]> {
            self.committees.get(&committee_index).map(Vec::as_slice)
        }

        fn public_key(&self, _validator_index: ValidatorIndex) -> Option<&PublicKey> {
            None
        }
    }

    fn state() -> CommitteeState {
        CommitteeState {
            committees: BTreeMap::from([(0, vec![10, 11, 12]), (1, vec![20, 21])]),
        }
    }

    #[test]
    fn committee_sizes_cover_every_committee_in_slot() -> Result<()> {
        assert_eq!(
            committee_sizes(&state(), 0)?,
            CommitteeSizes::from([(0, 3), (1, 2)]),
        );

        Ok(())
    }

    #[test]
    fn attesting_indices_of_phase0_attestation() -> Result<()> {
        let attestation = Attestation::Phase0(Phase0Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 1, 0, 1],
            ..Phase0Attestation::default()
        });

        assert_eq!(
            get_attesting_indices(&state(), &attestation)?,
            BTreeSet::from([10, 12]),
        );

        Ok(())
    }

    #[test]
    fn attesting_indices_of_electra_attestation_span_committees() -> Result<()> {
        let mut committee_bits = BitList::repeat(false, MAX_COMMITTEES_PER_SLOT);
        committee_bits.set(0, true);
        committee_bits.set(1, true);

        let attestation = Attestation::Electra(ElectraAttestation {
            aggregation_bits: bitvec![u8, Lsb0; 0, 1, 0, 1, 1],
            committee_bits,
            ..ElectraAttestation::default()
        });

        assert_eq!(
            get_attesting_indices(&state(), &attestation)?,
            BTreeSet::from([11, 20, 21]),
        );

        Ok(())
    }

    #[test]
    fn attesting_indices_fail_on_length_mismatch() {
        let attestation = Attestation::Phase0(Phase0Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 1, 0],
            ..Phase0Attestation::default()
        });

        assert!(get_attesting_indices(&state(), &attestation).is_err());
    }

    #[test]
    fn attesting_indices_fail_for_unknown_committee() {
        let attestation = Attestation::Phase0(Phase0Attestation {
            aggregation_bits: bitvec![u8, Lsb0; 1],
            data: AttestationData {
                index: 5,
                ..AttestationData::default()
            },
            ..Phase0Attestation::default()
        });

        assert!(get_attesting_indices(&state(), &attestation).is_err());
    }
}
