//! Deterministic validators for tests and local networks.
//!
//! Keys follow the interop mocked start. Committees are assigned to validators in order without
//! shuffling, which keeps expected attesting indices easy to write by hand.

use core::num::NonZeroU64;

use anyhow::{anyhow, Result};
use bls::{PublicKey, SecretKey, Signature, SignatureBytes};
use helper_functions::{accessors, signing::SignForSingleFork as _};
use hex_literal::hex;
use num_bigint::BigUint;
use types::{
    collections::BitList,
    combined::{Attestation, SignedAggregateAndProof},
    config::Config,
    electra::{
        consts::MAX_COMMITTEES_PER_SLOT,
        containers::{
            AggregateAndProof as ElectraAggregateAndProof, Attestation as ElectraAttestation,
            SignedAggregateAndProof as ElectraSignedAggregateAndProof,
        },
    },
    nonstandard::Phase,
    phase0::{
        containers::{
            AggregateAndProof as Phase0AggregateAndProof, Attestation as Phase0Attestation,
            AttestationData, SignedAggregateAndProof as Phase0SignedAggregateAndProof,
        },
        primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex, Version, H256},
    },
    traits::{BeaconState, SszHash as _},
};

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
///
/// Encoded in binary to avoid parsing a decimal string at runtime.
const CURVE_ORDER: &[u8] =
    &hex!("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001");

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let index_hash = hashing::hash_bytes(validator_index.hash_tree_root());
    let curve_order = BigUint::from_bytes_be(CURVE_ORDER);
    let secret_key_uint = BigUint::from_bytes_le(index_hash.as_bytes()) % &curve_order;
    let unpadded = secret_key_uint.to_bytes_be();
    let mut padded = [0; 32];
    let padded_len = size_of_val(&padded);
    padded[padded_len - unpadded.len()..].copy_from_slice(unpadded.as_slice());
    padded
        .try_into()
        .expect("the algorithm given in the standard should produce valid secret keys")
}

/// A state with interop validators and a fixed number of committees per slot.
pub struct InteropState {
    slot: Slot,
    slots_per_epoch: NonZeroU64,
    committees_per_slot: NonZeroU64,
    genesis_validators_root: H256,
    fork_version: Version,
    validator_indices: Vec<ValidatorIndex>,
    public_keys: Vec<PublicKey>,
}

impl BeaconState for InteropState {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn genesis_validators_root(&self) -> H256 {
        self.genesis_validators_root
    }

    fn fork_version(&self, _epoch: Epoch) -> Version {
        self.fork_version
    }

    fn committee_count_per_slot(&self, _slot: Slot) -> u64 {
        self.committees_per_slot.get()
    }

    fn beacon_committee(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Option<&[ValidatorIndex]> {
        let committees_per_slot = self.committees_per_slot.get();

        if committee_index >= committees_per_slot {
            return None;
        }

        let validator_count = self.validator_indices.len() as u64;
        let committees_in_epoch = committees_per_slot * self.slots_per_epoch.get();
        let slots_since_epoch_start = slot % self.slots_per_epoch;
        let index_in_epoch = slots_since_epoch_start * committees_per_slot + committee_index;
        let start = usize::try_from(validator_count * index_in_epoch / committees_in_epoch).ok()?;
        let end =
            usize::try_from(validator_count * (index_in_epoch + 1) / committees_in_epoch).ok()?;

        self.validator_indices.get(start..end)
    }

    fn public_key(&self, validator_index: ValidatorIndex) -> Option<&PublicKey> {
        self.public_keys.get(usize::try_from(validator_index).ok()?)
    }
}

impl InteropState {
    #[must_use]
    pub fn new(
        config: &Config,
        slot: Slot,
        validator_count: NonZeroU64,
        committees_per_slot: NonZeroU64,
    ) -> Self {
        let validator_indices = (0..validator_count.get()).collect::<Vec<_>>();

        let public_keys = validator_indices
            .iter()
            .map(|validator_index| secret_key(*validator_index).to_public_key())
            .collect();

        Self {
            slot,
            slots_per_epoch: config.slots_per_epoch,
            committees_per_slot,
            genesis_validators_root: H256::repeat_byte(0x42),
            fork_version: Version::zero(),
            validator_indices,
            public_keys,
        }
    }
}

/// Builds an attestation for `committee_index` signed by the committee members at `positions`.
///
/// The encoding follows the phase of `data.slot`.
/// An attestation without participants carries the point at infinity as its signature.
pub fn attestation(
    config: &Config,
    state: &InteropState,
    data: AttestationData,
    committee_index: CommitteeIndex,
    positions: &[usize],
) -> Result<Attestation> {
    let committee = accessors::beacon_committee(state, data.slot, committee_index)?;
    let phase = config.phase_at_slot(data.slot);

    let data = AttestationData {
        index: if phase.uses_committee_bits() {
            0
        } else {
            committee_index
        },
        ..data
    };

    let mut aggregation_bits = BitList::repeat(false, committee.len());
    let mut signature = None::<Signature>;
    let signing_root = data.signing_root(config, state);

    for position in positions {
        let validator_index = committee.get(*position).copied().ok_or_else(|| {
            anyhow!("position {position} is out of bounds for committee {committee_index}")
        })?;

        aggregation_bits.set(*position, true);

        let member_signature = secret_key(validator_index).sign(signing_root);

        match signature.as_mut() {
            Some(signature) => signature.aggregate_in_place(member_signature),
            None => signature = Some(member_signature),
        }
    }

    let signature = signature.map_or_else(SignatureBytes::empty, Into::into);

    let attestation = match phase {
        Phase::Phase0 => Attestation::Phase0(Phase0Attestation {
            aggregation_bits,
            data,
            signature,
        }),
        Phase::Electra => {
            let mut committee_bits = BitList::repeat(false, MAX_COMMITTEES_PER_SLOT);
            committee_bits.set(usize::try_from(committee_index)?, true);

            Attestation::Electra(ElectraAttestation {
                aggregation_bits,
                data,
                signature,
                committee_bits,
            })
        }
    };

    Ok(attestation)
}

/// Wraps `aggregate` in an `AggregateAndProof` signed by `aggregator_index`.
pub fn signed_aggregate_and_proof(
    config: &Config,
    state: &InteropState,
    aggregate: Attestation,
    aggregator_index: ValidatorIndex,
) -> SignedAggregateAndProof {
    let secret_key = secret_key(aggregator_index);
    let slot = aggregate.data().slot;
    let selection_proof = slot.sign(config, state, &secret_key).into();

    match aggregate {
        Attestation::Phase0(aggregate) => {
            let message = Phase0AggregateAndProof {
                aggregator_index,
                aggregate,
                selection_proof,
            };

            let signature = message.sign(config, state, &secret_key).into();

            Phase0SignedAggregateAndProof { message, signature }.into()
        }
        Attestation::Electra(aggregate) => {
            let message = ElectraAggregateAndProof {
                aggregator_index,
                aggregate,
                selection_proof,
            };

            let signature = message.sign(config, state, &secret_key).into();

            ElectraSignedAggregateAndProof { message, signature }.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use bls::PublicKeyBytes;
    use nonzero_ext::nonzero;

    use super::*;

    #[test]
    fn curve_order_matches_standard() {
        assert_eq!(
            BigUint::from_bytes_be(CURVE_ORDER).to_string(),
            "52435875175126190479447740508185965837690552500527637822603658699938581184513",
        );
    }

    // See <https://github.com/ethereum/eth2.0-pm/blob/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start/keygen_10_validators.yaml>.
    #[test]
    fn keypairs_match_standard() {
        let expected_keypairs = [
            (
                hex!("25295f0d1d592a90b333e26e85149708208e9f8e8bc18f6c77bd62f8ad7a6866"),
                hex!("a99a76ed7796f7be22d5b7e85deeb7c5677e88e511e0b337618f8c4eb61349b4bf2d153f649f7b53359fe8b94a38e44c"),
            ),
            (
                hex!("51d0b65185db6989ab0b560d6deed19c7ead0e24b9b6372cbecb1f26bdfad000"),
                hex!("b89bebc699769726a318c8e9971bd3171297c61aea4a6578a7a4f94b547dcba5bac16a89108b6b6a1fe3695d1a874a0b"),
            ),
            (
                hex!("315ed405fafe339603932eebe8dbfd650ce5dafa561f6928664c75db85f97857"),
                hex!("a3a32b0f8b4ddb83f1a0a853d81dd725dfe577d4f4c3db8ece52ce2b026eca84815c1a7e8e92a4de3d755733bf7e4a9b"),
            ),
        ];

        for ((sk_bytes, pk_bytes), validator_index) in expected_keypairs.into_iter().zip(0..) {
            let expected_secret_key = SecretKey::try_from(sk_bytes)
                .expect("every secret key given in the standard should be valid");
            let expected_public_key = PublicKey::try_from(PublicKeyBytes::from(pk_bytes))
                .expect("every public key given in the standard should be valid");

            let actual_secret_key = secret_key(validator_index);
            let actual_public_key = actual_secret_key.to_public_key();

            assert_eq!(actual_secret_key, expected_secret_key);
            assert_eq!(actual_public_key, expected_public_key);
        }
    }

    #[test]
    fn committees_partition_validators_over_an_epoch() {
        let config = Config::minimal();
        let state = InteropState::new(&config, 0, nonzero!(64_u64), nonzero!(2_u64));

        let mut covered = (0..config.slots_per_epoch.get())
            .flat_map(|slot| (0..2).map(move |committee_index| (slot, committee_index)))
            .flat_map(|(slot, committee_index)| {
                state
                    .beacon_committee(slot, committee_index)
                    .unwrap_or_default()
                    .to_vec()
            })
            .collect::<Vec<_>>();

        covered.sort_unstable();

        assert_eq!(covered, (0..64).collect::<Vec<_>>());
        assert_eq!(state.beacon_committee(0, 0), Some([0, 1, 2, 3].as_slice()));
        assert_eq!(state.beacon_committee(0, 2), None);
    }

    #[test]
    fn attestation_uses_committee_bits_after_electra() -> Result<()> {
        let config = Config::minimal_electra();
        let state = InteropState::new(&config, 0, nonzero!(64_u64), nonzero!(2_u64));
        let data = AttestationData::default();

        let attestation = attestation(&config, &state, data, 1, &[0, 2])?;

        assert_eq!(attestation.phase(), Phase::Electra);
        assert_eq!(attestation.committee_index(), 1);
        assert_eq!(attestation.data().index, 0);
        assert_eq!(attestation.aggregation_bits().count_ones(), 2);

        Ok(())
    }

    #[test]
    fn attestation_rejects_positions_outside_committee() {
        let config = Config::minimal();
        let state = InteropState::new(&config, 0, nonzero!(64_u64), nonzero!(2_u64));

        assert!(attestation(&config, &state, AttestationData::default(), 0, &[4]).is_err());
    }
}
