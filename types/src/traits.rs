use bls::PublicKey;

use crate::phase0::primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex, Version, H256};

pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

/// The parts of a beacon state needed to validate and verify aggregates.
///
/// Implementations are expected to be states at the target checkpoint of the attestation being
/// validated. Shuffling and state transitions are left to the implementor.
pub trait BeaconState: Send + Sync {
    fn slot(&self) -> Slot;

    fn genesis_validators_root(&self) -> H256;

    fn fork_version(&self, epoch: Epoch) -> Version;

    fn committee_count_per_slot(&self, slot: Slot) -> u64;

    fn beacon_committee(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Option<&[ValidatorIndex]>;

    fn public_key(&self, validator_index: ValidatorIndex) -> Option<&PublicKey>;
}

impl SszHash for u64 {
    fn hash_tree_root(&self) -> H256 {
        hashing::hash_tree_root_u64(*self)
    }
}

impl SszHash for H256 {
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszHash for bls::SignatureBytes {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize(&hashing::pack_bytes(self.as_bytes()), 2)
    }
}
