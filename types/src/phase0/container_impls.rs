use crate::{
    collections,
    phase0::{
        consts::MAX_VALIDATORS_PER_COMMITTEE,
        containers::{
            AggregateAndProof, Attestation, AttestationData, Checkpoint, ForkData, SigningData,
        },
        primitives::{Version, H256},
    },
    traits::SszHash,
};

impl SszHash for Checkpoint {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize(&[self.epoch.hash_tree_root(), self.root], 1)
    }
}

impl SszHash for AttestationData {
    fn hash_tree_root(&self) -> H256 {
        let chunks = [
            self.slot.hash_tree_root(),
            self.index.hash_tree_root(),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ];

        hashing::merkleize(&chunks, 3)
    }
}

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        let chunks = [
            collections::bit_list_root(&self.aggregation_bits, MAX_VALIDATORS_PER_COMMITTEE),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ];

        hashing::merkleize(&chunks, 2)
    }
}

impl SszHash for AggregateAndProof {
    fn hash_tree_root(&self) -> H256 {
        let chunks = [
            self.aggregator_index.hash_tree_root(),
            self.aggregate.hash_tree_root(),
            self.selection_proof.hash_tree_root(),
        ];

        hashing::merkleize(&chunks, 2)
    }
}

impl SszHash for ForkData {
    fn hash_tree_root(&self) -> H256 {
        let mut version_root = H256::zero();
        version_root[..Version::len_bytes()].copy_from_slice(self.current_version.as_bytes());
        hashing::merkleize(&[version_root, self.genesis_validators_root], 1)
    }
}

impl SszHash for SigningData {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize(&[self.object_root, self.domain], 1)
    }
}
