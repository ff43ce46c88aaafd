use crate::{
    collections,
    electra::{
        consts::{MAX_ATTESTERS_PER_SLOT, MAX_COMMITTEES_PER_SLOT},
        containers::{AggregateAndProof, Attestation},
    },
    phase0::primitives::H256,
    traits::SszHash,
};

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        let chunks = [
            collections::bit_list_root(&self.aggregation_bits, MAX_ATTESTERS_PER_SLOT),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
            collections::bit_vector_root(&self.committee_bits, MAX_COMMITTEES_PER_SLOT),
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
