use bitvec::{order::Lsb0, vec::BitVec};

use crate::phase0::primitives::H256;

/// Bits are stored in the same order SSZ packs them.
pub type BitList = BitVec<u8, Lsb0>;

// There is no separate type for `Bitvector` because its length is only checked when encoding.
pub type BitVector = BitList;

/// `hash_tree_root` of an SSZ `Bitlist[limit]`.
#[must_use]
pub fn bit_list_root(bits: &BitList, limit: usize) -> H256 {
    let chunk_limit = limit.div_ceil(256);
    let chunks = hashing::pack_bytes(&packed_bytes(bits));
    let root = hashing::merkleize(&chunks, hashing::depth_for(chunk_limit));
    hashing::mix_in_length(root, bits.len())
}

/// `hash_tree_root` of an SSZ `Bitvector[length]`.
#[must_use]
pub fn bit_vector_root(bits: &BitVector, length: usize) -> H256 {
    let chunks = hashing::pack_bytes(&packed_bytes(bits));
    hashing::merkleize(&chunks, hashing::depth_for(length.div_ceil(256)))
}

// Bits past the end of a `BitVec` are not guaranteed to be zero, so they are packed by hand.
fn packed_bytes(bits: &BitList) -> Vec<u8> {
    let mut bytes = vec![0; bits.len().div_ceil(8)];

    for index in bits.iter_ones() {
        bytes[index / 8] |= 1 << (index % 8);
    }

    bytes
}
