use ethereum_types::H256;
use hex_literal::hex;
use sha2::{Digest as _, Sha256};

pub const BYTES_PER_CHUNK: usize = 32;

/// Roots of empty subtrees of increasing depth.
///
/// The deepest tree hashed in this workspace is the post-Electra aggregation bitlist,
/// which needs depth 9.
#[rustfmt::skip]
pub const ZERO_HASHES: [H256; 12] = [
    H256(hex!("0000000000000000000000000000000000000000000000000000000000000000")),
    H256(hex!("f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b")),
    H256(hex!("db56114e00fdd4c1f85c892bf35ac9a89289aaecb1ebd0a96cde606a748b5d71")),
    H256(hex!("c78009fdf07fc56a11f122370658a353aaa542ed63e44c4bc15ff4cd105ab33c")),
    H256(hex!("536d98837f2dd165a55d5eeae91485954472d56f246df256bf3cae19352a123c")),
    H256(hex!("9efde052aa15429fae05bad4d0b1d7c64da64d03d7a1854a588c2cb8430c0d30")),
    H256(hex!("d88ddfeed400a8755596b21942c1497e114c302e6118290f91e6772976041fa1")),
    H256(hex!("87eb0ddba57e35f6d286673802a4af5975e22506c7cf4c64bb6be5ee11527f2c")),
    H256(hex!("26846476fd5fc54a5d43385167c95144f2643f533cc85bb9d16b782f8d7db193")),
    H256(hex!("506d86582d252405b840018792cad2bf1259f1ef5aa5f887e13cb2f0094f51e1")),
    H256(hex!("ffff0ad7e659772f9534c195c815efc4014ef1e1daed4404c06385d11192e92b")),
    H256(hex!("6cf04127db05441cd833107a52be852868890e4317e6a02ab47683aa75964220")),
];

#[inline]
#[must_use]
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes.as_ref()).into())
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    H256(hasher.finalize().into())
}

// This function is only ever called with `SignatureBytes`,
// but that can't be the type of the parameter due to a circular dependency.
#[inline]
#[must_use]
pub fn hash_768(bytes: impl AsRef<[u8; 96]>) -> H256 {
    hash_bytes(bytes.as_ref())
}

#[inline]
#[must_use]
pub fn hash_tree_root_u64(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Splits `bytes` into zero-padded 32 byte chunks.
#[must_use]
pub fn pack_bytes(bytes: &[u8]) -> Vec<H256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut padded = H256::zero();
            padded[..chunk.len()].copy_from_slice(chunk);
            padded
        })
        .collect()
}

/// Computes the root of a tree of the given depth with `chunks` as its leftmost leaves.
///
/// Missing leaves are treated as zero chunks.
/// `chunks` must not contain more than `2 ** depth` elements.
#[must_use]
pub fn merkleize(chunks: &[H256], depth: usize) -> H256 {
    debug_assert!(chunks.len() <= 1 << depth);

    let mut layer = chunks.to_vec();

    for zero_hash in ZERO_HASHES.iter().take(depth) {
        if layer.is_empty() {
            return ZERO_HASHES[depth];
        }

        if layer.len() % 2 == 1 {
            layer.push(*zero_hash);
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_256_256(pair[0], pair[1]))
            .collect();
    }

    layer.first().copied().unwrap_or(ZERO_HASHES[depth])
}

#[inline]
#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    hash_256_256(root, hash_tree_root_u64(length as u64))
}

/// Depth of the smallest tree that can hold `chunk_count` leaves.
#[must_use]
pub const fn depth_for(chunk_count: usize) -> usize {
    chunk_count.next_power_of_two().trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use test_case::test_case;

    use super::*;

    #[test]
    fn higher_zero_hashes_are_calculated_from_lower_ones() {
        for (lower, higher) in ZERO_HASHES.into_iter().tuple_windows() {
            assert_eq!(hash_256_256(lower, lower), higher);
        }
    }

    #[test]
    fn merkleize_of_empty_list_is_zero_hash_at_depth() {
        assert_eq!(merkleize(&[], 0), ZERO_HASHES[0]);
        assert_eq!(merkleize(&[], 3), ZERO_HASHES[3]);
    }

    #[test]
    fn merkleize_of_single_chunk_at_depth_0_is_the_chunk() {
        let chunk = H256::repeat_byte(7);
        assert_eq!(merkleize(&[chunk], 0), chunk);
    }

    #[test]
    fn merkleize_pads_with_zero_chunks() {
        let a = H256::repeat_byte(1);
        let b = H256::repeat_byte(2);
        let c = H256::repeat_byte(3);

        let expected = hash_256_256(hash_256_256(a, b), hash_256_256(c, H256::zero()));

        assert_eq!(merkleize(&[a, b, c], 2), expected);
        assert_eq!(merkleize(&[a, b, c, H256::zero()], 2), expected);
    }

    #[test]
    fn hash_768_matches_sha256_of_bytes() {
        let bytes = [0xab; 96];
        assert_eq!(hash_768(bytes), hash_bytes(bytes));
    }

    #[test_case(0 => 0)]
    #[test_case(1 => 0)]
    #[test_case(2 => 1)]
    #[test_case(3 => 2)]
    #[test_case(8 => 3)]
    #[test_case(512 => 9)]
    fn depth_for_rounds_up_to_power_of_two(chunk_count: usize) -> usize {
        depth_for(chunk_count)
    }

    #[test]
    fn pack_bytes_pads_last_chunk() {
        let chunks = pack_bytes(&[1; 40]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], H256::repeat_byte(1));
        assert_eq!(chunks[1][..8], [1; 8]);
        assert_eq!(chunks[1][8..], [0; 24]);
    }
}
