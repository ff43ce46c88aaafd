use core::{num::NonZeroU64, ops::Div as _};

use bls::SignatureBytes;
use tap::TryConv as _;
use types::phase0::consts::TARGET_AGGREGATORS_PER_COMMITTEE;

/// <https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/validator.md#aggregation-selection>
#[must_use]
pub fn is_aggregator(committee_length: usize, selection_proof: SignatureBytes) -> bool {
    let hash = hashing::hash_768(selection_proof);

    let mut dividend_bytes = [0; size_of::<u64>()];
    dividend_bytes.copy_from_slice(&hash[..size_of::<u64>()]);
    let dividend = u64::from_le_bytes(dividend_bytes);

    let modulo = committee_length
        .try_conv::<u64>()
        .unwrap_or(u64::MAX)
        .div(TARGET_AGGREGATORS_PER_COMMITTEE)
        .try_into()
        .unwrap_or(NonZeroU64::MIN);

    dividend % modulo == 0
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(15)]
    #[test_case(31)]
    fn every_member_of_small_committee_is_aggregator(committee_length: usize) {
        for byte in 0..=u8::MAX {
            assert!(is_aggregator(committee_length, SignatureBytes::repeat_byte(byte)));
        }
    }

    #[test]
    fn some_members_of_large_committee_are_not_aggregators() {
        let aggregator_count = (0..=u8::MAX)
            .filter(|byte| is_aggregator(2048, SignatureBytes::repeat_byte(*byte)))
            .count();

        assert!(aggregator_count < 256);
    }
}
