use hex_literal::hex;

use crate::phase0::primitives::{DomainType, Epoch, Slot, H32};

pub const ATTESTATION_PROPAGATION_SLOT_RANGE: u64 = 32;

pub const DOMAIN_BEACON_ATTESTER: DomainType = H32(hex!("01000000"));
pub const DOMAIN_SELECTION_PROOF: DomainType = H32(hex!("05000000"));
pub const DOMAIN_AGGREGATE_AND_PROOF: DomainType = H32(hex!("06000000"));

pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;
pub const TARGET_AGGREGATORS_PER_COMMITTEE: u64 = 16;
