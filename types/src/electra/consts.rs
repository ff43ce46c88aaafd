use crate::phase0::consts::MAX_VALIDATORS_PER_COMMITTEE;

pub const MAX_COMMITTEES_PER_SLOT: usize = 64;
pub const MAX_ATTESTERS_PER_SLOT: usize = MAX_VALIDATORS_PER_COMMITTEE * MAX_COMMITTEES_PER_SLOT;
