use bls::{AggregateSignatureBytes, SignatureBytes};
use serde::{Deserialize, Serialize};

use crate::{
    collections::BitList,
    phase0::primitives::{CommitteeIndex, Domain, Epoch, Slot, ValidatorIndex, Version, H256},
};

// We use `SignatureBytes` to represent signatures in container types and only decompress them when
// verifying or aggregating them. Aggregates arriving over gossip may contain invalid points.

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AggregateAndProof {
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Attestation {
    pub aggregation_bits: BitList,
    pub data: AttestationData,
    pub signature: AggregateSignatureBytes,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ForkData {
    pub current_version: Version,
    pub genesis_validators_root: H256,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct SigningData {
    pub object_root: H256,
    pub domain: Domain,
}
