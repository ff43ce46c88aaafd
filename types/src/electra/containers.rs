use bls::{AggregateSignatureBytes, SignatureBytes};

use crate::{
    collections::{BitList, BitVector},
    phase0::{containers::AttestationData, primitives::ValidatorIndex},
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AggregateAndProof {
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: SignatureBytes,
}

/// `data.index` is always 0. Committees are identified by `committee_bits`.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Attestation {
    pub aggregation_bits: BitList,
    pub data: AttestationData,
    pub signature: AggregateSignatureBytes,
    pub committee_bits: BitVector,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: SignatureBytes,
}
