use parse_display::Display;
use thiserror::Error;
use types::phase0::primitives::{CommitteeIndex, Slot, ValidatorIndex};

#[derive(Debug, Error)]
pub enum Error {
    #[error("committee {committee_index} at slot {slot} does not exist")]
    CommitteeIndexOutOfBounds {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
    #[error(
        "aggregation bitlist length {aggregation_bitlist_length} \
         does not match committee length {committee_length}"
    )]
    CommitteeLengthMismatch {
        aggregation_bitlist_length: usize,
        committee_length: usize,
    },
    #[error("validator {validator_index} has no public key in state")]
    PublicKeyNotFound { validator_index: ValidatorIndex },
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
}

#[derive(Debug, Display)]
pub enum SignatureKind {
    #[display("attestation signature")]
    Attestation,
    #[display("collection of multiple signatures")]
    Multi,
}
