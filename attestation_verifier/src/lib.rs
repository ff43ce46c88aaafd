pub use crate::{
    checker::AttestationChecker,
    misc::{AggregateAndProofAction, CheckOutcome, IgnoreReason, RejectionReason},
    signature_verifier::{BatchVerification, BlsSignatureVerifier, SignatureVerifier},
    validator::{AggregateValidator, AggregateValidatorConfig},
};

mod checker;
mod misc;
mod seen_aggregates;
mod signature_verifier;
mod validator;
