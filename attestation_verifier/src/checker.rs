use core::future::Future;

use types::{combined::Attestation, phase0::primitives::SubnetId, traits::BeaconState};

use crate::misc::CheckOutcome;

/// Checks shared by unaggregated and aggregated attestations.
///
/// Implementations check the attestation against the clock, resolve its target state and check
/// that its committee exists. Only a successful check yields the state used for the rest of the
/// aggregate validation.
pub trait AttestationChecker: Send + Sync {
    type State: BeaconState + 'static;

    fn check(
        &self,
        attestation: &Attestation,
        subnet_id: Option<SubnetId>,
    ) -> impl Future<Output = CheckOutcome<Self::State>> + Send;
}
