use core::num::NonZeroUsize;
use std::{collections::BTreeSet, sync::Arc};

use anyhow::Result;
use helper_functions::{
    accessors,
    error::SignatureKind,
    predicates,
    signing::SignForSingleFork as _,
    verifier::Triple,
};
use log::{debug, trace};
use nonzero_ext::nonzero;
use prometheus_metrics::Metrics;
use types::{
    combined::{Attestation, SignedAggregateAndProof},
    config::Config,
    nonstandard::Phase,
    phase0::{
        consts::ATTESTATION_PROPAGATION_SLOT_RANGE,
        primitives::{Slot, SubnetId, ValidatorIndex},
    },
    traits::{BeaconState, SszHash as _},
};

use crate::{
    checker::AttestationChecker,
    misc::{AggregateAndProofAction, CheckOutcome, IgnoreReason, RejectionReason},
    seen_aggregates::{SeenAggregate, SeenAggregates},
    signature_verifier::{BatchVerification, SignatureVerifier},
};

// Positions of signatures in the batch built by `AggregateValidator::signature_triples`.
const SELECTION_PROOF_INDEX: usize = 0;
const AGGREGATE_AND_PROOF_INDEX: usize = 1;

#[derive(Clone, Copy, Debug)]
pub struct AggregateValidatorConfig {
    pub seen_aggregators_capacity: NonZeroUsize,
    pub seen_content_roots_capacity: NonZeroUsize,
    pub seen_supersets_capacity: NonZeroUsize,
}

impl Default for AggregateValidatorConfig {
    fn default() -> Self {
        Self {
            seen_aggregators_capacity: nonzero!(16_384_usize),
            seen_content_roots_capacity: nonzero!(16_384_usize),
            seen_supersets_capacity: nonzero!(4096_usize),
        }
    }
}

pub struct AggregateValidator<C, V> {
    chain_config: Arc<Config>,
    checker: C,
    signature_verifier: V,
    seen_aggregates: SeenAggregates,
    metrics: Option<Arc<Metrics>>,
}

impl<C: AttestationChecker, V: SignatureVerifier> AggregateValidator<C, V> {
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        validator_config: AggregateValidatorConfig,
        checker: C,
        signature_verifier: V,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let AggregateValidatorConfig {
            seen_aggregators_capacity,
            seen_content_roots_capacity,
            seen_supersets_capacity,
        } = validator_config;

        Self {
            chain_config,
            checker,
            signature_verifier,
            seen_aggregates: SeenAggregates::new(
                seen_aggregators_capacity,
                seen_content_roots_capacity,
                seen_supersets_capacity,
            ),
            metrics,
        }
    }

    /// Validates an aggregate received over gossip.
    ///
    /// Accepted aggregates are recorded so that later duplicates and subsets are ignored.
    pub async fn validate(
        &self,
        aggregate_and_proof: Arc<SignedAggregateAndProof>,
        subnet_id: Option<SubnetId>,
    ) -> AggregateAndProofAction {
        let phase = aggregate_and_proof.phase();

        let timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.aggregate_validation_times, phase.as_ref())
        });

        let aggregator_index = aggregate_and_proof.aggregator_index();
        let slot = aggregate_and_proof.slot();
        let action = self.validate_internal(aggregate_and_proof, subnet_id).await;

        prometheus_metrics::stop_and_record(timer);

        match &action {
            AggregateAndProofAction::Accept {
                attesting_indices, ..
            } => trace!(
                "accepted aggregate from validator {aggregator_index} at slot {slot} \
                 with {} attesters",
                attesting_indices.len(),
            ),
            AggregateAndProofAction::Ignore(reason) => trace!(
                "ignored aggregate from validator {aggregator_index} at slot {slot}: {reason}",
            ),
            AggregateAndProofAction::Reject(reason) => debug!(
                "rejected aggregate from validator {aggregator_index} at slot {slot}: {reason}",
            ),
            AggregateAndProofAction::SaveForFuture => {
                trace!("delaying aggregate from validator {aggregator_index} at slot {slot}")
            }
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.register_aggregate_validation_outcome(&[action.outcome()]);

            if matches!(action, AggregateAndProofAction::Ignore(IgnoreReason::Redundant)) {
                metrics.received_aggregated_attestation_subsets.inc();
            }
        }

        action
    }

    /// Records an aggregate accepted without going through [`Self::validate`].
    pub fn add_seen_aggregate(
        &self,
        aggregate_and_proof: &SignedAggregateAndProof,
        attesting_indices: &BTreeSet<ValidatorIndex>,
    ) {
        let aggregate = aggregate_and_proof.aggregate();

        self.seen_aggregates
            .record(&seen_aggregate(aggregate_and_proof, &aggregate, attesting_indices));
    }

    /// Forgets aggregates that can no longer be propagated at `current_slot`.
    pub fn on_slot(&self, current_slot: Slot) {
        self.seen_aggregates
            .prune(current_slot.saturating_sub(ATTESTATION_PROPAGATION_SLOT_RANGE));
    }

    async fn validate_internal(
        &self,
        aggregate_and_proof: Arc<SignedAggregateAndProof>,
        subnet_id: Option<SubnetId>,
    ) -> AggregateAndProofAction {
        let aggregate = aggregate_and_proof.aggregate();

        let state = match self.checker.check(&aggregate, subnet_id).await {
            CheckOutcome::Accept(state) => state,
            CheckOutcome::Reject(error) => {
                return AggregateAndProofAction::Reject(RejectionReason::Checker(error))
            }
            CheckOutcome::Ignore => return AggregateAndProofAction::Ignore(IgnoreReason::Checker),
            CheckOutcome::SaveForFuture => return AggregateAndProofAction::SaveForFuture,
            CheckOutcome::NoCapacity => {
                return AggregateAndProofAction::Ignore(IgnoreReason::NoCapacity)
            }
        };

        // > The attestation has participants
        if aggregate.aggregation_bits().not_any() {
            return AggregateAndProofAction::Reject(RejectionReason::NoParticipants);
        }

        if aggregate.committee_indices().len() != 1 {
            return AggregateAndProofAction::Reject(RejectionReason::NotSingleCommittee);
        }

        let slot = aggregate.data().slot;
        let aggregator_index = aggregate_and_proof.aggregator_index();

        if let Err(reason) =
            self.seen_aggregates
                .check_seen(slot, aggregator_index, aggregate.content_root())
        {
            return AggregateAndProofAction::Ignore(reason);
        }

        let attesting_indices = match accessors::get_attesting_indices(&*state, &aggregate) {
            Ok(attesting_indices) => attesting_indices,
            Err(error) => {
                return AggregateAndProofAction::Reject(RejectionReason::InvalidAggregationBits(
                    error,
                ))
            }
        };

        // > The valid aggregate attestation defined by `hash_tree_root(aggregate.data)` whose
        // > `aggregation_bits` is a non-strict superset has not already been seen.
        if self.seen_aggregates.is_redundant(
            slot,
            aggregate.data().hash_tree_root(),
            aggregate.committee_index(),
            &attesting_indices,
        ) {
            return AggregateAndProofAction::Ignore(IgnoreReason::Redundant);
        }

        if let Err(reason) = validate_aggregator(&*state, &aggregate_and_proof, &aggregate) {
            return AggregateAndProofAction::Reject(reason);
        }

        let triples = match self.signature_triples(
            &*state,
            &aggregate_and_proof,
            &aggregate,
            &attesting_indices,
        ) {
            Ok(triples) => triples,
            Err(error) => {
                return AggregateAndProofAction::Reject(
                    RejectionReason::SignatureVerificationFailed(error),
                )
            }
        };

        let reason = match self.signature_verifier.verify_batch(triples).await {
            Ok(BatchVerification::Valid) => None,
            Ok(BatchVerification::Invalid {
                index: SELECTION_PROOF_INDEX,
            }) => Some(RejectionReason::SelectionProofInvalid),
            Ok(BatchVerification::Invalid {
                index: AGGREGATE_AND_PROOF_INDEX,
            }) => Some(RejectionReason::AggregateAndProofSignatureInvalid),
            Ok(BatchVerification::Invalid { .. }) => {
                Some(RejectionReason::AggregateSignatureInvalid)
            }
            Err(error) => Some(RejectionReason::SignatureVerificationFailed(error)),
        };

        if let Some(reason) = reason {
            return AggregateAndProofAction::Reject(reason);
        }

        // The pool needs committee sizes to split post-Electra aggregation bits.
        let committee_sizes = match aggregate.phase() {
            Phase::Phase0 => None,
            Phase::Electra => match accessors::committee_sizes(&*state, slot) {
                Ok(committee_sizes) => Some(committee_sizes),
                Err(error) => {
                    return AggregateAndProofAction::Reject(
                        RejectionReason::InvalidAggregationBits(error),
                    )
                }
            },
        };

        let seen = seen_aggregate(&aggregate_and_proof, &aggregate, &attesting_indices);

        if let Err(reason) = self.seen_aggregates.record_if_unseen(&seen) {
            return AggregateAndProofAction::Ignore(reason);
        }

        AggregateAndProofAction::Accept {
            aggregate_and_proof,
            attesting_indices,
            committee_sizes,
        }
    }

    fn signature_triples(
        &self,
        state: &C::State,
        aggregate_and_proof: &SignedAggregateAndProof,
        aggregate: &Attestation,
        attesting_indices: &BTreeSet<ValidatorIndex>,
    ) -> Result<Vec<Triple>> {
        let config = self.chain_config.as_ref();
        let public_key = accessors::public_key(state, aggregate_and_proof.aggregator_index())?;

        // > The `aggregate_and_proof.selection_proof` is a valid signature of the
        // > `aggregate.data.slot` by the validator with index
        // > `aggregate_and_proof.aggregator_index`.
        let selection_proof = Triple::new(
            aggregate.data().slot.signing_root(config, state),
            aggregate_and_proof.selection_proof(),
            *public_key,
        );

        // > The aggregator signature, `signed_aggregate_and_proof.signature`, is valid.
        let message_signing_root = match aggregate_and_proof {
            SignedAggregateAndProof::Phase0(signed) => signed.message.signing_root(config, state),
            SignedAggregateAndProof::Electra(signed) => signed.message.signing_root(config, state),
        };

        let message = Triple::new(
            message_signing_root,
            aggregate_and_proof.signature(),
            *public_key,
        );

        // > The signature of `aggregate` is valid.
        let public_keys = attesting_indices
            .iter()
            .map(|validator_index| accessors::public_key(state, *validator_index))
            .collect::<Result<Vec<_>>>()?;

        let mut attestation = Triple::default();

        attestation.verify_aggregate(
            aggregate.data().signing_root(config, state),
            aggregate.signature(),
            public_keys.iter().copied(),
            SignatureKind::Attestation,
        )?;

        Ok(vec![selection_proof, message, attestation])
    }
}

fn validate_aggregator(
    state: &(impl BeaconState + ?Sized),
    aggregate_and_proof: &SignedAggregateAndProof,
    aggregate: &Attestation,
) -> Result<(), RejectionReason> {
    let committee = accessors::beacon_committee(
        state,
        aggregate.data().slot,
        aggregate.committee_index(),
    )
    .map_err(RejectionReason::InvalidAggregationBits)?;

    // > The aggregator's validator index is within the committee
    if !committee.contains(&aggregate_and_proof.aggregator_index()) {
        return Err(RejectionReason::AggregatorNotInCommittee);
    }

    // > `aggregate_and_proof.selection_proof` selects the validator as an aggregator for the slot
    if !predicates::is_aggregator(committee.len(), aggregate_and_proof.selection_proof()) {
        return Err(RejectionReason::NotAggregator);
    }

    Ok(())
}

fn seen_aggregate<'aggregate>(
    aggregate_and_proof: &SignedAggregateAndProof,
    aggregate: &'aggregate Attestation,
    attesting_indices: &'aggregate BTreeSet<ValidatorIndex>,
) -> SeenAggregate<'aggregate> {
    let data = aggregate.data();

    SeenAggregate {
        slot: data.slot,
        aggregator_index: aggregate_and_proof.aggregator_index(),
        content_root: aggregate.content_root(),
        data_root: data.hash_tree_root(),
        committee_index: aggregate.committee_index(),
        aggregation_bits: aggregate.aggregation_bits(),
        attesting_indices,
    }
}
