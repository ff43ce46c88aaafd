use std::sync::Arc;

use anyhow::{Context as _, Result};
use attestation_verifier::{
    AggregateAndProofAction, AggregateValidator, AggregateValidatorConfig, AttestationChecker,
    SignatureVerifier,
};
use log::warn;
use prometheus_metrics::Metrics;
use types::{
    attestation_bits::CommitteeSizes,
    combined::{Attestation, SignedAggregateAndProof},
    config::Config,
    phase0::primitives::{CommitteeIndex, Slot, SubnetId, H256},
    traits::BeaconState,
};

use crate::{
    attestation_agg_pool::{
        config::AttestationPoolConfig,
        pool::Pool,
        tasks::{AttestationsIncludedInBlockTask, BlockAttestationsTask, InsertAttestationTask},
        types::{AttestationForkChecker, ProposalState},
    },
    misc::PoolTask,
};

/// Validates aggregates received over gossip and keeps the accepted ones for block proposals.
pub struct Manager<C, V> {
    validator: AggregateValidator<C, V>,
    pool: Arc<Pool>,
    metrics: Option<Arc<Metrics>>,
}

impl<C: AttestationChecker, V: SignatureVerifier> Manager<C, V> {
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        pool_config: AttestationPoolConfig,
        validator_config: AggregateValidatorConfig,
        checker: C,
        signature_verifier: V,
        metrics: Option<Arc<Metrics>>,
    ) -> Arc<Self> {
        let pool = Pool::new(Arc::clone(&chain_config), pool_config, metrics.clone());

        let validator = AggregateValidator::new(
            chain_config,
            validator_config,
            checker,
            signature_verifier,
            metrics.clone(),
        );

        Arc::new(Self {
            validator,
            pool: Arc::new(pool),
            metrics,
        })
    }

    #[must_use]
    pub const fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    #[must_use]
    pub const fn validator(&self) -> &AggregateValidator<C, V> {
        &self.validator
    }

    pub fn on_slot(&self, slot: Slot) {
        self.validator.on_slot(slot);
        self.pool.on_slot(slot);
    }

    /// Validates an aggregate received over gossip and adds it to the pool if it is accepted.
    pub async fn on_aggregate_and_proof(
        &self,
        aggregate_and_proof: Arc<SignedAggregateAndProof>,
        subnet_id: Option<SubnetId>,
    ) -> AggregateAndProofAction {
        let action = self.validator.validate(aggregate_and_proof, subnet_id).await;

        if let AggregateAndProofAction::Accept {
            aggregate_and_proof,
            committee_sizes,
            ..
        } = &action
        {
            let result = self
                .insert_attestation(aggregate_and_proof.aggregate(), committee_sizes.clone())
                .await;

            if let Err(error) = result {
                warn!("failed to insert accepted aggregate into pool: {error:?}");
            }
        }

        action
    }

    /// Adds an attestation that has already been validated, such as one from a local validator.
    pub async fn insert_attestation(
        &self,
        attestation: Attestation,
        committee_sizes: Option<CommitteeSizes>,
    ) -> Result<bool> {
        self.spawn_task(InsertAttestationTask {
            pool: Arc::clone(&self.pool),
            attestation,
            committee_sizes,
            metrics: self.metrics.clone(),
        })
        .await
    }

    pub async fn attestations_for_block<S, F>(
        &self,
        state: Arc<S>,
        fork_checker: F,
    ) -> Result<Vec<Attestation>>
    where
        S: ProposalState + Send + Sync + 'static,
        F: AttestationForkChecker + Send + 'static,
    {
        self.spawn_task(BlockAttestationsTask {
            pool: Arc::clone(&self.pool),
            state,
            fork_checker,
            metrics: self.metrics.clone(),
        })
        .await
    }

    /// Processes the attestations of a block imported at `slot`.
    pub async fn on_attestations_included_in_block<S: BeaconState + 'static>(
        &self,
        state: Arc<S>,
        slot: Slot,
        attestations: Vec<Attestation>,
    ) -> Result<()> {
        self.spawn_task(AttestationsIncludedInBlockTask {
            pool: Arc::clone(&self.pool),
            state,
            slot,
            attestations,
        })
        .await
    }

    pub fn on_reorg(&self, common_ancestor_slot: Slot) {
        self.pool.on_reorg(common_ancestor_slot);
    }

    #[must_use]
    pub fn attestations(
        &self,
        slot: Option<Slot>,
        committee_index: Option<CommitteeIndex>,
    ) -> Vec<Attestation> {
        self.pool.attestations(slot, committee_index)
    }

    #[must_use]
    pub fn create_aggregate_for(
        &self,
        data_root: H256,
        committee_index: Option<CommitteeIndex>,
    ) -> Option<Attestation> {
        self.pool.create_aggregate_for(data_root, committee_index)
    }

    async fn spawn_task<T: PoolTask>(&self, task: T) -> Result<T::Output> {
        tokio::task::spawn_blocking(move || task.run())
            .await
            .context("attestation aggregation pool task failed")?
    }
}

#[cfg(test)]
mod tests {
    use attestation_verifier::{BlsSignatureVerifier, CheckOutcome, IgnoreReason};
    use interop::InteropState;
    use nonzero_ext::nonzero;
    use types::{
        phase0::containers::{AttestationData, Checkpoint},
        traits::SszHash as _,
    };

    use crate::attestation_agg_pool::attestation_group::AttestationGroup;

    use super::*;

    const SLOT: Slot = 1;

    struct AcceptingChecker(Arc<InteropState>);

    impl AttestationChecker for AcceptingChecker {
        type State = InteropState;

        async fn check(
            &self,
            _attestation: &Attestation,
            _subnet_id: Option<SubnetId>,
        ) -> CheckOutcome<InteropState> {
            CheckOutcome::Accept(Arc::clone(&self.0))
        }
    }

    struct TestState {
        slot: Slot,
    }

    impl ProposalState for TestState {
        fn slot(&self) -> Slot {
            self.slot
        }

        fn is_valid_attestation_data(&self, _data: &AttestationData) -> bool {
            true
        }

        fn previous_epoch_attestation_capacity(&self) -> usize {
            usize::MAX
        }
    }

    struct Context {
        config: Arc<Config>,
        state: Arc<InteropState>,
        manager: Arc<Manager<AcceptingChecker, BlsSignatureVerifier>>,
    }

    impl Context {
        fn new(config: Config) -> Self {
            let config = Arc::new(config);

            let state = Arc::new(InteropState::new(
                &config,
                SLOT,
                nonzero!(64_u64),
                nonzero!(2_u64),
            ));

            let manager = Manager::new(
                Arc::clone(&config),
                AttestationPoolConfig::default(),
                AggregateValidatorConfig::default(),
                AcceptingChecker(Arc::clone(&state)),
                BlsSignatureVerifier::default(),
                None,
            );

            Self {
                config,
                state,
                manager,
            }
        }

        fn data(&self) -> AttestationData {
            AttestationData {
                slot: SLOT,
                index: 0,
                beacon_block_root: H256::repeat_byte(1),
                source: Checkpoint::default(),
                target: Checkpoint {
                    epoch: 0,
                    root: H256::repeat_byte(2),
                },
            }
        }

        fn aggregate(
            &self,
            committee_index: CommitteeIndex,
            positions: &[usize],
        ) -> Result<Attestation> {
            interop::attestation(
                &self.config,
                &self.state,
                self.data(),
                committee_index,
                positions,
            )
        }

        fn signed(
            &self,
            committee_index: CommitteeIndex,
            positions: &[usize],
            aggregator_position: usize,
        ) -> Result<Arc<SignedAggregateAndProof>> {
            let aggregate = self.aggregate(committee_index, positions)?;
            let committee =
                helper_functions::accessors::beacon_committee(&*self.state, SLOT, committee_index)?;

            Ok(Arc::new(interop::signed_aggregate_and_proof(
                &self.config,
                &self.state,
                aggregate,
                committee[aggregator_position],
            )))
        }
    }

    fn any_fork(_group: &AttestationGroup) -> bool {
        true
    }

    #[tokio::test]
    async fn accepted_aggregates_are_added_to_pool() -> Result<()> {
        let context = Context::new(Config::minimal());
        let manager = &context.manager;

        let first = manager.on_aggregate_and_proof(context.signed(0, &[0, 1], 0)?, None).await;
        let duplicate = manager.on_aggregate_and_proof(context.signed(0, &[0, 1], 0)?, None).await;
        let other = manager.on_aggregate_and_proof(context.signed(0, &[2], 2)?, None).await;

        assert!(first.is_accept());
        assert!(matches!(
            duplicate,
            AggregateAndProofAction::Ignore(IgnoreReason::DuplicateAggregate),
        ));
        assert!(other.is_accept());
        assert_eq!(manager.pool().size(), 2);

        let attestations = manager
            .attestations_for_block(Arc::new(TestState { slot: SLOT + 1 }), any_fork)
            .await?;

        assert_eq!(attestations.len(), 1);
        assert_eq!(attestations[0].aggregation_bits().count_ones(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn electra_aggregates_are_added_with_committee_sizes() -> Result<()> {
        let context = Context::new(Config::minimal_electra());
        let manager = &context.manager;

        let action = manager.on_aggregate_and_proof(context.signed(1, &[0, 3], 0)?, None).await;

        assert!(action.is_accept());
        assert_eq!(manager.pool().size(), 1);

        let attestations = manager.attestations(Some(SLOT), Some(1));

        assert_eq!(attestations.len(), 1);
        assert_eq!(attestations[0].committee_indices(), [1]);

        Ok(())
    }

    #[tokio::test]
    async fn block_inclusion_and_slot_ticks_clear_pool() -> Result<()> {
        let context = Context::new(Config::minimal());
        let manager = &context.manager;

        let included = context.aggregate(0, &[0, 1])?;

        assert!(manager.insert_attestation(included.clone(), None).await?);
        assert!(manager.insert_attestation(context.aggregate(0, &[2])?, None).await?);

        manager
            .on_attestations_included_in_block(Arc::clone(&context.state), SLOT + 1, vec![included])
            .await?;

        assert_eq!(manager.pool().size(), 1);

        manager.on_slot(SLOT + 64 + 1);

        assert_eq!(manager.pool().size(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn create_aggregate_for_uses_data_root() -> Result<()> {
        let context = Context::new(Config::minimal());
        let manager = &context.manager;

        manager.insert_attestation(context.aggregate(0, &[0])?, None).await?;
        manager.insert_attestation(context.aggregate(0, &[3])?, None).await?;

        let aggregate = manager
            .create_aggregate_for(context.data().hash_tree_root(), Some(0))
            .map(|attestation| attestation.aggregation_bits().count_ones());

        assert_eq!(aggregate, Some(2));

        Ok(())
    }
}
