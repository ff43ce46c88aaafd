use std::sync::Arc;

use anyhow::Result;
use log::debug;
use prometheus_metrics::Metrics;
use types::{
    attestation_bits::CommitteeSizes, combined::Attestation, phase0::primitives::Slot,
    traits::BeaconState,
};

use crate::{
    attestation_agg_pool::{
        pool::Pool,
        types::{AttestationForkChecker, ProposalState},
    },
    misc::PoolTask,
};

pub struct InsertAttestationTask {
    pub pool: Arc<Pool>,
    pub attestation: Attestation,
    pub committee_sizes: Option<CommitteeSizes>,
    pub metrics: Option<Arc<Metrics>>,
}

impl PoolTask for InsertAttestationTask {
    type Output = bool;

    fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            attestation,
            committee_sizes,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.att_pool_insert_attestation_task_times.start_timer());

        Ok(pool.add(&attestation, committee_sizes.as_ref()))
    }
}

pub struct BlockAttestationsTask<S, F> {
    pub pool: Arc<Pool>,
    pub state: Arc<S>,
    pub fork_checker: F,
    pub metrics: Option<Arc<Metrics>>,
}

impl<S, F> PoolTask for BlockAttestationsTask<S, F>
where
    S: ProposalState + Send + Sync + 'static,
    F: AttestationForkChecker + Send + 'static,
{
    type Output = Vec<Attestation>;

    fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            state,
            fork_checker,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.att_pool_pack_proposable_attestation_task_times.start_timer());

        let attestations = pool.attestations_for_block(state.as_ref(), &fork_checker);

        debug!(
            "selected {} attestations for block at slot {}",
            attestations.len(),
            state.slot(),
        );

        Ok(attestations)
    }
}

pub struct AttestationsIncludedInBlockTask<S> {
    pub pool: Arc<Pool>,
    pub state: Arc<S>,
    pub slot: Slot,
    pub attestations: Vec<Attestation>,
}

impl<S: BeaconState + 'static> PoolTask for AttestationsIncludedInBlockTask<S> {
    type Output = ();

    fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            state,
            slot,
            attestations,
        } = self;

        pool.on_attestations_included_in_block(state.as_ref(), slot, &attestations);

        Ok(())
    }
}
