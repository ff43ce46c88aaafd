use core::{
    cmp::Reverse,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use bls::AggregateSignature;
use helper_functions::{accessors, misc};
use itertools::Itertools as _;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use prometheus_metrics::Metrics;
use types::{
    attestation_bits::{AttestationBits, CommitteeSizes, Error as AttestationBitsError},
    combined::Attestation,
    config::Config,
    phase0::{
        containers::AttestationData,
        primitives::{CommitteeIndex, Slot, H256},
    },
    traits::{BeaconState, SszHash as _},
};

use crate::attestation_agg_pool::{
    attestation_group::AttestationGroup,
    config::AttestationPoolConfig,
    types::{AttestationForkChecker, PooledAttestation, ProposalState},
};

#[derive(Default)]
struct Indices {
    groups: BTreeMap<H256, AttestationGroup>,
    // Data roots are registered under `AttestationData.slot`.
    data_roots_by_slot: BTreeMap<Slot, BTreeSet<H256>>,
}

/// Aggregated attestations indexed by data root and by slot.
///
/// All operations lock the whole pool.
pub struct Pool {
    chain_config: Arc<Config>,
    pool_config: AttestationPoolConfig,
    indices: Mutex<Indices>,
    // Number of distinct aggregation bit patterns in all groups.
    size: AtomicUsize,
    metrics: Option<Arc<Metrics>>,
}

impl Pool {
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        pool_config: AttestationPoolConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            chain_config,
            pool_config,
            indices: Mutex::default(),
            size: AtomicUsize::new(0),
            metrics,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Adds an attestation to the group for its data.
    ///
    /// `committee_sizes` must be provided for attestations that use `committee_bits`.
    /// Returns `false` if the attestation was not added,
    /// either because it could not be decoded or because the group already had its bits.
    pub fn add(&self, attestation: &Attestation, committee_sizes: Option<&CommitteeSizes>) -> bool {
        let data = attestation.data();

        if attestation.phase().uses_committee_bits() && committee_sizes.is_none() {
            debug!(
                "attestation at slot {} with target root {:?} has no committee sizes; \
                 not adding it to the pool",
                data.slot, data.target.root,
            );

            self.register_rejection();
            return false;
        }

        let signature = match AggregateSignature::try_from(attestation.signature()) {
            Ok(signature) => signature,
            Err(error) => {
                debug!("attestation at slot {} has an invalid signature: {error}", data.slot);
                self.register_rejection();
                return false;
            }
        };

        let data_root = data.hash_tree_root();
        let mut indices = self.indices.lock();

        // Malformed attestations must not register groups or slots.
        let bits = match indices.decode_bits(data_root, attestation, committee_sizes) {
            Ok(bits) => bits,
            Err(error) => {
                debug!("attestation at slot {} has malformed bits: {error}", data.slot);
                self.register_rejection();
                return false;
            }
        };

        let added = indices
            .group_mut(data, data_root, committee_sizes)
            .add(PooledAttestation::new(bits, signature));

        if added {
            self.increase_size(1);
        }

        // Keep the most recent slot even if it alone exceeds the limit.
        let mut evicted_slots = 0;

        while indices.data_roots_by_slot.len() > 1
            && self.size() > self.pool_config.max_attestation_count
        {
            trace!(
                "attestation pool size {} exceeds {}",
                self.size(),
                self.pool_config.max_attestation_count,
            );

            let Some(oldest_slot) = indices.data_roots_by_slot.keys().next().copied() else {
                break;
            };

            self.remove_prior_to(&mut indices, oldest_slot + 1);
            evicted_slots += 1;
        }

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.add_att_pool_evicted_slots(evicted_slots);
        }

        added
    }

    /// Drops attestations that are too old to be included in blocks.
    pub fn on_slot(&self, slot: Slot) {
        if slot <= self.pool_config.retention_slots {
            return;
        }

        let first_retained_slot = slot - self.pool_config.retention_slots;
        let mut indices = self.indices.lock();
        let pruned_groups = self.remove_prior_to(&mut indices, first_retained_slot);

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.add_att_pool_pruned_groups(pruned_groups);
        }
    }

    /// Selects aggregates for a block proposed at `state.slot()`.
    ///
    /// Newer slots come first. Within a slot, aggregates with more participants come first.
    /// Attestations from the previous epoch stop being selected once the state's capacity for
    /// them is used up, but attestations from the current epoch still are.
    pub fn attestations_for_block(
        &self,
        state: &impl ProposalState,
        fork_checker: &impl AttestationForkChecker,
    ) -> Vec<Attestation> {
        let block_slot = state.slot();
        let current_epoch = misc::compute_epoch_at_slot(&self.chain_config, block_slot);
        let phase = self.chain_config.phase_at_slot(block_slot);
        let requires_committee_bits = phase.uses_committee_bits();
        let max_attestations = self.chain_config.max_attestations_for(phase);
        let mut previous_epoch_capacity = state.previous_epoch_attestation_capacity();
        let mut attestations = vec![];

        let indices = self.indices.lock();

        'slots: for (_, data_roots) in indices.data_roots_by_slot.range(..block_slot).rev() {
            let mut candidates = data_roots
                .iter()
                .filter_map(|data_root| indices.groups.get(data_root))
                .filter(|group| state.is_valid_attestation_data(&group.data()))
                .filter(|group| fork_checker.are_from_correct_fork(group))
                .flat_map(|group| {
                    let data = group.data();

                    group
                        .aggregates(None, Some(requires_committee_bits))
                        .map(move |aggregate| (data, aggregate))
                })
                .collect_vec();

            // Stable to keep the order deterministic.
            candidates.sort_by_key(|(_, aggregate)| Reverse(aggregate.participant_count()));

            for (data, aggregate) in candidates {
                if attestations.len() >= max_attestations {
                    break 'slots;
                }

                if misc::compute_epoch_at_slot(&self.chain_config, data.slot) < current_epoch {
                    if previous_epoch_capacity == 0 {
                        continue;
                    }

                    previous_epoch_capacity -= 1;
                }

                match aggregate.into_attestation(data) {
                    Ok(attestation) => attestations.push(attestation),
                    Err(error) => {
                        warn!("failed to convert aggregate for slot {}: {error}", data.slot);
                    }
                }
            }
        }

        attestations
    }

    /// Aggregates matching the filters, newest slots first.
    ///
    /// Each group produces aggregates in the encoding of its own slot.
    pub fn attestations(
        &self,
        slot: Option<Slot>,
        committee_index: Option<CommitteeIndex>,
    ) -> Vec<Attestation> {
        let indices = self.indices.lock();

        indices
            .data_roots_by_slot
            .iter()
            .rev()
            .filter(|(data_slot, _)| slot.is_none_or(|wanted| **data_slot == wanted))
            .flat_map(|(_, data_roots)| data_roots)
            .filter_map(|data_root| indices.groups.get(data_root))
            .flat_map(|group| {
                let data = group.data();
                let requires_committee_bits = self.requires_committee_bits(data.slot);

                group
                    .aggregates(committee_index, Some(requires_committee_bits))
                    .filter_map(move |aggregate| aggregate.into_attestation(data).ok())
            })
            .collect()
    }

    /// The first aggregate built for the data with `data_root`.
    #[must_use]
    pub fn create_aggregate_for(
        &self,
        data_root: H256,
        committee_index: Option<CommitteeIndex>,
    ) -> Option<Attestation> {
        let indices = self.indices.lock();
        let group = indices.groups.get(&data_root)?;
        let data = group.data();
        let requires_committee_bits = self.requires_committee_bits(data.slot);

        group
            .aggregates(committee_index, Some(requires_committee_bits))
            .next()?
            .into_attestation(data)
            .ok()
    }

    /// Removes attestations whose validators have all been included in the block at `slot`.
    ///
    /// `state` must be able to provide committees for the slots of the included attestations.
    pub fn on_attestations_included_in_block<'attestation>(
        &self,
        state: &(impl BeaconState + ?Sized),
        slot: Slot,
        attestations: impl IntoIterator<Item = &'attestation Attestation>,
    ) {
        let mut indices = self.indices.lock();
        let mut removed = 0;

        for attestation in attestations {
            let data = attestation.data();

            let committee_sizes = if attestation.phase().uses_committee_bits() {
                match accessors::committee_sizes(state, data.slot) {
                    Ok(committee_sizes) => Some(committee_sizes),
                    Err(error) => {
                        debug!(
                            "no committee sizes for attestation at slot {} included in block at \
                             slot {slot}: {error:#}",
                            data.slot,
                        );
                        continue;
                    }
                }
            } else {
                None
            };

            let data_root = data.hash_tree_root();

            match indices.decode_bits(data_root, attestation, committee_sizes.as_ref()) {
                Ok(bits) => {
                    removed += indices
                        .group_mut(data, data_root, committee_sizes.as_ref())
                        .on_attestation_included_in_block(slot, &bits);
                }
                Err(error) => debug!(
                    "attestation at slot {} included in block at slot {slot} has malformed bits: \
                     {error}",
                    data.slot,
                ),
            }
        }

        self.decrease_size(removed);
    }

    pub fn on_reorg(&self, common_ancestor_slot: Slot) {
        for group in self.indices.lock().groups.values_mut() {
            group.on_reorg(common_ancestor_slot);
        }
    }

    /// Recomputes the size from the groups in case it has drifted.
    pub fn recount(&self) -> usize {
        let indices = self.indices.lock();
        let size = indices.groups.values().map(AttestationGroup::len).sum();

        self.size.store(size, Ordering::Release);
        self.update_size_metric(size);

        size
    }

    fn requires_committee_bits(&self, slot: Slot) -> bool {
        self.chain_config.phase_at_slot(slot).uses_committee_bits()
    }

    // Returns the number of removed groups.
    fn remove_prior_to(&self, indices: &mut Indices, first_retained_slot: Slot) -> usize {
        let retained = indices.data_roots_by_slot.split_off(&first_retained_slot);
        let stale = core::mem::replace(&mut indices.data_roots_by_slot, retained);

        let mut removed_groups = 0;
        let mut removed_attestations = 0;

        for data_root in stale.into_values().flatten() {
            if let Some(group) = indices.groups.remove(&data_root) {
                removed_groups += 1;
                removed_attestations += group.len();
            }
        }

        if removed_groups > 0 {
            trace!(
                "removed {removed_groups} attestation groups before slot {first_retained_slot}",
            );
        }

        self.decrease_size(removed_attestations);

        removed_groups
    }

    fn increase_size(&self, delta: usize) {
        let size = self.size.fetch_add(delta, Ordering::AcqRel) + delta;
        self.update_size_metric(size);
    }

    fn decrease_size(&self, delta: usize) {
        let size = self
            .size
            .fetch_sub(delta, Ordering::AcqRel)
            .saturating_sub(delta);

        self.update_size_metric(size);
    }

    fn update_size_metric(&self, size: usize) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_att_pool_size(size);
        }
    }

    fn register_rejection(&self) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.inc_att_pool_rejected_attestations();
        }
    }
}

impl Indices {
    // An existing group decodes with the committee sizes it was created with.
    fn decode_bits(
        &self,
        data_root: H256,
        attestation: &Attestation,
        committee_sizes: Option<&CommitteeSizes>,
    ) -> Result<AttestationBits, AttestationBitsError> {
        let committee_sizes = match self.groups.get(&data_root) {
            Some(group) => group.committee_sizes(),
            None => committee_sizes,
        };

        AttestationBits::from_attestation(attestation, committee_sizes)
    }

    fn group_mut(
        &mut self,
        data: AttestationData,
        data_root: H256,
        committee_sizes: Option<&CommitteeSizes>,
    ) -> &mut AttestationGroup {
        self.data_roots_by_slot
            .entry(data.slot)
            .or_default()
            .insert(data_root);

        self.groups
            .entry(data_root)
            .or_insert_with(|| AttestationGroup::new(data, committee_sizes.cloned()))
    }
}
