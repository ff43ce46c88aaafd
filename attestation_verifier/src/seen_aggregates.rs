use core::num::NonZeroUsize;
use std::collections::BTreeSet;

use itertools::Itertools as _;
use lru::LruCache;
use parking_lot::Mutex;
use types::{
    collections::BitList,
    phase0::primitives::{CommitteeIndex, Slot, ValidatorIndex, H256},
};

use crate::misc::IgnoreReason;

type AttestingIndices = BTreeSet<ValidatorIndex>;

// Attesting indices of accepted aggregates, keyed by slot, vote and committee.
// Sets covered by a newer aggregate are dropped, so every retained set has at least 1 validator
// no other retained set has.
type SupersetKey = (Slot, H256, CommitteeIndex);

/// Aggregates recently accepted over gossip.
///
/// Every cache is bounded on its own. Evicting an entry only weakens duplicate suppression.
pub struct SeenAggregates {
    inner: Mutex<Inner>,
}

struct Inner {
    aggregators: LruCache<(Slot, ValidatorIndex), BitList>,
    content_roots: LruCache<H256, Slot>,
    supersets: LruCache<SupersetKey, Vec<AttestingIndices>>,
}

/// An aggregate about to be checked against or recorded in [`SeenAggregates`].
pub struct SeenAggregate<'aggregate> {
    pub slot: Slot,
    pub aggregator_index: ValidatorIndex,
    pub content_root: H256,
    pub data_root: H256,
    pub committee_index: CommitteeIndex,
    pub aggregation_bits: &'aggregate BitList,
    pub attesting_indices: &'aggregate AttestingIndices,
}

impl SeenAggregates {
    #[must_use]
    pub fn new(
        aggregators_capacity: NonZeroUsize,
        content_roots_capacity: NonZeroUsize,
        supersets_capacity: NonZeroUsize,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                aggregators: LruCache::new(aggregators_capacity),
                content_roots: LruCache::new(content_roots_capacity),
                supersets: LruCache::new(supersets_capacity),
            }),
        }
    }

    /// Checks that do not need the attesting indices.
    pub fn check_seen(
        &self,
        slot: Slot,
        aggregator_index: ValidatorIndex,
        content_root: H256,
    ) -> Result<(), IgnoreReason> {
        self.inner.lock().check_seen(slot, aggregator_index, content_root)
    }

    /// Whether a recorded aggregate for the same slot, vote and committee covers every validator in
    /// `attesting_indices`.
    #[must_use]
    pub fn is_redundant(
        &self,
        slot: Slot,
        data_root: H256,
        committee_index: CommitteeIndex,
        attesting_indices: &AttestingIndices,
    ) -> bool {
        self.inner
            .lock()
            .is_redundant((slot, data_root, committee_index), attesting_indices)
    }

    /// Records an aggregate that passed validation.
    ///
    /// The checks are repeated under the lock so that only 1 of several concurrent validations of
    /// the same aggregate gets accepted. Validations of different aggregates covering each other
    /// can still race.
    pub fn record_if_unseen(&self, aggregate: &SeenAggregate) -> Result<(), IgnoreReason> {
        let mut inner = self.inner.lock();

        inner.check_seen(
            aggregate.slot,
            aggregate.aggregator_index,
            aggregate.content_root,
        )?;

        inner.record(aggregate);

        Ok(())
    }

    /// Records an aggregate unconditionally.
    pub fn record(&self, aggregate: &SeenAggregate) {
        self.inner.lock().record(aggregate);
    }

    /// Removes entries for slots before `slot`.
    pub fn prune(&self, slot: Slot) {
        let mut inner = self.inner.lock();

        let stale_aggregators = inner
            .aggregators
            .iter()
            .map(|(key, _)| *key)
            .filter(|(aggregate_slot, _)| *aggregate_slot < slot)
            .collect_vec();

        for key in stale_aggregators {
            inner.aggregators.pop(&key);
        }

        let stale_content_roots = inner
            .content_roots
            .iter()
            .filter(|(_, aggregate_slot)| **aggregate_slot < slot)
            .map(|(content_root, _)| *content_root)
            .collect_vec();

        for content_root in stale_content_roots {
            inner.content_roots.pop(&content_root);
        }

        let stale_supersets = inner
            .supersets
            .iter()
            .map(|(key, _)| *key)
            .filter(|(aggregate_slot, _, _)| *aggregate_slot < slot)
            .collect_vec();

        for key in stale_supersets {
            inner.supersets.pop(&key);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.aggregators.len() + inner.content_roots.len() + inner.supersets.len()
    }
}

impl Inner {
    fn check_seen(
        &mut self,
        slot: Slot,
        aggregator_index: ValidatorIndex,
        content_root: H256,
    ) -> Result<(), IgnoreReason> {
        if self.content_roots.contains(&content_root) {
            return Err(IgnoreReason::DuplicateAggregate);
        }

        if self.aggregators.contains(&(slot, aggregator_index)) {
            return Err(IgnoreReason::AggregatorAlreadySeen);
        }

        Ok(())
    }

    fn is_redundant(&mut self, key: SupersetKey, attesting_indices: &AttestingIndices) -> bool {
        self.supersets.get(&key).is_some_and(|existing_sets| {
            existing_sets
                .iter()
                .any(|existing| existing.is_superset(attesting_indices))
        })
    }

    fn record(&mut self, aggregate: &SeenAggregate) {
        let SeenAggregate {
            slot,
            aggregator_index,
            content_root,
            data_root,
            committee_index,
            aggregation_bits,
            attesting_indices,
        } = *aggregate;

        self.content_roots.put(content_root, slot);

        match self.aggregators.get_mut(&(slot, aggregator_index)) {
            Some(best) if best.count_ones() >= aggregation_bits.count_ones() => {}
            Some(best) => best.clone_from(aggregation_bits),
            None => {
                self.aggregators
                    .put((slot, aggregator_index), aggregation_bits.clone());
            }
        }

        let existing_sets = self
            .supersets
            .get_or_insert_mut((slot, data_root, committee_index), Vec::new);

        if existing_sets
            .iter()
            .any(|existing| existing.is_superset(attesting_indices))
        {
            return;
        }

        existing_sets.retain(|existing| !existing.is_subset(attesting_indices));
        existing_sets.push(attesting_indices.clone());
    }
}

#[cfg(test)]
mod tests {
    use bitvec::{bitvec, order::Lsb0};
    use nonzero_ext::nonzero;

    use super::*;

    fn seen_aggregates() -> SeenAggregates {
        SeenAggregates::new(nonzero!(4_usize), nonzero!(4_usize), nonzero!(4_usize))
    }

    fn record(
        seen_aggregates: &SeenAggregates,
        slot: Slot,
        aggregator_index: ValidatorIndex,
        content_byte: u8,
        attesting_indices: &AttestingIndices,
    ) -> Result<(), IgnoreReason> {
        let aggregation_bits = bitvec![u8, Lsb0; 1; attesting_indices.len()];

        seen_aggregates.record_if_unseen(&SeenAggregate {
            slot,
            aggregator_index,
            content_root: H256::repeat_byte(content_byte),
            data_root: H256::zero(),
            committee_index: 0,
            aggregation_bits: &aggregation_bits,
            attesting_indices,
        })
    }

    #[test]
    fn duplicate_content_is_reported_before_aggregator() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();

        record(&seen_aggregates, 1, 7, 1, &BTreeSet::from([1]))?;

        assert_eq!(
            seen_aggregates.check_seen(1, 7, H256::repeat_byte(1)),
            Err(IgnoreReason::DuplicateAggregate),
        );

        assert_eq!(
            seen_aggregates.check_seen(1, 7, H256::repeat_byte(2)),
            Err(IgnoreReason::AggregatorAlreadySeen),
        );

        assert_eq!(seen_aggregates.check_seen(2, 7, H256::repeat_byte(2)), Ok(()));

        Ok(())
    }

    #[test]
    fn recording_twice_is_refused() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();
        let indices = BTreeSet::from([1, 2]);

        record(&seen_aggregates, 1, 7, 1, &indices)?;

        assert_eq!(
            record(&seen_aggregates, 1, 7, 1, &indices),
            Err(IgnoreReason::DuplicateAggregate),
        );

        Ok(())
    }

    #[test]
    fn subsets_of_recorded_sets_are_redundant() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();

        record(&seen_aggregates, 1, 7, 1, &BTreeSet::from([1, 2, 3]))?;

        assert!(seen_aggregates.is_redundant(1, H256::zero(), 0, &BTreeSet::from([1, 3])));
        assert!(seen_aggregates.is_redundant(1, H256::zero(), 0, &BTreeSet::from([1, 2, 3])));
        assert!(!seen_aggregates.is_redundant(1, H256::zero(), 0, &BTreeSet::from([3, 4])));
        assert!(!seen_aggregates.is_redundant(1, H256::zero(), 1, &BTreeSet::from([1])));
        assert!(!seen_aggregates.is_redundant(2, H256::zero(), 0, &BTreeSet::from([1])));

        Ok(())
    }

    #[test]
    fn recording_superset_replaces_subsets() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();

        record(&seen_aggregates, 1, 7, 1, &BTreeSet::from([1]))?;
        record(&seen_aggregates, 1, 8, 2, &BTreeSet::from([2]))?;
        record(&seen_aggregates, 1, 9, 3, &BTreeSet::from([1, 2, 3]))?;

        let inner = seen_aggregates.inner.lock();
        let existing_sets = inner.supersets.peek(&(1, H256::zero(), 0));

        assert_eq!(existing_sets, Some(&vec![BTreeSet::from([1, 2, 3])]));

        Ok(())
    }

    #[test]
    fn caches_stay_bounded() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();

        for slot in 0..32 {
            record(&seen_aggregates, slot, slot, slot as u8, &BTreeSet::from([slot]))?;
        }

        assert!(seen_aggregates.len() <= 12);

        Ok(())
    }

    #[test]
    fn prune_removes_older_slots() -> Result<(), IgnoreReason> {
        let seen_aggregates = seen_aggregates();

        record(&seen_aggregates, 1, 7, 1, &BTreeSet::from([1]))?;
        record(&seen_aggregates, 2, 7, 2, &BTreeSet::from([1]))?;

        seen_aggregates.prune(2);

        assert_eq!(seen_aggregates.len(), 3);
        assert_eq!(seen_aggregates.check_seen(1, 7, H256::repeat_byte(1)), Ok(()));
        assert!(!seen_aggregates.is_redundant(1, H256::zero(), 0, &BTreeSet::from([1])));
        assert!(seen_aggregates.is_redundant(2, H256::zero(), 0, &BTreeSet::from([1])));

        Ok(())
    }
}
