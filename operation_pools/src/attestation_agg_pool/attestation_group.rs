use std::collections::BTreeMap;

use types::{
    attestation_bits::{AttestationBits, CommitteeSizes},
    phase0::{
        containers::AttestationData,
        primitives::{CommitteeIndex, Slot},
    },
};

use crate::attestation_agg_pool::types::{Aggregate, PooledAttestation};

/// All distinct aggregation bit patterns seen for one `AttestationData`.
pub struct AttestationGroup {
    data: AttestationData,
    // Sizes from the first attestation added to the group.
    // Needed to split the bits of attestations that use `committee_bits`.
    committee_sizes: Option<CommitteeSizes>,
    // Sorted by participant count in descending order. Ties are kept in insertion order.
    attestations: Vec<PooledAttestation>,
    included_validators: AttestationBits,
    included_validators_by_slot: BTreeMap<Slot, AttestationBits>,
}

impl AttestationGroup {
    #[must_use]
    pub const fn new(data: AttestationData, committee_sizes: Option<CommitteeSizes>) -> Self {
        Self {
            data,
            committee_sizes,
            attestations: vec![],
            included_validators: AttestationBits::empty(false),
            included_validators_by_slot: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn data(&self) -> AttestationData {
        self.data
    }

    #[must_use]
    pub const fn committee_sizes(&self) -> Option<&CommitteeSizes> {
        self.committee_sizes.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }

    #[must_use]
    pub fn attestations(&self) -> &[PooledAttestation] {
        &self.attestations
    }

    /// Returns `false` if the group already contains the same bits
    /// or all of the validators have already been included in a block.
    pub fn add(&mut self, attestation: PooledAttestation) -> bool {
        if self.included_validators.is_superset_of(attestation.bits()) {
            return false;
        }

        if self
            .attestations
            .iter()
            .any(|existing| existing.bits() == attestation.bits())
        {
            return false;
        }

        let position = self.attestations.partition_point(|existing| {
            existing.participant_count() >= attestation.participant_count()
        });

        self.attestations.insert(position, attestation);

        true
    }

    /// Marks validators as included in the block at `slot`.
    ///
    /// Signatures cannot be split, so only attestations whose validators have all been included
    /// are removed. Returns the number of removed attestations.
    pub fn on_attestation_included_in_block(
        &mut self,
        slot: Slot,
        bits: &AttestationBits,
    ) -> usize {
        self.included_validators_by_slot
            .entry(slot)
            .or_insert_with(|| AttestationBits::empty(false))
            .union_with(bits);

        self.included_validators.union_with(bits);

        let included_validators = &self.included_validators;
        let length_before = self.attestations.len();

        self.attestations
            .retain(|attestation| !included_validators.is_superset_of(attestation.bits()));

        length_before - self.attestations.len()
    }

    /// Forgets inclusions in blocks after `common_ancestor_slot`.
    ///
    /// Attestations already removed because of those inclusions are not restored,
    /// but the same bits may be added again.
    pub fn on_reorg(&mut self, common_ancestor_slot: Slot) {
        let Some(first_abandoned_slot) = common_ancestor_slot.checked_add(1) else {
            return;
        };

        let abandoned = self
            .included_validators_by_slot
            .split_off(&first_abandoned_slot);

        if abandoned.is_empty() {
            return;
        }

        let mut included_validators = AttestationBits::empty(false);

        for bits in self.included_validators_by_slot.values() {
            included_validators.union_with(bits);
        }

        self.included_validators = included_validators;
    }

    /// Greedily combines attestations into aggregates with the most participants first.
    ///
    /// Each aggregate is built from non-overlapping attestations.
    /// Validators already included in blocks or in earlier aggregates do not start a new one.
    ///
    /// `committee_index` selects attestations covering exactly that one committee.
    /// `requires_committee_bits` selects attestations by encoding.
    pub fn aggregates(
        &self,
        committee_index: Option<CommitteeIndex>,
        requires_committee_bits: Option<bool>,
    ) -> Aggregates<'_> {
        let covered = self.included_validators.clone();

        let candidates = self
            .attestations
            .iter()
            .filter(|attestation| {
                committee_index.is_none_or(|index| attestation.bits().is_single_committee(index))
            })
            .filter(|attestation| {
                requires_committee_bits
                    .is_none_or(|required| attestation.bits().requires_committee_bits() == required)
            })
            .filter(|attestation| !covered.is_superset_of(attestation.bits()))
            .collect();

        Aggregates {
            candidates,
            covered,
        }
    }
}

pub struct Aggregates<'group> {
    candidates: Vec<&'group PooledAttestation>,
    covered: AttestationBits,
}

impl Iterator for Aggregates<'_> {
    type Item = Aggregate;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, rest) = self.candidates.split_first()?;
        let mut aggregate = Aggregate::from(*first);

        for candidate in rest {
            if !aggregate.bits.intersects(candidate.bits()) {
                aggregate.bits.union_with(candidate.bits());
                aggregate.signature.aggregate_in_place(candidate.signature());
            }
        }

        self.covered.union_with(&aggregate.bits);

        let covered = &self.covered;

        self.candidates
            .retain(|candidate| !covered.is_superset_of(candidate.bits()));

        Some(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use bitvec::{bitvec, order::Lsb0};
    use bls::AggregateSignature;
    use itertools::Itertools as _;
    use types::collections::BitList;

    use super::*;

    fn signature(validator_index: u64) -> AggregateSignature {
        interop::secret_key(validator_index).sign(b"attestation")
    }

    fn pooled(bits: BitList) -> PooledAttestation {
        PooledAttestation::new(AttestationBits::single(0, bits), signature(0))
    }

    fn bits_of(aggregates: Aggregates<'_>) -> Vec<BitList> {
        aggregates
            .map(|aggregate| aggregate.bits.committee(0).cloned().unwrap_or_default())
            .collect()
    }

    fn group() -> AttestationGroup {
        AttestationGroup::new(AttestationData::default(), None)
    }

    #[test]
    fn identical_bits_are_added_once() {
        let mut group = group();

        assert!(group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0])));
        assert!(!group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0])));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn subsets_are_retained_and_sorted_by_participant_count() {
        let mut group = group();

        assert!(group.add(pooled(bitvec![u8, Lsb0; 0, 1, 0, 0])));
        assert!(group.add(pooled(bitvec![u8, Lsb0; 1, 1, 1, 0])));
        assert!(group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0, 0])));
        assert!(group.add(pooled(bitvec![u8, Lsb0; 0, 0, 1, 1])));

        let counts = group
            .attestations()
            .iter()
            .map(PooledAttestation::participant_count)
            .collect_vec();

        assert_eq!(counts, [3, 2, 1, 1]);

        // Ties keep insertion order.
        assert_eq!(
            group.attestations()[2].bits().committee(0),
            Some(&bitvec![u8, Lsb0; 0, 1, 0, 0]),
        );
    }

    #[test]
    fn aggregates_combine_non_overlapping_attestations() {
        let mut group = group();

        group.add(pooled(bitvec![u8, Lsb0; 1, 1, 0, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 0, 1, 1, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 0, 0, 0, 1]));

        assert_eq!(
            bits_of(group.aggregates(None, None)),
            [bitvec![u8, Lsb0; 1, 1, 0, 1], bitvec![u8, Lsb0; 0, 1, 1, 0]],
        );
    }

    #[test]
    fn aggregates_skip_attestations_covered_by_earlier_aggregates() {
        let mut group = group();

        group.add(pooled(bitvec![u8, Lsb0; 1, 1, 1, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 0, 1, 1, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0, 0]));

        assert_eq!(
            bits_of(group.aggregates(None, None)),
            [bitvec![u8, Lsb0; 1, 1, 1, 0]],
        );
    }

    #[test]
    fn inclusion_removes_fully_covered_attestations() {
        let mut group = group();

        group.add(pooled(bitvec![u8, Lsb0; 1, 1, 0, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0, 0]));
        group.add(pooled(bitvec![u8, Lsb0; 0, 1, 1, 0]));

        let included = AttestationBits::single(0, bitvec![u8, Lsb0; 1, 1, 0, 0]);
        let removed = group.on_attestation_included_in_block(5, &included);

        assert_eq!(removed, 2);
        assert_eq!(group.len(), 1);

        // Partially covered attestations are still aggregated.
        assert_eq!(
            bits_of(group.aggregates(None, None)),
            [bitvec![u8, Lsb0; 0, 1, 1, 0]],
        );

        // Bits covered by a block are refused.
        assert!(!group.add(pooled(bitvec![u8, Lsb0; 0, 1, 0, 0])));
    }

    #[test]
    fn reorg_forgets_inclusions_after_common_ancestor() {
        let mut group = group();

        let early = AttestationBits::single(0, bitvec![u8, Lsb0; 1, 0, 0, 0]);
        let late = AttestationBits::single(0, bitvec![u8, Lsb0; 0, 1, 0, 0]);

        group.on_attestation_included_in_block(5, &early);
        group.on_attestation_included_in_block(7, &late);

        assert!(!group.add(pooled(bitvec![u8, Lsb0; 0, 1, 0, 0])));

        group.on_reorg(7);

        assert!(!group.add(pooled(bitvec![u8, Lsb0; 0, 1, 0, 0])));

        group.on_reorg(6);

        assert!(group.add(pooled(bitvec![u8, Lsb0; 0, 1, 0, 0])));
        assert!(!group.add(pooled(bitvec![u8, Lsb0; 1, 0, 0, 0])));
    }

    #[test]
    fn committee_filter_selects_single_committee_attestations() {
        let mut group = AttestationGroup::new(
            AttestationData::default(),
            Some(CommitteeSizes::from([(0, 2), (1, 2)])),
        );

        let mut both = AttestationBits::single(0, bitvec![u8, Lsb0; 1, 1]);
        both.union_with(&AttestationBits::single(1, bitvec![u8, Lsb0; 1, 0]));

        group.add(PooledAttestation::new(both, signature(1)));
        group.add(PooledAttestation::new(
            AttestationBits::single(1, bitvec![u8, Lsb0; 0, 1]),
            signature(2),
        ));

        let aggregates = group.aggregates(Some(1), None).collect_vec();

        assert_eq!(aggregates.len(), 1);
        assert!(aggregates[0].bits.is_single_committee(1));
        assert_eq!(group.aggregates(Some(0), None).count(), 0);
        assert_eq!(group.aggregates(None, None).count(), 1);
    }

    #[test]
    fn encoding_filter_selects_matching_attestations() {
        let mut group = group();

        group.add(pooled(bitvec![u8, Lsb0; 1, 0]));

        assert_eq!(group.aggregates(None, Some(false)).count(), 1);
        assert_eq!(group.aggregates(None, Some(true)).count(), 0);
    }
}
