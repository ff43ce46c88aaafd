use anyhow::Result;
use log::warn;
use prometheus::{
    histogram_opts, opts, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

#[derive(Debug)]
pub struct Metrics {
    // Attestation aggregation pool
    att_pool_size: IntGauge,
    att_pool_evicted_slots: IntCounter,
    att_pool_pruned_groups: IntCounter,
    att_pool_rejected_attestations: IntCounter,
    pub att_pool_insert_attestation_task_times: Histogram,
    pub att_pool_pack_proposable_attestation_task_times: Histogram,

    // Aggregate validation
    aggregate_validation_outcomes: IntCounterVec,
    pub aggregate_validation_times: HistogramVec,
    pub received_aggregated_attestation_subsets: IntCounter,
    pub attestation_verifier_verify_agg_batch_signature_times: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Attestation aggregation pool
            att_pool_size: IntGauge::new(
                "ATT_POOL_SIZE",
                "Number of distinct aggregation bit patterns retained in the attestation pool",
            )?,

            att_pool_evicted_slots: IntCounter::new(
                "ATT_POOL_EVICTED_SLOTS",
                "Number of slots evicted from the attestation pool because it was over capacity",
            )?,

            att_pool_pruned_groups: IntCounter::new(
                "ATT_POOL_PRUNED_GROUPS",
                "Number of attestation groups pruned from the attestation pool on slot ticks",
            )?,

            att_pool_rejected_attestations: IntCounter::new(
                "ATT_POOL_REJECTED_ATTESTATIONS",
                "Number of attestations the attestation pool refused to add",
            )?,

            att_pool_insert_attestation_task_times: Histogram::with_opts(histogram_opts!(
                "ATT_POOL_INSERT_ATTESTATION_TASK_TIMES",
                "Attestation pool insert attestation task times",
            ))?,

            att_pool_pack_proposable_attestation_task_times: Histogram::with_opts(histogram_opts!(
                "ATT_POOL_PACK_PROPOSABLE_ATTESTATION_TASK_TIMES",
                "Attestation pool pack proposable attestation task times",
            ))?,

            // Aggregate validation
            aggregate_validation_outcomes: IntCounterVec::new(
                opts!(
                    "AGGREGATE_VALIDATION_OUTCOMES",
                    "Number of aggregates received over gossip by validation outcome",
                ),
                &["outcome"],
            )?,

            aggregate_validation_times: HistogramVec::new(
                histogram_opts!(
                    "AGGREGATE_VALIDATION_TIMES",
                    "Aggregate and proof validation times",
                ),
                &["phase"],
            )?,

            received_aggregated_attestation_subsets: IntCounter::new(
                "RECEIVED_AGGREGATED_ATTESTATION_SUBSETS",
                "Number of received aggregated attestations that are subsets of already known aggregates"
            )?,

            attestation_verifier_verify_agg_batch_signature_times: Histogram::with_opts(
                histogram_opts!(
                    "ATTESTATION_VERIFIER_VERIFY_AGG_BATCH_SIGNATURE_TIMES",
                    "Attestation verifier aggregate batch signature verification times",
                ),
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.att_pool_size.clone()))?;
        default_registry.register(Box::new(self.att_pool_evicted_slots.clone()))?;
        default_registry.register(Box::new(self.att_pool_pruned_groups.clone()))?;
        default_registry.register(Box::new(self.att_pool_rejected_attestations.clone()))?;
        default_registry.register(Box::new(
            self.att_pool_insert_attestation_task_times.clone(),
        ))?;
        default_registry.register(Box::new(
            self.att_pool_pack_proposable_attestation_task_times.clone(),
        ))?;
        default_registry.register(Box::new(self.aggregate_validation_outcomes.clone()))?;
        default_registry.register(Box::new(self.aggregate_validation_times.clone()))?;
        default_registry.register(Box::new(
            self.received_aggregated_attestation_subsets.clone(),
        ))?;
        default_registry.register(Box::new(
            self.attestation_verifier_verify_agg_batch_signature_times
                .clone(),
        ))?;

        Ok(())
    }

    // Attestation aggregation pool
    pub fn set_att_pool_size(&self, size: usize) {
        self.att_pool_size.set(size.try_into().unwrap_or(i64::MAX));
    }

    pub fn add_att_pool_evicted_slots(&self, count: usize) {
        self.att_pool_evicted_slots.inc_by(count as u64);
    }

    pub fn add_att_pool_pruned_groups(&self, count: usize) {
        self.att_pool_pruned_groups.inc_by(count as u64);
    }

    pub fn inc_att_pool_rejected_attestations(&self) {
        self.att_pool_rejected_attestations.inc();
    }

    // Aggregate validation
    pub fn register_aggregate_validation_outcome(&self, labels: &[&str]) {
        match self
            .aggregate_validation_outcomes
            .get_metric_with_label_values(labels)
        {
            Ok(counter) => counter.inc(),
            Err(error) => {
                warn!("unable to register aggregate validation outcome for {labels:?}: {error:?}")
            }
        }
    }

    #[must_use]
    pub fn aggregate_validation_outcome_count(&self, outcome: &str) -> u64 {
        self.aggregate_validation_outcomes
            .get_metric_with_label_values(&[outcome])
            .map(|counter| counter.get())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn att_pool_size(&self) -> i64 {
        self.att_pool_size.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_counted_per_label() -> Result<()> {
        let metrics = Metrics::new()?;

        metrics.register_aggregate_validation_outcome(&["accept"]);
        metrics.register_aggregate_validation_outcome(&["accept"]);
        metrics.register_aggregate_validation_outcome(&["ignore"]);

        assert_eq!(metrics.aggregate_validation_outcome_count("accept"), 2);
        assert_eq!(metrics.aggregate_validation_outcome_count("ignore"), 1);
        assert_eq!(metrics.aggregate_validation_outcome_count("reject"), 0);

        Ok(())
    }

    #[test]
    fn wrong_label_count_is_not_fatal() -> Result<()> {
        let metrics = Metrics::new()?;

        metrics.register_aggregate_validation_outcome(&["accept", "extra"]);

        assert_eq!(metrics.aggregate_validation_outcome_count("accept"), 0);

        Ok(())
    }

    #[test]
    fn pool_size_gauge_tracks_latest_value() -> Result<()> {
        let metrics = Metrics::new()?;

        metrics.set_att_pool_size(5);
        metrics.set_att_pool_size(3);

        assert_eq!(metrics.att_pool_size(), 3);

        Ok(())
    }
}
