#[derive(Clone, Copy, Debug)]
pub struct AttestationPoolConfig {
    /// Soft limit on the number of distinct aggregation bit patterns in the pool.
    ///
    /// The pool evicts whole slots starting from the oldest one until it is back under the limit,
    /// but it never evicts the most recent slot.
    pub max_attestation_count: usize,
    /// Number of slots attestations are kept for after their own slot.
    pub retention_slots: u64,
}

impl Default for AttestationPoolConfig {
    fn default() -> Self {
        Self {
            max_attestation_count: 187_500,
            retention_slots: 64,
        }
    }
}
