pub use crate::attestation_agg_pool::{
    Aggregate, Aggregates, AttestationForkChecker, AttestationGroup, AttestationPoolConfig,
    Manager as AttestationAggPool, Pool as AttestationPool, PooledAttestation, ProposalState,
};

mod attestation_agg_pool {
    pub use attestation_group::{Aggregates, AttestationGroup};
    pub use config::AttestationPoolConfig;
    pub use manager::Manager;
    pub use pool::Pool;
    pub use self::types::{Aggregate, AttestationForkChecker, PooledAttestation, ProposalState};

    mod attestation_group;
    mod config;
    mod manager;
    mod pool;
    mod tasks;
    mod types;
}

mod misc;
