use bls::{SecretKey, Signature};
use types::{
    config::Config,
    electra::containers::AggregateAndProof as ElectraAggregateAndProof,
    phase0::{
        consts::{DOMAIN_AGGREGATE_AND_PROOF, DOMAIN_BEACON_ATTESTER, DOMAIN_SELECTION_PROOF},
        containers::{AggregateAndProof as Phase0AggregateAndProof, AttestationData},
        primitives::{DomainType, Epoch, Slot, H256},
    },
    traits::{BeaconState, SszHash},
};

use crate::{accessors, misc};

pub trait SignForSingleFork: SszHash {
    const DOMAIN_TYPE: DomainType;

    fn epoch(&self, config: &Config) -> Epoch;

    fn signing_root(&self, config: &Config, beacon_state: &(impl BeaconState + ?Sized)) -> H256 {
        let epoch = self.epoch(config);
        let domain = accessors::get_domain(beacon_state, Self::DOMAIN_TYPE, epoch);
        misc::compute_signing_root(self, domain)
    }

    fn sign(
        &self,
        config: &Config,
        beacon_state: &(impl BeaconState + ?Sized),
        secret_key: &SecretKey,
    ) -> Signature {
        secret_key.sign(self.signing_root(config, beacon_state))
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/validator.md#broadcast-aggregate>
impl SignForSingleFork for Phase0AggregateAndProof {
    const DOMAIN_TYPE: DomainType = DOMAIN_AGGREGATE_AND_PROOF;

    fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.aggregate.data.slot)
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.5.0/specs/electra/validator.md#construct-aggregate>
impl SignForSingleFork for ElectraAggregateAndProof {
    const DOMAIN_TYPE: DomainType = DOMAIN_AGGREGATE_AND_PROOF;

    fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, self.aggregate.data.slot)
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/validator.md#aggregate-signature>
impl SignForSingleFork for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;

    fn epoch(&self, _config: &Config) -> Epoch {
        self.target.epoch
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/validator.md#aggregation-selection>
impl SignForSingleFork for Slot {
    const DOMAIN_TYPE: DomainType = DOMAIN_SELECTION_PROOF;

    fn epoch(&self, config: &Config) -> Epoch {
        misc::compute_epoch_at_slot(config, *self)
    }
}
