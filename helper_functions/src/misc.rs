use types::{
    config::Config,
    phase0::{
        consts::GENESIS_EPOCH,
        containers::{ForkData, SigningData},
        primitives::{Domain, DomainType, Epoch, Slot, Version, H256},
    },
    traits::SszHash,
};

#[must_use]
pub const fn compute_epoch_at_slot(config: &Config, slot: Slot) -> Epoch {
    slot / config.slots_per_epoch.get()
}

#[must_use]
pub const fn compute_start_slot_at_epoch(config: &Config, epoch: Epoch) -> Slot {
    epoch.saturating_mul(config.slots_per_epoch.get())
}

#[must_use]
pub const fn previous_epoch(epoch: Epoch) -> Epoch {
    if epoch > GENESIS_EPOCH {
        epoch - 1
    } else {
        GENESIS_EPOCH
    }
}

// > Return the 32-byte fork data root for the ``current_version`` and ``genesis_validators_root``.
// > This is used primarily in signature domains to avoid collisions across forks/chains.
fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: Version,
    genesis_validators_root: H256,
) -> Domain {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use test_case::test_case;
    use types::phase0::{consts::DOMAIN_BEACON_ATTESTER, primitives::H32};

    use super::*;

    #[test_case(0 => 0)]
    #[test_case(31 => 0)]
    #[test_case(32 => 1)]
    #[test_case(65 => 2)]
    fn epoch_at_slot_on_mainnet(slot: Slot) -> Epoch {
        compute_epoch_at_slot(&Config::mainnet(), slot)
    }

    #[test_case(0 => 0)]
    #[test_case(3 => 24)]
    #[test_case(Epoch::MAX => Slot::MAX)]
    fn start_slot_on_minimal(epoch: Epoch) -> Slot {
        compute_start_slot_at_epoch(&Config::minimal(), epoch)
    }

    #[test_case(0 => 0)]
    #[test_case(1 => 0)]
    #[test_case(7 => 6)]
    fn previous_epoch_saturates_at_genesis(epoch: Epoch) -> Epoch {
        previous_epoch(epoch)
    }

    #[test]
    fn domain_starts_with_domain_type() {
        let version = H32(hex!("00000001"));
        let domain = compute_domain(DOMAIN_BEACON_ATTESTER, version, H256::repeat_byte(1));
        let fork_data_root = compute_fork_data_root(version, H256::repeat_byte(1));

        assert_eq!(domain[..4], DOMAIN_BEACON_ATTESTER[..]);
        assert_eq!(domain[4..], fork_data_root[..28]);
    }

    #[test]
    fn domain_depends_on_fork_version() {
        let genesis_validators_root = H256::zero();

        assert_ne!(
            compute_domain(DOMAIN_BEACON_ATTESTER, H32::zero(), genesis_validators_root),
            compute_domain(DOMAIN_BEACON_ATTESTER, H32::repeat_byte(1), genesis_validators_root),
        );
    }
}
