use core::num::NonZeroU64;
use std::borrow::Cow;

use anyhow::Result;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::{
    nonstandard::Phase,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        primitives::{Epoch, Slot},
    },
};

/// Chain parameters used by the pool and the aggregate validator.
///
/// `slots_per_epoch` and the per-block attestation limits are preset values in `consensus-specs`.
/// They are kept here so that tests can use the minimal preset without type parameters.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants. It is intended to be deserialized from user input."
)]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,

    // Time parameters
    pub slots_per_epoch: NonZeroU64,

    // Forking
    pub electra_fork_epoch: Epoch,

    // Max operations per block
    pub max_attestations: usize,
    pub max_attestations_electra: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Config {
    #[must_use]
    pub const fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            slots_per_epoch: nonzero!(32_u64),
            electra_fork_epoch: 364_032,
            max_attestations: 128,
            max_attestations_electra: 8,
        }
    }

    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal"),
            slots_per_epoch: nonzero!(8_u64),
            electra_fork_epoch: FAR_FUTURE_EPOCH,
            max_attestations: 128,
            max_attestations_electra: 8,
        }
    }

    /// Minimal preset with Electra active from genesis.
    #[must_use]
    pub fn minimal_electra() -> Self {
        Self {
            config_name: Cow::Borrowed("minimal-electra"),
            electra_fork_epoch: 0,
            ..Self::minimal()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    #[must_use]
    pub const fn phase_at_epoch(&self, epoch: Epoch) -> Phase {
        if epoch >= self.electra_fork_epoch {
            Phase::Electra
        } else {
            Phase::Phase0
        }
    }

    #[must_use]
    pub const fn phase_at_slot(&self, slot: Slot) -> Phase {
        self.phase_at_epoch(slot / self.slots_per_epoch.get())
    }

    #[must_use]
    pub const fn max_attestations_for(&self, phase: Phase) -> usize {
        match phase {
            Phase::Phase0 => self.max_attestations,
            Phase::Electra => self.max_attestations_electra,
        }
    }
}
