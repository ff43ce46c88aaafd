use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    AsRefStr,
    Display,
    EnumString,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    Phase0,
    Electra,
}

impl Phase {
    /// Whether attestations of this phase identify committees with `committee_bits`.
    #[must_use]
    pub const fn uses_committee_bits(self) -> bool {
        matches!(self, Self::Electra)
    }
}
