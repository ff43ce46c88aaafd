use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

pub const COMPRESSED_SIZE: usize = 96;

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct SignatureBytes(COMPRESSED_SIZE);
}

impl_fixed_hash_serde!(SignatureBytes, COMPRESSED_SIZE);

impl SignatureBytes {
    /// Compressed point at infinity.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.as_mut()[0] = 0xc0;
        bytes
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::empty()
    }
}
