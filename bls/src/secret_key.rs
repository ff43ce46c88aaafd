use blst::min_pk::SecretKey as RawSecretKey;

use crate::{consts::DOMAIN_SEPARATION_TAG, Error, PublicKey, Signature};

#[derive(derive_more::Debug)]
// Inspired by `DebugSecret` from the `secrecy` crate.
#[debug("[REDACTED]")]
pub struct SecretKey(RawSecretKey);

impl PartialEq for SecretKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_raw().to_bytes() == other.as_raw().to_bytes()
    }
}

impl Eq for SecretKey {}

impl TryFrom<[u8; 32]> for SecretKey {
    type Error = Error;

    #[inline]
    fn try_from(bytes: [u8; 32]) -> Result<Self, Self::Error> {
        RawSecretKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }
}

impl SecretKey {
    /// Derives a key from input keying material as in EIP-2333.
    ///
    /// `ikm` must be at least 32 bytes long.
    pub fn key_gen(ikm: &[u8]) -> Result<Self, Error> {
        RawSecretKey::key_gen(ikm, &[])
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }

    #[inline]
    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        self.as_raw().sk_to_pk().into()
    }

    #[inline]
    #[must_use]
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.as_raw()
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }

    const fn as_raw(&self) -> &RawSecretKey {
        &self.0
    }
}
