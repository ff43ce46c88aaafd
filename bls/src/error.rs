use blst::BLST_ERROR;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("decompression failed: {0:?}")]
    DecompressionFailed(BLST_ERROR),
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("no public keys to aggregate")]
    NoPublicKeysToAggregate,
}

impl From<BLST_ERROR> for Error {
    fn from(error: BLST_ERROR) -> Self {
        Self::DecompressionFailed(error)
    }
}
