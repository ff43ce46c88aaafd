pub use crate::{
    error::Error,
    public_key::PublicKey,
    public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey,
    signature::Signature,
    signature_bytes::SignatureBytes,
};

pub type AggregatePublicKey = PublicKey;
pub type AggregateSignature = Signature;
pub type AggregateSignatureBytes = SignatureBytes;

pub mod consts;

mod error;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;
