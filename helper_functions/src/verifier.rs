#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use bls::{AggregatePublicKey, PublicKey, Signature, SignatureBytes};
use derive_more::Constructor;
use rayon::iter::{IntoParallelRefIterator as _, ParallelBridge as _, ParallelIterator as _};
use static_assertions::assert_not_impl_any;
use types::phase0::primitives::H256;

use crate::error::{Error, SignatureKind};

pub trait Verifier {
    fn extend(
        &mut self,
        triples: impl IntoIterator<Item = Triple>,
        signature_kind: SignatureKind,
    ) -> Result<()>;

    fn finish(&self) -> Result<()>;
}

/// Verifies triples as soon as they are added.
pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    #[inline]
    fn extend(
        &mut self,
        triples: impl IntoIterator<Item = Triple>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        for triple in triples {
            let Triple {
                message,
                signature_bytes,
                public_key,
            } = triple;

            let signature = Signature::try_from(signature_bytes)?;

            ensure!(
                signature.verify(message, &public_key),
                Error::SignatureInvalid(signature_kind),
            );
        }

        Ok(())
    }

    #[inline]
    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Collects triples and verifies them together in [`Verifier::finish`].
#[derive(Default)]
pub struct MultiVerifier {
    triples: Vec<Triple>,
}

impl Verifier for MultiVerifier {
    #[inline]
    fn extend(
        &mut self,
        triples: impl IntoIterator<Item = Triple>,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        self.triples.extend(triples);
        Ok(())
    }

    #[inline]
    fn finish(&self) -> Result<()> {
        if self.triples.is_empty() {
            return Ok(());
        }

        let messages = self.triples.iter().map(|triple| triple.message.as_bytes());

        let signatures = self
            .triples
            .par_iter()
            .map(|triple| triple.signature_bytes.try_into())
            .collect::<Result<Vec<_>, _>>()?;

        let public_keys = self.triples.iter().map(|triple| &triple.public_key);

        ensure!(
            Signature::multi_verify(messages, signatures.iter(), public_keys),
            Error::SignatureInvalid(SignatureKind::Multi),
        );

        Ok(())
    }
}

impl From<Vec<Triple>> for MultiVerifier {
    fn from(triples: Vec<Triple>) -> Self {
        Self { triples }
    }
}

#[derive(Clone, Default, Constructor)]
pub struct Triple {
    message: H256,
    signature_bytes: SignatureBytes,
    public_key: PublicKey,
}

// Implicit copying of `Triple`s makes it easy to verify a stale value after overwriting it.
assert_not_impl_any!(Triple: Copy);

impl Triple {
    /// Aggregates `public_keys` into a single key so that the triple can be batched.
    pub fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<IntoIter = impl Iterator<Item = &'keys PublicKey> + Send>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        // The `ParallelBridge::par_bridge` here outperforms "native" parallel iterators.
        let public_key = public_keys
            .into_iter()
            .par_bridge()
            .copied()
            .reduce_with(AggregatePublicKey::aggregate);

        let Some(public_key) = public_key else {
            return Err(Error::SignatureInvalid(signature_kind).into());
        };

        *self = Self::new(message, signature_bytes, public_key);

        Ok(())
    }
}
