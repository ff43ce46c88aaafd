use core::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use helper_functions::{
    error::SignatureKind,
    verifier::{MultiVerifier, SingleVerifier, Triple, Verifier as _},
};
use log::debug;
use prometheus_metrics::Metrics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BatchVerification {
    Valid,
    /// The triple at `index` is the first one with an invalid signature.
    Invalid { index: usize },
}

pub trait SignatureVerifier: Send + Sync {
    fn verify_batch(
        &self,
        triples: Vec<Triple>,
    ) -> impl Future<Output = Result<BatchVerification>> + Send;
}

/// Verifies batches on the blocking thread pool.
///
/// A batch is verified with a single multi-verification first.
/// Triples are only verified one by one if that fails.
#[derive(Default)]
pub struct BlsSignatureVerifier {
    metrics: Option<Arc<Metrics>>,
}

impl BlsSignatureVerifier {
    #[must_use]
    pub const fn new(metrics: Option<Arc<Metrics>>) -> Self {
        Self { metrics }
    }
}

impl SignatureVerifier for BlsSignatureVerifier {
    async fn verify_batch(&self, triples: Vec<Triple>) -> Result<BatchVerification> {
        let metrics = self.metrics.clone();

        tokio::task::spawn_blocking(move || {
            let _timer = metrics.as_ref().map(|metrics| {
                metrics
                    .attestation_verifier_verify_agg_batch_signature_times
                    .start_timer()
            });

            verify_batch_blocking(triples)
        })
        .await?
    }
}

fn verify_batch_blocking(triples: Vec<Triple>) -> Result<BatchVerification> {
    let verifier = MultiVerifier::from(triples.clone());

    let Err(batch_error) = verifier.finish() else {
        return Ok(BatchVerification::Valid);
    };

    debug!("batch signature verification failed, verifying signatures one by one: {batch_error}");

    for (index, triple) in triples.into_iter().enumerate() {
        if SingleVerifier
            .extend(core::iter::once(triple), SignatureKind::Multi)
            .is_err()
        {
            return Ok(BatchVerification::Invalid { index });
        }
    }

    bail!("batch signature verification failed but every signature is valid: {batch_error}")
}

#[cfg(test)]
mod tests {
    use bls::SecretKey;
    use types::phase0::primitives::H256;

    use super::*;

    fn triple(signer: &SecretKey, public_key_owner: &SecretKey, message: H256) -> Triple {
        Triple::new(
            message,
            signer.sign(message).into(),
            public_key_owner.to_public_key(),
        )
    }

    fn secret_key(byte: u8) -> SecretKey {
        SecretKey::key_gen(&[byte; 32]).expect("input key material is long enough")
    }

    #[tokio::test]
    async fn valid_batch_is_valid() -> Result<()> {
        let first = secret_key(1);
        let second = secret_key(2);

        let triples = vec![
            triple(&first, &first, H256::repeat_byte(1)),
            triple(&second, &second, H256::repeat_byte(2)),
        ];

        let verification = BlsSignatureVerifier::default()
            .verify_batch(triples)
            .await?;

        assert_eq!(verification, BatchVerification::Valid);

        Ok(())
    }

    #[tokio::test]
    async fn invalid_triple_is_identified() -> Result<()> {
        let first = secret_key(1);
        let second = secret_key(2);

        let triples = vec![
            triple(&first, &first, H256::repeat_byte(1)),
            triple(&first, &second, H256::repeat_byte(2)),
            triple(&second, &second, H256::repeat_byte(3)),
        ];

        let verification = BlsSignatureVerifier::default()
            .verify_batch(triples)
            .await?;

        assert_eq!(verification, BatchVerification::Invalid { index: 1 });

        Ok(())
    }

    #[tokio::test]
    async fn undecodable_signature_is_invalid() -> Result<()> {
        let first = secret_key(1);

        let triples = vec![
            triple(&first, &first, H256::repeat_byte(1)),
            Triple::new(H256::zero(), bls::SignatureBytes::zero(), first.to_public_key()),
        ];

        let verification = BlsSignatureVerifier::default()
            .verify_batch(triples)
            .await?;

        assert_eq!(verification, BatchVerification::Invalid { index: 1 });

        Ok(())
    }
}
