/// Ciphersuite used by the proof of possession scheme in `consensus-specs`.
pub const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
