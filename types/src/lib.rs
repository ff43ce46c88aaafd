pub mod attestation_bits;
pub mod collections;
pub mod combined;
pub mod config;
pub mod nonstandard;
pub mod traits;

pub mod phase0 {
    pub mod consts;
    pub mod containers;
    pub mod primitives;

    mod container_impls;
}

pub mod electra {
    pub mod consts;
    pub mod containers;

    mod container_impls;
}
