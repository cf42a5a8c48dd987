#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) engine for Vaxholm.
//!
//! Reads bundles written by OpenSSL, NSS, Windows and Java: PKCS#12 v1 PBE
//! (3DES, RC2) and PBES2 (PBKDF2 with AES or 3DES) encryption, classic
//! PKCS#12 and PBMAC1 integrity MACs. Writes bundles under a [`Profile`],
//! by default PBES2 AES-256-CBC with PBKDF2-HMAC-SHA-256 and a PBMAC1
//! HMAC-SHA-256 MAC.
//!
//! The operations live in [`engine`]; [`Bundle`] is the decrypted model they
//! share.

pub mod algorithm;
pub mod bundle;
pub mod context;
pub mod engine;
pub mod mac;
pub mod pbe;
pub mod pfx;
pub mod profile;

pub use bundle::{Bag, BagContent, Bundle, Safe};
pub use context::Pkcs12Context;
pub use engine::{
    create_bundle, export_to_fips, extract_certificate, extract_private_key,
    extract_private_key_der, inspect, update_password, validate, BundleSummary,
};
pub use profile::{MacProfile, Profile};

#[cfg(test)]
pub(crate) mod test_util {
    pub fn fixture(name: &str) -> Vec<u8> {
        let path = format!("{}/../../test-data/p12/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
