#![forbid(unsafe_code)]

//! Vaxholm: a pure Rust PKCS#12 credential bundle engine.
//!
//! [`helper`] is the flat contract: every function takes optional inputs and
//! returns `bool` or `Option<Vec<u8>>`, never an error. The crates below it
//! carry the detailed [`vaxholm_core::Error`] for callers that need it.

pub use vaxholm_core;
pub use vaxholm_crypto;
pub use vaxholm_keys;
pub use vaxholm_pkcs12;

pub mod helper;

pub use helper::{
    certificate_from_pkcs12, create_pkcs12_from_der, export_to_fips, private_key_from_pkcs12,
    update_pkcs12_password, validate_pkcs12,
};
