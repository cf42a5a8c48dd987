#![forbid(unsafe_code)]

//! Private key and certificate handling for the Vaxholm PKCS#12 engine.
//!
//! Loads PEM private keys in the common encodings and normalises them to
//! PKCS#8, parses X.509 certificates, and checks key/certificate pairing.

pub mod loader;
pub mod pairing;
pub mod x509;

pub use loader::{load_private_key_to_pkcs8, pkcs8_to_pem, validate_pkcs8};
pub use pairing::verify_key_pair;
pub use x509::{parse_certificate, CertificateInfo};
