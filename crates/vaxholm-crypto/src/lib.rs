#![forbid(unsafe_code)]

//! Cryptographic primitives for the Vaxholm PKCS#12 engine.
//!
//! Digests, HMAC, the PKCS#12 and PBKDF2 key derivations, and CBC block
//! ciphers, gathered behind the [`CryptoProvider`] trait.

pub mod cipher;
pub mod digest;
pub mod kdf;
pub mod mac;
pub mod provider;

pub use cipher::CbcCipher;
pub use digest::DigestAlgorithm;
pub use kdf::{password_to_bmp, KdfPurpose};
pub use provider::{CryptoProvider, RustCryptoProvider};
