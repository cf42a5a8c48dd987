#![forbid(unsafe_code)]

//! The seam between the PKCS#12 engine and its cryptographic backend.

use rand::RngCore;
use vaxholm_core::{Error, Result};
use zeroize::Zeroizing;

use crate::cipher::CbcCipher;
use crate::digest::DigestAlgorithm;
use crate::kdf::KdfPurpose;

/// Every primitive the PKCS#12 engine needs.
///
/// The engine never calls a cipher or hash directly; it goes through a
/// provider held by its context, so a caller can substitute a backend
/// (a FIPS module, an HSM shim, a deterministic test double).
pub trait CryptoProvider: Send + Sync {
    /// PKCS#12 KDF; `password` is BMP-encoded.
    fn pkcs12_kdf(
        &self,
        alg: DigestAlgorithm,
        purpose: KdfPurpose,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// PBKDF2 with `HMAC-<prf>`.
    fn pbkdf2(
        &self,
        prf: DigestAlgorithm,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>>;

    fn encrypt(
        &self,
        cipher: CbcCipher,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    fn decrypt(
        &self,
        cipher: CbcCipher,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;

    fn hmac(&self, alg: DigestAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Constant-time tag comparison.
    fn hmac_verify(
        &self,
        alg: DigestAlgorithm,
        key: &[u8],
        data: &[u8],
        tag: &[u8],
    ) -> Result<bool>;

    fn digest(&self, alg: DigestAlgorithm, data: &[u8]) -> Vec<u8>;

    /// Fill `buf` from a cryptographically secure source.
    fn fill_random(&self, buf: &mut [u8]) -> Result<()>;

    /// Convenience wrapper over [`fill_random`](Self::fill_random).
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill_random(&mut buf)?;
        Ok(buf)
    }
}

/// The default backend: RustCrypto primitives and the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn pkcs12_kdf(
        &self,
        alg: DigestAlgorithm,
        purpose: KdfPurpose,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        crate::kdf::pkcs12_kdf(alg, purpose, password, salt, iterations, output_len)
    }

    fn pbkdf2(
        &self,
        prf: DigestAlgorithm,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        crate::kdf::pbkdf2(prf, password, salt, iterations, output_len)
    }

    fn encrypt(
        &self,
        cipher: CbcCipher,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        cipher.encrypt(key, iv, plaintext)
    }

    fn decrypt(
        &self,
        cipher: CbcCipher,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        cipher.decrypt(key, iv, ciphertext)
    }

    fn hmac(&self, alg: DigestAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        crate::mac::hmac(alg, key, data)
    }

    fn hmac_verify(
        &self,
        alg: DigestAlgorithm,
        key: &[u8],
        data: &[u8],
        tag: &[u8],
    ) -> Result<bool> {
        crate::mac::hmac_verify(alg, key, data, tag)
    }

    fn digest(&self, alg: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
        crate::digest::digest(alg, data)
    }

    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        rand::thread_rng()
            .try_fill_bytes(buf)
            .map_err(|e| Error::Crypto(format!("random source: {e}")))
    }
}
