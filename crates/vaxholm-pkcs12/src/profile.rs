#![forbid(unsafe_code)]

//! Algorithm profiles for bundles this crate writes.

use vaxholm_core::Result;
use vaxholm_crypto::{CryptoProvider, DigestAlgorithm};

use crate::algorithm::{EncryptionScheme, MacData, Pbes2Cipher, MAX_ITERATIONS};

/// How the integrity MAC of a written bundle is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacProfile {
    /// Classic PKCS#12 MAC (HMAC keyed by the PKCS#12 KDF).
    Pkcs12Kdf {
        digest: DigestAlgorithm,
        salt_len: usize,
        iterations: u32,
    },
    /// RFC 9579 PBMAC1 (HMAC keyed by PBKDF2).
    Pbmac1 {
        prf: DigestAlgorithm,
        hmac: DigestAlgorithm,
        salt_len: usize,
        iterations: u32,
    },
}

/// Cipher, KDF and MAC choices for a written bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub cipher: Pbes2Cipher,
    pub prf: DigestAlgorithm,
    pub iterations: u32,
    pub salt_len: usize,
    pub mac: MacProfile,
}

impl Profile {
    /// PBES2 with PBKDF2-HMAC-SHA-256 and AES-256-CBC, 2048 iterations,
    /// 16-byte salts; PBMAC1 integrity MAC (PBKDF2-HMAC-SHA-256 keying
    /// HMAC-SHA-256) with a 16-byte salt. Every derivation is PBKDF2.
    pub fn fips() -> Self {
        Self {
            cipher: Pbes2Cipher::Aes256Cbc,
            prf: DigestAlgorithm::Sha256,
            iterations: 2048,
            salt_len: 16,
            mac: MacProfile::Pbmac1 {
                prf: DigestAlgorithm::Sha256,
                hmac: DigestAlgorithm::Sha256,
                salt_len: 16,
                iterations: 2048,
            },
        }
    }

    /// [`fips`](Self::fips) encryption with the classic SHA-256 PKCS#12
    /// MAC and an 8-byte MAC salt, as OpenSSL 3 writes by default. Readers
    /// without PBMAC1 support open these.
    pub fn openssl_default() -> Self {
        Self {
            mac: MacProfile::Pkcs12Kdf {
                digest: DigestAlgorithm::Sha256,
                salt_len: 8,
                iterations: 2048,
            },
            ..Self::fips()
        }
    }

    /// Fresh PBES2 parameters for one encrypted safe or key.
    pub fn encryption_scheme(&self, provider: &dyn CryptoProvider) -> Result<EncryptionScheme> {
        EncryptionScheme::new_pbes2(
            provider,
            self.cipher,
            self.prf,
            self.iterations.clamp(1, MAX_ITERATIONS),
            self.salt_len,
        )
    }

    /// A MAC with a fresh salt and no digest yet.
    pub fn mac_template(&self, provider: &dyn CryptoProvider) -> Result<MacData> {
        match self.mac {
            MacProfile::Pkcs12Kdf {
                digest,
                salt_len,
                iterations,
            } => {
                let iterations = iterations.clamp(1, MAX_ITERATIONS);
                MacData::new_pkcs12(provider, digest, iterations, salt_len)
            }
            MacProfile::Pbmac1 {
                prf,
                hmac,
                salt_len,
                iterations,
            } => {
                let iterations = iterations.clamp(1, MAX_ITERATIONS);
                MacData::new_pbmac1(provider, prf, hmac, iterations, salt_len)
            }
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::fips()
    }
}
