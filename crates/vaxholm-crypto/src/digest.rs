#![forbid(unsafe_code)]

//! Digest (hash) algorithm selection.

use digest::Digest;
use vaxholm_core::algorithm::{self, oid};
use yasna::models::ObjectIdentifier;

/// Hash functions usable for the PKCS#12 KDF, PBKDF2 PRFs and HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Output length in bytes (`u` in RFC 7292 Appendix B).
    pub fn output_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Internal block length in bytes (`v` in RFC 7292 Appendix B).
    pub fn block_size(self) -> usize {
        match self {
            Self::Sha1 | Self::Sha224 | Self::Sha256 => 64,
            Self::Sha384 | Self::Sha512 => 128,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// OID of the bare hash, as used in a PKCS#12 `DigestInfo`.
    pub fn digest_oid(self) -> &'static [u64] {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }

    /// OID of the matching `hmacWith*` PRF.
    pub fn hmac_oid(self) -> &'static [u64] {
        match self {
            Self::Sha1 => algorithm::HMAC_SHA1,
            Self::Sha224 => algorithm::HMAC_SHA224,
            Self::Sha256 => algorithm::HMAC_SHA256,
            Self::Sha384 => algorithm::HMAC_SHA384,
            Self::Sha512 => algorithm::HMAC_SHA512,
        }
    }

    pub fn from_digest_oid(id: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|d| *id == oid(d.digest_oid()))
    }

    pub fn from_hmac_oid(id: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|d| *id == oid(d.hmac_oid()))
    }

    const ALL: [Self; 5] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Compute a digest in one shot.
pub fn digest(alg: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match alg {
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
        DigestAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        DigestAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let result = digest(DigestAlgorithm::Sha256, b"hello");
        assert_eq!(
            hex::encode(result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_output_sizes_match() {
        for alg in DigestAlgorithm::ALL {
            assert_eq!(digest(alg, b"x").len(), alg.output_size(), "{alg}");
        }
    }

    #[test]
    fn test_oid_lookup() {
        let sha256 = oid(algorithm::SHA256);
        assert_eq!(
            DigestAlgorithm::from_digest_oid(&sha256),
            Some(DigestAlgorithm::Sha256)
        );
        assert_eq!(DigestAlgorithm::from_hmac_oid(&sha256), None);
        assert_eq!(
            DigestAlgorithm::from_hmac_oid(&oid(algorithm::HMAC_SHA512)),
            Some(DigestAlgorithm::Sha512)
        );
    }
}
