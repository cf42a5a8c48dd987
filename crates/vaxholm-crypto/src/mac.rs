#![forbid(unsafe_code)]

//! HMAC over the supported digests.

use hmac::{Hmac, Mac};
use vaxholm_core::{Error, Result};

use crate::digest::DigestAlgorithm;

macro_rules! with_hmac {
    ($alg:expr, $key:expr, |$mac:ident| $body:expr) => {
        match $alg {
            DigestAlgorithm::Sha1 => {
                let mut $mac = Hmac::<sha1::Sha1>::new_from_slice($key).map_err(key_error)?;
                $body
            }
            DigestAlgorithm::Sha224 => {
                let mut $mac = Hmac::<sha2::Sha224>::new_from_slice($key).map_err(key_error)?;
                $body
            }
            DigestAlgorithm::Sha256 => {
                let mut $mac = Hmac::<sha2::Sha256>::new_from_slice($key).map_err(key_error)?;
                $body
            }
            DigestAlgorithm::Sha384 => {
                let mut $mac = Hmac::<sha2::Sha384>::new_from_slice($key).map_err(key_error)?;
                $body
            }
            DigestAlgorithm::Sha512 => {
                let mut $mac = Hmac::<sha2::Sha512>::new_from_slice($key).map_err(key_error)?;
                $body
            }
        }
    };
}

fn key_error(e: hmac::digest::InvalidLength) -> Error {
    Error::Crypto(format!("HMAC key: {e}"))
}

/// Compute `HMAC(key, data)`.
pub fn hmac(alg: DigestAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    with_hmac!(alg, key, |mac| {
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    })
}

/// Check `expected` against `HMAC(key, data)` in constant time.
///
/// A truncated `expected` is accepted if it matches the leading bytes and
/// is at least half the digest length, as RFC 2104 permits.
pub fn hmac_verify(alg: DigestAlgorithm, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool> {
    if expected.len() < alg.output_size() / 2 || expected.len() > alg.output_size() {
        return Ok(false);
    }
    with_hmac!(alg, key, |mac| {
        mac.update(data);
        Ok(mac.verify_truncated_left(expected).is_ok())
    })
}
