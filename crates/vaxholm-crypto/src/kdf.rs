#![forbid(unsafe_code)]

//! Password-based key derivation.
//!
//! Two derivations are needed for PKCS#12:
//! 1. The PKCS#12 KDF (RFC 7292 Appendix B), used by the classic MAC and by
//!    the legacy `pbeWithSHAAnd*` ciphers. It consumes the BMP-encoded password.
//! 2. PBKDF2 (RFC 8018), used by PBES2 and PBMAC1. It consumes the raw UTF-8
//!    password bytes.

use digest::{Digest, FixedOutputReset};
use vaxholm_core::{Error, Result};
use zeroize::Zeroizing;

use crate::digest::DigestAlgorithm;

/// Diversifier byte of the PKCS#12 KDF (RFC 7292 Appendix B.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KdfPurpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// Encode a password as a BMPString with the two-byte NUL terminator.
///
/// The empty password encodes to `00 00`. Some producers use a zero-length
/// encoding instead; callers that must interoperate try both.
pub fn password_to_bmp(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bmp = Zeroizing::new(Vec::with_capacity(password.len() * 2 + 2));
    for unit in password.encode_utf16() {
        bmp.extend_from_slice(&unit.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// Run the PKCS#12 KDF with the given hash.
///
/// `password` must already be BMP-encoded (see [`password_to_bmp`]).
pub fn pkcs12_kdf(
    alg: DigestAlgorithm,
    purpose: KdfPurpose,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(Error::Crypto("PKCS#12 KDF: iteration count is zero".into()));
    }
    let out = match alg {
        DigestAlgorithm::Sha1 => {
            derive::<sha1::Sha1>(alg, purpose, password, salt, iterations, output_len)
        }
        DigestAlgorithm::Sha224 => {
            derive::<sha2::Sha224>(alg, purpose, password, salt, iterations, output_len)
        }
        DigestAlgorithm::Sha256 => {
            derive::<sha2::Sha256>(alg, purpose, password, salt, iterations, output_len)
        }
        DigestAlgorithm::Sha384 => {
            derive::<sha2::Sha384>(alg, purpose, password, salt, iterations, output_len)
        }
        DigestAlgorithm::Sha512 => {
            derive::<sha2::Sha512>(alg, purpose, password, salt, iterations, output_len)
        }
    };
    Ok(out)
}

fn derive<D>(
    alg: DigestAlgorithm,
    purpose: KdfPurpose,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>>
where
    D: Digest + FixedOutputReset,
{
    let u = alg.output_size();
    let v = alg.block_size();

    let diversifier = vec![purpose as u8; v];

    // I = S || P, each stretched to a multiple of v.
    let mut input = Zeroizing::new(fill_to_multiple(salt, v));
    input.extend_from_slice(&fill_to_multiple(password, v));

    let mut out = Zeroizing::new(Vec::with_capacity(output_len.div_ceil(u) * u));
    let mut hasher = D::new();

    while out.len() < output_len {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, input.as_slice());
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if out.len() < output_len {
            let b = fill_to_multiple(&a, v);
            for chunk in input.chunks_mut(v) {
                add_with_carry(chunk, &b);
            }
        }
    }

    out.truncate(output_len);
    out
}

/// Repeat `data` until it reaches the next multiple of `v`. Empty stays empty.
fn fill_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(8v)`, big-endian.
fn add_with_carry(block: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// PBKDF2 with an HMAC PRF.
pub fn pbkdf2(
    prf: DigestAlgorithm,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(Error::Crypto("PBKDF2: iteration count is zero".into()));
    }
    log::trace!("PBKDF2-HMAC-{prf}: {iterations} iterations, {output_len} byte key");
    let mut out = Zeroizing::new(vec![0u8; output_len]);
    match prf {
        DigestAlgorithm::Sha1 => {
            pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, iterations, &mut out)
        }
        DigestAlgorithm::Sha224 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha224>(password, salt, iterations, &mut out)
        }
        DigestAlgorithm::Sha256 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, iterations, &mut out)
        }
        DigestAlgorithm::Sha384 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha384>(password, salt, iterations, &mut out)
        }
        DigestAlgorithm::Sha512 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, iterations, &mut out)
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kdf_hex(
        alg: DigestAlgorithm,
        purpose: KdfPurpose,
        password: &str,
        salt: &[u8],
        iterations: u32,
        len: usize,
    ) -> String {
        let pw = password_to_bmp(password);
        hex::encode(pkcs12_kdf(alg, purpose, &pw, salt, iterations, len).unwrap().as_slice())
    }

    #[test]
    fn test_password_to_bmp() {
        assert_eq!(password_to_bmp("").as_slice(), &[0x00, 0x00]);
        assert_eq!(password_to_bmp("A").as_slice(), &[0x00, 0x41, 0x00, 0x00]);
        assert_eq!(
            password_to_bmp("ab").as_slice(),
            &[0x00, 0x61, 0x00, 0x62, 0x00, 0x00]
        );
        // Non-ASCII goes through UTF-16.
        assert_eq!(password_to_bmp("é").as_slice(), &[0x00, 0xE9, 0x00, 0x00]);
    }

    #[test]
    fn test_pkcs12_kdf_sha1_smeg() {
        let salt = hex::decode("0A58CF64530D823F").unwrap();
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha1, KdfPurpose::Key, "smeg", &salt, 1, 24),
            "8aaae6297b6cb04642ab5b077851284eb7128f1a2a7fbca3"
        );
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha1, KdfPurpose::Iv, "smeg", &salt, 1, 8),
            "79993dfe048d3b76"
        );
    }

    #[test]
    fn test_pkcs12_kdf_sha1_queeg_1000_iterations() {
        let salt = hex::decode("05DEC959ACFF72F7").unwrap();
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha1, KdfPurpose::Key, "queeg", &salt, 1000, 24),
            "ed2034e36328830ff09df1e1a07dd357185dac0d4f9eb3d4"
        );
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha1, KdfPurpose::Iv, "queeg", &salt, 1000, 8),
            "11dedad7758d4860"
        );
    }

    #[test]
    fn test_pkcs12_kdf_sha1_mac_key() {
        let salt = hex::decode("3D83C0E4546AC140").unwrap();
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha1, KdfPurpose::Mac, "smeg", &salt, 1, 20),
            "8d967d88f6caa9d714800ab3d48051d63f73a312"
        );
    }

    #[test]
    fn test_pkcs12_kdf_sha256() {
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha256, KdfPurpose::Key, "test", b"saltsalt", 2048, 32),
            "98c91164482561333b50e5ce54de82996b58d5c66649bb9cbd45668f23049f2b"
        );
    }

    #[test]
    fn test_pkcs12_kdf_sha512_multi_block() {
        // 100 bytes needs two SHA-512 blocks, exercising the I-update step
        // with v = 128.
        assert_eq!(
            kdf_hex(DigestAlgorithm::Sha512, KdfPurpose::Key, "test", b"saltsalt", 3, 100),
            "9e61c89cc8df028067d49c67cea9612f2107a2ef77310630234bf596344c0905\
             258b87fa39cdcfa7f158555385e25b218929482f1ed47480205d502d6efac8a4\
             957eca8760ab8daee126ace411babc7a51875ecbeffc3fe2cfced7005769dec1\
             b6c546b3"
        );
    }

    #[test]
    fn test_pkcs12_kdf_rejects_zero_iterations() {
        let pw = password_to_bmp("x");
        assert!(pkcs12_kdf(DigestAlgorithm::Sha1, KdfPurpose::Key, &pw, b"s", 0, 8).is_err());
    }

    #[test]
    fn test_pbkdf2_rfc6070() {
        // RFC 6070 test vector 2.
        let out = pbkdf2(DigestAlgorithm::Sha1, b"password", b"salt", 2, 20).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957"
        );
    }

    #[test]
    fn test_pbkdf2_sha256() {
        let out = pbkdf2(DigestAlgorithm::Sha256, b"password", b"salt", 1, 32).unwrap();
        assert_eq!(
            hex::encode(out.as_slice()),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }
}
