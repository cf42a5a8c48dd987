#![forbid(unsafe_code)]

//! Password integrity: the `MacData` HMAC over the authenticated safe.

use vaxholm_core::{Error, Result};
use vaxholm_crypto::{CryptoProvider, DigestAlgorithm, KdfPurpose};
use zeroize::Zeroizing;

use crate::algorithm::{MacAlgorithm, MacData};
use crate::pbe::Password;

fn mac_key(
    provider: &dyn CryptoProvider,
    mac: &MacData,
    password: &Password,
) -> Result<(DigestAlgorithm, Zeroizing<Vec<u8>>)> {
    match &mac.algorithm {
        MacAlgorithm::Pkcs12Kdf(digest) => {
            let key = provider.pkcs12_kdf(
                *digest,
                KdfPurpose::Mac,
                password.bmp(),
                &mac.salt,
                mac.iterations,
                digest.output_size(),
            )?;
            Ok((*digest, key))
        }
        MacAlgorithm::Pbmac1 { kdf, hmac } => {
            // keyLength is mandatory for PBMAC1 and checked at parse time.
            let len = kdf.key_length.map_or(hmac.output_size(), |len| len as usize);
            let key = provider.pbkdf2(kdf.prf, password.utf8(), &kdf.salt, kdf.iterations, len)?;
            Ok((*hmac, key))
        }
        MacAlgorithm::Unsupported { reason, .. } => {
            Err(Error::UnsupportedAlgorithm(reason.clone()))
        }
    }
}

fn tag_matches(
    provider: &dyn CryptoProvider,
    mac: &MacData,
    auth_safe: &[u8],
    password: &Password,
) -> Result<bool> {
    let (alg, key) = mac_key(provider, mac, password)?;
    provider.hmac_verify(alg, &key, auth_safe, &mac.digest)
}

/// Verify the MAC over `auth_safe`.
///
/// Returns the password encoding that verified. For the empty password both
/// the `00 00` and the zero-length BMP encodings are tried, in that order;
/// callers must use the returned value for the PKCS#12 KDF afterwards.
pub fn verify(
    provider: &dyn CryptoProvider,
    mac: &MacData,
    auth_safe: &[u8],
    password: &Password,
) -> Result<Password> {
    log::debug!("verifying MAC {} ({} iterations)", mac.algorithm.name(), mac.iterations);
    if tag_matches(provider, mac, auth_safe, password)? {
        return Ok(password.clone());
    }
    let classic = matches!(mac.algorithm, MacAlgorithm::Pkcs12Kdf(_));
    if let Some(alt) = password.empty_bmp_variant() {
        if classic && tag_matches(provider, mac, auth_safe, &alt)? {
            log::warn!("MAC verified with the zero-length empty password encoding");
            return Ok(alt);
        }
    }
    Err(Error::Authentication("MAC verification failed, wrong password?".into()))
}

/// Fill in the digest of `template` for `auth_safe`.
pub fn compute(
    provider: &dyn CryptoProvider,
    template: &MacData,
    auth_safe: &[u8],
    password: &Password,
) -> Result<MacData> {
    let (alg, key) = mac_key(provider, template, password)?;
    let digest = provider.hmac(alg, &key, auth_safe)?;
    log::debug!("computed MAC {}", template.algorithm.name());
    Ok(MacData {
        digest,
        ..template.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pfx::Pfx;
    use crate::test_util::fixture;
    use vaxholm_core::ErrorKind;
    use vaxholm_crypto::RustCryptoProvider;

    fn check(name: &str, password: &str) -> Result<Password> {
        let pfx = Pfx::parse(&fixture(name)).unwrap();
        let mac = pfx.mac_data.as_ref().unwrap();
        verify(&RustCryptoProvider, mac, &pfx.auth_safe, &Password::new(password))
    }

    #[test]
    fn test_verify_fixtures() {
        check("ec-p256-aes.p12", "secret123").unwrap();
        check("rsa-2048-3des.p12", "secret123").unwrap();
        check("rsa-2048-legacy-rc2.p12", "secret123").unwrap();
        check("ec-p256-pbmac1.p12", "secret123").unwrap();
    }

    #[test]
    fn test_wrong_password() {
        for name in ["ec-p256-aes.p12", "rsa-2048-3des.p12", "ec-p256-pbmac1.p12"] {
            let err = check(name, "secret1234").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AuthenticationFailure, "{name}");
        }
        assert!(check("ec-p256-aes.p12", "").is_err());
    }

    #[test]
    fn test_empty_password_uses_terminated_encoding() {
        let verified = check("ec-p256-empty-pass.p12", "").unwrap();
        assert_eq!(verified.bmp(), &[0, 0]);
        assert!(check("ec-p256-empty-pass.p12", "secret123").is_err());
    }

    #[test]
    fn test_empty_password_fallback() {
        // A MAC keyed from the zero-length encoding still verifies with "".
        let p = RustCryptoProvider;
        let template = MacData::new_pkcs12(&p, DigestAlgorithm::Sha256, 2048, 8).unwrap();
        let zero_length = Password::new("").empty_bmp_variant().unwrap();
        let mac = compute(&p, &template, b"auth safe", &zero_length).unwrap();
        let verified = verify(&p, &mac, b"auth safe", &Password::new("")).unwrap();
        assert!(verified.bmp().is_empty());
    }

    #[test]
    fn test_compute_reproduces_fixture() {
        for name in ["ec-p256-aes.p12", "rsa-2048-3des.p12", "ec-p256-pbmac1.p12"] {
            let pfx = Pfx::parse(&fixture(name)).unwrap();
            let stored = pfx.mac_data.unwrap();
            let password = Password::new("secret123");
            let mac = compute(&RustCryptoProvider, &stored, &pfx.auth_safe, &password).unwrap();
            assert_eq!(mac.digest, stored.digest, "{name}");
        }
    }

    #[test]
    fn test_tampered_content() {
        let pfx = Pfx::parse(&fixture("ec-p256-aes.p12")).unwrap();
        let mut auth_safe = pfx.auth_safe.clone();
        let last = auth_safe.len() - 1;
        auth_safe[last] ^= 1;
        let mac = pfx.mac_data.as_ref().unwrap();
        assert!(verify(&RustCryptoProvider, mac, &auth_safe, &Password::new("secret123")).is_err());
    }
}
