#![forbid(unsafe_code)]

//! Check that a certificate's public key belongs to a private key.
//!
//! Supported: RSA, EC P-256, EC P-384 and Ed25519. The certificate's key
//! type is detected first, then the private key is loaded as the same type.

use pkcs8::DecodePrivateKey;
use spki::DecodePublicKey;
use vaxholm_core::{Error, Result};

use crate::x509::CertificateInfo;

/// Fails with [`Error::Key`] on a mismatch and with
/// [`Error::UnsupportedAlgorithm`] when the key type is not one of the above.
pub fn verify_key_pair(cert: &CertificateInfo, pkcs8_der: &[u8]) -> Result<()> {
    let spki = cert.spki.as_slice();

    let matches = if let Ok(public) = rsa::RsaPublicKey::from_public_key_der(spki) {
        let private = rsa::RsaPrivateKey::from_pkcs8_der(pkcs8_der).map_err(not_a("RSA"))?;
        private.to_public_key() == public
    } else if let Ok(public) = p256::PublicKey::from_public_key_der(spki) {
        let private = p256::SecretKey::from_pkcs8_der(pkcs8_der).map_err(not_a("P-256"))?;
        private.public_key() == public
    } else if let Ok(public) = p384::PublicKey::from_public_key_der(spki) {
        let private = p384::SecretKey::from_pkcs8_der(pkcs8_der).map_err(not_a("P-384"))?;
        private.public_key() == public
    } else if let Ok(public) = ed25519_dalek::VerifyingKey::from_public_key_der(spki) {
        let private =
            ed25519_dalek::SigningKey::from_pkcs8_der(pkcs8_der).map_err(not_a("Ed25519"))?;
        private.verifying_key() == public
    } else {
        return Err(Error::UnsupportedAlgorithm(format!(
            "key pairing check for certificate {}",
            cert.subject_display
        )));
    };

    if !matches {
        return Err(Error::Key(
            "certificate public key does not match the private key".into(),
        ));
    }
    log::debug!("private key matches certificate {}", cert.subject_display);
    Ok(())
}

fn not_a(kind: &'static str) -> impl Fn(pkcs8::Error) -> Error {
    move |e| {
        Error::Key(format!(
            "certificate holds a {kind} key but the private key is not one: {e}"
        ))
    }
}
