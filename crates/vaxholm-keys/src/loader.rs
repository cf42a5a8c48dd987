#![forbid(unsafe_code)]

//! Private key loading and normalisation to PKCS#8.
//!
//! A PKCS#12 key bag always carries a PKCS#8 `PrivateKeyInfo`, so every
//! accepted input is converted to that form:
//!
//! | PEM label               | Handling                                      |
//! |-------------------------|-----------------------------------------------|
//! | `PRIVATE KEY`           | checked and used as is                        |
//! | `RSA PRIVATE KEY`       | PKCS#1 wrapped under `rsaEncryption`          |
//! | `EC PRIVATE KEY`        | SEC1 wrapped under `id-ecPublicKey` + curve   |
//! | `ENCRYPTED PRIVATE KEY` | decrypted with the supplied password          |
//!
//! Input that is not PEM at all is tried as bare PKCS#8 DER.

use der::Decode;
use vaxholm_core::algorithm::{self, oid};
use vaxholm_core::{Error, Result};
use yasna::{ASN1Error, ASN1ErrorKind, Tag};
use zeroize::Zeroizing;

/// Load a private key and return it as PKCS#8 DER.
///
/// `password` is only consulted for `ENCRYPTED PRIVATE KEY` input.
pub fn load_private_key_to_pkcs8(input: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    if input.is_empty() {
        return Err(Error::MissingInput("private key"));
    }

    let Some(pem) = pem_text(input) else {
        log::debug!("private key is not PEM, trying bare PKCS#8 DER");
        validate_pkcs8(input)?;
        return Ok(Zeroizing::new(input.to_vec()));
    };

    let (label, der) = pem_rfc7468::decode_vec(pem.as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode private key PEM: {e}")))?;
    let der = Zeroizing::new(der);
    log::trace!("private key PEM label: {label}");

    match label {
        "PRIVATE KEY" => {
            validate_pkcs8(&der)?;
            Ok(der)
        }
        "RSA PRIVATE KEY" => wrap_pkcs1(&der),
        "EC PRIVATE KEY" => wrap_sec1(&der),
        "ENCRYPTED PRIVATE KEY" => decrypt_pkcs8(&der, password),
        other => Err(Error::Key(format!("unsupported PEM label: {other}"))),
    }
}

/// Encode PKCS#8 DER as a `PRIVATE KEY` PEM document with LF line endings.
pub fn pkcs8_to_pem(der: &[u8]) -> Result<Zeroizing<String>> {
    pem_rfc7468::encode_string("PRIVATE KEY", pem_rfc7468::LineEnding::LF, der)
        .map(Zeroizing::new)
        .map_err(|e| Error::Internal(format!("PEM encoding failed: {e}")))
}

/// Return the PEM text to decode, skipping a leading `EC PARAMETERS` block
/// as written by `openssl ecparam -genkey`.
fn pem_text(input: &[u8]) -> Option<&str> {
    const EC_PARAMS_END: &str = "-----END EC PARAMETERS-----";

    let text = std::str::from_utf8(input).ok()?.trim();
    if !text.starts_with("-----BEGIN ") {
        return None;
    }
    if text.starts_with("-----BEGIN EC PARAMETERS-----") {
        let end = text.find(EC_PARAMS_END)? + EC_PARAMS_END.len();
        return Some(text[end..].trim());
    }
    Some(text)
}

/// Check that `der` is a PKCS#8 `PrivateKeyInfo`.
pub fn validate_pkcs8(der: &[u8]) -> Result<()> {
    let pki = pkcs8::PrivateKeyInfo::from_der(der)
        .map_err(|e| Error::Key(format!("not a PKCS#8 private key: {e}")))?;
    log::debug!("PKCS#8 private key, algorithm {}", pki.algorithm.oid);
    Ok(())
}

fn decrypt_pkcs8(der: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let encrypted = pkcs8::EncryptedPrivateKeyInfo::from_der(der)
        .map_err(|e| Error::Key(format!("malformed encrypted private key: {e}")))?;
    let doc = encrypted
        .decrypt(password.as_bytes())
        .map_err(|e| Error::Authentication(format!("cannot decrypt private key: {e}")))?;
    let plain = Zeroizing::new(doc.as_bytes().to_vec());
    validate_pkcs8(&plain)?;
    Ok(plain)
}

/// PKCS#1 `RSAPrivateKey` to PKCS#8.
fn wrap_pkcs1(der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    pkcs1::RsaPrivateKey::from_der(der)
        .map_err(|e| Error::Key(format!("malformed PKCS#1 RSA private key: {e}")))?;

    Ok(Zeroizing::new(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u8(0);
            w.next().write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::RSA_ENCRYPTION));
                w.next().write_null();
            });
            w.next().write_bytes(der);
        })
    })))
}

/// SEC1 `ECPrivateKey` to PKCS#8.
///
/// The named curve moves from the SEC1 `[0]` field into the
/// AlgorithmIdentifier and is dropped from the inner structure; the
/// optional `[1]` public key is kept.
fn wrap_sec1(der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let (version, private_key, curve, public_key) = yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u8()?;
            let private_key = Zeroizing::new(r.next().read_bytes()?);
            // Both trailing fields are optional; dispatch on the tag byte.
            let mut curve = None;
            let mut public_key = None;
            while let Some(field) = r.read_optional(|r| r.read_der())? {
                match field.first() {
                    Some(0xA0) => {
                        curve = Some(yasna::parse_der(&field, |r| {
                            r.read_tagged(Tag::context(0), |r| r.read_oid())
                        })?);
                    }
                    Some(0xA1) => {
                        public_key = Some(yasna::parse_der(&field, |r| {
                            r.read_tagged(Tag::context(1), |r| r.read_der())
                        })?);
                    }
                    _ => return Err(ASN1Error::new(ASN1ErrorKind::Invalid)),
                }
            }
            Ok((version, private_key, curve, public_key))
        })
    })
    .map_err(|e| Error::Key(format!("malformed SEC1 EC private key: {e}")))?;

    if version != 1 {
        return Err(Error::Key(format!("unsupported SEC1 version {version}")));
    }
    let curve = curve.ok_or_else(|| {
        Error::Key("SEC1 EC private key has no named curve parameters".into())
    })?;
    log::debug!("wrapping SEC1 key on curve {curve}");

    let inner = Zeroizing::new(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u8(1);
            w.next().write_bytes(&private_key);
            if let Some(public_key) = &public_key {
                w.next()
                    .write_tagged(Tag::context(1), |w| w.write_der(public_key));
            }
        })
    }));

    Ok(Zeroizing::new(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u8(0);
            w.next().write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::EC_PUBLIC_KEY));
                w.next().write_oid(&curve);
            });
            w.next().write_bytes(&inner);
        })
    })))
}
