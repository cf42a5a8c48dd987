#![forbid(unsafe_code)]

//! Boolean/optional PKCS#12 operations.
//!
//! Every failure, whether an absent input, malformed bytes, a wrong password
//! or an unsupported algorithm, becomes `false` or `None`. The reason is
//! logged at `debug` level. An empty password string is a real password; an
//! absent one is a failure.

use vaxholm_core::Result;
use vaxholm_pkcs12::{engine, Pkcs12Context};

fn collapse<T>(op: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("{op} failed ({:?}): {e}", e.kind());
            None
        }
    }
}

fn missing<T>(op: &str) -> Option<T> {
    log::debug!("{op} failed: missing input");
    None
}

/// Whether `bundle` opens under `password`.
pub fn validate_pkcs12(bundle: Option<&[u8]>, password: Option<&str>) -> bool {
    let (Some(bundle), Some(password)) = (bundle, password) else {
        log::debug!("validate_pkcs12 failed: missing input");
        return false;
    };
    let ctx = Pkcs12Context::new();
    collapse("validate_pkcs12", engine::validate(&ctx, bundle, password)).is_some()
}

/// DER of the leaf certificate.
pub fn certificate_from_pkcs12(bundle: Option<&[u8]>, password: Option<&str>) -> Option<Vec<u8>> {
    let (Some(bundle), Some(password)) = (bundle, password) else {
        return missing("certificate_from_pkcs12");
    };
    let ctx = Pkcs12Context::new();
    collapse(
        "certificate_from_pkcs12",
        engine::extract_certificate(&ctx, bundle, password),
    )
}

/// The leaf's private key as a PKCS#8 `PRIVATE KEY` PEM document.
pub fn private_key_from_pkcs12(bundle: Option<&[u8]>, password: Option<&str>) -> Option<Vec<u8>> {
    let (Some(bundle), Some(password)) = (bundle, password) else {
        return missing("private_key_from_pkcs12");
    };
    let ctx = Pkcs12Context::new();
    collapse(
        "private_key_from_pkcs12",
        engine::extract_private_key(&ctx, bundle, password),
    )
    .map(|pem| pem.as_bytes().to_vec())
}

/// `bundle` re-encoded with AES-256-CBC, PBKDF2-HMAC-SHA-256 and a
/// PBMAC1 HMAC-SHA-256 MAC under the same password.
pub fn export_to_fips(bundle: Option<&[u8]>, password: Option<&str>) -> Option<Vec<u8>> {
    let (Some(bundle), Some(password)) = (bundle, password) else {
        return missing("export_to_fips");
    };
    let ctx = Pkcs12Context::new();
    collapse("export_to_fips", engine::export_to_fips(&ctx, bundle, password))
}

/// A new bundle holding `cert_der` and the key in `private_key_pem`.
pub fn create_pkcs12_from_der(
    cert_der: Option<&[u8]>,
    private_key_pem: Option<&[u8]>,
    password: Option<&str>,
) -> Option<Vec<u8>> {
    let (Some(cert_der), Some(private_key_pem), Some(password)) =
        (cert_der, private_key_pem, password)
    else {
        return missing("create_pkcs12_from_der");
    };
    let ctx = Pkcs12Context::new();
    collapse(
        "create_pkcs12_from_der",
        engine::create_bundle(&ctx, cert_der, private_key_pem, password),
    )
}

/// `bundle` re-keyed from `old_password` to `new_password`.
pub fn update_pkcs12_password(
    bundle: Option<&[u8]>,
    old_password: Option<&str>,
    new_password: Option<&str>,
) -> Option<Vec<u8>> {
    let (Some(bundle), Some(old_password), Some(new_password)) =
        (bundle, old_password, new_password)
    else {
        return missing("update_pkcs12_password");
    };
    let ctx = Pkcs12Context::new();
    collapse(
        "update_pkcs12_password",
        engine::update_password(&ctx, bundle, old_password, new_password),
    )
}
