#![forbid(unsafe_code)]

//! X.509 certificate parsing for bundle construction and leaf selection.

use der::{Decode, Encode};
use vaxholm_core::{Error, Result};
use x509_cert::Certificate;

/// The parts of a certificate the PKCS#12 engine looks at.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// DER encoding of the subject Name.
    pub subject: Vec<u8>,
    /// DER encoding of the issuer Name.
    pub issuer: Vec<u8>,
    /// DER encoding of the SubjectPublicKeyInfo.
    pub spki: Vec<u8>,
    /// RFC 4514 rendering of the subject, for logs and summaries.
    pub subject_display: String,
}

impl CertificateInfo {
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

/// Parse a DER certificate. Trailing bytes are rejected.
pub fn parse_certificate(der: &[u8]) -> Result<CertificateInfo> {
    if der.is_empty() {
        return Err(Error::MissingInput("certificate"));
    }
    let cert = Certificate::from_der(der)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;

    let tbs = &cert.tbs_certificate;
    let encode_err =
        |e: der::Error| Error::Certificate(format!("failed to re-encode certificate field: {e}"));
    let info = CertificateInfo {
        subject: tbs.subject.to_der().map_err(encode_err)?,
        issuer: tbs.issuer.to_der().map_err(encode_err)?,
        spki: tbs.subject_public_key_info.to_der().map_err(encode_err)?,
        subject_display: tbs.subject.to_string(),
    };
    log::trace!("parsed certificate subject={}", info.subject_display);
    Ok(info)
}
