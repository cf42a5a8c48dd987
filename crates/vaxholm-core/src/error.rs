#![forbid(unsafe_code)]

/// Errors produced by the Vaxholm PKCS#12 engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] yasna::ASN1Error),

    #[error("{0}")]
    Internal(String),
}

/// The four failure classes callers can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not valid ASN.1, DER or PEM, or not a PKCS#12 structure.
    MalformedInput,
    /// Wrong password or MAC mismatch.
    AuthenticationFailure,
    /// A cipher, MAC or KDF the engine cannot process.
    UnsupportedAlgorithm,
    /// Unexpected encoding or backend failure.
    InternalFailure,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_)
            | Self::Key(_)
            | Self::Certificate(_)
            | Self::MissingInput(_)
            | Self::Asn1(_) => ErrorKind::MalformedInput,
            Self::Authentication(_) => ErrorKind::AuthenticationFailure,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::Crypto(_) | Self::Internal(_) => ErrorKind::InternalFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
