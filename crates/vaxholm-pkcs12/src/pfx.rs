#![forbid(unsafe_code)]

//! BER parsing and DER encoding of PKCS#12 (PFX) structures (RFC 7292).
//!
//! Input is read with `yasna::parse_ber` since real-world PKCS#12 files use
//! indefinite lengths and constructed OCTET STRINGs. Output is always DER.
//! Nothing here decrypts; encrypted content is carried as ciphertext plus
//! its [`EncryptionScheme`].

use vaxholm_core::algorithm::{self, oid};
use vaxholm_core::{Error, Result};
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1Result, BERReader, DERWriter, Tag};
use zeroize::Zeroizing;

use crate::algorithm::{EncryptionScheme, MacData};

// ── Attributes ─────────────────────────────────────────────────────────────

/// A `PKCS12Attribute`: type plus raw DER values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: ObjectIdentifier,
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn friendly_name(name: &str) -> Self {
        Self {
            attr_type: oid(algorithm::FRIENDLY_NAME),
            values: vec![yasna::construct_der(|w| w.write_bmp_string(name))],
        }
    }

    pub fn local_key_id(id: &[u8]) -> Self {
        Self {
            attr_type: oid(algorithm::LOCAL_KEY_ID),
            values: vec![yasna::construct_der(|w| w.write_bytes(id))],
        }
    }

    /// The value of a `friendlyName` attribute.
    pub fn as_friendly_name(&self) -> Option<String> {
        if self.attr_type != oid(algorithm::FRIENDLY_NAME) {
            return None;
        }
        let value = self.values.first()?;
        yasna::parse_ber(value, |r| r.read_bmp_string()).ok()
    }

    /// The value of a `localKeyId` attribute.
    pub fn as_local_key_id(&self) -> Option<Vec<u8>> {
        if self.attr_type != oid(algorithm::LOCAL_KEY_ID) {
            return None;
        }
        let value = self.values.first()?;
        yasna::parse_ber(value, |r| r.read_bytes()).ok()
    }

    fn parse(r: BERReader) -> ASN1Result<Self> {
        r.read_sequence(|r| {
            let attr_type = r.next().read_oid()?;
            let values = r.next().collect_set_of(|r| r.read_der())?;
            Ok(Self { attr_type, values })
        })
    }

    fn write(&self, w: DERWriter) {
        w.write_sequence(|w| {
            w.next().write_oid(&self.attr_type);
            w.next().write_set_of(|w| {
                for value in &self.values {
                    w.next().write_der(value);
                }
            });
        })
    }
}

/// First `friendlyName` among `attributes`.
pub fn friendly_name(attributes: &[Attribute]) -> Option<String> {
    attributes.iter().find_map(Attribute::as_friendly_name)
}

/// First `localKeyId` among `attributes`.
pub fn local_key_id(attributes: &[Attribute]) -> Option<Vec<u8>> {
    attributes.iter().find_map(Attribute::as_local_key_id)
}

// ── SafeBag ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SafeBagKind {
    /// `keyBag`: a plaintext PKCS#8 `PrivateKeyInfo`.
    Key(Zeroizing<Vec<u8>>),
    /// `pkcs8ShroudedKeyBag`: an `EncryptedPrivateKeyInfo`.
    ShroudedKey {
        algorithm: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
    /// `certBag` holding an X.509 certificate (DER).
    Certificate(Vec<u8>),
    /// Anything else, kept verbatim: CRLs, secrets, nested safe contents,
    /// certificates of other types.
    Other {
        bag_type: ObjectIdentifier,
        value: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct SafeBag {
    pub kind: SafeBagKind,
    pub attributes: Vec<Attribute>,
}

impl SafeBag {
    fn parse(r: BERReader) -> ASN1Result<Self> {
        r.read_sequence(|r| {
            let bag_type = r.next().read_oid()?;
            // [0] EXPLICIT bagValue
            let value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            let attributes = r
                .read_optional(|r| r.collect_set_of(Attribute::parse))?
                .unwrap_or_default();

            let kind = if bag_type == oid(algorithm::KEY_BAG) {
                SafeBagKind::Key(Zeroizing::new(value))
            } else if bag_type == oid(algorithm::PKCS8_SHROUDED_KEY_BAG) {
                let (algorithm, ciphertext) = yasna::parse_ber(&value, |r| {
                    r.read_sequence(|r| {
                        let algorithm = EncryptionScheme::parse(r.next())?;
                        let ciphertext = r.next().read_bytes()?;
                        Ok((algorithm, ciphertext))
                    })
                })?;
                SafeBagKind::ShroudedKey {
                    algorithm,
                    ciphertext,
                }
            } else if bag_type == oid(algorithm::CERT_BAG) {
                let (cert_type, cert) = yasna::parse_ber(&value, |r| {
                    r.read_sequence(|r| {
                        let cert_type = r.next().read_oid()?;
                        let cert = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
                        Ok((cert_type, cert))
                    })
                })?;
                if cert_type == oid(algorithm::X509_CERTIFICATE) {
                    SafeBagKind::Certificate(yasna::parse_ber(&cert, |r| r.read_bytes())?)
                } else {
                    log::debug!("keeping certBag of type {cert_type} opaque");
                    SafeBagKind::Other { bag_type, value }
                }
            } else {
                log::trace!("keeping bag of type {bag_type} opaque");
                SafeBagKind::Other { bag_type, value }
            };

            Ok(Self { kind, attributes })
        })
    }

    fn write(&self, w: DERWriter) {
        w.write_sequence(|w| {
            let bag_type = match &self.kind {
                SafeBagKind::Key(_) => oid(algorithm::KEY_BAG),
                SafeBagKind::ShroudedKey { .. } => oid(algorithm::PKCS8_SHROUDED_KEY_BAG),
                SafeBagKind::Certificate(_) => oid(algorithm::CERT_BAG),
                SafeBagKind::Other { bag_type, .. } => bag_type.clone(),
            };
            w.next().write_oid(&bag_type);
            w.next().write_tagged(Tag::context(0), |w| match &self.kind {
                SafeBagKind::Key(pkcs8) => w.write_der(pkcs8),
                SafeBagKind::ShroudedKey {
                    algorithm,
                    ciphertext,
                } => w.write_sequence(|w| {
                    algorithm.write(w.next());
                    w.next().write_bytes(ciphertext);
                }),
                SafeBagKind::Certificate(cert) => w.write_sequence(|w| {
                    w.next().write_oid(&oid(algorithm::X509_CERTIFICATE));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(cert));
                }),
                SafeBagKind::Other { value, .. } => w.write_der(value),
            });
            if !self.attributes.is_empty() {
                w.next().write_set_of(|w| {
                    for attr in &self.attributes {
                        attr.write(w.next());
                    }
                });
            }
        })
    }
}

/// Parse a `SafeContents` (SEQUENCE OF SafeBag).
pub fn parse_safe_contents(data: &[u8]) -> ASN1Result<Vec<SafeBag>> {
    yasna::parse_ber(data, |r| r.collect_sequence_of(SafeBag::parse))
}

pub fn encode_safe_contents(bags: &[SafeBag]) -> Vec<u8> {
    yasna::construct_der(|w| {
        w.write_sequence_of(|w| {
            for bag in bags {
                bag.write(w.next());
            }
        })
    })
}

// ── ContentInfo ────────────────────────────────────────────────────────────

/// One entry of the AuthenticatedSafe.
#[derive(Debug, Clone)]
pub enum ContentInfo {
    /// `data`: an unencrypted SafeContents.
    Data(Vec<u8>),
    /// `encryptedData`: a password-encrypted SafeContents.
    Encrypted {
        algorithm: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
    /// Any other content type (e.g. `envelopedData`), kept verbatim.
    Other {
        content_type: ObjectIdentifier,
        der: Vec<u8>,
    },
}

impl ContentInfo {
    fn parse(r: BERReader) -> ASN1Result<Self> {
        let der = r.read_der()?;
        yasna::parse_ber(&der, |r| {
            r.read_sequence(|r| {
                let content_type = r.next().read_oid()?;

                if content_type == oid(algorithm::DATA) {
                    let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                    Ok(Self::Data(data))
                } else if content_type == oid(algorithm::ENCRYPTED_DATA) {
                    // [0] EXPLICIT EncryptedData
                    r.next().read_tagged(Tag::context(0), |r| {
                        r.read_sequence(|r| {
                            let _version = r.next().read_u32()?;
                            r.next().read_sequence(|r| {
                                let _content_type = r.next().read_oid()?;
                                let algorithm = EncryptionScheme::parse(r.next())?;
                                // [0] IMPLICIT encryptedContent
                                let ciphertext = r
                                    .next()
                                    .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                                Ok(Self::Encrypted {
                                    algorithm,
                                    ciphertext,
                                })
                            })
                        })
                    })
                } else {
                    let _content = r.read_optional(|r| r.read_der())?;
                    Ok(Self::Other {
                        content_type,
                        der: der.clone(),
                    })
                }
            })
        })
    }

    fn write(&self, w: DERWriter) {
        match self {
            Self::Data(data) => w.write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::DATA));
                w.next()
                    .write_tagged(Tag::context(0), |w| w.write_bytes(data));
            }),
            Self::Encrypted {
                algorithm,
                ciphertext,
            } => w.write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::ENCRYPTED_DATA));
                w.next().write_tagged(Tag::context(0), |w| {
                    w.write_sequence(|w| {
                        w.next().write_u8(0);
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(algorithm::DATA));
                            algorithm.write(w.next());
                            w.next().write_tagged_implicit(Tag::context(0), |w| {
                                w.write_bytes(ciphertext)
                            });
                        });
                    })
                });
            }),
            Self::Other { der, .. } => w.write_der(der),
        }
    }
}

/// Parse an `AuthenticatedSafe` (SEQUENCE OF ContentInfo).
pub fn parse_authenticated_safe(data: &[u8]) -> ASN1Result<Vec<ContentInfo>> {
    yasna::parse_ber(data, |r| r.collect_sequence_of(ContentInfo::parse))
}

pub fn encode_authenticated_safe(contents: &[ContentInfo]) -> Vec<u8> {
    yasna::construct_der(|w| {
        w.write_sequence_of(|w| {
            for ci in contents {
                ci.write(w.next());
            }
        })
    })
}

// ── PFX ────────────────────────────────────────────────────────────────────

/// The outer `PFX` structure.
///
/// `auth_safe` holds the exact content octets of the `data` ContentInfo;
/// the MAC is computed over these bytes.
#[derive(Debug, Clone)]
pub struct Pfx {
    pub auth_safe: Vec<u8>,
    pub mac_data: Option<MacData>,
}

enum AuthSafe {
    Data(Vec<u8>),
    Other(ObjectIdentifier),
}

impl Pfx {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::MissingInput("PKCS#12 bundle"));
        }

        let (version, auth_safe, mac_data) = yasna::parse_ber(data, |r| {
            r.read_sequence(|r| {
                let version = r.next().read_u32()?;
                let auth_safe = r.next().read_sequence(|r| {
                    let content_type = r.next().read_oid()?;
                    if content_type == oid(algorithm::DATA) {
                        let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                        Ok(AuthSafe::Data(data))
                    } else {
                        let _content = r.read_optional(|r| r.read_der())?;
                        Ok(AuthSafe::Other(content_type))
                    }
                })?;
                let mac_data = r.read_optional(MacData::parse)?;
                Ok((version, auth_safe, mac_data))
            })
        })
        .map_err(|e| Error::Malformed(format!("failed to parse PKCS#12 PFX: {e}")))?;

        if version != 3 {
            return Err(Error::Malformed(format!("unsupported PFX version {version}")));
        }
        let auth_safe = match auth_safe {
            AuthSafe::Data(data) => data,
            AuthSafe::Other(content_type) => {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "public-key integrity mode (authSafe content type {content_type})"
                )))
            }
        };
        log::trace!(
            "PFX: {} byte authSafe, MAC {}",
            auth_safe.len(),
            if mac_data.is_some() { "present" } else { "absent" }
        );
        Ok(Self {
            auth_safe,
            mac_data,
        })
    }

    pub fn content_infos(&self) -> Result<Vec<ContentInfo>> {
        parse_authenticated_safe(&self.auth_safe)
            .map_err(|e| Error::Malformed(format!("failed to parse authSafe contents: {e}")))
    }

    pub fn encode(&self) -> Vec<u8> {
        yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u8(3);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(algorithm::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&self.auth_safe));
                });
                if let Some(mac) = &self.mac_data {
                    mac.write(w.next());
                }
            })
        })
    }
}

/// Map a parse error in decrypted content: garbage after decryption almost
/// always means the wrong key, not a malformed file.
pub(crate) fn decrypted_parse_error(what: &str) -> impl Fn(ASN1Error) -> Error + '_ {
    move |e| Error::Authentication(format!("decrypted {what} does not parse: {e}"))
}
