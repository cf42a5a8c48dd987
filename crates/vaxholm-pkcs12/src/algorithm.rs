#![forbid(unsafe_code)]

//! Password-based encryption and integrity algorithm identifiers.
//!
//! Parsing is lenient about *which* algorithm appears: an unknown OID is kept
//! as [`EncryptionScheme::Unsupported`] / [`MacAlgorithm::Unsupported`] and
//! only rejected when used. It is strict about *structure*: malformed
//! parameters are ASN.1 errors.

use vaxholm_core::algorithm::{self, oid};
use vaxholm_core::{Error, Result};
use vaxholm_crypto::{CbcCipher, CryptoProvider, DigestAlgorithm};
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, ASN1Result, BERReader, DERWriter};

/// Iteration counts above this are refused rather than computed.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// PBKDF2 `keyLength` above this is refused: no supported cipher key or
/// HMAC key is longer than a SHA-512 block of output.
pub const MAX_KEY_LENGTH: u32 = 64;

/// Salts shorter than this are lengthened when refreshed.
const MIN_SALT_LEN: usize = 8;

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

fn check_iterations(n: u32) -> ASN1Result<u32> {
    if n == 0 || n > MAX_ITERATIONS {
        log::debug!("iteration count {n} out of range");
        return Err(invalid());
    }
    Ok(n)
}

fn check_key_length(n: u32) -> ASN1Result<u32> {
    if n == 0 || n > MAX_KEY_LENGTH {
        log::debug!("PBKDF2 keyLength {n} out of range");
        return Err(invalid());
    }
    Ok(n)
}

// ── AlgorithmIdentifier ──────────────────────────────────────────────

/// An AlgorithmIdentifier with its parameters kept as raw encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub oid: ObjectIdentifier,
    pub params: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn parse(r: BERReader) -> ASN1Result<Self> {
        r.read_sequence(|r| {
            let oid = r.next().read_oid()?;
            let params = r.read_optional(|r| r.read_der())?;
            Ok(Self { oid, params })
        })
    }

    pub fn write(&self, w: DERWriter) {
        w.write_sequence(|w| {
            w.next().write_oid(&self.oid);
            if let Some(params) = &self.params {
                w.next().write_der(params);
            }
        })
    }

    fn params(&self) -> ASN1Result<&[u8]> {
        self.params.as_deref().ok_or_else(invalid)
    }

    /// Hash and HMAC identifiers take absent or NULL parameters only.
    fn check_null_params(&self) -> ASN1Result<()> {
        match self.params.as_deref() {
            None | Some([0x05, 0x00]) => Ok(()),
            Some(_) => Err(invalid()),
        }
    }
}

/// `SEQUENCE { hmacWithSHAxxx, NULL }`, the form OpenSSL writes.
fn write_hmac_algorithm(w: DERWriter, prf: DigestAlgorithm) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(prf.hmac_oid()));
        w.next().write_null();
    })
}

// ── PKCS#12 v1 PBE ───────────────────────────────────────────────────

/// The `pbeWithSHAAnd*` schemes of RFC 7292 Appendix C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pkcs12Pbe {
    Rc4_128,
    Rc4_40,
    DesEde3,
    DesEde2,
    Rc2_128,
    Rc2_40,
}

impl Pkcs12Pbe {
    const ALL: [Self; 6] = [
        Self::Rc4_128,
        Self::Rc4_40,
        Self::DesEde3,
        Self::DesEde2,
        Self::Rc2_128,
        Self::Rc2_40,
    ];

    pub fn oid(self) -> &'static [u64] {
        match self {
            Self::Rc4_128 => algorithm::PBE_SHA1_RC4_128,
            Self::Rc4_40 => algorithm::PBE_SHA1_RC4_40,
            Self::DesEde3 => algorithm::PBE_SHA1_3DES,
            Self::DesEde2 => algorithm::PBE_SHA1_2DES,
            Self::Rc2_128 => algorithm::PBE_SHA1_RC2_128,
            Self::Rc2_40 => algorithm::PBE_SHA1_RC2_40,
        }
    }

    pub fn from_oid(id: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|p| *id == oid(p.oid()))
    }

    /// The CBC cipher behind the scheme; `None` for the RC4 stream ciphers,
    /// which are recognised but not implemented.
    pub fn cipher(self) -> Option<CbcCipher> {
        match self {
            Self::Rc4_128 | Self::Rc4_40 => None,
            Self::DesEde3 => Some(CbcCipher::DesEde3),
            Self::DesEde2 => Some(CbcCipher::DesEde2),
            Self::Rc2_128 => Some(CbcCipher::Rc2 { effective_bits: 128 }),
            Self::Rc2_40 => Some(CbcCipher::Rc2 { effective_bits: 40 }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rc4_128 => "pbeWithSHAAnd128BitRC4",
            Self::Rc4_40 => "pbeWithSHAAnd40BitRC4",
            Self::DesEde3 => "pbeWithSHAAnd3-KeyTripleDES-CBC",
            Self::DesEde2 => "pbeWithSHAAnd2-KeyTripleDES-CBC",
            Self::Rc2_128 => "pbeWithSHAAnd128BitRC2-CBC",
            Self::Rc2_40 => "pbewithSHAAnd40BitRC2-CBC",
        }
    }
}

// ── PBKDF2 ───────────────────────────────────────────────────────────

/// `PBKDF2-params` (RFC 8018 A.2) restricted to what can be computed:
/// a specified salt and an HMAC PRF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub key_length: Option<u32>,
    pub prf: DigestAlgorithm,
}

impl Pbkdf2Params {
    /// Parse a key derivation AlgorithmIdentifier.
    ///
    /// `Ok(None)` means well-formed but not computable here: a KDF other
    /// than PBKDF2, an `otherSource` salt, or an unknown PRF.
    fn from_algorithm(alg: &AlgorithmIdentifier) -> ASN1Result<Option<Self>> {
        if alg.oid != oid(algorithm::PBKDF2) {
            return Ok(None);
        }
        yasna::parse_ber(alg.params()?, |r| {
            r.read_sequence(|r| {
                let salt_field = r.next().read_der()?;
                let iterations = check_iterations(r.next().read_u32()?)?;

                // keyLength INTEGER OPTIONAL, prf AlgorithmIdentifier DEFAULT hmacWithSHA1
                let mut key_length = None;
                let mut prf = Some(DigestAlgorithm::Sha1);
                while let Some(field) = r.read_optional(|r| r.read_der())? {
                    match field.first() {
                        Some(0x02) => {
                            let len = yasna::parse_ber(&field, |r| r.read_u32())?;
                            key_length = Some(check_key_length(len)?);
                        }
                        Some(0x30) => {
                            let prf_alg = yasna::parse_ber(&field, AlgorithmIdentifier::parse)?;
                            prf_alg.check_null_params()?;
                            prf = DigestAlgorithm::from_hmac_oid(&prf_alg.oid);
                        }
                        _ => return Err(invalid()),
                    }
                }

                let salt = match salt_field.first() {
                    Some(0x04) | Some(0x24) => yasna::parse_ber(&salt_field, |r| r.read_bytes())?,
                    _ => return Ok(None),
                };
                Ok(prf.map(|prf| Self {
                    salt,
                    iterations,
                    key_length,
                    prf,
                }))
            })
        })
    }

    /// Write the full `{ id-PBKDF2, PBKDF2-params }` AlgorithmIdentifier.
    fn write_algorithm(&self, w: DERWriter) {
        w.write_sequence(|w| {
            w.next().write_oid(&oid(algorithm::PBKDF2));
            w.next().write_sequence(|w| {
                w.next().write_bytes(&self.salt);
                w.next().write_u32(self.iterations);
                if let Some(len) = self.key_length {
                    w.next().write_u32(len);
                }
                // hmacWithSHA1 is the DEFAULT and so is omitted in DER.
                if self.prf != DigestAlgorithm::Sha1 {
                    write_hmac_algorithm(w.next(), self.prf);
                }
            });
        })
    }

    fn refreshed(&self, provider: &dyn CryptoProvider) -> Result<Self> {
        Ok(Self {
            salt: provider.random_bytes(self.salt.len().max(MIN_SALT_LEN))?,
            ..self.clone()
        })
    }
}

// ── PBES2 ciphers ────────────────────────────────────────────────────

/// Block ciphers accepted as a PBES2 encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pbes2Cipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    DesEde3Cbc,
}

impl Pbes2Cipher {
    const ALL: [Self; 4] = [
        Self::Aes128Cbc,
        Self::Aes192Cbc,
        Self::Aes256Cbc,
        Self::DesEde3Cbc,
    ];

    pub fn oid(self) -> &'static [u64] {
        match self {
            Self::Aes128Cbc => algorithm::AES_128_CBC,
            Self::Aes192Cbc => algorithm::AES_192_CBC,
            Self::Aes256Cbc => algorithm::AES_256_CBC,
            Self::DesEde3Cbc => algorithm::DES_EDE3_CBC,
        }
    }

    pub fn from_oid(id: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *id == oid(c.oid()))
    }

    pub fn cbc(self) -> CbcCipher {
        match self {
            Self::Aes128Cbc => CbcCipher::Aes128,
            Self::Aes192Cbc => CbcCipher::Aes192,
            Self::Aes256Cbc => CbcCipher::Aes256,
            Self::DesEde3Cbc => CbcCipher::DesEde3,
        }
    }
}

// ── Encryption schemes ───────────────────────────────────────────────

/// How an `encryptedData` safe or a shrouded key bag is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionScheme {
    /// PKCS#12 v1 PBE: PKCS#12 KDF with SHA-1 over the BMP password.
    Pkcs12 {
        pbe: Pkcs12Pbe,
        salt: Vec<u8>,
        iterations: u32,
    },
    /// PBES2: PBKDF2 over the UTF-8 password, then a CBC cipher.
    Pbes2 {
        kdf: Pbkdf2Params,
        cipher: Pbes2Cipher,
        iv: Vec<u8>,
    },
    /// Recognised structurally but not implemented.
    Unsupported {
        algorithm: AlgorithmIdentifier,
        reason: String,
    },
}

impl EncryptionScheme {
    pub fn parse(r: BERReader) -> ASN1Result<Self> {
        let alg = AlgorithmIdentifier::parse(r)?;
        Self::from_algorithm(alg)
    }

    fn from_algorithm(alg: AlgorithmIdentifier) -> ASN1Result<Self> {
        if let Some(pbe) = Pkcs12Pbe::from_oid(&alg.oid) {
            let (salt, iterations) = yasna::parse_ber(alg.params()?, |r| {
                r.read_sequence(|r| {
                    let salt = r.next().read_bytes()?;
                    let iterations = check_iterations(r.next().read_u32()?)?;
                    Ok((salt, iterations))
                })
            })?;
            return Ok(Self::Pkcs12 {
                pbe,
                salt,
                iterations,
            });
        }

        if alg.oid == oid(algorithm::PBES2) {
            let (kdf_alg, enc_alg) = yasna::parse_ber(alg.params()?, |r| {
                r.read_sequence(|r| {
                    let kdf = AlgorithmIdentifier::parse(r.next())?;
                    let enc = AlgorithmIdentifier::parse(r.next())?;
                    Ok((kdf, enc))
                })
            })?;
            let Some(kdf) = Pbkdf2Params::from_algorithm(&kdf_alg)? else {
                let reason = format!("PBES2 key derivation {}", kdf_alg.oid);
                return Ok(Self::Unsupported { algorithm: alg, reason });
            };
            let Some(cipher) = Pbes2Cipher::from_oid(&enc_alg.oid) else {
                let reason = format!("PBES2 encryption scheme {}", enc_alg.oid);
                return Ok(Self::Unsupported { algorithm: alg, reason });
            };
            let iv = yasna::parse_ber(enc_alg.params()?, |r| r.read_bytes())?;
            return Ok(Self::Pbes2 { kdf, cipher, iv });
        }

        let reason = format!("encryption algorithm {}", alg.oid);
        Ok(Self::Unsupported {
            algorithm: alg,
            reason,
        })
    }

    pub fn write(&self, w: DERWriter) {
        match self {
            Self::Pkcs12 {
                pbe,
                salt,
                iterations,
            } => w.write_sequence(|w| {
                w.next().write_oid(&oid(pbe.oid()));
                w.next().write_sequence(|w| {
                    w.next().write_bytes(salt);
                    w.next().write_u32(*iterations);
                });
            }),
            Self::Pbes2 { kdf, cipher, iv } => w.write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::PBES2));
                w.next().write_sequence(|w| {
                    kdf.write_algorithm(w.next());
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(cipher.oid()));
                        w.next().write_bytes(iv);
                    });
                });
            }),
            Self::Unsupported { algorithm, .. } => algorithm.write(w),
        }
    }

    /// A PBES2 scheme with fresh random salt and IV.
    pub fn new_pbes2(
        provider: &dyn CryptoProvider,
        cipher: Pbes2Cipher,
        prf: DigestAlgorithm,
        iterations: u32,
        salt_len: usize,
    ) -> Result<Self> {
        Ok(Self::Pbes2 {
            kdf: Pbkdf2Params {
                salt: provider.random_bytes(salt_len)?,
                iterations,
                key_length: None,
                prf,
            },
            cipher,
            iv: provider.random_bytes(cipher.cbc().iv_len())?,
        })
    }

    /// Same family, cipher and iteration count; fresh salt and IV.
    pub fn refreshed(&self, provider: &dyn CryptoProvider) -> Result<Self> {
        match self {
            Self::Pkcs12 {
                pbe,
                salt,
                iterations,
            } => Ok(Self::Pkcs12 {
                pbe: *pbe,
                salt: provider.random_bytes(salt.len().max(MIN_SALT_LEN))?,
                iterations: *iterations,
            }),
            Self::Pbes2 { kdf, cipher, .. } => Ok(Self::Pbes2 {
                kdf: kdf.refreshed(provider)?,
                cipher: *cipher,
                iv: provider.random_bytes(cipher.cbc().iv_len())?,
            }),
            Self::Unsupported { reason, .. } => Err(Error::UnsupportedAlgorithm(reason.clone())),
        }
    }

    pub fn iterations(&self) -> Option<u32> {
        match self {
            Self::Pkcs12 { iterations, .. } => Some(*iterations),
            Self::Pbes2 { kdf, .. } => Some(kdf.iterations),
            Self::Unsupported { .. } => None,
        }
    }

    /// Whether the scheme relies on 3DES, RC2 or RC4.
    pub fn is_legacy(&self) -> bool {
        match self {
            Self::Pkcs12 { .. } => true,
            Self::Pbes2 { cipher, .. } => *cipher == Pbes2Cipher::DesEde3Cbc,
            Self::Unsupported { .. } => false,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Pkcs12 { pbe, .. } => pbe.name().to_string(),
            Self::Pbes2 { kdf, cipher, .. } => {
                format!("PBES2(PBKDF2-HMAC-{}, {})", kdf.prf, cipher.cbc())
            }
            Self::Unsupported { reason, .. } => format!("unsupported {reason}"),
        }
    }
}

// ── MAC ──────────────────────────────────────────────────────────────

/// The integrity algorithm named in `MacData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacAlgorithm {
    /// Classic PKCS#12 MAC: HMAC keyed by the PKCS#12 KDF.
    Pkcs12Kdf(DigestAlgorithm),
    /// RFC 9579: HMAC keyed by PBKDF2.
    Pbmac1 {
        kdf: Pbkdf2Params,
        hmac: DigestAlgorithm,
    },
    Unsupported {
        algorithm: AlgorithmIdentifier,
        reason: String,
    },
}

impl MacAlgorithm {
    fn from_algorithm(alg: AlgorithmIdentifier) -> ASN1Result<Self> {
        if let Some(digest) = DigestAlgorithm::from_digest_oid(&alg.oid) {
            alg.check_null_params()?;
            return Ok(Self::Pkcs12Kdf(digest));
        }

        if alg.oid == oid(algorithm::PBMAC1) {
            let (kdf_alg, scheme_alg) = yasna::parse_ber(alg.params()?, |r| {
                r.read_sequence(|r| {
                    let kdf = AlgorithmIdentifier::parse(r.next())?;
                    let scheme = AlgorithmIdentifier::parse(r.next())?;
                    Ok((kdf, scheme))
                })
            })?;
            let kdf = Pbkdf2Params::from_algorithm(&kdf_alg)?;
            scheme_alg.check_null_params()?;
            let hmac = DigestAlgorithm::from_hmac_oid(&scheme_alg.oid);
            return Ok(match (kdf, hmac) {
                // RFC 9579 makes keyLength mandatory.
                (Some(kdf), Some(hmac)) if kdf.key_length.is_some() => Self::Pbmac1 { kdf, hmac },
                _ => Self::Unsupported {
                    algorithm: alg,
                    reason: "PBMAC1 parameters".into(),
                },
            });
        }

        let reason = format!("MAC digest {}", alg.oid);
        Ok(Self::Unsupported {
            algorithm: alg,
            reason,
        })
    }

    fn write(&self, w: DERWriter) {
        match self {
            Self::Pkcs12Kdf(digest) => w.write_sequence(|w| {
                w.next().write_oid(&oid(digest.digest_oid()));
                w.next().write_null();
            }),
            Self::Pbmac1 { kdf, hmac } => w.write_sequence(|w| {
                w.next().write_oid(&oid(algorithm::PBMAC1));
                w.next().write_sequence(|w| {
                    kdf.write_algorithm(w.next());
                    write_hmac_algorithm(w.next(), *hmac);
                });
            }),
            Self::Unsupported { algorithm, .. } => algorithm.write(w),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Pkcs12Kdf(digest) => format!("HMAC-{digest} (PKCS#12 KDF)"),
            Self::Pbmac1 { kdf, hmac } => format!("PBMAC1(PBKDF2-HMAC-{}, HMAC-{hmac})", kdf.prf),
            Self::Unsupported { reason, .. } => format!("unsupported {reason}"),
        }
    }
}

/// `MacData` (RFC 7292 section 4).
///
/// For PBMAC1 the `salt` and `iterations` fields duplicate the PBKDF2
/// parameters, as OpenSSL writes them; only the PBKDF2 values are used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacData {
    pub algorithm: MacAlgorithm,
    pub digest: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl MacData {
    pub fn parse(r: BERReader) -> ASN1Result<Self> {
        r.read_sequence(|r| {
            let (alg, digest) = r.next().read_sequence(|r| {
                let alg = AlgorithmIdentifier::parse(r.next())?;
                let digest = r.next().read_bytes()?;
                Ok((alg, digest))
            })?;
            let salt = r.next().read_bytes()?;
            let iterations = match r.read_optional(|r| r.read_u32())? {
                Some(n) => check_iterations(n)?,
                None => 1,
            };
            Ok(Self {
                algorithm: MacAlgorithm::from_algorithm(alg)?,
                digest,
                salt,
                iterations,
            })
        })
    }

    pub fn write(&self, w: DERWriter) {
        w.write_sequence(|w| {
            w.next().write_sequence(|w| {
                self.algorithm.write(w.next());
                w.next().write_bytes(&self.digest);
            });
            w.next().write_bytes(&self.salt);
            // iterations INTEGER DEFAULT 1
            if self.iterations != 1 {
                w.next().write_u32(self.iterations);
            }
        })
    }

    /// An unsigned classic PKCS#12 MAC with a fresh salt.
    pub fn new_pkcs12(
        provider: &dyn CryptoProvider,
        digest: DigestAlgorithm,
        iterations: u32,
        salt_len: usize,
    ) -> Result<Self> {
        Ok(Self {
            algorithm: MacAlgorithm::Pkcs12Kdf(digest),
            digest: Vec::new(),
            salt: provider.random_bytes(salt_len)?,
            iterations,
        })
    }

    /// An unsigned PBMAC1 MAC with a fresh salt.
    pub fn new_pbmac1(
        provider: &dyn CryptoProvider,
        prf: DigestAlgorithm,
        hmac: DigestAlgorithm,
        iterations: u32,
        salt_len: usize,
    ) -> Result<Self> {
        let salt = provider.random_bytes(salt_len)?;
        Ok(Self {
            algorithm: MacAlgorithm::Pbmac1 {
                kdf: Pbkdf2Params {
                    salt: salt.clone(),
                    iterations,
                    key_length: Some(hmac.output_size() as u32),
                    prf,
                },
                hmac,
            },
            digest: Vec::new(),
            salt,
            iterations,
        })
    }

    /// Same algorithm and iteration count, fresh salt, digest cleared.
    pub fn refreshed(&self, provider: &dyn CryptoProvider) -> Result<Self> {
        match &self.algorithm {
            MacAlgorithm::Pkcs12Kdf(_) => Ok(Self {
                algorithm: self.algorithm.clone(),
                digest: Vec::new(),
                salt: provider.random_bytes(self.salt.len().max(MIN_SALT_LEN))?,
                iterations: self.iterations,
            }),
            MacAlgorithm::Pbmac1 { kdf, hmac } => {
                let kdf = kdf.refreshed(provider)?;
                Ok(Self {
                    salt: kdf.salt.clone(),
                    iterations: kdf.iterations,
                    algorithm: MacAlgorithm::Pbmac1 { kdf, hmac: *hmac },
                    digest: Vec::new(),
                })
            }
            MacAlgorithm::Unsupported { reason, .. } => {
                Err(Error::UnsupportedAlgorithm(reason.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaxholm_crypto::RustCryptoProvider;

    fn roundtrip_scheme(scheme: &EncryptionScheme) -> EncryptionScheme {
        let der = yasna::construct_der(|w| scheme.write(w));
        yasna::parse_der(&der, EncryptionScheme::parse).unwrap()
    }

    #[test]
    fn test_pbes2_openssl_encoding() {
        // AlgorithmIdentifier from an OpenSSL 3 bundle: PBES2, PBKDF2 with a
        // 16-byte salt, 2048 iterations, hmacWithSHA256, AES-256-CBC.
        let der = hex::decode(
            "305f06092a864886f70d01050d3052303106092a864886f70d01050c3024\
             04107e39015fa52f607ee5e8ce8da346eee502020800300c06082a864886\
             f70d02090500301d060960864801650304012a0410658ba6e610b906a008\
             13054b6535f66e",
        )
        .unwrap();
        let scheme = yasna::parse_der(&der, EncryptionScheme::parse).unwrap();
        match &scheme {
            EncryptionScheme::Pbes2 { kdf, cipher, iv } => {
                assert_eq!(kdf.iterations, 2048);
                assert_eq!(kdf.salt.len(), 16);
                assert_eq!(kdf.prf, DigestAlgorithm::Sha256);
                assert_eq!(kdf.key_length, None);
                assert_eq!(*cipher, Pbes2Cipher::Aes256Cbc);
                assert_eq!(hex::encode(iv), "658ba6e610b906a00813054b6535f66e");
            }
            other => panic!("unexpected scheme {other:?}"),
        }
        // Our encoder writes the same bytes back.
        assert_eq!(yasna::construct_der(|w| scheme.write(w)), der);
        assert_eq!(scheme.name(), "PBES2(PBKDF2-HMAC-SHA-256, AES-256-CBC)");
    }

    #[test]
    fn test_pkcs12_pbe_and_unknown() {
        let scheme = EncryptionScheme::Pkcs12 {
            pbe: Pkcs12Pbe::Rc2_40,
            salt: vec![1; 8],
            iterations: 2048,
        };
        assert_eq!(roundtrip_scheme(&scheme), scheme);
        assert!(scheme.is_legacy());

        // An unknown algorithm survives parsing and re-encoding.
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_oid(&ObjectIdentifier::from_slice(&[1, 2, 3, 4]));
                w.next().write_bytes(b"opaque");
            })
        });
        let scheme = yasna::parse_der(&der, EncryptionScheme::parse).unwrap();
        assert!(matches!(scheme, EncryptionScheme::Unsupported { .. }));
        assert_eq!(yasna::construct_der(|w| scheme.write(w)), der);
        assert!(scheme.refreshed(&RustCryptoProvider).is_err());
    }

    #[test]
    fn test_rejects_zero_and_huge_iterations() {
        for n in [0u32, MAX_ITERATIONS + 1] {
            let der = yasna::construct_der(|w| {
                w.write_sequence(|w| {
                    w.next().write_oid(&oid(algorithm::PBE_SHA1_3DES));
                    w.next().write_sequence(|w| {
                        w.next().write_bytes(&[0u8; 8]);
                        w.next().write_u32(n);
                    });
                })
            });
            assert!(yasna::parse_der(&der, EncryptionScheme::parse).is_err(), "{n}");
        }
    }

    fn pbmac1_mac_data(key_length: u32) -> Vec<u8> {
        let sha256 = DigestAlgorithm::Sha256;
        let mac = MacData::new_pbmac1(&RustCryptoProvider, sha256, sha256, 2048, 16).unwrap();
        let MacAlgorithm::Pbmac1 { mut kdf, hmac } = mac.algorithm.clone() else {
            panic!("unexpected MAC {:?}", mac.algorithm);
        };
        kdf.key_length = Some(key_length);
        let mac = MacData {
            algorithm: MacAlgorithm::Pbmac1 { kdf, hmac },
            ..mac
        };
        yasna::construct_der(|w| mac.write(w))
    }

    #[test]
    fn test_rejects_out_of_range_pbmac1_key_length() {
        assert!(yasna::parse_der(&pbmac1_mac_data(32), MacData::parse).is_ok());
        assert!(yasna::parse_der(&pbmac1_mac_data(MAX_KEY_LENGTH), MacData::parse).is_ok());
        for len in [0u32, MAX_KEY_LENGTH + 1, 65_536, u32::MAX] {
            assert!(yasna::parse_der(&pbmac1_mac_data(len), MacData::parse).is_err(), "{len}");
        }
    }

    #[test]
    fn test_rejects_out_of_range_pbes2_key_length() {
        let p = RustCryptoProvider;
        let scheme = EncryptionScheme::new_pbes2(
            &p,
            Pbes2Cipher::Aes256Cbc,
            DigestAlgorithm::Sha256,
            2048,
            16,
        )
        .unwrap();
        for len in [0u32, 1_048_576] {
            let mut scheme = scheme.clone();
            if let EncryptionScheme::Pbes2 { kdf, .. } = &mut scheme {
                kdf.key_length = Some(len);
            }
            let der = yasna::construct_der(|w| scheme.write(w));
            assert!(yasna::parse_der(&der, EncryptionScheme::parse).is_err(), "{len}");
        }
    }

    #[test]
    fn test_pbes2_unknown_prf_is_unsupported() {
        let scheme = EncryptionScheme::new_pbes2(
            &RustCryptoProvider,
            Pbes2Cipher::Aes128Cbc,
            DigestAlgorithm::Sha512,
            1000,
            16,
        )
        .unwrap();
        let mut der = yasna::construct_der(|w| scheme.write(w));
        // Swap hmacWithSHA512 (..02 0b) for an unassigned arc (..02 0e).
        let pos = der
            .windows(9)
            .position(|w| w == [0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02])
            .unwrap();
        der[pos + 9] = 0x0e;
        let parsed = yasna::parse_der(&der, EncryptionScheme::parse).unwrap();
        assert!(matches!(parsed, EncryptionScheme::Unsupported { .. }));
    }

    #[test]
    fn test_refresh_keeps_family() {
        let p = RustCryptoProvider;
        let scheme = EncryptionScheme::new_pbes2(
            &p,
            Pbes2Cipher::Aes256Cbc,
            DigestAlgorithm::Sha256,
            4096,
            16,
        )
        .unwrap();
        let fresh = scheme.refreshed(&p).unwrap();
        match (&scheme, &fresh) {
            (
                EncryptionScheme::Pbes2 { kdf: a, cipher: ca, iv: ia },
                EncryptionScheme::Pbes2 { kdf: b, cipher: cb, iv: ib },
            ) => {
                assert_eq!(ca, cb);
                assert_eq!(a.iterations, b.iterations);
                assert_eq!(a.prf, b.prf);
                assert_ne!(a.salt, b.salt);
                assert_ne!(ia, ib);
            }
            _ => panic!("family changed"),
        }
    }

    #[test]
    fn test_mac_data_pbmac1_openssl_encoding() {
        // MacData from an OpenSSL 3.5 `-pbmac1_pbkdf2` bundle.
        let der = hex::decode(
            "307d306d304906092a864886f70d01050e303c302c06092a864886f70d01\
             050c301f0408db5005de72664d9d02020800020120300c06082a864886f7\
             0d02090500300c06082a864886f70d020905000420e117b29224c444d0a1\
             ccb7d88ce4084a20027ccbab052b657d33bdd2cf471acc0408db5005de72\
             664d9d02020800",
        )
        .unwrap();
        let mac = yasna::parse_der(&der, MacData::parse).unwrap();
        match &mac.algorithm {
            MacAlgorithm::Pbmac1 { kdf, hmac } => {
                assert_eq!(*hmac, DigestAlgorithm::Sha256);
                assert_eq!(kdf.prf, DigestAlgorithm::Sha256);
                assert_eq!(kdf.key_length, Some(32));
                assert_eq!(kdf.iterations, 2048);
                assert_eq!(kdf.salt, mac.salt);
            }
            other => panic!("unexpected MAC {other:?}"),
        }
        assert_eq!(mac.iterations, 2048);
        assert_eq!(yasna::construct_der(|w| mac.write(w)), der);
    }

    #[test]
    fn test_pbmac1_refresh_keeps_salts_in_step() {
        let p = RustCryptoProvider;
        let mac =
            MacData::new_pbmac1(&p, DigestAlgorithm::Sha256, DigestAlgorithm::Sha256, 2048, 16)
                .unwrap();
        let fresh = mac.refreshed(&p).unwrap();
        assert_ne!(fresh.salt, mac.salt);
        match &fresh.algorithm {
            MacAlgorithm::Pbmac1 { kdf, .. } => assert_eq!(kdf.salt, fresh.salt),
            other => panic!("unexpected MAC {other:?}"),
        }
    }

    #[test]
    fn test_mac_digest_rejects_parameters() {
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(algorithm::SHA256));
                        w.next().write_bytes(&[]);
                    });
                    w.next().write_bytes(&[0u8; 32]);
                });
                w.next().write_bytes(&[9u8; 8]);
                w.next().write_u32(2048);
            })
        });
        assert!(yasna::parse_der(&der, MacData::parse).is_err());
    }

    #[test]
    fn test_mac_data_default_iterations() {
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(algorithm::SHA1));
                        w.next().write_null();
                    });
                    w.next().write_bytes(&[0u8; 20]);
                });
                w.next().write_bytes(&[9u8; 8]);
            })
        });
        let mac = yasna::parse_der(&der, MacData::parse).unwrap();
        assert_eq!(mac.iterations, 1);
        assert_eq!(mac.algorithm, MacAlgorithm::Pkcs12Kdf(DigestAlgorithm::Sha1));
        assert_eq!(yasna::construct_der(|w| mac.write(w)), der);
    }
}
