#![forbid(unsafe_code)]

//! Password-based encryption of safes and shrouded keys.
//!
//! PKCS#12 v1 PBE derives key and IV with the PKCS#12 KDF (SHA-1) from the
//! BMPString password. PBES2 runs PBKDF2 over the UTF-8 password and takes
//! the IV from the algorithm parameters.

use vaxholm_core::{Error, Result};
use vaxholm_crypto::{password_to_bmp, CbcCipher, CryptoProvider, DigestAlgorithm, KdfPurpose};
use zeroize::Zeroizing;

use crate::algorithm::EncryptionScheme;

/// A password in both encodings PKCS#12 needs.
#[derive(Clone)]
pub struct Password {
    utf8: Zeroizing<String>,
    bmp: Zeroizing<Vec<u8>>,
}

impl Password {
    pub fn new(password: &str) -> Self {
        Self {
            utf8: Zeroizing::new(password.to_owned()),
            bmp: password_to_bmp(password),
        }
    }

    /// For the empty password, the zero-length BMP encoding some producers
    /// use in place of `00 00`.
    pub(crate) fn empty_bmp_variant(&self) -> Option<Self> {
        if !self.utf8.is_empty() {
            return None;
        }
        Some(Self {
            utf8: self.utf8.clone(),
            bmp: Zeroizing::new(Vec::new()),
        })
    }

    pub fn utf8(&self) -> &[u8] {
        self.utf8.as_bytes()
    }

    pub fn bmp(&self) -> &[u8] {
        &self.bmp
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

struct Derived {
    cipher: CbcCipher,
    key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
}

fn derive(
    provider: &dyn CryptoProvider,
    scheme: &EncryptionScheme,
    password: &Password,
) -> Result<Derived> {
    match scheme {
        EncryptionScheme::Pkcs12 {
            pbe,
            salt,
            iterations,
        } => {
            let cipher = pbe
                .cipher()
                .ok_or_else(|| Error::UnsupportedAlgorithm(pbe.name().to_string()))?;
            if !cipher.is_available() {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "{} (built without legacy-algorithms)",
                    pbe.name()
                )));
            }
            log::warn!("legacy PKCS#12 encryption {}", pbe.name());
            let key = provider.pkcs12_kdf(
                DigestAlgorithm::Sha1,
                KdfPurpose::Key,
                password.bmp(),
                salt,
                *iterations,
                cipher.key_len(),
            )?;
            let iv = provider.pkcs12_kdf(
                DigestAlgorithm::Sha1,
                KdfPurpose::Iv,
                password.bmp(),
                salt,
                *iterations,
                cipher.iv_len(),
            )?;
            Ok(Derived {
                cipher,
                key,
                iv: iv.to_vec(),
            })
        }
        EncryptionScheme::Pbes2 { kdf, cipher, iv } => {
            let cipher = cipher.cbc();
            if !cipher.is_available() {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "{} (built without legacy-algorithms)",
                    cipher.name()
                )));
            }
            let key_len = kdf.key_length.map_or(cipher.key_len(), |len| len as usize);
            if key_len != cipher.key_len() {
                return Err(Error::Malformed(format!(
                    "PBES2 keyLength {key_len} does not fit {cipher}"
                )));
            }
            if iv.len() != cipher.iv_len() {
                return Err(Error::Malformed(format!(
                    "PBES2 IV of {} bytes does not fit {cipher}",
                    iv.len()
                )));
            }
            if scheme.is_legacy() {
                log::warn!("legacy PBES2 cipher {cipher}");
            }
            let key =
                provider.pbkdf2(kdf.prf, password.utf8(), &kdf.salt, kdf.iterations, key_len)?;
            Ok(Derived {
                cipher,
                key,
                iv: iv.clone(),
            })
        }
        EncryptionScheme::Unsupported { reason, .. } => {
            Err(Error::UnsupportedAlgorithm(reason.clone()))
        }
    }
}

/// Decrypt `ciphertext` under `scheme`.
///
/// A padding failure is reported as [`Error::Authentication`]: with a CBC
/// cipher it is what a wrong password looks like.
pub fn decrypt(
    provider: &dyn CryptoProvider,
    scheme: &EncryptionScheme,
    ciphertext: &[u8],
    password: &Password,
) -> Result<Zeroizing<Vec<u8>>> {
    let d = derive(provider, scheme, password)?;
    log::trace!("decrypting {} bytes with {}", ciphertext.len(), scheme.name());
    provider
        .decrypt(d.cipher, &d.key, &d.iv, ciphertext)
        .map_err(|e| match e {
            Error::Crypto(msg) => Error::Authentication(msg),
            other => other,
        })
}

/// Encrypt `plaintext` under `scheme`.
pub fn encrypt(
    provider: &dyn CryptoProvider,
    scheme: &EncryptionScheme,
    plaintext: &[u8],
    password: &Password,
) -> Result<Vec<u8>> {
    let d = derive(provider, scheme, password)?;
    log::trace!("encrypting {} bytes with {}", plaintext.len(), scheme.name());
    provider.encrypt(d.cipher, &d.key, &d.iv, plaintext)
}
