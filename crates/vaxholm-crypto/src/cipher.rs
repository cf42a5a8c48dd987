#![forbid(unsafe_code)]

//! CBC-mode block ciphers with PKCS#7 padding (AES, 3DES, RC2).

use cipher::{block_padding::Pkcs7, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use vaxholm_core::{Error, Result};
use zeroize::Zeroizing;

#[cfg(feature = "legacy-algorithms")]
use cipher::InnerIvInit;

/// The CBC ciphers a PKCS#12 bundle may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CbcCipher {
    Aes128,
    Aes192,
    Aes256,
    /// Three-key triple DES (EDE3).
    DesEde3,
    /// Two-key triple DES (EDE2), used only by legacy PKCS#12 PBE.
    DesEde2,
    /// RC2 with the given effective key length in bits; the key is
    /// `effective_bits / 8` bytes long.
    Rc2 { effective_bits: u16 },
}

impl CbcCipher {
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 | Self::DesEde2 => 16,
            Self::Aes192 | Self::DesEde3 => 24,
            Self::Aes256 => 32,
            Self::Rc2 { effective_bits } => usize::from(effective_bits) / 8,
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            Self::Aes128 | Self::Aes192 | Self::Aes256 => 16,
            Self::DesEde3 | Self::DesEde2 | Self::Rc2 { .. } => 8,
        }
    }

    /// CBC uses one block of IV.
    pub fn iv_len(self) -> usize {
        self.block_size()
    }

    pub fn name(self) -> String {
        match self {
            Self::Aes128 => "AES-128-CBC".into(),
            Self::Aes192 => "AES-192-CBC".into(),
            Self::Aes256 => "AES-256-CBC".into(),
            Self::DesEde3 => "DES-EDE3-CBC".into(),
            Self::DesEde2 => "DES-EDE2-CBC".into(),
            Self::Rc2 { effective_bits } => format!("RC2-{effective_bits}-CBC"),
        }
    }

    /// Whether this build can run the cipher. 3DES and RC2 need the
    /// `legacy-algorithms` feature.
    pub fn is_available(self) -> bool {
        match self {
            Self::Aes128 | Self::Aes192 | Self::Aes256 => true,
            Self::DesEde3 | Self::DesEde2 | Self::Rc2 { .. } => cfg!(feature = "legacy-algorithms"),
        }
    }

    fn check(self, key: &[u8], iv: &[u8]) -> Result<()> {
        if !self.is_available() {
            log::warn!("{} requested but this build has no legacy-algorithms", self.name());
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} (built without legacy-algorithms)",
                self.name()
            )));
        }
        if key.len() != self.key_len() {
            return Err(Error::Crypto(format!(
                "{}: expected {} byte key, got {}",
                self.name(),
                self.key_len(),
                key.len()
            )));
        }
        if iv.len() != self.iv_len() {
            return Err(Error::Crypto(format!(
                "{}: expected {} byte IV, got {}",
                self.name(),
                self.iv_len(),
                iv.len()
            )));
        }
        Ok(())
    }

    /// Encrypt `plaintext`, appending PKCS#7 padding.
    pub fn encrypt(self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.check(key, iv)?;
        let bs = self.block_size();

        macro_rules! encrypt_with {
            ($c:ty) => {{
                let enc = cbc::Encryptor::<$c>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("{} init: {e}", self.name())))?;
                pad_encrypt(enc, plaintext, bs)
            }};
        }

        match self {
            Self::Aes128 => encrypt_with!(aes::Aes128),
            Self::Aes192 => encrypt_with!(aes::Aes192),
            Self::Aes256 => encrypt_with!(aes::Aes256),
            #[cfg(feature = "legacy-algorithms")]
            Self::DesEde3 => encrypt_with!(des::TdesEde3),
            #[cfg(feature = "legacy-algorithms")]
            Self::DesEde2 => encrypt_with!(des::TdesEde2),
            #[cfg(feature = "legacy-algorithms")]
            Self::Rc2 { effective_bits } => {
                let inner = rc2::Rc2::new_with_eff_key_len(key, usize::from(effective_bits));
                let enc = cbc::Encryptor::inner_iv_slice_init(inner, iv)
                    .map_err(|e| Error::Crypto(format!("{} init: {e}", self.name())))?;
                pad_encrypt(enc, plaintext, bs)
            }
            #[cfg(not(feature = "legacy-algorithms"))]
            _ => Err(Error::UnsupportedAlgorithm(self.name())),
        }
    }

    /// Decrypt `ciphertext` and strip PKCS#7 padding.
    ///
    /// A padding failure is the usual symptom of a wrong key and is
    /// reported as [`Error::Crypto`]; callers decide how to classify it.
    pub fn decrypt(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.check(key, iv)?;
        if ciphertext.is_empty() || ciphertext.len() % self.block_size() != 0 {
            return Err(Error::Crypto(format!(
                "{}: ciphertext length {} is not a positive multiple of the block size",
                self.name(),
                ciphertext.len()
            )));
        }

        macro_rules! decrypt_with {
            ($c:ty) => {{
                let dec = cbc::Decryptor::<$c>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("{} init: {e}", self.name())))?;
                unpad_decrypt(dec, ciphertext, &self.name())
            }};
        }

        match self {
            Self::Aes128 => decrypt_with!(aes::Aes128),
            Self::Aes192 => decrypt_with!(aes::Aes192),
            Self::Aes256 => decrypt_with!(aes::Aes256),
            #[cfg(feature = "legacy-algorithms")]
            Self::DesEde3 => decrypt_with!(des::TdesEde3),
            #[cfg(feature = "legacy-algorithms")]
            Self::DesEde2 => decrypt_with!(des::TdesEde2),
            #[cfg(feature = "legacy-algorithms")]
            Self::Rc2 { effective_bits } => {
                let inner = rc2::Rc2::new_with_eff_key_len(key, usize::from(effective_bits));
                let dec = cbc::Decryptor::inner_iv_slice_init(inner, iv)
                    .map_err(|e| Error::Crypto(format!("{} init: {e}", self.name())))?;
                unpad_decrypt(dec, ciphertext, &self.name())
            }
            #[cfg(not(feature = "legacy-algorithms"))]
            _ => Err(Error::UnsupportedAlgorithm(self.name())),
        }
    }
}

impl std::fmt::Display for CbcCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

fn pad_encrypt<C>(enc: cbc::Encryptor<C>, plaintext: &[u8], bs: usize) -> Result<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher,
{
    let msg_len = plaintext.len();
    // PKCS#7 always adds between 1 and bs bytes.
    let mut buf = vec![0u8; (msg_len / bs + 1) * bs];
    buf[..msg_len].copy_from_slice(plaintext);
    let ct_len = enc
        .encrypt_padded_mut::<Pkcs7>(&mut buf, msg_len)
        .map_err(|e| Error::Crypto(format!("CBC encrypt: {e}")))?
        .len();
    buf.truncate(ct_len);
    Ok(buf)
}

fn unpad_decrypt<C>(
    dec: cbc::Decryptor<C>,
    ciphertext: &[u8],
    name: &str,
) -> Result<Zeroizing<Vec<u8>>>
where
    C: BlockDecryptMut + BlockCipher,
{
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let pt_len = dec
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| {
            log::debug!("{name}: bad padding, {} byte ciphertext", ciphertext.len());
            Error::Crypto(format!("{name}: bad padding after decryption"))
        })?
        .len();
    buf.truncate(pt_len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes256_cbc_known_answer() {
        // NIST SP 800-38A F.2.5, first block, followed by a full padding block.
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let pt = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let ct = CbcCipher::Aes256.encrypt(&key, &iv, &pt).unwrap();
        assert_eq!(ct.len(), 32);
        assert_eq!(hex::encode(&ct[..16]), "f58c4c04d6e5f1ba779eabfb5f7bfbd6");
        let back = CbcCipher::Aes256.decrypt(&key, &iv, &ct).unwrap();
        assert_eq!(back.as_slice(), pt.as_slice());
    }

    #[test]
    fn test_padding_lengths() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        assert_eq!(CbcCipher::Aes128.encrypt(&key, &iv, b"").unwrap().len(), 16);
        assert_eq!(CbcCipher::Aes128.encrypt(&key, &iv, &[0u8; 15]).unwrap().len(), 16);
        assert_eq!(CbcCipher::Aes128.encrypt(&key, &iv, &[0u8; 16]).unwrap().len(), 32);
    }

    #[test]
    fn test_wrong_key_fails_or_garbles() {
        let iv = [0u8; 16];
        let ct = CbcCipher::Aes192.encrypt(&[1u8; 24], &iv, b"attack at dawn").unwrap();
        match CbcCipher::Aes192.decrypt(&[2u8; 24], &iv, &ct) {
            Err(e) => assert!(matches!(e, Error::Crypto(_))),
            Ok(pt) => assert_ne!(pt.as_slice(), b"attack at dawn"),
        }
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let err = CbcCipher::Aes256.encrypt(&[0u8; 16], &[0u8; 16], b"x").unwrap_err();
        assert!(err.to_string().contains("expected 32 byte key"));
        let err = CbcCipher::Aes128.decrypt(&[0u8; 16], &[0u8; 16], &[0u8; 17]).unwrap_err();
        assert!(err.to_string().contains("not a positive multiple"));
        assert!(CbcCipher::Aes128.decrypt(&[0u8; 16], &[0u8; 16], &[]).is_err());
    }

    #[cfg(feature = "legacy-algorithms")]
    #[test]
    fn test_legacy_ciphers_roundtrip() {
        let cases = [
            CbcCipher::DesEde3,
            CbcCipher::DesEde2,
            CbcCipher::Rc2 { effective_bits: 40 },
            CbcCipher::Rc2 { effective_bits: 128 },
        ];
        for c in cases {
            let key = vec![0x5Au8; c.key_len()];
            let iv = vec![0xA5u8; c.iv_len()];
            let ct = c.encrypt(&key, &iv, b"legacy payload").unwrap();
            assert_eq!(ct.len() % 8, 0, "{c}");
            assert_eq!(c.decrypt(&key, &iv, &ct).unwrap().as_slice(), b"legacy payload", "{c}");
        }
    }

    #[cfg(not(feature = "legacy-algorithms"))]
    #[test]
    fn test_legacy_ciphers_unavailable() {
        let err = CbcCipher::DesEde3.encrypt(&[0u8; 24], &[0u8; 8], b"x").unwrap_err();
        assert_eq!(err.kind(), vaxholm_core::ErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn test_key_lengths() {
        assert_eq!(CbcCipher::Rc2 { effective_bits: 40 }.key_len(), 5);
        assert_eq!(CbcCipher::DesEde2.key_len(), 16);
        assert_eq!(CbcCipher::Aes192.iv_len(), 16);
        assert_eq!(CbcCipher::DesEde3.iv_len(), 8);
    }
}
