#![forbid(unsafe_code)]

//! The decrypted bundle model.
//!
//! [`Bundle::open`] turns PFX bytes into plaintext bags, keeping the
//! encryption scheme of every safe and shrouded key so the bundle can be
//! written back with the same algorithms. [`Bundle::seal`] is the inverse.

use vaxholm_core::{Error, Result};
use vaxholm_crypto::CryptoProvider;
use vaxholm_keys::{parse_certificate, validate_pkcs8, CertificateInfo};
use yasna::models::ObjectIdentifier;
use zeroize::Zeroizing;

use crate::algorithm::{EncryptionScheme, MacData};
use crate::pbe::{self, Password};
use crate::pfx::{
    self, decrypted_parse_error, encode_authenticated_safe, encode_safe_contents,
    parse_safe_contents, Attribute, ContentInfo, Pfx, SafeBag, SafeBagKind,
};
use crate::profile::Profile;

#[derive(Debug, Clone)]
pub enum BagContent {
    /// PKCS#8 `PrivateKeyInfo`. `shrouding` is `None` for a plain `keyBag`.
    PrivateKey {
        pkcs8: Zeroizing<Vec<u8>>,
        shrouding: Option<EncryptionScheme>,
    },
    /// DER X.509 certificate.
    Certificate(Vec<u8>),
    Other {
        bag_type: ObjectIdentifier,
        value: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub struct Bag {
    pub content: BagContent,
    pub attributes: Vec<Attribute>,
}

impl Bag {
    pub fn certificate(&self) -> Option<&[u8]> {
        match &self.content {
            BagContent::Certificate(der) => Some(der.as_slice()),
            _ => None,
        }
    }

    pub fn private_key(&self) -> Option<&[u8]> {
        match &self.content {
            BagContent::PrivateKey { pkcs8, .. } => Some(pkcs8.as_slice()),
            _ => None,
        }
    }

    pub fn friendly_name(&self) -> Option<String> {
        pfx::friendly_name(&self.attributes)
    }

    pub fn local_key_id(&self) -> Option<Vec<u8>> {
        pfx::local_key_id(&self.attributes)
    }

    fn decrypt(
        provider: &dyn CryptoProvider,
        bag: SafeBag,
        password: &Password,
    ) -> Result<Self> {
        let content = match bag.kind {
            SafeBagKind::Key(pkcs8) => {
                validate_pkcs8(&pkcs8)?;
                BagContent::PrivateKey {
                    pkcs8,
                    shrouding: None,
                }
            }
            SafeBagKind::ShroudedKey {
                algorithm,
                ciphertext,
            } => {
                let pkcs8 = pbe::decrypt(provider, &algorithm, &ciphertext, password)?;
                validate_pkcs8(&pkcs8).map_err(|e| {
                    Error::Authentication(format!("decrypted shrouded key is not PKCS#8: {e}"))
                })?;
                BagContent::PrivateKey {
                    pkcs8,
                    shrouding: Some(algorithm),
                }
            }
            SafeBagKind::Certificate(der) => BagContent::Certificate(der),
            SafeBagKind::Other { bag_type, value } => BagContent::Other { bag_type, value },
        };
        Ok(Self {
            content,
            attributes: bag.attributes,
        })
    }

    fn encrypt(&self, provider: &dyn CryptoProvider, password: &Password) -> Result<SafeBag> {
        let kind = match &self.content {
            BagContent::PrivateKey {
                pkcs8,
                shrouding: None,
            } => SafeBagKind::Key(pkcs8.clone()),
            BagContent::PrivateKey {
                pkcs8,
                shrouding: Some(scheme),
            } => SafeBagKind::ShroudedKey {
                algorithm: scheme.clone(),
                ciphertext: pbe::encrypt(provider, scheme, pkcs8, password)?,
            },
            BagContent::Certificate(der) => SafeBagKind::Certificate(der.clone()),
            BagContent::Other { bag_type, value } => SafeBagKind::Other {
                bag_type: bag_type.clone(),
                value: value.clone(),
            },
        };
        Ok(SafeBag {
            kind,
            attributes: self.attributes.clone(),
        })
    }
}

/// One entry of the authenticated safe. `encryption` is `None` for a
/// `data` safe.
#[derive(Debug, Clone)]
pub struct Safe {
    pub encryption: Option<EncryptionScheme>,
    pub bags: Vec<Bag>,
}

/// An opened (fully decrypted and authenticated) PKCS#12 bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub safes: Vec<Safe>,
    pub mac: MacData,
}

enum PendingSafe {
    Plain(Vec<SafeBag>),
    Encrypted {
        algorithm: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
}

impl Bundle {
    /// Parse, authenticate and decrypt `data`.
    ///
    /// All structure outside encrypted content is checked before any key is
    /// derived. Nothing is returned unless the MAC verifies and every
    /// encrypted safe and shrouded key decrypts.
    pub fn open(provider: &dyn CryptoProvider, data: &[u8], password: &str) -> Result<Self> {
        let pfx = Pfx::parse(data)?;

        let mut pending = Vec::new();
        for ci in pfx.content_infos()? {
            pending.push(match ci {
                ContentInfo::Data(data) => PendingSafe::Plain(
                    parse_safe_contents(&data).map_err(|e| {
                        Error::Malformed(format!("failed to parse SafeContents: {e}"))
                    })?,
                ),
                ContentInfo::Encrypted {
                    algorithm,
                    ciphertext,
                } => PendingSafe::Encrypted {
                    algorithm,
                    ciphertext,
                },
                ContentInfo::Other { content_type, .. } => {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "public-key privacy mode (content type {content_type})"
                    )))
                }
            });
        }

        let mac = pfx
            .mac_data
            .ok_or_else(|| Error::UnsupportedAlgorithm("no password integrity MAC".into()))?;
        let password =
            crate::mac::verify(provider, &mac, &pfx.auth_safe, &Password::new(password))?;

        let mut safes = Vec::with_capacity(pending.len());
        for safe in pending {
            let (encryption, raw_bags) = match safe {
                PendingSafe::Plain(bags) => (None, bags),
                PendingSafe::Encrypted {
                    algorithm,
                    ciphertext,
                } => {
                    let plain = pbe::decrypt(provider, &algorithm, &ciphertext, &password)?;
                    let bags = parse_safe_contents(&plain)
                        .map_err(decrypted_parse_error("SafeContents"))?;
                    (Some(algorithm), bags)
                }
            };
            let bags = raw_bags
                .into_iter()
                .map(|bag| Bag::decrypt(provider, bag, &password))
                .collect::<Result<Vec<_>>>()?;
            safes.push(Safe { encryption, bags });
        }

        let bundle = Self { safes, mac };
        log::debug!(
            "opened PKCS#12 bundle: {} safes, {} certificates, {} keys",
            bundle.safes.len(),
            bundle.certificates().count(),
            bundle.private_keys().count()
        );
        Ok(bundle)
    }

    /// Encrypt and encode under `password`, reusing the stored salts and IVs.
    ///
    /// Call [`refreshed`](Self::refreshed) first unless the parameters are
    /// already fresh.
    pub fn seal(&self, provider: &dyn CryptoProvider, password: &str) -> Result<Vec<u8>> {
        let password = Password::new(password);

        let mut contents = Vec::with_capacity(self.safes.len());
        for safe in &self.safes {
            let bags = safe
                .bags
                .iter()
                .map(|bag| bag.encrypt(provider, &password))
                .collect::<Result<Vec<_>>>()?;
            let encoded = Zeroizing::new(encode_safe_contents(&bags));
            contents.push(match &safe.encryption {
                None => ContentInfo::Data(encoded.to_vec()),
                Some(scheme) => ContentInfo::Encrypted {
                    algorithm: scheme.clone(),
                    ciphertext: pbe::encrypt(provider, scheme, &encoded, &password)?,
                },
            });
        }

        let auth_safe = encode_authenticated_safe(&contents);
        let mac = crate::mac::compute(provider, &self.mac, &auth_safe, &password)?;
        Ok(Pfx {
            auth_safe,
            mac_data: Some(mac),
        }
        .encode())
    }

    /// The same bundle with fresh salts and IVs everywhere; algorithms and
    /// iteration counts are kept.
    pub fn refreshed(&self, provider: &dyn CryptoProvider) -> Result<Self> {
        let mut safes = Vec::with_capacity(self.safes.len());
        for safe in &self.safes {
            let encryption = safe
                .encryption
                .as_ref()
                .map(|scheme| scheme.refreshed(provider))
                .transpose()?;
            let mut bags = safe.bags.clone();
            for bag in &mut bags {
                if let BagContent::PrivateKey {
                    shrouding: Some(scheme),
                    ..
                } = &mut bag.content
                {
                    *scheme = scheme.refreshed(provider)?;
                }
            }
            safes.push(Safe { encryption, bags });
        }
        Ok(Self {
            safes,
            mac: self.mac.refreshed(provider)?,
        })
    }

    /// Lay `bags` out the way this crate writes bundles: one encrypted safe
    /// with every non-key bag, then one `data` safe with every private key
    /// shrouded. All parameters come fresh from `profile`.
    pub fn with_profile_layout(
        bags: Vec<Bag>,
        profile: &Profile,
        provider: &dyn CryptoProvider,
    ) -> Result<Self> {
        let mut others = Vec::new();
        let mut keys = Vec::new();
        for mut bag in bags {
            match &mut bag.content {
                BagContent::PrivateKey { shrouding, .. } => {
                    *shrouding = Some(profile.encryption_scheme(provider)?);
                    keys.push(bag);
                }
                _ => others.push(bag),
            }
        }

        let mut safes = Vec::new();
        if !others.is_empty() {
            safes.push(Safe {
                encryption: Some(profile.encryption_scheme(provider)?),
                bags: others,
            });
        }
        if !keys.is_empty() {
            safes.push(Safe {
                encryption: None,
                bags: keys,
            });
        }
        Ok(Self {
            safes,
            mac: profile.mac_template(provider)?,
        })
    }

    pub fn bags(&self) -> impl Iterator<Item = &Bag> {
        self.safes.iter().flat_map(|safe| safe.bags.iter())
    }

    pub fn into_bags(self) -> impl Iterator<Item = Bag> {
        self.safes.into_iter().flat_map(|safe| safe.bags)
    }

    pub fn certificates(&self) -> impl Iterator<Item = &Bag> {
        self.bags().filter(|bag| bag.certificate().is_some())
    }

    pub fn private_keys(&self) -> impl Iterator<Item = &Bag> {
        self.bags().filter(|bag| bag.private_key().is_some())
    }

    /// Pick the end-entity certificate.
    ///
    /// In order: a certificate sharing a `localKeyId` with a key; the first
    /// certificate whose subject issues no other certificate in the bundle,
    /// preferring one that is not self-issued; the first certificate.
    pub fn leaf_certificate(&self) -> Option<&Bag> {
        let certs: Vec<&Bag> = self.certificates().collect();
        let key_ids: Vec<Vec<u8>> = self.private_keys().filter_map(Bag::local_key_id).collect();

        let by_key_id = certs
            .iter()
            .find(|cert| cert.local_key_id().is_some_and(|id| key_ids.contains(&id)));
        if let Some(cert) = by_key_id {
            return Some(*cert);
        }

        let infos: Vec<Option<CertificateInfo>> = certs
            .iter()
            .map(|cert| cert.certificate().and_then(|der| parse_certificate(der).ok()))
            .collect();
        let issues_another = |i: usize, info: &CertificateInfo| {
            infos.iter().enumerate().any(|(j, other)| {
                j != i && other.as_ref().is_some_and(|o| o.issuer == info.subject)
            })
        };
        // A stray self-signed root issues nothing either; only pick one
        // when no end-entity certificate qualifies.
        let mut root_candidate = None;
        for (i, info) in infos.iter().enumerate() {
            let Some(info) = info else { continue };
            if issues_another(i, info) {
                continue;
            }
            if !info.is_self_issued() {
                log::trace!("leaf certificate by chain position: {}", info.subject_display);
                return Some(certs[i]);
            }
            root_candidate.get_or_insert(i);
        }
        if let Some(i) = root_candidate {
            return Some(certs[i]);
        }

        certs.first().copied()
    }

    /// Pick the private key of `leaf`: the key sharing its `localKeyId`,
    /// otherwise the first key.
    pub fn private_key_for(&self, leaf: Option<&Bag>) -> Option<&Bag> {
        if let Some(id) = leaf.and_then(Bag::local_key_id) {
            let matched = self
                .private_keys()
                .find(|key| key.local_key_id().as_deref() == Some(id.as_slice()));
            if matched.is_some() {
                return matched;
            }
        }
        self.private_keys().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::MacAlgorithm;
    use crate::test_util::{fixture, init_logging};
    use vaxholm_core::ErrorKind;
    use vaxholm_crypto::{DigestAlgorithm, RustCryptoProvider};

    const PASSWORD: &str = "secret123";

    fn open(name: &str, password: &str) -> Result<Bundle> {
        init_logging();
        Bundle::open(&RustCryptoProvider, &fixture(name), password)
    }

    fn cert_bag(der: Vec<u8>, attributes: Vec<Attribute>) -> Bag {
        Bag {
            content: BagContent::Certificate(der),
            attributes,
        }
    }

    #[test]
    fn test_open_openssl_bundles() {
        let mut names = vec![
            "ec-p256-aes.p12",
            "rsa-2048-aes.p12",
            "ec-p256-pbmac1.p12",
            "ec-p256-named.p12",
            "ec-p256-plain-bags.p12",
            "chain.p12",
        ];
        if cfg!(feature = "legacy-algorithms") {
            names.extend(["rsa-2048-3des.p12", "rsa-2048-legacy-rc2.p12"]);
        }
        for name in names {
            let bundle = open(name, PASSWORD).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(bundle.certificates().count() >= 1, "{name}");
            assert_eq!(bundle.private_keys().count(), 1, "{name}");
        }
    }

    #[test]
    fn test_open_partial_bundles() {
        let bundle = open("ec-p256-cert-only.p12", PASSWORD).unwrap();
        assert_eq!(bundle.certificates().count(), 1);
        assert!(bundle.private_key_for(bundle.leaf_certificate()).is_none());

        let bundle = open("ec-p256-key-only.p12", PASSWORD).unwrap();
        assert!(bundle.leaf_certificate().is_none());
        assert!(bundle.private_key_for(None).is_some());
    }

    #[test]
    fn test_plain_key_bag() {
        let bundle = open("ec-p256-plain-bags.p12", PASSWORD).unwrap();
        let key = bundle.private_keys().next().unwrap();
        assert!(matches!(key.content, BagContent::PrivateKey { shrouding: None, .. }));
        assert!(bundle.safes.iter().all(|safe| safe.encryption.is_none()));
    }

    #[test]
    fn test_open_failures() {
        let err = open("ec-p256-aes.p12", "wrong").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);

        let err = open("ec-p256-nomac.p12", PASSWORD).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAlgorithm);

        let err = Bundle::open(&RustCryptoProvider, b"\x30\x80garbage", PASSWORD).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_empty_password_bundle() {
        let bundle = open("ec-p256-empty-pass.p12", "").unwrap();
        assert_eq!(bundle.private_keys().count(), 1);
        assert!(open("ec-p256-empty-pass.p12", PASSWORD).is_err());
    }

    #[test]
    fn test_friendly_name_and_key_id() {
        let bundle = open("ec-p256-named.p12", PASSWORD).unwrap();
        let leaf = bundle.leaf_certificate().unwrap();
        assert_eq!(leaf.friendly_name().as_deref(), Some("vaxholm device"));
        assert_eq!(
            hex::encode(leaf.local_key_id().unwrap()),
            "62024934cdfb4a7c816f14f73c43bc7e13d5240a"
        );
    }

    #[test]
    fn test_seal_reopens_with_same_contents() {
        let p = RustCryptoProvider;
        let original = open("ec-p256-aes.p12", PASSWORD).unwrap();
        let sealed = original.refreshed(&p).unwrap().seal(&p, "rotated").unwrap();
        let reopened = Bundle::open(&p, &sealed, "rotated").unwrap();

        assert_eq!(reopened.safes.len(), original.safes.len());
        assert_eq!(
            reopened.leaf_certificate().unwrap().certificate(),
            original.leaf_certificate().unwrap().certificate()
        );
        assert_eq!(
            reopened.private_key_for(None).unwrap().private_key(),
            original.private_key_for(None).unwrap().private_key()
        );
        assert!(Bundle::open(&p, &sealed, PASSWORD).is_err());
    }

    #[test]
    fn test_refreshed_changes_parameters_only() {
        let p = RustCryptoProvider;
        let original = open("rsa-2048-aes.p12", PASSWORD).unwrap();
        let fresh = original.refreshed(&p).unwrap();
        assert_ne!(fresh.mac.salt, original.mac.salt);
        assert_eq!(fresh.mac.algorithm, MacAlgorithm::Pkcs12Kdf(DigestAlgorithm::Sha256));
        assert_eq!(fresh.mac.iterations, original.mac.iterations);
        for (a, b) in original.safes.iter().zip(&fresh.safes) {
            match (&a.encryption, &b.encryption) {
                (Some(a), Some(b)) => {
                    assert_ne!(a, b);
                    assert_eq!(a.name(), b.name());
                    assert_eq!(a.iterations(), b.iterations());
                }
                (None, None) => {}
                _ => panic!("safe encryption changed"),
            }
        }
    }

    #[test]
    fn test_profile_layout() {
        let p = RustCryptoProvider;
        let bags: Vec<Bag> =
            open("ec-p256-plain-bags.p12", PASSWORD).unwrap().into_bags().collect();
        let bundle = Bundle::with_profile_layout(bags, &Profile::fips(), &p).unwrap();
        assert_eq!(bundle.safes.len(), 2);
        assert!(bundle.safes[0].encryption.is_some());
        assert!(bundle.safes[0].bags.iter().all(|b| b.certificate().is_some()));
        assert!(bundle.safes[1].encryption.is_none());
        assert!(matches!(
            bundle.safes[1].bags[0].content,
            BagContent::PrivateKey { shrouding: Some(_), .. }
        ));
        // Attributes travel with the bags.
        assert!(bundle.safes[1].bags[0].local_key_id().is_some());
    }

    #[test]
    fn test_leaf_by_chain_position() {
        let p = RustCryptoProvider;
        let bags = vec![
            cert_bag(fixture("chain-ca.der"), Vec::new()),
            cert_bag(fixture("chain-leaf.der"), Vec::new()),
        ];
        let bundle = Bundle::with_profile_layout(bags, &Profile::fips(), &p).unwrap();
        assert_eq!(
            bundle.leaf_certificate().unwrap().certificate(),
            Some(fixture("chain-leaf.der").as_slice())
        );
    }

    #[test]
    fn test_leaf_skips_unrelated_root() {
        let bags = vec![
            cert_bag(fixture("ec-p256-cert.der"), Vec::new()),
            cert_bag(fixture("chain-leaf.der"), Vec::new()),
        ];
        let bundle =
            Bundle::with_profile_layout(bags, &Profile::fips(), &RustCryptoProvider).unwrap();
        assert_eq!(
            bundle.leaf_certificate().unwrap().certificate(),
            Some(fixture("chain-leaf.der").as_slice())
        );
    }

    #[test]
    fn test_leaf_by_local_key_id() {
        let p = RustCryptoProvider;
        let key = open("ec-p256-plain-bags.p12", PASSWORD)
            .unwrap()
            .into_bags()
            .find(|b| b.private_key().is_some())
            .unwrap();
        let id = key.local_key_id().unwrap();
        let bags = vec![
            cert_bag(fixture("rsa-2048-cert.der"), Vec::new()),
            cert_bag(fixture("ec-p256-cert.der"), vec![Attribute::local_key_id(&id)]),
            key,
        ];
        let bundle = Bundle::with_profile_layout(bags, &Profile::fips(), &p).unwrap();
        let leaf = bundle.leaf_certificate().unwrap();
        assert_eq!(leaf.certificate(), Some(fixture("ec-p256-cert.der").as_slice()));
        assert!(bundle.private_key_for(Some(leaf)).is_some());
    }

    #[test]
    fn test_leaf_falls_back_to_first() {
        let bags = vec![
            cert_bag(fixture("rsa-2048-cert.der"), Vec::new()),
            cert_bag(fixture("ec-p256-cert.der"), Vec::new()),
        ];
        let bundle =
            Bundle::with_profile_layout(bags, &Profile::fips(), &RustCryptoProvider).unwrap();
        assert_eq!(
            bundle.leaf_certificate().unwrap().certificate(),
            Some(fixture("rsa-2048-cert.der").as_slice())
        );
    }
}
