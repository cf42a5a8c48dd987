#![forbid(unsafe_code)]

//! The PKCS#12 bundle operations.
//!
//! Each function is a pure function of its inputs plus the context; none
//! keeps state between calls.

use vaxholm_core::{Error, Result};
use vaxholm_crypto::DigestAlgorithm;
use vaxholm_keys::{load_private_key_to_pkcs8, parse_certificate, pkcs8_to_pem, verify_key_pair};
use zeroize::Zeroizing;

use crate::bundle::{Bag, BagContent, Bundle};
use crate::context::Pkcs12Context;
use crate::pfx::Attribute;

/// Check that `data` opens under `password`: structure, MAC and every
/// encrypted safe and shrouded key.
pub fn validate(ctx: &Pkcs12Context, data: &[u8], password: &str) -> Result<()> {
    Bundle::open(ctx.provider(), data, password).map(|_| ())
}

/// DER of the leaf certificate.
pub fn extract_certificate(ctx: &Pkcs12Context, data: &[u8], password: &str) -> Result<Vec<u8>> {
    let bundle = Bundle::open(ctx.provider(), data, password)?;
    bundle
        .leaf_certificate()
        .and_then(Bag::certificate)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::Certificate("bundle holds no X.509 certificate".into()))
}

/// PKCS#8 DER of the leaf certificate's private key.
pub fn extract_private_key_der(
    ctx: &Pkcs12Context,
    data: &[u8],
    password: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let bundle = Bundle::open(ctx.provider(), data, password)?;
    bundle
        .private_key_for(bundle.leaf_certificate())
        .and_then(Bag::private_key)
        .map(|der| Zeroizing::new(der.to_vec()))
        .ok_or_else(|| Error::Key("bundle holds no private key".into()))
}

/// The leaf certificate's private key as a `PRIVATE KEY` PEM document.
pub fn extract_private_key(
    ctx: &Pkcs12Context,
    data: &[u8],
    password: &str,
) -> Result<Zeroizing<String>> {
    let der = extract_private_key_der(ctx, data, password)?;
    pkcs8_to_pem(&der)
}

/// Re-encode `data` under the context's profile, keeping the password.
pub fn export_to_fips(ctx: &Pkcs12Context, data: &[u8], password: &str) -> Result<Vec<u8>> {
    let provider = ctx.provider();
    let bundle = Bundle::open(provider, data, password)?;
    if ctx.verify_key_pair {
        check_pair(&bundle)?;
    }
    let bags: Vec<Bag> = bundle.into_bags().collect();
    log::debug!("re-encoding {} bags with {}", bags.len(), ctx.profile.cipher.cbc());
    Bundle::with_profile_layout(bags, &ctx.profile, provider)?.seal(provider, password)
}

/// Build a bundle from a DER certificate and a PEM private key.
///
/// `password` protects the new bundle and also decrypts an
/// `ENCRYPTED PRIVATE KEY` input.
pub fn create_bundle(
    ctx: &Pkcs12Context,
    cert_der: &[u8],
    key_pem: &[u8],
    password: &str,
) -> Result<Vec<u8>> {
    let provider = ctx.provider();
    let cert = parse_certificate(cert_der)?;
    let pkcs8 = load_private_key_to_pkcs8(key_pem, password)?;
    if ctx.verify_key_pair {
        verify_key_pair(&cert, &pkcs8)?;
    }

    let mut attributes = Vec::new();
    if let Some(name) = &ctx.friendly_name {
        attributes.push(Attribute::friendly_name(name));
    }
    attributes.push(Attribute::local_key_id(&provider.digest(DigestAlgorithm::Sha1, cert_der)));

    let bags = vec![
        Bag {
            content: BagContent::Certificate(cert_der.to_vec()),
            attributes: attributes.clone(),
        },
        Bag {
            content: BagContent::PrivateKey {
                pkcs8,
                shrouding: None,
            },
            attributes,
        },
    ];
    log::debug!("creating bundle for {}", cert.subject_display);
    Bundle::with_profile_layout(bags, &ctx.profile, provider)?.seal(provider, password)
}

/// Re-key `data` from `old_password` to `new_password`.
///
/// Algorithms, iteration counts, layout and attributes are kept; every salt
/// and IV is fresh.
pub fn update_password(
    ctx: &Pkcs12Context,
    data: &[u8],
    old_password: &str,
    new_password: &str,
) -> Result<Vec<u8>> {
    let provider = ctx.provider();
    let bundle = Bundle::open(provider, data, old_password)?;
    bundle.refreshed(provider)?.seal(provider, new_password)
}

fn check_pair(bundle: &Bundle) -> Result<()> {
    let leaf = bundle.leaf_certificate();
    let (Some(cert), Some(key)) = (
        leaf.and_then(Bag::certificate),
        bundle.private_key_for(leaf).and_then(Bag::private_key),
    ) else {
        return Ok(());
    };
    verify_key_pair(&parse_certificate(cert)?, key)
}

// ── Inspection ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagKind {
    PrivateKey,
    Certificate,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct BagSummary {
    pub kind: BagKind,
    /// Shrouding scheme of a private key.
    pub encryption: Option<String>,
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
    /// Certificate subject.
    pub subject: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SafeSummary {
    /// `None` for a `data` safe.
    pub encryption: Option<String>,
    pub bags: Vec<BagSummary>,
}

/// What a bundle contains and how it is protected, without key material.
#[derive(Debug, Clone)]
pub struct BundleSummary {
    pub mac: String,
    pub mac_iterations: u32,
    pub safes: Vec<SafeSummary>,
}

impl std::fmt::Display for BundleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "MAC: {}, {} iterations", self.mac, self.mac_iterations)?;
        for safe in &self.safes {
            match &safe.encryption {
                Some(scheme) => writeln!(f, "encrypted safe: {scheme}")?,
                None => writeln!(f, "data safe")?,
            }
            for bag in &safe.bags {
                match &bag.kind {
                    BagKind::PrivateKey => write!(f, "  private key")?,
                    BagKind::Certificate => write!(f, "  certificate")?,
                    BagKind::Other(oid) => write!(f, "  bag {oid}")?,
                }
                if let Some(scheme) = &bag.encryption {
                    write!(f, " ({scheme})")?;
                }
                if let Some(subject) = &bag.subject {
                    write!(f, " subject={subject}")?;
                }
                if let Some(name) = &bag.friendly_name {
                    write!(f, " friendlyName={name:?}")?;
                }
                if let Some(id) = &bag.local_key_id {
                    write!(f, " localKeyId={}", hex::encode(id))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Open `data` and describe it.
pub fn inspect(ctx: &Pkcs12Context, data: &[u8], password: &str) -> Result<BundleSummary> {
    let bundle = Bundle::open(ctx.provider(), data, password)?;
    let safes = bundle
        .safes
        .iter()
        .map(|safe| SafeSummary {
            encryption: safe.encryption.as_ref().map(|scheme| scheme.name()),
            bags: safe.bags.iter().map(summarize_bag).collect(),
        })
        .collect();
    Ok(BundleSummary {
        mac: bundle.mac.algorithm.name(),
        mac_iterations: bundle.mac.iterations,
        safes,
    })
}

fn summarize_bag(bag: &Bag) -> BagSummary {
    let (kind, encryption, subject) = match &bag.content {
        BagContent::PrivateKey { shrouding, .. } => (
            BagKind::PrivateKey,
            shrouding.as_ref().map(|scheme| scheme.name()),
            None,
        ),
        BagContent::Certificate(der) => (
            BagKind::Certificate,
            None,
            parse_certificate(der).ok().map(|info| info.subject_display),
        ),
        BagContent::Other { bag_type, .. } => (BagKind::Other(bag_type.to_string()), None, None),
    };
    BagSummary {
        kind,
        encryption,
        friendly_name: bag.friendly_name(),
        local_key_id: bag.local_key_id(),
        subject,
    }
}
