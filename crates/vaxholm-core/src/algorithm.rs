#![forbid(unsafe_code)]

//! Object identifier arcs used by PKCS#12 (RFC 7292), PKCS#5 (RFC 8018)
//! and PBMAC1 (RFC 9579).
//!
//! Each constant is the list of arcs as accepted by
//! `yasna::models::ObjectIdentifier::from_slice`.

use yasna::models::ObjectIdentifier;

/// Build a yasna OID from arcs.
pub fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

// ── PKCS#7 content types ─────────────────────────────────────────────

pub const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
pub const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// ── PKCS#12 bag types ────────────────────────────────────────────────

pub const KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 1];
pub const PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
pub const CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
pub const CRL_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 4];
pub const SECRET_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 5];
pub const SAFE_CONTENTS_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 6];

// ── PKCS#9 certificate types and attributes ──────────────────────────

pub const X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];
pub const FRIENDLY_NAME: &[u64] = &[1, 2, 840, 113549, 1, 9, 20];
pub const LOCAL_KEY_ID: &[u64] = &[1, 2, 840, 113549, 1, 9, 21];

// ── PKCS#12 v1 password-based encryption ─────────────────────────────

pub const PBE_SHA1_RC4_128: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 1];
pub const PBE_SHA1_RC4_40: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 2];
pub const PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
pub const PBE_SHA1_2DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 4];
pub const PBE_SHA1_RC2_128: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 5];
pub const PBE_SHA1_RC2_40: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 6];

// ── PKCS#5 v2 ────────────────────────────────────────────────────────

pub const PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
pub const PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
pub const PBMAC1: &[u64] = &[1, 2, 840, 113549, 1, 5, 14];

// ── Block ciphers ────────────────────────────────────────────────────

pub const AES_128_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 2];
pub const AES_192_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 22];
pub const AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];
pub const DES_EDE3_CBC: &[u64] = &[1, 2, 840, 113549, 3, 7];

// ── Digests ──────────────────────────────────────────────────────────

pub const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
pub const SHA224: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 4];
pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
pub const SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
pub const SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];

// ── HMAC PRFs ────────────────────────────────────────────────────────

pub const HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
pub const HMAC_SHA224: &[u64] = &[1, 2, 840, 113549, 2, 8];
pub const HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];
pub const HMAC_SHA384: &[u64] = &[1, 2, 840, 113549, 2, 10];
pub const HMAC_SHA512: &[u64] = &[1, 2, 840, 113549, 2, 11];

// ── Public key algorithms ────────────────────────────────────────────

pub const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
pub const EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];
pub const ED25519: &[u64] = &[1, 3, 101, 112];
pub const SECP256R1: &[u64] = &[1, 2, 840, 10045, 3, 1, 7];
pub const SECP384R1: &[u64] = &[1, 3, 132, 0, 34];
