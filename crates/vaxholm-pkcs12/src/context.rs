#![forbid(unsafe_code)]

//! PKCS#12 context: profile, options and cryptographic backend.

use vaxholm_crypto::{CryptoProvider, RustCryptoProvider};

use crate::profile::Profile;

/// Context for PKCS#12 operations.
pub struct Pkcs12Context {
    /// Algorithms used for bundles this context writes.
    pub profile: Profile,
    /// Check that certificate and private key belong together when creating
    /// or re-encoding a bundle.
    pub verify_key_pair: bool,
    /// `friendlyName` attribute for bags of newly created bundles.
    pub friendly_name: Option<String>,
    provider: Box<dyn CryptoProvider>,
}

impl Pkcs12Context {
    /// Create a context with the FIPS profile and the RustCrypto backend.
    pub fn new() -> Self {
        Self::with_provider(Box::new(RustCryptoProvider))
    }

    /// Create a context with a custom cryptographic backend.
    pub fn with_provider(provider: Box<dyn CryptoProvider>) -> Self {
        Self {
            profile: Profile::fips(),
            verify_key_pair: false,
            friendly_name: None,
            provider,
        }
    }

    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    pub fn set_friendly_name(&mut self, name: &str) {
        self.friendly_name = Some(name.to_owned());
    }
}

impl Default for Pkcs12Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pkcs12Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs12Context")
            .field("profile", &self.profile)
            .field("verify_key_pair", &self.verify_key_pair)
            .field("friendly_name", &self.friendly_name)
            .finish_non_exhaustive()
    }
}
