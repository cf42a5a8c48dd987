#![forbid(unsafe_code)]

//! Shared types for the Vaxholm PKCS#12 crates.

pub mod algorithm;
pub mod error;

pub use error::{Error, ErrorKind, Result};
