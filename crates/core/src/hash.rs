//! Supported digest algorithms.
//!
//! The set is closed at compile time: configuration referencing anything
//! else fails when the module is constructed, not per request.

use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// A digest algorithm usable for identifier derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parse a configured algorithm name. Returns `None` for names outside
    /// the supported set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(Self::Sha1),
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Canonical lowercase name, as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Hex-encoded digest of `payload`.
    pub fn hex_digest(&self, payload: &str) -> String {
        match self {
            Self::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
            Self::Sha224 => hex::encode(Sha224::digest(payload.as_bytes())),
            Self::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
            Self::Sha384 => hex::encode(Sha384::digest(payload.as_bytes())),
            Self::Sha512 => hex::encode(Sha512::digest(payload.as_bytes())),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
