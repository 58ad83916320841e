//! Content identifiers and hashing for the trimerge merge engine.
//!
//! Everything the engine stores (blobs, trees, commits) is addressed by
//! the hash of its content. This crate provides the [`ContentId`] type, the
//! streaming [`Hasher`](hasher::Hasher) that produces them, and the hex
//! codec used for display and parsing.

mod cid;
pub mod hasher;
pub mod hex;

pub use cid::ContentId;

/// Errors produced by hash and content-id operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    #[error("SHA-1 collision detected")]
    Sha1Collision,
}

/// Supported content-hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-1 with collision detection (default, 20 bytes).
    #[default]
    Sha1,
    /// SHA-256 (32 bytes).
    Sha256,
}

impl HashAlgorithm {
    /// Length of the raw digest in bytes.
    pub const fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// Length of the hex representation.
    pub const fn hex_len(&self) -> usize {
        self.digest_len() * 2
    }

    /// The null (all-zeros) identifier for this algorithm.
    pub const fn null_id(&self) -> ContentId {
        match self {
            Self::Sha1 => ContentId::NULL_SHA1,
            Self::Sha256 => ContentId::NULL_SHA256,
        }
    }

    /// Look up an algorithm by raw digest length.
    pub fn from_digest_len(len: usize) -> Option<Self> {
        match len {
            20 => Some(Self::Sha1),
            32 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Look up an algorithm by hex length.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// The canonical algorithm name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
