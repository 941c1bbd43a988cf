//! Content digests: strong (full-file, cryptographic) and fast (size + prefix).
//!
//! A strong digest and a fast digest are never compared: [`Digest::key`] returns
//! a `(DigestTag, Vec<u8>)` pair and the grouper only ever groups by that pair.

use serde::{Deserialize, Serialize};

/// Number of leading bytes hashed for the fast digest (spec §4.3).
pub const FAST_PREFIX_BYTES: usize = 65_536;

/// Strong-digest algorithm. Default is `Md5` (128-bit) per spec §6:
/// "absent flags → 128-bit".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Md5,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn bits(self) -> u32 {
        match self {
            Algorithm::Md5 => 128,
            Algorithm::Sha256 => 256,
            Algorithm::Sha512 => 512,
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Md5
    }
}

/// Discriminant used for grouping and cache invalidation. Distinct from
/// [`Algorithm`] only in that it also covers the fast mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DigestTag {
    Md5,
    Sha256,
    Sha512,
    Fast,
}

impl DigestTag {
    pub fn as_str(self) -> &'static str {
        match self {
            DigestTag::Md5 => "md5",
            DigestTag::Sha256 => "sha256",
            DigestTag::Sha512 => "sha512",
            DigestTag::Fast => "fast",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "md5" => Some(DigestTag::Md5),
            "sha256" => Some(DigestTag::Sha256),
            "sha512" => Some(DigestTag::Sha512),
            "fast" => Some(DigestTag::Fast),
            _ => None,
        }
    }
}

impl From<Algorithm> for DigestTag {
    fn from(a: Algorithm) -> Self {
        match a {
            Algorithm::Md5 => DigestTag::Md5,
            Algorithm::Sha256 => DigestTag::Sha256,
            Algorithm::Sha512 => DigestTag::Sha512,
        }
    }
}

/// A content digest, algorithm-tagged so mixing modes across runs never
/// produces false positives (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digest {
    Strong { algorithm: Algorithm, bytes: Vec<u8> },
    Fast { size: u64, prefix: [u8; 32] },
}

impl Digest {
    pub fn tag(&self) -> DigestTag {
        match self {
            Digest::Strong { algorithm, .. } => DigestTag::from(*algorithm),
            Digest::Fast { .. } => DigestTag::Fast,
        }
    }

    /// Grouping key: records only ever group when both tag and bytes match.
    pub fn key(&self) -> (DigestTag, Vec<u8>) {
        match self {
            Digest::Strong { bytes, .. } => (self.tag(), bytes.clone()),
            Digest::Fast { size, prefix } => {
                let mut bytes = size.to_be_bytes().to_vec();
                bytes.extend_from_slice(prefix);
                (self.tag(), bytes)
            }
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, Digest::Fast { .. })
    }
}
