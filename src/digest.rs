use clap::ValueEnum;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Content digest used to fingerprint files.
///
/// SHA-256 is the default so listings stay comparable with `sha256sum` and
/// any previously recorded hashes. BLAKE3 is offered for speed; both produce
/// 32 bytes (64 hex characters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Digest `bytes` in one pass.
    pub fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
            Self::Blake3 => blake3::hash(bytes).as_bytes().to_vec(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}
