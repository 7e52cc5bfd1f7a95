//! Hash algorithm shared by the trust service and container manifests.

use std::fmt;
use std::io::Read;

use sha2::{Digest, Sha256};

/// Hash algorithms understood by the trust service.
///
/// Only one is in use; the enum keeps the algorithm name on the wire and in
/// manifests tied to the implementation that produced the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha2_256,
}

impl HashAlgorithm {
    /// Wire name (`SHA2_256`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha2_256 => "SHA2_256",
        }
    }

    /// Look up an algorithm by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA2_256" => Some(Self::Sha2_256),
            _ => None,
        }
    }

    /// Stream `reader` through the hash and return upper-case hex.
    pub fn digest_reader<R: Read>(self, mut reader: R) -> std::io::Result<String> {
        match self {
            Self::Sha2_256 => {
                let mut hasher = Sha256::new();
                let mut buf = [0_u8; 8192];

                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }

                Ok(hex::encode_upper(hasher.finalize()))
            }
        }
    }

    /// Hash an in-memory buffer and return upper-case hex.
    pub fn digest_bytes(self, bytes: &[u8]) -> String {
        match self {
            Self::Sha2_256 => hex::encode_upper(Sha256::digest(bytes)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
