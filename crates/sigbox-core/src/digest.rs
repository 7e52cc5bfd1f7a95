//! Content hashing for manifest records.

use std::io::Read;

use serde::Serialize;
use sigbox_trust::HashAlgorithm;

/// The single hash algorithm used for data files and manifests.
pub const SYSTEM_HASH: HashAlgorithm = HashAlgorithm::Sha2_256;

/// Algorithm name plus hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDigest {
    pub algorithm: &'static str,
    pub hex: String,
}

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> ContentDigest {
    ContentDigest {
        algorithm: SYSTEM_HASH.name(),
        hex: SYSTEM_HASH.digest_bytes(bytes),
    }
}

/// Hash a byte stream.
pub fn hash_reader<R: Read>(reader: R) -> std::io::Result<ContentDigest> {
    Ok(ContentDigest {
        algorithm: SYSTEM_HASH.name(),
        hex: SYSTEM_HASH.digest_reader(reader)?,
    })
}
