//! Manifest text: one block per data file plus the paired signature reference.
//!
//! ```text
//! Datafile
//! \turi=<relative path>
//! \thash-algorithm=<algorithm>
//! \thash=<hex digest>
//! ...
//! signature-uri=META-INF/signature<N>.ksi
//! ```
//!
//! Every record line ends with `\n`; the final `signature-uri` line does not.
//! Records appear in the order given, which callers keep lexicographic.

use serde::Serialize;
use thiserror::Error;

use crate::digest::ContentDigest;
use crate::naming::{parse_meta_entry, signature_path, MetaEntry};

const DATAFILE_HEADER: &str = "Datafile";
const URI_KEY: &str = "\turi=";
const ALGORITHM_KEY: &str = "\thash-algorithm=";
const HASH_KEY: &str = "\thash=";
const SIGNATURE_URI_KEY: &str = "signature-uri=";

/// One payload file as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFileRecord {
    /// Path relative to the container root.
    pub uri: String,
    /// Hash algorithm name.
    pub hash_algorithm: String,
    /// Hex digest.
    pub hash: String,
}

impl DataFileRecord {
    pub fn new(uri: impl Into<String>, digest: ContentDigest) -> Self {
        Self {
            uri: uri.into(),
            hash_algorithm: digest.algorithm.to_string(),
            hash: digest.hex,
        }
    }
}

/// Manifest for one signing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub records: Vec<DataFileRecord>,
    pub sequence: u32,
}

/// Why stored manifest text could not be read back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestParseError {
    #[error("manifest is not valid UTF-8")]
    NotUtf8,

    #[error("line {line}: expected {expected}")]
    Unexpected { line: usize, expected: &'static str },

    #[error("missing signature-uri line")]
    MissingSignatureUri,

    #[error("signature-uri does not name a signature entry: {0}")]
    BadSignatureUri(String),
}

impl Manifest {
    pub fn new(records: Vec<DataFileRecord>, sequence: u32) -> Self {
        Self { records, sequence }
    }

    /// Archive path of the signature this manifest belongs to.
    pub fn signature_uri(&self) -> String {
        signature_path(self.sequence)
    }

    /// Render the manifest text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(DATAFILE_HEADER);
            out.push('\n');
            out.push_str(URI_KEY);
            out.push_str(&record.uri);
            out.push('\n');
            out.push_str(ALGORITHM_KEY);
            out.push_str(&record.hash_algorithm);
            out.push('\n');
            out.push_str(HASH_KEY);
            out.push_str(&record.hash);
            out.push('\n');
        }
        out.push_str(SIGNATURE_URI_KEY);
        out.push_str(&self.signature_uri());
        out
    }

    /// Parse manifest bytes written by [`Manifest::render`].
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestParseError::NotUtf8)?;
        let mut lines = text.split('\n').enumerate().map(|(i, l)| (i + 1, l));
        let mut records = Vec::new();

        loop {
            let (line_no, line) = lines
                .next()
                .ok_or(ManifestParseError::MissingSignatureUri)?;

            if let Some(uri) = line.strip_prefix(SIGNATURE_URI_KEY) {
                let sequence = match parse_meta_entry(uri) {
                    Some(MetaEntry::Signature(n)) => n,
                    _ => return Err(ManifestParseError::BadSignatureUri(uri.to_string())),
                };
                // Tolerate a single trailing newline; nothing else may follow.
                match lines.next() {
                    None => {}
                    Some((_, "")) if lines.next().is_none() => {}
                    Some((line, _)) => {
                        return Err(ManifestParseError::Unexpected {
                            line,
                            expected: "end of manifest",
                        })
                    }
                }
                return Ok(Self { records, sequence });
            }

            if line != DATAFILE_HEADER {
                return Err(ManifestParseError::Unexpected {
                    line: line_no,
                    expected: "Datafile or signature-uri",
                });
            }

            let uri = expect_field(lines.next(), URI_KEY, "\\turi=")?;
            let hash_algorithm = expect_field(lines.next(), ALGORITHM_KEY, "\\thash-algorithm=")?;
            let hash = expect_field(lines.next(), HASH_KEY, "\\thash=")?;
            records.push(DataFileRecord {
                uri,
                hash_algorithm,
                hash,
            });
        }
    }
}

fn expect_field(
    next: Option<(usize, &str)>,
    key: &str,
    expected: &'static str,
) -> Result<String, ManifestParseError> {
    match next {
        Some((line_no, line)) => line
            .strip_prefix(key)
            .map(str::to_string)
            .ok_or(ManifestParseError::Unexpected {
                line: line_no,
                expected,
            }),
        None => Err(ManifestParseError::MissingSignatureUri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uri: &str, hash: &str) -> DataFileRecord {
        DataFileRecord {
            uri: uri.to_string(),
            hash_algorithm: "SHA2_256".to_string(),
            hash: hash.to_string(),
        }
    }

    #[test]
    fn test_single_record_exact_text() {
        let manifest = Manifest::new(vec![record("a.txt", "d")], 1);
        assert_eq!(
            manifest.render(),
            "Datafile\n\turi=a.txt\n\thash-algorithm=SHA2_256\n\thash=d\nsignature-uri=META-INF/signature1.ksi"
        );
    }

    #[test]
    fn test_no_records_is_just_signature_uri() {
        let manifest = Manifest::new(vec![], 4);
        assert_eq!(manifest.render(), "signature-uri=META-INF/signature4.ksi");
    }

    #[test]
    fn test_render_keeps_given_order() {
        let manifest = Manifest::new(vec![record("b.txt", "2"), record("a.txt", "1")], 2);
        let text = manifest.render();
        assert!(text.find("b.txt").unwrap() < text.find("a.txt").unwrap());
    }

    #[test]
    fn test_parse_reads_back_rendered_text() {
        let manifest = Manifest::new(
            vec![record("a.txt", "AA"), record("dir/b.bin", "BB")],
            9,
        );
        let parsed = Manifest::parse(manifest.render().as_bytes()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_parse_tolerates_trailing_newline() {
        let parsed = Manifest::parse(b"signature-uri=META-INF/signature2.ksi\n").unwrap();
        assert_eq!(parsed.sequence, 2);
    }

    #[test]
    fn test_parse_rejects_truncated_block() {
        let err = Manifest::parse(b"Datafile\n\turi=a.txt\n").unwrap_err();
        assert!(matches!(err, ManifestParseError::Unexpected { line: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_bad_signature_uri() {
        let err = Manifest::parse(b"signature-uri=META-INF/manifest1.tlv").unwrap_err();
        assert!(matches!(err, ManifestParseError::BadSignatureUri(_)));
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        let err =
            Manifest::parse(b"signature-uri=META-INF/signature1.ksi\nDatafile").unwrap_err();
        assert!(matches!(err, ManifestParseError::Unexpected { line: 2, .. }));
    }
}
