//! Finding signature entries and the manifests they pair with.

use sigbox_trust::SigningGateway;
use tracing::{debug, warn};

use crate::archive::ArchiveHandle;
use crate::error::{ContainerError, ContainerResult};
use crate::naming::{manifest_path, parse_meta_entry, MetaEntry};

/// A signature entry and its paired manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    pub sequence: u32,
    pub manifest_path: String,
    pub signature_path: String,
}

/// Every signature entry in the container, by sequence number.
pub fn signature_entries(handle: &ArchiveHandle) -> Vec<SignatureMatch> {
    handle
        .entry_names()
        .filter_map(|path| match parse_meta_entry(path) {
            Some(MetaEntry::Signature(sequence)) => Some(SignatureMatch {
                sequence,
                manifest_path: manifest_path(sequence),
                signature_path: path.to_string(),
            }),
            _ => None,
        })
        .collect()
}

/// Signatures whose identity chain ends in exactly `user_id`.
///
/// Undecodable signatures are logged and skipped. If there were candidates
/// and none of them decoded, the sweep fails with `Decode`.
pub fn find_by_identity(
    handle: &ArchiveHandle,
    decoder: &dyn SigningGateway,
    user_id: &str,
) -> ContainerResult<Vec<SignatureMatch>> {
    let candidates = signature_entries(handle);
    let mut matches = Vec::new();
    let mut decoded = 0usize;
    let mut last_failure = None;

    for candidate in candidates.iter() {
        let Some(artifact) = handle.get(&candidate.signature_path) else {
            continue;
        };

        match decoder.extract_identity(artifact) {
            Ok(chain) => {
                decoded += 1;
                let submitter = chain.last().map(String::as_str);
                debug!(
                    container = handle.name(),
                    sequence = candidate.sequence,
                    submitter = ?submitter,
                    "decoded signature identity"
                );
                if submitter == Some(user_id) {
                    matches.push(candidate.clone());
                }
            }
            Err(e) => {
                warn!(
                    container = handle.name(),
                    entry = %candidate.signature_path,
                    error = %e,
                    "skipping undecodable signature"
                );
                last_failure = Some((candidate.signature_path.clone(), e.to_string()));
            }
        }
    }

    if decoded == 0 {
        if let Some((entry, reason)) = last_failure {
            return Err(ContainerError::Decode { entry, reason });
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigbox_trust::LocalAuthority;
    use std::path::Path;

    fn handle_with(entries: &[(&str, Vec<u8>)]) -> ArchiveHandle {
        let mut handle = ArchiveHandle::new_container("box", Path::new("box.zip"));
        for (path, bytes) in entries {
            handle.put(*path, bytes.clone());
        }
        handle
    }

    #[test]
    fn test_finds_only_matching_last_segment() {
        let authority = LocalAuthority::generate("agg");
        let handle = handle_with(&[
            ("META-INF/manifest1.tlv", b"m1".to_vec()),
            ("META-INF/signature1.ksi", authority.issue(b"m1", "alice").unwrap()),
            ("META-INF/manifest2.tlv", b"m2".to_vec()),
            ("META-INF/signature2.ksi", authority.issue(b"m2", "bob").unwrap()),
        ]);

        let found = find_by_identity(&handle, &authority, "alice").unwrap();
        assert_eq!(
            found,
            vec![SignatureMatch {
                sequence: 1,
                manifest_path: "META-INF/manifest1.tlv".into(),
                signature_path: "META-INF/signature1.ksi".into(),
            }]
        );
    }

    #[test]
    fn test_matching_is_case_sensitive_and_exact() {
        let authority = LocalAuthority::generate("agg");
        let handle = handle_with(&[(
            "META-INF/signature1.ksi",
            authority.issue(b"m1", "Jane.Smith").unwrap(),
        )]);

        assert!(find_by_identity(&handle, &authority, "jane.smith")
            .unwrap()
            .is_empty());
        assert!(find_by_identity(&handle, &authority, "Jane")
            .unwrap()
            .is_empty());
        // The authority segment is not the submitter.
        assert!(find_by_identity(&handle, &authority, "agg")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_undecodable_entry_is_skipped() {
        let authority = LocalAuthority::generate("agg");
        let handle = handle_with(&[
            ("META-INF/signature1.ksi", b"garbage".to_vec()),
            ("META-INF/signature2.ksi", authority.issue(b"m2", "bob").unwrap()),
        ]);

        let found = find_by_identity(&handle, &authority, "bob").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sequence, 2);
    }

    #[test]
    fn test_all_undecodable_is_decode_error() {
        let authority = LocalAuthority::generate("agg");
        let handle = handle_with(&[("META-INF/signature1.ksi", b"garbage".to_vec())]);

        let err = find_by_identity(&handle, &authority, "bob").unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_no_signatures_is_empty() {
        let authority = LocalAuthority::generate("agg");
        let handle = handle_with(&[("a.txt", b"a".to_vec())]);
        assert!(find_by_identity(&handle, &authority, "bob")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_signature_lookalikes_ignored() {
        let handle = handle_with(&[
            ("signature1.ksi", vec![]),
            ("META-INF/signature1.ksi.bak", vec![]),
            ("docs/META-INF/signature1.ksi", vec![]),
        ]);
        assert!(signature_entries(&handle).is_empty());
    }
}
