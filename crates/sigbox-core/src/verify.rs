//! Read-only integrity report for a container's signatures.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sigbox_trust::{check_binding, decode_token, verify_token, VerifyingKey};

use crate::archive::ArchiveHandle;
use crate::digest::hash_bytes;
use crate::manifest::Manifest;
use crate::naming::{manifest_path, parse_meta_entry, signature_path, MetaEntry};

/// State of one data file listed in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFileStatus {
    Intact,
    Modified,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFileCheck {
    pub uri: String,
    pub status: DataFileStatus,
}

/// Findings for one sequence number.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureReport {
    pub sequence: u32,
    /// Last identity segment, if the token decoded.
    pub signer: Option<String>,
    pub identity: Vec<String>,
    pub signed_at: Option<DateTime<Utc>>,
    /// Token binds the stored manifest bytes.
    pub manifest_bound: bool,
    /// Cryptographic check against the trusted key; `None` when no key is configured.
    pub authentic: Option<bool>,
    pub data_files: Vec<DataFileCheck>,
    pub problems: Vec<String>,
}

impl SignatureReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Findings for a whole container.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub container: String,
    pub valid: bool,
    pub signatures: Vec<SignatureReport>,
}

/// Check every manifest/signature pair in `handle`.
pub fn verify_container(handle: &ArchiveHandle, trusted_key: Option<&VerifyingKey>) -> VerifyReport {
    let sequences: BTreeSet<u32> = handle
        .entry_names()
        .filter_map(parse_meta_entry)
        .map(MetaEntry::sequence)
        .collect();

    let signatures: Vec<SignatureReport> = sequences
        .into_iter()
        .map(|sequence| verify_pair(handle, sequence, trusted_key))
        .collect();

    VerifyReport {
        container: handle.name().to_string(),
        valid: signatures.iter().all(SignatureReport::is_valid),
        signatures,
    }
}

fn verify_pair(
    handle: &ArchiveHandle,
    sequence: u32,
    trusted_key: Option<&VerifyingKey>,
) -> SignatureReport {
    let mut report = SignatureReport {
        sequence,
        signer: None,
        identity: Vec::new(),
        signed_at: None,
        manifest_bound: false,
        authentic: None,
        data_files: Vec::new(),
        problems: Vec::new(),
    };

    let manifest_entry = manifest_path(sequence);
    let signature_entry = signature_path(sequence);
    let manifest_bytes = handle.get(&manifest_entry);
    let artifact = handle.get(&signature_entry);

    if manifest_bytes.is_none() {
        report.problems.push(format!("{manifest_entry} is missing"));
    }
    if artifact.is_none() {
        report.problems.push(format!("{signature_entry} is missing"));
    }

    if let Some(bytes) = manifest_bytes {
        match Manifest::parse(bytes) {
            Ok(manifest) => {
                if manifest.sequence != sequence {
                    report.problems.push(format!(
                        "{manifest_entry} references {}",
                        manifest.signature_uri()
                    ));
                }
                report.data_files = manifest
                    .records
                    .iter()
                    .map(|record| DataFileCheck {
                        uri: record.uri.clone(),
                        status: match handle.get(&record.uri) {
                            None => DataFileStatus::Missing,
                            Some(data) if hash_bytes(data).hex == record.hash => {
                                DataFileStatus::Intact
                            }
                            Some(_) => DataFileStatus::Modified,
                        },
                    })
                    .collect();
                for check in &report.data_files {
                    if check.status != DataFileStatus::Intact {
                        report
                            .problems
                            .push(format!("data file {} is {:?}", check.uri, check.status));
                    }
                }
            }
            Err(e) => report
                .problems
                .push(format!("{manifest_entry} is unreadable: {e}")),
        }
    }

    if let Some(artifact) = artifact {
        match decode_token(artifact) {
            Ok(token) => {
                report.identity = token.identity.iter().map(|s| s.client_id.clone()).collect();
                report.signer = report.identity.last().cloned();
                report.signed_at = Some(token.signed_at);

                if let Some(bytes) = manifest_bytes {
                    match check_binding(&token, bytes) {
                        Ok(()) => report.manifest_bound = true,
                        Err(e) => report.problems.push(e.to_string()),
                    }
                    if let Some(key) = trusted_key {
                        let authentic = verify_token(artifact, bytes, key);
                        if let Err(e) = &authentic {
                            if report.manifest_bound {
                                report.problems.push(e.to_string());
                            }
                        }
                        report.authentic = Some(authentic.is_ok());
                    }
                }
            }
            Err(e) => report
                .problems
                .push(format!("{signature_entry} is undecodable: {e}")),
        }
    }

    report
}
