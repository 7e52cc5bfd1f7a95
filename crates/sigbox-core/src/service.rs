//! Container orchestrator: create, list, sign, delete-signature and verify.
//!
//! Every mutating operation follows the same shape: validate input, take the
//! per-container lock, open a staged [`ArchiveHandle`], edit, then commit once.
//! Archive I/O runs on the blocking pool; the only await inside a held lock
//! besides that is the signing call.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sigbox_trust::{SigningGateway, TrustError, VerifyingKey};
use tracing::{debug, info};

use crate::archive::ArchiveHandle;
use crate::config::StoreConfig;
use crate::digest::hash_bytes;
use crate::error::{ContainerError, ContainerResult};
use crate::locator::find_by_identity;
use crate::lock::ContainerLocks;
use crate::manifest::{DataFileRecord, Manifest};
use crate::naming::{manifest_path, next_sequence, signature_path};
use crate::store::ArchiveStore;
use crate::verify::{verify_container, VerifyReport};

const MISSING_CREATE_NAME: &str = "Provide a name for the container.";
const MISSING_SIGN_NAME: &str = "Provide the name of a container you wish to sign.";
const MISSING_SIGN_USER: &str = "Provide your name to sign the content.";
const MISSING_DELETE_NAME: &str =
    "Provide the name of a container you wish to delete the signature from.";
const MISSING_DELETE_USER: &str = "Provide your name to delete the signature from the container.";
const MISSING_VERIFY_NAME: &str = "Provide the name of a container you wish to verify.";

/// Result of [`ContainerService::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerList {
    pub number_of_containers: usize,
    pub containers: Vec<String>,
}

/// Result of a successful sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    pub sequence: u32,
    pub manifest_path: String,
    pub signature_path: String,
}

/// Result of a delete sweep. Empty `removed` means nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: Vec<u32>,
}

/// Entry point for all container operations.
#[derive(Clone)]
pub struct ContainerService {
    store: ArchiveStore,
    gateway: Arc<dyn SigningGateway>,
    locks: ContainerLocks,
    sign_timeout: Duration,
    trusted_key: Option<VerifyingKey>,
}

impl ContainerService {
    pub fn new(config: StoreConfig, gateway: Arc<dyn SigningGateway>) -> Self {
        Self {
            store: ArchiveStore::new(&config),
            gateway,
            locks: ContainerLocks::new(),
            sign_timeout: config.sign_timeout(),
            trusted_key: None,
        }
    }

    /// Check signatures cryptographically against `key` during verify.
    pub fn with_trusted_key(mut self, key: VerifyingKey) -> Self {
        self.trusted_key = Some(key);
        self
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// Build a new container from the source tree. Returns the file count.
    pub async fn create(&self, name: &str) -> ContainerResult<usize> {
        require(name, MISSING_CREATE_NAME)?;
        let _guard = self.locks.acquire(name).await;

        let store = self.store.clone();
        let owned = name.to_string();
        blocking(move || store.create(&owned)).await
    }

    pub async fn list(&self) -> ContainerResult<ContainerList> {
        let store = self.store.clone();
        let containers = blocking(move || store.list()).await?;
        Ok(ContainerList {
            number_of_containers: containers.len(),
            containers,
        })
    }

    /// Append a manifest and its signature for `user_id`.
    ///
    /// The gateway is called before anything is written; on any failure the
    /// staged handle is dropped and the container stays as it was.
    pub async fn sign(&self, name: &str, user_id: &str) -> ContainerResult<SignOutcome> {
        require(name, MISSING_SIGN_NAME)?;
        require(user_id, MISSING_SIGN_USER)?;
        let _guard = self.locks.acquire(name).await;

        let store = self.store.clone();
        let owned = name.to_string();
        let (mut handle, manifest) = blocking(move || {
            let handle = store.open_for_mutation(&owned)?;
            let manifest = build_manifest(&handle)?;
            Ok((handle, manifest))
        })
        .await?;

        let sequence = manifest.sequence;
        let manifest_bytes = manifest.render().into_bytes();
        debug!(
            container = name,
            sequence,
            records = manifest.records.len(),
            "requesting signature"
        );

        let timeout = self.sign_timeout;
        let artifact = tokio::time::timeout(timeout, self.gateway.sign(&manifest_bytes, user_id))
            .await
            .map_err(|_| ContainerError::Signing(TrustError::Timeout(timeout)))??;

        let outcome = SignOutcome {
            sequence,
            manifest_path: manifest_path(sequence),
            signature_path: signature_path(sequence),
        };
        handle.put(outcome.manifest_path.clone(), manifest_bytes);
        handle.put(outcome.signature_path.clone(), artifact);
        blocking(move || handle.commit()).await?;

        info!(container = name, user = user_id, sequence, "signed container");
        Ok(outcome)
    }

    /// Remove every manifest/signature pair whose submitter is `user_id`.
    ///
    /// No match is a successful no-op. A matched signature whose manifest is
    /// missing aborts the sweep with `Inconsistent` and nothing is written.
    pub async fn delete(&self, name: &str, user_id: &str) -> ContainerResult<DeleteOutcome> {
        require(name, MISSING_DELETE_NAME)?;
        require(user_id, MISSING_DELETE_USER)?;
        let _guard = self.locks.acquire(name).await;

        let store = self.store.clone();
        let gateway = Arc::clone(&self.gateway);
        let owned = name.to_string();
        let user = user_id.to_string();
        let outcome = blocking(move || {
            let mut handle = store.open_for_mutation(&owned)?;
            let matches = find_by_identity(&handle, gateway.as_ref(), &user)?;

            let mut removed = Vec::with_capacity(matches.len());
            for found in &matches {
                if handle.remove(&found.manifest_path).is_none() {
                    return Err(ContainerError::Inconsistent {
                        name: owned.clone(),
                        message: format!(
                            "{} has no matching {}",
                            found.signature_path, found.manifest_path
                        ),
                    });
                }
                if handle.remove(&found.signature_path).is_none() {
                    return Err(ContainerError::Inconsistent {
                        name: owned.clone(),
                        message: format!("{} vanished during delete", found.signature_path),
                    });
                }
                removed.push(found.sequence);
            }

            handle.commit()?;
            Ok(DeleteOutcome { removed })
        })
        .await?;

        if outcome.removed.is_empty() {
            debug!(container = name, user = user_id, "no signature to delete");
        } else {
            info!(
                container = name,
                user = user_id,
                removed = ?outcome.removed,
                "deleted signatures"
            );
        }
        Ok(outcome)
    }

    /// Read-only integrity report.
    pub async fn verify(&self, name: &str) -> ContainerResult<VerifyReport> {
        require(name, MISSING_VERIFY_NAME)?;
        let _guard = self.locks.acquire(name).await;

        let store = self.store.clone();
        let owned = name.to_string();
        let key = self.trusted_key;
        blocking(move || {
            let handle = store.open_for_mutation(&owned)?;
            Ok(verify_container(&handle, key.as_ref()))
        })
        .await
    }
}

fn require(value: &str, message: &str) -> ContainerResult<()> {
    if value.is_empty() {
        return Err(ContainerError::validation(message));
    }
    Ok(())
}

/// Manifest over the current data files at the next free sequence number.
fn build_manifest(handle: &ArchiveHandle) -> ContainerResult<Manifest> {
    let sequence =
        next_sequence(handle.entry_names()).ok_or_else(|| ContainerError::Inconsistent {
            name: handle.name().to_string(),
            message: "sequence space exhausted".to_string(),
        })?;
    let records = handle
        .data_files()
        .map(|(uri, bytes)| DataFileRecord::new(uri, hash_bytes(bytes)))
        .collect();
    Ok(Manifest::new(records, sequence))
}

async fn blocking<T, F>(f: F) -> ContainerResult<T>
where
    F: FnOnce() -> ContainerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ContainerError::io("blocking task", std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigbox_trust::LocalAuthority;
    use std::fs;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ContainerService {
        let source = dir.path().join("files");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), b"alpha").unwrap();
        let config = StoreConfig::default()
            .with_containers_dir(dir.path().join("containers"))
            .with_source_dir(source);
        ContainerService::new(config, Arc::new(LocalAuthority::generate("agg")))
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let err = svc.create("").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_CREATE_NAME);
        let err = svc.sign("", "alice").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_SIGN_NAME);
        let err = svc.sign("box", "").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_SIGN_USER);
        let err = svc.delete("", "alice").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_DELETE_NAME);
        let err = svc.delete("box", "").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_DELETE_USER);
        let err = svc.verify("").await.unwrap_err();
        assert_eq!(err.to_string(), MISSING_VERIFY_NAME);
    }

    #[tokio::test]
    async fn test_list_counts_containers() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.create("one").await.unwrap();
        svc.create("two").await.unwrap();

        let list = svc.list().await.unwrap();
        assert_eq!(list.number_of_containers, 2);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["numberOfContainers"], 2);
        assert_eq!(json["containers"][0], "one");
    }

    #[tokio::test]
    async fn test_sign_uses_next_sequence() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.create("box").await.unwrap();

        assert_eq!(svc.sign("box", "alice").await.unwrap().sequence, 1);
        let second = svc.sign("box", "bob").await.unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.signature_path, "META-INF/signature2.ksi");
    }

    #[tokio::test]
    async fn test_sign_with_exhausted_sequence_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.create("box").await.unwrap();

        let mut handle = svc.store().open_for_mutation("box").unwrap();
        handle.put("META-INF/manifest4294967295.tlv", b"m".to_vec());
        handle.put("META-INF/signature4294967295.ksi", b"s".to_vec());
        handle.commit().unwrap();
        let path = svc.store().container_path("box");
        let before = fs::read(&path).unwrap();

        let err = svc.sign("box", "bob").await.unwrap_err();
        assert_eq!(err.kind(), "inconsistent");
        assert!(err.to_string().contains("sequence space exhausted"));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_without_signatures_is_noop() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.create("box").await.unwrap();
        assert_eq!(svc.delete("box", "alice").await.unwrap(), DeleteOutcome::default());
    }
}
