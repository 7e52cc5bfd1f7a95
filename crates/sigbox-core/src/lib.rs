//! Signed zip containers.
//!
//! A container is a zip archive of payload files plus, under `META-INF/`, any
//! number of manifest/signature pairs. Each sign appends
//! `META-INF/manifest<N>.tlv` (a digest listing of the payload) and
//! `META-INF/signature<N>.ksi` (the trust service's token over that
//! manifest). Deleting a signature removes both entries of every pair whose
//! submitter matches.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sigbox_core::{ContainerService, StoreConfig};
//! use sigbox_trust::LocalAuthority;
//!
//! # async fn example() -> sigbox_core::ContainerResult<()> {
//! let service = ContainerService::new(
//!     StoreConfig::from_env(),
//!     Arc::new(LocalAuthority::generate("dev")),
//! );
//! service.create("box").await?;
//! service.sign("box", "alice").await?;
//! service.delete("box", "alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod digest;
pub mod error;
pub mod locator;
pub mod lock;
pub mod manifest;
pub mod naming;
pub mod service;
pub mod store;
pub mod verify;

pub use archive::ArchiveHandle;
pub use config::StoreConfig;
pub use digest::{hash_bytes, hash_reader, ContentDigest, SYSTEM_HASH};
pub use error::{ContainerError, ContainerResult};
pub use locator::{find_by_identity, SignatureMatch};
pub use lock::ContainerLocks;
pub use manifest::{DataFileRecord, Manifest, ManifestParseError};
pub use service::{ContainerList, ContainerService, DeleteOutcome, SignOutcome};
pub use store::ArchiveStore;
pub use verify::{verify_container, DataFileCheck, DataFileStatus, SignatureReport, VerifyReport};
