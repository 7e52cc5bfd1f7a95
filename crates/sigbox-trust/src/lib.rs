//! Signing gateway for sigbox containers.
//!
//! Wraps a networked signing authority (aggregator) that binds a document
//! digest, a timestamp and a submitter identity chain into an opaque
//! signature token. This crate provides:
//!
//! - [`SigningGateway`]: the seam the container orchestrator signs through
//! - [`TrustClient`]: HTTP client for the trust service with basic auth
//! - [`LocalAuthority`]: in-process authority for development and tests
//! - Token decoding, identity extraction and verification
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SIGBOX_AGGREGATOR_URL` | Signing service base URL |
//! | `SIGBOX_LOGIN_ID` | Login identifier |
//! | `SIGBOX_LOGIN_KEY` | Login key |
//! | `SIGBOX_TRUST_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `SIGBOX_TRUST_MAX_RETRIES` | Retries for transient failures (default: 0) |

pub mod client;
pub mod error;
pub mod gateway;
pub mod hash;
pub mod local;
pub mod token;
pub mod types;

pub use client::{TrustClient, TRUST_USER_AGENT};
pub use error::{TrustError, TrustResult};
pub use gateway::SigningGateway;
pub use hash::HashAlgorithm;
pub use local::LocalAuthority;
pub use token::{
    check_binding, compute_key_id, decode_token, extract_identity, verify_token, VerifiedToken,
};
pub use types::{IdentitySegment, SignRequest, SignatureToken, TrustConfig};

// Re-export the key type so callers can configure trusted keys.
pub use ed25519_dalek::VerifyingKey;
