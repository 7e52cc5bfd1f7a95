//! The signing seam consumed by the container orchestrator.

use async_trait::async_trait;

use crate::error::TrustResult;
use crate::token;

/// Produces signature artifacts bound to a submitter identity.
///
/// Implementations make a single attempt; retry policy belongs to the
/// implementation's configuration, not to callers.
#[async_trait]
pub trait SigningGateway: Send + Sync {
    /// Sign `payload` on behalf of `identity`, returning opaque artifact bytes.
    async fn sign(&self, payload: &[u8], identity: &str) -> TrustResult<Vec<u8>>;

    /// Decode the identity chain of a stored artifact (submitter last).
    fn extract_identity(&self, artifact: &[u8]) -> TrustResult<Vec<String>> {
        token::extract_identity(artifact)
    }
}
