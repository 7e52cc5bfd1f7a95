//! In-process signing authority for development and tests.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use tracing::debug;

use crate::error::{TrustError, TrustResult};
use crate::gateway::SigningGateway;
use crate::hash::HashAlgorithm;
use crate::token::issue_token;
use crate::types::IdentitySegment;

/// Issues tokens locally with an ed25519 key.
///
/// Tokens carry the identity chain `[authority_name, identity]`.
#[derive(Debug, Clone)]
pub struct LocalAuthority {
    name: String,
    key: SigningKey,
}

impl LocalAuthority {
    /// Create an authority with a freshly generated key.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::with_key(name, SigningKey::generate(&mut rand::thread_rng()))
    }

    pub fn with_key(name: impl Into<String>, key: SigningKey) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public half of the authority key, for verification.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Issue serialized token bytes for `payload`.
    pub fn issue(&self, payload: &[u8], identity: &str) -> TrustResult<Vec<u8>> {
        if identity.is_empty() {
            return Err(TrustError::InvalidRequest {
                message: "identity must not be empty".to_string(),
            });
        }

        let algorithm = HashAlgorithm::Sha2_256;
        let token = issue_token(
            &self.key,
            algorithm,
            &algorithm.digest_bytes(payload),
            vec![
                IdentitySegment::new(self.name.clone()),
                IdentitySegment::new(identity),
            ],
            Utc::now().trunc_subsecs(0),
        )?;

        debug!(authority = %self.name, identity, "issued local signature token");

        serde_json::to_vec(&token).map_err(|e| TrustError::InvalidResponse {
            message: format!("failed to serialize token: {}", e),
        })
    }
}

#[async_trait]
impl SigningGateway for LocalAuthority {
    async fn sign(&self, payload: &[u8], identity: &str) -> TrustResult<Vec<u8>> {
        self.issue(payload, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::verify_token;

    #[tokio::test]
    async fn test_local_authority_signs_verifiable_tokens() {
        let authority = LocalAuthority::generate("dev-aggregator");
        let artifact = authority.sign(b"payload", "john.smith").await.unwrap();

        let verified = verify_token(&artifact, b"payload", &authority.verifying_key()).unwrap();
        assert_eq!(verified.identity, vec!["dev-aggregator", "john.smith"]);
        assert_eq!(
            authority.extract_identity(&artifact).unwrap(),
            vec!["dev-aggregator", "john.smith"]
        );
    }

    #[tokio::test]
    async fn test_local_authority_rejects_empty_identity() {
        let authority = LocalAuthority::generate("dev-aggregator");
        let result = authority.sign(b"payload", "").await;
        assert!(matches!(result, Err(TrustError::InvalidRequest { .. })));
    }
}
