//! Wire types for the trust-service protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current signature token version.
pub const TOKEN_VERSION: u32 = 1;

/// Payload type bound into the token signature.
pub const TOKEN_PAYLOAD_TYPE: &str = "application/vnd.sigbox.signature+json;v=1";

/// Body of `POST /sign`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignRequest {
    /// Algorithm used for `document_hash` (`SHA2_256`).
    pub hash_algorithm: String,

    /// Hex digest of the document being signed.
    pub document_hash: String,

    /// Submitter identity to bind into the token.
    pub identity: String,
}

/// One link of the identity chain recorded in a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentitySegment {
    /// Decoded client identifier.
    pub client_id: String,
}

impl IdentitySegment {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }
}

/// Signature artifact as issued by the trust service.
///
/// Stored verbatim inside containers; the identity chain is ordered outermost
/// (aggregator) first, submitter last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureToken {
    /// Token format version (always 1).
    pub version: u32,

    /// Algorithm of `document_hash`.
    pub hash_algorithm: String,

    /// Hex digest of the signed document.
    pub document_hash: String,

    /// Issuance time.
    pub signed_at: DateTime<Utc>,

    /// Identity chain.
    pub identity: Vec<IdentitySegment>,

    /// `sha256:<hex>` of the issuing key (SPKI DER).
    pub key_id: String,

    /// Base64 ed25519 signature over the PAE of the signable fields.
    pub signature: String,
}

/// Token fields covered by the signature (everything except `signature`).
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SignableToken<'a> {
    pub version: u32,
    pub hash_algorithm: &'a str,
    pub document_hash: &'a str,
    pub signed_at: &'a DateTime<Utc>,
    pub identity: &'a [IdentitySegment],
    pub key_id: &'a str,
}

impl<'a> From<&'a SignatureToken> for SignableToken<'a> {
    fn from(token: &'a SignatureToken) -> Self {
        Self {
            version: token.version,
            hash_algorithm: &token.hash_algorithm,
            document_hash: &token.document_hash,
            signed_at: &token.signed_at,
            identity: &token.identity,
            key_id: &token.key_id,
        }
    }
}

/// Trust-service client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Base URL of the signing service (aggregator).
    #[serde(default = "default_url")]
    pub url: String,

    /// Login identifier for HTTP basic auth.
    #[serde(default)]
    pub login_id: Option<String>,

    /// Login key for HTTP basic auth.
    #[serde(default)]
    pub login_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures. Zero means a single attempt.
    #[serde(default)]
    pub max_retries: u32,
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            login_id: None,
            login_key: None,
            timeout_secs: default_timeout(),
            max_retries: 0,
        }
    }
}

impl TrustConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SIGBOX_AGGREGATOR_URL` | Signing service base URL |
    /// | `SIGBOX_LOGIN_ID` | Login identifier |
    /// | `SIGBOX_LOGIN_KEY` | Login key |
    /// | `SIGBOX_TRUST_TIMEOUT` | Request timeout in seconds (default: 30) |
    /// | `SIGBOX_TRUST_MAX_RETRIES` | Retries for transient failures (default: 0) |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SIGBOX_AGGREGATOR_URL").unwrap_or_else(|_| default_url()),
            login_id: std::env::var("SIGBOX_LOGIN_ID").ok(),
            login_key: std::env::var("SIGBOX_LOGIN_KEY").ok(),
            timeout_secs: std::env::var("SIGBOX_TRUST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("SIGBOX_TRUST_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, login_id: impl Into<String>, login_key: impl Into<String>) -> Self {
        self.login_id = Some(login_id.into());
        self.login_key = Some(login_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_json_shape() {
        let json = r#"{
            "version": 1,
            "hash_algorithm": "SHA2_256",
            "document_hash": "AB",
            "signed_at": "2026-01-28T10:00:00Z",
            "identity": [{"client_id": "agg"}, {"client_id": "alice"}],
            "key_id": "sha256:00",
            "signature": "c2ln"
        }"#;
        let token: SignatureToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.identity.len(), 2);
        assert_eq!(token.identity[1].client_id, "alice");
    }

    #[test]
    fn test_config_builders() {
        let config = TrustConfig::default()
            .with_url("http://ksi.example")
            .with_credentials("anon", "secret")
            .with_timeout_secs(5);
        assert_eq!(config.url, "http://ksi.example");
        assert_eq!(config.login_id.as_deref(), Some("anon"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_retries, 0);
    }
}
