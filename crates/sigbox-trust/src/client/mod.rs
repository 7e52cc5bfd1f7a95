//! Trust-service client for signing manifests.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{TrustError, TrustResult};
use crate::gateway::SigningGateway;
use crate::hash::HashAlgorithm;
use crate::token::{check_binding, decode_token};
use crate::types::{SignRequest, TrustConfig};

mod http;

use http::HttpBackend;

/// User agent sent with every request.
pub const TRUST_USER_AGENT: &str = concat!("sigbox-trust/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a networked signing authority.
#[derive(Debug, Clone)]
pub struct TrustClient {
    http: HttpBackend,
}

impl TrustClient {
    pub fn new(config: TrustConfig) -> TrustResult<Self> {
        if config.login_id.is_some() != config.login_key.is_some() {
            return Err(TrustError::Config {
                message: "login id and login key must be configured together".to_string(),
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(TRUST_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| TrustError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let base_url = config.url.trim_end_matches('/').to_string();

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                config,
            },
        })
    }

    pub fn from_env() -> TrustResult<Self> {
        Self::new(TrustConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.config.login_id.is_some()
    }

    fn sign_url(&self) -> String {
        format!("{}/sign", self.http.base_url)
    }
}

#[async_trait]
impl SigningGateway for TrustClient {
    async fn sign(&self, payload: &[u8], identity: &str) -> TrustResult<Vec<u8>> {
        let algorithm = HashAlgorithm::Sha2_256;
        let request = SignRequest {
            hash_algorithm: algorithm.name().to_string(),
            document_hash: algorithm.digest_bytes(payload),
            identity: identity.to_string(),
        };

        let url = self.sign_url();
        debug!(url = %url, identity, document_hash = %request.document_hash, "requesting signature");

        let artifact = self.http.post_sign(&url, &request).await?;

        // Refuse to hand back a token that does not bind what we asked for.
        let token = decode_token(&artifact).map_err(|e| TrustError::InvalidResponse {
            message: e.to_string(),
        })?;
        check_binding(&token, payload).map_err(|e| TrustError::InvalidResponse {
            message: e.to_string(),
        })?;
        let submitter = token.identity.last().map(|s| s.client_id.as_str());
        if submitter != Some(identity) {
            return Err(TrustError::InvalidResponse {
                message: format!(
                    "token bound to identity {:?}, requested {:?}",
                    submitter, identity
                ),
            });
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = TrustClient::new(TrustConfig::default().with_url("http://ksi.test/gw/")).unwrap();
        assert_eq!(client.base_url(), "http://ksi.test/gw");
        assert_eq!(client.sign_url(), "http://ksi.test/gw/sign");
    }

    #[test]
    fn test_half_configured_credentials_rejected() {
        let mut config = TrustConfig::default();
        config.login_id = Some("anon".to_string());
        assert!(matches!(
            TrustClient::new(config),
            Err(TrustError::Config { .. })
        ));
    }

    #[test]
    fn test_is_authenticated() {
        let anon = TrustClient::new(TrustConfig::default()).unwrap();
        assert!(!anon.is_authenticated());

        let authed =
            TrustClient::new(TrustConfig::default().with_credentials("anon", "anon")).unwrap();
        assert!(authed.is_authenticated());
    }
}
