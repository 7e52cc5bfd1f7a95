//! HTTP layer: status mapping and retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use tracing::warn;

use crate::error::{TrustError, TrustResult};
use crate::types::{SignRequest, TrustConfig};

/// HTTP backend (holds reqwest client and config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) config: TrustConfig,
}

impl HttpBackend {
    /// POST a sign request and return the raw artifact body.
    pub(crate) async fn post_sign(&self, url: &str, body: &SignRequest) -> TrustResult<Vec<u8>> {
        let mut retries: u32 = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.post_sign_once(url, body).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        TrustError::RateLimited {
                            retry_after: Some(retry_after),
                        } => (*retry_after).min(Duration::from_secs(30)),
                        _ => {
                            let ceiling = base_backoff(retries);
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying sign request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_sign_once(&self, url: &str, body: &SignRequest) -> TrustResult<Vec<u8>> {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(body);

        if let Some(login_id) = &self.config.login_id {
            request = request.basic_auth(login_id, self.config.login_key.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TrustError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                TrustError::from(e)
            }
        })?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => {
                let bytes = response.bytes().await.map_err(|e| TrustError::Network {
                    message: format!("failed to read response body: {}", e),
                })?;
                Ok(bytes.to_vec())
            }

            401 | 403 => Err(TrustError::Unauthorized {
                message: "credentials rejected by trust service".to_string(),
            }),

            400 | 422 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(TrustError::InvalidRequest { message })
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(TrustError::RateLimited { retry_after })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(TrustError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

/// Exponential backoff ceiling for the given attempt, capped at 30s.
fn base_backoff(retries: u32) -> Duration {
    Duration::from_secs(1u64 << retries.min(5)).min(Duration::from_secs(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_backoff_is_capped() {
        assert_eq!(base_backoff(1), Duration::from_secs(2));
        assert_eq!(base_backoff(4), Duration::from_secs(16));
        assert_eq!(base_backoff(5), Duration::from_secs(30));
        assert_eq!(base_backoff(64), Duration::from_secs(30));
        assert_eq!(base_backoff(u32::MAX), Duration::from_secs(30));
    }
}
