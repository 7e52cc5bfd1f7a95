//! Signature token encoding, identity extraction and verification.
//!
//! # Signing Process
//!
//! ```text
//! 1. document_hash = HEX(SHA2_256(payload))
//! 2. signable = token fields without `signature`
//! 3. canonical = JCS(signable)
//! 4. PAE = DSSEv1_PAE(TOKEN_PAYLOAD_TYPE, canonical)
//! 5. signature = base64(ed25519_sign(key, PAE))
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{TrustError, TrustResult};
use crate::hash::HashAlgorithm;
use crate::types::{
    IdentitySegment, SignableToken, SignatureToken, TOKEN_PAYLOAD_TYPE, TOKEN_VERSION,
};

/// Result of successful token verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub key_id: String,
    pub signed_at: DateTime<Utc>,
    pub identity: Vec<String>,
}

/// Parse raw artifact bytes into a token.
pub fn decode_token(artifact: &[u8]) -> TrustResult<SignatureToken> {
    let token: SignatureToken = serde_json::from_slice(artifact)
        .map_err(|e| TrustError::malformed(format!("invalid token JSON: {}", e)))?;

    if token.version != TOKEN_VERSION {
        return Err(TrustError::malformed(format!(
            "unsupported token version {}",
            token.version
        )));
    }
    if token.identity.is_empty() {
        return Err(TrustError::malformed("identity chain is empty"));
    }

    Ok(token)
}

/// Recover the identity chain from a stored artifact.
///
/// The chain is ordered outermost first; the last element is the submitter.
pub fn extract_identity(artifact: &[u8]) -> TrustResult<Vec<String>> {
    let token = decode_token(artifact)?;
    Ok(token
        .identity
        .into_iter()
        .map(|segment| segment.client_id)
        .collect())
}

/// Compute key_id from a verifying key (`sha256:<lowercase-hex>` of SPKI DER).
pub fn compute_key_id(key: &VerifyingKey) -> TrustResult<String> {
    use ed25519_dalek::pkcs8::EncodePublicKey;
    let doc = key.to_public_key_der().map_err(|e| TrustError::Config {
        message: format!("failed to encode public key as SPKI DER: {}", e),
    })?;
    Ok(format!("sha256:{}", hex::encode(Sha256::digest(doc.as_bytes()))))
}

/// Build DSSE Pre-Authentication Encoding (PAE).
///
/// ```text
/// PAE(type, payload) = "DSSEv1" SP LEN(type) SP type SP LEN(payload) SP payload
/// ```
fn build_pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let type_len = payload_type.len().to_string();
    let payload_len = payload.len().to_string();

    let mut pae = Vec::new();
    pae.extend_from_slice(b"DSSEv1 ");
    pae.extend_from_slice(type_len.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload_type.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload_len.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload);
    pae
}

fn signable_pae(token: &SignatureToken) -> TrustResult<Vec<u8>> {
    let canonical = serde_jcs::to_vec(&SignableToken::from(token))
        .map_err(|e| TrustError::malformed(format!("failed to canonicalize token: {}", e)))?;
    Ok(build_pae(TOKEN_PAYLOAD_TYPE, &canonical))
}

/// Issue a token binding `document_hash` to `identity`, signed by `key`.
pub(crate) fn issue_token(
    key: &SigningKey,
    algorithm: HashAlgorithm,
    document_hash: &str,
    identity: Vec<IdentitySegment>,
    signed_at: DateTime<Utc>,
) -> TrustResult<SignatureToken> {
    let mut token = SignatureToken {
        version: TOKEN_VERSION,
        hash_algorithm: algorithm.name().to_string(),
        document_hash: document_hash.to_string(),
        signed_at,
        identity,
        key_id: compute_key_id(&key.verifying_key())?,
        signature: String::new(),
    };

    let pae = signable_pae(&token)?;
    let signature: ed25519_dalek::Signature = key.sign(&pae);
    token.signature = BASE64.encode(signature.to_bytes());
    Ok(token)
}

/// Check that a decoded token binds `payload`.
pub fn check_binding(token: &SignatureToken, payload: &[u8]) -> TrustResult<()> {
    let algorithm = HashAlgorithm::from_name(&token.hash_algorithm).ok_or_else(|| {
        TrustError::malformed(format!("unknown hash algorithm {}", token.hash_algorithm))
    })?;
    let computed = algorithm.digest_bytes(payload);
    if !computed.eq_ignore_ascii_case(&token.document_hash) {
        return Err(TrustError::DocumentHashMismatch {
            claimed: token.document_hash.clone(),
            computed,
        });
    }
    Ok(())
}

/// Verify a stored artifact against the payload it claims to sign.
///
/// # Algorithm
///
/// 1. Decode the token
/// 2. Recompute the payload digest and compare to `document_hash`
/// 3. Check `key_id` against the trusted key
/// 4. Verify the ed25519 signature over the PAE
pub fn verify_token(
    artifact: &[u8],
    payload: &[u8],
    trusted_key: &VerifyingKey,
) -> TrustResult<VerifiedToken> {
    let token = decode_token(artifact)?;

    check_binding(&token, payload)?;

    let actual_key_id = compute_key_id(trusted_key)?;
    if token.key_id != actual_key_id {
        return Err(TrustError::KeyIdMismatch {
            claimed: token.key_id.clone(),
            actual: actual_key_id,
        });
    }

    let pae = signable_pae(&token)?;
    let signature_bytes = BASE64
        .decode(&token.signature)
        .map_err(|e| TrustError::malformed(format!("invalid base64 signature: {}", e)))?;
    let signature = ed25519_dalek::Signature::from_slice(&signature_bytes)
        .map_err(|e| TrustError::malformed(format!("invalid signature bytes: {}", e)))?;

    trusted_key
        .verify(&pae, &signature)
        .map_err(|_| TrustError::SignatureInvalid)?;

    Ok(VerifiedToken {
        key_id: token.key_id,
        signed_at: token.signed_at,
        identity: token.identity.into_iter().map(|s| s.client_id).collect(),
    })
}
