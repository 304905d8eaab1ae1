//! Webhook signature verification.
//!
//! Each provider authenticates its webhooks differently:
//!
//! - Stripe: `Stripe-Signature: t=<unix>,v1=<hex hmac-sha256("{t}.{body}")>`
//! - PagBank: `x-authenticity-token: <hex sha256("{token}-{body}")>`
//! - Identity: `x-webhook-signature: <HS256 JWT>` whose `sha256` claim is
//!   the hex digest of the body
//!
//! All comparisons are constant-time. Timestamps are passed in so the checks
//! stay deterministic under test.

use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum age of a signed Stripe timestamp, in seconds.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Errors verifying a webhook signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature header was absent.
    #[error("missing signature header")]
    Missing,

    /// The header could not be parsed.
    #[error("malformed signature header: {0}")]
    Malformed(String),

    /// The signed timestamp is outside the tolerance window.
    #[error("signature timestamp outside tolerance")]
    Expired,

    /// The signature did not match.
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a Stripe webhook signature header against the raw body.
///
/// # Errors
///
/// Returns `SignatureError` if the header is malformed, stale, or no `v1`
/// signature matches.
pub fn verify_stripe(
    secret: &SecretString,
    header: &str,
    body: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| SignatureError::Malformed("missing t".into()))?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed("missing v1".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::Malformed("invalid timestamp".into()))?;
    if now.abs_diff(ts) > STRIPE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let expected = hex::encode(hmac_sha256(
        secret.expose_secret().as_bytes(),
        format!("{timestamp}.{body}").as_bytes(),
    ));

    if signatures
        .iter()
        .any(|sig| constant_time_compare(&expected, sig))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Verify a PagBank `x-authenticity-token` header.
///
/// # Errors
///
/// Returns `SignatureError::Mismatch` if the digest does not match.
pub fn verify_pagbank(token: &SecretString, header: &str, body: &str) -> Result<(), SignatureError> {
    let mut hasher = Sha256::new();
    hasher.update(token.expose_secret().as_bytes());
    hasher.update(b"-");
    hasher.update(body.as_bytes());
    let expected = hex::encode(hasher.finalize());

    if constant_time_compare(&expected, &header.trim().to_ascii_lowercase()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Claims carried by an identity webhook JWT.
#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookClaims {
    /// Hex SHA-256 of the request body.
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Verify an identity webhook JWT against the raw body.
///
/// `exp` is optional; when present it is checked against `now`.
///
/// # Errors
///
/// Returns `SignatureError` if the token is malformed, not HS256, expired,
/// incorrectly signed, or signs a different body.
pub fn verify_identity(
    secret: &SecretString,
    token: &str,
    body: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let claims = decode::<WebhookClaims>(
        token.trim(),
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => SignatureError::Mismatch,
        _ => SignatureError::Malformed(e.to_string()),
    })?
    .claims;

    if claims.exp.is_some_and(|exp| exp < now) {
        return Err(SignatureError::Expired);
    }

    let body_digest = hex::encode(Sha256::digest(body.as_bytes()));
    if constant_time_compare(&body_digest, &claims.sha256.to_ascii_lowercase()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
