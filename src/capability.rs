//! Capability tokens — minting and verification of action-scoped device
//! management tokens.
//!
//! A token is an HS256 JWT binding a (`deviceId`, `action`) pair to an
//! absolute expiry. Possession of a valid token is the only authentication
//! the action endpoints have, so validity must be a pure function of
//! signature + expiry + binding: no revocation list, no single-use tracking,
//! no session lookup.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::device::DeviceStatus;

/// Default token lifetime: 10 minutes from issuance.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 600;

/// A management action a capability token can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Approve,
    Block,
    Remove,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Approve, Action::Block, Action::Remove];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Block => "block",
            Action::Remove => "remove",
        }
    }

    /// The status the device ends up in, or `None` for `Remove` (the record
    /// is deleted rather than re-labelled).
    pub fn target_status(&self) -> Option<DeviceStatus> {
        match self {
            Action::Approve => Some(DeviceStatus::Approved),
            Action::Block => Some(DeviceStatus::Blocked),
            Action::Remove => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(String);

impl std::str::FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Action::Approve),
            "block" => Ok(Action::Block),
            "remove" => Ok(Action::Remove),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Claims carried by a capability token. Wire names match the links the
/// issuer hands out (`deviceId`, `action`, `exp`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClaims {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub action: Action,
    /// Absolute expiry, Unix seconds. Embedded at issuance so verification
    /// only needs the verifier's own clock.
    pub exp: i64,
}

/// Why verification failed. Internal only: every variant collapses to the
/// same 401 at the API edge, so a caller can never learn which check
/// tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    Malformed,
    BadSignature,
    Expired,
    ActionMismatch,
    DeviceMismatch,
}

/// Mint a token authorizing `action` on `device_id` until `now + ttl_secs`.
pub fn mint(
    secret: &str,
    device_id: &str,
    action: Action,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = ActionClaims {
        device_id: device_id.to_string(),
        action,
        exp: now.timestamp() + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token against the (`device_id`, `action`) pair derived from the
/// request path, at instant `now`.
///
/// Check order: signature, expiry, binding. The expiry boundary is exact and
/// exclusive — a token is accepted strictly before `exp` and rejected at and
/// after it, with zero leeway.
pub fn verify(
    secret: &str,
    token: &str,
    device_id: &str,
    action: Action,
    now: DateTime<Utc>,
) -> Result<ActionClaims, VerifyError> {
    // jsonwebtoken checks the signature; expiry is checked by hand below so
    // the boundary semantics stay in one place.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation.leeway = 0;

    let data = decode::<ActionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => VerifyError::BadSignature,
        _ => VerifyError::Malformed,
    })?;

    let claims = data.claims;
    if now.timestamp() >= claims.exp {
        return Err(VerifyError::Expired);
    }
    if claims.action != action {
        return Err(VerifyError::ActionMismatch);
    }
    if claims.device_id != device_id {
        return Err(VerifyError::DeviceMismatch);
    }
    Ok(claims)
}

// ── Tests ────────────────────────────────────────────────────
