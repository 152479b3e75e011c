//! Signed, expiring preview tokens.
//!
//! Tokens are compact HS256 JWTs: `{header}.{payload}.{signature}`, each
//! segment URL-safe base64 without padding. Verification never reveals why
//! a token was refused; the reason is only logged at debug level.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::util::clock::Clock;

pub const DEFAULT_PREVIEW_TTL_SECONDS: i64 = 300;

const SOURCE: &str = "application::preview";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreviewConfigError {
    #[error("preview secret must not be empty")]
    EmptySecret,
    #[error("preview secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// The only verification failure callers ever see.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid preview token")]
pub struct InvalidPreviewToken;

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewClaims {
    pub entity_id: i64,
    pub actor_id: i64,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaims {
    entity_id: i64,
    #[serde(default)]
    actor_id: i64,
    #[serde(default)]
    issued_at: i64,
    expires_at: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
enum Rejection {
    SegmentCount,
    SignatureMismatch,
    PayloadEncoding,
    PayloadShape,
    MissingExpiry,
    Expired,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::SegmentCount => "segment_count",
            Self::SignatureMismatch => "signature_mismatch",
            Self::PayloadEncoding => "payload_encoding",
            Self::PayloadShape => "payload_shape",
            Self::MissingExpiry => "missing_expiry",
            Self::Expired => "expired",
        }
    }
}

#[derive(Clone)]
pub struct PreviewTokenService {
    mac: HmacSha256,
    default_ttl: i64,
    clock: Arc<dyn Clock>,
}

impl PreviewTokenService {
    pub fn new(
        secret: &str,
        default_ttl_seconds: i64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PreviewConfigError> {
        if secret.is_empty() {
            return Err(PreviewConfigError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PreviewConfigError::InvalidKey)?;
        Ok(Self {
            mac,
            default_ttl: default_ttl_seconds.max(1),
            clock,
        })
    }

    pub fn from_settings(
        settings: &crate::config::PreviewSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PreviewConfigError> {
        let secret = settings.secret.as_deref().unwrap_or_default();
        Self::new(secret, settings.ttl_seconds, clock)
    }

    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    /// Issue a token for `entity_id` valid for `ttl_seconds` (at least 1).
    pub fn issue(&self, entity_id: i64, actor_id: i64, ttl_seconds: i64) -> String {
        let issued_at = self.clock.now_unix();
        let expires_at = issued_at.saturating_add(ttl_seconds.max(1));

        let header = json!({"alg": "HS256", "typ": "JWT"}).to_string();
        let payload = json!({
            "entityId": entity_id,
            "actorId": actor_id,
            "issuedAt": issued_at,
            "expiresAt": expires_at,
        })
        .to_string();

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign(&signing_input);
        format!("{signing_input}.{signature}")
    }

    pub fn issue_default(&self, entity_id: i64, actor_id: i64) -> String {
        self.issue(entity_id, actor_id, self.default_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<PreviewClaims, InvalidPreviewToken> {
        self.check(token).map_err(|rejection| {
            debug!(
                source = SOURCE,
                reason = rejection.as_str(),
                "Preview token rejected"
            );
            InvalidPreviewToken
        })
    }

    fn check(&self, token: &str) -> Result<PreviewClaims, Rejection> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = segments.as_slice() else {
            return Err(Rejection::SegmentCount);
        };

        let expected = self.sign(&format!("{header}.{payload}"));
        if expected.as_bytes().ct_eq(signature.as_bytes()).unwrap_u8() == 0 {
            return Err(Rejection::SignatureMismatch);
        }

        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Rejection::PayloadEncoding)?;
        let raw: RawClaims =
            serde_json::from_slice(&decoded).map_err(|_| Rejection::PayloadShape)?;
        let expires_at = raw.expires_at.ok_or(Rejection::MissingExpiry)?;

        if expires_at < self.clock.now_unix() {
            return Err(Rejection::Expired);
        }

        Ok(PreviewClaims {
            entity_id: raw.entity_id,
            actor_id: raw.actor_id,
            issued_at: raw.issued_at,
            expires_at,
        })
    }

    fn sign(&self, signing_input: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

/// Frontend preview link: `base?preview=true&p={entity_id}&token={token}`.
pub fn preview_url(base: &Url, entity_id: i64, token: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("preview", "true")
        .append_pair("p", &entity_id.to_string())
        .append_pair("token", token);
    url
}
