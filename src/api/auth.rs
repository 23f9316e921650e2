// =============================================================================
// Session Token Authentication — Axum Middleware
// =============================================================================
//
// A successful broker login issues a signed session token:
//
//   <session-id>.<issued-at-ms>.<hmac-sha256-hex>
//
// The signature covers `<session-id>.<issued-at-ms>` with the server secret
// from the `TRADESENSE_SESSION_SECRET` environment variable, so tokens are
// stateless: no session table, validity is signature + age. Comparison is
// performed in constant time to prevent timing side-channels.
//
// Usage as an Axum extractor:
//
//   async fn handler(AuthBearer(token): AuthBearer, ...) { ... }
//
// If the token is missing, invalid, or expired, the extractor short-circuits
// the request with a 403 Forbidden response before the handler body executes.
// =============================================================================

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Sessions expire 24 hours after issuance.
const SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices in constant time. Returns `true` if they are
/// identical. The comparison always examines every byte of both slices even
/// when a mismatch is found early, preventing timing side-channels.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// =============================================================================
// Token issue / validate
// =============================================================================

/// Hex HMAC-SHA256 signature of `payload` under `secret`.
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build a token for the given issue time. Split out from [`issue_session_token`]
/// so expiry behavior is testable without touching the clock or environment.
fn issue_with(secret: &str, issued_at_ms: i64) -> String {
    let session_id = uuid::Uuid::new_v4();
    let payload = format!("{session_id}.{issued_at_ms}");
    let signature = sign_payload(secret, &payload);
    format!("{payload}.{signature}")
}

/// Validate a token against `secret` at the given wall-clock time.
fn validate_with(secret: &str, token: &str, now_ms: i64) -> bool {
    // Signature is everything after the last dot; the signed payload is the rest.
    let Some((payload, signature)) = token.rsplit_once('.') else {
        return false;
    };

    let expected = sign_payload(secret, payload);
    if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
        return false;
    }

    let Some((_session_id, issued)) = payload.rsplit_once('.') else {
        return false;
    };
    let Ok(issued_at_ms) = issued.parse::<i64>() else {
        return false;
    };

    let age_ms = now_ms - issued_at_ms;
    (0..=SESSION_TTL_MS).contains(&age_ms)
}

/// Issue a fresh session token, or `None` when the server secret is not
/// configured.
pub fn issue_session_token() -> Option<String> {
    let secret = std::env::var("TRADESENSE_SESSION_SECRET").unwrap_or_default();
    if secret.is_empty() {
        warn!("TRADESENSE_SESSION_SECRET is not set — login cannot issue sessions");
        return None;
    }
    Some(issue_with(&secret, chrono::Utc::now().timestamp_millis()))
}

/// Validate a token string against the configured server secret. Returns
/// `true` if the token is authentic and unexpired.
///
/// This is intended for contexts where the Axum extractor is not usable (e.g.
/// WebSocket upgrade where the token is passed as a query parameter).
pub fn validate_token(token: &str) -> bool {
    let secret = std::env::var("TRADESENSE_SESSION_SECRET").unwrap_or_default();
    if secret.is_empty() {
        return false;
    }
    validate_with(&secret, token, chrono::Utc::now().timestamp_millis())
}

// =============================================================================
// Extractor
// =============================================================================

/// Axum extractor that validates the `Authorization: Bearer <token>` header
/// as a session token.
///
/// If the token is valid the extractor yields the raw token string (useful for
/// downstream logging or audit). If validation fails a 403 response is
/// returned immediately.
pub struct AuthBearer(pub String);

/// Rejection type returned when authentication fails.
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(value) if value.starts_with("Bearer ") => &value[7..],
            _ => {
                warn!("Missing or malformed Authorization header");
                return Err(AuthRejection {
                    status: StatusCode::FORBIDDEN,
                    message: "Missing or invalid session token",
                });
            }
        };

        if !validate_token(token) {
            warn!("Invalid or expired session token presented");
            return Err(AuthRejection {
                status: StatusCode::FORBIDDEN,
                message: "Invalid or expired session token",
            });
        }

        Ok(AuthBearer(token.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
