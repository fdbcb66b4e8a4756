//! Bearer-token issuance and verification.
//!
//! Callers exchange a configured `(client_id, client_secret)` pair for a
//! short-lived HS256 token at `POST /v1/auth/token`; the chat endpoint
//! requires that token via `Authorization: Bearer <token>`. The client
//! secret doubles as the signing key and is read from the environment
//! once at startup. Credential and signature comparisons run in
//! constant time over SHA-256 digests so nothing about length or prefix
//! leaks.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use cr_domain::error::{Error, Result};

use crate::state::AppState;

/// Issued-at backdate applied to every token, tolerating clock drift
/// between the gateway and token-validating peers.
const CLOCK_SKEW_BACKDATE_SECS: i64 = 100;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Claims
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at (unix seconds, backdated).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Subject: the user this token was issued for.
    pub sub: String,
}

/// A freshly issued token plus its advertised lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TokenSigner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Issues and verifies HS256 bearer tokens against the configured
/// client credential pair.
pub struct TokenSigner {
    client_id: String,
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl TokenSigner {
    pub fn new(client_id: impl Into<String>, secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// Verify the credential pair and issue a token for `user_id`.
    pub fn issue(
        &self,
        client_id: &str,
        client_secret: &str,
        user_id: &str,
    ) -> Result<IssuedToken> {
        let id_ok = digest_eq(client_id.as_bytes(), self.client_id.as_bytes());
        let secret_ok = digest_eq(client_secret.as_bytes(), &self.secret);
        // Evaluate both before branching.
        if !(id_ok & secret_ok) {
            return Err(Error::Auth("invalid credentials".into()));
        }

        let token = self.issue_at(user_id, chrono::Utc::now().timestamp())?;
        Ok(IssuedToken {
            access_token: token,
            token_type: "Bearer",
            expires_in: self.ttl_secs,
        })
    }

    /// Verify a presented token: signature, shape, and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut parts = token.splitn(3, '.');
        let (header_b64, claims_b64, sig_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s)) => (h, c, s),
            _ => return Err(Error::Auth("malformed token".into())),
        };

        let header: serde_json::Value = serde_json::from_slice(&b64_decode(header_b64)?)
            .map_err(|_| Error::Auth("malformed token header".into()))?;
        if header["alg"] != "HS256" {
            return Err(Error::Auth("unsupported token algorithm".into()));
        }

        let expected = self.signature(header_b64, claims_b64);
        let presented = b64_decode(sig_b64)?;
        if !bool::from(Sha256::digest(&expected).ct_eq(&Sha256::digest(&presented))) {
            return Err(Error::Auth("invalid token signature".into()));
        }

        let claims: Claims = serde_json::from_slice(&b64_decode(claims_b64)?)
            .map_err(|_| Error::Auth("malformed token claims".into()))?;
        if chrono::Utc::now().timestamp() >= claims.exp {
            return Err(Error::Auth("token expired".into()));
        }

        Ok(claims)
    }

    /// Build and sign a token with `iat`/`exp` derived from `now`.
    /// Split out from [`issue`](Self::issue) so expiry behavior is
    /// testable without waiting.
    fn issue_at(&self, user_id: &str, now: i64) -> Result<String> {
        let claims = Claims {
            iat: now - CLOCK_SKEW_BACKDATE_SECS,
            exp: now + self.ttl_secs as i64,
            sub: user_id.to_owned(),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims_b64 =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(Error::Json)?);
        let sig = self.signature(&header_b64, &claims_b64);

        Ok(format!(
            "{header_b64}.{claims_b64}.{}",
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    fn signature(&self, header_b64: &str, claims_b64: &str) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time equality over fixed-length digests, so comparing
/// attacker-controlled input leaks neither length nor prefix.
fn digest_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(Sha256::digest(a).ct_eq(&Sha256::digest(b)))
}

fn b64_decode(segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| Error::Auth("malformed token encoding".into()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Middleware
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Axum middleware enforcing bearer-token auth on protected routes.
/// Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    match state.tokens.verify(provided) {
        Ok(_claims) => next.run(req).await,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            (
                axum::http::StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({ "error": "invalid or missing bearer token" })),
            )
                .into_response()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn signer() -> TokenSigner {
        TokenSigner::new("client-a", b"super-secret".to_vec(), 3600)
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let signer = signer();
        let issued = signer.issue("client-a", "super-secret", "user-1").unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = signer.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 3600 + CLOCK_SKEW_BACKDATE_SECS);
    }

    #[test]
    fn issued_at_is_backdated() {
        let signer = signer();
        let now = chrono::Utc::now().timestamp();
        let token = signer.issue_at("u", now).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.iat, now - CLOCK_SKEW_BACKDATE_SECS);
    }

    #[test]
    fn wrong_client_id_is_rejected() {
        let err = signer().issue("other", "super-secret", "u").unwrap_err();
        assert_eq!(err.kind(), "auth");
    }

    #[test]
    fn wrong_secret_is_rejected_and_no_token_returned() {
        let result = signer().issue("client-a", "wrong", "u");
        assert!(result.is_err());
    }

    #[test]
    fn tampered_claims_fail_verification() {
        let signer = signer();
        let issued = signer.issue("client-a", "super-secret", "user-1").unwrap();
        let mut parts: Vec<&str> = issued.access_token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"iat":0,"exp":9999999999,"sub":"admin"}"#);
        parts[1] = &forged;
        assert!(signer.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let other = TokenSigner::new("client-a", b"different-secret".to_vec(), 3600);
        let issued = other.issue("client-a", "different-secret", "u").unwrap();
        assert!(signer().verify(&issued.access_token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer();
        // Issued far enough in the past that exp is already behind us.
        let token = signer
            .issue_at("u", chrono::Utc::now().timestamp() - 7200)
            .unwrap();
        let err = signer.verify(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let signer = signer();
        assert!(signer.verify("").is_err());
        assert!(signer.verify("a.b").is_err());
        assert!(signer.verify("not-base64.!!.sig").is_err());
    }

    #[test]
    fn alg_none_is_rejected() {
        let signer = signer();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"iat":0,"exp":9999999999,"sub":"u"}"#);
        let token = format!("{header}.{claims}.");
        assert!(signer.verify(&token).is_err());
    }
}
