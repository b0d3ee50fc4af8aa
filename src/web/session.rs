use crate::domain::models::AdminContext;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub admin_id: Uuid,
    pub name: String,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
}

/// Signs `admin_id|exp|name`. Sessions are issued by the login collaborator; this
/// lives here so both sides agree on the format.
pub fn sign_session(admin_id: Uuid, name: &str, key: &[u8], ttl: Duration) -> Result<String, SessionError> {
    let exp = Utc::now() + ttl;
    let payload = format!("{}|{}|{}", admin_id, exp.timestamp(), name);
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::STANDARD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes).map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    // Display names may contain '|', so the name is whatever follows the second one.
    let mut pieces = payload.splitn(3, '|');
    let admin_id = pieces
        .next()
        .and_then(|p| Uuid::parse_str(p).ok())
        .ok_or(SessionError::Invalid)?;
    let exp: i64 = pieces
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or(SessionError::Invalid)?;
    let name = pieces.next().ok_or(SessionError::Invalid)?.to_string();

    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims { admin_id, name, exp })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(val) = auth.to_str() {
            if let Some(bearer) = val.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    super::flash::cookie_value(headers, "session").map(str::to_string)
}

/// Extractor for admin-only handlers. Yields the verified [`AdminContext`].
///
/// ```ignore
/// async fn handler(AdminSession(admin): AdminSession) -> Result<..., AppError> { ... }
/// ```
pub struct AdminSession(pub AdminContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = verify_session(&token, &shared_state.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            AppError::Unauthorized
        })?;

        Ok(AdminSession(AdminContext {
            admin_id: claims.admin_id,
            name: claims.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn round_trips_claims() {
        let id = Uuid::new_v4();
        let token = sign_session(id, "Admin | Prodi TI", KEY, Duration::hours(1)).unwrap();
        let claims = verify_session(&token, KEY).unwrap();
        assert_eq!(claims.admin_id, id);
        assert_eq!(claims.name, "Admin | Prodi TI");
    }

    #[test]
    fn rejects_tampering_and_expiry() {
        let id = Uuid::new_v4();
        let token = sign_session(id, "Admin", KEY, Duration::hours(1)).unwrap();
        assert!(matches!(
            verify_session(&token, b"another key of the same length!!"),
            Err(SessionError::Signature)
        ));
        assert!(matches!(verify_session("garbage", KEY), Err(SessionError::Invalid)));

        let expired = sign_session(id, "Admin", KEY, Duration::seconds(-5)).unwrap();
        assert!(matches!(verify_session(&expired, KEY), Err(SessionError::Expired)));
    }

    #[test]
    fn token_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("flash=x; session=abc.def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok.sig"));
        assert_eq!(extract_token(&headers).as_deref(), Some("tok.sig"));
    }
}
