//! Sessions
//!
//! A session is a signed JWT (cookie for the browser, bearer header for the
//! API) plus an entry in the in-process [`SessionRegistry`]. The token proves
//! who issued it; the registry decides whether it is still live, so logout,
//! account deletion and password reset can revoke it before `exp`.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const SESSION_COOKIE: &str = "nids_session";

const RESET_PURPOSE: &str = "password_reset";
const RESET_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Username
    pub sid: String,  // Session ID
    pub role: String, // User role
    pub exp: usize,   // Expiration timestamp
    pub iat: usize,   // Issued at
}

impl Claims {
    pub fn login_time(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat as i64, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Freshly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Live sessions keyed by session id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign a token for `username` and register it
    pub fn issue(&self, username: &str, role: &str, secret: &str, hours: u64) -> AppResult<IssuedSession> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(hours as i64);
        let session_id = Uuid::new_v4();

        let claims = Claims {
            sub: username.to_string(),
            sid: session_id.to_string(),
            role: role.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            session_id,
            SessionEntry {
                username: username.to_string(),
                expires_at,
            },
        );

        Ok(IssuedSession {
            token,
            session_id,
            expires_at,
        })
    }

    /// Decode `token` and confirm its session is still registered
    pub fn verify(&self, token: &str, secret: &str) -> AppResult<Claims> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?
        .claims;

        let sid = Uuid::parse_str(&claims.sid).map_err(|_| AppError::SessionInvalid)?;
        let expired = match self.sessions.read().get(&sid) {
            Some(entry) if entry.username == claims.sub => entry.expires_at <= Utc::now(),
            _ => return Err(AppError::SessionInvalid),
        };

        if expired {
            self.sessions.write().remove(&sid);
            return Err(AppError::SessionInvalid);
        }
        Ok(claims)
    }

    pub fn revoke(&self, session_id: Uuid) -> bool {
        self.sessions.write().remove(&session_id).is_some()
    }

    /// Drop every session of `username`, returns how many were removed
    pub fn revoke_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.username.eq_ignore_ascii_case(username));
        before - sessions.len()
    }

    /// Unexpired sessions; expired entries are pruned on the way
    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.len()
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Session token from the `Authorization: Bearer` header or the session cookie
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(session: &IssuedSession, secure: bool) -> String {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// ============================================================================
// PASSWORD RESET TOKENS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: i64,       // User ID
    purpose: String,
    fp: String,     // Fingerprint of the password hash at issue time
    exp: usize,
    iat: usize,
}

/// Short prefix of the current password hash digest. Changing the password
/// changes it, so a reset token is usable once.
fn fingerprint(password_hash: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(password_hash.as_bytes()));
    digest[..16].to_string()
}

/// Signed, short-lived reset token for one account
pub fn issue_reset_token(user_id: i64, password_hash: &str, secret: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = ResetClaims {
        sub: user_id,
        purpose: RESET_PURPOSE.to_string(),
        fp: fingerprint(password_hash),
        exp: (now + Duration::minutes(RESET_MINUTES)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Account id named by a reset token. The caller passes the account's
/// current password hash through [`reset_token_matches`] before acting.
pub fn decode_reset_token(token: &str, secret: &str) -> AppResult<(i64, String)> {
    let claims = decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| invalid_reset())?
    .claims;

    if claims.purpose != RESET_PURPOSE {
        return Err(invalid_reset());
    }
    Ok((claims.sub, claims.fp))
}

pub fn reset_token_matches(fp: &str, password_hash: &str) -> bool {
    fingerprint(password_hash) == fp
}

fn invalid_reset() -> AppError {
    AppError::Validation("Reset link is invalid or has expired.".to_string())
}
