//! Cookie sessions and password hashing.
//!
//! The browser holds a random token; the database holds only its keyed
//! hash, so a leaked table cannot be replayed as a cookie.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::AppError;
use crate::store::sqlite::{SqliteStore, UserRow};
use crate::AppState;

pub const SESSION_COOKIE: &str = "pp_session";
const SESSION_TTL_SECS: i64 = 14 * 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated user, inserted as a request extension by
/// [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

// ── Token And Password Primitives ───────────────────────────────

/// Keyed hash of a raw session token, as stored in the sessions table.
pub fn hash_session_token(session_key: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(session_key.as_bytes())
        .expect("hmac-sha256 accepts keys of any length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored argon2 hash. An
/// unparseable stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ── Session Lifecycle ───────────────────────────────────────────

/// Mint a session for `user_id` and return the raw cookie token.
pub async fn create_session(
    db: &SqliteStore,
    session_key: &str,
    user_id: i64,
) -> Result<String, AppError> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);

    let expires_at = Utc::now().timestamp() + SESSION_TTL_SECS;
    db.insert_session(&hash_session_token(session_key, &token), user_id, expires_at)
        .await?;
    Ok(token)
}

/// Resolve a raw cookie token to its user, if the session is still live.
pub async fn user_for_token(
    db: &SqliteStore,
    session_key: &str,
    token: &str,
) -> Result<Option<UserRow>, AppError> {
    let user = db
        .get_session_user(&hash_session_token(session_key, token), Utc::now().timestamp())
        .await?;
    Ok(user)
}

pub async fn destroy_session(
    db: &SqliteStore,
    session_key: &str,
    token: &str,
) -> Result<bool, AppError> {
    let deleted = db.delete_session(&hash_session_token(session_key, token)).await?;
    Ok(deleted)
}

// ── Cookie Plumbing ─────────────────────────────────────────────

/// Value of `name` from the request's Cookie header, if present.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

pub fn session_cookie_header(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}")
}

pub fn clear_session_cookie_header() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ── Middleware ──────────────────────────────────────────────────

/// Gate for everything behind a login: resolves the session cookie to a
/// user and stashes it as [`CurrentUser`]; anonymous requests are bounced
/// to the login page.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match cookie_value(request.headers(), SESSION_COOKIE) {
        Some(token) => user_for_token(&state.db, &state.config.session_key, &token).await?,
        None => None,
    };
    match user {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        None => Ok(Redirect::to("/login").into_response()),
    }
}
