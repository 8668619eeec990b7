//! Spotify integration: OAuth2 token lifecycle and per-user API clients.

pub mod auth;
pub mod client;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::errors::AppError;
use crate::store::sqlite::{NewSpotifyToken, SqliteStore};

pub use auth::{SpotifyAuth, TokenInfo, SCOPES};
pub use client::{SpotifyApiError, SpotifyClient};

/// Entry point for everything Spotify. Owns the shared HTTP client and
/// hands out [`SpotifyClient`] handles backed by each user's stored token,
/// refreshing expired tokens on demand.
pub struct SpotifyService {
    auth: SpotifyAuth,
    http: reqwest::Client,
    api_base: String,
    /// One lock per user so concurrent requests cannot race the refresh
    /// grant and clobber each other's rotated refresh tokens.
    refresh_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl SpotifyService {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            auth: SpotifyAuth::new(http.clone(), config),
            http,
            api_base: config.spotify_api_url.trim_end_matches('/').to_string(),
            refresh_locks: DashMap::new(),
        })
    }

    pub fn auth(&self) -> &SpotifyAuth {
        &self.auth
    }

    /// Complete the authorization-code flow: exchange `code` at the accounts
    /// service and persist the resulting token pair for `user_id`,
    /// replacing any previously stored token.
    pub async fn connect_user(
        &self,
        db: &SqliteStore,
        user_id: i64,
        code: &str,
    ) -> Result<(), AppError> {
        let token = self
            .auth
            .exchange_code(code)
            .await
            .map_err(|e| AppError::Auth(format!("code exchange failed: {e}")))?;
        let refresh_token = token
            .refresh_token
            .ok_or_else(|| AppError::Auth("token response carried no refresh token".to_string()))?;

        db.upsert_spotify_token(
            user_id,
            &NewSpotifyToken {
                access_token: token.access_token,
                refresh_token,
                token_type: token.token_type,
                expires_in: token.expires_in,
                scope: token.scope,
                created_at: Utc::now(),
            },
        )
        .await?;
        debug!(user_id, "spotify account connected");
        Ok(())
    }

    /// Build an API client for `user_id`, refreshing the stored token first
    /// if its lifetime has elapsed. `Ok(None)` means the user has never
    /// connected a Spotify account.
    pub async fn client_for_user(
        &self,
        db: &SqliteStore,
        user_id: i64,
    ) -> Result<Option<SpotifyClient>, AppError> {
        let Some(token) = db.get_spotify_token(user_id).await? else {
            return Ok(None);
        };
        if !auth::is_expired(token.created_at.timestamp(), token.expires_in, Utc::now().timestamp())
        {
            return Ok(Some(self.client_with(token.access_token)));
        }

        // The arc is cloned out in its own statement so the map shard lock
        // is released before any await.
        let lock = self
            .refresh_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-read: another request may have finished the refresh while this
        // one waited on the lock.
        let Some(token) = db.get_spotify_token(user_id).await? else {
            return Ok(None);
        };
        if !auth::is_expired(token.created_at.timestamp(), token.expires_in, Utc::now().timestamp())
        {
            return Ok(Some(self.client_with(token.access_token)));
        }

        debug!(user_id, "access token expired, refreshing");
        let refreshed = self
            .auth
            .refresh(&token.refresh_token)
            .await
            .map_err(|e| AppError::Auth(format!("token refresh failed: {e}")))?;
        let scope = if refreshed.scope.is_empty() {
            // Refresh responses routinely omit the scope; keep the granted one.
            token.scope.as_str()
        } else {
            refreshed.scope.as_str()
        };
        db.update_spotify_token(
            user_id,
            &refreshed.access_token,
            refreshed.refresh_token.as_deref(),
            &refreshed.token_type,
            refreshed.expires_in,
            scope,
            Utc::now(),
        )
        .await?;
        Ok(Some(self.client_with(refreshed.access_token)))
    }

    fn client_with(&self, access_token: String) -> SpotifyClient {
        SpotifyClient::new(self.http.clone(), &self.api_base, access_token)
    }
}
