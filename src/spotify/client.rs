//! Authenticated requests against the Spotify Web API.

use std::fmt;

use serde::de::DeserializeOwned;
use url::Url;

use super::models::{ApiErrorBody, PlaylistDetail, PlaylistPage, TracksPage};

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    #[error("spotify request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("spotify returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("page cursor points off the API host: {0}")]
    ForeignCursor(String),
}

/// Short-lived handle bound to one user's current access token.
///
/// Obtained from [`super::SpotifyService::client_for_user`], which has
/// already refreshed the token if needed; the handle itself never refreshes.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl SpotifyClient {
    pub(crate) fn new(http: reqwest::Client, api_base: &str, access_token: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// One page of the authorized user's playlists.
    pub async fn current_user_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<PlaylistPage, SpotifyApiError> {
        let url = format!(
            "{}/v1/me/playlists?limit={limit}&offset={offset}",
            self.api_base
        );
        self.get_json(&url).await
    }

    /// Playlist metadata plus its first page of tracks.
    pub async fn playlist(&self, playlist_id: &str) -> Result<PlaylistDetail, SpotifyApiError> {
        let url = format!("{}/v1/playlists/{playlist_id}", self.api_base);
        self.get_json(&url).await
    }

    /// Follow a `next` cursor from a previous tracks page. Cursors are
    /// absolute URLs minted by the API; anything pointing off the configured
    /// host is refused so the bearer token never leaves it.
    pub async fn tracks_page(&self, next_url: &str) -> Result<TracksPage, SpotifyApiError> {
        if !same_origin(&self.api_base, next_url) {
            return Err(SpotifyApiError::ForeignCursor(next_url.to_string()));
        }
        self.get_json(next_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SpotifyApiError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            let message = if body.error.message.is_empty() {
                status.to_string()
            } else {
                body.error.message
            };
            return Err(SpotifyApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

// The bearer token must never reach log or panic output.
impl fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("api_base", &self.api_base)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn same_origin(api_base: &str, candidate: &str) -> bool {
    match (Url::parse(api_base), Url::parse(candidate)) {
        (Ok(base), Ok(next)) => {
            base.scheme() == next.scheme()
                && base.host_str() == next.host_str()
                && base.port_or_known_default() == next.port_or_known_default()
        }
        _ => false,
    }
}
