//! Wire types for the Spotify Web API.
//!
//! Every field the remote side may omit or null out is an `Option` (or
//! carries a serde default), so malformed entries surface as `None` at the
//! call site instead of failing the whole page.

use serde::Deserialize;

// ── Paged Playlist Listing ──────────────────────────────────────

/// One page of `GET /v1/me/playlists`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistPage {
    /// Entries can be null for playlists the caller lost access to.
    #[serde(default)]
    pub items: Vec<Option<PlaylistEntry>>,
    /// Absolute URL of the next page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tracks: Option<TracksRef>,
}

/// Summary block inside a listing entry; only the count matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    #[serde(default)]
    pub total: u32,
}

// ── Single Playlist With Tracks ─────────────────────────────────

/// `GET /v1/playlists/{id}`: metadata plus the first page of tracks.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub tracks: TracksPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<TrackItem>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackItem {
    /// Null for removed or unplayable entries; callers skip those.
    #[serde(default)]
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    /// Null for local files, which have no catalog id.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Error Envelope ──────────────────────────────────────────────

/// Body shape of a non-2xx API response: `{"error": {"status", "message"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
