//! Playlist listing and import against a connected Spotify account.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::spotify::SpotifyClient;
use crate::store::sqlite::SqliteStore;

/// Fixed page size for walking the user's playlist collection.
const PAGE_SIZE: u32 = 50;

/// One selectable playlist in the import picker. Serialized as-is into the
/// `{"spotify_playlists": [...]}` listing payload.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistChoice {
    pub id: String,
    pub name: String,
    pub tracks: u32,
}

/// Listing outcome. A failure anywhere voids the whole listing: `playlists`
/// is empty and `error` holds the user-facing message. Listing never
/// propagates an error past this boundary.
#[derive(Debug)]
pub struct PlaylistListing {
    pub playlists: Vec<PlaylistChoice>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ImportOutcome {
    /// Local row id of the imported playlist, for post-import navigation.
    pub playlist_id: i64,
    pub message: String,
}

/// Fetch every playlist of the authorized user, [`PAGE_SIZE`] at a time,
/// in server order.
pub async fn list_user_playlists(client: &SpotifyClient) -> PlaylistListing {
    let mut collected = Vec::new();
    let mut offset = 0;
    loop {
        let page = match client.current_user_playlists(PAGE_SIZE, offset).await {
            Ok(page) => page,
            Err(e) => {
                warn!(offset, "playlist listing failed: {e}");
                return PlaylistListing {
                    playlists: Vec::new(),
                    error: Some(format!("Error fetching playlists: {e}")),
                };
            }
        };
        if page.items.is_empty() {
            break;
        }
        for entry in page.items {
            let Some(entry) = entry else {
                warn!("null playlist entry in listing, skipping");
                continue;
            };
            collected.push(PlaylistChoice {
                id: entry.id.unwrap_or_else(|| "Unknown ID".to_string()),
                name: entry.name.unwrap_or_else(|| "Unknown Name".to_string()),
                tracks: entry.tracks.map(|t| t.total).unwrap_or(0),
            });
        }
        if page.next.is_none() {
            break;
        }
        offset += PAGE_SIZE;
    }
    PlaylistListing {
        playlists: collected,
        error: None,
    }
}

/// Import one playlist and its full track list for `user_id`.
///
/// Upserts are keyed by external id, so re-importing updates rows in place.
/// There is no transaction around the walk: an error partway through leaves
/// the tracks upserted so far in place and surfaces as [`AppError::Import`].
pub async fn import_playlist(
    db: &SqliteStore,
    client: &SpotifyClient,
    spotify_playlist_id: &str,
    user_id: i64,
) -> Result<ImportOutcome, AppError> {
    let detail = client
        .playlist(spotify_playlist_id)
        .await
        .map_err(|e| AppError::Import(format!("Spotify API error: {e}")))?;

    let title = detail.name.unwrap_or_else(|| "Imported Playlist".to_string());
    let description = detail.description.unwrap_or_default();
    let playlist_id = db
        .upsert_playlist_by_spotify_id(spotify_playlist_id, &title, &description, user_id)
        .await?;

    let mut page = detail.tracks;
    loop {
        for item in &page.items {
            let Some(track) = item.track.as_ref() else {
                debug!("null track item, skipping");
                continue;
            };
            let Some(track_id) = track.id.as_deref() else {
                // Local files carry no catalog id and cannot be keyed.
                warn!(playlist = spotify_playlist_id, "track without an id, skipping");
                continue;
            };
            let track_title = track.name.as_deref().unwrap_or("Untitled");
            db.upsert_song_by_spotify_id(track_id, track_title, playlist_id)
                .await?;
        }
        let Some(next) = page.next else {
            break;
        };
        page = client
            .tracks_page(&next)
            .await
            .map_err(|e| AppError::Import(format!("Spotify API error: {e}")))?;
    }

    let count = db.count_songs(playlist_id).await?;
    info!(user_id, playlist_id, count, "playlist imported");
    Ok(ImportOutcome {
        playlist_id,
        message: format!("Playlist \"{title}\" imported successfully with {count} songs."),
    })
}
