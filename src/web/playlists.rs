//! Playlist pages and the Spotify connect/import flow.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::errors::AppError;
use crate::import;
use crate::AppState;

use super::flash::{redirect_with_flash, take_flashes, Flash};
use super::pages;
use super::session::CurrentUser;

// ── Request DTOs ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportSelectedForm {
    #[serde(default)]
    pub playlist_id: String,
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

// ── Local Pages ─────────────────────────────────────────────────

/// GET / — the user's imported playlists, newest first
pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let playlists = state.db.list_playlists_for_user(user.id).await?;
    Ok(pages::home_page(take_flashes(&headers), &user, &playlists))
}

/// GET /playlists/:playlist_id — one playlist with its songs
pub async fn playlist_detail(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(playlist_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(playlist) = state.db.get_playlist_for_user(playlist_id, user.id).await? else {
        return Ok(pages::not_found_page(take_flashes(&headers)));
    };
    let songs = state.db.songs_for_playlist(playlist.id).await?;
    Ok(pages::playlist_detail_page(
        take_flashes(&headers),
        &user.username,
        &playlist,
        &songs,
    ))
}

/// POST /playlists/:playlist_id — attach an uploaded photo to one song
pub async fn upload_song_photo(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(playlist_id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(playlist) = state.db.get_playlist_for_user(playlist_id, user.id).await? else {
        return Ok(pages::not_found_page(take_flashes(&headers)));
    };

    let mut song_id: Option<i64> = None;
    let mut photo: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?
    {
        match field.name() {
            Some("song_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                song_id = text.trim().parse().ok();
            }
            Some("photo") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
                if !bytes.is_empty() {
                    photo = Some((name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    let flash = match (song_id, photo) {
        (Some(song_id), Some((name, bytes))) => {
            match state.db.get_song_in_playlist(song_id, playlist.id).await? {
                Some(song) => {
                    let stored = state.media.save_song_photo(&name, &bytes).await?;
                    state.db.set_song_photo(song.id, &stored).await?;
                    Flash::success("Photo uploaded successfully.")
                }
                None => Flash::error("Song not found."),
            }
        }
        _ => Flash::error("Select a song and a photo file to upload."),
    };
    Ok(redirect_with_flash(&format!("/playlists/{playlist_id}"), &[flash]))
}

// ── Spotify Connect Flow ────────────────────────────────────────

/// GET /spotify_login — send the browser to the consent screen
pub async fn spotify_login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&state.spotify.auth().authorize_url())
}

/// GET /spotify_callback — OAuth redirect target; stores the token pair
pub async fn spotify_callback(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    if let Some(error) = params.error {
        return Ok(redirect_with_flash(
            "/import_spotify",
            &[Flash::error(format!("Spotify authentication failed: {error}"))],
        ));
    }
    let Some(code) = params.code else {
        return Ok(redirect_with_flash(
            "/import_spotify",
            &[Flash::error("No code provided for Spotify authentication.")],
        ));
    };

    let reconnecting = state.db.get_spotify_token(user.id).await?.is_some();
    match state.spotify.connect_user(&state.db, user.id, &code).await {
        Ok(()) => {
            let message = if reconnecting {
                "Spotify account reconnected successfully."
            } else {
                "New Spotify account connected successfully."
            };
            Ok(redirect_with_flash("/import_spotify", &[Flash::success(message)]))
        }
        Err(AppError::Auth(e)) => {
            warn!(user_id = user.id, "spotify code exchange failed: {e}");
            Ok(redirect_with_flash(
                "/import_spotify",
                &[Flash::error("Failed to authenticate with Spotify.")],
            ))
        }
        Err(other) => Err(other),
    }
}

// ── Import Surface ──────────────────────────────────────────────

/// GET /import_spotify — the picker page, or the raw listing as JSON when
/// asked for via `X-Requested-With: XMLHttpRequest`
pub async fn import_spotify(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(client) = state.spotify.client_for_user(&state.db, user.id).await? else {
        if is_ajax(&headers) {
            return Err(AppError::NotConnected);
        }
        return Ok(redirect_with_flash(
            "/spotify_login",
            &[Flash::info("Connect Spotify to import playlists.")],
        ));
    };

    let listing = import::list_user_playlists(&client).await;

    if is_ajax(&headers) {
        let mut body = json!({ "spotify_playlists": listing.playlists });
        if let Some(error) = listing.error {
            body["error"] = json!(error);
        }
        return Ok(Json(body).into_response());
    }

    let mut flashes = take_flashes(&headers);
    if let Some(error) = &listing.error {
        flashes.push(Flash::error(error.clone()));
    }
    Ok(pages::import_page(flashes, &user.username, &listing.playlists))
}

/// POST /import_selected — import the chosen playlist; always answers in
/// the `{success, message|error, redirect_url}` JSON shape
pub async fn import_selected(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<ImportSelectedForm>,
) -> Result<Response, AppError> {
    let playlist_id = form.playlist_id.trim();
    if playlist_id.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "No playlist selected." })),
        )
            .into_response());
    }

    let client = state
        .spotify
        .client_for_user(&state.db, user.id)
        .await?
        .ok_or(AppError::NotConnected)?;

    let outcome = import::import_playlist(&state.db, &client, playlist_id, user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": outcome.message,
        "redirect_url": format!("/playlists/{}", outcome.playlist_id),
    }))
    .into_response())
}
