//! Painted Playlists — self-hosted playlist library with Spotify import.
//!
//! Users register local accounts, connect Spotify over OAuth2, and pull
//! their playlists (tracks included) into a local database, where each
//! song can be decorated with an uploaded photo.

pub mod cli;
pub mod config;
pub mod errors;
pub mod import;
pub mod jobs;
pub mod media;
pub mod spotify;
pub mod store;
pub mod web;

use config::Config;
use media::MediaStore;
use spotify::SpotifyService;
use store::sqlite::SqliteStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: SqliteStore,
    pub spotify: SpotifyService,
    pub media: MediaStore,
    pub config: Config,
}
