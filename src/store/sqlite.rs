use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SpotifyTokenRow {
    pub id: i64,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
    /// Issued-at: set on first authorization, reset on every refresh.
    pub created_at: DateTime<Utc>,
}

impl SpotifyTokenRow {
    /// Unix timestamp after which the access token is no longer valid.
    pub fn expires_at(&self) -> i64 {
        self.created_at.timestamp() + self.expires_in
    }
}

/// Field set persisted when a token is first obtained or re-obtained.
#[derive(Debug, Clone)]
pub struct NewSpotifyToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PlaylistRow {
    pub id: i64,
    pub spotify_playlist_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SongRow {
    pub id: i64,
    pub title: String,
    pub spotify_track_id: Option<String>,
    /// Media-relative path of the uploaded photo, if any.
    pub photo: Option<String>,
    pub playlist_id: i64,
    pub added_at: DateTime<Utc>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // An in-memory database exists per connection; a second pool
        // connection would see an empty schema.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- User Operations --

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    // -- Session Operations --

    pub async fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a session token hash to its user, ignoring expired sessions.
    pub async fn get_session_user(
        &self,
        token_hash: &str,
        now: i64,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            r#"SELECT u.id, u.username, u.email, u.password_hash, u.created_at
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2"#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired_sessions(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // -- Spotify Token Operations --

    pub async fn get_spotify_token(
        &self,
        user_id: i64,
    ) -> Result<Option<SpotifyTokenRow>, sqlx::Error> {
        sqlx::query_as::<_, SpotifyTokenRow>(
            r#"SELECT id, user_id, access_token, refresh_token, token_type, expires_in, scope, created_at
               FROM spotify_tokens WHERE user_id = ?1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// One token row per user: first authorization inserts, re-authorization
    /// overwrites every field including the refresh token.
    pub async fn upsert_spotify_token(
        &self,
        user_id: i64,
        token: &NewSpotifyToken,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO spotify_tokens (user_id, access_token, refresh_token, token_type, expires_in, scope, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(user_id) DO UPDATE SET
                   access_token = excluded.access_token,
                   refresh_token = excluded.refresh_token,
                   token_type = excluded.token_type,
                   expires_in = excluded.expires_in,
                   scope = excluded.scope,
                   created_at = excluded.created_at"#,
        )
        .bind(user_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(token.expires_in)
        .bind(&token.scope)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh path: overwrite the access token, expiry, type and scope and
    /// reset issued-at; the refresh token only changes when the service
    /// returned a replacement.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_spotify_token(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: Option<&str>,
        token_type: &str,
        expires_in: i64,
        scope: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE spotify_tokens
               SET access_token = ?2,
                   refresh_token = COALESCE(?3, refresh_token),
                   token_type = ?4,
                   expires_in = ?5,
                   scope = ?6,
                   created_at = ?7
               WHERE user_id = ?1"#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(token_type)
        .bind(expires_in)
        .bind(scope)
        .bind(issued_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- Playlist Operations --

    pub async fn list_playlists_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<PlaylistRow>, sqlx::Error> {
        sqlx::query_as::<_, PlaylistRow>(
            r#"SELECT id, spotify_playlist_id, title, description, user_id, created_at
               FROM playlists WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_playlist_for_user(
        &self,
        playlist_id: i64,
        user_id: i64,
    ) -> Result<Option<PlaylistRow>, sqlx::Error> {
        sqlx::query_as::<_, PlaylistRow>(
            r#"SELECT id, spotify_playlist_id, title, description, user_id, created_at
               FROM playlists WHERE id = ?1 AND user_id = ?2"#,
        )
        .bind(playlist_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Create-or-update keyed by the external playlist id. The external id is
    /// globally unique, so an import by a second user takes over ownership
    /// of the existing row rather than duplicating it.
    pub async fn upsert_playlist_by_spotify_id(
        &self,
        spotify_playlist_id: &str,
        title: &str,
        description: &str,
        user_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO playlists (spotify_playlist_id, title, description, user_id, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(spotify_playlist_id) DO UPDATE SET
                   title = excluded.title,
                   description = excluded.description,
                   user_id = excluded.user_id
               RETURNING id"#,
        )
        .bind(spotify_playlist_id)
        .bind(title)
        .bind(description)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    // -- Song Operations --

    /// Create-or-update keyed by the external track id. Photos are NULL on
    /// creation and left untouched on update.
    pub async fn upsert_song_by_spotify_id(
        &self,
        spotify_track_id: &str,
        title: &str,
        playlist_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO songs (title, spotify_track_id, photo, playlist_id, added_at)
               VALUES (?1, ?2, NULL, ?3, ?4)
               ON CONFLICT(spotify_track_id) DO UPDATE SET
                   title = excluded.title,
                   playlist_id = excluded.playlist_id"#,
        )
        .bind(title)
        .bind(spotify_track_id)
        .bind(playlist_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn songs_for_playlist(&self, playlist_id: i64) -> Result<Vec<SongRow>, sqlx::Error> {
        sqlx::query_as::<_, SongRow>(
            r#"SELECT id, title, spotify_track_id, photo, playlist_id, added_at
               FROM songs WHERE playlist_id = ?1 ORDER BY added_at DESC, id DESC"#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_songs(&self, playlist_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM songs WHERE playlist_id = ?1")
            .bind(playlist_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn get_song_in_playlist(
        &self,
        song_id: i64,
        playlist_id: i64,
    ) -> Result<Option<SongRow>, sqlx::Error> {
        sqlx::query_as::<_, SongRow>(
            r#"SELECT id, title, spotify_track_id, photo, playlist_id, added_at
               FROM songs WHERE id = ?1 AND playlist_id = ?2"#,
        )
        .bind(song_id)
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn set_song_photo(&self, song_id: i64, photo: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE songs SET photo = ?2 WHERE id = ?1")
            .bind(song_id)
            .bind(photo)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
