use serde::Deserialize;

pub const SESSION_KEY_PLACEHOLDER: &str = "CHANGE_ME_SESSION_SIGNING_KEY";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Directory uploaded song photos are written to and served from.
    pub media_root: String,
    /// Key used to HMAC session tokens before they are stored.
    pub session_key: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    /// Base URL of the Spotify accounts service (authorize + token endpoints).
    pub spotify_accounts_url: String,
    /// Base URL of the Spotify Web API.
    pub spotify_api_url: String,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let session_key =
        std::env::var("PP_SESSION_KEY").unwrap_or_else(|_| SESSION_KEY_PLACEHOLDER.into());

    if session_key == SESSION_KEY_PLACEHOLDER {
        let env_mode = std::env::var("PP_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "PP_SESSION_KEY is still the insecure placeholder. \
                 Set a long random value before running in production."
            );
        }
        eprintln!("⚠️  PP_SESSION_KEY is not set — using insecure placeholder. Existing sessions break when it changes.");
    }

    let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID").unwrap_or_default();
    let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default();
    if spotify_client_id.is_empty() || spotify_client_secret.is_empty() {
        eprintln!(
            "⚠️  SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET are not set — connecting Spotify accounts will fail."
        );
    }

    Ok(Config {
        port: std::env::var("PP_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://painted_playlists.db".into()),
        media_root: std::env::var("PP_MEDIA_ROOT").unwrap_or_else(|_| "media".into()),
        session_key,
        spotify_client_id,
        spotify_client_secret,
        spotify_redirect_uri: std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| "http://127.0.0.1:8080/spotify_callback".into()),
        spotify_accounts_url: std::env::var("SPOTIFY_ACCOUNTS_URL")
            .unwrap_or_else(|_| "https://accounts.spotify.com".into()),
        spotify_api_url: std::env::var("SPOTIFY_API_URL")
            .unwrap_or_else(|_| "https://api.spotify.com".into()),
    })
}
