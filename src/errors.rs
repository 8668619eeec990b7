use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// No Spotify token on file for the user.
    #[error("spotify account not connected")]
    NotConnected,

    /// Authorization-code exchange or token refresh failed.
    #[error("spotify authentication failed: {0}")]
    Auth(String),

    /// Playlist listing/import failed against the Spotify API.
    #[error("import failed: {0}")]
    Import(String),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Fallback mapping for errors no handler intercepted. Handlers that speak
/// the import JSON contract build their own `{success, error}` bodies with
/// the exact statuses the frontend expects; anything escaping past them
/// still becomes a well-formed JSON error here.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::NotConnected => (
                StatusCode::BAD_REQUEST,
                "Spotify client not available. Please connect your Spotify account.".to_string(),
            ),
            AppError::Auth(e) => (
                StatusCode::BAD_GATEWAY,
                format!("Spotify authentication failed: {}", e),
            ),
            AppError::Import(e) => (StatusCode::BAD_GATEWAY, e.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found.".to_string()),
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": msg,
        }));

        (status, body).into_response()
    }
}
