//! HTTP surface: routing, the session gate, and response middleware.

pub mod flash;
pub mod pages;
pub mod playlists;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the application router: the logged-in surface behind
/// [`session::require_user`], the public account routes, and uploaded-media
/// serving under `/media`.
pub fn router(state: Arc<AppState>) -> Router {
    let authed = Router::new()
        .route("/", get(playlists::home))
        .route(
            "/playlists/:playlist_id",
            get(playlists::playlist_detail).post(playlists::upload_song_photo),
        )
        .route("/import_spotify", get(playlists::import_spotify))
        .route("/spotify_login", get(playlists::spotify_login))
        .route("/spotify_callback", get(playlists::spotify_callback))
        .route("/import_selected", post(playlists::import_selected))
        .route("/logout", post(users::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_user,
        ));

    Router::new()
        .merge(authed)
        .route("/register", get(users::register_page).post(users::register))
        .route("/login", get(users::login_page).post(users::login))
        .route("/healthz", get(|| async { "ok" }))
        .nest_service("/media", ServeDir::new(state.media.root()))
        .with_state(state)
        // Photo uploads are the only large bodies.
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

/// Middleware: injects a unique X-Request-Id into every response so users
/// can correlate a failure report with server logs.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: baseline security headers for an HTML app serving
/// user-uploaded files.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    // Uploaded photos must never be sniffed into something executable.
    headers.insert(
        "X-Content-Type-Options",
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "X-Frame-Options",
        axum::http::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        "Referrer-Policy",
        axum::http::HeaderValue::from_static("same-origin"),
    );
    resp
}
