//! End-to-end tests for the web surface.
//!
//! Everything runs hermetically: SQLite in memory, the Spotify endpoints
//! served by wiremock, and uploads written to a temp directory. Requests
//! are driven straight through the router with `tower::ServiceExt`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tower::ServiceExt;

use painted_playlists::config::Config;
use painted_playlists::media::MediaStore;
use painted_playlists::spotify::SpotifyService;
use painted_playlists::store::sqlite::{NewSpotifyToken, SqliteStore};
use painted_playlists::{web, AppState};

const TEST_SESSION_KEY: &str = "integration-test-key";

struct TestApp {
    app: Router,
    db: SqliteStore,
    _media_dir: tempfile::TempDir,
}

async fn test_app(spotify_base: &str) -> TestApp {
    let db = SqliteStore::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let media_dir = tempfile::tempdir().unwrap();
    let config = Config {
        port: 0,
        database_url: "sqlite::memory:".into(),
        media_root: media_dir.path().display().to_string(),
        session_key: TEST_SESSION_KEY.into(),
        spotify_client_id: "client-id".into(),
        spotify_client_secret: "client-secret".into(),
        spotify_redirect_uri: "http://127.0.0.1:8080/spotify_callback".into(),
        spotify_accounts_url: spotify_base.into(),
        spotify_api_url: spotify_base.into(),
    };
    let spotify = SpotifyService::new(&config).unwrap();
    let state = Arc::new(AppState {
        db: db.clone(),
        spotify,
        media: MediaStore::new(media_dir.path()),
        config,
    });

    TestApp {
        app: web::router(state),
        db,
        _media_dir: media_dir,
    }
}

/// Create a user (password "test password") plus a live session cookie.
async fn login_session(db: &SqliteStore, username: &str) -> (i64, String) {
    let hash = web::session::hash_password("test password").unwrap();
    let user_id = db.create_user(username, "", &hash).await.unwrap();
    let token = web::session::create_session(db, TEST_SESSION_KEY, user_id)
        .await
        .unwrap();
    (user_id, format!("pp_session={token}"))
}

async fn connect_spotify(db: &SqliteStore, user_id: i64) {
    db.upsert_spotify_token(
        user_id,
        &NewSpotifyToken {
            access_token: "at-test".into(),
            refresh_token: "rt-test".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            scope: "playlist-read-private playlist-read-collaborative".into(),
            created_at: chrono::Utc::now(),
        },
    )
    .await
    .unwrap();
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// First Set-Cookie whose name matches, as "name=value".
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .find_map(|v| {
            let s = v.to_str().ok()?;
            s.starts_with(&format!("{name}="))
                .then(|| s.split(';').next().unwrap_or(s).to_string())
        })
}

/// Decoded flash messages queued on a redirect response.
fn flashed_messages(response: &Response<Body>) -> String {
    let cookie = set_cookie(response, "pp_flash").unwrap_or_default();
    let value = cookie.strip_prefix("pp_flash=").unwrap_or_default();
    urlencoding::decode(value).map(|s| s.into_owned()).unwrap_or_default()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_require_login() {
        let t = test_app("http://spotify.invalid").await;
        for uri in ["/", "/playlists/1", "/import_spotify", "/spotify_login"] {
            let response = t.app.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/login");
        }
    }

    #[tokio::test]
    async fn test_register_logs_straight_in() {
        let t = test_app("http://spotify.invalid").await;

        let response = t
            .app
            .clone()
            .oneshot(post_form(
                "/register",
                None,
                "username=alice&email=alice%40example.com&password1=sturdy+pass1&password2=sturdy+pass1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let session = set_cookie(&response, "pp_session").unwrap();
        let flash = set_cookie(&response, "pp_flash").unwrap();

        let cookies = format!("{session}; {flash}");
        let home = t.app.clone().oneshot(get("/", Some(&cookies))).await.unwrap();
        assert_eq!(home.status(), StatusCode::OK);
        // Rendering consumes the flash.
        assert_eq!(set_cookie(&home, "pp_flash").as_deref(), Some("pp_flash="));
        let html = body_string(home).await;
        assert!(html.contains("alice"));
        assert!(html.contains("Registration successful. You are now logged in."));

        let user = t.db.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_in_place() {
        let t = test_app("http://spotify.invalid").await;

        let response = t
            .app
            .clone()
            .oneshot(post_form(
                "/register",
                None,
                "username=alice&email=&password1=sturdy+pass1&password2=other+pass",
            ))
            .await
            .unwrap();
        // Re-rendered form, not a redirect.
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("didn&#39;t match"));
        assert!(html.contains("Please correct the errors below."));
        assert!(t.db.get_user_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_username() {
        let t = test_app("http://spotify.invalid").await;
        t.db.create_user("alice", "", "x").await.unwrap();

        let response = t
            .app
            .clone()
            .oneshot(post_form(
                "/register",
                None,
                "username=alice&email=&password1=sturdy+pass1&password2=sturdy+pass1",
            ))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("A user with that username already exists."));
    }

    #[tokio::test]
    async fn test_login_and_logout_round_trip() {
        let t = test_app("http://spotify.invalid").await;
        login_session(&t.db, "alice").await;

        let wrong = t
            .app
            .clone()
            .oneshot(post_form("/login", None, "username=alice&password=nope"))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::OK);
        assert!(body_string(wrong).await.contains("Invalid username or password."));

        let ok = t
            .app
            .clone()
            .oneshot(post_form(
                "/login",
                None,
                "username=alice&password=test+password",
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::SEE_OTHER);
        assert_eq!(ok.headers()[header::LOCATION], "/");
        let session = set_cookie(&ok, "pp_session").unwrap();

        let out = t
            .app
            .clone()
            .oneshot(post_form("/logout", Some(&session), ""))
            .await
            .unwrap();
        assert_eq!(out.status(), StatusCode::SEE_OTHER);
        assert_eq!(out.headers()[header::LOCATION], "/login");
        // The cleared cookie and the dropped server-side row both kill it.
        assert!(set_cookie(&out, "pp_session").unwrap().ends_with("="));
        let after = t.app.clone().oneshot(get("/", Some(&session))).await.unwrap();
        assert_eq!(after.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_healthz_is_public() {
        let t = test_app("http://spotify.invalid").await;
        let response = t.app.clone().oneshot(get("/healthz", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }
}

mod connect_tests {
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_spotify_login_redirects_to_consent() {
        let server = MockServer::start().await;
        let t = test_app(&server.uri()).await;
        let (_, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/spotify_login", Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{}/authorize?client_id=client-id", server.uri())));
        assert!(location.contains("response_type=code"));
        assert!(location.contains("scope=playlist-read-private%20playlist-read-collaborative"));
    }

    #[tokio::test]
    async fn test_callback_stores_token_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "playlist-read-private playlist-read-collaborative",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = test_app(&server.uri()).await;
        let (user_id, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/spotify_callback?code=abc123", Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/import_spotify");
        assert!(flashed_messages(&response).contains("New Spotify account connected successfully."));

        let token = t.db.get_spotify_token(user_id).await.unwrap().unwrap();
        assert_eq!(token.access_token, "at-1");
        assert_eq!(token.refresh_token, "rt-1");
    }

    #[tokio::test]
    async fn test_callback_reports_denied_consent() {
        let t = test_app("http://spotify.invalid").await;
        let (user_id, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/spotify_callback?error=access_denied", Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/import_spotify");
        assert!(flashed_messages(&response)
            .contains("Spotify authentication failed: access_denied"));
        assert!(t.db.get_spotify_token(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_callback_requires_a_code() {
        let t = test_app("http://spotify.invalid").await;
        let (_, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/spotify_callback", Some(&session)))
            .await
            .unwrap();
        assert!(flashed_messages(&response)
            .contains("No code provided for Spotify authentication."));
    }

    #[tokio::test]
    async fn test_failed_exchange_flashes_instead_of_erroring() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code",
            })))
            .mount(&server)
            .await;

        let t = test_app(&server.uri()).await;
        let (user_id, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/spotify_callback?code=expired", Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(flashed_messages(&response).contains("Failed to authenticate with Spotify."));
        assert!(t.db.get_spotify_token(user_id).await.unwrap().is_none());
    }
}

mod import_tests {
    use wiremock::matchers::{header as wm_header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_import_page_redirects_without_connection() {
        let t = test_app("http://spotify.invalid").await;
        let (_, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(get("/import_spotify", Some(&session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/spotify_login");
        assert!(flashed_messages(&response).contains("Connect Spotify to import playlists."));
    }

    #[tokio::test]
    async fn test_listing_endpoint_answers_ajax_with_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/playlists"))
            .and(wm_header("authorization", "Bearer at-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "p1", "name": "Road Trip", "tracks": {"total": 2}},
                ],
                "next": null,
            })))
            .mount(&server)
            .await;

        let t = test_app(&server.uri()).await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        connect_spotify(&t.db, user_id).await;

        let request = Request::builder()
            .uri("/import_spotify")
            .header(header::COOKIE, &session)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let response = t.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["spotify_playlists"][0]["id"], "p1");
        assert_eq!(json["spotify_playlists"][0]["name"], "Road Trip");
        assert_eq!(json["spotify_playlists"][0]["tracks"], 2);
    }

    #[tokio::test]
    async fn test_import_selected_imports_and_links_to_the_playlist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Road Trip",
                "description": "",
                "tracks": {
                    "items": [
                        {"track": {"id": "t1", "name": "Song A"}},
                        {"track": {"id": "t2", "name": "Song B"}},
                        {"track": null},
                    ],
                    "next": null,
                },
            })))
            .mount(&server)
            .await;

        let t = test_app(&server.uri()).await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        connect_spotify(&t.db, user_id).await;

        let response = t
            .app
            .clone()
            .oneshot(post_form("/import_selected", Some(&session), "playlist_id=p1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(
            json["message"],
            "Playlist \"Road Trip\" imported successfully with 2 songs."
        );

        let redirect_url = json["redirect_url"].as_str().unwrap();
        let detail = t
            .app
            .clone()
            .oneshot(get(redirect_url, Some(&session)))
            .await
            .unwrap();
        assert_eq!(detail.status(), StatusCode::OK);
        let html = body_string(detail).await;
        assert!(html.contains("Road Trip"));
        assert!(html.contains("Song A"));
        assert!(html.contains("Song B"));
    }

    #[tokio::test]
    async fn test_import_selected_requires_a_selection() {
        let t = test_app("http://spotify.invalid").await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        connect_spotify(&t.db, user_id).await;

        let response = t
            .app
            .clone()
            .oneshot(post_form("/import_selected", Some(&session), "playlist_id="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No playlist selected.");
    }

    #[tokio::test]
    async fn test_import_selected_requires_a_connection() {
        let t = test_app("http://spotify.invalid").await;
        let (_, session) = login_session(&t.db, "alice").await;

        let response = t
            .app
            .clone()
            .oneshot(post_form("/import_selected", Some(&session), "playlist_id=p1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Spotify client not available. Please connect your Spotify account."
        );
    }

    #[tokio::test]
    async fn test_import_failure_surfaces_the_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/playlists/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"status": 404, "message": "Invalid playlist Id"},
            })))
            .mount(&server)
            .await;

        let t = test_app(&server.uri()).await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        connect_spotify(&t.db, user_id).await;

        let response = t
            .app
            .clone()
            .oneshot(post_form("/import_selected", Some(&session), "playlist_id=gone"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], false);
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("Spotify API error:"), "{error}");
        assert!(t.db.list_playlists_for_user(user_id).await.unwrap().is_empty());
    }
}

mod media_tests {
    use super::*;

    fn multipart_upload(uri: &str, cookie: &str, song_id: &str) -> Request<Body> {
        let boundary = "test-boundary-7e58";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"song_id\"\r\n\r\n\
             {song_id}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"cover.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             fake jpeg bytes\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_photo_upload_and_serving() {
        let t = test_app("http://spotify.invalid").await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        let playlist_id = t
            .db
            .upsert_playlist_by_spotify_id("p1", "Road Trip", "", user_id)
            .await
            .unwrap();
        t.db.upsert_song_by_spotify_id("t1", "Song A", playlist_id)
            .await
            .unwrap();
        let song = t.db.songs_for_playlist(playlist_id).await.unwrap().remove(0);

        let uri = format!("/playlists/{playlist_id}");
        let response = t
            .app
            .clone()
            .oneshot(multipart_upload(&uri, &session, &song.id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION].to_str().unwrap(), uri);
        assert!(flashed_messages(&response).contains("Photo uploaded successfully."));

        let song = t
            .db
            .get_song_in_playlist(song.id, playlist_id)
            .await
            .unwrap()
            .unwrap();
        let photo = song.photo.unwrap();
        assert!(photo.starts_with("song_photos/"));

        let served = t
            .app
            .clone()
            .oneshot(get(&format!("/media/{photo}"), None))
            .await
            .unwrap();
        assert_eq!(served.status(), StatusCode::OK);
        assert_eq!(
            served.headers()["x-content-type-options"].to_str().unwrap(),
            "nosniff"
        );
        assert_eq!(body_string(served).await, "fake jpeg bytes");
    }

    #[tokio::test]
    async fn test_upload_to_unknown_song_flashes_an_error() {
        let t = test_app("http://spotify.invalid").await;
        let (user_id, session) = login_session(&t.db, "alice").await;
        let playlist_id = t
            .db
            .upsert_playlist_by_spotify_id("p1", "Road Trip", "", user_id)
            .await
            .unwrap();

        let uri = format!("/playlists/{playlist_id}");
        let response = t
            .app
            .clone()
            .oneshot(multipart_upload(&uri, &session, "9999"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(flashed_messages(&response).contains("Song not found."));
    }

    #[tokio::test]
    async fn test_other_users_playlists_are_not_found() {
        let t = test_app("http://spotify.invalid").await;
        let (alice, _) = login_session(&t.db, "alice").await;
        let (_, bob_session) = login_session(&t.db, "bob").await;
        let playlist_id = t
            .db
            .upsert_playlist_by_spotify_id("p1", "Private", "", alice)
            .await
            .unwrap();

        let response = t
            .app
            .clone()
            .oneshot(get(&format!("/playlists/{playlist_id}"), Some(&bob_session)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
