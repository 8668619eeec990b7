//! Server-rendered HTML. Small enough here that hand-built markup beats a
//! template engine; everything user-sourced goes through [`escape_html`].

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::import::PlaylistChoice;
use crate::store::sqlite::{PlaylistRow, SongRow, UserRow};

use super::flash::{clear_flash_cookie_header, Flash};

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
    nav { display: flex; gap: 1rem; align-items: baseline; border-bottom: 1px solid #ddd; padding-bottom: .5rem; margin-bottom: 1.5rem; }
    nav .spacer { flex: 1; }
    .flash { padding: .5rem .75rem; border-radius: 4px; margin: .5rem 0; }
    .flash-success { background: #e6f4ea; color: #19562c; }
    .flash-info { background: #e8f0fe; color: #1a3f7a; }
    .flash-error { background: #fce8e6; color: #7a1c14; }
    .errorlist { color: #7a1c14; }
    ul.playlists, ul.songs { list-style: none; padding: 0; }
    ul.playlists li, ul.songs li { padding: .75rem 0; border-bottom: 1px solid #eee; }
    .muted { color: #777; font-size: .9rem; }
    .song-photo { display: block; max-width: 160px; margin: .5rem 0; border-radius: 4px; }
    form.inline { display: inline; }
    button.linklike { background: none; border: none; color: #1a5dd8; cursor: pointer; padding: 0; font: inherit; }
    label { display: block; margin-top: .75rem; }
    input[type=text], input[type=email], input[type=password], select { width: 100%; padding: .4rem; margin-top: .25rem; }
    button[type=submit] { margin-top: 1rem; padding: .4rem 1rem; }
"#;

/// Submit handler and on-demand refresh for the import picker. Talks to the
/// AJAX endpoints with the X-Requested-With marker they key on.
const IMPORT_PAGE_JS: &str = r#"
    const statusBox = document.getElementById('import-status');
    const select = document.getElementById('playlist-select');

    function showStatus(message, kind) {
      statusBox.textContent = message;
      statusBox.className = 'flash flash-' + kind;
    }

    document.getElementById('refresh-playlists').addEventListener('click', async () => {
      showStatus('Refreshing playlists…', 'info');
      const response = await fetch('/import_spotify', {
        headers: {'X-Requested-With': 'XMLHttpRequest'},
      });
      const data = await response.json();
      if (data.error) {
        showStatus(data.error, 'error');
        return;
      }
      select.innerHTML = '';
      for (const pl of data.spotify_playlists) {
        const option = document.createElement('option');
        option.value = pl.id;
        option.textContent = pl.name + ' (' + pl.tracks + ' tracks)';
        select.appendChild(option);
      }
      showStatus('Playlist list refreshed.', 'success');
    });

    document.getElementById('import-form').addEventListener('submit', async (event) => {
      event.preventDefault();
      showStatus('Importing…', 'info');
      const response = await fetch('/import_selected', {
        method: 'POST',
        headers: {'X-Requested-With': 'XMLHttpRequest'},
        body: new URLSearchParams(new FormData(event.target)),
      });
      const data = await response.json();
      if (data.success) {
        showStatus(data.message, 'success');
        window.location = data.redirect_url;
      } else {
        showStatus(data.error, 'error');
      }
    });
"#;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn flash_html(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                "<div class=\"flash {}\">{}</div>\n",
                f.level.css_class(),
                escape_html(&f.message)
            )
        })
        .collect()
}

fn shell(title: &str, flashes: &[Flash], nav: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Painted Playlists</title>
<style>{STYLE}</style>
</head>
<body>
{nav}
{flashes}
{body}
</body>
</html>
"#,
        title = escape_html(title),
        flashes = flash_html(flashes),
    )
}

fn nav_bar(username: &str) -> String {
    format!(
        r#"<nav>
<a href="/">Your Playlists</a>
<a href="/import_spotify">Import from Spotify</a>
<span class="spacer"></span>
<span class="muted">{}</span>
<form class="inline" method="post" action="/logout"><button class="linklike" type="submit">Log out</button></form>
</nav>"#,
        escape_html(username)
    )
}

/// Full page for a logged-in user, clearing any rendered flash messages.
fn page(title: &str, flashes: Vec<Flash>, username: &str, body: String) -> Response {
    let html = shell(title, &flashes, &nav_bar(username), &body);
    finish(flashes, Html(html).into_response())
}

/// Page outside the logged-in shell (login, register, 404).
fn bare_page(title: &str, flashes: Vec<Flash>, body: String) -> Response {
    let html = shell(title, &flashes, "", &body);
    finish(flashes, Html(html).into_response())
}

fn finish(flashes: Vec<Flash>, mut response: Response) -> Response {
    if !flashes.is_empty() {
        if let Ok(value) = clear_flash_cookie_header().parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

// ── Pages ───────────────────────────────────────────────────────

pub fn home_page(flashes: Vec<Flash>, user: &UserRow, playlists: &[PlaylistRow]) -> Response {
    let mut body = String::from("<h1>Your Playlists</h1>\n");
    if playlists.is_empty() {
        body.push_str(
            "<p>No playlists yet. <a href=\"/import_spotify\">Import one from Spotify</a> to get started.</p>\n",
        );
    } else {
        body.push_str("<ul class=\"playlists\">\n");
        for playlist in playlists {
            let description = playlist
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| format!("<br><span class=\"muted\">{}</span>", escape_html(d)))
                .unwrap_or_default();
            body.push_str(&format!(
                "<li><a href=\"/playlists/{}\">{}</a>{}<br><span class=\"muted\">added {}</span></li>\n",
                playlist.id,
                escape_html(&playlist.title),
                description,
                playlist.created_at.format("%b %-d, %Y"),
            ));
        }
        body.push_str("</ul>\n");
    }
    page("Your Playlists", flashes, &user.username, body)
}

pub fn playlist_detail_page(
    flashes: Vec<Flash>,
    username: &str,
    playlist: &PlaylistRow,
    songs: &[SongRow],
) -> Response {
    let mut body = format!("<h1>{}</h1>\n", escape_html(&playlist.title));
    if let Some(description) = playlist.description.as_deref().filter(|d| !d.is_empty()) {
        body.push_str(&format!("<p class=\"muted\">{}</p>\n", escape_html(description)));
    }
    if songs.is_empty() {
        body.push_str("<p>This playlist has no songs.</p>\n");
    } else {
        body.push_str(&format!("<p class=\"muted\">{} songs</p>\n<ul class=\"songs\">\n", songs.len()));
        for song in songs {
            let photo = song
                .photo
                .as_deref()
                .map(|p| {
                    format!(
                        "<img class=\"song-photo\" src=\"/media/{}\" alt=\"Photo for {}\">",
                        escape_html(p),
                        escape_html(&song.title)
                    )
                })
                .unwrap_or_default();
            body.push_str(&format!(
                r#"<li>{title}
{photo}
<form method="post" action="/playlists/{playlist_id}" enctype="multipart/form-data">
<input type="hidden" name="song_id" value="{song_id}">
<input type="file" name="photo" accept="image/*" required>
<button type="submit">Upload photo</button>
</form>
</li>
"#,
                title = escape_html(&song.title),
                photo = photo,
                playlist_id = playlist.id,
                song_id = song.id,
            ));
        }
        body.push_str("</ul>\n");
    }
    body.push_str("<p><a href=\"/\">Back to your playlists</a></p>\n");
    page(&playlist.title, flashes, username, body)
}

pub fn import_page(flashes: Vec<Flash>, username: &str, playlists: &[PlaylistChoice]) -> Response {
    let options: String = playlists
        .iter()
        .map(|pl| {
            format!(
                "<option value=\"{}\">{} ({} tracks)</option>\n",
                escape_html(&pl.id),
                escape_html(&pl.name),
                pl.tracks,
            )
        })
        .collect();

    let mut body = format!(
        r#"<h1>Import a Spotify Playlist</h1>
<div id="import-status"></div>
<form id="import-form" method="post" action="/import_selected">
<label for="playlist-select">Select a Spotify Playlist</label>
<select id="playlist-select" name="playlist_id">
{options}</select>
<button type="submit">Import</button>
<button type="button" id="refresh-playlists">Refresh list</button>
</form>
"#
    );
    body.push_str("<script>\n");
    body.push_str(IMPORT_PAGE_JS);
    body.push_str("</script>\n");
    page("Import from Spotify", flashes, username, body)
}

pub fn register_page(
    flashes: Vec<Flash>,
    errors: &[String],
    username: &str,
    email: &str,
) -> Response {
    let error_items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>\n", escape_html(e)))
        .collect();
    let error_list = if errors.is_empty() {
        String::new()
    } else {
        format!("<ul class=\"errorlist\">\n{error_items}</ul>\n")
    };
    let body = format!(
        r#"<h1>Register</h1>
{error_list}<form method="post" action="/register">
<label>Username<input type="text" name="username" value="{username}" required></label>
<label>Email Address<input type="email" name="email" value="{email}"></label>
<label>Password<input type="password" name="password1" required></label>
<label>Confirm Password<input type="password" name="password2" required></label>
<button type="submit">Register</button>
</form>
<p>Already have an account? <a href="/login">Log in</a></p>
"#,
        username = escape_html(username),
        email = escape_html(email),
    );
    bare_page("Register", flashes, body)
}

pub fn login_page(flashes: Vec<Flash>, error: Option<&str>, username: &str) -> Response {
    let error_html = error
        .map(|e| format!("<div class=\"flash flash-error\">{}</div>\n", escape_html(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Log In</h1>
{error_html}<form method="post" action="/login">
<label>Username<input type="text" name="username" value="{username}" required></label>
<label>Password<input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>
<p>New here? <a href="/register">Create an account</a></p>
"#,
        username = escape_html(username),
    );
    bare_page("Log In", flashes, body)
}

pub fn not_found_page(flashes: Vec<Flash>) -> Response {
    let body = String::from(
        "<h1>Not Found</h1>\n<p>That page does not exist. <a href=\"/\">Back to your playlists</a></p>\n",
    );
    let response = bare_page("Not Found", flashes, body);
    (StatusCode::NOT_FOUND, response).into_response()
}
