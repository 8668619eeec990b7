//! Account registration, login and logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::AppState;

use super::flash::{flash_cookie_header, take_flashes, Flash};
use super::pages;
use super::session;

// ── Request DTOs ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ── Handlers ────────────────────────────────────────────────────

/// GET /register — blank registration form
pub async fn register_page(headers: HeaderMap) -> Response {
    pages::register_page(take_flashes(&headers), &[], "", "")
}

/// POST /register — create the account and log straight in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    let mut errors = validate_registration(&username, &email, &form.password1, &form.password2);
    if errors.is_empty() && state.db.get_user_by_username(&username).await?.is_some() {
        errors.push("A user with that username already exists.".to_string());
    }
    if !errors.is_empty() {
        return Ok(pages::register_page(
            vec![Flash::error("Please correct the errors below.")],
            &errors,
            &username,
            &email,
        ));
    }

    let password_hash = session::hash_password(&form.password1)?;
    let user_id = state.db.create_user(&username, &email, &password_hash).await?;
    info!(user_id, username = %username, "account registered");

    let token = session::create_session(&state.db, &state.config.session_key, user_id).await?;
    Ok(signed_in_redirect(
        &token,
        Flash::success("Registration successful. You are now logged in."),
    ))
}

/// GET /login — blank login form
pub async fn login_page(headers: HeaderMap) -> Response {
    pages::login_page(take_flashes(&headers), None, "")
}

/// POST /login — authenticate and open a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    let user = state.db.get_user_by_username(username).await?;
    let valid = user
        .as_ref()
        .map(|u| session::verify_password(&form.password, &u.password_hash))
        .unwrap_or(false);

    let Some(user) = user.filter(|_| valid) else {
        return Ok(pages::login_page(
            Vec::new(),
            Some("Invalid username or password."),
            username,
        ));
    };

    let token = session::create_session(&state.db, &state.config.session_key, user.id).await?;
    info!(user_id = user.id, "user logged in");
    Ok(signed_in_redirect(&token, Flash::success("You are now logged in.")))
}

/// POST /logout — drop the session and bounce to the login page
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session::cookie_value(&headers, session::SESSION_COOKIE) {
        session::destroy_session(&state.db, &state.config.session_key, &token).await?;
    }
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session::clear_session_cookie_header()),
            (
                header::SET_COOKIE,
                flash_cookie_header(&[Flash::success("You have been logged out.")]),
            ),
        ]),
        Redirect::to("/login"),
    )
        .into_response())
}

// ── Validation ──────────────────────────────────────────────────

fn validate_registration(
    username: &str,
    email: &str,
    password1: &str,
    password2: &str,
) -> Vec<String> {
    let mut errors = Vec::new();

    if username.is_empty() || username.len() > 150 {
        errors.push("Enter a username of 1 to 150 characters.".to_string());
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }

    // Light check only; the address is never used to send mail.
    if !email.is_empty() && !email.contains('@') {
        errors.push("Enter a valid email address.".to_string());
    }

    if password1.len() < 8 {
        errors.push("This password is too short. It must contain at least 8 characters.".to_string());
    } else if password1.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }
    if password1 != password2 {
        errors.push("The two password fields didn't match.".to_string());
    }

    errors
}

fn signed_in_redirect(token: &str, flash: Flash) -> Response {
    (
        AppendHeaders([
            (header::SET_COOKIE, session::session_cookie_header(token)),
            (header::SET_COOKIE, flash_cookie_header(&[flash])),
        ]),
        Redirect::to("/"),
    )
        .into_response()
}
