//! One-shot notifications carried across a redirect in a cookie.
//!
//! Messages are queued as URL-encoded JSON in `pp_flash`, rendered into
//! the next full page, and cleared there.

use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use super::session::cookie_value;

pub const FLASH_COOKIE: &str = "pp_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS class hook used by the page layout.
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "flash-success",
            FlashLevel::Info => "flash-info",
            FlashLevel::Error => "flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Error, message: message.into() }
    }
}

pub fn flash_cookie_header(flashes: &[Flash]) -> String {
    let json = serde_json::to_string(flashes).unwrap_or_default();
    format!(
        "{FLASH_COOKIE}={}; Path=/; SameSite=Lax",
        urlencoding::encode(&json)
    )
}

pub fn clear_flash_cookie_header() -> String {
    format!("{FLASH_COOKIE}=; Path=/; SameSite=Lax; Max-Age=0")
}

/// Pending messages from the request cookies. Garbage decodes as nothing.
pub fn take_flashes(headers: &HeaderMap) -> Vec<Flash> {
    let Some(raw) = cookie_value(headers, FLASH_COOKIE) else {
        return Vec::new();
    };
    let decoded = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded,
        Err(_) => return Vec::new(),
    };
    serde_json::from_str(&decoded).unwrap_or_default()
}

/// Redirect to `to` with `flashes` queued for the destination page.
pub fn redirect_with_flash(to: &str, flashes: &[Flash]) -> Response {
    (
        [(header::SET_COOKIE, flash_cookie_header(flashes))],
        Redirect::to(to),
    )
        .into_response()
}
