//! One-shot user messages carried across a redirect in a short-lived cookie.

use crate::api::cookies::{cookie_value, set_cookie};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub const FLASH_COOKIE: &str = "lens_flash";

/// Keeps the cookie well under the 4 KB browsers accept.
const MAX_MESSAGE_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        let mut message: String = message.into();
        if message.chars().count() > MAX_MESSAGE_CHARS {
            message = message.chars().take(MAX_MESSAGE_CHARS).collect::<String>() + "…";
        }
        Self { level, message }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Danger, message)
    }
}

fn encode(flashes: &[Flash]) -> String {
    let json = serde_json::to_string(flashes).unwrap_or_else(|_| "[]".to_string());
    utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string()
}

fn decode(raw: &str) -> Vec<Flash> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

/// Messages flashed by the previous response. Rendering a page with
/// [`Flashes::render`] consumes them.
#[derive(Debug, Clone, Default)]
pub struct Flashes {
    messages: Vec<Flash>,
    from_cookie: bool,
}

impl Flashes {
    pub fn iter(&self) -> impl Iterator<Item = &Flash> {
        self.messages.iter()
    }

    /// Adds a message shown on the page rendered by this request.
    pub fn push(&mut self, flash: Flash) {
        self.messages.push(flash);
    }

    /// Page response that also clears the flash cookie it displayed.
    pub fn render(&self, html: String) -> Response {
        let mut response = Html(html).into_response();
        if self.from_cookie {
            response.headers_mut().append(
                header::SET_COOKIE,
                set_cookie(FLASH_COOKIE, "", Some(0), false),
            );
        }
        response
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match cookie_value(&parts.headers, FLASH_COOKIE) {
            Some(raw) => Flashes {
                messages: decode(raw),
                from_cookie: true,
            },
            None => Flashes::default(),
        })
    }
}

/// `302 Found` to `location`, carrying messages for the next page.
#[derive(Debug)]
pub struct FlashRedirect {
    pub flashes: Vec<Flash>,
    pub location: String,
}

impl FlashRedirect {
    pub fn to(location: impl Into<String>, flash: Flash) -> Self {
        Self {
            flashes: vec![flash],
            location: location.into(),
        }
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::FOUND,
            [(header::LOCATION, self.location.as_str())],
        )
            .into_response();
        if !self.flashes.is_empty() {
            response.headers_mut().append(
                header::SET_COOKIE,
                set_cookie(FLASH_COOKIE, &encode(&self.flashes), None, false),
            );
        }
        response
    }
}
