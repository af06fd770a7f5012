use crate::AppState;
use crate::api::cookies::{cookie_value, set_cookie};
use crate::services::session_store::SessionId;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

pub const SESSION_COOKIE: &str = "lens_session";

/// Session of the current request, inserted into request extensions by
/// [`session_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentSession(pub SessionId);

/// Resolves the session cookie. A cookie that doesn't name a live session
/// minted by this server (missing, malformed, expired, or made up by the
/// client) gets a fresh server-side id.
pub async fn session_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), SESSION_COOKIE)
        .and_then(SessionId::parse)
        .filter(|id| state.sessions.contains(*id));
    let id = existing.unwrap_or_else(|| state.sessions.open());

    req.extensions_mut().insert(CurrentSession(id));

    let mut response = next.run(req).await;

    if existing.is_none() {
        tracing::debug!("Started session {}", id);
        response.headers_mut().append(
            header::SET_COOKIE,
            set_cookie(
                SESSION_COOKIE,
                &id.to_string(),
                None,
                state.config.session_cookie_secure,
            ),
        );
    }

    response
}
