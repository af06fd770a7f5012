use crate::AppState;
use crate::api::flash::Flashes;
use crate::api::middleware::session::CurrentSession;
use crate::api::views;
use axum::{Extension, extract::State, response::Response};

pub async fn home(flashes: Flashes) -> Response {
    flashes.render(views::index_page(&flashes))
}

/// Last analysis of this session, or a placeholder when there is none.
pub async fn report(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    flashes: Flashes,
) -> Response {
    let html = match state.sessions.load(session).analyzed() {
        Some(analyzed) => views::report_page(&flashes, &analyzed.filename, &analyzed.metadata.lines, None),
        None => views::empty_report_page(&flashes),
    };
    flashes.render(html)
}
