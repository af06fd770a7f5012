use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{Flash, FlashRedirect, Flashes};
use crate::api::middleware::session::CurrentSession;
use crate::api::views;
use crate::models::{AnalyzedFile, SessionState};
use crate::services::intake::IntakeError;
use crate::services::origin::analyze_image_origin_blocking;
use axum::{
    Extension,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::Response,
};
use bytes::Bytes;

const FORM: &str = "/analyze";

pub async fn analyze_form(flashes: Flashes) -> Response {
    flashes.render(views::analyze_page(&flashes))
}

fn multipart_error(e: MultipartError) -> FlashRedirect {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload rejected: {}", e.body_text());
        return FlashRedirect::to(FORM, Flash::danger("Plik jest zbyt duży."));
    }
    tracing::warn!("Malformed multipart upload: {}", e.body_text());
    AppError::UserInput("Nieprawidłowe żądanie przesłania pliku.".to_string()).redirect(FORM)
}

/// Takes the `file` field, stores it, reads its metadata, runs the origin
/// heuristic and replaces this session's analysis with the result.
pub async fn analyze_upload(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    flashes: Flashes,
    mut multipart: Multipart,
) -> Result<Response, FlashRedirect> {
    let mut upload: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let claimed_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((claimed_name, data));
        break;
    }

    let (claimed_name, data) = upload.ok_or(IntakeError::NoFile).or_redirect(FORM)?;
    let file = state
        .intake
        .accept(claimed_name.as_deref(), &data)
        .await
        .or_redirect(FORM)?;

    let metadata = state
        .tool
        .read(&file.stored_path)
        .await
        .map_err(|e| AppError::tool("Błąd odczytu metadanych", e).redirect(FORM))?;

    let verdict = analyze_image_origin_blocking(file.stored_path.clone()).await;

    let html = views::report_page(&flashes, &file.original_name, &metadata.lines, Some(verdict));

    state.sessions.store(
        session,
        SessionState::Analyzed(AnalyzedFile {
            filename: file.original_name,
            filepath: file.stored_path,
            metadata,
        }),
    );

    Ok(flashes.render(html))
}
