use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{Flash, FlashRedirect};
use crate::api::handlers::FileQuery;
use crate::api::middleware::session::CurrentSession;
use crate::models::AnalyzedFile;
use crate::services::report::{self, ReportError};
use axum::{
    Extension,
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::Path;
use tokio_util::io::ReaderStream;

const FALLBACK: &str = "/report";

/// `attachment` disposition with an ASCII fallback name and the RFC 5987
/// UTF-8 form for clients that understand it.
pub fn content_disposition(download_name: &str) -> String {
    let ascii_filename: String = download_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let fallback_filename = if ascii_filename.is_empty() {
        "download"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(download_name, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

/// Streams a file from disk as a download.
pub async fn stream_attachment(path: &Path, download_name: &str, content_type: &str) -> std::io::Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(download_name)),
        ],
        body,
    )
        .into_response())
}

/// The session's analysis, provided it belongs to the requested file.
fn analysis_for(state: &AppState, session: CurrentSession, query: &FileQuery) -> Result<AnalyzedFile, FlashRedirect> {
    let filename = query
        .filename()
        .ok_or_else(|| FlashRedirect::to(FALLBACK, Flash::danger("Nie podano nazwy pliku")))?;

    let analyzed = state
        .sessions
        .load(session.0)
        .analyzed()
        .filter(|a| a.filename == filename)
        .cloned()
        .ok_or_else(|| AppError::MissingState("Brak metadanych w sesji".to_string()).redirect(FALLBACK))?;

    if analyzed.metadata.is_empty() {
        return Err(AppError::from(ReportError::Empty).redirect(FALLBACK));
    }
    Ok(analyzed)
}

pub async fn download_txt(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FlashRedirect> {
    let analyzed = analysis_for(&state, session, &query)?;

    let path = state.intake.text_report_path(&analyzed.filename).or_redirect(FALLBACK)?;
    report::write_text_report(&path, &analyzed.filename, &analyzed.metadata.lines)
        .await
        .or_redirect(FALLBACK)?;

    stream_attachment(
        &path,
        &format!("{}_report.txt", analyzed.filename),
        mime::TEXT_PLAIN_UTF_8.as_ref(),
    )
    .await
    .map_err(|e| AppError::from(ReportError::Io(e)).redirect(FALLBACK))
}

pub async fn download_pdf(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FlashRedirect> {
    let analyzed = analysis_for(&state, session, &query)?;

    let pdf = tokio::task::spawn_blocking(move || {
        report::export_pdf(&analyzed.filename, &analyzed.metadata.lines)
    })
    .await
    .map_err(|e| AppError::Internal(format!("PDF task failed: {}", e)).redirect(FALLBACK))?
    .or_redirect(FALLBACK)?;

    tracing::info!("PDF report {} ({} bytes)", pdf.download_name, pdf.bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&pdf.download_name)),
        ],
        pdf.bytes,
    )
        .into_response())
}
