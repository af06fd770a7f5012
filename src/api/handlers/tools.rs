use crate::AppState;
use crate::api::error::{AppError, OrRedirect};
use crate::api::flash::{Flash, FlashRedirect, Flashes};
use crate::api::handlers::FileQuery;
use crate::api::handlers::export::stream_attachment;
use crate::api::middleware::session::CurrentSession;
use crate::api::views::{self, file_url};
use crate::models::{AnalyzedFile, SessionState, UploadedFile};
use crate::services::intake::IntakeError;
use crate::services::metadata_tool::{Category, MutationAction, create_clean_copy};
use crate::services::session_store::SessionId;
use axum::{
    Extension,
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ToolsForm {
    action: Option<String>,
    category: Option<String>,
}

/// What a POST to the tools page asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    Strip(MutationAction),
    CleanCopy,
}

/// One request to the tools page, dispatched exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolsRequest {
    View,
    Mutate(ToolAction),
}

impl ToolsRequest {
    /// GET is always a view; a POST body must name a known action.
    pub fn from_parts(method: &Method, body: &[u8]) -> Result<Self, AppError> {
        if method != Method::POST {
            return Ok(ToolsRequest::View);
        }

        let form: ToolsForm = serde_urlencoded::from_bytes(body)
            .map_err(|e| AppError::UserInput(format!("Nieprawidłowy formularz: {}", e)))?;

        let action = match form.action.as_deref().map(str::trim) {
            Some("remove_all") => ToolAction::Strip(MutationAction::RemoveAll),
            Some("remove_category") => {
                let raw = form.category.as_deref().unwrap_or_default();
                if raw.trim().is_empty() {
                    return Err(AppError::UserInput("Nie wybrano kategorii do usunięcia.".to_string()));
                }
                let category = Category::parse(raw).map_err(|e| AppError::UserInput(e.message))?;
                ToolAction::Strip(MutationAction::RemoveCategory(category))
            }
            Some("clean_copy") => ToolAction::CleanCopy,
            Some(other) if !other.is_empty() => {
                return Err(AppError::UserInput(format!("Nieznana akcja: {}", other)));
            }
            _ => return Err(AppError::UserInput("Nie wybrano akcji.".to_string())),
        };

        Ok(ToolsRequest::Mutate(action))
    }
}

fn required_filename(query: &FileQuery) -> Result<&str, FlashRedirect> {
    query
        .filename()
        .ok_or_else(|| FlashRedirect::to("/report", Flash::danger("Nie podano nazwy pliku")))
}

async fn resolve_upload(state: &AppState, filename: &str) -> Result<UploadedFile, FlashRedirect> {
    state.intake.resolve(filename).await.or_redirect("/analyze")
}

/// Re-reads `file` into the session's analysis after a strip, when that
/// analysis is of the same file.
async fn refresh_analysis(state: &AppState, session: SessionId, file: &UploadedFile) {
    let current = state.sessions.load(session);
    let Some(analyzed) = current.analyzed().filter(|a| a.filename == file.original_name) else {
        return;
    };

    let refreshed = match state.tool.read(&file.stored_path).await {
        Ok(metadata) => SessionState::Analyzed(AnalyzedFile {
            filename: analyzed.filename.clone(),
            filepath: analyzed.filepath.clone(),
            metadata,
        }),
        Err(e) => {
            tracing::warn!("Dropping stale analysis of {}: re-read failed: {}", file.original_name, e);
            SessionState::Empty
        }
    };
    state.sessions.store(session, refreshed);
}

/// Strips every tag from the upload in place, then returns to the report.
pub async fn remove_metadata(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Query(query): Query<FileQuery>,
) -> Result<FlashRedirect, FlashRedirect> {
    let filename = required_filename(&query)?;
    let file = resolve_upload(&state, filename).await?;

    let flash = match state.tool.mutate(&file.stored_path, MutationAction::RemoveAll).await {
        Ok(()) => {
            refresh_analysis(&state, session, &file).await;
            Flash::success("Metadane zostały pomyślnie usunięte.")
        }
        Err(e) => AppError::tool("Błąd podczas usuwania metadanych", e).to_flash(),
    };

    Ok(FlashRedirect::to("/report", flash))
}

pub async fn metadata_tools(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Query(query): Query<FileQuery>,
    method: Method,
    mut flashes: Flashes,
    body: Bytes,
) -> Result<Response, FlashRedirect> {
    let filename = required_filename(&query)?;
    let file = resolve_upload(&state, filename).await?;
    let self_url = file_url("/metadata-tools/", &file.original_name);

    match ToolsRequest::from_parts(&method, &body).or_redirect(&self_url)? {
        ToolsRequest::Mutate(action) => Ok(apply(&state, session, &file, action, self_url).await.into_response()),
        ToolsRequest::View => {
            let metadata = match state.tool.read(&file.stored_path).await {
                Ok(report) => report.lines,
                Err(e) => {
                    flashes.push(AppError::tool("Błąd odczytu metadanych", e).to_flash());
                    Vec::new()
                }
            };

            let clean = file.clean_copy();
            let clean_metadata = if tokio::fs::try_exists(clean.path()).await.unwrap_or(false) {
                match state.tool.read(clean.path()).await {
                    Ok(report) => Some(report.lines),
                    Err(e) => {
                        flashes.push(AppError::tool("Błąd odczytu czystej kopii", e).to_flash());
                        Some(Vec::new())
                    }
                }
            } else {
                None
            };

            let html = views::metadata_tools_page(
                &flashes,
                &file.original_name,
                &metadata,
                clean_metadata.as_deref(),
            );
            Ok(flashes.render(html))
        }
    }
}

async fn apply(
    state: &AppState,
    session: SessionId,
    file: &UploadedFile,
    action: ToolAction,
    self_url: String,
) -> FlashRedirect {
    let flash = match action {
        ToolAction::Strip(strip) => match state.tool.mutate(&file.stored_path, strip).await {
            Ok(()) => {
                refresh_analysis(state, session, file).await;
                match strip {
                    MutationAction::RemoveAll => Flash::success("Wszystkie metadane zostały usunięte."),
                    MutationAction::RemoveCategory(c) => {
                        Flash::success(format!("Kategoria {} została usunięta.", c.as_str()))
                    }
                }
            }
            Err(e) => AppError::tool("Błąd podczas usuwania metadanych", e).to_flash(),
        },
        ToolAction::CleanCopy => match create_clean_copy(state.tool.as_ref(), file).await {
            Ok(clean) => Flash::success(format!(
                "Utworzono czystą kopię pliku: {}",
                clean.file().original_name
            )),
            Err(e) => AppError::tool("Błąd podczas tworzenia czystej kopii", e).to_flash(),
        },
    };
    FlashRedirect::to(self_url, flash)
}

/// Streams the `clean_` sibling of an upload.
pub async fn download_clean(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FlashRedirect> {
    let filename = required_filename(&query)?;
    let file = resolve_upload(&state, filename).await?;
    let clean = file.clean_copy();

    if !tokio::fs::try_exists(clean.path()).await.unwrap_or(false) {
        return Err(FlashRedirect::to(
            file_url("/metadata-tools/", &file.original_name),
            Flash::warning("Czysta kopia nie istnieje."),
        ));
    }

    stream_attachment(
        clean.path(),
        &clean.file().original_name,
        mime::APPLICATION_OCTET_STREAM.as_ref(),
    )
    .await
    .map_err(|e| AppError::from(IntakeError::Io(e)).redirect("/analyze"))
}
