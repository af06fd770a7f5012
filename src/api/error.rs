use crate::api::flash::{Flash, FlashRedirect};
use crate::services::intake::IntakeError;
use crate::services::metadata_tool::ToolError;
use crate::services::report::ReportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    UserInput(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("{context}: {source}")]
    Tool {
        context: &'static str,
        #[source]
        source: ToolError,
    },

    #[error("Missing session state: {0}")]
    MissingState(String),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<ToolError> for AppError {
    fn from(source: ToolError) -> Self {
        AppError::Tool {
            context: "Błąd narzędzia metadanych",
            source,
        }
    }
}

impl AppError {
    pub fn tool(context: &'static str, source: ToolError) -> Self {
        AppError::Tool { context, source }
    }

    /// The message shown to the user, with its severity.
    pub fn to_flash(&self) -> Flash {
        match self {
            AppError::UserInput(msg) => Flash::warning(msg.clone()),
            AppError::Intake(e) => match e {
                IntakeError::NoFile => Flash::danger("Nie wybrano pliku."),
                IntakeError::Disallowed(_) => Flash::danger("Niedozwolony typ pliku."),
                IntakeError::InvalidName(v) => {
                    Flash::danger(format!("Nieprawidłowa nazwa pliku: {}", v.message))
                }
                IntakeError::NotFound(path) => {
                    Flash::danger(format!("Plik {} nie istnieje.", path.display()))
                }
                IntakeError::Io(err) => {
                    tracing::error!("Upload I/O error: {:?}", err);
                    Flash::danger(format!("Błąd zapisu pliku: {}", err))
                }
            },
            AppError::Tool { context, source } => Flash::danger(format!("{}: {}", context, source)),
            AppError::MissingState(msg) => Flash::danger(msg.clone()),
            AppError::Report(ReportError::Empty) => Flash::danger("Brak metadanych w sesji"),
            AppError::Report(e) => {
                tracing::error!("Report error: {:?}", e);
                Flash::danger(format!("Błąd podczas generowania raportu: {}", e))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Flash::danger("Wystąpił błąd wewnętrzny.")
            }
        }
    }

    /// Flash this error and send the browser to `location`.
    pub fn redirect(self, location: impl Into<String>) -> FlashRedirect {
        FlashRedirect::to(location, self.to_flash())
    }
}

/// Turns any handler error into a flash + redirect.
pub trait OrRedirect<T> {
    fn or_redirect(self, location: &str) -> Result<T, FlashRedirect>;
}

impl<T, E: Into<AppError>> OrRedirect<T> for Result<T, E> {
    fn or_redirect(self, location: &str) -> Result<T, FlashRedirect> {
        self.map_err(|e| e.into().redirect(location))
    }
}
