use crate::models::UploadedFile;
use crate::utils::validation::{ValidationError, sanitize_filename, validate_extension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No file selected")]
    NoFile,

    #[error("Disallowed file type: {0}")]
    Disallowed(ValidationError),

    #[error("Invalid filename: {0}")]
    InvalidName(ValidationError),

    #[error("File {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepts uploads into a flat directory keyed by sanitized filename.
#[derive(Debug, Clone)]
pub struct FileIntake {
    upload_dir: PathBuf,
}

impl FileIntake {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Validates the claimed name and writes `data` verbatim, replacing any
    /// file of the same sanitized name. Rejections write nothing.
    pub async fn accept(&self, claimed_name: Option<&str>, data: &[u8]) -> Result<UploadedFile, IntakeError> {
        let claimed_name = claimed_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(IntakeError::NoFile)?;

        validate_extension(claimed_name).map_err(IntakeError::Disallowed)?;
        let filename = sanitize_filename(claimed_name).map_err(IntakeError::InvalidName)?;
        // Sanitizing must not have changed what the extension check saw
        let extension = validate_extension(&filename).map_err(IntakeError::Disallowed)?;

        let stored_path = self.upload_dir.join(&filename);
        let mut file = tokio::fs::File::create(&stored_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::info!("Stored upload {} ({} bytes)", stored_path.display(), data.len());

        Ok(UploadedFile {
            original_name: filename,
            stored_path,
            extension,
        })
    }

    /// Maps a client-supplied filename to an existing upload. The name is
    /// sanitized first, so it can never address anything outside the directory.
    pub async fn resolve(&self, filename: &str) -> Result<UploadedFile, IntakeError> {
        let filename = sanitize_filename(filename).map_err(IntakeError::InvalidName)?;
        let stored_path = self.upload_dir.join(&filename);

        if !tokio::fs::try_exists(&stored_path).await.unwrap_or(false) {
            return Err(IntakeError::NotFound(stored_path));
        }

        let extension = crate::utils::validation::extension_of(&filename).unwrap_or_default();
        Ok(UploadedFile {
            original_name: filename,
            stored_path,
            extension,
        })
    }

    /// Path a text report for `filename` is written to.
    pub fn text_report_path(&self, filename: &str) -> Result<PathBuf, IntakeError> {
        let filename = sanitize_filename(filename).map_err(IntakeError::InvalidName)?;
        Ok(self.upload_dir.join(format!("{}_report.txt", filename)))
    }
}
