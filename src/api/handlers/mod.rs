pub mod analyze;
pub mod export;
pub mod health;
pub mod pages;
pub mod tools;

use serde::Deserialize;

/// `?filename=` query shared by every per-file route.
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub filename: Option<String>,
}

impl FileQuery {
    /// The filename, if present and not blank.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }
}
