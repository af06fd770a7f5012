/// File extensions accepted for upload: images, office documents, audio, video.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "png", "tiff", "bmp", "gif",
    // Documents
    "pdf", "docx", "odt", "epub", "xlsx", "pptx",
    // Audio
    "mp3", "wav", "flac",
    // Video
    "mp4", "avi", "mov", "mkv",
];

/// Metadata groups ExifTool can delete with `-<GROUP>=`.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "EXIF",
    "IPTC",
    "XMP",
    "GPS",
    "ICC_Profile",
    "MakerNotes",
    "Photoshop",
    "JFIF",
    "Comment",
    "PDF",
    "ID3",
    "QuickTime",
    "RIFF",
    "Matroska",
    "Vorbis",
    "PNG",
    "FlashPix",
];

/// Longest suffix appended to a stored name (`<name>_report.txt`).
const LONGEST_DERIVED_SUFFIX: usize = "_report.txt".len();

/// Leaves room for derived names inside the usual 255-byte filesystem limit.
pub const MAX_FILENAME_LEN: usize = 255 - LONGEST_DERIVED_SUFFIX;

/// Extensions longer than this are truncated along with the stem.
const MAX_KEPT_EXTENSION: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Lower-cased substring after the final `.`, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Checks the claimed filename's extension against [`ALLOWED_EXTENSIONS`].
pub fn validate_extension(filename: &str) -> Result<String, ValidationError> {
    match extension_of(filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        Some(ext) => Err(ValidationError {
            code: "DISALLOWED_EXTENSION",
            message: format!("File extension '.{}' is not allowed", ext),
        }),
        None => Err(ValidationError {
            code: "MISSING_EXTENSION",
            message: format!("File '{}' has no extension", filename),
        }),
    }
}

/// Sanitizes a filename so it can only name an entry directly inside the
/// upload directory.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    // Keep only the last path component, whichever separator the client used
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("").trim();

    if name != filename.trim() {
        tracing::warn!("Path components stripped from filename: {}", filename);
    }

    if name.is_empty() || name == "." || name == ".." {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c.is_whitespace()
                || matches!(
                    c,
                    ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' | '%' | '#' | '&' | '\''
                )
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = truncate_keeping_extension(sanitized, MAX_FILENAME_LEN);

    if sanitized.starts_with('.') {
        return Err(ValidationError {
            code: "HIDDEN_FILE",
            message: "Hidden files (starting with '.') are not allowed".to_string(),
        });
    }

    Ok(sanitized)
}

/// Cuts `name` to at most `max` bytes on a char boundary, shortening the stem
/// so a short extension survives.
fn truncate_keeping_extension(name: String, max: usize) -> String {
    if name.len() <= max {
        return name;
    }

    let ext = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION => &name[dot..],
        _ => "",
    };

    let mut end = max - ext.len();
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &name[..end], ext)
}

/// Resolves a user-supplied metadata group to its canonical spelling.
pub fn validate_category(category: &str) -> Result<&'static str, ValidationError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(ValidationError {
            code: "MISSING_CATEGORY",
            message: "No category selected".to_string(),
        });
    }

    KNOWN_CATEGORIES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(category))
        .copied()
        .ok_or_else(|| ValidationError {
            code: "UNKNOWN_CATEGORY",
            message: format!("Unknown metadata category '{}'", category),
        })
}
