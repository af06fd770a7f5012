//! Export of the session's metadata lines as a `.txt` or `.pdf` document.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORT_TITLE: &str = "Raport Metadanych";
pub const TEXT_SECTION_HEADER: &str = "=== Metadane ===";
pub const PDF_SECTION_HEADER: &str = "Metadane:";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No metadata to export")]
    Empty,

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders the plain-text report.
pub fn render_text(filename: &str, lines: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", REPORT_TITLE));
    out.push_str(&format!("Plik: {}\n\n", filename));
    out.push_str(&format!("{}\n\n", TEXT_SECTION_HEADER));
    for line in lines {
        out.push_str(&format!("- {}\n", line));
    }
    out
}

/// Writes the plain-text report to `path`. Refuses an empty line list.
pub async fn write_text_report(path: &Path, filename: &str, lines: &[String]) -> Result<(), ReportError> {
    if lines.is_empty() {
        return Err(ReportError::Empty);
    }
    tokio::fs::write(path, render_text(filename, lines)).await?;
    tracing::info!("Wrote text report {}", path.display());
    Ok(())
}

/// A rendered PDF held in memory. The scratch directory it was written to is
/// already gone by the time this value exists.
#[derive(Debug)]
pub struct PdfReport {
    pub download_name: String,
    pub bytes: Vec<u8>,
}

/// Builds the PDF inside a fresh temporary directory and reads it back.
/// The directory is removed when this returns, on success and on error.
pub fn export_pdf(filename: &str, lines: &[String]) -> Result<PdfReport, ReportError> {
    export_pdf_in(&std::env::temp_dir(), filename, lines)
}

/// [`export_pdf`] with the scratch directory created under `scratch_root`.
pub fn export_pdf_in(scratch_root: &Path, filename: &str, lines: &[String]) -> Result<PdfReport, ReportError> {
    if lines.is_empty() {
        return Err(ReportError::Empty);
    }

    let scratch = tempfile::Builder::new()
        .prefix("lens-report-")
        .tempdir_in(scratch_root)?;
    let download_name = format!("{}_report.pdf", filename);
    let pdf_path: PathBuf = scratch.path().join("report.pdf");

    let mut doc = PdfLayout::new().build(filename, lines)?;
    doc.save(&pdf_path).map_err(|e| ReportError::Pdf(e.to_string()))?;
    let bytes = std::fs::read(&pdf_path)?;

    tracing::debug!("Removing PDF scratch directory {}", scratch.path().display());
    scratch.close()?;

    Ok(PdfReport { download_name, bytes })
}

// A4 in points, 72pt margins on all sides
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 72.0;

const TITLE_SIZE: f32 = 24.0;
const SUBTITLE_SIZE: f32 = 16.0;
const NORMAL_SIZE: f32 = 10.0;
const NORMAL_LEADING: f32 = 12.0;
const CELL_SIZE: f32 = 10.0;
const CELL_LEADING: f32 = 14.0;
const CELL_PADDING_X: f32 = 6.0;
const CELL_PADDING_TOP: f32 = 3.0;
const CELL_PADDING_BOTTOM: f32 = 12.0;

/// Average Helvetica glyph advance as a fraction of the font size. Slightly
/// generous so wrapped lines never overrun the column.
const HELVETICA_AVG_ADVANCE: f32 = 0.55;

struct PdfLayout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor_y: f32,
}

impl PdfLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn content_width() -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn build(mut self, filename: &str, lines: &[String]) -> Result<Document, ReportError> {
        // Title block
        let title_width = text_width(REPORT_TITLE, TITLE_SIZE);
        let title_x = MARGIN + (Self::content_width() - title_width).max(0.0) / 2.0;
        self.text_line(REPORT_TITLE, "F2", TITLE_SIZE, title_x, TITLE_SIZE);
        self.space(20.0);

        for wrapped in wrap_text(&format!("Plik: {}", filename), SUBTITLE_SIZE, Self::content_width()) {
            self.ensure_room(SUBTITLE_SIZE);
            self.text_line(&wrapped, "F2", SUBTITLE_SIZE, MARGIN, SUBTITLE_SIZE);
        }
        self.space(24.0);

        self.text_line(&"-".repeat(60), "F1", NORMAL_SIZE, MARGIN, NORMAL_LEADING);
        self.space(20.0);

        self.text_line(PDF_SECTION_HEADER, "F1", NORMAL_SIZE, MARGIN, NORMAL_LEADING);
        self.space(12.0);

        let cell_text_width = Self::content_width() - 2.0 * CELL_PADDING_X;
        for line in lines {
            let wrapped = wrap_text(line, CELL_SIZE, cell_text_width);
            let row_height =
                CELL_PADDING_TOP + wrapped.len() as f32 * CELL_LEADING + CELL_PADDING_BOTTOM;
            self.ensure_room(row_height.min(PAGE_HEIGHT - 2.0 * MARGIN));

            self.space(CELL_PADDING_TOP);
            for part in &wrapped {
                // A single row taller than a page continues on the next one
                self.ensure_room(CELL_LEADING);
                self.text_line(part, "F1", CELL_SIZE, MARGIN + CELL_PADDING_X, CELL_LEADING);
            }
            self.space(CELL_PADDING_BOTTOM);
        }

        self.finish_page();
        self.into_document()
    }

    fn space(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor_y - height < MARGIN && !self.current.is_empty() {
            self.finish_page();
        }
    }

    fn finish_page(&mut self) {
        let ops = std::mem::take(&mut self.current);
        self.pages.push(ops);
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    /// Emits one line with its baseline `leading` below the cursor.
    fn text_line(&mut self, text: &str, font: &str, size: f32, x: f32, leading: f32) {
        self.cursor_y -= leading;
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), Object::Real(size)]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(self.cursor_y)]),
            Operation::new("Tj", vec![Object::String(encode_win_ansi(text), lopdf::StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn into_document(self) -> Result<Document, ReportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let encoded = content.encode().map_err(|e| ReportError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH), Object::Real(PAGE_HEIGHT)],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(REPORT_TITLE),
            "Producer" => Object::string_literal(concat!("lens-analyzer ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();
        Ok(doc)
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * HELVETICA_AVG_ADVANCE
}

/// Greedy word wrap to `max_width` points; words longer than a line are split.
fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * HELVETICA_AVG_ADVANCE)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Maps text to the base-14 fonts' WinAnsi code page; anything outside it
/// becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E => c as u8,
            0xA0..=0xFF => c as u32 as u8,
            _ => match c {
                '€' => 0x80,
                '‚' => 0x82,
                '„' => 0x84,
                '…' => 0x85,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                '\t' => b' ',
                _ => b'?',
            },
        })
        .collect()
}
