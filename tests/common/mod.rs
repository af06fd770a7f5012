#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use lens_analyzer::config::AppConfig;
use lens_analyzer::models::MetadataReport;
use lens_analyzer::services::metadata_tool::{MetadataTool, MutationAction, ToolError};
use lens_analyzer::{AppState, create_app};
use percent_encoding::percent_decode_str;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// In-memory stand-in for ExifTool. Every existing file reports the same tag
/// set; mutations remove groups per path.
#[derive(Default)]
pub struct FakeTool {
    removed: Mutex<HashMap<PathBuf, HashSet<&'static str>>>,
    fail_reads: bool,
    fail_writes: bool,
}

pub const WRITE_ERROR: &str = "Error: Not a valid JPG (looks more like a PNG)";

impl FakeTool {
    pub fn failing() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    /// Reads work; every mutation exits non-zero with [`WRITE_ERROR`].
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn tags(path: &Path) -> Vec<(&'static str, String)> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        vec![
            ("System", format!("File Name: {}", name)),
            ("System", format!("File Size: {} bytes", size)),
            ("EXIF", "Make: Canon".to_string()),
            ("EXIF", "Model: EOS".to_string()),
            ("GPS", "GPS Latitude: 52 deg 13' 0.00\" N".to_string()),
        ]
    }

    fn not_found(path: &Path) -> ToolError {
        ToolError::Failed {
            status: Some(1),
            stderr: format!("Error: File not found - {}", path.display()),
        }
    }
}

#[async_trait::async_trait]
impl MetadataTool for FakeTool {
    async fn read(&self, path: &Path) -> Result<MetadataReport, ToolError> {
        if self.fail_reads {
            return Err(ToolError::Failed {
                status: Some(1),
                stderr: "Error: Unknown file type".to_string(),
            });
        }
        if !path.exists() {
            return Err(Self::not_found(path));
        }

        let removed = self.removed.lock().unwrap();
        let removed = removed.get(path);
        let lines = Self::tags(path)
            .into_iter()
            .filter(|(group, _)| {
                *group == "System"
                    || removed.is_none_or(|r| !r.contains("*") && !r.contains(group))
            })
            .map(|(_, line)| line)
            .collect();

        Ok(MetadataReport {
            lines,
            source_file: path.to_path_buf(),
        })
    }

    async fn mutate(&self, path: &Path, action: MutationAction) -> Result<(), ToolError> {
        if !path.exists() {
            return Err(Self::not_found(path));
        }
        if self.fail_writes {
            return Err(ToolError::Failed {
                status: Some(1),
                stderr: format!("{} - {}\n", WRITE_ERROR, path.display()),
            });
        }
        let group = match action {
            MutationAction::RemoveAll => "*",
            MutationAction::RemoveCategory(c) => c.as_str(),
        };
        self.removed
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .insert(group);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.fail_reads
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

pub fn setup_with(tool: FakeTool) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = AppConfig::development(upload_dir.path());
    let state = AppState::new(config, Arc::new(tool));
    TestApp {
        app: create_app(state.clone()),
        state,
        upload_dir,
    }
}

pub fn setup() -> TestApp {
    setup_with(FakeTool::default())
}

pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n",
        boundary = BOUNDARY,
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(filename: &str, content: &[u8], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body("file", filename, content))).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn set_cookie_value<'a, B>(response: &'a Response<B>, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// `lens_session=<id>` as a `Cookie` header value.
pub fn session_cookie<B>(response: &Response<B>) -> String {
    let id = set_cookie_value(response, "lens_session").expect("no session cookie set");
    format!("lens_session={}", id)
}

/// (level, message) pairs flashed by a redirect.
pub fn flashes<B>(response: &Response<B>) -> Vec<(String, String)> {
    let Some(raw) = set_cookie_value(response, "lens_flash") else {
        return Vec::new();
    };
    let json = percent_decode_str(raw).decode_utf8().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|f| {
            (
                f["level"].as_str().unwrap().to_string(),
                f["message"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

pub fn location<B>(response: &Response<B>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// A small decodable PNG with some structure in it.
pub fn sample_png() -> Vec<u8> {
    let img = image::GrayImage::from_fn(64, 64, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 { image::Luma([230]) } else { image::Luma([20]) }
    });
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, image::ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn upload_dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
