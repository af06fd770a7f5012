use crate::models::{CleanCopy, MetadataReport, UploadedFile};
use crate::utils::validation::{ValidationError, validate_category};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Writes changes into the target instead of leaving a `_original` backup.
const OVERWRITE_FLAG: &str = "-overwrite_original";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{}", failure_message(*status, stderr))]
    Failed { status: Option<i32>, stderr: String },

    #[error("Failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata tool printed no metadata")]
    EmptyOutput,

    #[error("Metadata tool did not finish within {} s", .0.as_secs())]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn failure_message(status: Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    match (stderr.is_empty(), status) {
        (false, _) => stderr.to_string(),
        (true, Some(code)) => format!("exit status {}", code),
        (true, None) => "terminated by signal".to_string(),
    }
}

/// A metadata group accepted by `-<GROUP>=`, checked against the known vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category(&'static str);

impl Category {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate_category(raw).map(Category)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// In-place metadata mutations the tool is allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    RemoveAll,
    RemoveCategory(Category),
}

/// A complete tool invocation, minus the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
    Read,
    Mutate(MutationAction),
    Version,
}

impl ToolCommand {
    pub fn args(&self) -> Vec<String> {
        match self {
            ToolCommand::Read => Vec::new(),
            ToolCommand::Mutate(MutationAction::RemoveAll) => {
                vec!["-all=".to_string(), OVERWRITE_FLAG.to_string()]
            }
            ToolCommand::Mutate(MutationAction::RemoveCategory(category)) => {
                vec![format!("-{}=", category.as_str()), OVERWRITE_FLAG.to_string()]
            }
            ToolCommand::Version => vec!["-ver".to_string()],
        }
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam between request handling and the external metadata program.
#[async_trait::async_trait]
pub trait MetadataTool: Send + Sync {
    /// Reads all metadata of `path` without modifying it.
    async fn read(&self, path: &Path) -> Result<MetadataReport, ToolError>;

    /// Applies `action` to `path` in place.
    async fn mutate(&self, path: &Path, action: MutationAction) -> Result<(), ToolError>;

    /// Check if the tool can be started
    async fn health_check(&self) -> bool;
}

/// ExifTool driven as a subprocess.
pub struct ExifTool {
    path: PathBuf,
    timeout: Duration,
}

impl ExifTool {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Runs one command against `target` (or no target for [`ToolCommand::Version`]).
    /// Succeeds only on exit status 0; the child is killed if it outlives the timeout.
    pub async fn run(&self, command: ToolCommand, target: Option<&Path>) -> Result<ToolOutput, ToolError> {
        let mut cmd = Command::new(&self.path);
        cmd.args(command.args());
        if let Some(target) = target {
            cmd.arg(guard_leading_dash(target));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(?command, target = ?target, "invoking metadata tool");

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            path: self.path.clone(),
            source,
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::error!(?command, target = ?target, "metadata tool timed out after {:?}", self.timeout);
                ToolError::Timeout(self.timeout)
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::warn!(
                ?command,
                target = ?target,
                status = ?output.status.code(),
                "metadata tool failed: {}",
                stderr.trim()
            );
            return Err(ToolError::Failed {
                status: output.status.code(),
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

#[async_trait::async_trait]
impl MetadataTool for ExifTool {
    async fn read(&self, path: &Path) -> Result<MetadataReport, ToolError> {
        let output = self.run(ToolCommand::Read, Some(path)).await?;
        let report = MetadataReport::from_tool_output(&output.stdout, path);
        if report.is_empty() {
            // A successful read always prints at least the file-system tags
            return Err(ToolError::EmptyOutput);
        }
        tracing::info!("Read {} metadata lines from {}", report.len(), path.display());
        Ok(report)
    }

    async fn mutate(&self, path: &Path, action: MutationAction) -> Result<(), ToolError> {
        tracing::info!("Applying {:?} to {}", action, path.display());
        let output = self.run(ToolCommand::Mutate(action), Some(path)).await?;
        if !output.stderr.trim().is_empty() {
            // Exit status 0 with warnings, e.g. "nothing to delete"
            tracing::warn!("Metadata tool warnings for {}: {}", path.display(), output.stderr.trim());
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.run(ToolCommand::Version, None).await.is_ok()
    }
}

/// Copies `file` to its `clean_` sibling and strips all metadata from the copy,
/// leaving the original untouched. A failed strip removes the partial copy.
pub async fn create_clean_copy(
    tool: &dyn MetadataTool,
    file: &UploadedFile,
) -> Result<CleanCopy, ToolError> {
    let clean = file.clean_copy();
    tokio::fs::copy(&file.stored_path, clean.path()).await?;

    if let Err(e) = tool.mutate(clean.path(), MutationAction::RemoveAll).await {
        if let Err(rm) = tokio::fs::remove_file(clean.path()).await {
            tracing::warn!("Failed to remove partial clean copy {}: {}", clean.path().display(), rm);
        }
        return Err(e);
    }

    tracing::info!("Created clean copy {}", clean.path().display());
    Ok(clean)
}

/// Keeps a relative path that starts with `-` from being parsed as an option.
fn guard_leading_dash(target: &Path) -> PathBuf {
    if target.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(target)
    } else {
        target.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_arguments() {
        assert!(ToolCommand::Read.args().is_empty());
        assert_eq!(
            ToolCommand::Mutate(MutationAction::RemoveAll).args(),
            vec!["-all=", "-overwrite_original"]
        );
        let gps = Category::parse("gps").unwrap();
        assert_eq!(
            ToolCommand::Mutate(MutationAction::RemoveCategory(gps)).args(),
            vec!["-GPS=", "-overwrite_original"]
        );
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        let err = ToolError::Failed {
            status: Some(1),
            stderr: "Error: File not found - x.jpg\n".to_string(),
        };
        assert_eq!(err.to_string(), "Error: File not found - x.jpg");

        let err = ToolError::Failed {
            status: Some(2),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "exit status 2");
    }

    #[test]
    fn test_leading_dash_is_guarded() {
        assert_eq!(guard_leading_dash(Path::new("-all=.jpg")), PathBuf::from("./-all=.jpg"));
        assert_eq!(guard_leading_dash(Path::new("up/a.jpg")), PathBuf::from("up/a.jpg"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let tool = ExifTool::new("/nonexistent/exiftool", Duration::from_secs(1));
        let err = tool.read(Path::new("a.jpg")).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(!tool.health_check().await);
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Stand-in for ExifTool: prints a few tags until `-all=` drops a marker
        /// next to the target, then only the file type.
        const FAKE_TOOL: &str = r#"#!/bin/sh
for last in "$@"; do :; done
case "$1" in
  -ver) echo "12.76"; exit 0 ;;
  -all=) touch "$last.stripped"; exit 0 ;;
  -GPS=) exit 0 ;;
  -XMP=) echo "Error: Not a valid JPG (looks more like a PNG)" >&2; exit 1 ;;
esac
if [ ! -f "$last" ]; then
  echo "Error: File not found - $last" >&2
  exit 1
fi
if [ -f "$last.stripped" ]; then
  echo "File Type                       : JPEG"
  exit 0
fi
echo "File Name                       : $(basename "$last")"
echo ""
echo "File Size                       : 12 kB"
echo "Make                            : Canon"
echo "   Model                        : EOS 5D   "
"#;

        fn install_fake_tool(dir: &Path) -> PathBuf {
            let path = dir.join("exiftool");
            std::fs::write(&path, FAKE_TOOL).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_read_preserves_tool_order() {
            let dir = tempfile::tempdir().unwrap();
            let tool = ExifTool::new(install_fake_tool(dir.path()), Duration::from_secs(5));
            let photo = dir.path().join("photo.jpg");
            std::fs::write(&photo, b"jpeg").unwrap();

            let report = tool.read(&photo).await.unwrap();
            assert_eq!(report.lines.len(), 4);
            assert!(report.lines[0].starts_with("File Name"));
            assert!(report.lines[1].starts_with("File Size"));
            assert_eq!(report.lines[3], "Model                        : EOS 5D");
            assert!(tool.health_check().await);
        }

        #[tokio::test]
        async fn test_nonzero_exit_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let tool = ExifTool::new(install_fake_tool(dir.path()), Duration::from_secs(5));

            let err = tool.read(&dir.path().join("missing.jpg")).await.unwrap_err();
            assert!(err.to_string().contains("File not found"));
        }

        #[tokio::test]
        async fn test_failed_strip_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let tool = ExifTool::new(install_fake_tool(dir.path()), Duration::from_secs(5));
            let photo = dir.path().join("photo.jpg");
            std::fs::write(&photo, b"jpeg").unwrap();

            let xmp = Category::parse("xmp").unwrap();
            let err = tool
                .mutate(&photo, MutationAction::RemoveCategory(xmp))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::Failed { status: Some(1), .. }));
            assert_eq!(err.to_string(), "Error: Not a valid JPG (looks more like a PNG)");
        }

        #[tokio::test]
        async fn test_remove_all_is_idempotent() {
            let dir = tempfile::tempdir().unwrap();
            let tool = ExifTool::new(install_fake_tool(dir.path()), Duration::from_secs(5));
            let photo = dir.path().join("photo.jpg");
            std::fs::write(&photo, b"jpeg").unwrap();

            let before = tool.read(&photo).await.unwrap();
            tool.mutate(&photo, MutationAction::RemoveAll).await.unwrap();
            let first = tool.read(&photo).await.unwrap();
            tool.mutate(&photo, MutationAction::RemoveAll).await.unwrap();
            let second = tool.read(&photo).await.unwrap();

            assert!(first.len() < before.len());
            assert_eq!(first.lines, second.lines);
            assert_eq!(second.lines, vec!["File Type                       : JPEG"]);
        }

        #[tokio::test]
        async fn test_clean_copy_leaves_original() {
            let dir = tempfile::tempdir().unwrap();
            let tool = ExifTool::new(install_fake_tool(dir.path()), Duration::from_secs(5));
            let photo = dir.path().join("photo.jpg");
            std::fs::write(&photo, b"jpeg").unwrap();
            let file = UploadedFile {
                original_name: "photo.jpg".to_string(),
                stored_path: photo.clone(),
                extension: "jpg".to_string(),
            };

            let clean = create_clean_copy(&tool, &file).await.unwrap();
            assert!(clean.path().exists());

            let original = tool.read(&photo).await.unwrap();
            let stripped = tool.read(clean.path()).await.unwrap();
            assert_eq!(original.len(), 4);
            assert!(stripped.lines.iter().all(|l| l.starts_with("File Type")));
        }

        #[tokio::test]
        async fn test_timeout_kills_hung_tool() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("slow-tool");
            std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

            let tool = ExifTool::new(path, Duration::from_millis(200));
            let err = tool.read(Path::new("a.jpg")).await.unwrap_err();
            assert!(matches!(err, ToolError::Timeout(_)));
        }
    }
}
