use crate::config::AppConfig;
use crate::services::metadata_tool::{ExifTool, MetadataTool};
use anyhow::{Context, bail};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Fails unless `path` is an existing regular file the process may execute.
pub fn verify_executable(path: &Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("metadata tool not found at {}", path.display()))?;

    if !meta.is_file() {
        bail!("metadata tool path {} is not a file", path.display());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            bail!("metadata tool at {} is not executable", path.display());
        }
    }

    Ok(())
}

pub fn setup_metadata_tool(config: &AppConfig) -> anyhow::Result<Arc<dyn MetadataTool>> {
    verify_executable(&config.exiftool_path)?;
    info!(
        "🔧 Metadata tool: {} (timeout {:?})",
        config.exiftool_path.display(),
        config.tool_timeout
    );
    Ok(Arc::new(ExifTool::new(&config.exiftool_path, config.tool_timeout)))
}
