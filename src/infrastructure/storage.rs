use anyhow::Context;
use std::path::Path;
use tracing::info;

const PROBE_FILE: &str = ".write_probe";

/// Creates the upload directory if needed and proves it is writable by
/// writing and removing a probe file.
pub async fn prepare_upload_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create upload directory {}", dir.display()))?;

    let probe = dir.join(PROBE_FILE);
    tokio::fs::write(&probe, b"ok")
        .await
        .with_context(|| format!("upload directory {} is not writable", dir.display()))?;
    tokio::fs::remove_file(&probe)
        .await
        .with_context(|| format!("cannot remove probe file {}", probe.display()))?;

    info!("📂 Upload directory: {}", dir.display());
    Ok(())
}
