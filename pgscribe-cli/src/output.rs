//! Writing generated files under the output root

use anyhow::{Context, Result};
use pgscribe_schema::codegen::GeneratedFile;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Remove `directories` (relative to `root`) that exist
pub async fn clean_output(root: &Path, directories: &[&str]) -> Result<()> {
    for directory in directories {
        let path = root.join(directory);
        if fs::try_exists(&path).await.unwrap_or(false) {
            log::debug!("Removing {}", path.display());
            fs::remove_dir_all(&path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Write every file below `root`, creating parent directories as needed
pub async fn write_files(root: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
