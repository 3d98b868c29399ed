//! Filesystem helpers shared by the file-backed stores.

use std::path::Path;

use anyhow::{Context, Result};

/// Writes `content` to `path` atomically: temp file in the same directory,
/// then rename. Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if any filesystem step fails. The temp file is removed
/// on failure.
pub fn atomic_write(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let result = write_then_rename(&temp_path, path, content, mode);
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, content: &[u8], mode: u32) -> Result<()> {
    std::fs::write(temp_path, content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(temp_path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    std::fs::rename(temp_path, path)
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

/// Removes a file, treating "already gone" as success.
///
/// # Errors
///
/// Returns any other I/O error.
pub fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
