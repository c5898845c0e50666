//! Filesystem helpers for scratch files and downloads.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, replacing `dst`.
///
/// Tries a rename first and falls back to copy-and-delete when the two paths
/// are on different filesystems (EXDEV).
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if src == dst {
        return Ok(());
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            fs::copy(src, dst).await?;
            if let Err(e) = fs::remove_file(src).await {
                tracing::warn!("Failed to remove {} after copy: {}", src.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Find the file a tool wrote for output template `<stem>.%(ext)s`.
///
/// `preferred_ext` is checked first; otherwise the first regular file in the
/// same directory whose name is `<stem>.<anything>` wins.
pub async fn find_with_stem(
    stem_path: &Path,
    preferred_ext: &str,
) -> MediaResult<Option<PathBuf>> {
    let preferred = stem_path.with_extension(preferred_ext);
    if fs::try_exists(&preferred).await? {
        return Ok(Some(preferred));
    }

    let Some(dir) = stem_path.parent() else {
        return Ok(None);
    };
    let Some(stem) = stem_path.file_name().map(|s| s.to_string_lossy().to_string()) else {
        return Ok(None);
    };
    let prefix = format!("{stem}.");

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        // yt-dlp leaves `.part` and `.ytdl` files while working
        if name.starts_with(&prefix)
            && !name.ends_with(".part")
            && !name.ends_with(".ytdl")
            && entry.file_type().await?.is_file()
        {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Remove a file, ignoring "not found".
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Recursively remove a directory, ignoring "not found".
pub async fn remove_dir_all_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_dir_all(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}
