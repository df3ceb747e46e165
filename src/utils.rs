//! Utility functions for artifact naming and file operations

use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Extensions the extractor may produce for a merged media file
pub const MEDIA_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "webm"];

/// Reduce a media title to a filesystem-safe stem
///
/// Keeps word characters, whitespace and `-`, then collapses every run of
/// whitespace and dashes into a single `-`. Falls back to "media" when
/// nothing survives.
///
/// # Examples
///
/// ```
/// use media_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("My Clip: Part 1/2"), "My-Clip-Part-12");
/// assert_eq!(sanitize_title("???"), "media");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.trim().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c);
            in_separator = false;
        }
    }

    if out.is_empty() {
        "media".to_string()
    } else {
        out
    }
}

/// Durable artifact file name: `<sanitized-title>_<id>.<ext>`
#[must_use]
pub fn artifact_file_name(title: &str, id: &str, ext: &str) -> String {
    format!("{}_{}.{}", sanitize_title(title), id, ext)
}

/// `Content-Disposition` value offering the artifact as `<title>.<ext>`
///
/// Header values must be visible ASCII, so other characters become `_` and
/// quotes or backslashes are dropped.
#[must_use]
pub fn content_disposition(title: &str, ext: &str) -> String {
    let name: String = title
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    let name = name.trim();
    let name = if name.is_empty() { "media" } else { name };
    format!("attachment; filename=\"{name}.{ext}\"")
}

/// First media file (by name) the extractor left in `dir`
pub async fn find_produced_file(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_media = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_media && entry.file_type().await?.is_file() {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Extraction("No video file found after download".to_string()))
}

/// Move a file, copying across filesystems when a plain rename is refused
pub async fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(?source, ?destination, "rename crosses devices, copying");
            tokio::fs::copy(source, destination).await?;
            tokio::fs::remove_file(source).await
        }
        Err(e) => Err(e),
    }
}

/// Delete a file; a missing file is not an error. Returns whether a file was removed.
pub async fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Delete a directory tree; a missing directory is not an error
pub async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
