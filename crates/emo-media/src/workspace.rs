//! Per-request scratch directories.
//!
//! Every request gets its own directory under the configured work root. The
//! directory and everything in it is removed when the [`RequestWorkspace`]
//! is dropped, whichever way the request ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::MediaResult;

/// Longest sanitized upload name kept in the stored filename.
const MAX_NAME_CHARS: usize = 64;

/// Scratch directory owned by a single request.
#[derive(Debug)]
pub struct RequestWorkspace {
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create a fresh directory under `base`, creating `base` if needed.
    pub async fn create(base: impl AsRef<Path>) -> MediaResult<Self> {
        let base = base.as_ref();
        fs::create_dir_all(base).await?;

        let dir = tempfile::Builder::new().prefix("req_").tempdir_in(base)?;
        debug!(dir = %dir.path().display(), "Created request workspace");
        Ok(Self { dir })
    }

    /// Workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Persist an uploaded payload under a unique name.
    pub async fn write_upload(&self, filename: Option<&str>, bytes: &[u8]) -> MediaResult<PathBuf> {
        let name = sanitize_filename(filename.unwrap_or("upload.mp4"));
        let path = self
            .dir
            .path()
            .join(format!("input_{}_{}", Uuid::new_v4().simple(), name));
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Destination for the normalized clip.
    pub fn clip_path(&self) -> PathBuf {
        self.dir
            .path()
            .join(format!("trimmed_{}.mp4", Uuid::new_v4().simple()))
    }
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Directory components are discarded and anything other than ASCII
/// alphanumerics, `.`, `-` and `_` becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\videos\\my clip.mov"), "my_clip.mov");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert!(sanitize_filename(&"a".repeat(500)).len() <= MAX_NAME_CHARS);
    }

    #[tokio::test]
    async fn test_workspace_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let workspace = RequestWorkspace::create(base.path().join("work")).await.unwrap();

        let upload = workspace
            .write_upload(Some("../evil name.mp4"), b"data")
            .await
            .unwrap();
        assert!(upload.starts_with(workspace.path()));
        assert!(upload
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("evil_name.mp4"));
        assert!(workspace.clip_path().starts_with(workspace.path()));

        let dir = workspace.path().to_path_buf();
        assert!(dir.exists());
        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_workspaces_are_isolated() {
        let base = tempfile::tempdir().unwrap();
        let a = RequestWorkspace::create(base.path()).await.unwrap();
        let b = RequestWorkspace::create(base.path()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
