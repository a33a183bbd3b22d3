//! Proof photo storage.
//!
//! Photos are written in two phases. [`PhotoStore::stage`] validates the upload
//! and writes it to a staging directory kept outside the served photo root;
//! once the database row that references the file has committed,
//! [`PhotoStore::promote`] moves it into place. If the database step fails the
//! caller calls [`PhotoStore::discard`] instead.
//!
//! Promotion is a rename, so both directories must sit on the same filesystem.

use crate::errors::{Error, Result};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, warn};

/// Largest accepted photo, in bytes
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for proof photos, with the extension they are stored under
const ACCEPTED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Directory that holds the proof photos
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    staging: PathBuf,
}

/// A validated photo waiting for its database row to commit
#[derive(Debug)]
#[must_use = "a staged photo must be promoted or discarded"]
pub struct StagedPhoto {
    file_name: String,
    staged_path: PathBuf,
}

impl StagedPhoto {
    /// Name the photo will have once promoted
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

fn extension_for(content_type: Option<&str>) -> Result<&'static str> {
    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .ok_or_else(|| Error::upload("Missing content type"))?;

    ACCEPTED_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| Error::upload("Only JPEG, PNG, GIF and WebP images are allowed"))
}

impl PhotoStore {
    /// Store serving from `root` and staging into `staging`; nothing is
    /// created until [`PhotoStore::ensure_dirs`].
    pub fn new(root: impl Into<PathBuf>, staging: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging: staging.into(),
        }
    }

    /// Directory promoted photos live in
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a promoted photo
    #[must_use]
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Creates the photo and staging directories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(&self.staging).await?;
        Ok(())
    }

    /// Validates an upload and writes it to the staging area.
    ///
    /// # Errors
    /// [`Error::Upload`] for an empty, oversized or non-image upload.
    pub async fn stage(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<StagedPhoto> {
        if bytes.is_empty() {
            return Err(Error::upload("Uploaded file is empty"));
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(Error::upload("Photo must not be larger than 5 MB"));
        }
        let ext = extension_for(content_type)?;

        self.ensure_dirs().await?;
        let file_name = format!("{}.{ext}", uuid::Uuid::new_v4().simple());
        let staged_path = self.staging.join(&file_name);
        fs::write(&staged_path, bytes)
            .await
            .map_err(|e| Error::upload(format!("Could not save photo: {e}")))?;

        debug!(file = %file_name, size = bytes.len(), "Staged proof photo");
        Ok(StagedPhoto {
            file_name,
            staged_path,
        })
    }

    /// Moves a staged photo into place and returns its file name.
    pub async fn promote(&self, staged: StagedPhoto) -> Result<String> {
        fs::rename(&staged.staged_path, self.path_of(&staged.file_name))
            .await
            .map_err(|e| Error::upload(format!("Could not store photo: {e}")))?;
        debug!(file = %staged.file_name, "Promoted proof photo");
        Ok(staged.file_name)
    }

    /// Drops a staged photo whose database row never committed.
    pub async fn discard(&self, staged: StagedPhoto) {
        remove_quietly(&staged.staged_path).await;
    }

    /// Deletes a promoted photo. A missing file is not an error.
    pub async fn remove(&self, file_name: &str) {
        remove_quietly(&self.path_of(file_name)).await;
    }
}

async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed photo file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove photo file"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn store_in(dir: &Path) -> PhotoStore {
        PhotoStore::new(dir.join("photos"), dir.join("staging"))
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("image/jpeg")).unwrap(), "jpg");
        assert_eq!(extension_for(Some("IMAGE/PNG")).unwrap(), "png");
        assert_eq!(extension_for(Some("image/webp; q=1")).unwrap(), "webp");
        assert!(matches!(
            extension_for(Some("application/pdf")),
            Err(Error::Upload { .. })
        ));
        assert!(matches!(extension_for(None), Err(Error::Upload { .. })));
    }

    #[tokio::test]
    async fn test_stage_then_promote() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(dir.path());

        let staged = store.stage(Some("image/png"), b"png-bytes").await?;
        let name = staged.file_name().to_string();
        assert!(name.ends_with(".png"));
        assert!(!store.path_of(&name).exists());
        // Nothing staged is reachable under the served root
        assert!(!staged.staged_path.starts_with(store.root()));
        assert!(std::fs::read_dir(store.root())?.next().is_none());

        let promoted = store.promote(staged).await?;
        assert_eq!(promoted, name);
        assert_eq!(std::fs::read(store.path_of(&name))?, b"png-bytes");

        store.remove(&name).await;
        assert!(!store.path_of(&name).exists());
        // Removing twice is fine
        store.remove(&name).await;
        Ok(())
    }

    #[tokio::test]
    async fn test_discard_leaves_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(dir.path());

        let staged = store.stage(Some("image/gif"), b"gif").await?;
        let name = staged.file_name().to_string();
        store.discard(staged).await;

        assert!(!store.path_of(&name).exists());
        assert_eq!(std::fs::read_dir(dir.path().join("staging"))?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_rejects_bad_uploads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = store_in(dir.path());

        assert!(matches!(
            store.stage(Some("image/png"), b"").await,
            Err(Error::Upload { .. })
        ));
        let too_big = vec![0_u8; MAX_PHOTO_BYTES + 1];
        assert!(matches!(
            store.stage(Some("image/png"), &too_big).await,
            Err(Error::Upload { .. })
        ));
        assert!(matches!(
            store.stage(Some("text/plain"), b"hello").await,
            Err(Error::Upload { .. })
        ));
        Ok(())
    }
}
