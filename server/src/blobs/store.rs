//! Write-if-absent file storage keyed by digest.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::digest::is_full_digest;
use crate::error::{PasteError, Result};

#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Open the store, creating the uploads directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Compute the file path for a blob given its hex digest.
    fn blob_path(&self, digest: &str) -> Option<PathBuf> {
        // The digest becomes a file name, so nothing but hex gets through
        is_full_digest(digest).then(|| self.dir.join(digest))
    }

    pub fn has_blob(&self, digest: &str) -> bool {
        self.blob_path(digest).is_some_and(|p| p.is_file())
    }

    /// Store the bytes from `reader` under `digest`.
    ///
    /// Returns `Ok(true)` if this call wrote the blob and `Ok(false)` if it
    /// already existed. The caller is responsible for rewinding `reader`.
    /// Bytes land in a temp file first and are linked into place without
    /// clobbering, so a concurrent writer of the same digest never sees a
    /// partial blob.
    pub fn put<R: Read>(&self, digest: &str, reader: &mut R) -> Result<bool> {
        let path = self
            .blob_path(digest)
            .ok_or_else(|| PasteError::Internal(format!("Invalid blob digest {:?}", digest)))?;

        if path.exists() {
            tracing::debug!("Blob {} already exists, skipping", digest);
            return Ok(false);
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        let size = io::copy(reader, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                tracing::debug!("Stored blob {} ({} bytes)", digest, size);
                Ok(true)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!("Blob {} written concurrently, keeping existing", digest);
                Ok(false)
            }
            Err(e) => Err(e.error.into()),
        }
    }

    /// Open the blob stored under `digest`.
    pub fn get(&self, digest: &str) -> Result<File> {
        let path = self
            .blob_path(digest)
            .ok_or_else(|| PasteError::NotFound(format!("blob {}", digest)))?;
        File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PasteError::NotFound(format!("blob {}", digest)),
            _ => PasteError::Io(e),
        })
    }

    /// Read a whole blob into memory.
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let mut file = self.get(digest)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
