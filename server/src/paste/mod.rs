//! Ingestion and resolution of pastes.
//!
//! A paste is either a URL or an uploaded file. Both are fingerprinted,
//! deduplicated on their canonical value, and given the shortest free
//! prefix of their digest as a public key.

pub mod index;
pub mod routes;
pub mod upload;

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use axum::http::HeaderValue;

use crate::blobs::BlobStore;
use crate::db::models::{ContentEntry, ContentKind};
use crate::digest::{digest_reader, digest_str};
use crate::error::{PasteError, Result};
use crate::keys::{derive_key, KeyRegistry};

/// One submission, as handed over by the HTTP layer.
pub enum Submission<R> {
    Url(String),
    File(R),
}

/// Core service shared by all request handlers.
pub struct PasteService {
    registry: Arc<dyn KeyRegistry>,
    blobs: BlobStore,
}

impl PasteService {
    pub fn new(registry: Arc<dyn KeyRegistry>, blobs: BlobStore) -> Self {
        Self { registry, blobs }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store a submission and return its key.
    ///
    /// `authorized` is the outcome of the auth gate; when it is false
    /// nothing is read, written or registered.
    pub fn ingest<R: Read + Seek>(&self, submission: Submission<R>, authorized: bool) -> Result<String> {
        if !authorized {
            return Err(PasteError::Unauthorized);
        }
        match submission {
            Submission::Url(url) => self.ingest_url(&url),
            Submission::File(mut file) => self.ingest_file(&mut file),
        }
    }

    pub fn ingest_url(&self, url: &str) -> Result<String> {
        if url.is_empty() {
            return Err(PasteError::BadInput("empty url".to_string()));
        }
        // The value is replayed verbatim in a Location header on resolve.
        if HeaderValue::from_str(url).is_err() {
            return Err(PasteError::BadInput(format!("invalid url {:?}", url)));
        }
        let digest = digest_str(url);
        derive_key(self.registry.as_ref(), ContentKind::Url, url, &digest)
    }

    /// Digest, store and register a file. The reader may be positioned
    /// anywhere; it is rewound before each pass.
    pub fn ingest_file<R: Read + Seek>(&self, file: &mut R) -> Result<String> {
        file.seek(SeekFrom::Start(0))?;
        let digest = digest_reader(file)?;

        file.seek(SeekFrom::Start(0))?;
        self.blobs.put(&digest, file)?;

        derive_key(self.registry.as_ref(), ContentKind::File, &digest, &digest)
    }

    /// Look up what a key points at.
    pub fn resolve(&self, key: &str) -> Result<ContentEntry> {
        self.registry
            .find_by_key(key)?
            .ok_or_else(|| PasteError::NotFound(format!("key {}", key)))
    }

    /// Read the blob behind a file entry.
    pub fn read_blob(&self, entry: &ContentEntry) -> Result<Vec<u8>> {
        match entry.kind {
            ContentKind::File => self.blobs.read(&entry.value),
            ContentKind::Url => Err(PasteError::Internal(format!(
                "key {} is a url, not a file",
                entry.key
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SqliteRegistry;
    use std::io::Cursor;

    struct Fixture {
        _tmp: tempfile::TempDir,
        registry: Arc<SqliteRegistry>,
        service: PasteService,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let db = crate::db::init_db(&tmp.path().join("test.db")).unwrap();
        let registry = Arc::new(SqliteRegistry::new(db));
        let blobs = BlobStore::open(tmp.path().join("uploads")).unwrap();
        let service = PasteService::new(registry.clone(), blobs);
        Fixture {
            _tmp: tmp,
            registry,
            service,
        }
    }

    #[test]
    fn test_url_key_is_first_digest_char() {
        let f = fixture();
        let url = "http://example.com/a";
        let key = f.service.ingest_url(url).unwrap();
        assert_eq!(key, &digest_str(url)[..1]);

        let again = f.service.ingest_url(url).unwrap();
        assert_eq!(again, key);
        assert_eq!(f.registry.count_entries().unwrap(), 1);
    }

    #[test]
    fn test_colliding_url_gets_longer_key() {
        let f = fixture();
        let first = "http://example.com/a";
        let first_key = f.service.ingest_url(first).unwrap();

        // Find another URL whose digest starts with the same character
        let other = (0..)
            .map(|i| format!("http://example.com/{}", i))
            .find(|u| u != first && digest_str(u).starts_with(&first_key))
            .unwrap();
        let other_key = f.service.ingest_url(&other).unwrap();

        assert!(other_key.len() >= 2);
        assert!(digest_str(&other).starts_with(&other_key));
        assert_ne!(other_key, first_key);
    }

    #[test]
    fn test_file_round_trip() {
        let f = fixture();
        let bytes = b"hello paste\n".to_vec();
        let mut cursor = Cursor::new(bytes.clone());
        cursor.set_position(5);

        let key = f.service.ingest_file(&mut cursor).unwrap();
        let entry = f.service.resolve(&key).unwrap();
        assert_eq!(entry.kind, ContentKind::File);
        assert_eq!(entry.value, digest_str("hello paste\n"));
        assert!(entry.value.starts_with(&key));

        assert_eq!(f.service.read_blob(&entry).unwrap(), bytes);
    }

    #[test]
    fn test_identical_files_dedup() {
        let f = fixture();
        let a = f.service.ingest_file(&mut Cursor::new(b"same")).unwrap();
        let b = f.service.ingest_file(&mut Cursor::new(b"same")).unwrap();
        assert_eq!(a, b);
        assert_eq!(f.registry.count_entries().unwrap(), 1);
    }

    #[test]
    fn test_unauthorized_mutates_nothing() {
        let f = fixture();
        let err = f
            .service
            .ingest(Submission::File(Cursor::new(b"secret")), false)
            .unwrap_err();
        assert!(matches!(err, PasteError::Unauthorized));
        assert_eq!(f.registry.count_entries().unwrap(), 0);
        assert!(!f.service.blobs().has_blob(&digest_str("secret")));
    }

    #[test]
    fn test_resolve_unknown_key() {
        let f = fixture();
        assert!(matches!(
            f.service.resolve("doesnotexist"),
            Err(PasteError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_url_is_bad_input() {
        let f = fixture();
        assert!(matches!(
            f.service.ingest::<Cursor<Vec<u8>>>(Submission::Url(String::new()), true),
            Err(PasteError::BadInput(_))
        ));
    }

    #[test]
    fn test_url_unfit_for_location_is_bad_input() {
        let f = fixture();
        for url in ["http://a.example/x\ny", "http://a.example/\r", "http://a.example/\0"] {
            assert!(matches!(f.service.ingest_url(url), Err(PasteError::BadInput(_))));
        }
        assert_eq!(f.registry.count_entries().unwrap(), 0);
    }
}
