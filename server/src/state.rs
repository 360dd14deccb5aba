use std::path::PathBuf;
use std::sync::Arc;

use crate::blobs::BlobStore;
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::Result;
use crate::keys::SqliteRegistry;
use crate::paste::{index, PasteService};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Key derivation, blob storage and resolution
    pub paste: Arc<PasteService>,
    /// Public base URL, without trailing slash, prepended to returned keys
    pub public_url: String,
    /// Whether `POST /` requires an allow-listed token
    pub require_auth: bool,
    /// Largest accepted file upload in bytes
    pub max_file_bytes: u64,
    /// Pre-rendered index page
    pub index_html: Arc<str>,
    /// Scratch directory for in-flight uploads
    pub spool_dir: PathBuf,
}

impl AppState {
    /// Create directories, open the database and blob store, and render the
    /// index page.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = db::init_db(&config.db_path())?;

        let blobs = BlobStore::open(config.uploads_dir())?;
        tracing::info!("Blob store at {}", blobs.dir().display());

        let spool_dir = config.spool_dir();
        std::fs::create_dir_all(&spool_dir)?;

        let public_url = config.public_url();
        let index_html = index::load_index(
            config.index_path.as_deref().map(std::path::Path::new),
            &public_url,
            config.max_file_bytes,
        )?;

        let registry = Arc::new(SqliteRegistry::new(db.clone()));

        Ok(Self {
            db,
            paste: Arc::new(PasteService::new(registry, blobs)),
            public_url,
            require_auth: config.require_auth,
            max_file_bytes: config.max_file_bytes,
            index_html: index_html.into(),
            spool_dir,
        })
    }
}
