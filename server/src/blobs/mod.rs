//! Content-addressed blob store for uploaded files.
//!
//! Storage layout: `{uploads_dir}/{hex_digest}`, plain bytes, one file per
//! distinct digest. Blobs are written once and never modified.

pub mod store;

pub use store::BlobStore;
