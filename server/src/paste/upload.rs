//! Multipart form parsing for `POST /`.
//!
//! Recognised fields: `auth` (upload token), `url`, and `file`. File
//! bodies are spooled to an anonymous temp file while their size is
//! counted, so oversized uploads are rejected before anything is hashed.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use std::fs::File;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::error::{PasteError, Result};

/// A file field written to local disk.
#[derive(Debug)]
pub struct SpooledFile {
    pub file: File,
    pub size: u64,
    pub file_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub auth: Option<String>,
    pub url: Option<String>,
    pub file: Option<SpooledFile>,
}

impl UploadForm {
    /// Drain a multipart body into an `UploadForm`.
    pub async fn read(
        mut multipart: Multipart,
        spool_dir: &Path,
        max_file_bytes: u64,
    ) -> Result<Self> {
        let mut form = UploadForm::default();
        let to_paste_error = multipart_error(max_file_bytes);

        while let Some(field) = multipart.next_field().await.map_err(&to_paste_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "auth" => form.auth = non_empty(field.text().await.map_err(&to_paste_error)?),
                "url" => form.url = non_empty(field.text().await.map_err(&to_paste_error)?),
                "file" => form.file = Some(spool(field, spool_dir, max_file_bytes).await?),
                other => tracing::debug!("Ignoring form field {:?}", other),
            }
        }

        Ok(form)
    }
}

async fn spool(
    mut field: Field<'_>,
    spool_dir: &Path,
    max_file_bytes: u64,
) -> Result<SpooledFile> {
    let file_name = field.file_name().map(|s| s.to_string());
    let mut out = tokio::fs::File::from_std(tempfile::tempfile_in(spool_dir)?);
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error(max_file_bytes))? {
        size += chunk.len() as u64;
        if size > max_file_bytes {
            return Err(PasteError::PayloadTooLarge {
                limit: max_file_bytes,
            });
        }
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    Ok(SpooledFile {
        file: out.into_std().await,
        size,
        file_name,
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// The body limit layer surfaces as a multipart error mid-stream.
fn multipart_error(limit: u64) -> impl Fn(MultipartError) -> PasteError {
    move |err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            PasteError::PayloadTooLarge { limit }
        } else {
            PasteError::BadInput(err.body_text())
        }
    }
}
