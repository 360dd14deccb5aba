//! HTTP handlers for submitting and following pastes.
//!
//! POST /        — multipart form with `url` or `file`, optional `auth`
//! GET  /{key}   — 307 redirect for URLs, raw bytes for files

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::auth::middleware::BearerToken;
use crate::auth::tokens;
use crate::db::models::ContentKind;
use crate::error::{PasteError, Result};
use crate::paste::index::ROBOTS_TXT;
use crate::paste::upload::UploadForm;
use crate::paste::Submission;
use crate::state::AppState;

/// GET /
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html.to_string())
}

/// GET /robots.txt
pub async fn robots() -> &'static str {
    ROBOTS_TXT
}

/// POST /
///
/// Accepts a URL or a file and responds with the public link as plain
/// text. A `url` field takes precedence when both are present. The token
/// is read from `Authorization: Bearer` or the `auth` form field.
pub async fn create_paste(
    State(state): State<AppState>,
    BearerToken(header_token): BearerToken,
    multipart: Multipart,
) -> Result<String> {
    let form = UploadForm::read(multipart, &state.spool_dir, state.max_file_bytes).await?;

    let authorized = if state.require_auth {
        let token = header_token.or(form.auth).unwrap_or_default();
        let db = state.db.clone();
        let presented = token.clone();
        let valid =
            tokio::task::spawn_blocking(move || tokens::is_valid_token(&db, &presented)).await??;
        if !valid {
            tracing::warn!("Failed authentication with token {:?}", tokens::redact(&token));
        }
        valid
    } else {
        true
    };

    let submission = match (form.url, form.file) {
        (Some(url), _) => Submission::Url(url),
        (None, Some(spooled)) => {
            tracing::debug!(
                "Received file {:?} ({} bytes)",
                spooled.file_name.as_deref().unwrap_or("-"),
                spooled.size
            );
            Submission::File(spooled.file)
        }
        (None, None) if !authorized => return Err(PasteError::Unauthorized),
        (None, None) => {
            return Err(PasteError::BadInput(
                "expected a url or file field".to_string(),
            ))
        }
    };

    let paste = state.paste.clone();
    let key = tokio::task::spawn_blocking(move || paste.ingest(submission, authorized)).await??;

    Ok(format!("{}/{}", state.public_url, key))
}

enum Resolved {
    Redirect(String),
    Blob(Vec<u8>),
}

/// GET /{key}
pub async fn resolve_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let paste = state.paste.clone();

    let resolved = tokio::task::spawn_blocking(move || -> Result<Resolved> {
        let entry = paste.resolve(&key)?;
        match entry.kind {
            ContentKind::Url => Ok(Resolved::Redirect(entry.value)),
            ContentKind::File => {
                let data = paste.read_blob(&entry).inspect_err(|e| {
                    tracing::warn!("Key {} points at an unreadable blob: {}", key, e)
                })?;
                Ok(Resolved::Blob(data))
            }
        }
    })
    .await??;

    Ok(match resolved {
        Resolved::Redirect(url) => Redirect::temporary(&url).into_response(),
        Resolved::Blob(data) => {
            ([(header::CONTENT_TYPE, sniff_content_type(&data))], data).into_response()
        }
    })
}

/// Best-effort content type from the first bytes of a blob.
fn sniff_content_type(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *mime;
    }
    if data.starts_with(b"RIFF") && data.get(8..12) == Some(&b"WEBP"[..]) {
        return "image/webp";
    }
    // Only the head is inspected; a truncated multi-byte char at the cut is fine
    let head = &data[..data.len().min(512)];
    match std::str::from_utf8(head) {
        Ok(_) => "text/plain; charset=utf-8",
        Err(e) if e.error_len().is_none() => "text/plain; charset=utf-8",
        Err(_) => "application/octet-stream",
    }
}
