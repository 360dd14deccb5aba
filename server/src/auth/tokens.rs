use chrono::Utc;
use rand::Rng;
use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::db::models::TokenRow;
use crate::db::DbPool;
use crate::error::{PasteError, Result};

/// Generate a 32-byte random upload token, hex-encoded (64 chars).
pub fn generate_token() -> String {
    let token_bytes: [u8; 32] = rand::rng().random();
    hex::encode(token_bytes)
}

/// Hash a token with SHA-256 for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// First few characters of a token, safe to put in a log line.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}

/// Add a token to the allow-list. Adding the same token twice is a no-op.
pub fn add_token(db: &DbPool, token: &str, comment: Option<&str>) -> Result<()> {
    if token.is_empty() {
        return Err(PasteError::BadInput("token must not be empty".to_string()));
    }
    let conn = db
        .lock()
        .map_err(|e| PasteError::Internal(format!("DB lock error: {}", e)))?;
    conn.execute(
        "INSERT OR IGNORE INTO tokens (token_hash, comment, created_at) VALUES (?1, ?2, ?3)",
        params![hash_token(token), comment, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Check a presented token against the allow-list.
/// Empty and unknown tokens are never valid.
pub fn is_valid_token(db: &DbPool, token: &str) -> Result<bool> {
    if token.is_empty() {
        return Ok(false);
    }
    let conn = db
        .lock()
        .map_err(|e| PasteError::Internal(format!("DB lock error: {}", e)))?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tokens WHERE token_hash = ?1",
        params![hash_token(token)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_tokens(db: &DbPool) -> Result<Vec<TokenRow>> {
    let conn = db
        .lock()
        .map_err(|e| PasteError::Internal(format!("DB lock error: {}", e)))?;
    let mut stmt =
        conn.prepare("SELECT id, token_hash, comment, created_at FROM tokens ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TokenRow {
                id: row.get(0)?,
                token_hash: row.get(1)?,
                comment: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, DbPool) {
        let tmp = tempfile::tempdir().unwrap();
        let db = crate::db::init_db(&tmp.path().join("test.db")).unwrap();
        (tmp, db)
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_allow_list() {
        let (_tmp, db) = test_db();
        let token = generate_token();
        assert!(!is_valid_token(&db, &token).unwrap());

        add_token(&db, &token, Some("laptop")).unwrap();
        add_token(&db, &token, Some("again")).unwrap();
        assert!(is_valid_token(&db, &token).unwrap());
        assert!(!is_valid_token(&db, "someone-else").unwrap());
        assert!(!is_valid_token(&db, "").unwrap());

        let rows = list_tokens(&db).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].comment.as_deref(), Some("laptop"));
        // Plaintext never hits the table
        assert_eq!(rows[0].token_hash, hash_token(&token));
    }

    #[test]
    fn test_empty_token_rejected() {
        let (_tmp, db) = test_db();
        assert!(matches!(add_token(&db, "", None), Err(PasteError::BadInput(_))));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("abcdef123"), "abcd…");
        assert_eq!(redact(""), "…");
    }
}
