//! Database row types for all tables.
//! These correspond 1:1 to the SQLite schema defined in migrations.rs.

use std::fmt;
use std::str::FromStr;

/// What an entry's value points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `value` is the submitted URL, verbatim
    Url,
    /// `value` is the full digest naming a blob in the uploads directory
    File,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Url => "url",
            ContentKind::File => "file",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ContentKind::Url),
            "file" => Ok(ContentKind::File),
            other => Err(format!("unexpected content kind {:?}", other)),
        }
    }
}

/// Entry record in the entries table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub key: String,
    pub kind: ContentKind,
    pub value: String,
    /// Unix seconds, set once at insertion
    pub created_at: i64,
}

/// Allow-listed upload token (SHA-256 hash stored, not plaintext)
#[derive(Debug, Clone)]
pub struct TokenRow {
    pub id: i64,
    pub token_hash: String,
    pub comment: Option<String>,
    pub created_at: String,
}
