//! Shortest-unused-prefix key derivation.
//!
//! Lookup and insert are separate statements, so two requests carrying the
//! same new content can both miss the lookup and race for the same prefix.
//! The registry's unique constraints decide the winner; the loser sees
//! `InsertOutcome::Taken` and starts over from the lookup, where the
//! winner's row is now visible.

use chrono::Utc;

use crate::db::models::{ContentEntry, ContentKind};
use crate::error::{PasteError, Result};
use crate::keys::registry::{InsertOutcome, KeyRegistry};

/// Upper bound on lookup/claim rounds for a single value.
pub const MAX_DERIVE_ATTEMPTS: usize = 8;

/// Return the key for `value`, registering a new one if needed.
///
/// `full_digest` supplies the candidates: `full_digest[..1]`,
/// `full_digest[..2]`, and so on up to the whole digest.
pub fn derive_key<R>(
    registry: &R,
    kind: ContentKind,
    value: &str,
    full_digest: &str,
) -> Result<String>
where
    R: KeyRegistry + ?Sized,
{
    if full_digest.is_empty() || !full_digest.is_ascii() {
        return Err(PasteError::Internal(format!(
            "digest {:?} is not a hex string",
            full_digest
        )));
    }

    for attempt in 1..=MAX_DERIVE_ATTEMPTS {
        if let Some(key) = registry.find_by_value(kind, value)? {
            tracing::debug!("{} {} already registered as {}", kind, value, key);
            return Ok(key);
        }

        let candidate = match shortest_free_prefix(registry, full_digest)? {
            Some(candidate) => candidate,
            None => {
                // A concurrent writer may have taken the last free prefix for
                // this same value.
                if let Some(key) = registry.find_by_value(kind, value)? {
                    return Ok(key);
                }
                tracing::error!(
                    "Hash collision: every prefix of {} is taken ({} {})",
                    full_digest,
                    kind,
                    value
                );
                return Err(PasteError::Conflict {
                    digest: full_digest.to_string(),
                });
            }
        };

        let entry = ContentEntry {
            key: candidate,
            kind,
            value: value.to_string(),
            created_at: Utc::now().timestamp(),
        };

        match registry.insert(&entry)? {
            InsertOutcome::Inserted => {
                tracing::info!("Registered {} {} as {}", kind, value, entry.key);
                return Ok(entry.key);
            }
            InsertOutcome::Taken => {
                tracing::debug!(
                    "Key {} claimed concurrently (attempt {}/{}), restarting",
                    entry.key,
                    attempt,
                    MAX_DERIVE_ATTEMPTS
                );
            }
        }
    }

    Err(PasteError::RetriesExhausted {
        value: value.to_string(),
        attempts: MAX_DERIVE_ATTEMPTS,
    })
}

/// First prefix of `full_digest` that is not yet used as a key.
fn shortest_free_prefix<R>(registry: &R, full_digest: &str) -> Result<Option<String>>
where
    R: KeyRegistry + ?Sized,
{
    for len in 1..=full_digest.len() {
        let candidate = &full_digest[..len];
        if !registry.key_exists(candidate)? {
            return Ok(Some(candidate.to_string()));
        }
    }
    Ok(None)
}
