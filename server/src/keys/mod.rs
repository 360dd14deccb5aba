//! Short public keys for stored content.
//!
//! A key is the shortest prefix of a content digest that no other entry
//! already uses. The registry persists the key/value mapping and enforces
//! uniqueness on both sides; the derivation engine picks candidates and
//! retries when a concurrent writer claims one first.

pub mod derive;
pub mod registry;

pub use derive::{derive_key, MAX_DERIVE_ATTEMPTS};
pub use registry::{InsertOutcome, KeyRegistry, SqliteRegistry};
