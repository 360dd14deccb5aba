//! linkpaste server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod blobs;
pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod keys;
pub mod paste;
pub mod routes;
pub mod state;

pub use error::{PasteError, Result};
