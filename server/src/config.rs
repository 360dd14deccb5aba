use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Command-line flags. Every setting is optional here so that only flags
/// actually passed override the TOML file and environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "linkpaste-server", version, about = "Content-addressed link and file paste host")]
pub struct Cli {
    /// Path to TOML config file
    #[arg(short = 'c', long, env = "LINKPASTE_CONFIG", default_value = "./linkpaste.toml")]
    #[serde(skip)]
    pub config: String,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,

    /// Generate an upload token with this comment, store it, print it, and exit
    #[arg(long, value_name = "COMMENT")]
    #[serde(skip)]
    pub add_token: Option<String>,

    /// Public base URL prepended to returned keys
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Data directory for persistent state (DB, uploads)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// SQLite database path (default: <data_dir>/linkpaste.db)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    /// Directory for uploaded file blobs (default: <data_dir>/uploads)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<String>,

    /// HTML template served at GET /
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,

    /// Largest accepted file upload, in bytes
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_bytes: Option<u64>,

    /// Require an allow-listed token for submissions
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_auth: Option<bool>,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_logs: Option<bool>,
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub url: String,
    pub bind_address: String,
    pub port: u16,
    pub data_dir: String,
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub uploads_dir: Option<String>,
    #[serde(default)]
    pub index_path: Option<String>,
    pub max_file_bytes: u64,
    pub require_auth: bool,
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: "http://example.com".to_string(),
            bind_address: "localhost".to_string(),
            port: 8080,
            data_dir: "./data".to_string(),
            db_path: None,
            uploads_dir: None,
            index_path: None,
            max_file_bytes: 32 * 1024 * 1024,
            require_auth: false,
            json_logs: false,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (LINKPASTE_*) < CLI args
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }

    pub fn figment(cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("LINKPASTE_"))
            .merge(Serialized::defaults(cli))
    }

    /// Defaults rooted at `data_dir`; used by tests and embedders.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Base URL without a trailing slash.
    pub fn public_url(&self) -> String {
        self.url.trim_end_matches('/').to_string()
    }

    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(p) => PathBuf::from(p),
            None => Path::new(&self.data_dir).join("linkpaste.db"),
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        match &self.uploads_dir {
            Some(p) => PathBuf::from(p),
            None => Path::new(&self.data_dir).join("uploads"),
        }
    }

    /// In-flight uploads are spooled here before they are digested.
    pub fn spool_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("tmp")
    }

    /// Log which optional settings fell back to their defaults.
    pub fn log_defaults(&self) {
        let defaults = Config::default();
        if self.url == defaults.url {
            tracing::info!("url not specified, using {}", self.url);
        }
        if self.db_path.is_none() {
            tracing::info!("db_path not specified, using {}", self.db_path().display());
        }
        if self.uploads_dir.is_none() {
            tracing::info!(
                "uploads_dir not specified, using {}",
                self.uploads_dir().display()
            );
        }
        if self.index_path.is_none() {
            tracing::info!("index_path not specified, using built-in index page");
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# linkpaste server configuration
# Place this file at ./linkpaste.toml or specify with --config <path>
# All settings can be overridden via environment variables (LINKPASTE_PORT, etc.)
# or CLI flags (--port, etc.)

# Public base URL; returned links are "<url>/<key>" (default: http://example.com)
# url = "http://example.com"

# Bind address (default: localhost)
# bind_address = "localhost"

# Server port (default: 8080)
# port = 8080

# Data directory for the SQLite database and uploads (default: ./data)
# data_dir = "./data"

# Override individual paths (default: inside data_dir)
# db_path = "./data/linkpaste.db"
# uploads_dir = "./data/uploads"

# HTML template for GET /; {{url}} and {{max_file_mib}} are substituted
# index_path = "./index.html"

# Largest accepted file upload in bytes (default: 33554432 = 32 MiB)
# max_file_bytes = 33554432

# Require an allow-listed token to submit (default: false)
# Create tokens with: linkpaste-server --add-token "<comment>"
# require_auth = false

# Enable structured JSON logging for Docker/production
# json_logs = false
"#
    .to_string()
}
