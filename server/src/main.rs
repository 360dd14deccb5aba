use clap::Parser;
use tokio::net::TcpListener;

use linkpaste_server::auth::tokens;
use linkpaste_server::config::{generate_config_template, Cli, Config};
use linkpaste_server::{db, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle --generate-config: print template and exit
    if cli.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load(&cli)?;

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("linkpaste_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    // Handle --add-token: store a fresh token and exit
    if let Some(comment) = cli.add_token.as_deref() {
        let db = db::init_db(&config.db_path())?;
        let token = tokens::generate_token();
        tokens::add_token(&db, &token, Some(comment).filter(|c| !c.is_empty()))?;
        println!("{}", token);
        return Ok(());
    }

    tracing::info!("linkpaste server v{} starting", env!("CARGO_PKG_VERSION"));
    config.log_defaults();

    let app_state = state::AppState::from_config(&config)?;
    if config.require_auth {
        let count = tokens::list_tokens(&app_state.db)?.len();
        tracing::info!("Authentication required, {} token(s) on the allow-list", count);
        if count == 0 {
            tracing::warn!("No upload tokens exist yet; create one with --add-token");
        }
    }

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {} (public url {})", addr, config.public_url());

    axum::serve(listener, app).await?;

    Ok(())
}
