//! Doctrans Web - document translation service with versioned storage.

mod helpers;
mod identity;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use doctrans_core::{config::Tier, AppConfig};

use state::AppState;

/// Uploads above this size are rejected outright.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "doctrans-web")]
#[command(author, version, about = "Document translation service", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://doctrans.db?mode=rwc")]
    database_url: String,

    /// Passphrase for content encryption at rest
    #[arg(long, env = "DOCTRANS_ENCRYPTION_PASSPHRASE")]
    encryption_passphrase: String,

    /// Translation tier (free or premium)
    #[arg(long, env = "DOCTRANS_TIER", default_value = "free")]
    tier: String,

    /// LibreTranslate-compatible endpoint for the free tier
    #[arg(long, env = "DOCTRANS_FREE_API_BASE")]
    free_api_base: Option<String>,

    /// OpenAI-compatible endpoint for the premium tier
    #[arg(long, env = "DOCTRANS_PREMIUM_API_BASE")]
    premium_api_base: Option<String>,

    /// API key for the premium tier
    #[arg(long, env = "DOCTRANS_API_KEY")]
    api_key: Option<String>,

    /// Allow unauthenticated callers under the anonymous owner.
    ///
    /// Known looseness of the original design; keep disabled outside
    /// public demo deployments.
    #[arg(long)]
    allow_anonymous: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load();
    config.storage.database_url = args.database_url.clone();
    config.storage.encryption_passphrase = args.encryption_passphrase.clone();
    config.translator.tier = match args.tier.as_str() {
        "free" => Tier::Free,
        "premium" => Tier::Premium,
        other => anyhow::bail!("unknown tier {other:?}, expected \"free\" or \"premium\""),
    };
    if let Some(base) = &args.free_api_base {
        config.translator.free_api_base = base.clone();
    }
    if let Some(base) = &args.premium_api_base {
        config.translator.premium_api_base = base.clone();
    }
    if args.api_key.is_some() {
        config.translator.api_key = args.api_key.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "doctrans_web=info,doctrans_core=info",
        1 => "doctrans_web=debug,doctrans_core=debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(fmt::layer())
        .init();

    let config = build_config(&args)?;
    let pipeline = doctrans_core::assemble_pipeline(&config)
        .await
        .context("failed to assemble pipeline")?;

    if args.allow_anonymous {
        tracing::warn!("anonymous uploads enabled; all unauthenticated work is owned by \"anonymous\"");
    }

    let state = Arc::new(AppState::new(Arc::new(pipeline), args.allow_anonymous));

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/documents/translate", post(routes::translate::translate_document))
        .route("/documents/edit/{document_id}", post(routes::edit::edit_document))
        .route("/documents/download/{version_id}", get(routes::download::download_version))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid host/port")?;
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
