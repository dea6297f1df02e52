mod cli;
mod collector;
mod config;
mod db;
mod documents;
mod errors;
mod interview;
mod llm_client;
mod matching;
mod models;
mod offers;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::ServeArgs;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::offers::repository::OfferRepository;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = start().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn start() -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run(config).await
}

pub(crate) async fn serve(config: Config, args: ServeArgs) -> Result<()> {
    info!("Starting skillfit API v{}", env!("CARGO_PKG_VERSION"));

    let offers = OfferRepository::open(&config.database_url).await?;
    info!("Offer database ready");

    if config.llm.api_key.is_none() {
        info!("No LLM API key configured, uploads will be refused");
    }
    let llm = LlmClient::new(&config.llm)?.with_model(&config.llm.extraction_model);
    info!("LLM client initialized (model: {})", llm.model());

    let port = args.port.unwrap_or(config.port);
    let state = AppState {
        offers,
        llm: Arc::new(llm),
        config,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
