mod api;
mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use igo::RouteService;
use igo_core::{BaseGraphProvider, CachedGraphProvider, HttpTrafficFeed, RefreshScheduler};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Congestion-aware routing server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    // The blocking HTTP clients are created here, outside the async runtime
    let service = Arc::new(build_service(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(service.clone(), &config));
    drop(runtime);
    drop(service);
    result
}

fn build_service(config: &ServerConfig) -> Result<RouteService, Box<dyn std::error::Error>> {
    let base = CachedGraphProvider::new(config.core.graph.clone()).load_base_graph()?;
    let feed = HttpTrafficFeed::new(&config.core.feeds)?;
    let scheduler = RefreshScheduler::new(
        Arc::new(base),
        feed,
        config.core.weighting.clone(),
        config.staleness(),
    )?;
    let snapshot = scheduler.current();
    info!(
        "Serving snapshot built at {} ({} segments, {} impassable edges)",
        snapshot.built_at(),
        snapshot.stats().segments,
        snapshot.stats().impassable_edges
    );

    Ok(RouteService::new(
        Arc::new(scheduler),
        config.geocoder()?,
        config.core.snapping.max_snap_distance,
    ))
}

async fn serve(
    service: Arc<RouteService>,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = api::router(
        service,
        config.request_timeout(),
        config.max_concurrent_requests,
    );

    let listener = TcpListener::bind(&config.listen).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
