use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_notify::config::{self, Config};
use chat_notify::jobs;
use chat_notify::service::{NotificationService, NotificationSettings};
use chat_notify::store::postgres::PgStore;
use chat_notify::store::RetentionStore;
use chat_notify::webhook::WebhookDispatcher;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "chat_notify=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Cleanup) => run_cleanup(cfg).await,
        Some(cli::Commands::Stats) => run_stats(cfg).await,
        Some(cli::Commands::Serve) | None => run_server(cfg).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn connect_service(cfg: &Config) -> anyhow::Result<(Arc<PgStore>, Arc<NotificationService>)> {
    tracing::info!("Connecting to database...");
    let store = Arc::new(PgStore::connect(&cfg.database_url).await?);

    tracing::info!("Running migrations...");
    store.migrate().await?;

    let webhook = WebhookDispatcher::spawn(cfg.webhook_urls.clone(), cfg.webhook_secret.clone());
    let service = Arc::new(NotificationService::new(
        store.clone(),
        NotificationSettings::from(cfg),
        webhook,
    ));
    Ok((store, service))
}

async fn run_server(cfg: Config) -> anyhow::Result<()> {
    let (store, service) = connect_service(&cfg).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut handles = Vec::new();

    if cfg.cleanup_enabled {
        handles.push(jobs::reaper::spawn(
            service.clone(),
            cfg.cleanup_interval,
            shutdown_rx.clone(),
        ));
        tracing::info!(
            interval_secs = cfg.cleanup_interval.as_secs(),
            "expiry reaper started"
        );
    } else {
        tracing::warn!("notification cleanup disabled by configuration");
    }

    let retention: Arc<dyn RetentionStore> = store;
    handles.push(jobs::maintenance::spawn(
        service.clone(),
        retention,
        cfg.maintenance_interval,
        shutdown_rx,
    ));
    tracing::info!(
        interval_secs = cfg.maintenance_interval.as_secs(),
        "maintenance scheduler started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, stopping background tasks");
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

/// On-demand administrative cleanup: the same primitive the reaper runs.
async fn run_cleanup(cfg: Config) -> anyhow::Result<()> {
    let (_store, service) = connect_service(&cfg).await?;
    let deleted = service.cleanup_expired().await?;
    println!("Deleted {} expired notification(s).", deleted);
    Ok(())
}

async fn run_stats(cfg: Config) -> anyhow::Result<()> {
    let (_store, service) = connect_service(&cfg).await?;
    let stats = service.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
