use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use lotto_agent::{GeneratorConfig, LlmProvider, NullProvider, NumberGenerator, OpenAiProvider};
use lotto_core::config::LottoConfig;
use lotto_draw::{DrawInfoResolver, JisuResultSource, ResultFetcher, WinAnalyzer};
use lotto_scheduler::{JobContext, JobEvent, Scheduler};
use lotto_store::LotteryStore;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod app;
mod http;

#[derive(Parser)]
#[command(name = "lotto-gateway", about = "Scheduled lottery recommendation service")]
struct Cli {
    /// Path to lotto.toml (falls back to LOTTO_CONFIG, then ~/.lotto/lotto.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lotto_gateway=info,lotto_scheduler=info,lotto_draw=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("LOTTO_CONFIG").ok());
    let config = LottoConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        LottoConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = Arc::new(LotteryStore::new(db)?);

    for seed in &config.lottery_types {
        let lottery = store.upsert_lottery_type(seed)?;
        info!(id = lottery.id, code = %lottery.code, active = lottery.is_active, "lottery type seeded");
    }

    let generator = Arc::new(NumberGenerator::new(
        build_provider(&config),
        GeneratorConfig::from(&config.ai),
    ));
    let resolver = Arc::new(DrawInfoResolver::new(store.clone(), &config.draw));
    let analyzer = Arc::new(WinAnalyzer::new(store.clone()));
    let fetcher = Arc::new(ResultFetcher::new(
        store.clone(),
        Arc::new(JisuResultSource::from_config(&config.results_api)),
        analyzer.clone(),
    ));

    let (events_tx, events_rx) = mpsc::channel::<JobEvent>(256);
    tokio::spawn(log_job_events(events_rx));

    let ctx = JobContext::new(store.clone(), resolver, generator, fetcher, analyzer)
        .with_reconcile_on_create(config.scheduler.reconcile_on_create)
        .with_events(events_tx);
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(ctx),
        &config.scheduler,
        config.draw.offset(),
    ));
    scheduler.start().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, scheduler.clone()));
    let router = app::build_router(state);

    info!("Lotto gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    info!("Lotto gateway stopped");
    Ok(())
}

/// Pick the generation backend. Without an API key every generation fails
/// with a clear error while fetching and analysis keep running.
fn build_provider(config: &LottoConfig) -> Arc<dyn LlmProvider> {
    if config.ai.api_key.is_empty() {
        warn!("ai.api_key not set; scheduled generation will fail until configured");
        return Arc::new(NullProvider);
    }
    info!(base_url = %config.ai.base_url, "using OpenAI-compatible generation backend");
    Arc::new(OpenAiProvider::from_config(&config.ai))
}

async fn log_job_events(mut rx: mpsc::Receiver<JobEvent>) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event.outcome) {
            Ok(outcome) => info!(task = %event.key, at = %event.at, %outcome, "job finished"),
            Err(e) => warn!(task = %event.key, error = %e, "unserializable job outcome"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
