// src/main.rs

use axum::routing::post;
use axum::{serve, Router};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

mod api;
mod bidding;
mod budget;
mod config;
mod errors;
mod logging;
mod mock_banker;
mod model;
mod openrtb;

use bidding::strategy::{self, BidStrategy};
use budget::pacer::BudgetPacer;
use config::config_manager::{AgentConfig, ConfigAdapter, FileConfigAdapter};
use logging::runtime_logger::RuntimeLogger;
use model::creative::CreativeCatalog;
use model::pacer::PacerState;

/// Shared per-process state, built once at startup. The only mutable
/// part is the pacer throttle, and that only through its atomic swap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub strategy: Arc<dyn BidStrategy>,
    pub pacer_state: Arc<PacerState>,
    pub bid_logger: Arc<RuntimeLogger>,
}

#[derive(Parser, Debug)]
#[command(version = "1.0", about = "An OpenRTB fixed-price bid agent")]
struct CliArgs {
    #[arg(short, long, default_value_t = 7654)]
    port: u16,
    #[arg(long, default_value = "static/http_config.json")]
    config: String,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// Run an in-process mock banker for local testing.
    #[arg(long, default_value_t = false)]
    mock_banker: bool,
    #[arg(long, default_value_t = 9985)]
    mock_banker_port: u16,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // Global tracing setup: JSON lines into an hourly-rolling file.
    let log_file = rolling::hourly(&args.log_dir, "bidagent_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set global tracing subscriber");
    info!("Bid agent starting on port {}", args.port);

    // Configuration errors abort here: better no bidder than a broken one.
    let adapter = FileConfigAdapter::new(&args.config);
    let config = adapter.load().expect("Unable to load agent configuration");
    let catalog = Arc::new(
        CreativeCatalog::new(config.creatives.clone())
            .expect("Unable to build creative catalog"),
    );

    let bid_logger = RuntimeLogger::new(&args.log_dir, "agent", 1000, 100, 1000);
    bid_logger.log("INFO", "Bid agent is starting...").await;

    let pacer_state = Arc::new(PacerState::new(&config.account, config.budget_per_period));
    let bid_strategy = strategy::from_config(&config, catalog);

    let state = Arc::new(AppState {
        config: Arc::new(config),
        strategy: bid_strategy,
        pacer_state: pacer_state.clone(),
        bid_logger: bid_logger.clone(),
    });

    if args.mock_banker {
        let port = args.mock_banker_port;
        tokio::spawn(async move {
            mock_banker::start_mock_banker_server(port).await;
        });
    }

    // Budget pacer runs off the request path; its first report fires
    // immediately, then once per configured period.
    let pacer = BudgetPacer::new(&state.config, pacer_state, bid_logger.clone());
    tokio::spawn(pacer.run());

    let bid_server = tokio::spawn({
        let state = state.clone();
        let port = args.port;
        let bid_logger = bid_logger.clone();
        async move {
            let app = Router::new()
                .route(
                    "/",
                    post(api::handlers::handle_bid_request)
                        .get(api::handlers::handle_bid_request),
                )
                .with_state(state);
            let addr = format!("0.0.0.0:{}", port);
            bid_logger
                .log("INFO", &format!("Bid agent listening at http://{}", addr))
                .await;
            let listener = TcpListener::bind(&addr).await.unwrap();
            serve(listener, app).await.unwrap();
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down gracefully...");
            bid_logger.log("INFO", "Bid agent shutting down.").await;
        }
        result = bid_server => {
            result.expect("Bid server task failed");
        }
    }

    bid_logger.shutdown().await;
}
