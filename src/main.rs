//! BSC Swap Sentinel CLI: process entry point, lifecycle driver.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, address};
use alloy::sol_types::SolEvent;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bsc_swap_sentinel::abi::{fourmeme, pancake_v2};
use bsc_swap_sentinel::cache::MemoryCache;
use bsc_swap_sentinel::config::{MonitorConfigHandle, Settings};
use bsc_swap_sentinel::dispatch::retry_queue::retry_sweep;
use bsc_swap_sentinel::dispatch::{DispatchPool, InMemoryRetryQueueStore};
use bsc_swap_sentinel::http_apis::{HttpLaunchpadClassifier, HttpNotifier, HttpSpotPriceApi, HttpStatsApi};
use bsc_swap_sentinel::observability::{self, LivenessState};
use bsc_swap_sentinel::pipeline::EventPipeline;
use bsc_swap_sentinel::ports::{Cache, SpotPriceApi, SystemClock};
use bsc_swap_sentinel::resolve::MetadataResolver;
use bsc_swap_sentinel::rpc::JsonRpcClient;
use bsc_swap_sentinel::store::InMemoryKvStore;
use bsc_swap_sentinel::subscribe::{SubscriptionManager, TopicGroup};

/// Quote assets recognized when resolving a pair's traded side: WBNB and the
/// major BSC stablecoins.
const WBNB: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
const BUSD: Address = address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56");
const USDT: Address = address!("55d398326f99059fF775485246999027B3197955");
const USDC: Address = address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");

/// Attempts at a live WBNB spot price before giving up at startup and
/// exiting with the fatal-dependency-unreachable exit code.
const STARTUP_PRICE_ATTEMPTS: u32 = 5;

#[derive(Parser, Debug)]
#[command(name = "bsc-swap-sentinel", about = "BSC swap-event alert engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Configuration environment (`config/{environment}.toml` overrides `config/default.toml`).
    #[arg(short, long, default_value = "production", global = true)]
    environment: String,
    /// Force debug-level logging regardless of `logging.level`.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine: subscribe, filter, dispatch, serve `/metrics` and `/healthz`.
    Run,
    /// Load and validate configuration, then exit without connecting to anything.
    CheckConfig,
    /// Print the crate version.
    Version,
}

/// Install the global tracing subscriber. When `logging.file_path` is set,
/// logs go to a non-blocking file writer instead of stdout; the returned
/// guard must be kept alive for the process lifetime or buffered lines are
/// dropped on exit.
fn init_tracing(settings: &Settings, verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = if verbose { "debug" } else { settings.logging.level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = settings.logging.format == "json";

    if let Some(path) = &settings.logging.file_path {
        let directory = std::path::Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
        let file_name = std::path::Path::new(path).file_name().map_or_else(|| "bsc-swap-sentinel.log".to_string(), |n| n.to_string_lossy().into_owned());
        let file_appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer);
        if json {
            subscriber.json().init();
        } else {
            subscriber.init();
        }
        Some(guard)
    } else {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        if json {
            subscriber.json().init();
        } else {
            subscriber.init();
        }
        None
    }
}

fn main() -> ExitCode {
    // tokio-tungstenite's rustls-tls-webpki-roots backend needs a
    // process-level crypto provider installed before the first `wss://`
    // connect; rustls 0.23 no longer picks one automatically.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("failed to install rustls crypto provider");
        return ExitCode::from(2);
    }

    let cli = Cli::parse();

    let settings = match Settings::load(&cli.environment) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::from(1);
        }
    };
    if let Err(errors) = settings.validate() {
        for error in &errors {
            eprintln!("invalid configuration: {error}");
        }
        return ExitCode::from(1);
    }

    match cli.command {
        Commands::Version => {
            println!("bsc-swap-sentinel {}", bsc_swap_sentinel::VERSION);
            ExitCode::SUCCESS
        }
        Commands::CheckConfig => {
            let _guard = init_tracing(&settings, cli.verbose);
            info!("configuration valid");
            ExitCode::SUCCESS
        }
        Commands::Run => {
            let _guard = init_tracing(&settings, cli.verbose);
            match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime.block_on(run(settings)),
                Err(e) => {
                    eprintln!("failed to start async runtime: {e}");
                    ExitCode::from(2)
                }
            }
        }
    }
}

async fn run(settings: Settings) -> ExitCode {
    let Ok(handle) = observability::install_recorder() else {
        error!("prometheus recorder already installed");
        return ExitCode::from(2);
    };

    let kv = Arc::new(InMemoryKvStore::new());
    let cache = Arc::new(MemoryCache::new());

    let rpc = match JsonRpcClient::new(settings.rpc.url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "failed to build rpc client");
            return ExitCode::from(2);
        }
    };
    let stats_api = match HttpStatsApi::new(settings.external_apis.stats_base_url.clone(), settings.external_apis.timeout()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, "failed to build stats api client");
            return ExitCode::from(2);
        }
    };
    let classifier = match HttpLaunchpadClassifier::new(settings.external_apis.classifier_base_url.clone(), settings.external_apis.timeout()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, "failed to build launchpad classifier client");
            return ExitCode::from(2);
        }
    };
    let spot_price_api = match HttpSpotPriceApi::new(settings.external_apis.spot_price_base_url.clone(), settings.external_apis.timeout()) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build spot price client");
            return ExitCode::from(2);
        }
    };
    let notifier = match HttpNotifier::new(settings.external_apis.notifier_base_url.clone(), settings.external_apis.timeout()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!(error = %e, "failed to build notifier client");
            return ExitCode::from(2);
        }
    };

    if !prime_wbnb_price(&spot_price_api, cache.as_ref(), settings.wbnb_price.allow_fallback).await {
        error!("no live wbnb spot price and wbnb_price.allow_fallback is false");
        return ExitCode::from(2);
    }

    let config_handle = match MonitorConfigHandle::load(kv.as_ref()).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to load monitor config from kv store");
            return ExitCode::from(1);
        }
    };

    let retry_queue = Arc::new(InMemoryRetryQueueStore::new());
    let dispatch_pool = Arc::new(DispatchPool::new(settings.dispatch.worker_count));
    let resolver = MetadataResolver::new(cache.clone(), rpc.clone(), classifier, kv.clone(), vec![WBNB, BUSD, USDT, USDC]);
    let clock = Arc::new(SystemClock::new());

    let pipeline = Arc::new(EventPipeline::new(
        resolver,
        cache,
        rpc,
        kv,
        stats_api,
        notifier.clone(),
        retry_queue.clone(),
        clock,
        dispatch_pool,
        config_handle,
        vec![BUSD, USDT, USDC],
        WBNB,
    ));

    let shutdown = CancellationToken::new();
    let liveness = LivenessState::new();

    let topic_groups = vec![
        TopicGroup { label: "pancake_v2".into(), addresses: vec![], topics: vec![pancake_v2::Swap::SIGNATURE_HASH] },
        TopicGroup {
            label: "fourmeme".into(),
            addresses: vec![],
            topics: vec![
                fourmeme::TokenPurchase::SIGNATURE_HASH,
                fourmeme::TokenSale::SIGNATURE_HASH,
                fourmeme::TokenGraduated::SIGNATURE_HASH,
            ],
        },
    ];

    let (tx, mut rx) = mpsc::channel(1_024);
    let manager = Arc::new(SubscriptionManager::new(settings.ws.url.clone(), topic_groups, tx));

    let ws_task = tokio::spawn({
        let manager = manager.clone();
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = manager.run(shutdown).await {
                error!(error = %e, "subscription manager exited with error");
            }
        }
    });

    let liveness_task = tokio::spawn({
        let manager = manager.clone();
        let liveness = liveness.clone();
        let shutdown = shutdown.clone();
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        liveness.set_connected(manager.active_subscription_count() > 0);
                    }
                }
            }
        }
    });

    let consumer_task = tokio::spawn({
        let pipeline = pipeline.clone();
        let liveness = liveness.clone();
        async move {
            while let Some(log) = rx.recv().await {
                liveness.record_message(chrono::Utc::now().timestamp());
                if let Err(e) = pipeline.process(log).await {
                    warn!(error = %e, "event processing failed");
                }
            }
        }
    });

    let retry_task = tokio::spawn({
        let retry_queue = retry_queue.clone();
        let notifier = notifier.clone();
        let shutdown = shutdown.clone();
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        if let Err(e) = retry_sweep(notifier.as_ref(), retry_queue.as_ref()).await {
                            warn!(error = %e, "retry sweep failed");
                        }
                    }
                }
            }
        }
    });

    let metrics_app = observability::metrics_router(handle).merge(observability::healthz_router(liveness));
    let listener = match tokio::net::TcpListener::bind(settings.metrics.socket_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %settings.metrics.socket_addr(), "failed to bind metrics listener");
            shutdown.cancel();
            return ExitCode::from(2);
        }
    };
    let metrics_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let serve = axum::serve(listener, metrics_app).with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "metrics server exited with error");
            }
        }
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();

    let drain = async {
        let _ = ws_task.await;
        let _ = consumer_task.await;
        let _ = liveness_task.await;
        let _ = retry_task.await;
        let _ = metrics_task.await;
    };
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
        warn!("graceful shutdown timed out after 30s, exiting anyway");
    }

    info!("shutdown complete");
    ExitCode::SUCCESS
}

/// Fetch a live WBNB/USD price before admitting any traffic. Retries with a
/// short fixed delay; past [`STARTUP_PRICE_ATTEMPTS`] failures, continues on
/// the fallback price only when `allow_fallback` permits it.
async fn prime_wbnb_price<S: SpotPriceApi, C: Cache>(spot_price_api: &S, cache: &C, allow_fallback: bool) -> bool {
    for attempt in 1..=STARTUP_PRICE_ATTEMPTS {
        match spot_price_api.wbnb_usd_price().await {
            Ok(price) => {
                cache.set_wbnb_price(price);
                info!(price, "fetched live wbnb spot price");
                return true;
            }
            Err(e) => {
                warn!(attempt, error = %e, "wbnb spot price fetch failed");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
    if allow_fallback {
        warn!("proceeding with fallback wbnb price after exhausting live-price attempts");
        true
    } else {
        false
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
