//! IoT Catalog Daemon
//!
//! Hosts one in-memory catalog (devices or services), sweeps expired
//! registrations in the background, and serves health and metrics endpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        iot-catalog                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Sweeper    │───▶│   Catalog    │◀───│   Metrics    │       │
//! │  │ (every 5s)   │    │    Store     │    │   Exporter   │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │          ▲                                      ▲               │
//! │          └────────── CancellationToken ─────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iot_catalog::adapters::SystemClock;
use iot_catalog::catalog::{DeviceStore, MetricsSnapshot, ServiceStore, Sweeper};
use iot_catalog::config::{CatalogConfig, CatalogKind};
use iot_catalog::domain::{CatalogStorage, Clock, Device, ResourceStorage, Service};

// =============================================================================
// CLI Arguments
// =============================================================================

/// IoT Catalog - in-memory device and service registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(long, env = "CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog flavor: device or service
    #[arg(long, env = "CATALOG_KIND")]
    kind: Option<CatalogKind>,

    /// Largest page a listing returns
    #[arg(long, env = "CATALOG_MAX_PER_PAGE")]
    max_per_page: Option<usize>,

    /// Seconds between expiry sweeps
    #[arg(long, env = "CATALOG_SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: Option<u64>,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: SocketAddr,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print the JSON Schema of the record types and exit
    #[arg(long)]
    print_schema: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_schema {
        return print_schema();
    }

    init_logging(&args)?;
    let config = load_config(&args)?;

    info!("Starting IoT catalog");
    info!("  Name: {}", config.name);
    info!("  Kind: {:?}", config.kind);
    info!("  Endpoint: {}", config.endpoint);
    info!("  Max per page: {}", config.max_per_page);
    info!("  Sweep interval: {}s", config.sweep_interval_secs);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let shutdown = CancellationToken::new();

    let (catalog, sweeper) = match config.kind {
        CatalogKind::Device => {
            let store = Arc::new(DeviceStore::with_config(config.store_config(), clock.clone()));
            let sweeper = Sweeper::spawn(
                store.clone(),
                clock.clone(),
                config.sweep_interval(),
                shutdown.child_token(),
            )
            .context("failed to start expiry sweeper")?;
            (Catalog::Devices(store), sweeper)
        }
        CatalogKind::Service => {
            let store = Arc::new(ServiceStore::with_config(config.store_config(), clock.clone()));
            if config.self_register {
                let registration = store
                    .add(config.self_registration())
                    .context("self-registration failed")?;
                info!(id = %registration.id, "Registered catalog in its own store");
            }
            let sweeper = Sweeper::spawn(
                store.clone(),
                clock.clone(),
                config.sweep_interval(),
                shutdown.child_token(),
            )
            .context("failed to start expiry sweeper")?;
            (Catalog::Services(store), sweeper)
        }
    };

    // Start health server
    let health_addr = args.health_addr;
    let health_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(health_addr, health_token).await {
            error!("Health server error: {:#}", e);
        }
    });

    // Start metrics server
    let exporter = Arc::new(Exporter::new(catalog).context("failed to register metrics")?);
    let metrics_addr = args.metrics_addr;
    let metrics_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_addr, exporter, metrics_token).await {
            error!("Metrics server error: {:#}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    sweeper.stop().await;

    info!("Catalog shutdown complete");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<CatalogConfig> {
    let mut config = match &args.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CatalogConfig::default(),
    };

    if let Some(kind) = args.kind {
        config.kind = kind;
    }
    if let Some(max_per_page) = args.max_per_page {
        config.max_per_page = max_per_page;
    }
    if let Some(secs) = args.sweep_interval_secs {
        config.sweep_interval_secs = secs;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_schema() -> anyhow::Result<()> {
    let schema = serde_json::json!({
        "device": schemars::schema_for!(Device),
        "service": schemars::schema_for!(Service),
        "config": schemars::schema_for!(CatalogConfig),
    });
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

// =============================================================================
// Catalog Handle
// =============================================================================

/// The store this daemon hosts
#[derive(Clone)]
enum Catalog {
    Devices(Arc<DeviceStore>),
    Services(Arc<ServiceStore>),
}

impl Catalog {
    fn snapshot(&self) -> MetricsSnapshot {
        match self {
            Catalog::Devices(store) => store.metrics().snapshot(),
            Catalog::Services(store) => store.metrics().snapshot(),
        }
    }

    fn records(&self) -> usize {
        match self {
            Catalog::Devices(store) => store.len(),
            Catalog::Services(store) => store.len(),
        }
    }

    fn resources(&self) -> usize {
        match self {
            Catalog::Devices(store) => store.resource_count(),
            Catalog::Services(_) => 0,
        }
    }
}

// =============================================================================
// HTTP Helpers
// =============================================================================

fn respond(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn serve<F, Fut>(
    name: &'static str,
    addr: SocketAddr,
    shutdown: CancellationToken,
    handler: F,
) -> anyhow::Result<()>
where
    F: Fn(Request<hyper::body::Incoming>) -> Fut + Clone + Send + 'static,
    Fut: std::future::Future<Output = Result<Response<Full<Bytes>>, std::convert::Infallible>>
        + Send
        + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {} server on {}", name, addr))?;

    info!("{} server listening on {}", name, addr);

    loop {
        let (stream, _) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("{} server stopped", name);
                return Ok(());
            }
            accepted = listener.accept() => {
                accepted.with_context(|| format!("{} server accept error", name))?
            }
        };

        let io = TokioIo::new(stream);
        let handler = handler.clone();

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handler))
                .await
            {
                error!("{} server connection error: {}", name, e);
            }
        });
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn health_handler(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match req.uri().path() {
        "/healthz" | "/livez" | "/readyz" => respond(StatusCode::OK, "ok"),
        _ => respond(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

async fn run_health_server(addr: SocketAddr, shutdown: CancellationToken) -> anyhow::Result<()> {
    serve("Health", addr, shutdown, health_handler).await
}

// =============================================================================
// Metrics Server
// =============================================================================

/// Prometheus view of the hosted catalog, refreshed on every scrape
struct Exporter {
    registry: Registry,
    operations: IntGaugeVec,
    records: IntGauge,
    resources: IntGauge,
    catalog: Catalog,
}

impl Exporter {
    fn new(catalog: Catalog) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let operations = IntGaugeVec::new(
            Opts::new("catalog_operations", "Catalog operations since start"),
            &["op"],
        )?;
        let records = IntGauge::new("catalog_records", "Records currently stored")?;
        let resources = IntGauge::new("catalog_resources", "Resources currently stored")?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(records.clone()))?;
        registry.register(Box::new(resources.clone()))?;

        Ok(Self {
            registry,
            operations,
            records,
            resources,
            catalog,
        })
    }

    fn render(&self) -> prometheus::Result<Vec<u8>> {
        for (op, count) in self.catalog.snapshot().operations() {
            self.operations
                .with_label_values(&[op])
                .set(i64::try_from(count).unwrap_or(i64::MAX));
        }
        self.records.set(self.catalog.records() as i64);
        self.resources.set(self.catalog.resources() as i64);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

async fn metrics_handler(
    req: Request<hyper::body::Incoming>,
    exporter: Arc<Exporter>,
) -> Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match req.uri().path() {
        "/metrics" => match exporter.render() {
            Ok(buffer) => {
                let mut response = respond(StatusCode::OK, buffer);
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                respond(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable")
            }
        },
        _ => respond(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

async fn run_metrics_server(
    addr: SocketAddr,
    exporter: Arc<Exporter>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    serve("Metrics", addr, shutdown, move |req| {
        metrics_handler(req, exporter.clone())
    })
    .await
}
