//! Demo host for the push registry.
//!
//! Loads configuration from the environment (and `.env`), installs JSON
//! logging, then runs a push cycle on every timer tick. The rendered payload is
//! written to stdout, standing in for the HTTP transport that would deliver it
//! to a pushgateway.
//!
//! # Startup Sequence
//!
//! 1. Load `.env` and read registry and push settings
//! 2. Configure structured logging
//! 3. Build the registry and the init/update callbacks
//! 4. Tick until Ctrl+C or SIGTERM

use std::io::Write;
use std::time::Instant;

use dotenvy::dotenv;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry as Subscriber,
};

use push_registry::{
    Counter, Gauge, Histogram, PushCycle, PushSettings, Registry, RegistryConfig,
};

/// Metrics the demo declares on every cycle.
struct DemoMetrics {
    cycles: Counter,
    uptime: Gauge,
    work: Histogram,
    started: Instant,
}

fn init_metrics(registry: &Registry, started: Instant) -> push_registry::Result<DemoMetrics> {
    Ok(DemoMetrics {
        cycles: registry.register_counter(
            "push_cycles_total",
            Some("Completed push cycles"),
            &[],
        )?,
        uptime: registry.register_gauge(
            "process_uptime_seconds",
            Some("Seconds since start"),
            &[],
        )?,
        work: registry.register_histogram(
            "demo_work_duration_seconds",
            Some("Duration of simulated work per phase"),
            &["phase"],
            None,
        )?,
        started,
    })
}

fn update_metrics(metrics: &mut DemoMetrics) {
    metrics.cycles.inc(&[]);
    let uptime = metrics.started.elapsed().as_secs_f64();
    metrics.uptime.set(uptime, &[]);
    // Deterministic pseudo-latencies so the histogram spreads across buckets.
    metrics.work.observe((uptime % 1.0) * 0.2, &["fetch"]);
    metrics.work.observe((uptime % 3.0) * 1.5, &["store"]);
}

/// Sets up structured JSON logging on a non-blocking stderr writer, keeping
/// stdout free for payloads.
///
/// The returned guard must stay alive for buffered events to be flushed.
fn setup_logging() -> WorkerGuard {
    let (writer, guard) = non_blocking(std::io::stderr());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .json()
        .with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Subscriber::default().with(filter).with(fmt_layer).init();
    guard
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let _guard = setup_logging();

    let config = RegistryConfig::from_env();
    let settings = PushSettings::from_env();
    info!(
        service = "push-registry",
        version = env!("CARGO_PKG_VERSION"),
        job = %settings.job,
        interval_secs = settings.interval.as_secs(),
        "Push loop initialization: configuration loaded"
    );

    let registry = Registry::with_config(config)?;
    let started = Instant::now();
    let mut cycle = PushCycle::new(
        registry.clone(),
        move |r: &Registry| match init_metrics(r, started) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                error!(error = %e, "Metric declaration failed");
                None
            }
        },
        |state: &mut Option<DemoMetrics>| {
            if let Some(metrics) = state {
                update_metrics(metrics);
            }
        },
    );

    let mut ticker = tokio::time::interval(settings.interval);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = cycle.run_once();
                push_payload(&settings.job, &payload)?;
                if tracing::enabled!(tracing::Level::DEBUG) {
                    let snapshot = serde_json::to_string(&registry.snapshot())?;
                    debug!(snapshot = %snapshot, "Registry snapshot");
                }
            }
            _ = &mut shutdown => {
                info!(cycles = cycle.cycles(), "Push loop shutdown: complete");
                break;
            }
        }
    }

    Ok(())
}

/// Stands in for the push transport: writes the payload to stdout.
fn push_payload(job: &str, payload: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "# job={}", job)?;
    stdout.write_all(payload.as_bytes())?;
    stdout.flush()?;
    info!(job = %job, bytes = payload.len(), "Payload pushed");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
