//! druidgate: MCP server for the Apache Druid management API with an
//! optional read-only mode.
//!
//! Startup: logging → config (file, env, CLI) → Druid client → metrics →
//! listeners. SIGINT/SIGTERM cancel one shared token; both listeners drain
//! and exit.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use druidgate_core::config::{self, Config};
use druidgate_core::engine::{DruidApi, DruidClient};
use druidgate_core::policy::{PolicyState, TransportGuard};
use druidgate_server::admin::{AdminServer, Readiness};
use druidgate_server::error::{ServerError, ServerResult};
use druidgate_server::mcp_handler::McpHandler;
use druidgate_server::metrics::DruidGateMetrics;
use druidgate_server::passthrough::PassthroughState;
use druidgate_server::router::build_router;
use druidgate_server::tools::catalog_json;

/// Interval between startup health checks while Druid is unreachable.
const ENGINE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, env = "DRUIDGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Force read-only mode regardless of configuration
    #[arg(long)]
    read_only: bool,

    /// Druid router URL
    #[arg(long)]
    druid_url: Option<String>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    admin_port: Option<u16>,

    /// Report ready without waiting for a successful Druid health check
    #[arg(long)]
    skip_engine_check: bool,

    /// Print the tool catalog as JSON (filtered when read-only) and exit
    #[arg(long)]
    list_tools: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if self.read_only {
            config.read_only.enabled = true;
        }
        if let Some(url) = &self.druid_url {
            config.druid.url = url.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(admin_port) = self.admin_port {
            config.server.admin_port = admin_port;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // The guard flushes buffered log lines on drop; keep it for the whole run.
    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let init = tracing_subscriber::fmt()
        .json()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()));

    let result = match init {
        Ok(()) => run(Cli::parse()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "druidgate exited with an error");
            eprintln!("druidgate: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let (mut config, source) = config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config::validate(&config)?;

    let policy = config.policy_state();
    if cli.list_tools {
        return print_catalog(policy);
    }

    info!(
        config_file = ?source,
        druid_url = %config.druid.url,
        read_only = policy.is_enabled(),
        "Configuration loaded"
    );
    if policy.is_enabled() {
        info!("Read-only mode enabled: mutating tools are hidden and blocked");
    }

    let mut registry = Registry::default();
    let metrics = Arc::new(DruidGateMetrics::new(&mut registry));
    let registry = Arc::new(registry);

    let guard = TransportGuard::new(policy);
    let client =
        DruidClient::new(config.druid.engine_config(), guard)?.with_observer(metrics.clone());
    let client = Arc::new(client);
    let engine: Arc<dyn DruidApi> = client.clone();

    let mcp = McpHandler::new(engine.clone(), policy, config.server.tools_page_size)
        .with_metrics(metrics.clone());
    let passthrough = PassthroughState::new(engine, guard).with_metrics(metrics);
    let app = build_router(mcp, passthrough, config.server.max_body_size);

    let shutdown = CancellationToken::new();
    let readiness = Arc::new(Readiness::new(policy.is_enabled()));
    setup_signal_handlers(shutdown.clone(), readiness.clone());

    if cli.skip_engine_check {
        warn!("Skipping Druid health check");
        readiness.mark_engine_reachable();
    } else {
        tokio::spawn(wait_for_engine(client, readiness.clone(), shutdown.clone()));
    }

    let admin_addr = format!("{}:{}", config.server.bind, config.server.admin_port);
    let admin = AdminServer::new(admin_addr, readiness, registry);
    let admin_task = tokio::spawn(admin.run(shutdown.clone()));

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(addr = %addr, "MCP server listening");

    let serve_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            serve_shutdown.cancelled().await;
            info!("MCP server draining connections");
        })
        .await
        .map_err(ServerError::Serve);

    // Stop the admin server too if the main listener failed on its own.
    shutdown.cancel();
    match admin_task.await {
        Ok(Err(e)) => error!(error = %e, "Admin server failed"),
        Err(e) => error!(error = %e, "Admin server task panicked"),
        Ok(Ok(())) => {}
    }

    served?;
    info!("Shutdown complete");
    Ok(())
}

fn print_catalog(policy: PolicyState) -> ServerResult<()> {
    let rendered = serde_json::to_string_pretty(&catalog_json(policy))
        .map_err(|e| ServerError::Output(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Poll `/status/health` until it passes once or shutdown begins.
async fn wait_for_engine(
    client: Arc<DruidClient>,
    readiness: Arc<Readiness>,
    shutdown: CancellationToken,
) {
    loop {
        match client.health_check().await {
            Ok(()) => {
                info!("Druid router is reachable");
                readiness.mark_engine_reachable();
                return;
            }
            Err(e) => warn!(
                error = %e,
                retry_in_secs = ENGINE_CHECK_INTERVAL.as_secs(),
                "Druid health check failed"
            ),
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(ENGINE_CHECK_INTERVAL) => {}
        }
    }
}

/// SIGINT and SIGTERM both start a graceful shutdown.
fn setup_signal_handlers(shutdown: CancellationToken, readiness: Arc<Readiness>) {
    let shutdown_sigint = shutdown.clone();
    let readiness_sigint = readiness.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                readiness_sigint.mark_draining();
                shutdown_sigint.cancel();
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM, initiating graceful shutdown");
                    readiness.mark_draining();
                    shutdown.cancel();
                }
                Err(e) => {
                    error!(error = %e, "Failed to listen for SIGTERM");
                }
            }
        });
    }

    #[cfg(not(unix))]
    let _ = (shutdown, readiness);
}
