use clap::Parser;
use dotenvy::dotenv;
use lens_analyzer::config::AppConfig;
use lens_analyzer::infrastructure::{storage, tool};
use lens_analyzer::services::worker::SessionSweeper;
use lens_analyzer::{AppState, create_app};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Directory uploads are stored in (overrides UPLOAD_DIR)
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,

    /// Path of the ExifTool binary (overrides EXIFTOOL_PATH)
    #[arg(short, long)]
    exiftool: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lens_analyzer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Lens Analyzer...");

    let mut config = AppConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.upload_dir {
        config.upload_dir = dir;
    }
    if let Some(path) = args.exiftool {
        config.exiftool_path = path;
    }

    info!(
        "🛡️  Config: Max Size={}MB, Session TTL={:?}, Tool Timeout={:?}",
        config.max_file_size / 1024 / 1024,
        config.session_ttl,
        config.tool_timeout
    );

    // Startup checks are fatal
    let metadata_tool = match tool::setup_metadata_tool(&config) {
        Ok(t) => t,
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = storage::prepare_upload_dir(&config.upload_dir).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }

    let state = AppState::new(config.clone(), metadata_tool);

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = SessionSweeper::new(state.sessions.clone(), config.session_sweep_interval, shutdown_rx);
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run().await;
    });

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri().path());
            })
            .on_response(
                |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    info!("📤 Finished in {:?} with status {}", latency, response.status());
                },
            ),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("✅ Server ready at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = sweeper_handle.await {
        error!("Session sweeper task failed: {}", e);
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
