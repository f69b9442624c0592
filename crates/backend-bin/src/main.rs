// ============================
// greenpoll-backend-bin/src/main.rs
// ============================

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use greenpoll_backend_lib::{
    config::Settings,
    notifier::{Notifier, NullNotifier, SmtpNotifier},
    routes::create_router,
    store::MemoryStore,
    AppState,
};

#[derive(Debug, Parser)]
#[command(name = "greenpoll-backend", about = "GreenPoll backend server")]
struct Args {
    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the config file
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(&path.to_string_lossy())?,
        None => Settings::load()?,
    };
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let notifier: Arc<dyn Notifier> = match &settings.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => {
            info!("no SMTP transport configured, emails will be logged");
            Arc::new(NullNotifier)
        },
    };

    let bind_addr = settings.bind_addr;
    let state = AppState::new(Arc::new(MemoryStore::new()), settings, notifier);

    // remove anything that expired while the process was down and
    // re-arm expiry timers for the tokens that remain
    state.pruner.startup_sweep().await?;

    let app = create_router(state);
    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
