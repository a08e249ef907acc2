//! hits-bot binary entrypoint wiring the Telegram poller, the admin panel and SQLite.

use std::{
    fs::{self, File, OpenOptions},
    io,
    net::SocketAddr,
    path::Path,
    sync::Mutex,
};

use anyhow::Context;
use axum::Router;
use hits_bot::{
    bot,
    config::AppConfig,
    dao::Database,
    messages::Messages,
    routes,
    services::keepalive,
    state::{AppState, SharedState},
};
use teloxide::Bot;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Plain-text copy of the log, appended across restarts.
const LOG_FILE: &str = "logs/app.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    let db = Database::open(&config.database_path).context("opening database")?;
    let messages = Messages::load(&config.messages_path);
    let telegram = Bot::new(config.bot_token.clone());
    let port = config.port;

    let app_state = AppState::new(config, db, messages, telegram);

    tokio::spawn(bot::run_polling_supervisor(app_state.clone()));
    tokio::spawn(keepalive::run_keepalive(app_state.clone()));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state).layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers: stdout, plus [`LOG_FILE`] when it can be opened.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let (file_layer, file_error) = match open_log_file(Path::new(LOG_FILE)) {
        Ok(file) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    if let Some(err) = file_error {
        warn!(path = LOG_FILE, error = %err, "file logging disabled");
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
