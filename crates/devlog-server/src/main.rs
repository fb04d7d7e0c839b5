mod config;

use std::sync::Arc;

use tracing::{info, warn};

use devlog_api::auth::bootstrap_admin;
use devlog_api::uploads::UploadStore;
use devlog_api::{AppState, AppStateInner};
use devlog_db::Database;
use devlog_gateway::dispatcher::Dispatcher;

use crate::config::{Config, PLACEHOLDER_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devlog=debug,devlog_api=debug,devlog_gateway=debug,devlog_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.session_secret == PLACEHOLDER_SECRET {
        warn!("DEVLOG_SESSION_SECRET is unset, sessions are signed with a placeholder secret");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    match config.admin_password.as_deref() {
        Some(password) => {
            let db = db.clone();
            let username = config.admin_username.clone();
            let password = password.to_string();
            tokio::task::spawn_blocking(move || bootstrap_admin(&db, &username, &password)).await??;
        }
        None => warn!("DEVLOG_ADMIN_PASSWORD is unset, skipping admin bootstrap"),
    }

    let uploads = UploadStore::new(config.upload_dir()).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: Dispatcher::new(),
        session_secret: config.session_secret.clone(),
        uploads,
        public_dir: config.public_dir.clone(),
        public_url: config.public_url.clone(),
    });

    let app = devlog_api::router(state);

    let addr = config.addr()?;
    info!("Devlog server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
