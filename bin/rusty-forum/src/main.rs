//! # Rusty-Forum Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use configs::{LogFormat, LogSettings, Settings};
use rf_api::AppState;
use rf_core::service::{ForumService, Ports};
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Feature-gated imports: each port is satisfied by whichever plugin is compiled in
#[cfg(feature = "db-sqlite")]
use rf_db_sqlite::SqliteForumRepo;

#[cfg(feature = "auth-simple")]
use rf_auth_simple::SimpleAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "auth-simple")))]
compile_error!("rusty-forum needs a storage plugin (db-sqlite) and an auth plugin (auth-simple)");

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);
    info!(
        max_depth = settings.forum.max_depth,
        prohibited_words = ?settings.forum.prohibited_words,
        "configuration loaded"
    );

    // 1. Initialize Database Implementation
    let repo = Arc::new(
        SqliteForumRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("opening database")?,
    );

    // 2. Initialize Auth Implementation
    let auth = Arc::new(SimpleAuthProvider::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_hours,
    ));

    // 3. Assemble the service (dynamic dispatch over every port)
    let service = ForumService::new(Ports::from_backend(repo, auth), settings.forum.clone());

    if let Some((username, password)) = settings.bootstrap.admin() {
        service
            .ensure_admin(username, password.expose_secret())
            .await
            .context("creating bootstrap admin")?;
    }

    let app = rf_api::router(AppState::new(service));
    let addr = settings.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "rusty-forum listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("rusty-forum stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
