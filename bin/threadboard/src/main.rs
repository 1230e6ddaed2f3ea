//! # Threadboard Binary
//!
//! Assembles the board from compile-time features: one storage plugin,
//! the Argon2 hasher, and the HTTP surface from `tb-api`.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tb_api::middleware::{normalize_path, security_headers, standard_middleware};
use tb_api::{configure_routes, AppState};
use tb_auth_argon2::Argon2Hasher;
use tb_config::Settings;
use tb_core::ThreadRepo;
use tracing_subscriber::EnvFilter;

#[cfg(not(any(feature = "db-sqlite", feature = "db-memory")))]
compile_error!("enable one storage feature: db-sqlite or db-memory");

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-sqlite")]
async fn open_repo(settings: &Settings) -> anyhow::Result<Arc<dyn ThreadRepo>> {
    use secrecy::ExposeSecret;

    let repo = tb_db_sqlite::SqliteThreadRepo::connect(settings.database_url.expose_secret())
        .await
        .context("failed to open the sqlite store")?;
    Ok(Arc::new(repo))
}

#[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
async fn open_repo(_settings: &Settings) -> anyhow::Result<Arc<dyn ThreadRepo>> {
    tracing::warn!("using the in-memory store; posts will not survive a restart");
    Ok(Arc::new(tb_db_memory::MemoryThreadRepo::new()))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(settings.json_logs);
    if let Some(path) = &settings.env_file {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let repo = open_repo(&settings).await?;
    let hasher = Argon2Hasher::new().context("invalid argon2 parameters")?;
    let state = web::Data::new(AppState::new(Arc::clone(&repo), Arc::new(hasher)));

    tracing::info!(
        address = %settings.bind_address,
        port = settings.port,
        "threadboard starting"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(normalize_path())
            .wrap(security_headers())
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind((settings.bind_address.as_str(), settings.port))
    .with_context(|| format!("cannot bind {}:{}", settings.bind_address, settings.port))?
    .run()
    .await?;

    repo.close().await;
    tracing::info!("threadboard stopped");
    Ok(())
}
