//! `videod`: the video catalog server.
//!
//! Usage:
//!   videod -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/videod/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth;
mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use catalog::CatalogModule;
use catalog::service::authority::{GrantAuthority, HttpAuthority};
use catalog::service::resolver::ClassificationResolver;
use vidcat_core::Module;

use auth::JwtAuthenticator;
use config::ServerConfig;

/// Video catalog server.
#[derive(Parser, Debug)]
#[command(name = "videod", about = "Video catalog server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&server_config)?;

    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = vidcat_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let kv: Arc<dyn vidcat_kv::KVStore> = Arc::new(
        vidcat_kv::RedbStore::open(&core_config.resolve_db_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let sql: Arc<dyn vidcat_sql::SQLStore> = Arc::new(
        vidcat_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let authority: Arc<dyn GrantAuthority> = Arc::new(
        HttpAuthority::new(server_config.authority.clone())
            .map_err(|e| anyhow::anyhow!("failed to build authority client: {}", e))?,
    );
    info!("Classification authority at {}", server_config.authority.base_url);

    let authenticator = Arc::new(JwtAuthenticator::new(
        &server_config.jwt.secret,
        server_config.jwt.sys_admin_role.clone(),
    ));

    let catalog_module = CatalogModule::new(
        sql,
        kv,
        authority,
        server_config.classification.expiration_days,
        authenticator,
    )?;
    info!(
        expiration_days = server_config.classification.expiration_days,
        "Catalog module initialized"
    );

    spawn_cache_eviction(
        catalog_module.resolver().clone(),
        Duration::from_secs(server_config.classification.eviction_interval_secs),
    );

    let app = routes::build_router(vec![(catalog_module.name(), catalog_module.routes())]);

    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("videod listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Periodically drop expired classification cache entries.
fn spawn_cache_eviction(resolver: Arc<ClassificationResolver>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = resolver.cache().evict_expired(chrono::Utc::now()) {
                error!(error = %e, "classification cache eviction failed");
            }
        }
    });
}
