//! # Togo Server
//!
//! Process entry point for the togo task store. It loads configuration,
//! opens the connection pool, brings the schema up to date (seeding the
//! bootstrap user into an empty directory) and holds the pool until it
//! receives Ctrl-C, then closes it.
//!
//! ## Usage
//!
//! ```bash
//! TOGO_DB_HOST=localhost TOGO_DB_PORT=5432 TOGO_DB_USERNAME=togo \
//!     TOGO_DB_PASSWORD=togo TOGO_DB_DATABASE_NAME=togo \
//!     cargo run -p togo-server
//! ```
//!
//! Set `TOGO_LOG_FORMAT=json` for JSON log lines.

use anyhow::Context;
use togo_server::config::Config;
use togo_store::db::pool::{close_pool, create_pool, get_pool_stats};
use togo_store::db::schema::ensure_schema;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Togo server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(database = %config.database_address(), "Configuration loaded");

    let pool = create_pool(&config.store, &config.pool)
        .await
        .context("failed to open database pool")?;

    let report = match ensure_schema(&pool, &config.bootstrap).await {
        Ok(report) => report,
        Err(e) => {
            close_pool(&pool).await;
            return Err(e).context("failed to prepare database schema");
        }
    };

    let stats = get_pool_stats(&pool);
    tracing::info!(
        applied_migrations = report.applied_migrations,
        total_connections = stats.total_connections,
        idle_connections = stats.idle_connections,
        "Store ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, closing pool...");

    close_pool(&pool).await;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "togo_server=debug,togo_store=info".into());

    let json = std::env::var("TOGO_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
