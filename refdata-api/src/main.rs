mod handlers;
mod models;
mod queries;
mod router;
mod state;

use clap::Parser;
use refdata_core::config::AppConfig;
use rusqlite::{Connection, OpenFlags};
use state::AppState;
use tracing::info;

#[derive(Parser)]
#[command(name = "refdata-api")]
#[command(about = "JSON query API over the loaded reference-data tables")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "refdata.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    // The API never writes; open read-only so a concurrent ETL run owns
    // all mutation.
    let conn = Connection::open_with_flags(
        &config.database.path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let app = router::app_router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&config.api.bind).await?;
    info!(bind = %config.api.bind, db = %config.database.path.display(), "query API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
