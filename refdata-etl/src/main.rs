use clap::{Parser, Subcommand};
use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_etl::pipeline::{run_all, Entity, RunOptions};
use refdata_etl::{logging, report};
use tracing::info;

#[derive(Parser)]
#[command(name = "refdata-etl")]
#[command(about = "Loads market reference data from registry and pricing sources")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "refdata.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load pipelines for the selected entities
    Run {
        /// Comma-separated entities (funds,bonds,issuers); default all
        #[arg(long)]
        entities: Option<String>,
        /// Truncate each target table before inserting (full reload)
        #[arg(long)]
        truncate: bool,
        /// Skip downloads and use the configured local files
        #[arg(long)]
        offline: bool,
    },
    /// Print post-load aggregates for the loaded tables
    Report,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run { entities, truncate, offline } => {
            let entities = match entities {
                Some(list) => Entity::parse_list(&list).map_err(|e| anyhow::anyhow!(e))?,
                None => Entity::ALL.to_vec(),
            };
            let options = RunOptions { entities, truncate, offline };

            let summary = run_all(&config, &options).await?;
            for outcome in &summary.outcomes {
                info!(
                    entity = outcome.entity,
                    rows_loaded = outcome.rows_loaded,
                    table_rows = outcome.table_rows,
                    "loaded"
                );
            }
            if !summary.all_succeeded() {
                let failed: Vec<&str> = summary.failures.iter().map(|(e, _)| *e).collect();
                anyhow::bail!("load failed for entities: {}", failed.join(", "));
            }
        }
        Commands::Report => {
            let mut db = DatabaseManager::open(&config.database.path)?;
            let conn = db.connection();
            report::fund_summary(conn, config.etl.report_top_n)?;
            report::bond_summary(conn, config.etl.report_top_n)?;
            report::issuer_summary(conn, config.etl.report_top_n)?;
        }
    }

    Ok(())
}
