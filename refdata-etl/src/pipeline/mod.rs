pub mod bonds;
pub mod funds;
pub mod issuers;

use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_core::store::LoadMode;
use refdata_core::Result;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Funds,
    Bonds,
    Issuers,
}

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::Funds, Entity::Bonds, Entity::Issuers];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Funds => "funds",
            Entity::Bonds => "bonds",
            Entity::Issuers => "issuers",
        }
    }

    pub fn parse_list(list: &str) -> std::result::Result<Vec<Entity>, String> {
        list.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "funds" => Ok(Entity::Funds),
                "bonds" => Ok(Entity::Bonds),
                "issuers" => Ok(Entity::Issuers),
                other => Err(format!("unknown entity '{}'", other)),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub entities: Vec<Entity>,
    pub truncate: bool,
    pub offline: bool,
}

impl RunOptions {
    pub fn load_mode(&self) -> LoadMode {
        if self.truncate {
            LoadMode::TruncateThenInsert
        } else {
            LoadMode::Upsert
        }
    }
}

/// Structured result of one entity pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub entity: &'static str,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub table_rows: u64,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<PipelineOutcome>,
    pub failures: Vec<(&'static str, String)>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the selected entity pipelines sequentially over one database
/// connection.
///
/// A pipeline failure has already rolled back its own transaction by
/// the time it surfaces here; it is logged with entity context and the
/// run proceeds to the next entity.
pub async fn run_all(config: &AppConfig, options: &RunOptions) -> Result<RunSummary> {
    let mut db = DatabaseManager::open(&config.database.path)?;
    let mut summary = RunSummary::default();

    for entity in &options.entities {
        let t0 = Instant::now();
        let result = match entity {
            Entity::Funds => funds::run(config, &mut db, options).await,
            Entity::Bonds => bonds::run(config, &mut db, options).await,
            Entity::Issuers => issuers::run(config, &mut db, options).await,
        };

        match result {
            Ok(outcome) => {
                info!(
                    entity = outcome.entity,
                    rows_read = outcome.rows_read,
                    rows_loaded = outcome.rows_loaded,
                    rows_skipped = outcome.rows_skipped,
                    table_rows = outcome.table_rows,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "entity load complete"
                );
                summary.outcomes.push(outcome);
            }
            Err(e) => {
                error!(entity = entity.name(), error = %e, "entity load failed; continuing with remaining entities");
                summary.failures.push((entity.name(), e.to_string()));
            }
        }
    }

    Ok(summary)
}

/// Record the download in the fetch ledger and note byte-identical
/// re-downloads. Ledger trouble is logged and swallowed; bookkeeping
/// must never fail a load.
pub(crate) fn note_fetch(db: &DatabaseManager, source_id: &str, sha256: Option<&str>) {
    let Some(sha) = sha256 else { return };
    match db.get_last_fetch(source_id) {
        Ok(Some((_, Some(previous)))) if previous == sha => {
            info!(source_id, "payload unchanged since previous fetch");
        }
        Ok(_) => {}
        Err(e) => error!(source_id, error = %e, "fetch ledger read failed"),
    }
    if let Err(e) = db.record_fetch(source_id, chrono::Utc::now().timestamp(), Some(sha)) {
        error!(source_id, error = %e, "fetch ledger write failed");
    }
}
