use super::{note_fetch, PipelineOutcome, RunOptions};
use crate::extract::{self, delimited::Table, http::PayloadKind};
use crate::normalize::{clean_tax_id, coerce_date, coerce_decimal, coerce_flag, coerce_integer, dedupe_by_key};
use crate::report;
use chrono::Utc;
use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_core::domain::FundRecord;
use refdata_core::store::UpsertLoader;
use refdata_core::{RefDataError, Result};
use tracing::{debug, warn};

// Header aliases across registry export vintages. The regulator renamed
// several columns when the export moved portals; both generations appear
// in archived files.
const COL_CNPJ: &[&str] = &["CNPJ_FUNDO", "CNPJ", "CD_CNPJ"];
const COL_NAME: &[&str] = &["DENOM_SOCIAL", "RAZAO_SOCIAL", "NM_FUNDO"];
const COL_CLASS: &[&str] = &["CLASSE", "CLASSE_FUNDO"];
const COL_REGISTERED: &[&str] = &["DT_REG", "DT_REGISTRO"];
const COL_STATUS: &[&str] = &["SIT", "SITUACAO"];
const COL_NAV: &[&str] = &["VL_PATRIM_LIQ", "PATRIM_LIQ"];
const COL_QUOTA_HOLDERS: &[&str] = &["NR_COTST", "QT_COTST"];
const COL_EXCLUSIVE: &[&str] = &["FUNDO_EXCLUSIVO", "EXCLUSIVO"];

/// Fund registry pipeline: semicolon-delimited registry export →
/// canonical `FundRecord`s → upsert into `registry_funds`.
pub async fn run(
    config: &AppConfig,
    db: &mut DatabaseManager,
    options: &RunOptions,
) -> Result<PipelineOutcome> {
    let payload = extract::acquire(
        "funds",
        &config.sources.funds,
        options.offline,
        config.etl.max_payload_bytes,
        PayloadKind::Delimited,
    )
    .await?;
    note_fetch(db, "funds", payload.sha256.as_deref());

    let table = Table::parse(&payload.bytes, b';')?;
    let (records, rows_read, rows_skipped) = normalize(&table)?;

    let mut loader = UpsertLoader::new(db.connection(), config.etl.batch_size);
    let outcome = loader.load(&records, options.load_mode())?;

    report::fund_summary(db.connection(), config.etl.report_top_n)?;

    Ok(PipelineOutcome {
        entity: "funds",
        rows_read,
        rows_loaded: records.len(),
        rows_skipped,
        table_rows: outcome.table_rows,
    })
}

/// Map source columns to the canonical schema and drop rows without a
/// usable natural key. Coercion failures on attribute columns become
/// NULLs; only a missing/empty tax ID disqualifies a row.
fn normalize(table: &Table) -> Result<(Vec<FundRecord>, usize, usize)> {
    let cnpj_col = table.column(COL_CNPJ).ok_or_else(|| RefDataError::Source {
        message: format!("fund export has no tax-ID column (headers: {:?})", table.headers()),
    })?;
    let name_col = table.column(COL_NAME).ok_or_else(|| RefDataError::Source {
        message: "fund export has no corporate-name column".to_string(),
    })?;
    let class_col = table.column(COL_CLASS);
    let registered_col = table.column(COL_REGISTERED);
    let status_col = table.column(COL_STATUS);
    let nav_col = table.column(COL_NAV);
    let quota_col = table.column(COL_QUOTA_HOLDERS);
    let exclusive_col = table.column(COL_EXCLUSIVE);

    let loaded_at = Utc::now();
    let rows_read = table.rows().len();
    let mut skipped = 0usize;
    let mut records = Vec::with_capacity(rows_read);

    for (line, row) in table.rows().iter().enumerate() {
        let Some(cnpj) = clean_tax_id(table.cell(row, Some(cnpj_col))) else {
            debug!(line = line + 2, "skipping fund row without tax ID");
            skipped += 1;
            continue;
        };
        let corporate_name = match table.cell(row, Some(name_col)) {
            Some(name) => name.to_string(),
            None => {
                warn!(line = line + 2, cnpj, "skipping fund row without corporate name");
                skipped += 1;
                continue;
            }
        };

        records.push(FundRecord {
            cnpj,
            corporate_name,
            fund_class: table.cell(row, class_col).map(str::to_string),
            registered_on: coerce_date(table.cell(row, registered_col)),
            status: table.cell(row, status_col).map(str::to_string),
            net_asset_value: coerce_decimal(table.cell(row, nav_col)),
            quota_holders: coerce_integer(table.cell(row, quota_col)),
            exclusive_fund: coerce_flag(table.cell(row, exclusive_col)),
            loaded_at,
        });
    }

    let before = records.len();
    let records = dedupe_by_key(records, |r| r.cnpj.clone());
    let duplicates = before - records.len();
    if duplicates > 0 {
        debug!(duplicates, "dropped duplicate fund keys, first occurrence kept");
    }

    Ok((records, rows_read, skipped + duplicates))
}
