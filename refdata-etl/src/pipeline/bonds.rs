use super::{note_fetch, PipelineOutcome, RunOptions};
use crate::extract::{self, delimited::Table, http::PayloadKind};
use crate::normalize::{coerce_date, coerce_decimal, dedupe_by_key};
use crate::report;
use chrono::Utc;
use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_core::domain::BondQuote;
use refdata_core::store::UpsertLoader;
use refdata_core::{RefDataError, Result};
use tracing::debug;

// The treasury pricing export and its older English-ish mirror.
const COL_SECURITY_TYPE: &[&str] = &["TIPO TITULO", "TIPO_TITULO", "BOND TYPE"];
const COL_MATURITY: &[&str] = &["DATA VENCIMENTO", "DT_VENCIMENTO", "MATURITY DATE"];
const COL_REFERENCE: &[&str] = &["DATA BASE", "DT_BASE", "REFERENCE DATE"];
const COL_BID_YIELD: &[&str] = &["TAXA COMPRA MANHA", "TAXA_COMPRA", "BID RATE"];
const COL_ASK_YIELD: &[&str] = &["TAXA VENDA MANHA", "TAXA_VENDA", "ASK RATE"];
const COL_BID_PRICE: &[&str] = &["PU COMPRA MANHA", "PU_COMPRA", "BID PRICE"];
const COL_ASK_PRICE: &[&str] = &["PU VENDA MANHA", "PU_VENDA", "ASK PRICE"];

/// Bond pricing pipeline: daily treasury price/yield export → canonical
/// `BondQuote`s keyed by (security code, reference date) → upsert into
/// `pricing_bond_quotes`.
pub async fn run(
    config: &AppConfig,
    db: &mut DatabaseManager,
    options: &RunOptions,
) -> Result<PipelineOutcome> {
    let payload = extract::acquire(
        "bonds",
        &config.sources.bonds,
        options.offline,
        config.etl.max_payload_bytes,
        PayloadKind::Delimited,
    )
    .await?;
    note_fetch(db, "bonds", payload.sha256.as_deref());

    let table = Table::parse(&payload.bytes, b';')?;
    let (records, rows_read, rows_skipped) = normalize(&table)?;

    let mut loader = UpsertLoader::new(db.connection(), config.etl.batch_size);
    let outcome = loader.load(&records, options.load_mode())?;

    report::bond_summary(db.connection(), config.etl.report_top_n)?;

    Ok(PipelineOutcome {
        entity: "bonds",
        rows_read,
        rows_loaded: records.len(),
        rows_skipped,
        table_rows: outcome.table_rows,
    })
}

/// The security code is the bond type plus its maturity label, the way
/// operators refer to a series ("LTN 01/01/2029"). Rows missing either
/// key part, or with an unparseable reference date, have no usable
/// natural key and are skipped; yield/price columns degrade to NULL.
fn normalize(table: &Table) -> Result<(Vec<BondQuote>, usize, usize)> {
    let type_col = table.column(COL_SECURITY_TYPE).ok_or_else(|| RefDataError::Source {
        message: format!("bond export has no security-type column (headers: {:?})", table.headers()),
    })?;
    let maturity_col = table.column(COL_MATURITY).ok_or_else(|| RefDataError::Source {
        message: "bond export has no maturity column".to_string(),
    })?;
    let reference_col = table.column(COL_REFERENCE).ok_or_else(|| RefDataError::Source {
        message: "bond export has no reference-date column".to_string(),
    })?;
    let bid_yield_col = table.column(COL_BID_YIELD);
    let ask_yield_col = table.column(COL_ASK_YIELD);
    let bid_price_col = table.column(COL_BID_PRICE);
    let ask_price_col = table.column(COL_ASK_PRICE);

    let loaded_at = Utc::now();
    let rows_read = table.rows().len();
    let mut skipped = 0usize;
    let mut records = Vec::with_capacity(rows_read);

    for (line, row) in table.rows().iter().enumerate() {
        let security_type = table.cell(row, Some(type_col));
        let maturity_label = table.cell(row, Some(maturity_col));
        let reference_date = coerce_date(table.cell(row, Some(reference_col)));

        let (Some(security_type), Some(maturity_label), Some(reference_date)) =
            (security_type, maturity_label, reference_date)
        else {
            debug!(line = line + 2, "skipping bond row without a complete natural key");
            skipped += 1;
            continue;
        };

        records.push(BondQuote {
            security_code: format!("{} {}", security_type, maturity_label),
            reference_date,
            maturity_date: coerce_date(Some(maturity_label)),
            bid_yield: coerce_decimal(table.cell(row, bid_yield_col)),
            ask_yield: coerce_decimal(table.cell(row, ask_yield_col)),
            bid_price: coerce_decimal(table.cell(row, bid_price_col)),
            ask_price: coerce_decimal(table.cell(row, ask_price_col)),
            loaded_at,
        });
    }

    let before = records.len();
    let records = dedupe_by_key(records, |r| (r.security_code.clone(), r.reference_date));
    let duplicates = before - records.len();
    if duplicates > 0 {
        debug!(duplicates, "dropped duplicate bond quote keys, first occurrence kept");
    }

    Ok((records, rows_read, skipped + duplicates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FIXTURE: &[u8] = b"Tipo Titulo;Data Vencimento;Data Base;Taxa Compra Manha;Taxa Venda Manha;PU Compra Manha;PU Venda Manha\n\
        LTN;01/01/2029;05/01/2026;11,25;11,31;734,12;733,58\n\
        Tesouro IPCA+;15/05/2035;05/01/2026;5,87;5,93;2.345,67;2.340,11\n\
        LTN;01/01/2029;05/01/2026;99,99;99,99;1,00;1,00\n\
        NTN-F;01/01/2031;data ruim;12,00;12,10;900,00;899,00\n";

    #[test]
    fn builds_composite_keys_and_skips_broken_ones() {
        let table = Table::parse(FIXTURE, b';').unwrap();
        let (records, rows_read, rows_skipped) = normalize(&table).unwrap();

        assert_eq!(rows_read, 4);
        // One duplicate key, one unparseable reference date
        assert_eq!(rows_skipped, 2);
        assert_eq!(records.len(), 2);

        let ltn = &records[0];
        assert_eq!(ltn.security_code, "LTN 01/01/2029");
        assert_eq!(ltn.reference_date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(ltn.maturity_date, NaiveDate::from_ymd_opt(2029, 1, 1));
        // First occurrence wins over the duplicate
        assert_eq!(ltn.bid_yield, Some(11.25));
        assert_eq!(ltn.bid_price, Some(734.12));

        let ipca = &records[1];
        assert_eq!(ipca.bid_price, Some(2345.67));
    }
}
