use super::{note_fetch, PipelineOutcome, RunOptions};
use crate::extract::{self, http::PayloadKind, json};
use crate::normalize::{clean_tax_id, dedupe_by_key};
use crate::report;
use chrono::Utc;
use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_core::domain::IssuerRecord;
use refdata_core::store::UpsertLoader;
use refdata_core::Result;
use serde_json::Value;
use tracing::debug;

/// Issuer registry pipeline: JSON snapshot of regulatory filings →
/// canonical `IssuerRecord`s → upsert into `registry_issuers`.
pub async fn run(
    config: &AppConfig,
    db: &mut DatabaseManager,
    options: &RunOptions,
) -> Result<PipelineOutcome> {
    let payload = extract::acquire(
        "issuers",
        &config.sources.issuers,
        options.offline,
        config.etl.max_payload_bytes,
        PayloadKind::Json,
    )
    .await?;
    note_fetch(db, "issuers", payload.sha256.as_deref());

    let items = json::records(&payload.bytes)?;
    let (records, rows_read, rows_skipped) = normalize(&items);

    let mut loader = UpsertLoader::new(db.connection(), config.etl.batch_size);
    let outcome = loader.load(&records, options.load_mode())?;

    report::issuer_summary(db.connection(), config.etl.report_top_n)?;

    Ok(PipelineOutcome {
        entity: "issuers",
        rows_read,
        rows_loaded: records.len(),
        rows_skipped,
        table_rows: outcome.table_rows,
    })
}

/// Field names vary between snapshot generations (Portuguese column
/// names in the older dumps, English in the portal rewrite).
fn normalize(items: &[Value]) -> (Vec<IssuerRecord>, usize, usize) {
    let loaded_at = Utc::now();
    let rows_read = items.len();
    let mut skipped = 0usize;
    let mut records = Vec::with_capacity(rows_read);

    for (idx, item) in items.iter().enumerate() {
        let Some(cnpj) = clean_tax_id(json::str_field(item, &["cnpj", "cd_cnpj", "tax_id"])) else {
            debug!(index = idx, "skipping issuer record without tax ID");
            skipped += 1;
            continue;
        };
        let Some(name) = json::str_field(item, &["razao_social", "denom_social", "name"]) else {
            debug!(index = idx, cnpj, "skipping issuer record without name");
            skipped += 1;
            continue;
        };

        records.push(IssuerRecord {
            cnpj,
            name: name.to_string(),
            category: json::str_field(item, &["categoria", "category"]).map(str::to_string),
            registration_status: json::str_field(item, &["situacao_registro", "situacao", "status"])
                .map(str::to_string),
            municipality: json::str_field(item, &["municipio", "municipality"]).map(str::to_string),
            state: json::str_field(item, &["uf", "estado", "state"]).map(str::to_string),
            loaded_at,
        });
    }

    let before = records.len();
    let records = dedupe_by_key(records, |r| r.cnpj.clone());
    let duplicates = before - records.len();
    if duplicates > 0 {
        debug!(duplicates, "dropped duplicate issuer keys, first occurrence kept");
    }

    (records, rows_read, skipped + duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_both_field_name_generations() {
        let items = vec![
            json!({
                "cnpj": "11.222.333/0001-44",
                "razao_social": "EMISSORA ALFA S.A.",
                "categoria": "Cia Aberta",
                "situacao_registro": "ATIVO",
                "municipio": "SAO PAULO",
                "uf": "SP"
            }),
            json!({
                "tax_id": "99888777000166",
                "name": "BETA HOLDINGS",
                "category": "Incentivada",
                "state": "RJ"
            }),
            json!({"razao_social": "SEM CNPJ LTDA"}),
            json!({"cnpj": "11222333000144", "razao_social": "DUPLICATA"}),
        ];

        let (records, rows_read, rows_skipped) = normalize(&items);
        assert_eq!(rows_read, 4);
        assert_eq!(rows_skipped, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cnpj, "11222333000144");
        assert_eq!(records[0].name, "EMISSORA ALFA S.A.");
        assert_eq!(records[1].state.as_deref(), Some("RJ"));
        assert_eq!(records[1].registration_status, None);
    }
}
