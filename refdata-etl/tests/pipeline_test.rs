use refdata_core::config::AppConfig;
use refdata_core::db::DatabaseManager;
use refdata_etl::pipeline::{run_all, Entity, RunOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const FUNDS_CSV: &str = "CNPJ_FUNDO;DENOM_SOCIAL;CLASSE;DT_REG;SIT;VL_PATRIM_LIQ;NR_COTST;FUNDO_EXCLUSIVO\n\
    11.222.333/0001-44;FUNDO ALFA;Renda Fixa;2015-03-02;EM FUNCIONAMENTO NORMAL;1.234.567,89;120;N\n\
    99.888.777/0001-66;FUNDO BETA;Acoes;data invalida;CANCELADA;nao numerico;33;S\n";

const BONDS_CSV: &str = "Tipo Titulo;Data Vencimento;Data Base;Taxa Compra Manha;Taxa Venda Manha;PU Compra Manha;PU Venda Manha\n\
    LTN;01/01/2029;05/01/2026;11,25;11,31;734,12;733,58\n\
    Tesouro IPCA+;15/05/2035;05/01/2026;5,87;5,93;2.345,67;2.340,11\n";

const ISSUERS_JSON: &str = r#"{"data": [
    {"cnpj": "11.222.333/0001-44", "razao_social": "EMISSORA ALFA S.A.", "categoria": "Cia Aberta", "uf": "SP"},
    {"cnpj": "55.666.777/0001-88", "razao_social": "EMISSORA GAMA", "categoria": "Incentivada", "uf": "RJ"}
]}"#;

fn write_config(dir: &Path, funds_csv: &str) -> AppConfig {
    fs::write(dir.join("cad_fi.csv"), funds_csv).unwrap();
    fs::write(dir.join("precos.csv"), BONDS_CSV).unwrap();
    fs::write(dir.join("issuers.json"), ISSUERS_JSON).unwrap();

    let toml = format!(
        r#"
        [database]
        path = "{dir}/refdata.db"

        [sources.funds]
        file = "{dir}/cad_fi.csv"

        [sources.bonds]
        file = "{dir}/precos.csv"

        [sources.issuers]
        file = "{dir}/issuers.json"
        "#,
        dir = dir.display()
    );
    let config_path = dir.join("refdata.toml");
    fs::write(&config_path, toml).unwrap();
    AppConfig::load(&config_path).unwrap()
}

fn all_offline() -> RunOptions {
    RunOptions { entities: Entity::ALL.to_vec(), truncate: false, offline: true }
}

#[tokio::test]
async fn full_run_loads_all_entities_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FUNDS_CSV);

    let first = run_all(&config, &all_offline()).await.unwrap();
    assert!(first.all_succeeded());
    assert_eq!(first.outcomes.len(), 3);

    // Re-running with identical input produces no net row-count change
    let second = run_all(&config, &all_offline()).await.unwrap();
    assert!(second.all_succeeded());
    for (a, b) in first.outcomes.iter().zip(second.outcomes.iter()) {
        assert_eq!(a.entity, b.entity);
        assert_eq!(a.table_rows, b.table_rows);
    }

    let mut db = DatabaseManager::open(dir.path().join("refdata.db")).unwrap();
    let funds: u64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM registry_funds", [], |r| r.get(0))
        .unwrap();
    let bonds: u64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM pricing_bond_quotes", [], |r| r.get(0))
        .unwrap();
    let issuers: u64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM registry_issuers", [], |r| r.get(0))
        .unwrap();
    assert_eq!((funds, bonds, issuers), (2, 2, 2));
}

#[tokio::test]
async fn malformed_fields_load_as_null_without_aborting() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FUNDS_CSV);

    let summary = run_all(&config, &all_offline()).await.unwrap();
    assert!(summary.all_succeeded());

    let mut db = DatabaseManager::open(dir.path().join("refdata.db")).unwrap();
    let (registered_on, nav): (Option<String>, Option<f64>) = db
        .connection()
        .query_row(
            "SELECT registered_on, net_asset_value FROM registry_funds WHERE cnpj = ?1",
            ["99888777000166"],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(registered_on, None);
    assert_eq!(nav, None);
}

#[tokio::test]
async fn changed_volatile_field_updates_in_place() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FUNDS_CSV);
    run_all(&config, &all_offline()).await.unwrap();

    // Same keys, one changed net asset value
    let updated_csv = FUNDS_CSV.replace("1.234.567,89", "2.000.000,00");
    fs::write(dir.path().join("cad_fi.csv"), updated_csv).unwrap();

    let options = RunOptions { entities: vec![Entity::Funds], truncate: false, offline: true };
    let summary = run_all(&config, &options).await.unwrap();
    assert!(summary.all_succeeded());
    assert_eq!(summary.outcomes[0].table_rows, 2);

    let mut db = DatabaseManager::open(dir.path().join("refdata.db")).unwrap();
    let (nav, registered_on): (f64, String) = db
        .connection()
        .query_row(
            "SELECT net_asset_value, registered_on FROM registry_funds WHERE cnpj = ?1",
            ["11222333000144"],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(nav, 2_000_000.0);
    assert_eq!(registered_on, "2015-03-02");
}

#[tokio::test]
async fn one_broken_entity_does_not_stop_the_others() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FUNDS_CSV);
    fs::write(dir.path().join("issuers.json"), "this is not json").unwrap();

    let summary = run_all(&config, &all_offline()).await.unwrap();
    assert!(!summary.all_succeeded());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "issuers");
    assert_eq!(summary.outcomes.len(), 2);

    let mut db = DatabaseManager::open(dir.path().join("refdata.db")).unwrap();
    let funds: u64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM registry_funds", [], |r| r.get(0))
        .unwrap();
    assert_eq!(funds, 2);
}

#[tokio::test]
async fn truncate_run_replaces_stale_rows() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), FUNDS_CSV);
    run_all(&config, &all_offline()).await.unwrap();

    // A later vintage where one fund disappeared
    let shrunk = "CNPJ_FUNDO;DENOM_SOCIAL;CLASSE;DT_REG;SIT;VL_PATRIM_LIQ;NR_COTST;FUNDO_EXCLUSIVO\n\
        11.222.333/0001-44;FUNDO ALFA;Renda Fixa;2015-03-02;EM FUNCIONAMENTO NORMAL;1.234.567,89;120;N\n";
    fs::write(dir.path().join("cad_fi.csv"), shrunk).unwrap();

    let options = RunOptions { entities: vec![Entity::Funds], truncate: true, offline: true };
    let summary = run_all(&config, &options).await.unwrap();
    assert!(summary.all_succeeded());
    assert_eq!(summary.outcomes[0].table_rows, 1);
}
