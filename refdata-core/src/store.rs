use crate::domain::{BondQuote, FundRecord, IssuerRecord};
use crate::error::{RefDataError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::{debug, info};

/// Describes the target table for one entity: schema-qualified name
/// (domain prefix), DDL, and which columns form the natural key vs.
/// which are volatile (rewritten on conflict).
///
/// SQLite has no named schemas, so the domain area rides in the table
/// name prefix (`registry_`, `pricing_`).
pub struct TableSpec {
    pub table: &'static str,
    pub create_sql: &'static str,
    pub columns: &'static [&'static str],
    pub key_columns: &'static [&'static str],
    pub volatile_columns: &'static [&'static str],
}

impl TableSpec {
    /// Multi-row upsert statement for `rows` records.
    ///
    /// Immutable identifying columns are deliberately absent from the
    /// DO UPDATE SET list; only volatile fields and `loaded_at` move on
    /// a key conflict.
    fn upsert_sql(&self, rows: usize) -> String {
        let placeholders_one = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let placeholders = vec![placeholders_one; rows].join(", ");
        let updates = self
            .volatile_columns
            .iter()
            .chain(std::iter::once(&"loaded_at"))
            .map(|c| format!("{c}=excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT({}) DO UPDATE SET {}",
            self.table,
            self.columns.join(", "),
            placeholders,
            self.key_columns.join(", "),
            updates,
        )
    }
}

/// A value ready to bind into an upsert statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Null => Ok(ToSqlOutput::from(rusqlite::types::Null)),
            SqlValue::Integer(i) => Ok(ToSqlOutput::from(*i)),
            SqlValue::Real(f) => Ok(ToSqlOutput::from(*f)),
            SqlValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlValue::Date(d) => d.to_sql(),
            SqlValue::Timestamp(t) => t.to_sql(),
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Text)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Real)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Integer)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        v.map_or(SqlValue::Null, |b| SqlValue::Integer(b as i64))
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Date)
    }
}

/// Implemented by every entity the upsert loader can persist.
pub trait Loadable {
    fn table_spec() -> &'static TableSpec;

    /// Values in `table_spec().columns` order.
    fn bind_values(&self) -> Vec<SqlValue>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Insert new keys, update volatile fields on existing ones.
    Upsert,
    /// Whole-table truncation before inserting (full reload).
    TruncateThenInsert,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub rows_in: usize,
    pub table_rows: u64,
}

/// Batched, transactional upsert into one entity table.
///
/// The whole load runs inside a single transaction: a failure anywhere
/// mid-batch rolls everything back and nothing is partially committed.
pub struct UpsertLoader<'a> {
    conn: &'a mut Connection,
    batch_size: usize,
}

impl<'a> UpsertLoader<'a> {
    pub fn new(conn: &'a mut Connection, batch_size: usize) -> Self {
        // One multi-row statement per batch; clamp so the bound
        // parameter count stays well under SQLite's variable limit.
        let batch_size = batch_size.clamp(1, 1000);
        Self { conn, batch_size }
    }

    pub fn load<R: Loadable>(&mut self, records: &[R], mode: LoadMode) -> Result<LoadOutcome> {
        let spec = R::table_spec();
        self.conn.execute_batch(spec.create_sql)?;

        let tx = self.conn.transaction()?;
        if mode == LoadMode::TruncateThenInsert {
            let removed = tx.execute(&format!("DELETE FROM {}", spec.table), [])?;
            debug!(table = spec.table, removed, "truncated before full reload");
        }

        // Dropping the transaction without commit rolls back, so any
        // statement error below leaves the table untouched.
        for batch in records.chunks(self.batch_size) {
            let sql = spec.upsert_sql(batch.len());
            let mut stmt = tx.prepare_cached(&sql)?;
            let values: Vec<SqlValue> = batch.iter().flat_map(|r| r.bind_values()).collect();
            stmt.execute(params_from_iter(values.iter()))?;
        }
        tx.commit()?;

        let table_rows: u64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", spec.table), [], |row| row.get(0))?;

        if (table_rows as usize) < records.len() && mode == LoadMode::TruncateThenInsert {
            return Err(RefDataError::Load {
                entity: spec.table.to_string(),
                message: format!("row count {} below input {} after reload", table_rows, records.len()),
            });
        }

        info!(
            table = spec.table,
            rows_in = records.len(),
            table_rows,
            "load committed"
        );
        Ok(LoadOutcome { rows_in: records.len(), table_rows })
    }
}

pub static FUND_TABLE: TableSpec = TableSpec {
    table: "registry_funds",
    create_sql: r#"
        CREATE TABLE IF NOT EXISTS registry_funds (
            cnpj            TEXT NOT NULL,
            corporate_name  TEXT NOT NULL,
            fund_class      TEXT,
            registered_on   TEXT,
            status          TEXT,
            net_asset_value REAL,
            quota_holders   INTEGER,
            exclusive_fund  INTEGER,
            loaded_at       TEXT NOT NULL,
            UNIQUE (cnpj)
        );
    "#,
    columns: &[
        "cnpj",
        "corporate_name",
        "fund_class",
        "registered_on",
        "status",
        "net_asset_value",
        "quota_holders",
        "exclusive_fund",
        "loaded_at",
    ],
    key_columns: &["cnpj"],
    volatile_columns: &[
        "corporate_name",
        "fund_class",
        "status",
        "net_asset_value",
        "quota_holders",
        "exclusive_fund",
    ],
};

impl Loadable for FundRecord {
    fn table_spec() -> &'static TableSpec {
        &FUND_TABLE
    }

    fn bind_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.cnpj.clone()),
            SqlValue::Text(self.corporate_name.clone()),
            self.fund_class.clone().into(),
            self.registered_on.into(),
            self.status.clone().into(),
            self.net_asset_value.into(),
            self.quota_holders.into(),
            self.exclusive_fund.into(),
            SqlValue::Timestamp(self.loaded_at),
        ]
    }
}

pub static BOND_TABLE: TableSpec = TableSpec {
    table: "pricing_bond_quotes",
    create_sql: r#"
        CREATE TABLE IF NOT EXISTS pricing_bond_quotes (
            security_code  TEXT NOT NULL,
            reference_date TEXT NOT NULL,
            maturity_date  TEXT,
            bid_yield      REAL,
            ask_yield      REAL,
            bid_price      REAL,
            ask_price      REAL,
            loaded_at      TEXT NOT NULL,
            UNIQUE (security_code, reference_date)
        );
    "#,
    columns: &[
        "security_code",
        "reference_date",
        "maturity_date",
        "bid_yield",
        "ask_yield",
        "bid_price",
        "ask_price",
        "loaded_at",
    ],
    key_columns: &["security_code", "reference_date"],
    volatile_columns: &["bid_yield", "ask_yield", "bid_price", "ask_price"],
};

impl Loadable for BondQuote {
    fn table_spec() -> &'static TableSpec {
        &BOND_TABLE
    }

    fn bind_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.security_code.clone()),
            SqlValue::Date(self.reference_date),
            self.maturity_date.into(),
            self.bid_yield.into(),
            self.ask_yield.into(),
            self.bid_price.into(),
            self.ask_price.into(),
            SqlValue::Timestamp(self.loaded_at),
        ]
    }
}

pub static ISSUER_TABLE: TableSpec = TableSpec {
    table: "registry_issuers",
    create_sql: r#"
        CREATE TABLE IF NOT EXISTS registry_issuers (
            cnpj                TEXT NOT NULL,
            name                TEXT NOT NULL,
            category            TEXT,
            registration_status TEXT,
            municipality        TEXT,
            state               TEXT,
            loaded_at           TEXT NOT NULL,
            UNIQUE (cnpj)
        );
    "#,
    columns: &[
        "cnpj",
        "name",
        "category",
        "registration_status",
        "municipality",
        "state",
        "loaded_at",
    ],
    key_columns: &["cnpj"],
    volatile_columns: &["name", "category", "registration_status", "municipality", "state"],
};

impl Loadable for IssuerRecord {
    fn table_spec() -> &'static TableSpec {
        &ISSUER_TABLE
    }

    fn bind_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.cnpj.clone()),
            SqlValue::Text(self.name.clone()),
            self.category.clone().into(),
            self.registration_status.clone().into(),
            self.municipality.clone().into(),
            self.state.clone().into(),
            SqlValue::Timestamp(self.loaded_at),
        ]
    }
}
