use crate::models::PageWindow;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params_from_iter, Connection, Result, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FundRow {
    pub cnpj: String,
    pub corporate_name: String,
    pub fund_class: Option<String>,
    pub registered_on: Option<NaiveDate>,
    pub status: Option<String>,
    pub net_asset_value: Option<f64>,
    pub quota_holders: Option<i64>,
    pub exclusive_fund: Option<bool>,
    pub loaded_at: DateTime<Utc>,
}

impl FundRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            cnpj: row.get(0)?,
            corporate_name: row.get(1)?,
            fund_class: row.get(2)?,
            registered_on: row.get(3)?,
            status: row.get(4)?,
            net_asset_value: row.get(5)?,
            quota_holders: row.get(6)?,
            exclusive_fund: row.get(7)?,
            loaded_at: row.get(8)?,
        })
    }
}

const FUND_COLUMNS: &str = "cnpj, corporate_name, fund_class, registered_on, status, \
                            net_asset_value, quota_holders, exclusive_fund, loaded_at";

#[derive(Debug, Clone, Serialize)]
pub struct BondRow {
    pub security_code: String,
    pub reference_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub bid_yield: Option<f64>,
    pub ask_yield: Option<f64>,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub loaded_at: DateTime<Utc>,
}

impl BondRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            security_code: row.get(0)?,
            reference_date: row.get(1)?,
            maturity_date: row.get(2)?,
            bid_yield: row.get(3)?,
            ask_yield: row.get(4)?,
            bid_price: row.get(5)?,
            ask_price: row.get(6)?,
            loaded_at: row.get(7)?,
        })
    }
}

const BOND_COLUMNS: &str = "security_code, reference_date, maturity_date, bid_yield, \
                            ask_yield, bid_price, ask_price, loaded_at";

#[derive(Debug, Clone, Serialize)]
pub struct IssuerRow {
    pub cnpj: String,
    pub name: String,
    pub category: Option<String>,
    pub registration_status: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl IssuerRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            cnpj: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            registration_status: row.get(3)?,
            municipality: row.get(4)?,
            state: row.get(5)?,
            loaded_at: row.get(6)?,
        })
    }
}

const ISSUER_COLUMNS: &str = "cnpj, name, category, registration_status, municipality, state, loaded_at";

/// Free-text search is a case-insensitive substring match on the name
/// column; category-style filters are exact matches.
struct Filter {
    clauses: Vec<&'static str>,
    params: Vec<String>,
}

impl Filter {
    fn new() -> Self {
        Self { clauses: Vec::new(), params: Vec::new() }
    }

    fn substring(&mut self, clause: &'static str, value: &Option<String>) {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.clauses.push(clause);
            self.params.push(format!("%{}%", v.to_lowercase()));
        }
    }

    fn exact(&mut self, clause: &'static str, value: &Option<String>) {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.clauses.push(clause);
            self.params.push(v.to_string());
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn paged_query<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    order_by: &str,
    filter: &Filter,
    window: PageWindow,
    map: fn(&Row) -> Result<T>,
) -> Result<(Vec<T>, u64)> {
    let where_sql = filter.where_sql();

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table}{where_sql}"),
        params_from_iter(filter.params.iter()),
        |r| r.get(0),
    )?;

    let sql = format!(
        "SELECT {columns} FROM {table}{where_sql} ORDER BY {order_by} LIMIT {} OFFSET {}",
        window.per_page,
        window.offset()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(filter.params.iter()), map)?
        .collect::<Result<Vec<T>>>()?;

    Ok((rows, total))
}

pub fn list_funds(
    conn: &Connection,
    search: &Option<String>,
    class: &Option<String>,
    window: PageWindow,
) -> Result<(Vec<FundRow>, u64)> {
    let mut filter = Filter::new();
    filter.substring("LOWER(corporate_name) LIKE ?", search);
    filter.exact("fund_class = ?", class);
    paged_query(
        conn,
        "registry_funds",
        FUND_COLUMNS,
        "corporate_name",
        &filter,
        window,
        FundRow::from_row,
    )
}

pub fn get_fund(conn: &Connection, cnpj: &str) -> Result<Option<FundRow>> {
    let digits: String = cnpj.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut stmt = conn.prepare(&format!(
        "SELECT {FUND_COLUMNS} FROM registry_funds WHERE cnpj = ?1"
    ))?;
    let mut rows = stmt.query_map([digits], FundRow::from_row)?;
    rows.next().transpose()
}

pub fn list_bonds(
    conn: &Connection,
    security_code: &Option<String>,
    window: PageWindow,
) -> Result<(Vec<BondRow>, u64)> {
    let mut filter = Filter::new();
    filter.exact("security_code = ?", security_code);
    paged_query(
        conn,
        "pricing_bond_quotes",
        BOND_COLUMNS,
        "reference_date DESC, security_code",
        &filter,
        window,
        BondRow::from_row,
    )
}

pub fn list_issuers(
    conn: &Connection,
    search: &Option<String>,
    category: &Option<String>,
    window: PageWindow,
) -> Result<(Vec<IssuerRow>, u64)> {
    let mut filter = Filter::new();
    filter.substring("LOWER(name) LIKE ?", search);
    filter.exact("category = ?", category);
    paged_query(
        conn,
        "registry_issuers",
        ISSUER_COLUMNS,
        "name",
        &filter,
        window,
        IssuerRow::from_row,
    )
}
