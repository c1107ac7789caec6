use refdata_core::Result;
use rusqlite::Connection;
use tracing::{info, warn};

/// Post-load aggregates, printed through structured logs so the
/// operator can eyeball a run without opening the database.

pub fn fund_summary(conn: &Connection, top_n: usize) -> Result<()> {
    if !table_exists(conn, "registry_funds")? {
        warn!("registry_funds not loaded yet; nothing to report");
        return Ok(());
    }

    let total: u64 = conn.query_row("SELECT COUNT(*) FROM registry_funds", [], |r| r.get(0))?;
    info!(total, "fund registry rows");

    let mut stmt = conn.prepare(
        "SELECT fund_class, COUNT(*), COALESCE(SUM(net_asset_value), 0)
         FROM registry_funds
         WHERE fund_class IS NOT NULL
         GROUP BY fund_class
         ORDER BY SUM(net_asset_value) DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([top_n as i64], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?, row.get::<_, f64>(2)?))
    })?;
    for row in rows {
        let (class, count, nav_sum) = row?;
        info!(class, count, nav_sum, "net assets by fund class");
    }

    let mut stmt = conn.prepare(
        "SELECT corporate_name, net_asset_value
         FROM registry_funds
         WHERE net_asset_value IS NOT NULL
         ORDER BY net_asset_value DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([top_n as i64], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    for (rank, row) in rows.enumerate() {
        let (name, nav) = row?;
        info!(rank = rank + 1, name, nav, "top fund by net asset value");
    }

    Ok(())
}

pub fn bond_summary(conn: &Connection, top_n: usize) -> Result<()> {
    if !table_exists(conn, "pricing_bond_quotes")? {
        warn!("pricing_bond_quotes not loaded yet; nothing to report");
        return Ok(());
    }

    let total: u64 = conn.query_row("SELECT COUNT(*) FROM pricing_bond_quotes", [], |r| r.get(0))?;
    let securities: u64 = conn.query_row(
        "SELECT COUNT(DISTINCT security_code) FROM pricing_bond_quotes",
        [],
        |r| r.get(0),
    )?;
    info!(total, securities, "bond quote rows");

    let mut stmt = conn.prepare(
        "SELECT security_code, COUNT(*), MAX(reference_date)
         FROM pricing_bond_quotes
         GROUP BY security_code
         ORDER BY COUNT(*) DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([top_n as i64], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?, row.get::<_, String>(2)?))
    })?;
    for row in rows {
        let (security, quotes, latest) = row?;
        info!(security, quotes, latest, "quotes per security");
    }

    Ok(())
}

pub fn issuer_summary(conn: &Connection, top_n: usize) -> Result<()> {
    if !table_exists(conn, "registry_issuers")? {
        warn!("registry_issuers not loaded yet; nothing to report");
        return Ok(());
    }

    let total: u64 = conn.query_row("SELECT COUNT(*) FROM registry_issuers", [], |r| r.get(0))?;
    info!(total, "issuer registry rows");

    let mut stmt = conn.prepare(
        "SELECT COALESCE(category, '(sem categoria)'), COUNT(*)
         FROM registry_issuers
         GROUP BY category
         ORDER BY COUNT(*) DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([top_n as i64], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
    })?;
    for row in rows {
        let (category, count) = row?;
        info!(category, count, "issuers by category");
    }

    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}
