use refdata_core::{RefDataError, Result};
use std::collections::HashMap;

/// An in-memory table parsed from a delimited export.
///
/// Header lookup is case-insensitive because the regulator's exports
/// drift between vintages (`CNPJ_FUNDO` vs `CNPJ_Fundo`), and rows may
/// be ragged, so cell access is positional with bounds checking.
pub struct Table {
    headers: Vec<String>,
    header_index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse payload bytes with the given delimiter.
    ///
    /// Exports arrive in Latin-1 more often than UTF-8, so bytes that
    /// fail strict UTF-8 validation are decoded as Latin-1 instead of
    /// being replaced.
    pub fn parse(bytes: &[u8], delimiter: u8) -> Result<Self> {
        let text = decode_text(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| RefDataError::Source {
                message: format!("failed to read delimited headers: {}", e),
            })?
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();

        let mut header_index = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            // First occurrence wins on duplicate headers
            header_index.entry(name.clone()).or_insert(idx);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self { headers, header_index, rows })
    }

    /// Resolve the first alias present in this file vintage.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|a| self.header_index.get(&a.to_uppercase()).copied())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell accessor; out-of-range and empty cells both read as `None`.
    pub fn cell<'a>(&self, row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
        let idx = idx?;
        match row.get(idx).map(|s| s.trim()) {
            Some("") | None => None,
            Some(v) => Some(v),
        }
    }
}

/// Latin-1 code points map one-to-one onto Unicode scalar values, so
/// the fallback decode is a plain byte-to-char widening.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_delimited_with_ragged_rows() {
        let payload = b"CNPJ_FUNDO;DENOM_SOCIAL;VL_PATRIM_LIQ\n11.222.333/0001-44;FUNDO A;1234,56\n99.888.777/0001-66;FUNDO B\n";
        let table = Table::parse(payload, b';').unwrap();

        assert_eq!(table.rows().len(), 2);
        let nav_col = table.column(&["VL_PATRIM_LIQ"]);
        assert_eq!(table.cell(&table.rows()[0], nav_col), Some("1234,56"));
        assert_eq!(table.cell(&table.rows()[1], nav_col), None);
    }

    #[test]
    fn latin1_accented_names_survive_decoding() {
        // "FUNDO AÇÃO" in Latin-1: Ç = 0xC7, Ã = 0xC3
        let mut payload = b"CNPJ_FUNDO;DENOM_SOCIAL\n123;FUNDO A".to_vec();
        payload.extend_from_slice(&[0xC7, 0xC3]);
        payload.extend_from_slice(b"O\n");

        let table = Table::parse(&payload, b';').unwrap();
        let name_col = table.column(&["DENOM_SOCIAL"]);
        assert_eq!(table.cell(&table.rows()[0], name_col), Some("FUNDO AÇÃO"));
    }

    #[test]
    fn column_lookup_is_case_insensitive_across_aliases() {
        let payload = b"Cnpj_Fundo;Denom_Social\n123;FUNDO\n";
        let table = Table::parse(payload, b';').unwrap();
        assert!(table.column(&["CD_CNPJ", "CNPJ_FUNDO"]).is_some());
        assert!(table.column(&["NO_SUCH_COLUMN"]).is_none());
    }
}
