use chrono::NaiveDate;
use std::collections::HashSet;

/// Coerce a date-like cell to a calendar date.
///
/// File vintages disagree on format, so a small fallback chain is tried
/// in order. Anything unparseable is `None`, never an error; a bad date
/// must not sink the batch.
pub fn coerce_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
}

/// Coerce a numeric cell, tolerating locale separators.
///
/// `1.234,56` and `1234.56` both come out as 1234.56. A value with a
/// comma is treated as Brazilian-formatted: dots are thousands
/// separators, the comma is the decimal mark.
pub fn coerce_decimal(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };
    normalized.parse().ok()
}

pub fn coerce_integer(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    // Counts sometimes arrive with a decimal suffix ("120.0")
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Coerce boolean-like text against explicit allow-lists.
///
/// Only listed spellings map to a value; everything else is `None` so
/// an unexpected marker never silently becomes `false`.
pub fn coerce_flag(raw: Option<&str>) -> Option<bool> {
    let s = raw?.trim().to_uppercase();
    match s.as_str() {
        "SIM" | "S" | "1" | "TRUE" => Some(true),
        "NAO" | "NÃO" | "N" | "0" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Strip formatting from a tax ID, keeping digits only.
///
/// `11.222.333/0001-44` becomes `11222333000144`. An empty result means
/// the row carries no usable natural key.
pub fn clean_tax_id(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Deduplicate records by natural key, keeping the first occurrence in
/// file order.
pub fn dedupe_by_key<R, K, F>(records: Vec<R>, key_fn: F) -> Vec<R>
where
    K: std::hash::Hash + Eq,
    F: Fn(&R) -> K,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(key_fn(r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_fallback_chain_covers_known_vintages() {
        assert_eq!(
            coerce_date(Some("2026-01-05")),
            NaiveDate::from_ymd_opt(2026, 1, 5)
        );
        assert_eq!(
            coerce_date(Some("05/01/2026")),
            NaiveDate::from_ymd_opt(2026, 1, 5)
        );
        assert_eq!(
            coerce_date(Some("20260105")),
            NaiveDate::from_ymd_opt(2026, 1, 5)
        );
    }

    #[test]
    fn malformed_dates_become_none_not_errors() {
        assert_eq!(coerce_date(Some("31/02/2026")), None);
        assert_eq!(coerce_date(Some("not-a-date")), None);
        assert_eq!(coerce_date(Some("")), None);
        assert_eq!(coerce_date(None), None);
    }

    #[test]
    fn decimal_handles_brazilian_and_plain_formats() {
        assert_eq!(coerce_decimal(Some("1.234,56")), Some(1234.56));
        assert_eq!(coerce_decimal(Some("1234,56")), Some(1234.56));
        assert_eq!(coerce_decimal(Some("1234.56")), Some(1234.56));
        assert_eq!(coerce_decimal(Some("-0,25")), Some(-0.25));
        assert_eq!(coerce_decimal(Some("n/d")), None);
    }

    #[test]
    fn flags_use_explicit_allow_lists() {
        assert_eq!(coerce_flag(Some("SIM")), Some(true));
        assert_eq!(coerce_flag(Some("s")), Some(true));
        assert_eq!(coerce_flag(Some("1")), Some(true));
        assert_eq!(coerce_flag(Some("NÃO")), Some(false));
        assert_eq!(coerce_flag(Some("N")), Some(false));
        assert_eq!(coerce_flag(Some("talvez")), None);
    }

    #[test]
    fn tax_id_strips_formatting() {
        assert_eq!(
            clean_tax_id(Some("11.222.333/0001-44")),
            Some("11222333000144".to_string())
        );
        assert_eq!(clean_tax_id(Some("--")), None);
        assert_eq!(clean_tax_id(None), None);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_file_order() {
        let records = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        let deduped = dedupe_by_key(records, |r| r.0);
        assert_eq!(deduped, vec![("a", 1), ("b", 2), ("c", 4)]);
    }

    #[test]
    fn integer_coercion_accepts_decimal_suffix() {
        assert_eq!(coerce_integer(Some("120")), Some(120));
        assert_eq!(coerce_integer(Some("120.0")), Some(120));
        assert_eq!(coerce_integer(Some("120.5")), None);
    }
}
