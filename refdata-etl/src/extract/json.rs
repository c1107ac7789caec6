use refdata_core::{RefDataError, Result};
use serde_json::Value;

/// Read a JSON snapshot into its record array.
///
/// Accepts either a top-level array or the `{"data": [...]}` wrapper
/// some snapshot endpoints emit.
pub fn records(bytes: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RefDataError::Source {
                message: "JSON snapshot is neither an array nor a {\"data\": [...]} object".to_string(),
            }),
        },
        _ => Err(RefDataError::Source {
            message: "JSON snapshot has an unsupported top-level shape".to_string(),
        }),
    }
}

/// String field accessor that treats empty strings as absent.
pub fn str_field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| record.get(k).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_array_and_data_wrapper() {
        let plain = serde_json::to_vec(&json!([{"a": 1}])).unwrap();
        let wrapped = serde_json::to_vec(&json!({"data": [{"a": 1}, {"a": 2}]})).unwrap();
        assert_eq!(records(&plain).unwrap().len(), 1);
        assert_eq!(records(&wrapped).unwrap().len(), 2);
    }

    #[test]
    fn rejects_scalar_payload() {
        assert!(records(b"42").is_err());
    }

    #[test]
    fn str_field_skips_empty_values() {
        let record = json!({"name": "", "razao_social": "  ISSUER X  "});
        assert_eq!(str_field(&record, &["name", "razao_social"]), Some("ISSUER X"));
    }
}
