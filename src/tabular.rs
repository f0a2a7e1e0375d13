//! Flatten JSON records into CSV text.
//!
//! The header row is the flattened key set of the first record, in that record's
//! key order. Later records are projected onto that header: extra keys are dropped
//! and missing keys render as empty fields.

use serde_json::{Map, Value};
use thiserror::Error;

/// Separator placed between a parent key and a nested key.
pub const KEY_SEPARATOR: &str = "_";

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {index} is not a JSON object")]
    NotARecord { index: usize },

    #[error("CSV encoding failed: {0}")]
    Encode(#[from] csv::Error),

    #[error("CSV buffer flush failed: {0}")]
    Flush(String),
}

/// View a JSON document as a sequence of records.
///
/// Arrays yield their elements, anything else is treated as a single record.
pub fn records_of(document: &Value) -> &[Value] {
    match document {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    }
}

/// Inline nested objects as `<parent>_<child>` keys, recursively.
pub fn flatten(record: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, record);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, parent: Option<&str>, record: &Map<String, Value>) {
    for (key, value) in record {
        let name = match parent {
            Some(parent) => format!("{parent}{KEY_SEPARATOR}{key}"),
            None => key.clone(),
        };

        match value {
            Value::Object(child) => flatten_into(flat, Some(&name), child),
            leaf => {
                flat.insert(name, leaf.clone());
            }
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Derive CSV text from an ordered sequence of records.
///
/// Returns an empty string for an empty sequence. Lines are joined with `\n`
/// and the output carries no trailing newline.
pub fn derive(records: &[Value]) -> Result<String, TabularError> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(map) => Ok(flatten(map)),
            _ => Err(TabularError::NotARecord { index }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let headers: Vec<String> = rows[0].keys().cloned().collect();

    // A zero-column table is just blank lines; the csv writer would emit `""` for them.
    if headers.is_empty() {
        return Ok("\n".repeat(rows.len()));
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(
            headers
                .iter()
                .map(|header| row.get(header).map(render).unwrap_or_default()),
        )?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|e| TabularError::Flush(e.to_string()))?;
    let mut text = String::from_utf8(buffer).map_err(|e| TabularError::Flush(e.to_string()))?;

    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Parse a JSON payload and derive CSV from its records.
pub fn derive_document(payload: &str) -> Result<String, TabularError> {
    let document: Value = serde_json::from_str(payload)?;
    derive(records_of(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            other => vec![other],
        }
    }

    #[test]
    fn test_empty_sequence_is_empty_string() {
        assert_eq!(derive(&[]).unwrap(), "");
    }

    #[test]
    fn test_nested_keys_are_prefixed() {
        let input = records(json!([{"id": 1, "addr": {"city": "X"}}]));
        let csv = derive(&input).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines, vec!["id,addr_city", "1,X"]);
    }

    #[test]
    fn test_deep_nesting_is_unbounded() {
        let input = records(json!([{"a": {"b": {"c": {"d": "deep"}}}, "z": 0}]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv, "a_b_c_d,z\ndeep,0");
    }

    #[test]
    fn test_header_keeps_first_record_key_order() {
        let input = records(json!([{"zeta": 1, "alpha": 2, "mid": {"y": 3, "b": 4}}]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv.lines().next(), Some("zeta,alpha,mid_y,mid_b"));
    }

    #[test]
    fn test_quotes_and_commas_are_escaped() {
        let input = records(json!([{"note": "He said \"hi\", ok"}]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv, "note\n\"He said \"\"hi\"\", ok\"");
    }

    #[test]
    fn test_newline_in_value_is_quoted() {
        let input = records(json!([{"a": "line1\nline2", "b": "plain"}]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv, "a,b\n\"line1\nline2\",plain");
    }

    #[test]
    fn test_divergent_records_follow_first_header() {
        let input = records(json!([
            {"id": 1, "name": "a"},
            {"id": 2, "extra": "dropped"},
            {"name": "c", "id": 3}
        ]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv, "id,name\n1,a\n2,\n3,c");
    }

    #[test]
    fn test_leaf_rendering() {
        let input = records(json!([{
            "null": null,
            "flag": true,
            "n": 2.5,
            "tags": [1, 2]
        }]));
        let csv = derive(&input).unwrap();

        assert_eq!(csv, "null,flag,n,tags\n,true,2.5,\"[1,2]\"");
    }

    #[test]
    fn test_output_is_deterministic() {
        let input = records(json!([
            {"id": 1, "company": {"name": "Acme, Inc", "catchPhrase": "x"}},
            {"id": 2, "company": {"name": "Beta"}}
        ]));

        let first = derive(&input).unwrap();
        let second = derive(&input).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let input = records(json!([{"id": 1}, 42]));
        let err = derive(&input).unwrap_err();

        assert!(matches!(err, TabularError::NotARecord { index: 1 }));
    }

    #[test]
    fn test_empty_first_record_yields_blank_lines() {
        let input = records(json!([{}, {"ignored": 1}]));

        assert_eq!(derive(&input).unwrap(), "\n\n");
    }

    #[test]
    fn test_derive_document() {
        let csv = derive_document(r#"[{"id": 1, "name": "Leanne"}]"#).unwrap();
        assert_eq!(csv, "id,name\n1,Leanne");

        assert_eq!(derive_document("[]").unwrap(), "");
        assert!(matches!(
            derive_document("<html>"),
            Err(TabularError::Json(_))
        ));
        assert!(matches!(
            derive_document("\"text\""),
            Err(TabularError::NotARecord { index: 0 })
        ));
    }

    #[test]
    fn test_records_of_views_documents() {
        let list = json!([{"a": 1}, {"a": 2}]);
        let single = json!({"a": 1});

        assert_eq!(records_of(&list).len(), 2);
        assert_eq!(records_of(&single).len(), 1);
    }

    #[test]
    fn test_flatten_collision_keeps_first_position() {
        let record = json!({"a_b": 1, "a": {"b": 2}, "c": 3});
        let flat = flatten(record.as_object().unwrap());

        let keys: Vec<&String> = flat.keys().collect();
        assert_eq!(keys, vec!["a_b", "c"]);
        assert_eq!(flat["a_b"], json!(2));
    }
}
