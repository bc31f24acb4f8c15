// JSON import (array of flat records) and report export

use serde_json::{json, Map, Value};
use tally_recon::{Cell, Dataset, ReportFile};

/// Read an array of objects. Columns are the union of keys in first-seen order.
pub fn read_records(bytes: &[u8]) -> Result<Dataset, String> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let Value::Array(items) = value else {
        return Err("expected a JSON array of records".to_string());
    };

    let mut columns: Vec<String> = Vec::new();
    let mut records: Vec<Map<String, Value>> = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(record) = item else {
            return Err(format!("record {} is not an object", i));
        };
        for key in record.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        records.push(record);
    }

    let mut ds = Dataset::new(&columns);
    for record in &records {
        let cells = columns
            .iter()
            .map(|c| record.get(c).map(to_cell).unwrap_or(Cell::Empty))
            .collect();
        ds.push_row(cells);
    }
    Ok(ds)
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(s) => Cell::from(s.as_str()),
        // Integers stay exact; f64 rounds identifiers past 2^53
        Value::Number(n) if n.is_i64() || n.is_u64() => Cell::Text(n.to_string()),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or_else(|| Cell::Text(n.to_string())),
        Value::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Nested values are kept as their JSON text
        other => Cell::Text(other.to_string()),
    }
}

/// Export a report file as `{ "<table>": { "columns": [...], "rows": [[...]] } }`.
pub fn write_report(file: &ReportFile) -> Result<Vec<u8>, String> {
    let mut out = Map::new();
    for table in &file.tables {
        out.insert(
            table.name.clone(),
            json!({ "columns": table.columns, "rows": table.rows }),
        );
    }
    let mut bytes = serde_json::to_vec_pretty(&Value::Object(out)).map_err(|e| e.to_string())?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_recon::ReportTable;

    #[test]
    fn records_union_keys_in_order() {
        let ds = read_records(
            br#"[
                {"Tracking_ID": "INV1", "Status": "Pass"},
                {"Tracking_ID": 1002, "Details": {"diff": 2}, "Status": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(ds.columns(), ["Tracking_ID", "Status", "Details"]);
        let second = ds.row(1).unwrap();
        assert_eq!(second.text("Tracking_ID").as_deref(), Some("1002"));
        assert_eq!(second.get("Status"), Some(&Cell::Empty));
        assert_eq!(second.text("Details").as_deref(), Some(r#"{"diff":2}"#));
        assert_eq!(ds.row(0).unwrap().get("Details"), Some(&Cell::Empty));
    }

    #[test]
    fn long_integer_ids_are_not_rounded() {
        let ds = read_records(
            br#"[{"Tracking_ID": 123456789012345678, "Amount": 10.5, "Status": "Pass"}]"#,
        )
        .unwrap();
        let row = ds.row(0).unwrap();
        assert_eq!(row.text("Tracking_ID").as_deref(), Some("123456789012345678"));
        assert_eq!(row.get("Amount"), Some(&Cell::Number(10.5)));
    }

    #[test]
    fn rejects_non_array_documents() {
        assert!(read_records(br#"{"a": 1}"#).is_err());
        assert!(read_records(br#"[1, 2]"#).unwrap_err().contains("record 0"));
        assert!(read_records(b"not json").is_err());
    }

    #[test]
    fn report_keeps_table_order() {
        let file = ReportFile {
            stem: "final_report".into(),
            tables: vec![
                ReportTable {
                    name: "producer".into(),
                    columns: vec!["Invoice No.".into()],
                    rows: vec![vec!["INV1".into()]],
                },
                ReportTable {
                    name: "Final".into(),
                    columns: vec!["Invoice No.".into()],
                    rows: vec![],
                },
            ],
        };
        let text = String::from_utf8(write_report(&file).unwrap()).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let keys: Vec<_> = parsed.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["producer", "Final"]);
        assert_eq!(parsed["producer"]["rows"][0][0], "INV1");
    }
}
