//! CSV export of displayed rows.
//!
//! Output: a header row, then one line per row; every field is
//! double-quoted with embedded quotes doubled; lines end with `\n`.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, Result};

use super::field::{cell_text, resolve_field};

/// One exported column: a header and the field path it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumn {
    pub header: String,
    pub field: String,
}

impl CsvColumn {
    pub fn new(header: &str, field: &str) -> Self {
        Self {
            header: header.to_string(),
            field: field.to_string(),
        }
    }

    /// Column whose header is the field name itself.
    pub fn field(field: &str) -> Self {
        Self::new(field, field)
    }
}

/// Columns for every top-level key present in any row, sorted.
pub fn infer_columns(rows: &[Value]) -> Vec<CsvColumn> {
    let mut keys: Vec<&str> = rows
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter().map(CsvColumn::field).collect()
}

pub fn export_csv(columns: &[CsvColumn], rows: &[Value]) -> Result<String> {
    if columns.is_empty() {
        return Err(ApiError::validation("columns", "at least one column is required"));
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(columns.iter().map(|c| c.header.as_str()))
        .map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| cell_text(resolve_field(row, &c.field))))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Encode(format!("csv flush failed: {}", e)))?;
    let text = String::from_utf8(bytes).map_err(|e| ApiError::Encode(e.to_string()))?;
    log::debug!("CSV_EXPORTED rows={} columns={}", rows.len(), columns.len());
    Ok(text)
}

/// Export typed records through their serde representation.
pub fn export_records<T: Serialize>(columns: &[CsvColumn], records: &[T]) -> Result<String> {
    let rows = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<Value>, _>>()?;
    export_csv(columns, &rows)
}

fn csv_error(e: csv::Error) -> ApiError {
    ApiError::Encode(format!("csv write failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::models::{Finding, FindingStatus, Severity};
    use serde_json::json;

    fn columns() -> Vec<CsvColumn> {
        vec![
            CsvColumn::new("Resource", "resource_id"),
            CsvColumn::new("Severity", "severity"),
            CsvColumn::new("Description", "description"),
        ]
    }

    #[test]
    fn test_quotes_every_field() {
        let rows = vec![json!({
            "resource_id": "sg-1",
            "severity": "high",
            "description": "Rule \"allow-all\" open"
        })];
        let csv = export_csv(&columns(), &rows).unwrap();
        assert_eq!(
            csv,
            "\"Resource\",\"Severity\",\"Description\"\n\"sg-1\",\"high\",\"Rule \"\"allow-all\"\" open\"\n"
        );
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let csv = export_csv(&columns(), &[json!({"resource_id": "i-9"})]).unwrap();
        assert_eq!(csv.lines().nth(1), Some("\"i-9\",\"\",\"\""));
    }

    #[test]
    fn test_round_trip_line_and_field_counts() {
        let rows: Vec<Value> = (0..7)
            .map(|i| json!({"resource_id": format!("r-{}", i), "severity": "low", "description": "ok"}))
            .collect();
        let csv = export_csv(&columns(), &rows).unwrap();

        let lines: Vec<&str> = csv.trim_end_matches('\n').split('\n').collect();
        assert_eq!(lines.len(), rows.len() + 1);
        for line in &lines {
            let fields: Vec<String> = line.split(',').map(|f| f.trim_matches('"').to_string()).collect();
            assert_eq!(fields.len(), columns().len());
        }

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        assert_eq!(reader.records().count(), rows.len());
    }

    #[test]
    fn test_export_typed_records() {
        let finding = Finding {
            id: "f-1".to_string(),
            organization_id: "org-1".to_string(),
            aws_account_id: None,
            resource_id: Some("bucket-a".to_string()),
            service: Some("S3".to_string()),
            title: None,
            description: Some("Public".to_string()),
            severity: Severity::Critical,
            status: FindingStatus::Open,
            created_at: None,
        };
        let csv = export_records(&columns(), &[finding]).unwrap();
        assert!(csv.ends_with("\"bucket-a\",\"critical\",\"Public\"\n"));
    }

    #[test]
    fn test_infer_columns() {
        let rows = vec![json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})];
        let headers: Vec<String> = infer_columns(&rows).into_iter().map(|c| c.header).collect();
        assert_eq!(headers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_write_failure_is_encode_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = csv_error(csv::Error::from(io));
        assert_eq!(err.kind(), "encode");
        assert!(err.to_string().contains("csv write failed"));
    }

    #[test]
    fn test_requires_columns() {
        assert!(export_csv(&[], &[json!({})]).is_err());
    }
}
