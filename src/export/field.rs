//! Field lookup for export columns.
//!
//! Columns name fields with dot-notation paths like `metadata.region`;
//! numeric segments index arrays (`tags.0.key`).

use serde_json::Value;

/// Resolve a dot-notation path in a row.
///
/// # Examples
/// ```
/// use evo_uds_core::export::resolve_field;
/// use serde_json::json;
/// let row = json!({"metadata": {"region": "us-east-1"}});
/// assert_eq!(resolve_field(&row, "metadata.region"), Some(&json!("us-east-1")));
/// ```
pub fn resolve_field<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(row);
    }

    // Flat keys containing dots win over nested lookups.
    if let Some(value) = row.as_object().and_then(|obj| obj.get(path)) {
        return Some(value);
    }

    path.split('.').try_fold(row, |current, part| match current {
        Value::Object(obj) => obj.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text written into a CSV cell. Missing and null fields are empty.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        // Arrays and objects as compact JSON
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_and_nested() {
        let row = json!({
            "resource_id": "i-123",
            "metadata": {"region": "eu-west-1"},
            "tags": [{"key": "env"}]
        });
        assert_eq!(resolve_field(&row, "resource_id"), Some(&json!("i-123")));
        assert_eq!(resolve_field(&row, "metadata.region"), Some(&json!("eu-west-1")));
        assert_eq!(resolve_field(&row, "tags.0.key"), Some(&json!("env")));
        assert_eq!(resolve_field(&row, "tags.1.key"), None);
        assert_eq!(resolve_field(&row, "resource_id.x"), None);
    }

    #[test]
    fn test_dotted_key_wins() {
        let row = json!({"a.b": 1, "a": {"b": 2}});
        assert_eq!(resolve_field(&row, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!(12.5))), "12.5");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&json!(["a", "b"]))), r#"["a","b"]"#);
    }
}
