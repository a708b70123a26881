use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SqlExecuteRequest {
    pub query: String,
    pub max_rows: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlValidateRequest {
    pub query: String,
}

/// Tabular result of a SQL execution. Rows are objects keyed by column name,
/// matching the backend's JSON shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlResult {
    pub success: bool,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SqlResult {
    /// Render the result as CSV, columns in declared order. Cell values that
    /// contain separators, quotes or newlines are quoted with doubled quotes.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.columns.join(","));
        for row in &self.rows {
            out.push('\n');
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|col| escape_csv_field(&cell_text(row.get(col))))
                .collect();
            out.push_str(&cells.join(","));
        }
        out
    }
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_rows(rows: Vec<serde_json::Value>) -> SqlResult {
        SqlResult {
            success: true,
            columns: vec!["id".to_string(), "name".to_string()],
            rows: rows
                .into_iter()
                .map(|v| v.as_object().unwrap().clone())
                .collect(),
            row_count: 0,
            warning: None,
            error: None,
        }
    }

    #[test]
    fn csv_renders_columns_in_order() {
        let result = result_with_rows(vec![
            serde_json::json!({"id": 1, "name": "Dupont"}),
            serde_json::json!({"id": 2, "name": "Martin"}),
        ]);
        assert_eq!(result.to_csv(), "id,name\n1,Dupont\n2,Martin");
    }

    #[test]
    fn csv_quotes_fields_with_separators() {
        let result = result_with_rows(vec![
            serde_json::json!({"id": 1, "name": "Dupont, Jean \"JD\""}),
        ]);
        assert_eq!(result.to_csv(), "id,name\n1,\"Dupont, Jean \"\"JD\"\"\"");
    }

    #[test]
    fn missing_cells_render_empty() {
        let result = result_with_rows(vec![serde_json::json!({"id": 3})]);
        assert_eq!(result.to_csv(), "id,name\n3,");
    }

    #[test]
    fn deserializes_backend_shape() {
        let json = serde_json::json!({
            "success": true,
            "columns": ["id"],
            "rows": [{"id": 1}],
            "row_count": 1,
            "warning": "Résultats tronqués"
        });
        let result: SqlResult = serde_json::from_value(json).unwrap();
        assert!(result.success);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.warning.as_deref(), Some("Résultats tronqués"));
    }
}
