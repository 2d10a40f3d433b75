use serde_json::Value;
use std::fmt;

/// Tabular view over a query-datasource response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Accepts both response shapes: `data: {columns, data}` and
    /// `data: [ {caption: value, ...}, ... ]`. Returns `None` when `data`
    /// is missing or has neither shape.
    pub fn from_response(response: &Value) -> Option<Self> {
        match response.get("data")? {
            Value::Object(data) => {
                let columns = data
                    .get("columns")?
                    .as_array()?
                    .iter()
                    .map(|c| first_str(c, &["caption", "fieldCaption", "name"]).unwrap_or_default())
                    .map(str::to_string)
                    .collect();
                let rows = data
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().map(row_values).collect())
                    .unwrap_or_default();
                Some(ResultTable { columns, rows })
            }
            Value::Array(rows) => {
                let columns: Vec<String> = match rows.first() {
                    Some(Value::Object(first)) => first.keys().cloned().collect(),
                    _ => Vec::new(),
                };
                let rows = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                            .collect()
                    })
                    .collect();
                Some(ResultTable { columns, rows })
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn row_values(row: &Value) -> Vec<Value> {
    match row {
        Value::Array(values) => values.clone(),
        other => other
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

/// One entry of a read-metadata response
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataField {
    pub caption: String,
    pub data_type: Option<String>,
}

/// Fields listed in a read-metadata response; entries without a caption are skipped
pub fn metadata_fields(response: &Value) -> Vec<MetadataField> {
    response
        .get("data")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| {
                    let caption = first_str(field, &["fieldCaption", "caption", "name"])?;
                    Some(MetadataField {
                        caption: caption.to_string(),
                        data_type: field
                            .get("dataType")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
}
