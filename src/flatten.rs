//! Record flattening.
//!
//! Converts a nested JSON record into a flat row of CSV cell strings
//! aligned to a column ordering. The schema is authoritative for the
//! column set: declared-but-absent fields become empty cells, and record
//! fields not declared in the schema are dropped. Nested objects and
//! arrays are kept losslessly by serializing them back to compact JSON,
//! since a CSV cell is ultimately a string anyway.

use serde_json::Value;

use crate::error::TargetError;

/// One flattened record: column-name → cell-string pairs in column order.
/// Ephemeral, produced per RECORD message and consumed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRecord {
    cells: Vec<(String, String)>,
}

impl FlatRecord {
    /// Cell values in column order, ready for `csv::Writer::write_record`.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Flatten a record against a column ordering.
///
/// Fails only when the record is not a JSON object at all; every declared
/// column otherwise produces exactly one cell.
pub fn flatten(columns: &[String], record: &Value) -> Result<FlatRecord, TargetError> {
    let obj = match record {
        Value::Object(obj) => obj,
        other => return Err(TargetError::RecordSchemaMismatch(kind_of(other).to_string())),
    };

    let mut cells = Vec::with_capacity(columns.len());
    for column in columns {
        let cell = match obj.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(nested @ (Value::Array(_) | Value::Object(_))) => {
                serde_json::to_string(nested)?
            }
        };
        cells.push((column.clone(), cell));
    }
    Ok(FlatRecord { cells })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
