//! Per-stream schema tracking.
//!
//! The registry holds the latest declared JSON Schema for each stream and
//! the column ordering derived from it. Columns are the keys of the
//! schema's `properties` object in declaration order, which is why this
//! crate enables serde_json's `preserve_order` feature.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::TargetError;
use crate::message::SchemaMessage;

/// Replace characters that would be unsafe in a filename. Matches the
/// original target's behavior of mapping `/` to `_`.
pub fn sanitize_stream_name(name: &str) -> String {
    name.replace('/', "_")
}

/// The latest schema declared for one stream.
#[derive(Debug, Clone)]
pub struct StreamSchema {
    /// The raw JSON Schema as declared by the extractor.
    pub schema: Value,
    /// Column names in the schema's `properties` declaration order.
    pub columns: Vec<String>,
}

/// Tracks the current schema for every stream seen so far.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, StreamSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or wholesale replace) the schema for a stream and recompute
    /// its column ordering. Returns the sanitized stream name the schema
    /// was registered under.
    ///
    /// Replacing a schema does not touch any file already opened for the
    /// stream; open files keep the column ordering captured at their first
    /// row.
    pub fn register(&mut self, message: &SchemaMessage) -> Result<String, TargetError> {
        let stream = message
            .stream
            .as_deref()
            .ok_or_else(|| TargetError::SchemaRequiredFieldMissing("stream".into()))?;
        let stream = sanitize_stream_name(stream);

        let columns = derive_columns(&stream, &message.schema)?;
        self.schemas.insert(
            stream.clone(),
            StreamSchema {
                schema: message.schema.clone(),
                columns,
            },
        );
        Ok(stream)
    }

    /// Look up the current schema for a stream. A RECORD arriving before
    /// its SCHEMA is a protocol violation, surfaced as
    /// [`TargetError::UnknownStream`].
    pub fn lookup(&self, stream: &str) -> Result<&StreamSchema, TargetError> {
        self.schemas
            .get(stream)
            .ok_or_else(|| TargetError::UnknownStream(stream.to_string()))
    }

    pub fn contains(&self, stream: &str) -> bool {
        self.schemas.contains_key(stream)
    }
}

/// Walk the schema's declared properties in declaration order.
fn derive_columns(stream: &str, schema: &Value) -> Result<Vec<String>, TargetError> {
    match schema.get("properties") {
        Some(Value::Object(props)) => Ok(props.keys().cloned().collect()),
        _ => Err(TargetError::SchemaRequiredFieldMissing(format!(
            "properties (stream {stream})"
        ))),
    }
}
