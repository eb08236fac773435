//! Optional JSON Schema validation of incoming records.
//!
//! When enabled by config, each stream's declared schema is compiled
//! (Draft 4) and every RECORD is checked against it before being written.
//! Validation failures are logged and the record skipped; they do not
//! abort the run. The `date-time` format check is deliberately lenient,
//! accepting timestamps with or without a timezone offset and offsets with
//! or without a colon, since extractors are inconsistent here.

use std::collections::HashMap;

use jsonschema::{Draft, JSONSchema};
use log::{error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$")
        .expect("date-time regex is valid")
});

fn is_datetime(value: &str) -> bool {
    value.is_empty() || DATETIME_RE.is_match(value)
}

/// Compiled validators, keyed by stream name.
#[derive(Default)]
pub struct RecordValidators {
    validators: HashMap<String, JSONSchema>,
}

impl RecordValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and install the validator for a stream, replacing any prior
    /// one. A schema that fails to compile is logged and left without a
    /// validator; its records then pass through unvalidated.
    pub fn compile(&mut self, stream: &str, schema: &Value) {
        match JSONSchema::options()
            .with_draft(Draft::Draft4)
            .with_format("date-time", is_datetime)
            .compile(schema)
        {
            Ok(compiled) => {
                self.validators.insert(stream.to_string(), compiled);
            }
            Err(e) => {
                warn!("failed to compile schema for stream {stream}: {e}");
                self.validators.remove(stream);
            }
        }
    }

    /// Check a record against its stream's validator, logging every
    /// violation. Returns true when the record is valid or the stream has
    /// no validator installed.
    pub fn check(&self, stream: &str, record: &Value) -> bool {
        let Some(validator) = self.validators.get(stream) else {
            return true;
        };
        if let Err(errors) = validator.validate(record) {
            for error in errors {
                error!("validation error for stream {stream}: {error}");
            }
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_record_passes() {
        let mut validators = RecordValidators::new();
        validators.compile(
            "users",
            &json!({"type": "object", "properties": {"id": {"type": "integer"}}}),
        );
        assert!(validators.check("users", &json!({"id": 1})));
    }

    #[test]
    fn invalid_record_fails() {
        let mut validators = RecordValidators::new();
        validators.compile(
            "users",
            &json!({"type": "object", "properties": {"id": {"type": "integer"}}}),
        );
        assert!(!validators.check("users", &json!({"id": "not-a-number"})));
    }

    #[test]
    fn stream_without_validator_passes() {
        let validators = RecordValidators::new();
        assert!(validators.check("users", &json!({"anything": true})));
    }

    #[test]
    fn datetime_format_accepts_common_variants() {
        for ok in [
            "",
            "2024-01-02T03:04:05",
            "2024-01-02T03:04:05Z",
            "2024-01-02T03:04:05.123+02:00",
            "2024-01-02T03:04:05-0500",
        ] {
            assert!(is_datetime(ok), "{ok} should validate");
        }
        assert!(!is_datetime("2024-01-02"));
        assert!(!is_datetime("not a date"));
    }

    #[test]
    fn datetime_format_is_enforced_when_declared() {
        let mut validators = RecordValidators::new();
        validators.compile(
            "events",
            &json!({
                "type": "object",
                "properties": {"at": {"type": "string", "format": "date-time"}}
            }),
        );
        assert!(validators.check("events", &json!({"at": "2024-01-02T03:04:05Z"})));
        assert!(!validators.check("events", &json!({"at": "yesterday"})));
    }
}
