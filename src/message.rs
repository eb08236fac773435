//! Singer message decoding.
//!
//! The Singer protocol is newline-delimited JSON: each line is an object
//! carrying a `type` field of `SCHEMA`, `RECORD`, or `STATE`. Decoding is a
//! pure parse with no side effects. Lines that are not valid JSON objects
//! with a string `type` field are [`TargetError::MalformedMessage`];
//! well-formed objects with an unrecognized `type` are reported as
//! [`TargetError::UnsupportedMessageType`] so the driver can skip them.

use serde::Deserialize;
use serde_json::Value;

use crate::error::TargetError;

/// A `SCHEMA` message: declares the shape of a stream's records.
#[derive(Deserialize, Debug, Clone)]
pub struct SchemaMessage {
    /// Stream name. Optional at the decode layer so the registry can
    /// report its absence as a schema error rather than a parse error.
    pub stream: Option<String>,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
}

/// A `RECORD` message: one data row for a stream.
#[derive(Deserialize, Debug, Clone)]
pub struct RecordMessage {
    pub stream: String,
    pub record: Value,
}

/// A `STATE` message: an opaque checkpoint value owned by the extractor.
#[derive(Deserialize, Debug, Clone)]
pub struct StateMessage {
    pub value: Value,
}

/// A decoded Singer message, tagged by kind.
#[derive(Debug, Clone)]
pub enum Message {
    Schema(SchemaMessage),
    Record(RecordMessage),
    State(StateMessage),
}

/// Decode one input line into a [`Message`].
pub fn decode_line(line: &str) -> Result<Message, TargetError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| TargetError::MalformedMessage(format!("invalid JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| TargetError::MalformedMessage("message is not a JSON object".into()))?;

    let kind = match obj.get("type") {
        Some(Value::String(t)) => t.clone(),
        _ => {
            return Err(TargetError::MalformedMessage(
                "message has no string `type` field".into(),
            ))
        }
    };

    match kind.as_str() {
        "SCHEMA" => serde_json::from_value(value)
            .map(Message::Schema)
            .map_err(|e| TargetError::MalformedMessage(format!("bad SCHEMA message: {e}"))),
        "RECORD" => serde_json::from_value(value)
            .map(Message::Record)
            .map_err(|e| TargetError::MalformedMessage(format!("bad RECORD message: {e}"))),
        "STATE" => serde_json::from_value(value)
            .map(Message::State)
            .map_err(|e| TargetError::MalformedMessage(format!("bad STATE message: {e}"))),
        other => Err(TargetError::UnsupportedMessageType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_schema_message() {
        let line = r#"{"type":"SCHEMA","stream":"users","schema":{"properties":{"id":{"type":"integer"}}},"key_properties":["id"]}"#;
        match decode_line(line).unwrap() {
            Message::Schema(s) => {
                assert_eq!(s.stream.as_deref(), Some("users"));
                assert_eq!(s.key_properties, vec!["id"]);
                assert!(s.schema.get("properties").is_some());
            }
            other => panic!("expected SCHEMA, got {other:?}"),
        }
    }

    #[test]
    fn decodes_record_message() {
        let line = r#"{"type":"RECORD","stream":"users","record":{"id":1,"name":"Ann"}}"#;
        match decode_line(line).unwrap() {
            Message::Record(r) => {
                assert_eq!(r.stream, "users");
                assert_eq!(r.record["name"], "Ann");
            }
            other => panic!("expected RECORD, got {other:?}"),
        }
    }

    #[test]
    fn decodes_state_message() {
        let line = r#"{"type":"STATE","value":{"users":42}}"#;
        match decode_line(line).unwrap() {
            Message::State(s) => assert_eq!(s.value["users"], 42),
            other => panic!("expected STATE, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            decode_line("{not json"),
            Err(TargetError::MalformedMessage(_))
        ));
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            decode_line("[1,2,3]"),
            Err(TargetError::MalformedMessage(_))
        ));
    }

    #[test]
    fn missing_type_field_is_malformed() {
        assert!(matches!(
            decode_line(r#"{"stream":"users"}"#),
            Err(TargetError::MalformedMessage(_))
        ));
    }

    #[test]
    fn unknown_type_is_unsupported_not_malformed() {
        let err = decode_line(r#"{"type":"ACTIVATE_VERSION","stream":"users","version":1}"#)
            .unwrap_err();
        match err {
            TargetError::UnsupportedMessageType(kind) => assert_eq!(kind, "ACTIVATE_VERSION"),
            other => panic!("expected UnsupportedMessageType, got {other:?}"),
        }
    }

    #[test]
    fn record_missing_payload_is_malformed() {
        assert!(matches!(
            decode_line(r#"{"type":"RECORD","stream":"users"}"#),
            Err(TargetError::MalformedMessage(_))
        ));
    }
}
