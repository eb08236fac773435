//! Error types for the target pipeline.
//!
//! All pipeline errors funnel into [`TargetError`]. Every variant except
//! [`TargetError::UnsupportedMessageType`] is fatal: the driver stops,
//! nothing further is emitted, and the last successfully emitted STATE
//! remains the upstream extractor's resume point.

use thiserror::Error;

/// The unified error type for the target pipeline.
#[derive(Error, Debug)]
pub enum TargetError {
    /// The input line is not a valid Singer message (bad JSON, not an
    /// object, or a missing/ill-typed `type` field).
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A syntactically valid message whose `type` we do not handle.
    /// Non-fatal: the driver logs it and moves on, so upstream protocol
    /// additions do not abort the run.
    #[error("unsupported message type: {0}")]
    UnsupportedMessageType(String),

    /// A RECORD arrived before any SCHEMA for its stream. Column ordering
    /// cannot be derived, so the run must stop.
    #[error("record for stream {0} was encountered before a corresponding schema")]
    UnknownStream(String),

    /// A SCHEMA message lacks a field we need to derive columns.
    #[error("SCHEMA message is missing a required field: {0}")]
    SchemaRequiredFieldMissing(String),

    /// The record payload is not a JSON object and cannot be flattened.
    #[error("record is not a JSON object: got {0}")]
    RecordSchemaMismatch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TargetError {
    /// Whether this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TargetError::UnsupportedMessageType(_))
    }
}
